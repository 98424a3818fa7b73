//! Admin review of a template's last version: approving or rejecting it.

use async_trait::async_trait;
use chrono::Utc;
use template_store::{StoreTransaction, Template, TemplateId, TransactionBody, Version};
use tracing::debug;

use crate::approval::{activate, ensure_pending, mark_rejected};
use crate::errors::{WorkflowError, WorkflowResult};
use crate::notifications::{Notification, NotificationKind, Recipient};
use crate::transition::{
    read_replaced_active, retire, TemplateWithVersion, Transition, TransitionContext,
};

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;

/// Loads a visible template and its last version, which must be waiting for review.
async fn read_pending(
    tx: &mut dyn StoreTransaction,
    template_id: &TemplateId,
) -> WorkflowResult<(Template, Version)> {
    let template = tx.get_template(template_id).await?;
    if template.hidden {
        return Err(WorkflowError::TemplateIsHidden);
    }
    let last = tx.get_version(&template.last_version).await?;
    ensure_pending(last.approval.status)?;
    Ok((template, last))
}

/// The author of `version` and its owner and editor collaborators, without duplicates.
pub(crate) fn rejection_recipients(version: &Version) -> Vec<String> {
    let mut recipients: Vec<String> = vec![version.created_by.clone()];
    let editors = version
        .collaborators
        .iter()
        .filter(|c| c.role.can_edit())
        .map(|c| c.email.clone());

    for email in editors {
        if !recipients.iter().any(|r| r.eq_ignore_ascii_case(&email)) {
            recipients.push(email);
        }
    }
    recipients
}

/// Transaction body publishing a template's pending version.
pub(crate) struct ApproveTemplate<'a> {
    pub context: TransitionContext<'a>,
    pub template_id: &'a TemplateId,
}

#[async_trait]
impl TransactionBody for ApproveTemplate<'_> {
    type Output = Transition;
    type Error = WorkflowError;

    async fn run(&self, tx: &mut dyn StoreTransaction) -> WorkflowResult<Transition> {
        let now = Utc::now();
        let approver = self.context.actor.email();

        let (mut template, mut last) = read_pending(tx, self.template_id).await?;
        let replaced = read_replaced_active(tx, &template, Some(&last.reference), &last).await?;
        let report = tx.get_report(&last.report.id).await?;

        activate(&mut template, &mut last, approver, now);
        debug!(
            template_id = %self.template_id,
            version_id = %last.id(),
            replaced = ?replaced.as_ref().map(|v| v.id()),
            "Approving template version"
        );

        tx.update_version(&last)?;
        tx.update_template(&template)?;
        retire(tx, replaced, now)?;

        let notification = self.context.notification(
            NotificationKind::VersionApproved,
            vec![Recipient::User(last.created_by.clone())],
            &last,
            &report.name,
        );

        Ok(Transition {
            result: TemplateWithVersion {
                template,
                last_version: last,
            },
            notifications: vec![notification],
        })
    }
}

/// Transaction body sending a template's pending version back to its author.
pub(crate) struct RejectTemplate<'a> {
    pub context: TransitionContext<'a>,
    pub template_id: &'a TemplateId,
    pub comment: &'a str,
}

#[async_trait]
impl TransactionBody for RejectTemplate<'_> {
    type Output = Transition;
    type Error = WorkflowError;

    async fn run(&self, tx: &mut dyn StoreTransaction) -> WorkflowResult<Transition> {
        let now = Utc::now();
        let reviewer = self.context.actor.email();

        let (template, mut last) = read_pending(tx, self.template_id).await?;
        let report = tx.get_report(&last.report.id).await?;

        mark_rejected(&mut last.approval, reviewer, self.comment, now);
        last.time_modified = now;
        debug!(
            template_id = %self.template_id,
            version_id = %last.id(),
            "Rejecting template version"
        );

        tx.update_version(&last)?;

        let notifications: Vec<Notification> = rejection_recipients(&last)
            .into_iter()
            .map(|email| {
                let mut notification = self.context.notification(
                    NotificationKind::VersionRejected,
                    vec![Recipient::User(email)],
                    &last,
                    &report.name,
                );
                notification.comment = Some(self.comment.to_string());
                notification
            })
            .collect();

        Ok(Transition {
            result: TemplateWithVersion {
                template,
                last_version: last,
            },
            notifications,
        })
    }
}
