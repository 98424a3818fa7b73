//! Creating a template with its first version.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use template_store::{
    Approval, Report, ReportRef, StoreTransaction, Template, TemplateRef, TransactionBody,
    Version, VersionId, VersionRef,
};
use tracing::debug;

use crate::approval::{activate, is_auto_approve};
use crate::errors::{WorkflowError, WorkflowResult};
use crate::notifications::{NotificationKind, Recipient};
use crate::transition::{TemplateWithVersion, Transition, TransitionContext};
use crate::validation::ValidatedRequest;
use crate::visibility::collaborators_for;

#[cfg(test)]
#[path = "create_tests.rs"]
mod tests;

/// The report a new version is bound to.
pub(crate) fn draft_report(
    reference: ReportRef,
    request: &ValidatedRequest,
    now: DateTime<Utc>,
) -> Report {
    Report {
        reference,
        name: request.name.clone(),
        description: request.description.clone(),
        config: Some(request.config.clone()),
        time_created: now,
        time_modified: now,
    }
}

/// A new pending version of `template` created by the acting user.
pub(crate) fn draft_version(
    reference: VersionRef,
    template: &TemplateRef,
    report: &ReportRef,
    previous_version: Option<VersionRef>,
    request: &ValidatedRequest,
    created_by: &str,
    now: DateTime<Utc>,
) -> Version {
    Version {
        reference,
        template: template.clone(),
        report: report.clone(),
        previous_version,
        created_by: created_by.to_string(),
        approval: Approval::pending(),
        active: false,
        visibility: request.visibility,
        collaborators: collaborators_for(request.visibility, created_by),
        categories: request.categories.clone(),
        cloud: request.cloud.clone(),
        time_created: now,
        time_modified: now,
    }
}

/// Transaction body creating a template, its report and version `0`.
pub(crate) struct CreateTemplate<'a> {
    pub context: TransitionContext<'a>,
    pub request: &'a ValidatedRequest,
}

#[async_trait]
impl TransactionBody for CreateTemplate<'_> {
    type Output = Transition;
    type Error = WorkflowError;

    async fn run(&self, tx: &mut dyn StoreTransaction) -> WorkflowResult<Transition> {
        let actor = self.context.actor.email();
        let now = Utc::now();

        // Step 1: Re-derive the admin role for this attempt
        let is_admin = self.context.actor_is_admin().await?;
        let auto_approve = is_auto_approve(self.request.visibility, is_admin);

        // Step 2: Allocate references
        let template_ref = tx.new_template_ref();
        let report_ref = tx.new_report_ref();
        let version_ref = tx.root().version_ref(&template_ref.id, VersionId::first());

        // Step 3: Build the documents
        let report = draft_report(report_ref.clone(), self.request, now);
        let mut version = draft_version(
            version_ref.clone(),
            &template_ref,
            &report_ref,
            None,
            self.request,
            actor,
            now,
        );
        let mut template = Template {
            reference: template_ref,
            active_report: None,
            active_version: None,
            last_version: version_ref,
            hidden: false,
            time_created: now,
            time_modified: now,
        };

        if auto_approve {
            activate(&mut template, &mut version, actor, now);
        }

        debug!(
            template_id = %template.id(),
            visibility = %version.visibility,
            auto_approve = auto_approve,
            "Staging new template"
        );

        // Step 4: Stage the writes
        tx.create_report(report)?;
        tx.create_template(template.clone())?;
        tx.create_version(version.clone())?;

        // Step 5: Versions awaiting review go to the reviewers
        let notifications = if auto_approve {
            Vec::new()
        } else {
            vec![self.context.notification(
                NotificationKind::VersionSubmitted,
                vec![Recipient::Reviewers],
                &version,
                &self.request.name,
            )]
        };

        Ok(Transition {
            result: TemplateWithVersion {
                template,
                last_version: version,
            },
            notifications,
        })
    }
}
