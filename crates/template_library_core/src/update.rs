//! Editing a template.
//!
//! A template whose last version is still under review is edited in place. Once the last version
//! is approved or canceled it is frozen, and the edit forks a new version with a new report.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use template_store::{
    Report, StoreTransaction, Template, TemplateId, TransactionBody, Version, Visibility,
};
use tracing::debug;

use crate::approval::{activate, is_auto_approve, mark_pending, UpdateBranch};
use crate::create::{draft_report, draft_version};
use crate::errors::{Operation, WorkflowError, WorkflowResult};
use crate::notifications::{Notification, NotificationKind, Recipient};
use crate::permissions::can_update;
use crate::transition::{
    read_replaced_active, retire, TemplateWithVersion, Transition, TransitionContext,
};
use crate::validation::ValidatedRequest;
use crate::visibility::{can_change_visibility, collaborators_for};

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;

/// Transaction body applying an edit to an existing template.
pub(crate) struct UpdateTemplate<'a> {
    pub context: TransitionContext<'a>,
    pub template_id: &'a TemplateId,
    pub request: &'a ValidatedRequest,
}

/// What an update read before staging anything.
struct Snapshot {
    template: Template,
    last: Version,
    auto_approve: bool,
}

impl UpdateTemplate<'_> {
    async fn edit_in_place(
        &self,
        tx: &mut dyn StoreTransaction,
        snapshot: Snapshot,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Transition> {
        let Snapshot {
            mut template,
            mut last,
            auto_approve,
        } = snapshot;
        let actor = self.context.actor.email();

        let replaced = if auto_approve {
            read_replaced_active(tx, &template, Some(&last.reference), &last).await?
        } else {
            None
        };
        let mut report = tx.get_report(&last.report.id).await?;

        last.categories = self.request.categories.clone();
        last.cloud = self.request.cloud.clone();
        last.visibility = self.request.visibility;
        last.collaborators = collaborators_for(self.request.visibility, actor);
        last.time_modified = now;
        if auto_approve {
            activate(&mut template, &mut last, actor, now);
        } else {
            mark_pending(&mut last.approval);
        }
        template.time_modified = now;
        apply_request(&mut report, self.request, now);

        tx.update_report(&report)?;
        tx.update_version(&last)?;
        tx.update_template(&template)?;
        retire(tx, replaced, now)?;

        let mut notifications = Vec::new();
        if auto_approve && !last.is_created_by(actor) {
            notifications.push(self.context.notification(
                NotificationKind::VersionApproved,
                vec![Recipient::User(last.created_by.clone())],
                &last,
                &self.request.name,
            ));
        }

        Ok(Transition {
            result: TemplateWithVersion {
                template,
                last_version: last,
            },
            notifications,
        })
    }

    async fn fork(
        &self,
        tx: &mut dyn StoreTransaction,
        snapshot: Snapshot,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Transition> {
        let Snapshot {
            mut template,
            last,
            auto_approve,
        } = snapshot;
        let actor = self.context.actor.email();

        let replaced = if auto_approve {
            read_replaced_active(tx, &template, None, &last).await?
        } else {
            None
        };

        let report_ref = tx.new_report_ref();
        let version_ref = tx.root().version_ref(template.id(), last.id().next()?);
        let report = draft_report(report_ref.clone(), self.request, now);
        let mut version = draft_version(
            version_ref.clone(),
            &template.reference,
            &report_ref,
            Some(last.reference.clone()),
            self.request,
            actor,
            now,
        );

        template.last_version = version_ref;
        template.time_modified = now;
        if auto_approve {
            activate(&mut template, &mut version, actor, now);
        }

        tx.create_report(report)?;
        tx.create_version(version.clone())?;
        tx.update_template(&template)?;
        retire(tx, replaced, now)?;

        let mut notifications: Vec<Notification> = Vec::new();
        if !(auto_approve && version.visibility == Visibility::Private) {
            notifications.push(self.context.notification(
                NotificationKind::VersionUpdated,
                vec![Recipient::Reviewers],
                &version,
                &self.request.name,
            ));
        }

        Ok(Transition {
            result: TemplateWithVersion {
                template,
                last_version: version,
            },
            notifications,
        })
    }
}

fn apply_request(report: &mut Report, request: &ValidatedRequest, now: DateTime<Utc>) {
    report.name = request.name.clone();
    report.description = request.description.clone();
    report.config = Some(request.config.clone());
    report.time_modified = now;
}

#[async_trait]
impl TransactionBody for UpdateTemplate<'_> {
    type Output = Transition;
    type Error = WorkflowError;

    async fn run(&self, tx: &mut dyn StoreTransaction) -> WorkflowResult<Transition> {
        let now = Utc::now();

        // Step 1: Load the template and its last version
        let template = tx.get_template(self.template_id).await?;
        if template.hidden {
            return Err(WorkflowError::TemplateIsHidden);
        }
        let last = tx.get_version(&template.last_version).await?;

        // Step 2: Visibility may only widen, checked against the stored version
        can_change_visibility(last.visibility, self.request.visibility)?;

        // Step 3: Re-derive the admin role and authorize
        let is_admin = self.context.actor_is_admin().await?;
        let auto_approve = is_auto_approve(self.request.visibility, is_admin);
        if !can_update(&last, self.context.actor, is_admin) {
            return Err(WorkflowError::unauthorized(Operation::Update));
        }

        // Step 4: Edit in place or fork, depending on the last version's review state
        let branch = UpdateBranch::for_status(last.approval.status);
        debug!(
            template_id = %self.template_id,
            version_id = %last.id(),
            branch = ?branch,
            auto_approve = auto_approve,
            "Applying template update"
        );

        let snapshot = Snapshot {
            template,
            last,
            auto_approve,
        };
        match branch {
            UpdateBranch::InPlace => self.edit_in_place(tx, snapshot, now).await,
            UpdateBranch::Fork => self.fork(tx, snapshot, now).await,
        }
    }
}
