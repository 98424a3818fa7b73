//! The template library service.
//!
//! [`TemplateLibrary`] ties the workflow together: it validates requests, runs the decision logic
//! of each operation inside a store transaction, dispatches the resulting notifications once the
//! transaction has committed, and records metrics for every outcome.

use std::sync::Arc;

use auth_handler::{Actor, AuthorizationOracle};
use template_store::{
    run_transaction, Report, ReportStore, RetryPolicy, TemplateId, TemplateStore, TransactionBody,
};
use tracing::{error, info, warn};

use crate::create::CreateTemplate;
use crate::delete::hide_template;
use crate::errors::{Operation, WorkflowError, WorkflowResult};
use crate::metrics::{NoOpWorkflowMetrics, WorkflowMetrics};
use crate::notifications::{Notification, NotificationPolicy, NotificationSender, TemplateUrls};
use crate::read::{template_data, template_report, TemplateData};
use crate::review::{ApproveTemplate, RejectTemplate};
use crate::transition::{TemplateWithVersion, Transition, TransitionContext};
use crate::update::UpdateTemplate;
use crate::validation::{
    validate_request, ReportConfigValidator, StructuralConfigValidator, TemplateRequest,
};

#[cfg(test)]
#[path = "library_tests.rs"]
mod tests;

/// Tunables of the workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub retry: RetryPolicy,
    pub notification_policy: NotificationPolicy,
}

/// The template library's approval and versioning workflow.
pub struct TemplateLibrary {
    store: Arc<dyn TemplateStore>,
    reports: Arc<dyn ReportStore>,
    oracle: Arc<dyn AuthorizationOracle>,
    validator: Arc<dyn ReportConfigValidator>,
    notifier: Arc<dyn NotificationSender>,
    metrics: Arc<dyn WorkflowMetrics>,
    urls: TemplateUrls,
    settings: WorkflowSettings,
}

impl TemplateLibrary {
    /// Creates a library using the structural config validator, no metrics and default settings.
    pub fn new(
        store: Arc<dyn TemplateStore>,
        reports: Arc<dyn ReportStore>,
        oracle: Arc<dyn AuthorizationOracle>,
        notifier: Arc<dyn NotificationSender>,
        urls: TemplateUrls,
    ) -> Self {
        Self {
            store,
            reports,
            oracle,
            validator: Arc::new(StructuralConfigValidator),
            notifier,
            metrics: Arc::new(NoOpWorkflowMetrics),
            urls,
            settings: WorkflowSettings::default(),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ReportConfigValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn WorkflowMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    fn context<'a>(&'a self, actor: &'a Actor) -> TransitionContext<'a> {
        TransitionContext {
            actor,
            oracle: self.oracle.as_ref(),
            urls: &self.urls,
        }
    }

    /// Creates a template and its first version.
    ///
    /// Private templates and templates created by admins are published immediately; anything
    /// else waits for review and the reviewers are notified.
    ///
    /// # Errors
    ///
    /// - `WorkflowError::Validation` if the request is invalid
    /// - `WorkflowError::NotificationFailed` if the template was created but notifying failed
    pub async fn create_template(
        &self,
        actor: &Actor,
        request: TemplateRequest,
    ) -> WorkflowResult<TemplateWithVersion> {
        let result = self.create(actor, request).await;
        self.observe(Operation::Create, actor, None, result)
    }

    async fn create(
        &self,
        actor: &Actor,
        request: TemplateRequest,
    ) -> WorkflowResult<TemplateWithVersion> {
        let request = validate_request(request, self.validator.as_ref()).await?;
        let body = CreateTemplate {
            context: self.context(actor),
            request: &request,
        };
        self.transition(Operation::Create, &body).await
    }

    /// Applies an edit to a template.
    ///
    /// # Errors
    ///
    /// - `WorkflowError::Validation` / `WorkflowError::InvalidTemplateId` for bad input
    /// - `WorkflowError::TemplateIsHidden` if the template was deleted
    /// - `WorkflowError::VisibilityCanNotBeDemoted` if the edit narrows the audience
    /// - `WorkflowError::Unauthorized` if the actor may not edit the template
    pub async fn update_template(
        &self,
        actor: &Actor,
        template_id: &str,
        request: TemplateRequest,
    ) -> WorkflowResult<TemplateWithVersion> {
        let result = self.update(actor, template_id, request).await;
        self.observe(Operation::Update, actor, Some(template_id), result)
    }

    async fn update(
        &self,
        actor: &Actor,
        template_id: &str,
        request: TemplateRequest,
    ) -> WorkflowResult<TemplateWithVersion> {
        let id = TemplateId::new(template_id)?;
        let request = validate_request(request, self.validator.as_ref()).await?;
        let body = UpdateTemplate {
            context: self.context(actor),
            template_id: &id,
            request: &request,
        };
        self.transition(Operation::Update, &body).await
    }

    /// Approves and publishes the pending version of a template. Admins only.
    ///
    /// # Errors
    ///
    /// - `WorkflowError::Unauthorized` if the actor is not an admin
    /// - `WorkflowError::VersionIsApproved` if the version already is approved; callers treat
    ///   this as success
    /// - `WorkflowError::VersionIsRejected` / `WorkflowError::VersionIsCanceled` otherwise
    pub async fn approve_template(
        &self,
        actor: &Actor,
        template_id: &str,
    ) -> WorkflowResult<TemplateWithVersion> {
        let result = self.approve(actor, template_id).await;
        self.observe(Operation::Approve, actor, Some(template_id), result)
    }

    async fn approve(&self, actor: &Actor, template_id: &str) -> WorkflowResult<TemplateWithVersion> {
        let id = TemplateId::new(template_id)?;
        self.require_admin(actor, Operation::Approve).await?;
        let body = ApproveTemplate {
            context: self.context(actor),
            template_id: &id,
        };
        self.transition(Operation::Approve, &body).await
    }

    /// Rejects the pending version of a template with a comment for its author. Admins only.
    ///
    /// The author and every owner or editor collaborator are notified individually.
    pub async fn reject_template(
        &self,
        actor: &Actor,
        template_id: &str,
        comment: &str,
    ) -> WorkflowResult<TemplateWithVersion> {
        let result = self.reject(actor, template_id, comment).await;
        self.observe(Operation::Reject, actor, Some(template_id), result)
    }

    async fn reject(
        &self,
        actor: &Actor,
        template_id: &str,
        comment: &str,
    ) -> WorkflowResult<TemplateWithVersion> {
        let id = TemplateId::new(template_id)?;
        self.require_admin(actor, Operation::Reject).await?;
        let body = RejectTemplate {
            context: self.context(actor),
            template_id: &id,
            comment,
        };
        self.transition(Operation::Reject, &body).await
    }

    /// Hides a template from the library.
    ///
    /// # Errors
    ///
    /// - `WorkflowError::InvalidTemplateId` for an empty or malformed id
    /// - `WorkflowError::Unauthorized` if the actor may not delete the template
    pub async fn delete_template(&self, actor: &Actor, template_id: &str) -> WorkflowResult<()> {
        let result = self.delete(actor, template_id).await;
        self.observe(Operation::Delete, actor, Some(template_id), result)
    }

    async fn delete(&self, actor: &Actor, template_id: &str) -> WorkflowResult<()> {
        let id = TemplateId::new(template_id)?;
        hide_template(self.store.as_ref(), self.oracle.as_ref(), actor, &id).await?;
        Ok(())
    }

    /// Lists the visible templates and the version of each the caller may see.
    pub async fn get_template_data(&self, is_internal_staff: bool) -> WorkflowResult<TemplateData> {
        template_data(self.store.as_ref(), is_internal_staff)
            .await
            .inspect_err(|err| error!(error = %err, "Failed to load template data"))
    }

    /// Gets the report bound to the version of a template the caller may see.
    pub async fn get_template_report(
        &self,
        template_id: &str,
        is_internal_staff: bool,
    ) -> WorkflowResult<Report> {
        let id = TemplateId::new(template_id)?;
        template_report(
            self.store.as_ref(),
            self.reports.as_ref(),
            &id,
            is_internal_staff,
        )
        .await
    }

    async fn require_admin(&self, actor: &Actor, operation: Operation) -> WorkflowResult<()> {
        if self.oracle.is_template_library_admin(actor.email()).await? {
            Ok(())
        } else {
            Err(WorkflowError::unauthorized(operation))
        }
    }

    /// Runs a transition body in a retrying transaction, then sends its notifications.
    async fn transition<B>(
        &self,
        operation: Operation,
        body: &B,
    ) -> WorkflowResult<TemplateWithVersion>
    where
        B: TransactionBody<Output = Transition, Error = WorkflowError>,
    {
        let committed = run_transaction(self.store.as_ref(), self.settings.retry, body).await?;
        self.metrics
            .record_transaction_retries(operation, committed.attempts.saturating_sub(1));

        let Transition {
            result,
            notifications,
        } = committed.output;
        result.ensure_consistent()?;

        self.dispatch(operation, &notifications).await?;
        Ok(result)
    }

    /// Sends every notification, collecting the failures.
    async fn dispatch(
        &self,
        operation: Operation,
        notifications: &[Notification],
    ) -> WorkflowResult<()> {
        let mut failures = Vec::new();
        for notification in notifications {
            if let Err(err) = self.notifier.send(notification).await {
                self.metrics.record_notification_failure(notification.kind);
                let recipients: Vec<String> = notification
                    .recipients
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                warn!(
                    operation = %operation,
                    kind = %notification.kind,
                    template_id = %notification.template_id,
                    recipients = ?recipients,
                    error = %err,
                    "Notification failed"
                );
                failures.push(format!("{}: {}", recipients.join(", "), err));
            }
        }

        if failures.is_empty() || self.settings.notification_policy == NotificationPolicy::BestEffort
        {
            return Ok(());
        }
        Err(WorkflowError::NotificationFailed { failures })
    }

    /// Logs and records the outcome of an operation.
    fn observe<T>(
        &self,
        operation: Operation,
        actor: &Actor,
        template_id: Option<&str>,
        result: WorkflowResult<T>,
    ) -> WorkflowResult<T> {
        let template_id = template_id.unwrap_or("-");
        match &result {
            Ok(_) => {
                self.metrics.record_transition(operation, "success");
                info!(
                    operation = %operation,
                    template_id = template_id,
                    actor = %actor,
                    outcome = "success",
                    "Template operation completed"
                );
            }
            Err(err) if err.is_already_applied(operation) => {
                self.metrics.record_transition(operation, "already_applied");
                info!(
                    operation = %operation,
                    template_id = template_id,
                    actor = %actor,
                    outcome = "already_applied",
                    "Template operation was already applied"
                );
            }
            Err(err) => {
                let outcome = err.outcome_label();
                self.metrics.record_transition(operation, outcome);
                warn!(
                    operation = %operation,
                    template_id = template_id,
                    actor = %actor,
                    outcome = outcome,
                    error = %err,
                    "Template operation failed"
                );
            }
        }
        result
    }
}
