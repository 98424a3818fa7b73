//! Error types for the template library workflow.

use auth_handler::AuthError;
use serde::Serialize;
use template_store::{ApprovalStatus, DocumentKind, StoreError, Visibility};
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// The workflow operations, used to label authorization failures and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Approve,
    Reject,
    Delete,
    Read,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Approve => "approve",
            Operation::Reject => "reject",
            Operation::Delete => "delete",
            Operation::Read => "read",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem with one field of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Client-correctable problems with a template request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Report template config is required")]
    NoConfig,

    #[error("Invalid report template config")]
    InvalidConfig { fields: Vec<FieldError> },

    #[error("Report templates cannot use custom metrics")]
    CustomMetric,

    #[error("Report templates cannot use custom labels or tags: '{key}'")]
    CustomLabel { key: String },

    #[error("invalid report template visibility: {0}")]
    InvalidVisibility(String),

    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },
}

impl ValidationError {
    pub fn empty_field(field: impl Into<String>) -> Self {
        Self::EmptyField {
            field: field.into(),
        }
    }

    /// Field-level detail for responses.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            ValidationError::NoConfig => vec![FieldError::new("config", self.to_string())],
            ValidationError::InvalidConfig { fields } => fields.clone(),
            ValidationError::CustomMetric => {
                vec![FieldError::new("config.calculatedMetric", self.to_string())]
            }
            ValidationError::CustomLabel { .. } => {
                vec![FieldError::new("config.optional", self.to_string())]
            }
            ValidationError::InvalidVisibility(_) => {
                vec![FieldError::new("visibility", self.to_string())]
            }
            ValidationError::EmptyField { field } => {
                vec![FieldError::new(field.clone(), self.to_string())]
            }
        }
    }
}

/// Errors returned by template library operations.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid report template id: '{0}'")]
    InvalidTemplateId(String),

    #[error("Report template is hidden")]
    TemplateIsHidden,

    #[error("Visibility can not be demoted from {from} to {to}")]
    VisibilityCanNotBeDemoted { from: Visibility, to: Visibility },

    #[error("User is not authorized to {operation} this report template")]
    Unauthorized { operation: Operation },

    #[error("Report template version is already approved")]
    VersionIsApproved,

    #[error("Report template version is already rejected")]
    VersionIsRejected,

    #[error("Report template version is canceled")]
    VersionIsCanceled,

    #[error("{kind} '{id}' not found")]
    NotFound { kind: DocumentKind, id: String },

    /// The change was committed but one or more notifications could not be delivered.
    #[error("Change saved, but {} notification(s) failed: {}", failures.len(), failures.join("; "))]
    NotificationFailed { failures: Vec<String> },

    #[error("Transaction returned an unexpected result: {0}")]
    InvalidReturnType(String),

    #[error("Authorization lookup failed: {0}")]
    Authorization(#[from] AuthError),

    #[error("Document store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => WorkflowError::NotFound { kind, id },
            StoreError::InvalidId {
                kind: DocumentKind::Template,
                id,
            } => WorkflowError::InvalidTemplateId(id),
            other => WorkflowError::Store(other),
        }
    }
}

impl WorkflowError {
    pub fn unauthorized(operation: Operation) -> Self {
        Self::Unauthorized { operation }
    }

    /// The error signalling that a version is already in `status`.
    pub fn for_final_status(status: ApprovalStatus) -> Option<Self> {
        match status {
            ApprovalStatus::Approved => Some(Self::VersionIsApproved),
            ApprovalStatus::Rejected => Some(Self::VersionIsRejected),
            ApprovalStatus::Canceled => Some(Self::VersionIsCanceled),
            ApprovalStatus::Pending => None,
        }
    }

    /// Whether this error reports that `operation` has already been applied.
    ///
    /// Approving an approved version or rejecting a rejected one changes nothing and is treated
    /// as success by callers. Reaching a different final state is a real conflict.
    pub fn is_already_applied(&self, operation: Operation) -> bool {
        matches!(
            (self, operation),
            (WorkflowError::VersionIsApproved, Operation::Approve)
                | (WorkflowError::VersionIsRejected, Operation::Reject)
        )
    }

    /// A short label for metrics.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_)
            | WorkflowError::InvalidTemplateId(_)
            | WorkflowError::TemplateIsHidden
            | WorkflowError::VisibilityCanNotBeDemoted { .. } => "invalid",
            WorkflowError::Unauthorized { .. } => "unauthorized",
            WorkflowError::VersionIsApproved
            | WorkflowError::VersionIsRejected
            | WorkflowError::VersionIsCanceled => "conflict",
            WorkflowError::NotFound { .. } => "not_found",
            WorkflowError::NotificationFailed { .. } => "notification_failed",
            WorkflowError::InvalidReturnType(_)
            | WorkflowError::Authorization(_)
            | WorkflowError::Store(_) => "error",
        }
    }
}

/// Result alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
