//! Error handling and HTTP error conversion
//!
//! Workflow errors are translated to HTTP responses at this boundary. Client-correctable
//! problems keep their message and field detail; store and internal failures are reported with
//! a generic message and only logged in full.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use template_library_core::WorkflowError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Standard error response for all API errors.
///
/// All error responses follow this consistent structure to provide
/// machine-readable error codes and human-readable messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetails,
}

/// Error details structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional context (optional, type varies by error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            error: ErrorDetails {
                code: code.to_string(),
                message: message.into(),
                details,
            },
        }
    }
}

/// Errors returned by handlers.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler() -> Result<Json<TemplateWithVersion>, ApiError> {
///     let result = library.approve_template(&actor, &id).await?;
///     Ok(Json(result))
/// }
/// ```
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Create a validation error with field information
    pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    fn convert(&self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::Workflow(err) => convert_workflow_error(err),
            ApiError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(
                    "ValidationError",
                    self.to_string(),
                    Some(json!({ "fields": [{ "field": field, "message": message }] })),
                ),
            ),
            ApiError::Internal(_) => internal_error(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.convert();

        // Log error server-side
        log_error(&self, status);

        (status, Json(error_response)).into_response()
    }
}

/// Convert a workflow error to an HTTP status code and error response.
pub(crate) fn convert_workflow_error(error: &WorkflowError) -> (StatusCode, ErrorResponse) {
    let message = error.to_string();
    match error {
        WorkflowError::Validation(validation) => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(
                "ValidationError",
                message,
                Some(json!({ "fields": validation.field_errors() })),
            ),
        ),
        WorkflowError::InvalidTemplateId(_) => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(
                "ValidationError",
                message.clone(),
                Some(json!({ "fields": [{ "field": "templateId", "message": message }] })),
            ),
        ),
        WorkflowError::TemplateIsHidden => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("TemplateHidden", message, None),
        ),
        WorkflowError::VisibilityCanNotBeDemoted { from, to } => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(
                "VisibilityDemotion",
                message,
                Some(json!({ "from": from.to_string(), "to": to.to_string() })),
            ),
        ),
        WorkflowError::Unauthorized { operation } => (
            StatusCode::FORBIDDEN,
            ErrorResponse::new(
                "AuthorizationError",
                message,
                Some(json!({ "operation": operation.as_str() })),
            ),
        ),
        WorkflowError::VersionIsApproved
        | WorkflowError::VersionIsRejected
        | WorkflowError::VersionIsCanceled => (
            StatusCode::CONFLICT,
            ErrorResponse::new("VersionConflict", message, None),
        ),
        WorkflowError::NotFound { kind, id } => (
            StatusCode::NOT_FOUND,
            ErrorResponse::new(
                "NotFound",
                message,
                Some(json!({ "kind": kind.to_string(), "id": id })),
            ),
        ),
        WorkflowError::NotificationFailed { failures } => (
            StatusCode::BAD_GATEWAY,
            ErrorResponse::new(
                "NotificationError",
                "The change was saved, but notifications could not be delivered",
                Some(json!({ "failedNotifications": failures.len() })),
            ),
        ),
        WorkflowError::InvalidReturnType(_)
        | WorkflowError::Authorization(_)
        | WorkflowError::Store(_) => internal_error(),
    }
}

fn internal_error() -> (StatusCode, ErrorResponse) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse::new("InternalError", "An internal error occurred", None),
    )
}

/// Log error with appropriate level based on HTTP status
fn log_error(error: &ApiError, status: StatusCode) {
    match status {
        StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY => {
            tracing::error!("API error: {} - {}", status, error);
        }
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
            tracing::warn!("API error: {} - {}", status, error);
        }
        _ => {
            tracing::info!("API error: {} - {}", status, error);
        }
    }
}
