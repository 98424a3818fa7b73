//! Translation between HTTP types and workflow types
//!
//! Translation happens at the API boundary. Request shape problems the workflow does not check
//! (a blank reject comment, an unusable identity) are rejected here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use template_library_core::{
    Actor, Operation, TemplateData, TemplateRequest, TemplateWithVersion, WorkflowResult,
};

use crate::{
    errors::ApiError,
    middleware::AuthContext,
    models::{request::*, response::*},
};

#[cfg(test)]
#[path = "translation_tests.rs"]
mod tests;

/// Convert the authenticated caller to a workflow actor.
pub fn auth_context_to_actor(auth: &AuthContext) -> Result<Actor, ApiError> {
    Actor::new(auth.email.clone(), auth.is_internal_staff)
        .map_err(|e| ApiError::validation_error("email", e.to_string()))
}

/// Convert an HTTP create/update body to a workflow request.
///
/// Content checks (config, visibility, name) are left to the workflow so that create and update
/// report them identically.
pub fn http_template_request_to_domain(body: TemplateRequestBody) -> TemplateRequest {
    TemplateRequest {
        name: body.name,
        description: body.description,
        visibility: body.visibility,
        categories: body.categories,
        cloud: body.cloud,
        config: body.config,
    }
}

/// Extract the reviewer comment, which must not be blank.
pub fn http_reject_request_to_comment(body: RejectTemplateRequest) -> Result<String, ApiError> {
    let comment = body.comment.trim();
    if comment.is_empty() {
        return Err(ApiError::validation_error(
            "comment",
            "Field 'comment' cannot be empty",
        ));
    }
    Ok(comment.to_string())
}

pub fn domain_template_with_version_to_http(
    result: TemplateWithVersion,
) -> TemplateWithVersionResponse {
    TemplateWithVersionResponse {
        template: result.template,
        last_version: result.last_version,
    }
}

pub fn domain_template_data_to_http(data: TemplateData) -> TemplateDataResponse {
    TemplateDataResponse {
        templates: data.templates,
        versions: data.versions,
    }
}

/// Build the response for an approve or reject.
///
/// Repeating a review that already took effect answers 200 with an empty body.
pub fn review_result_to_response(
    result: WorkflowResult<TemplateWithVersion>,
    operation: Operation,
) -> Result<Response, ApiError> {
    match result {
        Ok(reviewed) => Ok(Json(domain_template_with_version_to_http(reviewed)).into_response()),
        Err(err) if err.is_already_applied(operation) => {
            tracing::info!(
                operation = %operation,
                "Review was already applied, nothing changed"
            );
            Ok(StatusCode::OK.into_response())
        }
        Err(err) => Err(err.into()),
    }
}
