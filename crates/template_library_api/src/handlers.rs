//! HTTP request handlers
//!
//! This module contains all request handlers for the REST API endpoints.
//!
//! # Architecture
//!
//! Each handler:
//! 1. Extracts the caller, path parameters and body
//! 2. Translates HTTP types to workflow types
//! 3. Calls the template library
//! 4. Translates the result to an HTTP response

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use prometheus::{Encoder, TextEncoder};
use template_library_core::Operation;

use crate::{
    errors::ApiError,
    middleware::AuthContext,
    models::{request::*, response::*},
    translation::*,
    AppState,
};

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;

/// POST /api/v1/templates
///
/// Create a template with its first version.
pub async fn create_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<TemplateRequestBody>,
) -> Result<(StatusCode, Json<TemplateWithVersionResponse>), ApiError> {
    let actor = auth_context_to_actor(&auth)?;

    let created = state
        .library
        .create_template(&actor, http_template_request_to_domain(body))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(domain_template_with_version_to_http(created)),
    ))
}

/// PUT /api/v1/templates/:id
///
/// Edit the version under review, or fork a new version from the published one.
pub async fn update_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(template_id): Path<String>,
    Json(body): Json<TemplateRequestBody>,
) -> Result<Json<TemplateWithVersionResponse>, ApiError> {
    let actor = auth_context_to_actor(&auth)?;

    let updated = state
        .library
        .update_template(&actor, &template_id, http_template_request_to_domain(body))
        .await?;

    Ok(Json(domain_template_with_version_to_http(updated)))
}

/// POST /api/v1/templates/:id/approve
pub async fn approve_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(template_id): Path<String>,
) -> Result<Response, ApiError> {
    let actor = auth_context_to_actor(&auth)?;

    let result = state.library.approve_template(&actor, &template_id).await;

    review_result_to_response(result, Operation::Approve)
}

/// POST /api/v1/templates/:id/reject
pub async fn reject_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(template_id): Path<String>,
    Json(body): Json<RejectTemplateRequest>,
) -> Result<Response, ApiError> {
    let actor = auth_context_to_actor(&auth)?;
    let comment = http_reject_request_to_comment(body)?;

    let result = state
        .library
        .reject_template(&actor, &template_id, &comment)
        .await;

    review_result_to_response(result, Operation::Reject)
}

/// DELETE /api/v1/templates/:id
///
/// Hide the template. Hiding an already hidden template succeeds without changes.
pub async fn delete_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(template_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = auth_context_to_actor(&auth)?;

    state.library.delete_template(&actor, &template_id).await?;

    Ok(StatusCode::OK)
}

/// GET /api/v1/templates
///
/// Internal staff see every template's latest version; everyone else sees published versions.
pub async fn list_templates(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<TemplateDataResponse>, ApiError> {
    let data = state
        .library
        .get_template_data(auth.is_internal_staff)
        .await?;

    Ok(Json(domain_template_data_to_http(data)))
}

/// GET /api/v1/templates/:id/report
///
/// The report bound to the version the caller may see.
pub async fn get_template_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(template_id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = state
        .library
        .get_template_report(&template_id, auth.is_internal_staff)
        .await?;

    Ok(Json(report.into()))
}

/// GET /api/v1/metrics
///
/// Prometheus text exposition of the workflow metrics.
pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&state.registry.gather(), &mut buffer)
        .map_err(|e| ApiError::internal(format!("Failed to encode metrics: {e}")))?;

    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response())
}

/// GET /api/v1/health
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
