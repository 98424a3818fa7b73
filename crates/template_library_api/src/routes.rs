//! HTTP routing configuration
//!
//! # Route Structure
//!
//! All routes are prefixed with `/api/v1`:
//!
//! - GET    /api/v1/templates - List templates visible to the caller
//! - POST   /api/v1/templates - Create template
//! - PUT    /api/v1/templates/:id - Update template
//! - DELETE /api/v1/templates/:id - Hide template
//! - POST   /api/v1/templates/:id/approve - Approve the version under review
//! - POST   /api/v1/templates/:id/reject - Reject the version under review
//! - GET    /api/v1/templates/:id/report - Report of the visible version
//! - GET    /api/v1/health - Health check
//! - GET    /api/v1/metrics - Prometheus metrics
//!
//! # Authentication
//!
//! Every `/templates` route requires a bearer token. `/health` and `/metrics` do not, so that
//! load balancers and Prometheus can scrape them without credentials. The metrics carry counts per
//! operation and outcome only, never template ids or e-mail addresses. Deployments that must not
//! expose them should block `/api/v1/metrics` at the ingress.

use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{handlers, middleware as api_middleware, AppState};

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;

/// Create the complete API router with all routes configured.
///
/// This function sets up:
/// - All endpoint routes
/// - Authentication middleware on the template routes
/// - CORS configuration
/// - Request tracing
/// - Timeout handling
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    // Configure CORS for web UI support
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([HeaderName::from_static(api_middleware::REQUEST_ID_HEADER)])
        .allow_credentials(false)
        // Cache preflight responses for 1 hour
        .max_age(Duration::from_secs(3600));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().include_headers(true))
        .on_response(DefaultOnResponse::new().include_headers(true));

    let timeout_layer = TimeoutLayer::new(request_timeout);

    // Protected API routes (require authentication)
    let protected_routes = template_routes().layer(middleware::from_fn_with_state(
        state.clone(),
        api_middleware::auth_middleware,
    ));

    let api_v1 = Router::new()
        .merge(protected_routes)
        // Unauthenticated; see the module docs
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(api_middleware::tracing_middleware))
        .layer(timeout_layer)
        .layer(trace_layer)
        .layer(cors)
        .with_state(state);

    // Root router with API version prefix
    Router::new().nest("/api/v1", api_v1)
}

fn template_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/templates",
            get(handlers::list_templates).post(handlers::create_template),
        )
        .route(
            "/templates/:id",
            put(handlers::update_template).delete(handlers::delete_template),
        )
        .route("/templates/:id/approve", post(handlers::approve_template))
        .route("/templates/:id/reject", post(handlers::reject_template))
        .route("/templates/:id/report", get(handlers::get_template_report))
}
