//! Authentication and request tracing middleware
//!
//! Callers authenticate with an HS256-signed bearer token. The token's subject is the caller's
//! e-mail and its `internal_staff` claim marks internal staff, who see and may fork versions
//! still under review.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use template_library_core::Actor;

use crate::{errors::ErrorResponse, AppState};

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod tests;

/// Header carrying the per-request id on responses.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Claims expected in caller tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Caller e-mail.
    pub sub: String,

    /// Expiry, seconds since the epoch.
    pub exp: u64,

    #[serde(default)]
    pub internal_staff: bool,
}

/// Authentication context attached to requests after successful authentication.
///
/// This is stored in request extensions and can be extracted by handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub email: String,
    pub is_internal_staff: bool,
}

/// Verifies caller tokens against the configured signing secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Decodes `token` and checks that its subject is a usable identity.
    pub fn verify(&self, token: &str) -> Result<AuthContext, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::warn!("Token validation failed: {}", e);
            AuthError::InvalidToken
        })?;

        let actor = Actor::new(data.claims.sub, data.claims.internal_staff).map_err(|e| {
            tracing::warn!("Token subject rejected: {}", e);
            AuthError::InvalidIdentity
        })?;

        Ok(AuthContext {
            email: actor.email().to_string(),
            is_internal_staff: actor.is_internal_staff(),
        })
    }
}

/// Authentication middleware that validates Bearer tokens.
///
/// Returns 401 if the Authorization header is missing or malformed, or if the token fails
/// verification.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/templates", post(create_template))
///     .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    // Extract Authorization header
    let auth_header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    // Validate Bearer token format
    let token = extract_bearer_token(auth_header)?;

    let auth_context = state.tokens.verify(&token)?;

    tracing::debug!(
        email = %auth_context.email,
        internal_staff = auth_context.is_internal_staff,
        "Token validated"
    );

    // Attach context to request extensions
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

/// Extract Bearer token from Authorization header.
///
/// Expected format: "Bearer <token>"
fn extract_bearer_token(auth_header: &str) -> Result<String, AuthError> {
    let parts: Vec<&str> = auth_header.split_whitespace().collect();

    if parts.len() != 2 {
        return Err(AuthError::InvalidFormat);
    }

    if parts[0].to_lowercase() != "bearer" {
        return Err(AuthError::InvalidScheme);
    }

    Ok(parts[1].to_string())
}

/// Request tracing middleware.
///
/// Logs the start and end of every request under one request id. An id supplied by the caller in
/// `x-request-id` is kept; otherwise a new one is generated. The id is echoed on the response.
pub async fn tracing_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty() && value.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::info!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        "Request started"
    );

    let mut response = next.run(request).await;

    tracing::info!(
        request_id = %request_id,
        status = response.status().as_u16(),
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Authentication errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Authorization header is missing
    MissingToken,

    /// Authorization header format is invalid
    InvalidFormat,

    /// Authorization scheme is not "Bearer"
    InvalidScheme,

    /// Signature, expiry or claims did not validate
    InvalidToken,

    /// The token subject is not a valid e-mail
    InvalidIdentity,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (message, details) = match self {
            AuthError::MissingToken => (
                "Authentication required. Provide a valid Bearer token in the Authorization header.",
                Some(json!({
                    "header": "Authorization",
                    "scheme": "Bearer"
                })),
            ),
            AuthError::InvalidFormat => (
                "Invalid Authorization header format. Expected: 'Bearer <token>'",
                Some(json!({
                    "header": "Authorization",
                    "expected_format": "Bearer <token>"
                })),
            ),
            AuthError::InvalidScheme => (
                "Invalid authorization scheme. Only 'Bearer' tokens are supported.",
                Some(json!({
                    "header": "Authorization",
                    "supported_scheme": "Bearer"
                })),
            ),
            AuthError::InvalidToken => ("Invalid or expired authentication token", None),
            AuthError::InvalidIdentity => ("Token subject is not a valid e-mail address", None),
        };

        let error_response = ErrorResponse::new("AuthenticationError", message, details);

        (StatusCode::UNAUTHORIZED, Json(error_response)).into_response()
    }
}
