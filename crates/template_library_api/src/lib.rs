//! Template Library REST API
//!
//! This crate exposes the report template library workflow over HTTP.
//!
//! # Architecture
//!
//! This crate exists in the HTTP layer and handles:
//! - HTTP request/response translation
//! - Bearer token authentication
//! - Error mapping from workflow errors to HTTP responses
//! - Routing, configuration and server startup
//!
//! Business logic lives in `template_library_core`. The dependency flows HTTP API → business
//! logic, never the reverse.

use std::sync::Arc;

use prometheus::Registry;
use template_library_core::TemplateLibrary;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod translation;

// Re-export key types for convenience
pub use config::{AppConfig, ConfigError, LogFormat};
pub use errors::{ApiError, ErrorResponse};
pub use middleware::{AuthContext, Claims, TokenVerifier};
pub use models::{request, response};
pub use server::{ApiConfig, ApiServer};

#[cfg(test)]
pub(crate) mod test_support;

/// API version
pub const API_VERSION: &str = "v1";

/// Default API port
pub const DEFAULT_PORT: u16 = 8080;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<TemplateLibrary>,

    /// Registry served by the metrics endpoint.
    pub registry: Registry,

    pub tokens: TokenVerifier,
}

impl AppState {
    pub fn new(library: Arc<TemplateLibrary>, registry: Registry, tokens: TokenVerifier) -> Self {
        Self {
            library,
            registry,
            tokens,
        }
    }
}
