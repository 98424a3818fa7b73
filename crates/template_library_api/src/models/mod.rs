//! HTTP request and response models
//!
//! These types are distinct from the workflow types and exist only in the HTTP layer.

pub mod request;
pub mod response;

// Re-export commonly used types
pub use request::{RejectTemplateRequest, TemplateRequestBody};
pub use response::{
    HealthCheckResponse, ReportResponse, TemplateDataResponse, TemplateWithVersionResponse,
};
