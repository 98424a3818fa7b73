//! HTTP request type definitions
//!
//! Request bodies use camelCase JSON.

use serde::{Deserialize, Serialize};
use template_library_core::ReportConfig;

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

/// Body of create and update requests.
///
/// # Example
///
/// ```json
/// {
///   "name": "Monthly spend",
///   "description": "Spend per service",
///   "visibility": "internal",
///   "categories": ["finops"],
///   "cloud": ["google-cloud"],
///   "config": { "rows": ["service"], "timeInterval": "month" }
/// }
/// ```
///
/// Missing `name` and `visibility` deserialize to empty strings so that the workflow reports them
/// as field errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRequestBody {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// One of "private", "internal" or "global"
    #[serde(default)]
    pub visibility: String,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub cloud: Vec<String>,

    /// Report configuration; required, checked by the workflow
    #[serde(default)]
    pub config: Option<ReportConfig>,
}

/// Body of reject requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectTemplateRequest {
    /// Reviewer comment sent to the author; a missing or blank comment is refused with a field
    /// error
    #[serde(default)]
    pub comment: String,
}
