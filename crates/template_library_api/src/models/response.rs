//! HTTP response type definitions
//!
//! Response types are built from workflow results and serialized as camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use template_library_core::{Report, ReportConfig, Template, Version};

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;

/// A template together with its newest version.
///
/// Returned by create, update, approve and reject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateWithVersionResponse {
    pub template: Template,
    pub last_version: Version,
}

/// Templates visible to the caller, with the version each one shows.
///
/// `versions[i]` belongs to `templates[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDataResponse {
    pub templates: Vec<Template>,
    pub versions: Vec<Version>,
}

/// The saved report behind a template version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: String,
    pub name: String,
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ReportConfig>,

    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            id: report.reference.id.as_str().to_string(),
            name: report.name,
            description: report.description,
            config: report.config,
            time_created: report.time_created,
            time_modified: report.time_modified,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    /// Service status: "healthy" or "unhealthy"
    pub status: String,

    /// Service version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Current timestamp (ISO 8601)
    pub timestamp: String,
}
