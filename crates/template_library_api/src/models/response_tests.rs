//! Tests for response models

use super::*;
use template_library_core::{ReportId, ReportRef};

#[test]
fn test_report_response_flattens_reference() {
    let now = chrono::Utc::now();
    let report = Report {
        reference: ReportRef {
            id: ReportId::new("report-7").expect("id"),
            name: "projects/p/databases/(default)/documents/dashboards/reports/report-7"
                .to_string(),
        },
        name: "Spend".to_string(),
        description: String::new(),
        config: None,
        time_created: now,
        time_modified: now,
    };

    let json = serde_json::to_value(ReportResponse::from(report)).expect("serialize");

    assert_eq!(json["id"], "report-7");
    assert_eq!(json["name"], "Spend");
    assert!(json.get("config").is_none());
    assert!(json.get("timeCreated").is_some());
}

#[test]
fn test_health_response_omits_missing_version() {
    let response = HealthCheckResponse {
        status: "healthy".to_string(),
        version: None,
        timestamp: "2026-01-01T00:00:00Z".to_string(),
    };

    let json = serde_json::to_value(&response).expect("serialize");

    assert_eq!(json["status"], "healthy");
    assert!(json.get("version").is_none());
}
