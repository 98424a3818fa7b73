use super::*;
use crate::test_support::request;
use serde_json::json;
use template_store::{MetadataFieldType, OptionalField};

fn config(settings: Value) -> ReportConfig {
    serde_json::from_value(settings).expect("config")
}

struct RejectEverything;

#[async_trait]
impl ReportConfigValidator for RejectEverything {
    async fn validate(&self, _config: &ReportConfig) -> Vec<FieldError> {
        vec![FieldError::new("field", "msg")]
    }
}

#[tokio::test]
async fn test_valid_request_is_normalized() {
    let mut req = request("global");
    req.name = "  Monthly spend ".to_string();

    let validated = validate_request(req, &StructuralConfigValidator)
        .await
        .expect("valid");

    assert_eq!(validated.name, "Monthly spend");
    assert_eq!(validated.visibility, Visibility::Global);
}

#[tokio::test]
async fn test_missing_config() {
    let mut req = request("private");
    req.config = None;

    let result = validate_request(req, &StructuralConfigValidator).await;

    assert_eq!(result, Err(ValidationError::NoConfig));
}

#[tokio::test]
async fn test_validator_field_errors_are_returned() {
    let result = validate_request(request("private"), &RejectEverything).await;

    assert_eq!(
        result,
        Err(ValidationError::InvalidConfig {
            fields: vec![FieldError::new("field", "msg")]
        })
    );
}

#[tokio::test]
async fn test_custom_metric_is_rejected() {
    let mut req = request("private");
    if let Some(config) = req.config.as_mut() {
        config.calculated_metric = Some("metric".to_string());
    }

    let result = validate_request(req, &StructuralConfigValidator).await;

    assert_eq!(result, Err(ValidationError::CustomMetric));
}

#[tokio::test]
async fn test_labels_project_labels_and_tags_are_rejected() {
    for field_type in [
        MetadataFieldType::Label,
        MetadataFieldType::ProjectLabel,
        MetadataFieldType::Tag,
    ] {
        let mut req = request("private");
        if let Some(config) = req.config.as_mut() {
            config.optional = vec![OptionalField {
                key: "env".to_string(),
                field_type,
            }];
        }

        let result = validate_request(req, &StructuralConfigValidator).await;

        assert_eq!(
            result,
            Err(ValidationError::CustomLabel {
                key: "env".to_string()
            }),
            "{field_type:?}"
        );
    }
}

#[tokio::test]
async fn test_system_labels_are_shareable() {
    let mut req = request("global");
    if let Some(config) = req.config.as_mut() {
        config.optional = vec![OptionalField {
            key: "goog-k8s-cluster-name".to_string(),
            field_type: MetadataFieldType::SystemLabel,
        }];
    }

    assert!(validate_request(req, &StructuralConfigValidator)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_unknown_visibility() {
    let result = validate_request(request("public"), &StructuralConfigValidator).await;

    assert_eq!(
        result,
        Err(ValidationError::InvalidVisibility("public".to_string()))
    );
}

#[tokio::test]
async fn test_blank_name() {
    let mut req = request("internal");
    req.name = "   ".to_string();

    let result = validate_request(req, &StructuralConfigValidator).await;

    assert_eq!(result, Err(ValidationError::empty_field("name")));
}

#[tokio::test]
async fn test_config_is_checked_before_visibility() {
    let mut req = request("nonsense");
    req.config = None;

    let result = validate_request(req, &StructuralConfigValidator).await;

    assert_eq!(result, Err(ValidationError::NoConfig));
}

// ============================================================================
// StructuralConfigValidator
// ============================================================================

#[tokio::test]
async fn test_structural_validator_accepts_well_formed_config() {
    let cfg = config(json!({
        "rows": ["service_description"],
        "cols": ["year", "month"],
        "filters": [{"id": "fixed:cloud_provider", "values": ["google-cloud"]}],
        "timeInterval": "month"
    }));

    assert!(StructuralConfigValidator.validate(&cfg).await.is_empty());
}

#[tokio::test]
async fn test_structural_validator_reports_each_bad_field() {
    let cfg = config(json!({
        "rows": "service",
        "cols": [1, 2],
        "filters": [{"id": "ok"}, {"values": []}, {"id": "  "}],
        "timeInterval": "fortnight"
    }));

    let fields: Vec<String> = StructuralConfigValidator
        .validate(&cfg)
        .await
        .into_iter()
        .map(|e| e.field)
        .collect();

    assert_eq!(
        fields,
        vec!["rows", "cols", "filters[1].id", "filters[2].id", "timeInterval"]
    );
}

#[tokio::test]
async fn test_structural_validator_rejects_non_list_filters() {
    let cfg = config(json!({"filters": {"id": "x"}}));

    let errors = StructuralConfigValidator.validate(&cfg).await;

    assert_eq!(errors, vec![FieldError::new("filters", "must be a list")]);
}
