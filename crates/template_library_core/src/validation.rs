//! Validation of template create and update requests.
//!
//! A request is checked in this order: the report config must be present, must pass the report
//! config validator, and must not depend on customer-specific metrics or labels; then the
//! visibility must name a known level and the template must have a name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use template_store::{ReportConfig, Visibility};

use crate::errors::{FieldError, ValidationError};

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;

/// Payload of a create or update request, as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub cloud: Vec<String>,
    #[serde(default)]
    pub config: Option<ReportConfig>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub categories: Vec<String>,
    pub cloud: Vec<String>,
    pub config: ReportConfig,
}

/// Validates the structure of a report configuration.
///
/// Returns one entry per invalid field; an empty list means the config is valid.
#[async_trait]
pub trait ReportConfigValidator: Send + Sync {
    async fn validate(&self, config: &ReportConfig) -> Vec<FieldError>;
}

const TIME_INTERVALS: &[&str] = &["hour", "day", "week", "month", "quarter", "year"];

/// Checks the shape of the report config fields the library passes through untyped.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralConfigValidator;

impl StructuralConfigValidator {
    fn check_string_list(settings: &serde_json::Map<String, Value>, field: &str) -> Option<FieldError> {
        match settings.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) if items.iter().all(Value::is_string) => None,
            Some(_) => Some(FieldError::new(field, "must be a list of strings")),
        }
    }

    fn check_filters(settings: &serde_json::Map<String, Value>) -> Vec<FieldError> {
        let filters = match settings.get("filters") {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(filters)) => filters,
            Some(_) => return vec![FieldError::new("filters", "must be a list")],
        };

        filters
            .iter()
            .enumerate()
            .filter_map(|(index, filter)| {
                let has_id = filter
                    .get("id")
                    .and_then(Value::as_str)
                    .is_some_and(|id| !id.trim().is_empty());
                (!has_id).then(|| FieldError::new(format!("filters[{index}].id"), "is required"))
            })
            .collect()
    }
}

#[async_trait]
impl ReportConfigValidator for StructuralConfigValidator {
    async fn validate(&self, config: &ReportConfig) -> Vec<FieldError> {
        let settings = &config.settings;
        let mut errors: Vec<FieldError> = ["rows", "cols"]
            .iter()
            .filter_map(|field| Self::check_string_list(settings, field))
            .collect();

        errors.extend(Self::check_filters(settings));

        if let Some(interval) = settings.get("timeInterval") {
            let known = interval
                .as_str()
                .is_some_and(|value| TIME_INTERVALS.contains(&value));
            if !known {
                errors.push(FieldError::new(
                    "timeInterval",
                    format!("must be one of: {}", TIME_INTERVALS.join(", ")),
                ));
            }
        }

        errors
    }
}

/// Rejects configs that reference data only one customer has.
fn check_shareable(config: &ReportConfig) -> Result<(), ValidationError> {
    if config.calculated_metric.is_some() {
        return Err(ValidationError::CustomMetric);
    }

    if let Some(field) = config
        .optional
        .iter()
        .find(|field| field.field_type.is_customer_label())
    {
        return Err(ValidationError::CustomLabel {
            key: field.key.clone(),
        });
    }

    Ok(())
}

/// Validates a create or update request.
///
/// # Errors
///
/// - `ValidationError::NoConfig` if the request carries no report config
/// - `ValidationError::InvalidConfig` with the validator's field errors
/// - `ValidationError::CustomMetric` / `ValidationError::CustomLabel` for unshareable configs
/// - `ValidationError::InvalidVisibility` for an unknown visibility
/// - `ValidationError::EmptyField` for a blank name
pub async fn validate_request(
    request: TemplateRequest,
    validator: &dyn ReportConfigValidator,
) -> Result<ValidatedRequest, ValidationError> {
    let config = request.config.ok_or(ValidationError::NoConfig)?;

    let fields = validator.validate(&config).await;
    if !fields.is_empty() {
        return Err(ValidationError::InvalidConfig { fields });
    }

    check_shareable(&config)?;

    let visibility = request
        .visibility
        .parse::<Visibility>()
        .map_err(|err| ValidationError::InvalidVisibility(err.0))?;

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(ValidationError::empty_field("name"));
    }

    Ok(ValidatedRequest {
        name,
        description: request.description,
        visibility,
        categories: request.categories,
        cloud: request.cloud,
        config,
    })
}
