//! Test fixtures for integration tests.
//!
//! Identities and request bodies shared by the scenarios, so every test builds templates the
//! same way.

use auth_handler::Actor;
use serde_json::json;
use template_library_core::TemplateRequest;

/// Template library admin.
pub const ADMIN: &str = "admin@example.com";

/// Second admin, for reviews racing each other.
pub const SECOND_ADMIN: &str = "lead@example.com";

/// Customer who authors templates.
pub const AUTHOR: &str = "author@example.com";

/// Customer with no relation to the templates under test.
pub const OTHER: &str = "other@example.com";

/// Internal staff member without admin rights.
pub const STAFF: &str = "staff@example.com";

/// Admins configured in every test library.
pub const ADMINS: [&str; 2] = [ADMIN, SECOND_ADMIN];

/// Builds an actor, panicking on an invalid e-mail.
pub fn actor(email: &str, is_internal_staff: bool) -> Actor {
    Actor::new(email, is_internal_staff).expect("valid test identity")
}

/// A request that passes validation.
pub fn template_request(name: &str, visibility: &str) -> TemplateRequest {
    serde_json::from_value(json!({
        "name": name,
        "description": "Spend broken down by service",
        "visibility": visibility,
        "categories": ["finops"],
        "cloud": ["google-cloud"],
        "config": {
            "rows": ["service"],
            "cols": ["month"],
            "timeInterval": "month",
            "filters": [{ "id": "fixed:cloud_provider" }]
        }
    }))
    .expect("valid template request")
}
