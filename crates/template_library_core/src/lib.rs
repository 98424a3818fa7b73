//! # Template Library Core
//!
//! The approval and versioning workflow of the report template library.
//!
//! A template owns a chain of versions. Each version binds a saved report, a visibility and a
//! review record. Versions start out pending and are approved or rejected by template library
//! admins; private versions and changes made by admins are approved on the spot. Approving a
//! version publishes it as the template's active version.
//!
//! ## Operations
//!
//! [`TemplateLibrary`] exposes the operations:
//! - [`TemplateLibrary::create_template`]
//! - [`TemplateLibrary::update_template`], which edits a version under review in place and forks
//!   a new version from an approved or canceled one
//! - [`TemplateLibrary::approve_template`] and [`TemplateLibrary::reject_template`]
//! - [`TemplateLibrary::delete_template`], which hides the template
//! - [`TemplateLibrary::get_template_data`] and [`TemplateLibrary::get_template_report`]
//!
//! State changes run inside a store transaction that is retried on conflicting writes, so at most
//! one transition per template wins. Notifications are sent only after the change committed.
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use template_library_core::{
//!     Actor, InMemoryDocumentStore, LoggingNotificationSender, StaticRoleDirectory,
//!     TemplateLibrary, TemplateRequest, TemplateUrls,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryDocumentStore::new("my-project"));
//! let library = TemplateLibrary::new(
//!     store.clone(),
//!     store,
//!     Arc::new(StaticRoleDirectory::new(["admin@example.com"])),
//!     Arc::new(LoggingNotificationSender),
//!     TemplateUrls::new("https://console.example.com")?,
//! );
//!
//! let actor = Actor::new("jane@example.com", false)?;
//! let request: TemplateRequest = serde_json::from_str(
//!     r#"{"name": "Spend", "visibility": "private", "config": {"rows": ["service"]}}"#,
//! )?;
//! let created = library.create_template(&actor, request).await?;
//! println!("created template {}", created.template.id());
//! # Ok(())
//! # }
//! ```

pub mod approval;
pub use approval::{is_auto_approve, UpdateBranch};

mod create;
mod delete;

pub mod errors;
pub use errors::{FieldError, Operation, ValidationError, WorkflowError, WorkflowResult};

pub mod library;
pub use library::{TemplateLibrary, WorkflowSettings};

pub mod metrics;
pub use metrics::{NoOpWorkflowMetrics, PrometheusWorkflowMetrics, WorkflowMetrics};

pub mod notifications;
pub use notifications::{
    compute_hmac_sha256, LoggingNotificationSender, Notification, NotificationError,
    NotificationKind, NotificationPolicy, NotificationSender, Recipient, TemplateUrls,
    WebhookNotificationSender,
};

pub mod permissions;
pub use permissions::{can_delete, can_update, DeleteCheck};

mod read;
pub use read::TemplateData;

mod review;
mod transition;
pub use transition::TemplateWithVersion;

mod update;

pub mod validation;
pub use validation::{
    validate_request, ReportConfigValidator, StructuralConfigValidator, TemplateRequest,
    ValidatedRequest,
};

pub mod visibility;
pub use visibility::{can_change_visibility, collaborators_for};

pub use auth_handler::{Actor, AuthError, AuthorizationOracle, Capability, StaticRoleDirectory};
pub use template_store::{
    Approval, ApprovalStatus, ChangeMessage, Collaborator, CollaboratorRole, DocumentKind,
    InMemoryDocumentStore, Report, ReportConfig, ReportId, ReportRef, ReportStore, RetryPolicy,
    StoreError, Template, TemplateId, TemplateRef, TemplateStore, Version, VersionId, VersionRef,
    Visibility,
};

#[cfg(test)]
pub(crate) mod test_support;
