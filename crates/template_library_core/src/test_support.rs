//! Fixtures and hand-written mocks shared by the unit tests of this crate.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use auth_handler::{Actor, AuthError, AuthResult, AuthorizationOracle, Capability};
use chrono::Utc;
use serde_json::json;
use template_store::{
    Approval, ApprovalStatus, DocumentRoot, InMemoryDocumentStore, ReportConfig, ReportId,
    StoreTransaction, Template, TemplateId, TemplateStore, Version, VersionId, Visibility,
};

use crate::errors::Operation;
use crate::library::{TemplateLibrary, WorkflowSettings};
use crate::metrics::WorkflowMetrics;
use crate::notifications::{
    Notification, NotificationError, NotificationKind, NotificationSender, Recipient, TemplateUrls,
};
use crate::transition::{TemplateWithVersion, TransitionContext};
use crate::validation::{TemplateRequest, ValidatedRequest};
use crate::visibility::collaborators_for;

pub(crate) const AUTHOR: &str = "author@example.com";
pub(crate) const ADMIN: &str = "admin@example.com";
pub(crate) const OTHER: &str = "other@example.com";
pub(crate) const STAFF: &str = "staff@example.com";
pub(crate) const PROJECT: &str = "test-project";
pub(crate) const CONSOLE: &str = "https://console.example.com";

pub(crate) fn actor(email: &str, is_internal_staff: bool) -> Actor {
    Actor::new(email, is_internal_staff).expect("valid actor")
}

pub(crate) fn report_config() -> ReportConfig {
    serde_json::from_value(json!({
        "rows": ["service_description"],
        "cols": ["year", "month"],
        "timeInterval": "month"
    }))
    .expect("config")
}

pub(crate) fn request(visibility: &str) -> TemplateRequest {
    TemplateRequest {
        name: "Monthly spend".to_string(),
        description: "Spend per service per month".to_string(),
        visibility: visibility.to_string(),
        categories: vec!["cost".to_string()],
        cloud: vec!["google-cloud".to_string()],
        config: Some(report_config()),
    }
}

pub(crate) fn validated(visibility: Visibility) -> ValidatedRequest {
    ValidatedRequest {
        name: "Monthly spend".to_string(),
        description: "Spend per service per month".to_string(),
        visibility,
        categories: vec!["cost".to_string()],
        cloud: vec!["google-cloud".to_string()],
        config: report_config(),
    }
}

/// Version `0` of template `tmpl-1`, created by [`AUTHOR`].
pub(crate) fn version_with(status: ApprovalStatus, visibility: Visibility) -> Version {
    let root = DocumentRoot::new(PROJECT);
    let template_id = TemplateId::new("tmpl-1").expect("id");
    let now = Utc::now();
    Version {
        reference: root.version_ref(&template_id, VersionId::first()),
        template: root.template_ref(&template_id),
        report: root.report_ref(&ReportId::new("report-1").expect("id")),
        previous_version: None,
        created_by: AUTHOR.to_string(),
        approval: Approval {
            status,
            ..Approval::pending()
        },
        active: false,
        visibility,
        collaborators: collaborators_for(visibility, AUTHOR),
        categories: Vec::new(),
        cloud: Vec::new(),
        time_created: now,
        time_modified: now,
    }
}

pub(crate) fn template_for(version: &Version) -> Template {
    Template {
        reference: version.template.clone(),
        active_report: None,
        active_version: None,
        last_version: version.reference.clone(),
        hidden: false,
        time_created: version.time_created,
        time_modified: version.time_modified,
    }
}

// ============================================================================
// Mocks
// ============================================================================

/// Oracle granting the admin capability to a mutable list of e-mails.
pub(crate) struct MockOracle {
    admins: Mutex<Vec<String>>,
    calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl MockOracle {
    pub fn new(admins: &[&str]) -> Self {
        Self {
            admins: Mutex::new(admins.iter().map(|a| a.to_string()).collect()),
            calls: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthorizationOracle for MockOracle {
    async fn has_capability(&self, email: &str, capability: Capability) -> AuthResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::DirectoryUnavailable("mock outage".to_string()));
        }
        let admins = self.admins.lock().expect("admins");
        Ok(capability == Capability::TemplateLibraryAdmin
            && admins.iter().any(|a| a.eq_ignore_ascii_case(email)))
    }
}

/// Sender recording every notification and failing deliveries to chosen users.
#[derive(Default)]
pub(crate) struct RecordingSender {
    sent: Mutex<Vec<Notification>>,
    failing: Vec<String>,
}

impl RecordingSender {
    pub fn failing_for(emails: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: emails.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("sent").clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.sent.lock().expect("sent").push(notification.clone());
        let fails = notification.recipients.iter().any(|recipient| {
            matches!(recipient, Recipient::User(email) if self.failing.contains(email))
        });
        if fails {
            return Err(NotificationError::Rejected { status: 503 });
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingMetrics {
    transitions: Mutex<Vec<(Operation, String)>>,
    notification_failures: AtomicU64,
    retries: AtomicU64,
}

impl RecordingMetrics {
    pub fn transitions(&self) -> Vec<(Operation, String)> {
        self.transitions.lock().expect("transitions").clone()
    }

    pub fn notification_failures(&self) -> u64 {
        self.notification_failures.load(Ordering::SeqCst)
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::SeqCst)
    }
}

impl WorkflowMetrics for RecordingMetrics {
    fn record_transition(&self, operation: Operation, outcome: &str) {
        self.transitions
            .lock()
            .expect("transitions")
            .push((operation, outcome.to_string()));
    }

    fn record_notification_failure(&self, _kind: NotificationKind) {
        self.notification_failures.fetch_add(1, Ordering::SeqCst);
    }

    fn record_transaction_retries(&self, _operation: Operation, retries: u32) {
        self.retries.fetch_add(u64::from(retries), Ordering::SeqCst);
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A library over an in-memory store with recording collaborators.
pub(crate) struct Harness {
    pub store: Arc<InMemoryDocumentStore>,
    pub oracle: Arc<MockOracle>,
    pub sender: Arc<RecordingSender>,
    pub metrics: Arc<RecordingMetrics>,
    pub urls: TemplateUrls,
    pub library: TemplateLibrary,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(RecordingSender::default(), WorkflowSettings::default())
    }

    pub fn build(sender: RecordingSender, settings: WorkflowSettings) -> Self {
        let store = Arc::new(InMemoryDocumentStore::new(PROJECT));
        let oracle = Arc::new(MockOracle::new(&[ADMIN]));
        let sender = Arc::new(sender);
        let metrics = Arc::new(RecordingMetrics::default());
        let urls = TemplateUrls::new(CONSOLE).expect("console url");
        let library = TemplateLibrary::new(
            store.clone(),
            store.clone(),
            oracle.clone(),
            sender.clone(),
            urls.clone(),
        )
        .with_metrics(metrics.clone())
        .with_settings(settings);

        Self {
            store,
            oracle,
            sender,
            metrics,
            urls,
            library,
        }
    }

    pub fn context<'a>(&'a self, actor: &'a Actor) -> TransitionContext<'a> {
        TransitionContext {
            actor,
            oracle: self.oracle.as_ref(),
            urls: &self.urls,
        }
    }

    /// Creates a template through the library, panicking on failure.
    pub async fn create(&self, email: &str, visibility: &str) -> TemplateWithVersion {
        self.library
            .create_template(&actor(email, false), request(visibility))
            .await
            .expect("create template")
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sender.sent()
    }

    /// Overwrites the review status of a template's last version.
    pub async fn set_last_status(&self, template_id: &TemplateId, status: ApprovalStatus) {
        let mut tx = self.store.begin().await.expect("begin");
        let template = tx.get_template(template_id).await.expect("template");
        let mut last = tx
            .get_version(&template.last_version)
            .await
            .expect("last version");
        last.approval.status = status;
        tx.update_version(&last).expect("stage");
        tx.commit().await.expect("commit");
    }

    pub async fn template(&self, template_id: &TemplateId) -> Template {
        self.store.get_template(template_id).await.expect("template")
    }

    pub async fn versions(&self, template_id: &TemplateId) -> Vec<Version> {
        self.store.versions_of(template_id).expect("versions")
    }
}
