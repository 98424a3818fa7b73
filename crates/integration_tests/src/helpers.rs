//! Helper functions for integration tests.
//!
//! [`TestLibrary`] wires a [`TemplateLibrary`] to the in-memory store, a recording notification
//! sender and a Prometheus registry. The `assert_*` functions check the invariants that must
//! hold after every committed transition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use prometheus::Registry;
use template_library_core::{
    Notification, NotificationError, NotificationSender, PrometheusWorkflowMetrics,
    StaticRoleDirectory, TemplateLibrary, TemplateRequest, TemplateUrls, TemplateWithVersion,
    WorkflowSettings,
};
use template_store::{
    DocumentRoot, InMemoryDocumentStore, Report, ReportId, ReportRef, StoreResult,
    StoreTransaction, Template, TemplateId, TemplateRef, TemplateStore, Version, VersionRef,
    Visibility,
};
use tracing::info;

use crate::fixtures::{actor, template_request, ADMINS};

/// Initialize logging for tests
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_test_writer()
        .try_init();
}

/// Notification sender that keeps everything it was asked to deliver.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("sender lock").clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("sender lock")
            .push(notification.clone());
        Ok(())
    }
}

/// A template library over the in-memory store.
pub struct TestLibrary {
    pub store: InMemoryDocumentStore,
    pub library: Arc<TemplateLibrary>,
    pub sender: Arc<RecordingSender>,
    pub registry: Registry,
}

impl TestLibrary {
    pub fn new() -> Self {
        let store = InMemoryDocumentStore::new("integration");
        Self::build(store.clone(), Arc::new(store), WorkflowSettings::default())
    }

    /// Builds a library whose transactions go through `transactions` while checks read `store`.
    pub fn build(
        store: InMemoryDocumentStore,
        transactions: Arc<dyn TemplateStore>,
        settings: WorkflowSettings,
    ) -> Self {
        let sender = Arc::new(RecordingSender::default());
        let registry = Registry::new();
        let metrics = PrometheusWorkflowMetrics::new(&registry).expect("metrics");
        let library = TemplateLibrary::new(
            transactions,
            Arc::new(store.clone()),
            Arc::new(StaticRoleDirectory::new(ADMINS)),
            sender.clone(),
            TemplateUrls::new("https://console.example.com").expect("urls"),
        )
        .with_metrics(Arc::new(metrics))
        .with_settings(settings);

        Self {
            store,
            library: Arc::new(library),
            sender,
            registry,
        }
    }

    /// Creates a template named "Spend" as a non-staff `email`.
    pub async fn create(&self, email: &str, visibility: &str) -> TemplateWithVersion {
        self.create_with(email, template_request("Spend", visibility))
            .await
    }

    pub async fn create_with(&self, email: &str, request: TemplateRequest) -> TemplateWithVersion {
        let created = self
            .library
            .create_template(&actor(email, false), request)
            .await
            .expect("create template");
        info!(template_id = %created.template.id(), "Created test template");
        created
    }

    pub async fn template(&self, id: &TemplateId) -> Template {
        self.store.get_template(id).await.expect("template")
    }

    /// All versions of the template, oldest first.
    pub fn versions(&self, id: &TemplateId) -> Vec<Version> {
        self.store.versions_of(id).expect("versions")
    }

    /// Value of a counter summed over all label sets.
    pub fn counter_total(&self, name: &str) -> f64 {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == name)
            .flat_map(|family| family.get_metric())
            .map(|metric| metric.get_counter().get_value())
            .sum()
    }

    /// Checks every invariant of the template's stored state.
    pub async fn assert_consistent(&self, id: &TemplateId) {
        let template = self.template(id).await;
        let versions = self.versions(id);
        assert_single_active(&template, &versions);
        assert_version_chain(&template, &versions);
    }
}

impl Default for TestLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// At most one version is active, and it is the one the template publishes.
pub fn assert_single_active(template: &Template, versions: &[Version]) {
    let active: Vec<&Version> = versions.iter().filter(|v| v.active).collect();
    assert!(
        active.len() <= 1,
        "template {} has {} active versions",
        template.id(),
        active.len()
    );
    assert_eq!(
        template.active_version.as_ref(),
        active.first().map(|v| &v.reference),
        "template {} points at the wrong active version",
        template.id()
    );
    if let Some(active) = active.first() {
        assert_eq!(template.active_report.as_ref(), Some(&active.report));
    }
}

/// Versions are numbered from "0" in creation order, each links to its predecessor, and
/// visibility only grows along the chain unless the predecessor was private.
pub fn assert_version_chain(template: &Template, versions: &[Version]) {
    for (index, version) in versions.iter().enumerate() {
        assert_eq!(version.id().to_string(), index.to_string());

        match index.checked_sub(1).map(|i| &versions[i]) {
            None => assert!(version.previous_version.is_none()),
            Some(previous) => {
                assert_eq!(version.previous_version.as_ref(), Some(&previous.reference));
                if previous.visibility != Visibility::Private {
                    assert!(
                        version.visibility >= previous.visibility,
                        "visibility demoted from {} to {} on version {}",
                        previous.visibility,
                        version.visibility,
                        version.id()
                    );
                }
            }
        }
    }
    let last = versions.last().expect("at least one version");
    assert_eq!(template.last_version, last.reference);
}

/// A store whose next transaction loses a race once.
///
/// Right before that transaction commits, the template it read first is rewritten by another
/// transaction, so the commit fails with a conflict and the workflow has to retry.
pub struct InterferingStore {
    inner: InMemoryDocumentStore,
    armed: Arc<AtomicBool>,
}

impl InterferingStore {
    pub fn new(inner: InMemoryDocumentStore) -> Self {
        Self {
            inner,
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes the next transaction that reads a template conflict once.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemplateStore for InterferingStore {
    fn root(&self) -> &DocumentRoot {
        self.inner.root()
    }

    async fn get_template(&self, id: &TemplateId) -> StoreResult<Template> {
        self.inner.get_template(id).await
    }

    async fn get_version(&self, reference: &VersionRef) -> StoreResult<Version> {
        self.inner.get_version(reference).await
    }

    async fn get_versions(&self, references: &[VersionRef]) -> StoreResult<Vec<Version>> {
        self.inner.get_versions(references).await
    }

    async fn list_templates(&self, exclude_hidden: bool) -> StoreResult<Vec<Template>> {
        self.inner.list_templates(exclude_hidden).await
    }

    async fn hide_template(&self, id: &TemplateId) -> StoreResult<()> {
        self.inner.hide_template(id).await
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(InterferingTransaction {
            inner: self.inner.begin().await?,
            store: self.inner.clone(),
            armed: self.armed.clone(),
            first_template: None,
        }))
    }
}

struct InterferingTransaction {
    inner: Box<dyn StoreTransaction>,
    store: InMemoryDocumentStore,
    armed: Arc<AtomicBool>,
    first_template: Option<TemplateId>,
}

#[async_trait]
impl StoreTransaction for InterferingTransaction {
    fn root(&self) -> &DocumentRoot {
        self.inner.root()
    }

    async fn get_template(&mut self, id: &TemplateId) -> StoreResult<Template> {
        if self.first_template.is_none() {
            self.first_template = Some(id.clone());
        }
        self.inner.get_template(id).await
    }

    async fn get_version(&mut self, reference: &VersionRef) -> StoreResult<Version> {
        self.inner.get_version(reference).await
    }

    async fn get_report(&mut self, id: &ReportId) -> StoreResult<Report> {
        self.inner.get_report(id).await
    }

    fn new_template_ref(&mut self) -> TemplateRef {
        self.inner.new_template_ref()
    }

    fn new_report_ref(&mut self) -> ReportRef {
        self.inner.new_report_ref()
    }

    fn create_template(&mut self, template: Template) -> StoreResult<()> {
        self.inner.create_template(template)
    }

    fn create_version(&mut self, version: Version) -> StoreResult<()> {
        self.inner.create_version(version)
    }

    fn create_report(&mut self, report: Report) -> StoreResult<()> {
        self.inner.create_report(report)
    }

    fn update_template(&mut self, template: &Template) -> StoreResult<()> {
        self.inner.update_template(template)
    }

    fn update_version(&mut self, version: &Version) -> StoreResult<()> {
        self.inner.update_version(version)
    }

    fn update_report(&mut self, report: &Report) -> StoreResult<()> {
        self.inner.update_report(report)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        if let Some(id) = &this.first_template {
            if this.armed.swap(false, Ordering::SeqCst) {
                let mut rival = this.store.begin().await?;
                let template = rival.get_template(id).await?;
                rival.update_template(&template)?;
                rival.commit().await?;
                info!(template_id = %id, "Rival transaction committed first");
            }
        }
        this.inner.commit().await
    }
}
