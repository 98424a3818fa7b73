use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use tracing_test::traced_test;

use super::*;
use crate::{
    Approval, InMemoryDocumentStore, StoreResult, Template, TemplateId, Version, VersionId,
    Visibility,
};

async fn seed(store: &InMemoryDocumentStore) -> TemplateId {
    let root = store.root().clone();
    let id = TemplateId::new("t1").expect("valid id");
    let now = Utc::now();
    let mut tx = store.begin().await.expect("begin");
    tx.create_template(Template {
        reference: root.template_ref(&id),
        active_report: None,
        active_version: None,
        last_version: root.version_ref(&id, VersionId::first()),
        hidden: false,
        time_created: now,
        time_modified: now,
    })
    .expect("stage");
    tx.create_version(Version {
        reference: root.version_ref(&id, VersionId::first()),
        template: root.template_ref(&id),
        report: root.report_ref(&crate::ReportId::new("r0").expect("valid id")),
        previous_version: None,
        created_by: "a@example.com".to_string(),
        approval: Approval::pending(),
        active: false,
        visibility: Visibility::Global,
        collaborators: vec![],
        categories: vec![],
        cloud: vec![],
        time_created: now,
        time_modified: now,
    })
    .expect("stage");
    tx.commit().await.expect("commit");
    id
}

/// Touches the template from a competing transaction on the first `interfere_times` runs.
struct TouchTemplate {
    store: InMemoryDocumentStore,
    id: TemplateId,
    interfere_times: u32,
    runs: AtomicU32,
}

impl TouchTemplate {
    fn new(store: &InMemoryDocumentStore, id: &TemplateId, interfere_times: u32) -> Self {
        Self {
            store: store.clone(),
            id: id.clone(),
            interfere_times,
            runs: AtomicU32::new(0),
        }
    }

    async fn interfere(&self) -> StoreResult<()> {
        let mut other = self.store.begin().await?;
        let mut template = other.get_template(&self.id).await?;
        template.time_modified = Utc::now();
        other.update_template(&template)?;
        other.commit().await
    }
}

#[async_trait]
impl TransactionBody for TouchTemplate {
    type Output = u32;
    type Error = StoreError;

    async fn run(&self, tx: &mut dyn StoreTransaction) -> Result<u32, StoreError> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        let mut template = tx.get_template(&self.id).await?;
        if run <= self.interfere_times {
            self.interfere().await?;
        }
        template.active_version = Some(template.last_version.clone());
        tx.update_template(&template)?;
        Ok(run)
    }
}

struct Refuse;

#[async_trait]
impl TransactionBody for Refuse {
    type Output = ();
    type Error = StoreError;

    async fn run(&self, tx: &mut dyn StoreTransaction) -> Result<(), StoreError> {
        let template_ref = tx.new_template_ref();
        Err(StoreError::invalid_id(
            crate::DocumentKind::Template,
            template_ref.id.as_str(),
        ))
    }
}

#[tokio::test]
async fn test_uncontended_transaction_commits_first_time() {
    let store = InMemoryDocumentStore::new("p");
    let id = seed(&store).await;
    let body = TouchTemplate::new(&store, &id, 0);

    let committed = run_transaction(&store, RetryPolicy::default(), &body)
        .await
        .expect("commit");

    assert_eq!(committed.attempts, 1);
    assert_eq!(committed.output, 1);
    assert!(store
        .get_template(&id)
        .await
        .expect("read")
        .active_version
        .is_some());
}

#[tokio::test]
#[traced_test]
async fn test_conflicting_transaction_is_retried() {
    let store = InMemoryDocumentStore::new("p");
    let id = seed(&store).await;
    let body = TouchTemplate::new(&store, &id, 2);

    let committed = run_transaction(&store, RetryPolicy::default(), &body)
        .await
        .expect("commit");

    assert_eq!(committed.attempts, 3);
    assert_eq!(body.runs.load(Ordering::SeqCst), 3);
    assert!(logs_contain("Transaction conflict, retrying"));
}

#[tokio::test]
async fn test_conflict_is_returned_once_attempts_are_exhausted() {
    let store = InMemoryDocumentStore::new("p");
    let id = seed(&store).await;
    let body = TouchTemplate::new(&store, &id, u32::MAX);

    let result = run_transaction(&store, RetryPolicy::new(3), &body).await;

    assert!(matches!(result, Err(StoreError::Conflict { .. })));
    assert_eq!(body.runs.load(Ordering::SeqCst), 3);
    assert!(store
        .get_template(&id)
        .await
        .expect("read")
        .active_version
        .is_none());
}

#[tokio::test]
async fn test_body_errors_are_not_retried() {
    let store = InMemoryDocumentStore::new("p");

    let result = run_transaction(&store, RetryPolicy::default(), &Refuse).await;

    assert!(matches!(result, Err(StoreError::InvalidId { .. })));
    assert_eq!(store.template_count().expect("count"), 0);
}

#[test]
fn test_retry_policy_allows_at_least_one_attempt() {
    assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    assert_eq!(RetryPolicy::default().max_attempts, 5);
}
