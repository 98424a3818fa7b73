//! Persistence for the template library.
//!
//! This crate defines the documents the template library stores (templates, their versions and
//! the reports those versions are bound to), the store traits the approval workflow is written
//! against, and an in-memory store with optimistic transactions.
//!
//! All multi-document changes go through a [`StoreTransaction`]: reads are tracked, writes are
//! staged, and [`StoreTransaction::commit`] applies the staged writes only if nothing that was read
//! has changed in the meantime. [`run_transaction`] wraps that in a retry loop.

use async_trait::async_trait;

pub mod documents;
pub use documents::{
    short_path, Approval, ApprovalStatus, ChangeMessage, Collaborator, CollaboratorRole,
    DocumentRef, DocumentRoot, MetadataFieldType, OptionalField, ParseVisibilityError, Report,
    ReportConfig, ReportId, ReportRef, Template, TemplateId, TemplateRef, Version, VersionId,
    VersionRef, Visibility,
};

pub mod errors;
pub use errors::{DocumentKind, StoreError, StoreResult};

pub mod memory;
pub use memory::InMemoryDocumentStore;

pub mod transaction;
pub use transaction::{run_transaction, Committed, RetryPolicy, TransactionBody};

/// Non-transactional access to template and version documents.
///
/// Implementations must be safe to share between request handlers.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// The database root every reference produced by this store is built from.
    fn root(&self) -> &DocumentRoot;

    /// Gets a template by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the template does not exist.
    async fn get_template(&self, id: &TemplateId) -> StoreResult<Template>;

    /// Gets a single version by reference.
    async fn get_version(&self, reference: &VersionRef) -> StoreResult<Version>;

    /// Gets several versions in one read, in the order of `references`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` naming the first reference that does not resolve.
    async fn get_versions(&self, references: &[VersionRef]) -> StoreResult<Vec<Version>>;

    /// Lists templates ordered by creation time, optionally skipping hidden ones.
    async fn list_templates(&self, exclude_hidden: bool) -> StoreResult<Vec<Template>>;

    /// Sets the hidden flag on a template outside of any transaction.
    async fn hide_template(&self, id: &TemplateId) -> StoreResult<()>;

    /// Starts a new transaction.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}

/// Non-transactional reads of the saved reports bound to template versions.
///
/// Reports are only written through a [`StoreTransaction`].
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn get_report(&self, id: &ReportId) -> StoreResult<Report>;
}

/// A snapshot-isolated read-then-write transaction.
///
/// Every read must happen before the first staged write; later reads fail with
/// `StoreError::ReadAfterWrite`. Staged writes are only applied by [`StoreTransaction::commit`].
#[async_trait]
pub trait StoreTransaction: Send {
    fn root(&self) -> &DocumentRoot;

    async fn get_template(&mut self, id: &TemplateId) -> StoreResult<Template>;

    async fn get_version(&mut self, reference: &VersionRef) -> StoreResult<Version>;

    async fn get_report(&mut self, id: &ReportId) -> StoreResult<Report>;

    /// Allocates a reference for a template that does not exist yet.
    fn new_template_ref(&mut self) -> TemplateRef;

    /// Allocates a reference for a report that does not exist yet.
    fn new_report_ref(&mut self) -> ReportRef;

    fn create_template(&mut self, template: Template) -> StoreResult<()>;

    fn create_version(&mut self, version: Version) -> StoreResult<()>;

    fn create_report(&mut self, report: Report) -> StoreResult<()>;

    fn update_template(&mut self, template: &Template) -> StoreResult<()>;

    fn update_version(&mut self, version: &Version) -> StoreResult<()>;

    fn update_report(&mut self, report: &Report) -> StoreResult<()>;

    /// Applies the staged writes atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::Conflict` if a document read by this transaction has changed since
    /// - `StoreError::AlreadyExists` if a staged create targets an existing document
    /// - `StoreError::NotFound` if a staged update targets a missing document
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
