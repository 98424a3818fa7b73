//! In-memory document store with optimistic transactions.
//!
//! Every document carries a revision number. A transaction records the revision of each document
//! it reads (or that the document was absent) and, on commit, applies its staged writes only if
//! all of those revisions are still current.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument};

use crate::{
    DocumentKind, DocumentRoot, Report, ReportId, ReportRef, ReportStore, StoreError, StoreResult,
    StoreTransaction, Template, TemplateId, TemplateRef, TemplateStore, Version, VersionId,
    VersionRef,
};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DocumentKey {
    Template(TemplateId),
    Version(TemplateId, VersionId),
    Report(ReportId),
}

impl DocumentKey {
    fn kind(&self) -> DocumentKind {
        match self {
            DocumentKey::Template(_) => DocumentKind::Template,
            DocumentKey::Version(..) => DocumentKind::Version,
            DocumentKey::Report(_) => DocumentKind::Report,
        }
    }

    fn id(&self) -> String {
        match self {
            DocumentKey::Template(id) => id.to_string(),
            DocumentKey::Version(template_id, id) => format!("{template_id}/{id}"),
            DocumentKey::Report(id) => id.to_string(),
        }
    }

    fn of_version(reference: &VersionRef) -> Self {
        DocumentKey::Version(reference.template_id.clone(), reference.id)
    }
}

#[derive(Debug, Clone)]
enum Document {
    Template(Template),
    Version(Version),
    Report(Report),
}

impl Document {
    fn key(&self) -> DocumentKey {
        match self {
            Document::Template(t) => DocumentKey::Template(t.reference.id.clone()),
            Document::Version(v) => DocumentKey::of_version(&v.reference),
            Document::Report(r) => DocumentKey::Report(r.reference.id.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct Revisioned {
    revision: u64,
    document: Document,
}

#[derive(Debug, Default)]
struct StoreState {
    documents: HashMap<DocumentKey, Revisioned>,
    last_revision: u64,
}

impl StoreState {
    fn revision_of(&self, key: &DocumentKey) -> Option<u64> {
        self.documents.get(key).map(|d| d.revision)
    }

    fn put(&mut self, key: DocumentKey, document: Document) {
        self.last_revision += 1;
        self.documents.insert(
            key,
            Revisioned {
                revision: self.last_revision,
                document,
            },
        );
    }
}

fn lock(state: &Mutex<StoreState>) -> StoreResult<MutexGuard<'_, StoreState>> {
    state
        .lock()
        .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
}

fn read_document(state: &Mutex<StoreState>, key: &DocumentKey) -> StoreResult<Option<Revisioned>> {
    Ok(lock(state)?.documents.get(key).cloned())
}

/// A [`TemplateStore`] and [`ReportStore`] kept in process memory.
///
/// Cloning the store yields another handle to the same documents.
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStore {
    root: DocumentRoot,
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryDocumentStore {
    pub fn new(project_id: &str) -> Self {
        Self {
            root: DocumentRoot::new(project_id),
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    /// Number of template documents, hidden ones included.
    pub fn template_count(&self) -> StoreResult<usize> {
        let state = lock(&self.state)?;
        Ok(state
            .documents
            .keys()
            .filter(|k| matches!(k, DocumentKey::Template(_)))
            .count())
    }

    /// All versions of a template, ordered by version id.
    pub fn versions_of(&self, template_id: &TemplateId) -> StoreResult<Vec<Version>> {
        let state = lock(&self.state)?;
        let mut versions: Vec<Version> = state
            .documents
            .values()
            .filter_map(|d| match &d.document {
                Document::Version(v) if &v.reference.template_id == template_id => Some(v.clone()),
                _ => None,
            })
            .collect();
        versions.sort_by_key(|v| v.reference.id);
        Ok(versions)
    }
}

#[async_trait]
impl TemplateStore for InMemoryDocumentStore {
    fn root(&self) -> &DocumentRoot {
        &self.root
    }

    async fn get_template(&self, id: &TemplateId) -> StoreResult<Template> {
        match read_document(&self.state, &DocumentKey::Template(id.clone()))? {
            Some(Revisioned {
                document: Document::Template(template),
                ..
            }) => Ok(template),
            _ => Err(StoreError::not_found(DocumentKind::Template, id.as_str())),
        }
    }

    async fn get_version(&self, reference: &VersionRef) -> StoreResult<Version> {
        let key = DocumentKey::of_version(reference);
        match read_document(&self.state, &key)? {
            Some(Revisioned {
                document: Document::Version(version),
                ..
            }) => Ok(version),
            _ => Err(StoreError::not_found(DocumentKind::Version, key.id())),
        }
    }

    async fn get_versions(&self, references: &[VersionRef]) -> StoreResult<Vec<Version>> {
        let state = lock(&self.state)?;
        references
            .iter()
            .map(|reference| {
                let key = DocumentKey::of_version(reference);
                match state.documents.get(&key) {
                    Some(Revisioned {
                        document: Document::Version(version),
                        ..
                    }) => Ok(version.clone()),
                    _ => Err(StoreError::not_found(DocumentKind::Version, key.id())),
                }
            })
            .collect()
    }

    async fn list_templates(&self, exclude_hidden: bool) -> StoreResult<Vec<Template>> {
        let state = lock(&self.state)?;
        let mut templates: Vec<Template> = state
            .documents
            .values()
            .filter_map(|d| match &d.document {
                Document::Template(t) if !(exclude_hidden && t.hidden) => Some(t.clone()),
                _ => None,
            })
            .collect();
        templates.sort_by(|a, b| {
            a.time_created
                .cmp(&b.time_created)
                .then_with(|| a.reference.id.cmp(&b.reference.id))
        });
        Ok(templates)
    }

    #[instrument(skip(self), fields(template_id = %id))]
    async fn hide_template(&self, id: &TemplateId) -> StoreResult<()> {
        let mut state = lock(&self.state)?;
        let key = DocumentKey::Template(id.clone());
        let mut template = match state.documents.get(&key) {
            Some(Revisioned {
                document: Document::Template(template),
                ..
            }) => template.clone(),
            _ => return Err(StoreError::not_found(DocumentKind::Template, id.as_str())),
        };
        template.hidden = true;
        template.time_modified = Utc::now();
        state.put(key, Document::Template(template));
        debug!("Template hidden");
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(InMemoryTransaction {
            root: self.root.clone(),
            state: Arc::clone(&self.state),
            reads: HashMap::new(),
            writes: Vec::new(),
        }))
    }
}

#[async_trait]
impl ReportStore for InMemoryDocumentStore {
    async fn get_report(&self, id: &ReportId) -> StoreResult<Report> {
        match read_document(&self.state, &DocumentKey::Report(id.clone()))? {
            Some(Revisioned {
                document: Document::Report(report),
                ..
            }) => Ok(report),
            _ => Err(StoreError::not_found(DocumentKind::Report, id.as_str())),
        }
    }
}

#[derive(Debug)]
enum StagedWrite {
    Create(Document),
    Update(Document),
}

/// A transaction against an [`InMemoryDocumentStore`].
#[derive(Debug)]
struct InMemoryTransaction {
    root: DocumentRoot,
    state: Arc<Mutex<StoreState>>,
    /// Revision of every document read, `None` when it did not exist.
    reads: HashMap<DocumentKey, Option<u64>>,
    writes: Vec<StagedWrite>,
}

impl InMemoryTransaction {
    fn read(&mut self, key: DocumentKey) -> StoreResult<Option<Document>> {
        if !self.writes.is_empty() {
            return Err(StoreError::ReadAfterWrite);
        }
        let snapshot = read_document(&self.state, &key)?;
        // The first observed revision is the one commit validates against.
        self.reads
            .entry(key)
            .or_insert_with(|| snapshot.as_ref().map(|d| d.revision));
        Ok(snapshot.map(|d| d.document))
    }

    fn stage(&mut self, write: StagedWrite) -> StoreResult<()> {
        self.writes.push(write);
        Ok(())
    }

    fn apply(self) -> StoreResult<()> {
        let mut state = lock(&self.state)?;

        for (key, seen) in &self.reads {
            if state.revision_of(key) != *seen {
                return Err(StoreError::Conflict {
                    kind: key.kind(),
                    id: key.id(),
                });
            }
        }

        let mut created = Vec::new();
        for write in &self.writes {
            match write {
                StagedWrite::Create(document) => {
                    let key = document.key();
                    if state.documents.contains_key(&key) || created.contains(&key) {
                        return Err(StoreError::AlreadyExists {
                            kind: key.kind(),
                            id: key.id(),
                        });
                    }
                    created.push(key);
                }
                StagedWrite::Update(document) => {
                    let key = document.key();
                    if !state.documents.contains_key(&key) && !created.contains(&key) {
                        return Err(StoreError::not_found(key.kind(), key.id()));
                    }
                }
            }
        }

        let write_count = self.writes.len();
        for write in self.writes {
            let document = match write {
                StagedWrite::Create(document) | StagedWrite::Update(document) => document,
            };
            state.put(document.key(), document);
        }
        debug!(
            reads = self.reads.len(),
            writes = write_count,
            "In-memory transaction applied"
        );
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    fn root(&self) -> &DocumentRoot {
        &self.root
    }

    async fn get_template(&mut self, id: &TemplateId) -> StoreResult<Template> {
        match self.read(DocumentKey::Template(id.clone()))? {
            Some(Document::Template(template)) => Ok(template),
            _ => Err(StoreError::not_found(DocumentKind::Template, id.as_str())),
        }
    }

    async fn get_version(&mut self, reference: &VersionRef) -> StoreResult<Version> {
        let key = DocumentKey::of_version(reference);
        let id = key.id();
        match self.read(key)? {
            Some(Document::Version(version)) => Ok(version),
            _ => Err(StoreError::not_found(DocumentKind::Version, id)),
        }
    }

    async fn get_report(&mut self, id: &ReportId) -> StoreResult<Report> {
        match self.read(DocumentKey::Report(id.clone()))? {
            Some(Document::Report(report)) => Ok(report),
            _ => Err(StoreError::not_found(DocumentKind::Report, id.as_str())),
        }
    }

    fn new_template_ref(&mut self) -> TemplateRef {
        self.root.template_ref(&TemplateId::generate())
    }

    fn new_report_ref(&mut self) -> ReportRef {
        self.root.report_ref(&ReportId::generate())
    }

    fn create_template(&mut self, template: Template) -> StoreResult<()> {
        self.stage(StagedWrite::Create(Document::Template(template)))
    }

    fn create_version(&mut self, version: Version) -> StoreResult<()> {
        self.stage(StagedWrite::Create(Document::Version(version)))
    }

    fn create_report(&mut self, report: Report) -> StoreResult<()> {
        self.stage(StagedWrite::Create(Document::Report(report)))
    }

    fn update_template(&mut self, template: &Template) -> StoreResult<()> {
        self.stage(StagedWrite::Update(Document::Template(template.clone())))
    }

    fn update_version(&mut self, version: &Version) -> StoreResult<()> {
        self.stage(StagedWrite::Update(Document::Version(version.clone())))
    }

    fn update_report(&mut self, report: &Report) -> StoreResult<()> {
        self.stage(StagedWrite::Update(Document::Report(report.clone())))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        (*self).apply()
    }
}
