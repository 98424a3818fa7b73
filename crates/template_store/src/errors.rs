//! Error types for template store operations.
//!
//! Every store implementation reports failures through [`StoreError`], so the workflow can tell
//! a missing document apart from a transaction that lost a race or a backend that is down.

use std::fmt;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// The kind of document an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Template,
    Version,
    Report,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Template => "template",
            DocumentKind::Version => "version",
            DocumentKind::Report => "report",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while reading or writing template library documents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested document does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: DocumentKind, id: String },

    /// A create was staged for a document that already exists.
    #[error("{kind} '{id}' already exists")]
    AlreadyExists { kind: DocumentKind, id: String },

    /// A document read inside the transaction changed before the transaction committed.
    ///
    /// Conflicts are retryable: [`crate::run_transaction`] re-runs the transaction body.
    #[error("transaction conflict on {kind} '{id}'")]
    Conflict { kind: DocumentKind, id: String },

    /// A transactional read was attempted after a write had been staged.
    #[error("transactions require all reads to be executed before all writes")]
    ReadAfterWrite,

    /// An identifier was empty or malformed and was rejected before reaching the store.
    #[error("invalid {kind} id: '{id}'")]
    InvalidId { kind: DocumentKind, id: String },

    /// The backing store could not serve the request.
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(kind: DocumentKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid_id(kind: DocumentKind, id: impl Into<String>) -> Self {
        Self::InvalidId {
            kind,
            id: id.into(),
        }
    }

    /// Returns `true` for errors that a fresh transaction attempt may resolve.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Result alias used throughout the store crate.
pub type StoreResult<T> = Result<T, StoreError>;
