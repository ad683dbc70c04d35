//! Document persistence.
//!
//! A document is stored as one opaque JSON value on a post record. Stores
//! refuse documents that still hold staged (data URI) images: those must be
//! resolved to permanent URLs first.

mod memory;
mod sqlite;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

use async_trait::async_trait;
use thiserror::Error;

use blockpress_types::{Document, ErrorKind};

use crate::staging::contains_ephemeral;

#[derive(Error, Debug)]
pub enum DocumentStoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document {0} still contains staged images")]
    EphemeralContent(String),

    #[error("invalid document id '{0}'")]
    InvalidId(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl DocumentStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentStoreError::NotFound(_) => ErrorKind::NotFound,
            DocumentStoreError::EphemeralContent(_) | DocumentStoreError::InvalidId(_) => {
                ErrorKind::Validation
            }
            DocumentStoreError::Serialization(_) | DocumentStoreError::Database(_) => {
                ErrorKind::Storage
            }
        }
    }
}

pub type DocumentResult<T> = Result<T, DocumentStoreError>;

/// Storage for document bodies, keyed by the owning post's id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save(&self, document_id: &str, doc: &Document) -> DocumentResult<()>;

    async fn load(&self, document_id: &str) -> DocumentResult<Document>;
}

/// Checks shared by every store before a write.
pub(crate) fn check_storable(document_id: &str, doc: &Document) -> DocumentResult<()> {
    if document_id.trim().is_empty() {
        return Err(DocumentStoreError::InvalidId(document_id.to_string()));
    }
    if contains_ephemeral(doc) {
        return Err(DocumentStoreError::EphemeralContent(document_id.to_string()));
    }
    Ok(())
}
