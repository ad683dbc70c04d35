//! In-memory document store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use blockpress_types::Document;

use super::{DocumentResult, DocumentStore, DocumentStoreError, check_storable};

/// Keeps serialized bodies, so a load goes through the same decoding
/// (including lenient block loading) as a real store.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    bodies: RwLock<HashMap<String, String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bodies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.read().is_empty()
    }

    /// Raw JSON body as stored.
    pub fn raw(&self, document_id: &str) -> Option<String> {
        self.bodies.read().get(document_id).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn save(&self, document_id: &str, doc: &Document) -> DocumentResult<()> {
        check_storable(document_id, doc)?;
        let body = serde_json::to_string(doc)?;
        self.bodies.write().insert(document_id.to_string(), body);
        Ok(())
    }

    async fn load(&self, document_id: &str) -> DocumentResult<Document> {
        let body = self
            .raw(document_id)
            .ok_or_else(|| DocumentStoreError::NotFound(document_id.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }
}
