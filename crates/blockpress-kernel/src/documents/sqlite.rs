//! SQLite document store: one row per post, body as JSON text.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use blockpress_types::{Document, now_millis};

use super::{DocumentResult, DocumentStore, DocumentStoreError, check_storable};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;

#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> DocumentResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> DocumentResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> DocumentResult<Self> {
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Ids of every stored document, most recently updated first.
    pub fn list_ids(&self) -> DocumentResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id FROM posts ORDER BY updated_at DESC, id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Last write time (Unix millis).
    pub fn updated_at(&self, document_id: &str) -> DocumentResult<Option<u64>> {
        let conn = self.conn.lock();
        let ts: Option<i64> = conn
            .query_row(
                "SELECT updated_at FROM posts WHERE id = ?1",
                params![document_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts.map(|t| t.max(0) as u64))
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    #[tracing::instrument(skip(self, doc), fields(blocks = doc.len()), name = "documents.save")]
    async fn save(&self, document_id: &str, doc: &Document) -> DocumentResult<()> {
        check_storable(document_id, doc)?;
        let body = serde_json::to_string(doc)?;
        let now = now_millis() as i64;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO posts (id, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(id) DO UPDATE SET
                 body = excluded.body,
                 updated_at = excluded.updated_at",
            params![document_id, body, now],
        )?;
        tracing::info!("document saved");
        Ok(())
    }

    async fn load(&self, document_id: &str) -> DocumentResult<Document> {
        let body: Option<String> = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT body FROM posts WHERE id = ?1",
                params![document_id],
                |row| row.get(0),
            )
            .optional()?
        };
        let body = body.ok_or_else(|| DocumentStoreError::NotFound(document_id.to_string()))?;
        let doc: Document = serde_json::from_str(&body)?;
        let unrecognized = doc.unrecognized().count();
        if unrecognized > 0 {
            tracing::warn!(document_id, unrecognized, "document has blocks of unknown type");
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockpress_types::block::{CodeData, HeadingData, TextData};
    use blockpress_types::{Block, BlockData};

    fn sample() -> Document {
        Document::from_blocks(vec![
            Block::new(HeadingData {
                level: 2,
                text: "Hello".into(),
            }),
            Block::new(TextData {
                content: "World".into(),
            }),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_load_roundtrip_keeps_ids_and_order() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        let doc = sample();
        store.save("post-1", &doc).await.unwrap();
        let loaded = store.load("post-1").await.unwrap();
        assert!(loaded.content_eq(&doc));
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        store.save("post-1", &sample()).await.unwrap();
        let created = store.updated_at("post-1").unwrap().unwrap();

        let mut doc = sample();
        doc.push(Block::new(TextData { content: "more".into() })).unwrap();
        store.save("post-1", &doc).await.unwrap();

        assert_eq!(store.load("post-1").await.unwrap().len(), 3);
        assert!(store.updated_at("post-1").unwrap().unwrap() >= created);
        assert_eq!(store.list_ids().unwrap(), vec!["post-1".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_blocks_survive_storage() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        store
            .conn
            .lock()
            .execute(
                "INSERT INTO posts (id, body, created_at, updated_at) VALUES ('legacy', ?1, 0, 0)",
                params![r#"[{"id":"x","type":"carousel","data":{"slides":[1]}}]"#],
            )
            .unwrap();

        let doc = store.load("legacy").await.unwrap();
        assert!(matches!(doc.blocks()[0].data(), BlockData::Unrecognized { .. }));
        store.save("legacy", &doc).await.unwrap();
        let again = store.load("legacy").await.unwrap();
        assert!(again.content_eq(&doc));
    }

    #[tokio::test]
    async fn test_missing_and_invalid() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        assert!(matches!(
            store.load("nope").await,
            Err(DocumentStoreError::NotFound(_))
        ));
        assert!(matches!(
            store.save("  ", &sample()).await,
            Err(DocumentStoreError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn test_code_sample_with_data_uri_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.db");
        let doc = Document::from_blocks(vec![
            Block::new(TextData {
                content: "Inline images look like `data:image/png;base64,iVBORw0KGgo=`".into(),
            }),
            Block::new(CodeData {
                language: None,
                code: "data:image/gif;base64,R0lGODlh".into(),
            }),
        ])
        .unwrap();

        SqliteDocumentStore::open(&path)
            .unwrap()
            .save("tut", &doc)
            .await
            .unwrap();
        let reopened = SqliteDocumentStore::open(&path).unwrap();
        assert!(reopened.load("tut").await.unwrap().content_eq(&doc));
    }
}
