//! SQLite-backed document store.
//!
//! Every document lives in one table keyed by `(collection, doc_id)` with its
//! body stored as JSON text. Reads return documents in insertion order;
//! filters are applied to the decoded body.

use super::{DataStore, Document, StoreFilter};
use crate::model::Record;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
  collection TEXT NOT NULL,
  doc_id TEXT NOT NULL,
  body TEXT NOT NULL,
  updated_at INTEGER NOT NULL DEFAULT (unixepoch()),
  PRIMARY KEY (collection, doc_id)
);
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
"#;

pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create db parent dir: {}", parent.display()))?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open sqlite db: {}", db_path.display()))?;

        // WAL lets request handlers read while a seed run writes
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL mode")?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("Failed to set synchronous mode")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .context("Failed to set busy timeout")?;

        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory sqlite db")?;
        Ok(Self::from_connection(conn))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Sqlite connection lock poisoned"))
    }

    pub fn init(&self) -> Result<()> {
        self.lock()?
            .execute_batch(SCHEMA_SQL)
            .context("Failed to initialize sqlite schema")?;
        Ok(())
    }

    /// Insert or replace a document. A replaced document keeps its position.
    pub fn put_document(&self, collection: &str, doc_id: &str, body: &Record) -> Result<()> {
        let json = serde_json::to_string(body).context("Failed to encode document body")?;
        self.lock()?
            .execute(
                r#"
INSERT INTO documents (collection, doc_id, body)
VALUES (?1, ?2, ?3)
ON CONFLICT(collection, doc_id) DO UPDATE SET
  body = excluded.body,
  updated_at = unixepoch()
"#,
                params![collection, doc_id, json],
            )
            .with_context(|| format!("Failed to write document {collection}/{doc_id}"))?;
        Ok(())
    }

    pub fn count_documents(&self, collection: &str) -> Result<u64> {
        let count: i64 = self.lock()?.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Load a `{collection: {docId: body}}` JSON export. Returns the number of
    /// documents written.
    pub fn seed_from_value(&self, seed: &Value) -> Result<usize> {
        let collections = seed
            .as_object()
            .context("Seed must be an object of collections")?;

        let mut written = 0;
        for (collection, docs) in collections {
            let docs = docs
                .as_object()
                .with_context(|| format!("Collection {collection} must be an object of documents"))?;
            for (doc_id, body) in docs {
                let body = body
                    .as_object()
                    .with_context(|| format!("Document {collection}/{doc_id} must be an object"))?;
                self.put_document(collection, doc_id, body)?;
                written += 1;
            }
            tracing::info!(collection = %collection, documents = docs.len(), "Seeded collection");
        }
        Ok(written)
    }

    pub fn seed_from_file(&self, path: &Path) -> Result<usize> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
        let seed: Value = serde_json::from_str(&raw)
            .with_context(|| format!("Seed file is not valid JSON: {}", path.display()))?;
        self.seed_from_value(&seed)
    }

    fn read_collection(&self, collection: &str) -> Result<Vec<Document>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT doc_id, body FROM documents WHERE collection = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, body) = row?;
            let data: Record = serde_json::from_str(&body)
                .with_context(|| format!("Corrupt document body {collection}/{id}"))?;
            docs.push(Document { id, data });
        }
        Ok(docs)
    }
}

#[async_trait]
impl DataStore for SqliteDocumentStore {
    async fn get_collection(
        &self,
        path: &str,
        filter: Option<&StoreFilter>,
    ) -> Result<Vec<Document>> {
        let mut docs = self.read_collection(path)?;
        if let Some(filter) = filter {
            docs.retain(|d| filter.matches(&d.data));
        }
        Ok(docs)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
