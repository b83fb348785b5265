//! In-process document store used by tests and `mock` runs.

use super::{DataStore, Document, StoreFilter};
use crate::model::Record;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document. A replaced document keeps its position.
    pub fn insert(&self, path: &str, id: &str, data: Record) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        let docs = collections.entry(path.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.data = data,
            None => docs.push(Document {
                id: id.to_string(),
                data,
            }),
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for MemoryDocumentStore {
    async fn get_collection(
        &self,
        path: &str,
        filter: Option<&StoreFilter>,
    ) -> Result<Vec<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(collections
            .get(path)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.map_or(true, |f| f.matches(&d.data)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
