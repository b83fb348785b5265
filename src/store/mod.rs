//! Document store seam.
//!
//! The core reads whole collections, optionally narrowed by equality filters.
//! Records cross this boundary exactly once, through [`read_collection`], which
//! folds legacy field spellings onto their canonical names.

pub mod memory;
pub mod normalize;
pub mod paths;
pub mod sqlite;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

use crate::error::{ListingError, Result};
use crate::model::Record;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Record,
}

/// Equality and OR-of-equality filters, the only shapes the listings need.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreFilter {
    Eq { field: String, value: Value },
    Or(Vec<StoreFilter>),
}

impl StoreFilter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// Matches when any spelling of `canonical` equals `value`.
    pub fn any_spelling(canonical: &str, value: &str) -> Self {
        let mut alternatives: Vec<_> = normalize::spellings(canonical)
            .into_iter()
            .map(|field| Self::eq(field, value))
            .collect();
        if alternatives.len() == 1 {
            alternatives.remove(0)
        } else {
            Self::Or(alternatives)
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Eq { field, value } => record.get(field) == Some(value),
            Self::Or(alternatives) => alternatives.iter().any(|f| f.matches(record)),
        }
    }
}

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Documents of the collection at `path` in insertion order. A missing
    /// collection is empty, not an error.
    async fn get_collection(
        &self,
        path: &str,
        filter: Option<&StoreFilter>,
    ) -> anyhow::Result<Vec<Document>>;

    fn name(&self) -> &str;
}

/// Read a collection and normalize every record. A filter is applied again to
/// the normalized record, so it sees the same spelling precedence as the core.
pub async fn read_collection(
    store: &dyn DataStore,
    path: &str,
    filter: Option<&StoreFilter>,
) -> Result<Vec<Document>> {
    let docs = store.get_collection(path, filter).await.map_err(|err| {
        tracing::error!(store = store.name(), path, error = %err, "Store read failed");
        ListingError::downstream(format!("{err:#}"))
    })?;
    tracing::debug!(store = store.name(), path, count = docs.len(), "Read collection");
    Ok(docs
        .into_iter()
        .map(|doc| Document {
            id: doc.id,
            data: normalize::normalize_record(doc.data),
        })
        .filter(|doc| filter.map_or(true, |f| f.matches(&doc.data)))
        .collect())
}
