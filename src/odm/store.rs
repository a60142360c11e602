//! Storage backend trait and the in-memory backend.

use crate::error::StoreError;
use crate::odm::document::identity_key;
use crate::odm::metadata::{ClassMetadata, MetadataRegistry};
use crate::odm::query::{compare_documents, Criterion, FindQuery};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::RwLock;

/// Raw persistence operations for one collection per class. Documents cross this boundary as JSON objects.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn count(&self, meta: &ClassMetadata, criteria: &[Criterion]) -> Result<u64, StoreError>;

    async fn find(&self, meta: &ClassMetadata, query: &FindQuery) -> Result<Vec<Map<String, Value>>, StoreError>;

    /// Fails with `StoreError::Duplicate` when the identifier is taken.
    async fn insert(&self, meta: &ClassMetadata, id: &Value, body: &Map<String, Value>) -> Result<(), StoreError>;

    /// Replaces the stored body of an existing document; a missing document is left missing.
    async fn replace(&self, meta: &ClassMetadata, id: &Value, body: &Map<String, Value>) -> Result<(), StoreError>;

    /// Returns the number of removed documents.
    async fn remove(&self, meta: &ClassMetadata, criteria: &[Criterion]) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Prepare storage for every mapped collection. Collections appear on first insert by default.
    async fn ensure_collections(&self, _metadata: &MetadataRegistry) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Process-local store, one vector of documents per collection.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Map<String, Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

fn has_id(doc: &Map<String, Value>, meta: &ClassMetadata, key: &str) -> bool {
    doc.get(&meta.identifier)
        .map(|v| identity_key(v) == key)
        .unwrap_or(false)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn count(&self, meta: &ClassMetadata, criteria: &[Criterion]) -> Result<u64, StoreError> {
        let guard = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        let n = guard
            .get(&meta.collection)
            .map(|docs| docs.iter().filter(|d| criteria.iter().all(|c| c.matches(d))).count())
            .unwrap_or(0);
        Ok(n as u64)
    }

    async fn find(&self, meta: &ClassMetadata, query: &FindQuery) -> Result<Vec<Map<String, Value>>, StoreError> {
        tracing::debug!(collection = %meta.collection, query = ?query, "memory find");
        let guard = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        let Some(docs) = guard.get(&meta.collection) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<&Map<String, Value>> = docs
            .iter()
            .filter(|d| query.criteria.iter().all(|c| c.matches(d)))
            .collect();
        if !query.sort.is_empty() {
            hits.sort_by(|a, b| compare_documents(a, b, &query.sort));
        }
        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let take = query
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(hits.into_iter().skip(skip).take(take).cloned().collect())
    }

    async fn insert(&self, meta: &ClassMetadata, id: &Value, body: &Map<String, Value>) -> Result<(), StoreError> {
        let key = identity_key(id);
        let mut guard = self.collections.write().map_err(|_| StoreError::Poisoned)?;
        let docs = guard.entry(meta.collection.clone()).or_default();
        if docs.iter().any(|d| has_id(d, meta, &key)) {
            return Err(StoreError::Duplicate {
                class: meta.class.clone(),
                id: key,
            });
        }
        docs.push(body.clone());
        Ok(())
    }

    async fn replace(&self, meta: &ClassMetadata, id: &Value, body: &Map<String, Value>) -> Result<(), StoreError> {
        let key = identity_key(id);
        let mut guard = self.collections.write().map_err(|_| StoreError::Poisoned)?;
        if let Some(slot) = guard
            .get_mut(&meta.collection)
            .and_then(|docs| docs.iter_mut().find(|d| has_id(d, meta, &key)))
        {
            *slot = body.clone();
        }
        Ok(())
    }

    async fn remove(&self, meta: &ClassMetadata, criteria: &[Criterion]) -> Result<u64, StoreError> {
        let mut guard = self.collections.write().map_err(|_| StoreError::Poisoned)?;
        let Some(docs) = guard.get_mut(&meta.collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !criteria.iter().all(|c| c.matches(d)));
        Ok((before - docs.len()) as u64)
    }
}
