//! Document manager: metadata, query builder, unit of work, events and filters over one store.

use crate::error::StoreError;
use crate::odm::document::Document;
use crate::odm::events::EventManager;
use crate::odm::filters::QueryFilter;
use crate::odm::metadata::{ClassMetadata, MetadataRegistry};
use crate::odm::query::{Criterion, FindQuery, SortDirection, SortSpec};
use crate::odm::store::DocumentStore;
use crate::odm::unit_of_work::UnitOfWork;
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct DocumentManager {
    store: Arc<dyn DocumentStore>,
    metadata: Arc<MetadataRegistry>,
    events: EventManager,
    filters: Vec<Arc<dyn QueryFilter>>,
}

impl DocumentManager {
    pub fn new(store: Arc<dyn DocumentStore>, metadata: MetadataRegistry) -> Self {
        DocumentManager {
            store,
            metadata: Arc::new(metadata),
            events: EventManager::new(),
            filters: Vec::new(),
        }
    }

    pub fn with_event_manager(mut self, events: EventManager) -> Self {
        self.events = events;
        self
    }

    pub fn with_filters(mut self, filters: Vec<Arc<dyn QueryFilter>>) -> Self {
        self.filters = filters;
        self
    }

    pub fn class_metadata(&self, class: &str) -> Result<Arc<ClassMetadata>, StoreError> {
        self.metadata.get(class)
    }

    pub fn metadata(&self) -> &MetadataRegistry {
        &self.metadata
    }

    pub fn event_manager(&self) -> &EventManager {
        &self.events
    }

    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn create_query_builder(&self, class: &str) -> Result<QueryBuilder<'_>, StoreError> {
        Ok(QueryBuilder {
            dm: self,
            meta: self.class_metadata(class)?,
            query: FindQuery::default(),
        })
    }

    pub fn unit_of_work(&self) -> UnitOfWork<'_> {
        UnitOfWork::new(self)
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    pub async fn ensure_collections(&self) -> Result<(), StoreError> {
        self.store.ensure_collections(&self.metadata).await
    }
}

/// Fluent query over one class. Enabled filters apply to every read terminal, not to `remove`.
pub struct QueryBuilder<'a> {
    dm: &'a DocumentManager,
    meta: Arc<ClassMetadata>,
    query: FindQuery,
}

impl<'a> QueryBuilder<'a> {
    pub fn metadata(&self) -> &ClassMetadata {
        &self.meta
    }

    pub fn equals(mut self, field: impl Into<String>, value: Value) -> Self {
        self.query.criteria.push(Criterion::Equals(field.into(), value));
        self
    }

    pub fn not_equals(mut self, field: impl Into<String>, value: Value) -> Self {
        self.query.criteria.push(Criterion::NotEquals(field.into(), value));
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(SortSpec::new(field, direction));
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.query.skip = n;
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.query.limit = Some(n);
        self
    }

    fn filtered(&self) -> FindQuery {
        let mut query = self.query.clone();
        for f in &self.dm.filters {
            query.criteria.extend(f.criteria(&self.meta));
        }
        query
    }

    /// Number of matching documents, ignoring skip and limit.
    pub async fn count(self) -> Result<u64, StoreError> {
        let query = self.filtered();
        self.dm.store.count(&self.meta, &query.criteria).await
    }

    pub async fn execute(self) -> Result<Vec<Document>, StoreError> {
        let query = self.filtered();
        let rows = self.dm.store.find(&self.meta, &query).await?;
        Ok(rows
            .into_iter()
            .map(|r| Document::from_fields(self.meta.class.clone(), r))
            .collect())
    }

    /// First match as raw stored fields, without building a document.
    pub async fn single_raw(self) -> Result<Option<Map<String, Value>>, StoreError> {
        let mut query = self.filtered();
        query.limit = Some(1);
        let rows = self.dm.store.find(&self.meta, &query).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn single_result(self) -> Result<Option<Document>, StoreError> {
        let class = self.meta.class.clone();
        Ok(self.single_raw().await?.map(|r| Document::from_fields(class, r)))
    }

    pub async fn remove(self) -> Result<u64, StoreError> {
        tracing::debug!(class = %self.meta.class, criteria = ?self.query.criteria, "remove");
        self.dm.store.remove(&self.meta, &self.query.criteria).await
    }
}
