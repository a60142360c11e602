//! Document layer: metadata, documents, queries, unit of work, events, filters and stores.

mod document;
mod events;
mod filters;
mod manager;
mod mapping;
mod metadata;
mod postgres;
mod query;
mod store;
mod unit_of_work;

pub use document::{identity_key, Document, FieldAccess};
pub use events::*;
pub use filters::{filters_from_config, QueryFilter, SoftDeleteFilter};
pub use manager::{DocumentManager, QueryBuilder};
pub use mapping::{load_metadata, AnnotationReader, CacheKind};
pub use metadata::{ClassMetadata, FieldMapping, MetadataRegistry};
pub use postgres::{docstore_schema, ensure_database_exists, PgStore};
pub use query::{compare_documents, compare_json, json_eq, Criterion, FindQuery, SortDirection, SortSpec};
pub use store::{DocumentStore, MemoryStore};
pub use unit_of_work::{DocumentHandle, UnitOfWork};
