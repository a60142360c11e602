//! PostgreSQL backend: one `(id TEXT, body JSONB)` table per collection in a schema named from
//! `DOCSTORE_SCHEMA` env (default `docstore`).

use crate::error::StoreError;
use crate::odm::document::identity_key;
use crate::odm::metadata::{ClassMetadata, MetadataRegistry};
use crate::odm::query::{Criterion, FindQuery};
use crate::odm::store::DocumentStore;
use crate::sql::{self, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool, Postgres};
use std::str::FromStr;

/// Schema for collection tables. From env `DOCSTORE_SCHEMA`, default `docstore`.
pub fn docstore_schema() -> String {
    std::env::var("DOCSTORE_SCHEMA").unwrap_or_else(|_| "docstore".into())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

fn bound(q: &QueryBuf) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    q.params
        .iter()
        .fold(sqlx::query(&q.sql), |query, p| query.bind(p.as_str()))
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore {
            pool,
            schema: docstore_schema(),
        }
    }

    /// Creates the database if needed, then opens a pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        ensure_database_exists(database_url).await?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(PgStore::new(pool))
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn count(&self, meta: &ClassMetadata, criteria: &[Criterion]) -> Result<u64, StoreError> {
        let q = sql::select_count(&self.schema, meta, criteria);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let n = q
            .params
            .iter()
            .fold(sqlx::query_scalar::<_, i64>(&q.sql), |query, p| query.bind(p.as_str()))
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    async fn find(&self, meta: &ClassMetadata, query: &FindQuery) -> Result<Vec<Map<String, Value>>, StoreError> {
        let q = sql::select_documents(&self.schema, meta, query);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = q
            .params
            .iter()
            .fold(sqlx::query_scalar::<_, Value>(&q.sql), |query, p| query.bind(p.as_str()))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(m) => Some(m),
                _ => None,
            })
            .collect())
    }

    async fn insert(&self, meta: &ClassMetadata, id: &Value, body: &Map<String, Value>) -> Result<(), StoreError> {
        let key = identity_key(id);
        let q = sql::insert_document(&self.schema, meta, &key, body);
        tracing::debug!(sql = %q.sql, "query");
        match bound(&q).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(StoreError::Duplicate {
                class: meta.class.clone(),
                id: key,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, meta: &ClassMetadata, id: &Value, body: &Map<String, Value>) -> Result<(), StoreError> {
        let q = sql::replace_document(&self.schema, meta, &identity_key(id), body);
        tracing::debug!(sql = %q.sql, "query");
        bound(&q).execute(&self.pool).await?;
        Ok(())
    }

    async fn remove(&self, meta: &ClassMetadata, criteria: &[Criterion]) -> Result<u64, StoreError> {
        let q = sql::delete_documents(&self.schema, meta, criteria);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let result = bound(&q).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    /// Create the schema and a table for every mapped collection.
    async fn ensure_collections(&self, metadata: &MetadataRegistry) -> Result<(), StoreError> {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", self.schema.replace('"', "\"\"")))
            .execute(&self.pool)
            .await?;
        for meta in metadata.classes() {
            let ddl = sql::create_collection(&self.schema, meta);
            tracing::debug!(sql = %ddl, "ensure collection");
            sqlx::query(&ddl).execute(&self.pool).await?;
        }
        Ok(())
    }
}

/// Connect to the `postgres` maintenance database and create the target database if it does not exist.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url);
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name.replace('"', "\"\"")))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> (String, String) {
    let path_start = url.rfind('/').map(|i| i + 1).unwrap_or(url.len());
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    (format!("{}postgres", base), db_name.to_string())
}
