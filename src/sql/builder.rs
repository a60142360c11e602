//! Builds parameterized SQL over one JSONB table per collection.
//! Table names come from metadata only; field names and values are always bound as parameters.

use crate::odm::{ClassMetadata, Criterion, FindQuery};
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from metadata).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, collection: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(collection))
}

/// SQL text plus text parameters; every placeholder carries an explicit cast.
#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<String>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: String) -> usize {
        self.params.push(v);
        self.params.len()
    }

    fn push_where(&mut self, criteria: &[Criterion]) {
        let mut parts = Vec::with_capacity(criteria.len());
        for c in criteria {
            let (field, value, op) = match c {
                Criterion::Equals(f, v) => (f, v, "="),
                Criterion::NotEquals(f, v) => (f, v, "IS DISTINCT FROM"),
            };
            let f = self.push_param(field.clone());
            let v = self.push_param(value.to_string());
            parts.push(format!("(body -> ${}::text) {} ${}::jsonb", f, op, v));
        }
        if !parts.is_empty() {
            self.sql.push_str(" WHERE ");
            self.sql.push_str(&parts.join(" AND "));
        }
    }
}

/// Paging bounds beyond `bigint` are clamped; no table holds that many rows.
fn as_bigint(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

pub fn create_collection(schema: &str, meta: &ClassMetadata) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, body JSONB NOT NULL)",
        qualified_table(schema, &meta.collection)
    )
}

pub fn select_count(schema: &str, meta: &ClassMetadata, criteria: &[Criterion]) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT COUNT(*) FROM {}", qualified_table(schema, &meta.collection));
    q.push_where(criteria);
    q
}

pub fn select_documents(schema: &str, meta: &ClassMetadata, query: &FindQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT body FROM {}", qualified_table(schema, &meta.collection));
    q.push_where(&query.criteria);
    if !query.sort.is_empty() {
        let mut order = Vec::with_capacity(query.sort.len());
        for s in &query.sort {
            let n = q.push_param(s.field.clone());
            order.push(format!("body -> ${}::text {}", n, s.direction.as_sql()));
        }
        q.sql.push_str(" ORDER BY ");
        q.sql.push_str(&order.join(", "));
    }
    if let Some(limit) = query.limit {
        let n = q.push_param(as_bigint(limit).to_string());
        q.sql.push_str(&format!(" LIMIT ${}::bigint", n));
    }
    if query.skip > 0 {
        let n = q.push_param(as_bigint(query.skip).to_string());
        q.sql.push_str(&format!(" OFFSET ${}::bigint", n));
    }
    q
}

pub fn insert_document(schema: &str, meta: &ClassMetadata, id_key: &str, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "INSERT INTO {} (id, body) VALUES ($1::text, $2::jsonb)",
        qualified_table(schema, &meta.collection)
    );
    q.push_param(id_key.to_string());
    q.push_param(Value::Object(body.clone()).to_string());
    q
}

pub fn replace_document(schema: &str, meta: &ClassMetadata, id_key: &str, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "UPDATE {} SET body = $2::jsonb WHERE id = $1::text",
        qualified_table(schema, &meta.collection)
    );
    q.push_param(id_key.to_string());
    q.push_param(Value::Object(body.clone()).to_string());
    q
}

pub fn delete_documents(schema: &str, meta: &ClassMetadata, criteria: &[Criterion]) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("DELETE FROM {}", qualified_table(schema, &meta.collection));
    q.push_where(criteria);
    q
}
