//! Flush-time event subscribers. Subscribers act on fields carrying their annotations.

use crate::config::{EventManagerConfig, SubscriberConfig};
use crate::odm::document::{Document, FieldAccess};
use crate::odm::metadata::ClassMetadata;
use serde_json::Value;
use std::sync::Arc;

pub const STAMP_CREATED_BY: &str = "stamp:createdBy";
pub const STAMP_CREATED_ON: &str = "stamp:createdOn";
pub const STAMP_UPDATED_BY: &str = "stamp:updatedBy";
pub const STAMP_UPDATED_ON: &str = "stamp:updatedOn";
pub const VERSION_NUMBER: &str = "version:number";
pub const SOFT_DELETE_FLAG: &str = "softDelete:flag";
pub const SOFT_DELETE_ON: &str = "softDelete:deletedOn";

pub trait EventSubscriber: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once for a new document, before it is inserted.
    fn pre_persist(&self, _document: &mut Document, _meta: &ClassMetadata) {}

    /// Called for a managed document whose fields changed, before it is written.
    fn pre_update(&self, _document: &mut Document, _meta: &ClassMetadata) {}
}

#[derive(Clone, Default)]
pub struct EventManager {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventManager {
    pub fn new() -> Self {
        EventManager::default()
    }

    pub fn from_config(config: &EventManagerConfig) -> Self {
        let mut manager = EventManager::new();
        for s in &config.subscribers {
            manager.add_subscriber(subscriber_from_config(s));
        }
        manager
    }

    pub fn add_subscriber(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn subscriber_names(&self) -> Vec<&'static str> {
        self.subscribers.iter().map(|s| s.name()).collect()
    }

    pub fn dispatch_pre_persist(&self, document: &mut Document, meta: &ClassMetadata) {
        for s in &self.subscribers {
            s.pre_persist(document, meta);
        }
    }

    pub fn dispatch_pre_update(&self, document: &mut Document, meta: &ClassMetadata) {
        for s in &self.subscribers {
            s.pre_update(document, meta);
        }
    }
}

pub fn subscriber_from_config(config: &SubscriberConfig) -> Arc<dyn EventSubscriber> {
    match config {
        SubscriberConfig::Stamp { active_user } => Arc::new(StampSubscriber {
            active_user: active_user.clone(),
        }),
        SubscriberConfig::Version => Arc::new(VersionSubscriber),
        SubscriberConfig::SoftDelete => Arc::new(SoftDeleteSubscriber),
    }
}

fn now() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339())
}

fn put_all(document: &mut Document, meta: &ClassMetadata, annotation: &str, value: &Value) {
    let fields: Vec<String> = meta.fields_with_annotation(annotation).map(|f| f.name.clone()).collect();
    for f in fields {
        document.put(&f, value.clone());
    }
}

/// Records who created or last changed a document, and when.
pub struct StampSubscriber {
    pub active_user: Option<Value>,
}

impl EventSubscriber for StampSubscriber {
    fn name(&self) -> &'static str {
        "stamp"
    }

    fn pre_persist(&self, document: &mut Document, meta: &ClassMetadata) {
        let at = now();
        put_all(document, meta, STAMP_CREATED_ON, &at);
        put_all(document, meta, STAMP_UPDATED_ON, &at);
        if let Some(user) = &self.active_user {
            put_all(document, meta, STAMP_CREATED_BY, user);
            put_all(document, meta, STAMP_UPDATED_BY, user);
        }
    }

    fn pre_update(&self, document: &mut Document, meta: &ClassMetadata) {
        put_all(document, meta, STAMP_UPDATED_ON, &now());
        if let Some(user) = &self.active_user {
            put_all(document, meta, STAMP_UPDATED_BY, user);
        }
    }
}

/// Keeps an integer revision counter: 1 on insert, +1 on every write.
pub struct VersionSubscriber;

impl EventSubscriber for VersionSubscriber {
    fn name(&self) -> &'static str {
        "version"
    }

    fn pre_persist(&self, document: &mut Document, meta: &ClassMetadata) {
        put_all(document, meta, VERSION_NUMBER, &Value::from(1));
    }

    fn pre_update(&self, document: &mut Document, meta: &ClassMetadata) {
        let fields: Vec<String> = meta.fields_with_annotation(VERSION_NUMBER).map(|f| f.name.clone()).collect();
        for f in fields {
            let next = document.get_field(&f).and_then(Value::as_i64).unwrap_or(0) + 1;
            document.put(&f, Value::from(next));
        }
    }
}

/// Normalises the soft-delete flag and stamps the deletion time when it flips.
pub struct SoftDeleteSubscriber;

impl SoftDeleteSubscriber {
    fn is_deleted(document: &Document, meta: &ClassMetadata) -> bool {
        meta.fields_with_annotation(SOFT_DELETE_FLAG)
            .any(|f| document.get_field(&f.name) == Some(&Value::Bool(true)))
    }
}

impl EventSubscriber for SoftDeleteSubscriber {
    fn name(&self) -> &'static str {
        "soft_delete"
    }

    fn pre_persist(&self, document: &mut Document, meta: &ClassMetadata) {
        let unset: Vec<String> = meta
            .fields_with_annotation(SOFT_DELETE_FLAG)
            .filter(|f| document.get_field(&f.name).map(Value::is_null).unwrap_or(true))
            .map(|f| f.name.clone())
            .collect();
        for f in unset {
            document.put(&f, Value::Bool(false));
        }
    }

    fn pre_update(&self, document: &mut Document, meta: &ClassMetadata) {
        let deleted = Self::is_deleted(document, meta);
        let fields: Vec<String> = meta.fields_with_annotation(SOFT_DELETE_ON).map(|f| f.name.clone()).collect();
        for f in fields {
            let stamped = document.get_field(&f).map(|v| !v.is_null()).unwrap_or(false);
            if deleted && !stamped {
                document.put(&f, now());
            } else if !deleted && stamped {
                document.put(&f, Value::Null);
            }
        }
    }
}
