//! Named service lookup shared by the controllers and the bootstrap.

use crate::error::ConfigError;
use crate::odm::{CacheKind, DocumentManager};
use crate::service::{DocumentValidator, MetadataSerializer, MetadataValidator, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_SERIALIZER: &str = "serializer";
pub const DEFAULT_VALIDATOR: &str = "validator";
pub const ARRAY_CACHE: &str = "odm.cache.array";
pub const NULL_CACHE: &str = "odm.cache.null";

/// Service name of a document manager built from `odm.documentmanager.<name>`.
pub fn document_manager_service(name: &str) -> String {
    format!("odm.documentmanager.{}", name)
}

#[derive(Clone)]
pub struct ServiceRegistry {
    document_managers: HashMap<String, Arc<DocumentManager>>,
    serializers: HashMap<String, Arc<dyn Serializer>>,
    validators: HashMap<String, Arc<dyn DocumentValidator>>,
    values: HashMap<String, Value>,
    caches: HashMap<String, CacheKind>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        ServiceRegistry::with_defaults()
    }
}

impl ServiceRegistry {
    /// Empty registry, without default services.
    pub fn empty() -> Self {
        ServiceRegistry {
            document_managers: HashMap::new(),
            serializers: HashMap::new(),
            validators: HashMap::new(),
            values: HashMap::new(),
            caches: HashMap::new(),
        }
    }

    /// Registry with the metadata serializer, metadata validator and both metadata caches.
    pub fn with_defaults() -> Self {
        let mut r = ServiceRegistry::empty();
        r.register_serializer(DEFAULT_SERIALIZER, Arc::new(MetadataSerializer));
        r.register_validator(DEFAULT_VALIDATOR, Arc::new(MetadataValidator));
        r.register_cache(ARRAY_CACHE, CacheKind::Array);
        r.register_cache(NULL_CACHE, CacheKind::Null);
        r
    }

    pub fn register_document_manager(&mut self, name: impl Into<String>, dm: Arc<DocumentManager>) {
        self.document_managers.insert(name.into(), dm);
    }

    pub fn register_serializer(&mut self, name: impl Into<String>, serializer: Arc<dyn Serializer>) {
        self.serializers.insert(name.into(), serializer);
    }

    pub fn register_validator(&mut self, name: impl Into<String>, validator: Arc<dyn DocumentValidator>) {
        self.validators.insert(name.into(), validator);
    }

    pub fn register_value(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn register_cache(&mut self, name: impl Into<String>, kind: CacheKind) {
        self.caches.insert(name.into(), kind);
    }

    pub fn document_manager(&self, name: &str) -> Result<Arc<DocumentManager>, ConfigError> {
        self.document_managers
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::MissingService(name.to_string()))
    }

    pub fn serializer(&self, name: &str) -> Result<Arc<dyn Serializer>, ConfigError> {
        self.serializers
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::MissingService(name.to_string()))
    }

    pub fn validator(&self, name: &str) -> Result<Arc<dyn DocumentValidator>, ConfigError> {
        self.validators
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::MissingService(name.to_string()))
    }

    pub fn value(&self, name: &str) -> Result<Value, ConfigError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::MissingService(name.to_string()))
    }

    pub fn cache(&self, name: &str) -> Result<CacheKind, ConfigError> {
        self.caches
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::MissingService(name.to_string()))
    }

    pub fn document_manager_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.document_managers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
