//! Per-resource options: document class, page size and collaborators resolved by name.

use crate::config::ResourceConfig;
use crate::error::ConfigError;
use crate::odm::DocumentManager;
use crate::registry::ServiceRegistry;
use crate::service::{DocumentValidator, Serializer};
use std::sync::Arc;

/// Collaborators set directly win over registry lookups. Nothing is checked until first use.
#[derive(Clone)]
pub struct ResourceOptions {
    config: ResourceConfig,
    registry: Option<Arc<ServiceRegistry>>,
    document_manager: Option<Arc<DocumentManager>>,
    serializer: Option<Arc<dyn Serializer>>,
    validator: Option<Arc<dyn DocumentValidator>>,
}

impl From<ResourceConfig> for ResourceOptions {
    fn from(config: ResourceConfig) -> Self {
        ResourceOptions::new(config)
    }
}

impl ResourceOptions {
    pub fn new(config: ResourceConfig) -> Self {
        ResourceOptions {
            config,
            registry: None,
            document_manager: None,
            serializer: None,
            validator: None,
        }
    }

    pub fn with_document_manager(mut self, dm: Arc<DocumentManager>) -> Self {
        self.document_manager = Some(dm);
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn DocumentValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn set_service_registry(&mut self, registry: Arc<ServiceRegistry>) {
        self.registry = Some(registry);
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    pub fn document_class(&self) -> &str {
        &self.config.document_class
    }

    pub fn limit(&self) -> u64 {
        self.config.limit
    }

    fn registry(&self, service: &str) -> Result<&ServiceRegistry, ConfigError> {
        self.registry
            .as_deref()
            .ok_or_else(|| ConfigError::MissingService(service.to_string()))
    }

    pub fn document_manager(&self) -> Result<Arc<DocumentManager>, ConfigError> {
        match &self.document_manager {
            Some(dm) => Ok(dm.clone()),
            None => self
                .registry(&self.config.document_manager)?
                .document_manager(&self.config.document_manager),
        }
    }

    pub fn serializer(&self) -> Result<Arc<dyn Serializer>, ConfigError> {
        match &self.serializer {
            Some(s) => Ok(s.clone()),
            None => self.registry(&self.config.serializer)?.serializer(&self.config.serializer),
        }
    }

    pub fn validator(&self) -> Result<Arc<dyn DocumentValidator>, ConfigError> {
        match &self.validator {
            Some(v) => Ok(v.clone()),
            None => self.registry(&self.config.validator)?.validator(&self.config.validator),
        }
    }
}
