//! Startup in explicit phases: `Bootstrap::load_modules_post` finalizes the configuration once,
//! then the resulting `Application` connects stores, registers CLI commands and builds the HTTP state.

use crate::config::{ActiveUserConfig, AppConfig, Backend, DEFAULT_NAME};
use crate::controller::RestController;
use crate::error::{AppError, ConfigError};
use crate::extensions::cli::CliRegistry;
use crate::extensions::manifest::{Manifest, ManifestConfig};
use crate::extensions::merge::merge_manifest;
use crate::odm::{
    filters_from_config, load_metadata, AnnotationReader, DocumentManager, DocumentStore, EventManager,
    MemoryStore, PgStore,
};
use crate::registry::{document_manager_service, ServiceRegistry, ARRAY_CACHE};
use crate::state::AppState;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub struct Bootstrap {
    config: AppConfig,
    registry: ServiceRegistry,
}

impl Bootstrap {
    /// Values under `services.values` are registered before anything is resolved.
    pub fn new(config: AppConfig, mut registry: ServiceRegistry) -> Self {
        for (name, value) in &config.services.values {
            registry.register_value(name.clone(), value.clone());
        }
        Bootstrap { config, registry }
    }

    fn metadata_cache_name(&self) -> String {
        self.config
            .odm
            .configuration
            .get(&self.config.extensions.odm.configuration)
            .and_then(|c| c.metadata_cache.as_deref())
            .map(|name| format!("odm.cache.{}", name))
            .unwrap_or_else(|| ARRAY_CACHE.to_string())
    }

    fn active_user(&self) -> Result<Option<Value>, ConfigError> {
        Ok(match &self.config.extensions.active_user {
            Some(ActiveUserConfig::Service(name)) => Some(self.registry.value(name)?),
            Some(ActiveUserConfig::Literal(value)) => Some(value.clone()),
            None => None,
        })
    }

    /// Build the manifest and merge its contributions into the odm tree.
    pub fn load_modules_post(self) -> Result<Application, ConfigError> {
        let cache_name = self.metadata_cache_name();
        let cache = self.registry.cache(&cache_name)?;
        tracing::debug!(cache = %cache_name, "annotation reader cache");

        let manifest = Manifest::new(ManifestConfig {
            annotation_reader: Arc::new(AnnotationReader::new(cache)),
            extension_configs: self.config.extensions.extension_configs.clone(),
            active_user: self.active_user()?,
        })?;

        let Bootstrap { mut config, registry } = self;
        config.odm = merge_manifest(&config.odm, &config.extensions.odm, &manifest);
        Ok(Application {
            config,
            manifest,
            registry,
        })
    }
}

/// Finalized configuration plus the services built from it.
pub struct Application {
    config: AppConfig,
    manifest: Manifest,
    registry: ServiceRegistry,
}

impl Application {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Build the named document manager over a store, from the finalized odm tree.
    pub fn document_manager(&self, name: &str, store: Arc<dyn DocumentStore>) -> Result<DocumentManager, ConfigError> {
        let odm = &self.config.odm;
        let dm = odm
            .documentmanager
            .get(name)
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "documentmanager",
                name: name.to_string(),
            })?;
        let configuration = odm
            .configuration
            .get(&dm.configuration)
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "configuration",
                name: dm.configuration.clone(),
            })?;
        let events = odm
            .eventmanager
            .get(&dm.eventmanager)
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "eventmanager",
                name: dm.eventmanager.clone(),
            })?;
        let metadata = load_metadata(odm, &dm.configuration, self.manifest.annotation_reader())?;
        let manager = DocumentManager::new(store, metadata)
            .with_event_manager(EventManager::from_config(events))
            .with_filters(filters_from_config(&configuration.filters));
        tracing::info!(
            document_manager = %name,
            subscribers = ?manager.event_manager().subscriber_names(),
            filters = ?manager.filter_names(),
            "document manager ready"
        );
        Ok(manager)
    }

    /// Open every configured connection and register each document manager as `odm.documentmanager.<name>`.
    /// Document managers naming the same connection share its store.
    pub async fn connect(&mut self) -> Result<(), AppError> {
        let mut stores: HashMap<String, Arc<dyn DocumentStore>> = HashMap::new();
        let managers: Vec<(String, String)> = self
            .config
            .odm
            .documentmanager
            .iter()
            .map(|(name, dm)| (name.clone(), dm.connection.clone()))
            .collect();

        for (name, connection_name) in managers {
            let connection = self
                .config
                .odm
                .connection
                .get(&connection_name)
                .ok_or_else(|| ConfigError::MissingReference {
                    kind: "connection",
                    name: connection_name.clone(),
                })?;
            let dm = match connection.backend {
                Backend::Memory => {
                    let store = stores
                        .entry(connection_name.clone())
                        .or_insert_with(|| Arc::new(MemoryStore::new()))
                        .clone();
                    self.document_manager(&name, store)?
                }
                Backend::Postgres => {
                    let pg = match stores.get(&connection_name) {
                        Some(store) => store.clone(),
                        None => {
                            let url = connection.url.clone().ok_or_else(|| {
                                ConfigError::Validation(format!("connection '{}' has no url", connection_name))
                            })?;
                            let pg = PgStore::connect(&url, connection.max_connections).await?;
                            tracing::info!(connection = %connection_name, "postgres connected");
                            let store: Arc<dyn DocumentStore> = Arc::new(pg);
                            stores.insert(connection_name.clone(), store.clone());
                            store
                        }
                    };
                    let dm = self.document_manager(&name, pg)?;
                    dm.ensure_collections().await?;
                    dm
                }
            };
            self.registry
                .register_document_manager(document_manager_service(&name), Arc::new(dm));
        }
        Ok(())
    }

    /// Second phase: register the manifest's commands and helpers.
    pub fn load_cli(&self, cli: &mut CliRegistry) {
        cli.add_commands(self.manifest.cli_commands());
        match self.registry.document_manager(&document_manager_service(DEFAULT_NAME)) {
            Ok(dm) => {
                for (name, helper) in self.manifest.cli_helpers(&dm) {
                    cli.helper_set_mut().set(name, helper);
                }
            }
            Err(e) => tracing::warn!(error = %e, "cli helpers not registered"),
        }
    }

    /// Controllers for every configured resource, sharing the registry.
    pub fn into_state(self) -> AppState {
        let registry = Arc::new(self.registry);
        let resources = self
            .config
            .resources
            .into_iter()
            .map(|(path, resource)| {
                let mut controller = RestController::new(resource);
                controller.set_service_registry(registry.clone());
                (path, controller)
            })
            .collect();
        AppState::new(resources, registry)
    }
}
