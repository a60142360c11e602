//! Extension manifest: the enabled extensions and their combined contributions.

use crate::config::{ExtensionSettings, FilterConfig, SubscriberConfig};
use crate::error::ConfigError;
use crate::extensions::catalog::{build_extension, Extension};
use crate::extensions::cli::{
    CliCommand, ExtensionsListCommand, Helper, ACTIVE_USER_HELPER, DOCUMENT_MANAGER_HELPER,
};
use crate::odm::{AnnotationReader, DocumentManager};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct ManifestConfig {
    pub annotation_reader: Arc<AnnotationReader>,
    pub extension_configs: BTreeMap<String, ExtensionSettings>,
    pub active_user: Option<Value>,
}

pub struct Manifest {
    annotation_reader: Arc<AnnotationReader>,
    active_user: Option<Value>,
    extensions: Vec<Box<dyn Extension>>,
}

/// JSON view of a manifest, for `manifest` and diagnostics.
#[derive(Debug, Serialize)]
pub struct ManifestDescription {
    pub extensions: Vec<&'static str>,
    pub subscribers: Vec<SubscriberConfig>,
    pub annotations: BTreeMap<String, String>,
    pub filters: Vec<FilterConfig>,
    pub documents: Vec<(String, String)>,
    pub cli_commands: Vec<&'static str>,
    pub cli_helpers: Vec<&'static str>,
}

impl Manifest {
    /// Instantiate every enabled extension. Disabled entries are skipped; unknown names fail.
    pub fn new(config: ManifestConfig) -> Result<Self, ConfigError> {
        let mut extensions = Vec::new();
        for (name, settings) in &config.extension_configs {
            if !settings.is_enabled() {
                tracing::debug!(extension = %name, "extension disabled");
                continue;
            }
            extensions.push(build_extension(name, settings, config.active_user.as_ref())?);
        }
        tracing::info!(extensions = ?extensions.iter().map(|e| e.name()).collect::<Vec<_>>(), "manifest built");
        Ok(Manifest {
            annotation_reader: config.annotation_reader,
            active_user: config.active_user,
            extensions,
        })
    }

    pub fn annotation_reader(&self) -> &Arc<AnnotationReader> {
        &self.annotation_reader
    }

    pub fn active_user(&self) -> Option<&Value> {
        self.active_user.as_ref()
    }

    pub fn extension_names(&self) -> Vec<&'static str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    pub fn subscribers(&self) -> Vec<SubscriberConfig> {
        self.extensions.iter().flat_map(|e| e.subscribers()).collect()
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.extensions.iter().flat_map(|e| e.annotations()).collect()
    }

    pub fn filters(&self) -> Vec<FilterConfig> {
        self.extensions.iter().flat_map(|e| e.filters()).collect()
    }

    pub fn documents(&self) -> Vec<(String, String)> {
        self.extensions.iter().flat_map(|e| e.documents()).collect()
    }

    pub fn cli_commands(&self) -> Vec<Arc<dyn CliCommand>> {
        let mut commands: Vec<Arc<dyn CliCommand>> = vec![Arc::new(ExtensionsListCommand {
            extensions: self.extension_names().into_iter().map(String::from).collect(),
        })];
        commands.extend(self.extensions.iter().flat_map(|e| e.cli_commands()));
        commands
    }

    pub fn cli_helpers(&self, dm: &Arc<DocumentManager>) -> Vec<(&'static str, Helper)> {
        let mut helpers = vec![(DOCUMENT_MANAGER_HELPER, Helper::DocumentManager(dm.clone()))];
        if let Some(user) = &self.active_user {
            helpers.push((ACTIVE_USER_HELPER, Helper::Value(user.clone())));
        }
        helpers
    }

    pub fn describe(&self) -> ManifestDescription {
        let mut cli_helpers = vec![DOCUMENT_MANAGER_HELPER];
        if self.active_user.is_some() {
            cli_helpers.push(ACTIVE_USER_HELPER);
        }
        ManifestDescription {
            extensions: self.extension_names(),
            subscribers: self.subscribers(),
            annotations: self.annotations(),
            filters: self.filters(),
            documents: self.documents(),
            cli_commands: self.cli_commands().iter().map(|c| c.name()).collect(),
            cli_helpers,
        }
    }
}
