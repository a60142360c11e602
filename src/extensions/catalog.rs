//! Known extensions and what each contributes to the document layer.

use crate::config::{ExtensionSettings, FilterClass, FilterConfig, SubscriberConfig};
use crate::error::ConfigError;
use crate::extensions::cli::{CliCommand, SoftDeletePurgeCommand};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const STAMP: &str = "stamp";
pub const VERSION: &str = "version";
pub const SOFT_DELETE: &str = "softDelete";

const SOFT_DELETE_NAMESPACE: &str = "Docstore\\Extensions\\SoftDelete\\";

pub trait Extension: Send + Sync {
    fn name(&self) -> &'static str;

    fn subscribers(&self) -> Vec<SubscriberConfig> {
        Vec::new()
    }

    /// Annotation namespace -> provider.
    fn annotations(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn filters(&self) -> Vec<FilterConfig> {
        Vec::new()
    }

    /// Class namespace -> mapping path, in registration order.
    fn documents(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn cli_commands(&self) -> Vec<Arc<dyn CliCommand>> {
        Vec::new()
    }
}

fn provided_by(namespace: &str, extension: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(namespace.to_string(), format!("docstore.extensions.{}", extension))])
}

/// Created/updated by and on.
pub struct StampExtension {
    active_user: Option<Value>,
}

impl Extension for StampExtension {
    fn name(&self) -> &'static str {
        STAMP
    }

    fn subscribers(&self) -> Vec<SubscriberConfig> {
        vec![SubscriberConfig::Stamp {
            active_user: self.active_user.clone(),
        }]
    }

    fn annotations(&self) -> BTreeMap<String, String> {
        provided_by("stamp", STAMP)
    }
}

/// Revision counter.
pub struct VersionExtension;

impl Extension for VersionExtension {
    fn name(&self) -> &'static str {
        VERSION
    }

    fn subscribers(&self) -> Vec<SubscriberConfig> {
        vec![SubscriberConfig::Version]
    }

    fn annotations(&self) -> BTreeMap<String, String> {
        provided_by("version", VERSION)
    }
}

/// Soft deletion: flag subscriber, read filter, purge command and optional bundled documents.
pub struct SoftDeleteExtension {
    document: Option<(String, String)>,
}

impl Extension for SoftDeleteExtension {
    fn name(&self) -> &'static str {
        SOFT_DELETE
    }

    fn subscribers(&self) -> Vec<SubscriberConfig> {
        vec![SubscriberConfig::SoftDelete]
    }

    fn annotations(&self) -> BTreeMap<String, String> {
        provided_by("softDelete", SOFT_DELETE)
    }

    fn filters(&self) -> Vec<FilterConfig> {
        vec![FilterConfig {
            name: "soft_delete".into(),
            class: FilterClass::SoftDelete,
            enabled: true,
        }]
    }

    fn documents(&self) -> Vec<(String, String)> {
        self.document.iter().cloned().collect()
    }

    fn cli_commands(&self) -> Vec<Arc<dyn CliCommand>> {
        vec![Arc::new(SoftDeletePurgeCommand)]
    }
}

/// Instantiate a catalog extension from its settings.
pub fn build_extension(
    name: &str,
    settings: &ExtensionSettings,
    active_user: Option<&Value>,
) -> Result<Box<dyn Extension>, ConfigError> {
    match name {
        STAMP => {
            let required = matches!(settings, ExtensionSettings::Settings(m)
                if m.get("requireActiveUser").and_then(Value::as_bool) == Some(true));
            if required && active_user.is_none() {
                return Err(ConfigError::ExtensionRequirement {
                    extension: STAMP.into(),
                    requirement: "an active user".into(),
                });
            }
            if active_user.is_none() {
                tracing::warn!("stamp extension enabled without an active user; only dates will be stamped");
            }
            Ok(Box::new(StampExtension {
                active_user: active_user.cloned(),
            }))
        }
        VERSION => Ok(Box::new(VersionExtension)),
        SOFT_DELETE => {
            let document = settings.get_str("documentPath").map(|path| {
                let namespace = settings.get_str("documentNamespace").unwrap_or(SOFT_DELETE_NAMESPACE);
                (namespace.to_string(), path.to_string())
            });
            Ok(Box::new(SoftDeleteExtension { document }))
        }
        other => Err(ConfigError::UnknownExtension(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(v: Value) -> ExtensionSettings {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn soft_delete_contributes_everything() {
        let ext = build_extension(SOFT_DELETE, &settings(json!({"documentPath": "mappings/soft"})), None).unwrap();
        assert_eq!(ext.subscribers(), vec![SubscriberConfig::SoftDelete]);
        assert_eq!(ext.filters()[0].name, "soft_delete");
        assert_eq!(
            ext.documents(),
            vec![(SOFT_DELETE_NAMESPACE.to_string(), "mappings/soft".to_string())]
        );
        assert_eq!(ext.cli_commands()[0].name(), "soft-delete:purge");
        assert!(ext.annotations().contains_key("softDelete"));
    }

    #[test]
    fn stamp_carries_the_active_user() {
        let user = json!("alice");
        let ext = build_extension(STAMP, &settings(json!(true)), Some(&user)).unwrap();
        assert_eq!(
            ext.subscribers(),
            vec![SubscriberConfig::Stamp {
                active_user: Some(json!("alice"))
            }]
        );
    }

    #[test]
    fn stamp_can_require_an_active_user() {
        let err = build_extension(STAMP, &settings(json!({"requireActiveUser": true})), None).err();
        assert!(matches!(err, Some(ConfigError::ExtensionRequirement { .. })));
    }

    #[test]
    fn unknown_extensions_fail() {
        let err = build_extension("geo", &settings(json!(true)), None).err();
        assert!(matches!(err, Some(ConfigError::UnknownExtension(name)) if name == "geo"));
    }
}
