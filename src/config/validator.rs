//! Config validation: named references between odm sections, extension targets and resources.

use crate::config::{AppConfig, Backend, DriverClass};
use crate::error::ConfigError;
use std::collections::BTreeMap;

fn require<T>(map: &BTreeMap<String, T>, kind: &'static str, name: &str) -> Result<(), ConfigError> {
    if map.contains_key(name) {
        Ok(())
    } else {
        Err(ConfigError::MissingReference {
            kind,
            name: name.to_string(),
        })
    }
}

pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    let odm = &config.odm;

    for dm in odm.documentmanager.values() {
        require(&odm.connection, "connection", &dm.connection)?;
        require(&odm.configuration, "configuration", &dm.configuration)?;
        require(&odm.eventmanager, "eventmanager", &dm.eventmanager)?;
    }

    for c in odm.configuration.values() {
        require(&odm.driver, "driver", &c.driver)?;
    }

    for (name, driver) in &odm.driver {
        match driver.class {
            DriverClass::Chain => {
                for sub in driver.drivers.values() {
                    if sub == name {
                        return Err(ConfigError::Validation(format!("driver '{}' delegates to itself", name)));
                    }
                    require(&odm.driver, "driver", sub)?;
                }
            }
            DriverClass::Annotation => {
                if driver.paths.is_empty() {
                    return Err(ConfigError::Validation(format!("annotation driver '{}' has no paths", name)));
                }
            }
        }
    }

    for (name, connection) in &odm.connection {
        if connection.backend == Backend::Postgres && connection.url.is_none() {
            return Err(ConfigError::Validation(format!(
                "postgres connection '{}' needs a url (or DATABASE_URL)",
                name
            )));
        }
    }

    let targets = &config.extensions.odm;
    require(&odm.configuration, "configuration", &targets.configuration)?;
    require(&odm.eventmanager, "eventmanager", &targets.eventmanager)?;
    require(&odm.driver, "driver", &targets.driver)?;

    for (path, r) in &config.resources {
        if r.document_class.is_empty() {
            return Err(ConfigError::Validation(format!("resource '{}' has no document_class", path)));
        }
        for (field, value) in [
            ("document_manager", &r.document_manager),
            ("serializer", &r.serializer),
            ("validator", &r.validator),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Validation(format!("resource '{}' has an empty {}", path, field)));
            }
        }
        if r.limit == 0 {
            return Err(ConfigError::Validation(format!("resource '{}' has a zero limit", path)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, DriverConfig, ResourceConfig, DEFAULT_NAME};

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn dangling_chain_driver_is_reported() {
        let mut config = AppConfig::default();
        config
            .odm
            .driver
            .get_mut(DEFAULT_NAME)
            .unwrap()
            .drivers
            .insert("App\\".into(), "app".into());
        match validate(&config) {
            Err(ConfigError::MissingReference { kind, name }) => {
                assert_eq!(kind, "driver");
                assert_eq!(name, "app");
            }
            other => panic!("unexpected {:?}", other),
        }
        config.odm.driver.insert(
            "app".into(),
            DriverConfig {
                class: DriverClass::Annotation,
                paths: vec!["mappings".into()],
                ..DriverConfig::default()
            },
        );
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn postgres_without_url_is_invalid() {
        let mut config = AppConfig::default();
        config.odm.connection.insert(
            DEFAULT_NAME.into(),
            ConnectionConfig {
                backend: Backend::Postgres,
                ..ConnectionConfig::default()
            },
        );
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn resources_need_a_class() {
        let mut config = AppConfig::default();
        config.resources.insert("posts".into(), ResourceConfig::new(""));
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn extension_targets_must_exist() {
        let mut config = AppConfig::default();
        config.extensions.odm.eventmanager = "audit".into();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::MissingReference { kind: "eventmanager", .. })
        ));
    }
}
