//! Merge manifest contributions into the odm settings tree.

use crate::config::{DriverClass, DriverConfig, ExtensionTargets, OdmConfig};
use crate::extensions::manifest::Manifest;

/// Driver name for the n-th manifest document namespace.
pub fn extension_driver_name(n: usize) -> String {
    format!("docstore.extensions.{}", n)
}

/// Returns a new tree; existing subscribers and filters are kept ahead of the manifest's.
/// Target sections missing from the tree are created with defaults.
pub fn merge_manifest(odm: &OdmConfig, targets: &ExtensionTargets, manifest: &Manifest) -> OdmConfig {
    let mut merged = odm.clone();

    let events = merged.eventmanager.entry(targets.eventmanager.clone()).or_default();
    events.subscribers.extend(manifest.subscribers());

    let configuration = merged.configuration.entry(targets.configuration.clone()).or_default();
    configuration.annotations.extend(manifest.annotations());
    configuration.filters.extend(manifest.filters());

    for (n, (namespace, path)) in manifest.documents().into_iter().enumerate() {
        let name = extension_driver_name(n);
        merged
            .driver
            .entry(targets.driver.clone())
            .or_default()
            .drivers
            .insert(namespace, name.clone());
        merged.driver.insert(
            name,
            DriverConfig {
                class: DriverClass::Annotation,
                paths: vec![path],
                drivers: Default::default(),
            },
        );
    }

    tracing::info!(
        eventmanager = %targets.eventmanager,
        configuration = %targets.configuration,
        driver = %targets.driver,
        subscribers = merged.eventmanager.get(&targets.eventmanager).map(|e| e.subscribers.len()).unwrap_or(0),
        "manifest merged into odm configuration"
    );
    merged
}
