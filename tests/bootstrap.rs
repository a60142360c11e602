//! Bootstrap tests: manifest merge into the odm tree, bundled extension documents and CLI commands.

use docstore_rest::config::{load_from_file, validate, DriverClass, DEFAULT_NAME};
use docstore_rest::extensions::{extension_driver_name, DOCUMENT_MANAGER_HELPER};
use docstore_rest::{AppConfig, Bootstrap, CliRegistry, ConfigError, ServiceRegistry};
use serde_json::{json, Value};
use std::path::Path;

const TRASH_MAPPING: &str = r#"{
    "class": "Docstore\\Extensions\\SoftDelete\\Trash",
    "fields": [
        { "name": "label", "type": "string" },
        { "name": "deleted", "type": "boolean", "annotations": ["softDelete:flag"] }
    ]
}"#;

fn config(value: Value) -> AppConfig {
    serde_json::from_value(value).unwrap()
}

fn args(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[test]
fn bundled_configuration_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/docstore.json");
    let config = load_from_file(&path).unwrap();
    validate(&config).unwrap();
    assert_eq!(config.resources["posts"].document_class, "App\\Post");
}

#[tokio::test]
async fn bundled_configuration_maps_every_resource_class() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/docstore.json");
    let config = load_from_file(&path).unwrap();
    let mut app = Bootstrap::new(config, ServiceRegistry::default()).load_modules_post().unwrap();
    app.connect().await.unwrap();

    let dm = app
        .registry()
        .document_manager("odm.documentmanager.odm_default")
        .unwrap();
    let author = dm.class_metadata("App\\Author").unwrap();
    assert_eq!(author.identifier, "handle");
    let post = dm.class_metadata("App\\Post").unwrap();
    assert_eq!(post.fields_with_annotation("version:number").count(), 1);
    assert_eq!(app.manifest().active_user(), Some(&json!("api")));
}

#[tokio::test]
async fn soft_delete_documents_are_chained_and_purgeable() {
    let bundled = tempfile::tempdir().unwrap();
    std::fs::write(bundled.path().join("trash.json"), TRASH_MAPPING).unwrap();
    let c = config(json!({
        "extensions": {
            "extension_configs": {
                "softDelete": { "documentPath": bundled.path().to_string_lossy() },
                "version": { "enabled": false }
            }
        },
        "resources": { "trash": { "document_class": "Docstore\\Extensions\\SoftDelete\\Trash" } }
    }));

    let mut app = Bootstrap::new(c, ServiceRegistry::default()).load_modules_post().unwrap();
    let odm = &app.config().odm;
    let driver = extension_driver_name(0);
    assert_eq!(odm.driver[DEFAULT_NAME].drivers["Docstore\\Extensions\\SoftDelete\\"], driver);
    assert_eq!(odm.driver[&driver].class, DriverClass::Annotation);
    assert_eq!(app.manifest().extension_names(), vec!["softDelete"]);

    app.connect().await.unwrap();
    let mut cli = CliRegistry::new();
    app.load_cli(&mut cli);
    assert_eq!(cli.helper_set().names(), vec![DOCUMENT_MANAGER_HELPER]);
    assert_eq!(cli.run(&args(&["extensions:list"])).await.unwrap(), "softDelete");

    let state = app.into_state();
    let trash = state.controller("trash").unwrap();
    for (id, label) in [("t1", "keep"), ("t2", "drop")] {
        trash.create(json!({"id": id, "label": label})).await.unwrap();
    }
    trash.update("t2", json!({"deleted": true})).await.unwrap();

    let out = cli
        .run(&args(&["soft-delete:purge", "--class", "Docstore\\Extensions\\SoftDelete\\Trash"]))
        .await
        .unwrap();
    assert_eq!(out, "purged 1 documents of Docstore\\Extensions\\SoftDelete\\Trash");
    assert!(trash.get("t1").await.is_ok());
}

#[test]
fn unknown_extension_fails_the_bootstrap() {
    let c = config(json!({"extensions": {"extension_configs": {"translatable": true}}}));
    let err = Bootstrap::new(c, ServiceRegistry::default()).load_modules_post().err();
    assert!(matches!(err, Some(ConfigError::UnknownExtension(name)) if name == "translatable"));
}

#[test]
fn stamp_requiring_an_active_user_fails_without_one() {
    let c = config(json!({"extensions": {"extension_configs": {"stamp": {"requireActiveUser": true}}}}));
    let err = Bootstrap::new(c, ServiceRegistry::default()).load_modules_post().err();
    assert!(matches!(err, Some(ConfigError::ExtensionRequirement { .. })));
}

#[test]
fn manifest_description_lists_contributions() {
    let c = config(json!({
        "extensions": {
            "extension_configs": { "stamp": true, "version": true },
            "active_user": { "name": "ops" }
        }
    }));
    let app = Bootstrap::new(c, ServiceRegistry::default()).load_modules_post().unwrap();
    let description = serde_json::to_value(app.manifest().describe()).unwrap();
    assert_eq!(description["extensions"], json!(["stamp", "version"]));
    assert_eq!(description["cli_commands"], json!(["extensions:list"]));
    assert_eq!(
        description["subscribers"],
        json!([{"type": "stamp", "active_user": {"name": "ops"}}, {"type": "version"}])
    );
    assert_eq!(
        app.config().odm.eventmanager[DEFAULT_NAME].subscribers.len(),
        2
    );
}
