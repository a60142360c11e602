//! Load the settings tree from JSON and apply environment overrides.

use crate::config::types::{AppConfig, Backend};
use crate::config::validate;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/docstore.json";

/// Config file path from env `DOCSTORE_CONFIG`, default `config/docstore.json`.
pub fn config_path() -> PathBuf {
    std::env::var("DOCSTORE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load_from_str(json: &str) -> Result<AppConfig, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

pub fn load_from_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    load_from_str(&text)
}

/// `DOCSTORE_BIND` replaces the bind address; `DATABASE_URL` fills postgres connections without a url.
pub fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(bind) = std::env::var("DOCSTORE_BIND") {
        config.server.bind = bind;
    }
    if let Ok(url) = std::env::var("DATABASE_URL") {
        for connection in config.odm.connection.values_mut() {
            if connection.backend == Backend::Postgres && connection.url.is_none() {
                connection.url = Some(url.clone());
            }
        }
    }
}

/// Read `.env`, then the config file (defaults when the default path is absent), apply env overrides and validate.
pub fn load() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    let path = config_path();
    let mut config = if path.exists() || std::env::var("DOCSTORE_CONFIG").is_ok() {
        load_from_file(&path)?
    } else {
        tracing::info!(path = %path.display(), "no config file, using defaults");
        AppConfig::default()
    };
    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}
