//! Raw config types matching the JSON settings tree and the class mapping files.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Name used for every default connection, configuration, driver, event manager and document manager.
pub const DEFAULT_NAME: &str = "odm_default";

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_true() -> bool {
    true
}

/// Whole settings tree. Every section is optional; missing sections fall back to an in-memory setup.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub odm: OdmConfig,
    #[serde(default)]
    pub extensions: ExtensionsConfig,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceConfig>,
    #[serde(default)]
    pub services: ServicesConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body, in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

fn default_bind() -> String {
    "127.0.0.1:3000".into()
}

fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            body_limit: default_body_limit(),
        }
    }
}

/// Named values exposed through the service registry (e.g. the active user).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

/// Each section omitted from the JSON holds a single `odm_default` entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OdmConfig {
    #[serde(default = "default_entry")]
    pub connection: BTreeMap<String, ConnectionConfig>,
    #[serde(default = "default_entry")]
    pub configuration: BTreeMap<String, OdmConfiguration>,
    #[serde(default = "default_entry")]
    pub driver: BTreeMap<String, DriverConfig>,
    #[serde(default = "default_entry")]
    pub eventmanager: BTreeMap<String, EventManagerConfig>,
    #[serde(default = "default_entry")]
    pub documentmanager: BTreeMap<String, DocumentManagerConfig>,
}

fn default_entry<T: Default>() -> BTreeMap<String, T> {
    BTreeMap::from([(default_name(), T::default())])
}

impl Default for OdmConfig {
    fn default() -> Self {
        OdmConfig {
            connection: default_entry(),
            configuration: default_entry(),
            driver: default_entry(),
            eventmanager: default_entry(),
            documentmanager: default_entry(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub backend: Backend,
    /// PostgreSQL url; falls back to `DATABASE_URL`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            backend: Backend::Memory,
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OdmConfiguration {
    /// Cache name; the reader resolves `odm.cache.<name>`, default `odm.cache.array`.
    #[serde(default)]
    pub metadata_cache: Option<String>,
    /// Mapping driver used for this configuration.
    #[serde(default = "default_name")]
    pub driver: String,
    /// Annotation namespace -> path.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

impl Default for OdmConfiguration {
    fn default() -> Self {
        OdmConfiguration {
            metadata_cache: None,
            driver: default_name(),
            annotations: BTreeMap::new(),
            filters: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverClass {
    /// Delegates class namespaces to the named drivers in `drivers`.
    #[default]
    Chain,
    /// Reads JSON class mappings (with field annotations) from `paths`.
    Annotation,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub class: DriverClass,
    #[serde(default)]
    pub paths: Vec<String>,
    /// Namespace -> driver name (chain drivers only).
    #[serde(default)]
    pub drivers: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventManagerConfig {
    #[serde(default)]
    pub subscribers: Vec<SubscriberConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubscriberConfig {
    Stamp {
        #[serde(default)]
        active_user: Option<Value>,
    },
    Version,
    SoftDelete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterClass {
    SoftDelete,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub name: String,
    pub class: FilterClass,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentManagerConfig {
    #[serde(default = "default_name")]
    pub connection: String,
    #[serde(default = "default_name")]
    pub configuration: String,
    #[serde(default = "default_name")]
    pub eventmanager: String,
}

impl Default for DocumentManagerConfig {
    fn default() -> Self {
        DocumentManagerConfig {
            connection: default_name(),
            configuration: default_name(),
            eventmanager: default_name(),
        }
    }
}

/// Extension bootstrap settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExtensionsConfig {
    #[serde(default)]
    pub odm: ExtensionTargets,
    #[serde(default)]
    pub extension_configs: BTreeMap<String, ExtensionSettings>,
    #[serde(default)]
    pub active_user: Option<ActiveUserConfig>,
}

/// Which named odm sections receive the manifest contributions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtensionTargets {
    #[serde(default = "default_name")]
    pub configuration: String,
    #[serde(default = "default_name")]
    pub eventmanager: String,
    #[serde(default = "default_name")]
    pub driver: String,
}

impl Default for ExtensionTargets {
    fn default() -> Self {
        ExtensionTargets {
            configuration: default_name(),
            eventmanager: default_name(),
            driver: default_name(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionSettings {
    Enabled(bool),
    Settings(Map<String, Value>),
}

impl ExtensionSettings {
    pub fn is_enabled(&self) -> bool {
        match self {
            ExtensionSettings::Enabled(b) => *b,
            ExtensionSettings::Settings(m) => m.get("enabled").and_then(Value::as_bool).unwrap_or(true),
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self {
            ExtensionSettings::Enabled(_) => None,
            ExtensionSettings::Settings(m) => m.get(key).and_then(Value::as_str),
        }
    }
}

/// A string names a registry service; anything else is used as the user value itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActiveUserConfig {
    Service(String),
    Literal(Value),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub document_class: String,
    #[serde(default = "default_document_manager")]
    pub document_manager: String,
    #[serde(default = "default_serializer")]
    pub serializer: String,
    #[serde(default = "default_validator")]
    pub validator: String,
    /// Default and maximum page size for list.
    #[serde(default = "default_limit")]
    pub limit: u64,
}

pub fn default_document_manager() -> String {
    format!("odm.documentmanager.{}", DEFAULT_NAME)
}

fn default_serializer() -> String {
    "serializer".into()
}

fn default_validator() -> String {
    "validator".into()
}

fn default_limit() -> u64 {
    30
}

impl ResourceConfig {
    pub fn new(document_class: impl Into<String>) -> Self {
        ResourceConfig {
            document_class: document_class.into(),
            document_manager: default_document_manager(),
            serializer: default_serializer(),
            validator: default_validator(),
            limit: default_limit(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Identifier generated on flush when absent.
    #[default]
    Auto,
    /// Identifier must be supplied by the client.
    None,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    String,
    Int,
    Float,
    Boolean,
    Date,
    Hash,
    Collection,
}

/// One class mapping as read from a mapping file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassMappingConfig {
    pub class: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default = "default_identifier")]
    pub identifier: String,
    #[serde(default)]
    pub id_strategy: IdStrategy,
    #[serde(default)]
    pub fields: Vec<FieldMappingConfig>,
}

fn default_identifier() -> String {
    "id".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldMappingConfig {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// False hides the field from every serialized response.
    #[serde(default = "default_true")]
    pub serialize: bool,
    /// `<namespace>:<name>` markers read by extension subscribers and filters.
    #[serde(default)]
    pub annotations: Vec<String>,
    #[serde(default)]
    pub validation: ValidationRule,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}
