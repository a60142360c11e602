//! Docstore REST: a generic REST controller over a small document mapper, with an extension
//! bootstrap that wires soft-delete, versioning and stamping into the mapper configuration.

pub mod config;
pub mod controller;
pub mod error;
pub mod extensions;
pub mod handlers;
pub mod odm;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{load, AppConfig, ResourceConfig};
pub use controller::{ListPage, ListRequest, ResourceOptions, RestController};
pub use error::{AppError, ConfigError, StoreError};
pub use extensions::{Application, Bootstrap, CliRegistry, Manifest};
pub use odm::{DocumentManager, MemoryStore, PgStore};
pub use registry::ServiceRegistry;
pub use routes::{app_router, common_routes_with_ready, resource_routes};
pub use state::AppState;
