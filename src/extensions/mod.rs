//! Module bootstrap: extension catalog, manifest, configuration merge, phased startup and CLI.

mod bootstrap;
mod catalog;
mod cli;
mod manifest;
mod merge;

pub use bootstrap::{Application, Bootstrap};
pub use catalog::{build_extension, Extension, SOFT_DELETE, STAMP, VERSION};
pub use cli::{
    CliCommand, CliRegistry, ExtensionsListCommand, Helper, HelperSet, SoftDeletePurgeCommand, ACTIVE_USER_HELPER,
    DOCUMENT_MANAGER_HELPER,
};
pub use manifest::{Manifest, ManifestConfig, ManifestDescription};
pub use merge::{extension_driver_name, merge_manifest};
