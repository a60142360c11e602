//! Serializer and validator services used by the REST controller.

mod serializer;
mod validation;
pub use serializer::{MetadataSerializer, Serializer};
pub use validation::{DocumentValidator, MetadataValidator, ValidationResult};
