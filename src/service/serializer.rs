//! Document (de)serialization driven by class metadata.

use crate::error::StoreError;
use crate::odm::{ClassMetadata, Document, FieldAccess};
use serde::de::Error as _;
use serde_json::{Map, Value};

pub trait Serializer: Send + Sync {
    /// Serialize a hydrated document.
    fn to_value(&self, document: &Document, meta: &ClassMetadata) -> Result<Value, StoreError>;

    /// Build a new, untracked document from a request body.
    fn from_value(&self, body: Value, meta: &ClassMetadata) -> Result<Document, StoreError>;

    /// Serialize raw stored fields that were never hydrated into a document.
    fn apply_serialize_metadata(&self, raw: Map<String, Value>, meta: &ClassMetadata) -> Result<Value, StoreError>;
}

/// Emits mapped fields with `serialize: true`; reads mapped fields and ignores the rest.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetadataSerializer;

impl MetadataSerializer {
    fn project(fields: &Map<String, Value>, meta: &ClassMetadata) -> Value {
        let out: Map<String, Value> = meta
            .fields
            .iter()
            .filter(|f| f.serialize)
            .filter_map(|f| fields.get(&f.name).map(|v| (f.name.clone(), v.clone())))
            .collect();
        Value::Object(out)
    }
}

impl Serializer for MetadataSerializer {
    fn to_value(&self, document: &Document, meta: &ClassMetadata) -> Result<Value, StoreError> {
        Ok(Self::project(document.fields(), meta))
    }

    fn from_value(&self, body: Value, meta: &ClassMetadata) -> Result<Document, StoreError> {
        let Value::Object(fields) = body else {
            return Err(StoreError::Serialization(serde_json::Error::custom(format!(
                "expected a JSON object for {}",
                meta.class
            ))));
        };
        let mut document = Document::new(meta.class.clone());
        for (name, value) in fields {
            if !meta.has_field(&name) {
                tracing::debug!(class = %meta.class, field = %name, "ignoring unmapped field");
                continue;
            }
            document.set_field(meta, &name, value)?;
        }
        Ok(document)
    }

    fn apply_serialize_metadata(&self, raw: Map<String, Value>, meta: &ClassMetadata) -> Result<Value, StoreError> {
        Ok(Self::project(&raw, meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldType;
    use crate::odm::FieldMapping;
    use serde_json::json;

    fn meta() -> ClassMetadata {
        ClassMetadata::new("User")
            .with_field(FieldMapping::new("name", FieldType::String))
            .with_field(FieldMapping::new("password", FieldType::String).hidden())
    }

    #[test]
    fn hidden_and_unmapped_fields_are_not_emitted() {
        let raw = json!({"id": "u1", "name": "ann", "password": "x", "extra": 1});
        let out = MetadataSerializer
            .apply_serialize_metadata(raw.as_object().unwrap().clone(), &meta())
            .unwrap();
        assert_eq!(out, json!({"id": "u1", "name": "ann"}));
    }

    #[test]
    fn from_value_keeps_mapped_fields_only() {
        let doc = MetadataSerializer
            .from_value(json!({"name": "ann", "role": "admin"}), &meta())
            .unwrap();
        assert_eq!(doc.class(), "User");
        assert_eq!(doc.fields().len(), 1);
        assert_eq!(doc.get_field("name"), Some(&json!("ann")));
    }

    #[test]
    fn non_object_body_is_a_serialization_error() {
        let err = MetadataSerializer.from_value(json!([1, 2]), &meta()).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
