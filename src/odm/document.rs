//! Documents and metadata-checked field access.

use crate::error::StoreError;
use crate::odm::metadata::ClassMetadata;
use serde_json::{Map, Value};

/// A record of one mapped class. Fields are kept as JSON values keyed by field name.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    class: String,
    fields: Map<String, Value>,
}

impl Document {
    pub fn new(class: impl Into<String>) -> Self {
        Document {
            class: class.into(),
            fields: Map::new(),
        }
    }

    pub fn from_fields(class: impl Into<String>, fields: Map<String, Value>) -> Self {
        Document {
            class: class.into(),
            fields,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    pub fn identifier<'a>(&'a self, meta: &ClassMetadata) -> Option<&'a Value> {
        self.fields.get(&meta.identifier).filter(|v| !v.is_null())
    }

    /// Writes a field without metadata checks. Used by flush and event subscribers.
    pub(crate) fn put(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }
}

/// Read and write fields by name on a record whose shape is only known through metadata.
pub trait FieldAccess {
    fn get_field(&self, field: &str) -> Option<&Value>;

    fn set_field(&mut self, meta: &ClassMetadata, field: &str, value: Value) -> Result<(), StoreError>;
}

impl FieldAccess for Document {
    fn get_field(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    fn set_field(&mut self, meta: &ClassMetadata, field: &str, value: Value) -> Result<(), StoreError> {
        if !meta.has_field(field) {
            return Err(StoreError::UnknownField {
                class: meta.class.clone(),
                field: field.to_string(),
            });
        }
        if field == meta.identifier {
            if let Some(current) = self.identifier(meta) {
                if *current != value {
                    return Err(StoreError::ImmutableIdentifier {
                        class: meta.class.clone(),
                    });
                }
                return Ok(());
            }
        }
        self.fields.insert(field.to_string(), value);
        Ok(())
    }
}

/// Stable text key for an identifier value (strings verbatim, everything else as JSON).
pub fn identity_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldType;
    use crate::odm::metadata::FieldMapping;
    use serde_json::json;

    fn meta() -> ClassMetadata {
        ClassMetadata::new("Article").with_field(FieldMapping::new("title", FieldType::String))
    }

    #[test]
    fn set_field_rejects_unmapped_names() {
        let mut doc = Document::new("Article");
        let err = doc.set_field(&meta(), "colour", json!("red")).unwrap_err();
        assert!(matches!(err, StoreError::UnknownField { ref field, .. } if field == "colour"));
    }

    #[test]
    fn identifier_is_fixed_once_assigned() {
        let m = meta();
        let mut doc = Document::new("Article");
        doc.set_field(&m, "id", json!("a1")).unwrap();
        doc.set_field(&m, "id", json!("a1")).unwrap();
        assert!(matches!(
            doc.set_field(&m, "id", json!("b2")),
            Err(StoreError::ImmutableIdentifier { .. })
        ));
        doc.set_field(&m, "title", json!("Hello")).unwrap();
        assert_eq!(doc.get_field("title"), Some(&json!("Hello")));
    }

    #[test]
    fn identity_keys() {
        assert_eq!(identity_key(&json!("abc")), "abc");
        assert_eq!(identity_key(&json!(12)), "12");
    }
}
