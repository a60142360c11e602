//! Class metadata: the flattened, runtime form of a class mapping.

use crate::config::{ClassMappingConfig, FieldType, IdStrategy, ValidationRule};
use crate::error::StoreError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct FieldMapping {
    pub name: String,
    pub field_type: FieldType,
    pub serialize: bool,
    pub annotations: Vec<String>,
    pub validation: ValidationRule,
}

impl FieldMapping {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldMapping {
            name: name.into(),
            field_type,
            serialize: true,
            annotations: Vec::new(),
            validation: ValidationRule::default(),
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    pub fn with_validation(mut self, rule: ValidationRule) -> Self {
        self.validation = rule;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.serialize = false;
        self
    }

    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.iter().any(|a| a == annotation)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassMetadata {
    pub class: String,
    pub collection: String,
    pub identifier: String,
    pub id_strategy: IdStrategy,
    pub fields: Vec<FieldMapping>,
}

impl ClassMetadata {
    /// New metadata with a string identifier field `id`.
    pub fn new(class: impl Into<String>) -> Self {
        let class = class.into();
        ClassMetadata {
            collection: default_collection(&class),
            class,
            identifier: "id".into(),
            id_strategy: IdStrategy::Auto,
            fields: vec![FieldMapping::new("id", FieldType::String)],
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_identifier(mut self, field: FieldMapping, strategy: IdStrategy) -> Self {
        self.fields.retain(|f| f.name != self.identifier);
        self.identifier = field.name.clone();
        self.id_strategy = strategy;
        self.fields.insert(0, field);
        self
    }

    pub fn with_field(mut self, field: FieldMapping) -> Self {
        self.fields.retain(|f| f.name != field.name);
        self.fields.push(field);
        self
    }

    /// Builds metadata from a mapping file entry. Annotations are kept as given; the reader filters them.
    pub fn from_mapping(mapping: ClassMappingConfig) -> Self {
        let collection = mapping
            .collection
            .clone()
            .unwrap_or_else(|| default_collection(&mapping.class));
        let mut fields: Vec<FieldMapping> = mapping
            .fields
            .into_iter()
            .map(|f| FieldMapping {
                name: f.name,
                field_type: f.field_type,
                serialize: f.serialize,
                annotations: f.annotations,
                validation: f.validation,
            })
            .collect();
        if !fields.iter().any(|f| f.name == mapping.identifier) {
            fields.insert(0, FieldMapping::new(mapping.identifier.clone(), FieldType::String));
        }
        ClassMetadata {
            class: mapping.class,
            collection,
            identifier: mapping.identifier,
            id_strategy: mapping.id_strategy,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn fields_with_annotation<'a>(&'a self, annotation: &'a str) -> impl Iterator<Item = &'a FieldMapping> + 'a {
        self.fields.iter().filter(move |f| f.has_annotation(annotation))
    }

    pub fn identifier_type(&self) -> FieldType {
        self.field(&self.identifier)
            .map(|f| f.field_type)
            .unwrap_or(FieldType::String)
    }

    /// Parse an identifier taken from a request path into the identifier field's type.
    pub fn parse_identifier(&self, id: &str) -> Result<Value, StoreError> {
        let invalid = || StoreError::InvalidIdentifier {
            class: self.class.clone(),
            id: id.to_string(),
        };
        Ok(match self.identifier_type() {
            FieldType::Int => Value::Number(id.parse::<i64>().map_err(|_| invalid())?.into()),
            FieldType::Float => {
                let f: f64 = id.parse().map_err(|_| invalid())?;
                Value::Number(serde_json::Number::from_f64(f).ok_or_else(invalid)?)
            }
            _ => Value::String(id.to_string()),
        })
    }

    /// Query-string values arrive as text; coerce them for fields whose mapped type is scalar.
    pub fn coerce_query_value(&self, field: &str, raw: &str) -> Value {
        match self.field(field) {
            Some(f) => f.field_type.coerce_str(raw),
            None => Value::String(raw.to_string()),
        }
    }
}

fn default_collection(class: &str) -> String {
    class
        .rsplit(['\\', '.', ':'])
        .next()
        .unwrap_or(class)
        .to_lowercase()
}

impl FieldType {
    pub fn coerce_str(&self, s: &str) -> Value {
        match self {
            FieldType::Int => s
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .unwrap_or_else(|_| Value::String(s.to_string())),
            FieldType::Float => s
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(s.to_string())),
            FieldType::Boolean => {
                if s.eq_ignore_ascii_case("true") {
                    Value::Bool(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Value::Bool(false)
                } else {
                    Value::String(s.to_string())
                }
            }
            _ => Value::String(s.to_string()),
        }
    }

    /// Whether a non-null value fits this type.
    pub fn accepts(&self, v: &Value) -> bool {
        match self {
            FieldType::String => v.is_string(),
            FieldType::Int => v.is_i64() || v.is_u64(),
            FieldType::Float => v.is_number(),
            FieldType::Boolean => v.is_boolean(),
            FieldType::Date => v
                .as_str()
                .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
            FieldType::Hash => v.is_object(),
            FieldType::Collection => v.is_array(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Hash => "hash",
            FieldType::Collection => "collection",
        }
    }
}

/// All classes known to one document manager, keyed by class name.
#[derive(Clone, Debug, Default)]
pub struct MetadataRegistry {
    by_class: HashMap<String, Arc<ClassMetadata>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        MetadataRegistry::default()
    }

    pub fn register(&mut self, metadata: ClassMetadata) {
        self.by_class.insert(metadata.class.clone(), Arc::new(metadata));
    }

    pub fn get(&self, class: &str) -> Result<Arc<ClassMetadata>, StoreError> {
        self.by_class
            .get(class)
            .cloned()
            .ok_or_else(|| StoreError::UnknownClass(class.to_string()))
    }

    pub fn classes(&self) -> impl Iterator<Item = &Arc<ClassMetadata>> {
        self.by_class.values()
    }

    pub fn len(&self) -> usize {
        self.by_class.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldMappingConfig;

    #[test]
    fn collection_defaults_to_lowercased_short_class_name() {
        assert_eq!(ClassMetadata::new("App\\Document\\Article").collection, "article");
        assert_eq!(ClassMetadata::new("blog.Post").collection, "post");
    }

    #[test]
    fn mapping_without_identifier_field_gets_one() {
        let meta = ClassMetadata::from_mapping(ClassMappingConfig {
            class: "Author".into(),
            collection: Some("authors".into()),
            identifier: "slug".into(),
            id_strategy: IdStrategy::None,
            fields: vec![FieldMappingConfig {
                name: "name".into(),
                field_type: FieldType::String,
                serialize: true,
                annotations: vec![],
                validation: ValidationRule::default(),
            }],
        });
        assert_eq!(meta.fields[0].name, "slug");
        assert_eq!(meta.collection, "authors");
        assert!(meta.has_field("name"));
    }

    #[test]
    fn identifiers_parse_by_type() {
        let meta = ClassMetadata::new("Counter")
            .with_identifier(FieldMapping::new("n", FieldType::Int), IdStrategy::None);
        assert_eq!(meta.parse_identifier("42").unwrap(), Value::from(42));
        assert!(matches!(
            meta.parse_identifier("forty-two"),
            Err(StoreError::InvalidIdentifier { .. })
        ));
        assert_eq!(
            ClassMetadata::new("User").parse_identifier("abc").unwrap(),
            Value::from("abc")
        );
    }

    #[test]
    fn query_values_follow_field_type() {
        let meta = ClassMetadata::new("User")
            .with_field(FieldMapping::new("age", FieldType::Int))
            .with_field(FieldMapping::new("active", FieldType::Boolean));
        assert_eq!(meta.coerce_query_value("age", "31"), Value::from(31));
        assert_eq!(meta.coerce_query_value("age", "old"), Value::from("old"));
        assert_eq!(meta.coerce_query_value("active", "TRUE"), Value::Bool(true));
        assert_eq!(meta.coerce_query_value("nickname", "7"), Value::from("7"));
    }

    #[test]
    fn date_type_requires_rfc3339() {
        assert!(FieldType::Date.accepts(&Value::from("2024-05-01T10:00:00Z")));
        assert!(!FieldType::Date.accepts(&Value::from("yesterday")));
    }
}
