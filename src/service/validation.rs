//! Document validation from mapped field types and rules.

use crate::config::ValidationRule;
use crate::odm::{ClassMetadata, Document, FieldAccess};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub messages: Vec<String>,
}

impl ValidationResult {
    pub fn from_messages(messages: Vec<String>) -> Self {
        ValidationResult {
            valid: messages.is_empty(),
            messages,
        }
    }
}

pub trait DocumentValidator: Send + Sync {
    fn validate(&self, document: &Document, meta: &ClassMetadata) -> ValidationResult;
}

/// Checks every mapped field and reports every violation, in field order.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetadataValidator;

impl DocumentValidator for MetadataValidator {
    fn validate(&self, document: &Document, meta: &ClassMetadata) -> ValidationResult {
        let mut messages = Vec::new();
        for field in &meta.fields {
            let value = document.get_field(&field.name).filter(|v| !v.is_null());
            let Some(v) = value else {
                if field.validation.required == Some(true) {
                    messages.push(format!("{} is required", field.name));
                }
                continue;
            };
            if !field.field_type.accepts(v) {
                messages.push(format!("{} must be of type {}", field.name, field.field_type.as_str()));
                continue;
            }
            check_rule(&field.name, v, &field.validation, &mut messages);
        }
        ValidationResult::from_messages(messages)
    }
}

fn check_rule(col: &str, v: &Value, rule: &ValidationRule, messages: &mut Vec<String>) {
    if let Some(format) = &rule.format {
        if let Some(msg) = check_format(col, v, format) {
            messages.push(msg);
        }
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                messages.push(format!("{} must be at most {} characters", col, max));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                messages.push(format!("{} must be at least {} characters", col, min));
            }
        }
        if let Some(pattern) = &rule.pattern {
            match Regex::new(pattern) {
                Ok(re) if !re.is_match(s) => messages.push(format!("{} does not match required pattern", col)),
                Ok(_) => {}
                Err(_) => messages.push(format!("invalid pattern for {}", col)),
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            let shown = Value::Array(allowed.iter().take(5).cloned().collect());
            messages.push(format!("{} must be one of: {}", col, shown));
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                messages.push(format!("{} must be at least {}", col, min));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                messages.push(format!("{} must be at most {}", col, max));
            }
        }
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn check_format(col: &str, v: &Value, format: &str) -> Option<String> {
    let s = v.as_str()?;
    match format.to_lowercase().as_str() {
        "email" if !s.contains('@') || s.len() < 3 => Some(format!("{} must be a valid email", col)),
        "uuid" if uuid::Uuid::parse_str(s).is_err() => Some(format!("{} must be a valid UUID", col)),
        _ => None,
    }
}
