//! Query criteria, sort specs, and the value ordering shared by all backends.

use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        SortSpec {
            field: field.into(),
            direction,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Criterion {
    Equals(String, Value),
    /// Also matches documents where the field is absent.
    NotEquals(String, Value),
}

impl Criterion {
    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        match self {
            Criterion::Equals(field, v) => doc.get(field).map(|d| json_eq(d, v)).unwrap_or(false),
            Criterion::NotEquals(field, v) => !doc.get(field).map(|d| json_eq(d, v)).unwrap_or(false),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindQuery {
    pub criteria: Vec<Criterion>,
    pub sort: Vec<SortSpec>,
    pub skip: u64,
    pub limit: Option<u64>,
}

/// Equality with numbers compared by value, so `1` equals `1.0`.
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order matching PostgreSQL jsonb: null < string < number < boolean < array < object.
pub fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .len()
            .cmp(&y.len())
            .then_with(|| {
                x.iter()
                    .zip(y)
                    .map(|(l, r)| compare_json(l, r))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            }),
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Missing fields sort last ascending and first descending, like SQL NULLs.
pub fn compare_documents(a: &Map<String, Value>, b: &Map<String, Value>, sort: &[SortSpec]) -> Ordering {
    for spec in sort {
        let ord = match (a.get(&spec.field), b.get(&spec.field)) {
            (Some(x), Some(y)) => compare_json(x, y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ord = match spec.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord.is_ne() {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn not_equals_matches_missing_fields() {
        let c = Criterion::NotEquals("deleted".into(), json!(true));
        assert!(c.matches(&doc(json!({"id": "a"}))));
        assert!(c.matches(&doc(json!({"deleted": false}))));
        assert!(!c.matches(&doc(json!({"deleted": true}))));
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(Criterion::Equals("n".into(), json!(1)).matches(&doc(json!({"n": 1.0}))));
    }

    #[test]
    fn multi_key_sort() {
        let mut docs = vec![
            doc(json!({"name": "b", "age": 1})),
            doc(json!({"name": "a", "age": 1})),
            doc(json!({"name": "c", "age": 2})),
            doc(json!({"age": 3})),
        ];
        let sort = [
            SortSpec::new("age", SortDirection::Desc),
            SortSpec::new("name", SortDirection::Asc),
        ];
        docs.sort_by(|a, b| compare_documents(a, b, &sort));
        let names: Vec<_> = docs.iter().map(|d| d.get("name").cloned()).collect();
        assert_eq!(names, vec![None, Some(json!("c")), Some(json!("a")), Some(json!("b"))]);
    }

    #[test]
    fn jsonb_type_order() {
        assert!(compare_json(&json!(null), &json!("a")).is_lt());
        assert!(compare_json(&json!("z"), &json!(1)).is_lt());
        assert!(compare_json(&json!(1000), &json!(false)).is_lt());
    }
}
