//! List request parsing: `Range` header, equality criteria and the `sort(...)` key.

use crate::error::AppError;
use crate::odm::{SortDirection, SortSpec};
use serde_json::Value;
use std::str::FromStr;

/// `Range: <unit>=<start>-<end>`, both bounds inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemRange {
    pub start: u64,
    pub end: u64,
}

impl FromStr for ItemRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || AppError::BadRequest(format!("malformed Range header '{}'", s));
        let (_unit, window) = s.split_once('=').ok_or_else(bad)?;
        let (start, end) = window.split_once('-').ok_or_else(bad)?;
        let start: u64 = start.trim().parse().map_err(|_| bad())?;
        let end: u64 = end.trim().parse().map_err(|_| bad())?;
        if end < start {
            return Err(bad());
        }
        Ok(ItemRange { start, end })
    }
}

impl ItemRange {
    /// Offset and page size; a window wider than `default_limit` is cut to it.
    pub fn window(&self, default_limit: u64) -> (u64, u64) {
        let requested = (self.end - self.start).saturating_add(1);
        (self.start, requested.min(default_limit))
    }
}

/// Query-string pairs in order. A key without `=` has no value.
pub fn parse_query_pairs(raw: &str) -> Vec<(String, Option<String>)> {
    raw.split('&')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((k, v)) => (decode(k), Some(decode(v))),
            None => (decode(part), None),
        })
        .collect()
}

fn decode(s: &str) -> String {
    url_escape::decode(s).into_owned()
}

/// Sort specs from the first valueless key starting with `sort`.
pub fn parse_sort(pairs: &[(String, Option<String>)]) -> Vec<SortSpec> {
    let Some((key, _)) = pairs.iter().find(|(k, v)| k.starts_with("sort") && v.is_none()) else {
        return Vec::new();
    };
    key.replace("sort(", "")
        .replace(')', "")
        .split(',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            let mut chars = token.chars();
            let direction = match chars.next() {
                Some('+') => SortDirection::Asc,
                _ => SortDirection::Desc,
            };
            SortSpec::new(chars.as_str(), direction)
        })
        .collect()
}

/// Every key that carries a value, in order.
pub fn parse_criteria(pairs: &[(String, Option<String>)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListRequest {
    pub offset: u64,
    pub limit: u64,
    pub criteria: Vec<(String, String)>,
    pub sort: Vec<SortSpec>,
}

impl ListRequest {
    pub fn new(range: Option<&str>, raw_query: Option<&str>, default_limit: u64) -> Result<Self, AppError> {
        let (offset, limit) = match range {
            Some(r) => r.parse::<ItemRange>()?.window(default_limit),
            None => (0, default_limit),
        };
        let pairs = raw_query.map(parse_query_pairs).unwrap_or_default();
        Ok(ListRequest {
            offset,
            limit,
            criteria: parse_criteria(&pairs),
            sort: parse_sort(&pairs),
        })
    }
}

/// One page of serialized documents and the total the filter matched.
#[derive(Clone, Debug, PartialEq)]
pub struct ListPage {
    pub items: Vec<Value>,
    pub offset: u64,
    pub total: u64,
}

impl ListPage {
    pub fn content_range(&self) -> String {
        format!("{}-{}/{}", self.offset, self.offset + self.items.len() as u64, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn range_window_caps_at_default() {
        assert_eq!("items=0-9".parse::<ItemRange>().unwrap().window(30), (0, 10));
        assert_eq!("items=10-99".parse::<ItemRange>().unwrap().window(30), (10, 30));
        assert_eq!("items=5-5".parse::<ItemRange>().unwrap().window(30), (5, 1));
    }

    #[test]
    fn full_width_range_falls_back_to_default_limit() {
        let req = ListRequest::new(Some("items=0-18446744073709551615"), None, 30).unwrap();
        assert_eq!((req.offset, req.limit), (0, 30));
    }

    #[test]
    fn malformed_ranges_are_bad_requests() {
        for raw in ["items", "items=3", "items=a-b", "items=9-2"] {
            assert!(matches!(raw.parse::<ItemRange>(), Err(AppError::BadRequest(_))), "{}", raw);
        }
    }

    #[test]
    fn sort_key_is_parsed_in_order() {
        let pairs = parse_query_pairs("status=open&sort(+title,-created,~rank)&sort(+ignored)");
        assert_eq!(
            parse_sort(&pairs),
            vec![
                SortSpec::new("title", SortDirection::Asc),
                SortSpec::new("created", SortDirection::Desc),
                SortSpec::new("rank", SortDirection::Desc),
            ]
        );
        assert_eq!(parse_criteria(&pairs), vec![("status".to_string(), "open".to_string())]);
    }

    #[test]
    fn sort_key_with_value_is_a_criterion() {
        let pairs = parse_query_pairs("sort=title&flag=");
        assert!(parse_sort(&pairs).is_empty());
        assert_eq!(
            parse_criteria(&pairs),
            vec![("sort".to_string(), "title".to_string()), ("flag".to_string(), String::new())]
        );
    }

    #[test]
    fn encoded_keys_are_decoded() {
        let pairs = parse_query_pairs("sort(%2Bname)&city=New%20York");
        assert_eq!(parse_sort(&pairs), vec![SortSpec::new("name", SortDirection::Asc)]);
        assert_eq!(parse_criteria(&pairs), vec![("city".to_string(), "New York".to_string())]);
    }

    #[test]
    fn literal_plus_is_kept_in_keys() {
        let pairs = parse_query_pairs("sort(+name,%2Bage)&tag=a%2Bb");
        assert_eq!(
            parse_sort(&pairs),
            vec![SortSpec::new("name", SortDirection::Asc), SortSpec::new("age", SortDirection::Asc)]
        );
        assert_eq!(parse_criteria(&pairs), vec![("tag".to_string(), "a+b".to_string())]);
    }

    #[test]
    fn list_request_defaults() {
        let req = ListRequest::new(None, None, 30).unwrap();
        assert_eq!((req.offset, req.limit), (0, 30));
        assert!(req.criteria.is_empty() && req.sort.is_empty());
    }

    #[test]
    fn content_range_counts_returned_items() {
        let page = ListPage {
            items: vec![json!({}), json!({})],
            offset: 10,
            total: 42,
        };
        assert_eq!(page.content_range(), "10-12/42");
    }
}
