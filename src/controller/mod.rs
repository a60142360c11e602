//! REST controller, its per-resource options and list request parsing.

mod options;
mod request;
mod rest;

pub use options::ResourceOptions;
pub use request::{parse_criteria, parse_query_pairs, parse_sort, ItemRange, ListPage, ListRequest};
pub use rest::RestController;
