//! Query filters: criteria added to every read while enabled.

use crate::config::{FilterClass, FilterConfig};
use crate::odm::events::SOFT_DELETE_FLAG;
use crate::odm::metadata::ClassMetadata;
use crate::odm::query::Criterion;
use serde_json::Value;
use std::sync::Arc;

pub trait QueryFilter: Send + Sync {
    fn name(&self) -> &str;

    fn criteria(&self, meta: &ClassMetadata) -> Vec<Criterion>;
}

/// Hides documents whose soft-delete flag is set.
pub struct SoftDeleteFilter {
    name: String,
}

impl SoftDeleteFilter {
    pub fn new(name: impl Into<String>) -> Self {
        SoftDeleteFilter { name: name.into() }
    }
}

impl QueryFilter for SoftDeleteFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn criteria(&self, meta: &ClassMetadata) -> Vec<Criterion> {
        meta.fields_with_annotation(SOFT_DELETE_FLAG)
            .map(|f| Criterion::NotEquals(f.name.clone(), Value::Bool(true)))
            .collect()
    }
}

/// Instantiate the enabled filters of a configuration, in order.
pub fn filters_from_config(configs: &[FilterConfig]) -> Vec<Arc<dyn QueryFilter>> {
    configs
        .iter()
        .filter(|c| c.enabled)
        .map(|c| -> Arc<dyn QueryFilter> {
            match c.class {
                FilterClass::SoftDelete => Arc::new(SoftDeleteFilter::new(c.name.clone())),
            }
        })
        .collect()
}
