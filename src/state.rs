//! Shared application state for all routes. Immutable once the server starts.

use crate::controller::RestController;
use crate::registry::ServiceRegistry;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Controllers keyed by the resource path segment.
    pub resources: Arc<HashMap<String, RestController>>,
    pub registry: Arc<ServiceRegistry>,
}

impl AppState {
    pub fn new(resources: HashMap<String, RestController>, registry: Arc<ServiceRegistry>) -> Self {
        AppState {
            resources: Arc::new(resources),
            registry,
        }
    }

    pub fn controller(&self, resource: &str) -> Option<&RestController> {
        self.resources.get(resource)
    }
}
