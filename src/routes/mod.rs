mod common;
mod resource;

pub use common::common_routes_with_ready;
pub use resource::resource_routes;

use crate::state::AppState;
use axum::Router;

/// Resource routes merged with health, readiness and version.
pub fn app_router(state: AppState, body_limit: usize) -> Router {
    resource_routes(state.clone(), body_limit).merge(common_routes_with_ready(state))
}
