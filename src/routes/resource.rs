//! Resource CRUD routes. The path segment selects the configured controller.

use crate::handlers::resource::{create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

pub fn resource_routes(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/:resource", get(list).post(create))
        .route(
            "/:resource/:id",
            get(read).put(update).patch(update).delete(delete_handler),
        )
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(body_limit)))
        .with_state(state)
}
