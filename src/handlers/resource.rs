//! Resource CRUD handlers; each resolves the controller by path segment and delegates.

use crate::controller::{ListRequest, RestController};
use crate::error::AppError;
use crate::response::{document_created, document_ok, page_response};
use crate::state::AppState;
use axum::{
    extract::{Path, RawQuery, State},
    http::{header::RANGE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

fn controller<'a>(state: &'a AppState, resource: &str) -> Result<&'a RestController, AppError> {
    state
        .controller(resource)
        .ok_or_else(|| AppError::NotFound(format!("unknown resource '{}'", resource)))
}

pub async fn list(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let controller = controller(&state, &resource)?;
    let range = headers
        .get(RANGE)
        .map(|v| v.to_str().map_err(|_| AppError::BadRequest("Range header is not valid text".into())))
        .transpose()?;
    let request = ListRequest::new(range, query.as_deref(), controller.options().limit())?;
    let page = controller.get_list(&request).await?;
    Ok(page_response(page))
}

pub async fn read(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let document = controller(&state, &resource)?.get(&id).await?;
    Ok(document_ok(document))
}

pub async fn create(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let document = controller(&state, &resource)?.create(body).await?;
    Ok(document_created(document))
}

pub async fn update(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let document = controller(&state, &resource)?.update(&id, body).await?;
    Ok(document_ok(document))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    controller(&state, &resource)?.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
