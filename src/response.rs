//! Response helpers: documents are returned as bare JSON, list pages carry `Content-Range`.

use crate::controller::ListPage;
use axum::{
    http::{header::CONTENT_RANGE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

pub fn document_ok(document: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(document))
}

pub fn document_created(document: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(document))
}

pub fn page_response(page: ListPage) -> Response {
    let range = page.content_range();
    let mut response = (StatusCode::OK, Json(Value::Array(page.items))).into_response();
    if let Ok(value) = HeaderValue::from_str(&range) {
        response.headers_mut().insert(CONTENT_RANGE, value);
    }
    response
}
