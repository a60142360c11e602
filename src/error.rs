//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{name}'")]
    MissingReference { kind: &'static str, name: String },
    #[error("missing service: {0}")]
    MissingService(String),
    #[error("unknown extension: {0}")]
    UnknownExtension(String),
    #[error("extension {extension} requires {requirement}")]
    ExtensionRequirement { extension: String, requirement: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("no metadata for class {0}")]
    UnknownClass(String),
    #[error("class {class} has no mapped field '{field}'")]
    UnknownField { class: String, field: String },
    #[error("identifier of {class} cannot be changed")]
    ImmutableIdentifier { class: String },
    #[error("invalid identifier '{id}' for {class}")]
    InvalidIdentifier { class: String, id: String },
    #[error("document of {class} with id {id} already exists")]
    Duplicate { class: String, id: String },
    #[error("document of {class} has no identifier")]
    MissingIdentifier { class: String },
    #[error("document is no longer tracked by the unit of work")]
    NotTracked,
    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Store(e) => match e {
                StoreError::UnknownField { .. }
                | StoreError::ImmutableIdentifier { .. }
                | StoreError::InvalidIdentifier { .. }
                | StoreError::Serialization(_) => (StatusCode::BAD_REQUEST, "bad_request"),
                StoreError::Duplicate { .. } => (StatusCode::CONFLICT, "conflict"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
