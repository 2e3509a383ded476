//! Error handlers
//!
//! Status mapping, logging and response rendering for errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use serde_json::json;

use crate::error::types::{ApiError, StorageError};

/// Log a storage error at the level its cause deserves
pub fn handle_error(context: &str, err: &StorageError) {
    match err {
        StorageError::SandboxViolation(_) => warn!("{}: rejected path: {}", context, err),
        StorageError::Io(_) => error!("{}: {}", context, err),
        _ => warn!("{}: {}", context, err),
    }
}

/// Convert a storage error to its default HTTP status code
pub fn error_to_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::SandboxViolation(_) => StatusCode::BAD_REQUEST,
        StorageError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        StorageError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}
