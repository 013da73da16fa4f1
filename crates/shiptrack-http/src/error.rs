//! Mapping of core errors to HTTP responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use shiptrack_core::{Error, FailureKind};

/// Error returned by service and read endpoints
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match (&err, err.failure_kind()) {
            (Error::InvalidInput(_), _) => StatusCode::BAD_REQUEST,
            (_, FailureKind::Auth) => StatusCode::UNAUTHORIZED,
            (_, FailureKind::NotFound) => StatusCode::NOT_FOUND,
            (_, FailureKind::Transient) => StatusCode::SERVICE_UNAVAILABLE,
            (_, FailureKind::Malformed) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
