//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::import::ImportError;
use crate::pipeline::processor::ProcessingError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "DUPLICATE", detail),
            ApiError::PayloadTooLarge(detail) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "TOO_LARGE", detail)
            }
            ApiError::Unavailable(detail) => {
                tracing::warn!(detail, "Dependent service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "UNAVAILABLE",
                    "Search service is not available".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Import(ImportError::AlreadyExists(name)) => {
                ApiError::Conflict(format!("File already exists: {name}"))
            }
            ProcessingError::Import(e @ ImportError::FileTooLarge { .. }) => {
                ApiError::PayloadTooLarge(e.to_string())
            }
            ProcessingError::Import(ImportError::Io(e)) => ApiError::Internal(e.to_string()),
            ProcessingError::Import(e) => ApiError::BadRequest(e.to_string()),
            e @ ProcessingError::DuplicateContent { .. } => ApiError::Conflict(e.to_string()),
            ProcessingError::NotFound(_) => ApiError::NotFound("File not found".into()),
            ProcessingError::Search(e) => ApiError::Unavailable(e.to_string()),
            e @ (ProcessingError::Database(_) | ProcessingError::LockPoisoned) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<crate::db::DatabaseError> for ApiError {
    fn from(err: crate::db::DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<crate::pipeline::search::SearchError> for ApiError {
    fn from(err: crate::pipeline::search::SearchError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {err}"))
    }
}
