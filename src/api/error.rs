//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::DatabaseError;
use crate::documents::DocumentError;
use crate::monitor::MonitorError;
use crate::pipeline::PipelineError;

pub const OCR_PROCESSING_ERROR: &str = "OCR_PROCESSING_ERROR";
pub const OCR_PROCESSING_FAILED: &str = "OCR_PROCESSING_FAILED";
pub const MONITORING_FAILED: &str = "MONITORING_FAILED";
pub const BAD_REQUEST: &str = "BAD_REQUEST";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const FORBIDDEN: &str = "FORBIDDEN";
pub const INTERNAL: &str = "INTERNAL";

/// `{ "error": { "code", "message" } }`
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
    #[error("Invalid request: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// Operation failed upstream; the message is safe to show.
    #[error("{code}: {message}")]
    Failed { code: &'static str, message: String },
    /// Details are logged, never returned.
    #[error("Internal error: {detail}")]
    Internal { code: &'static str, detail: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code: BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::Internal {
            code: INTERNAL,
            detail: detail.into(),
        }
    }

    /// Map a pipeline error, tagging failures with `code`.
    pub fn from_pipeline(code: &'static str, err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(message) => ApiError::BadRequest { code, message },
            PipelineError::NotFound(id) => ApiError::NotFound(format!("OCR job {id}")),
            e @ (PipelineError::InvalidTransition { .. }
            | PipelineError::NotCompleted { .. }
            | PipelineError::NotPromotable(_)) => ApiError::BadRequest {
                code,
                message: e.to_string(),
            },
            PipelineError::Ocr(e) => ApiError::Failed {
                code,
                message: e.to_string(),
            },
            e @ (PipelineError::Database(_) | PipelineError::Storage(_)) => ApiError::Internal {
                code,
                detail: e.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, NOT_FOUND, detail),
            ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, FORBIDDEN, detail),
            ApiError::Failed { code, message } => {
                tracing::warn!(code, message, "API request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, code, message)
            }
            ApiError::Internal { code, detail } => {
                tracing::error!(code, detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    code,
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

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::from_pipeline(OCR_PROCESSING_ERROR, err)
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        ApiError::Failed {
            code: MONITORING_FAILED,
            message: err.to_string(),
        }
    }
}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Validation(message) => ApiError::bad_request(message),
            DocumentError::NotFound(id) => ApiError::NotFound(format!("Medical document {id}")),
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{entity_type} {id}"))
            }
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::internal(format!("Blocking task failed: {err}"))
    }
}
