// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Engine error taxonomy.
///
/// Only `SourceUnavailable` aborts a batch. The record-level variants are
/// counted and logged by the engine while the batch carries on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuditError {
    #[error("record source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("malformed record {barcode}: {reason}")]
    MalformedRecord { barcode: String, reason: String },

    #[error("no answer key for course '{course}' booklet set '{set_code}'")]
    KeyNotFound { course: String, set_code: String },

    #[error("no section configuration for course '{course}': {reason}")]
    ConfigNotFound { course: String, reason: String },

    #[error("validation skipped for field '{field}': {reason}")]
    ValidationSkipped { field: String, reason: String },
}

impl AuditError {
    pub fn malformed(barcode: impl Into<String>, reason: impl Into<String>) -> Self {
        AuditError::MalformedRecord {
            barcode: barcode.into(),
            reason: reason.into(),
        }
    }

    /// True for the only variant that must fail the whole batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AuditError::SourceUnavailable(_))
    }
}

/// Decode failures point at bad stored data; everything else means the
/// store could not be reached or queried.
impl From<sqlx::Error> for AuditError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { index, source } => {
                AuditError::malformed("-", format!("column {index}: {source}"))
            }
            sqlx::Error::Decode(source) => AuditError::malformed("-", source.to_string()),
            other => AuditError::SourceUnavailable(other.to_string()),
        }
    }
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 400 Bad Request
    BadRequest(String),

    // 422 Unprocessable Entity (stored configuration cannot be used)
    Unprocessable(String),

    // 503 Service Unavailable (record source down)
    ServiceUnavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Record source unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// A fatal engine error means the store is down; anything else reaching a
/// handler is a configuration problem the caller has to fix.
impl From<AuditError> for AppError {
    fn from(err: AuditError) -> Self {
        if err.is_fatal() {
            AppError::ServiceUnavailable(err.to_string())
        } else {
            AppError::Unprocessable(err.to_string())
        }
    }
}
