use std::io;
use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::policy::WindowError;

/// Application-wide error types with appropriate HTTP status codes.
///
/// # Upstream Faults
///
/// `Upstream` is only built by the dispatcher's error-handling layer, after
/// the audit chain has recorded the fault and handed the original error back
/// unchanged.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid allowed window: {0}")]
    InvalidWindow(#[from] WindowError),

    #[error("Upstream fault: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Failures of an [`AuditSink`](crate::audit::AuditSink).
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("failed to open audit log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write audit log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("audit log lock poisoned by a panicking writer")]
    Poisoned,

    #[error("failed to serialize audit record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Error response body for API endpoints.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Full details stay server-side
        tracing::error!(error = %self, "Request failed");

        let (status, error_type, message) = match &self {
            AppError::Upstream(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "upstream_fault",
                "The request could not be completed.",
            ),
            AppError::ConfigError(_) | AppError::InvalidWindow(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                "Service configuration error. Please contact support.",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred. Please contact support if the issue persists.",
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: message.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for audit sink results.
pub type AuditResult<T> = Result<T, AuditError>;
