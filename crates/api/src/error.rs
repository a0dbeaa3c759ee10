use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dealerdesk_core::archive::ArchiveError;
use dealerdesk_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`ArchiveError`] for domain errors and adds
/// internal and timeout variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `dealerdesk_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An archive run that stopped before completing.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// An internal failure, such as a panicked archive task. The message is
    /// logged and never returned.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// The response stopped waiting. An archive run started by the request
    /// is not affected.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Archive errors ---
            AppError::Archive(err) => classify_archive_error(err),

            // --- Internal errors ---
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }

            AppError::Timeout(limit) => (
                StatusCode::REQUEST_TIMEOUT,
                "REQUEST_TIMEOUT",
                format!(
                    "No response within {}s; an archive already started keeps running",
                    limit.as_secs()
                ),
            ),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify an archive error into an HTTP status, error code, and message.
///
/// - `NotFound` maps to 404.
/// - `InvalidDescriptor` maps to 400.
/// - `ArchiveWriteFailed` maps to 502: nothing was deleted, the run can be repeated.
/// - `PurgeFailed` maps to 500: archived copies exist and the live data is
///   partially purged.
///
/// Store messages are logged, never returned.
fn classify_archive_error(err: &ArchiveError) -> (StatusCode, &'static str, String) {
    match err {
        ArchiveError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        ArchiveError::InvalidDescriptor(msg) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        ArchiveError::ArchiveWriteFailed {
            step,
            collection,
            source,
        } => {
            tracing::error!(%step, %collection, error = %source, "Archive write failed");
            (
                StatusCode::BAD_GATEWAY,
                "ARCHIVE_WRITE_FAILED",
                format!("Archive failed at {step} on {collection}; nothing was deleted"),
            )
        }
        ArchiveError::PurgeFailed {
            step,
            collection,
            source,
        } => {
            tracing::error!(%step, %collection, error = %source, "Archive purge failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PURGE_FAILED",
                format!(
                    "Purge failed at {step} on {collection}; archived copies exist and \
                     the record needs manual reconciliation"
                ),
            )
        }
    }
}
