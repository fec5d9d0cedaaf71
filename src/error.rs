//! Error types for the Parapheur server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::signing::SignError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Required identifier or payload absent; rejected before pipeline work
    #[error("Missing input: {0}")]
    InputMissing(String),

    /// Storage has no document for the given identifier
    #[error("Document not found: {0}")]
    SourceNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Storage write failed after a successful commit; the signed bytes
    /// were correct but are not durably saved
    #[error("Failed to persist signed document: {0}")]
    PersistenceFailure(String),

    #[error("Signing error: {0}")]
    Signing(#[from] SignError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::InputMissing(msg) => {
                (StatusCode::BAD_REQUEST, "missing_input", msg.clone())
            }
            AppError::SourceNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Document not found: {id}"),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::PersistenceFailure(msg) => {
                tracing::error!("Persistence failure after commit: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "persistence_failure",
                    "Failed to save the signed document".to_string(),
                )
            }
            AppError::Signing(SignError::UnsupportedImage) => (
                StatusCode::BAD_REQUEST,
                "unsupported_image",
                "Signature image decodes as neither PNG nor JPEG".to_string(),
            ),
            AppError::Signing(e) => {
                tracing::error!("Signing error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "signing_error",
                    "Failed to sign the document".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database error".to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "IO error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
