//! Error types for the PDF Toolkit server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::workspace::WorkspaceError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {name} (max {max_mb}MB)")]
    FileTooLarge { name: String, max_mb: u64 },

    #[error("Invalid multipart request: {0}")]
    Multipart(#[from] MultipartError),

    /// A conversion or PDF operation failed; the message is shown to the client
    #[error("{0}")]
    Processing(String),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    detail: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_)
            | AppError::UnsupportedFormat(_)
            | AppError::FileTooLarge { .. }
            | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::Processing(_)
            | AppError::Workspace(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (error_type, detail) = match &self {
            AppError::BadRequest(msg) => ("bad_request", msg.clone()),
            AppError::UnsupportedFormat(_) => ("unsupported_format", self.to_string()),
            AppError::FileTooLarge { .. } => ("file_too_large", self.to_string()),
            AppError::Multipart(_) => ("invalid_multipart", self.to_string()),
            AppError::Processing(msg) => {
                tracing::error!("Processing failed: {}", msg);
                ("processing_error", msg.clone())
            }
            AppError::Workspace(e) => {
                tracing::error!("Workspace error: {}", e);
                ("internal_error", "An internal error occurred".to_string())
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                ("internal_error", "An internal error occurred".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("internal_error", "An internal error occurred".to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: error_type,
            detail,
        });

        (self.status_code(), body).into_response()
    }
}
