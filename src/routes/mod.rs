//! Route modules for the PDF Toolkit server

pub mod convert;
pub mod download;
pub mod health;
pub mod merge;
pub mod split;
pub mod upload;

use axum::Router;

use crate::document::DocumentError;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// All API routes, to be nested under `/api`
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(convert::router())
        .merge(merge::router())
        .merge(split::router())
}

/// Run CPU-bound document work off the async runtime
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("Worker task failed: {}", e)))?
}

/// Map a document failure to an HTTP error
///
/// Bad client input (page out of range, invalid range) keeps its own message
/// as a 400; everything else is a 500 prefixed with `context`.
pub(crate) fn document_failure(context: &str, err: DocumentError) -> AppError {
    if err.is_client_error() {
        AppError::BadRequest(err.to_string())
    } else {
        AppError::Processing(format!("{}: {}", context, err))
    }
}
