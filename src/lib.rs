//! PDF Toolkit Server Library
//!
//! Converts office, text, markup, tabular and image files to PDF, and merges
//! and splits PDFs, over a small HTTP API. Every request works in its own
//! job directory that a background sweeper reclaims.
//!
//! # Modules
//!
//! - `workspace`: Temp root, per-request job directories and the sweeper
//! - `document`: Neutral content model shared by extractors and the writer
//! - `formats`: Source format extractors
//! - `pdf`: PDF layout, merge, split and inspection
//! - `routes`: HTTP handlers

pub mod config;
pub mod document;
pub mod error;
pub mod formats;
pub mod pdf;
pub mod routes;
pub mod state;
pub mod workspace;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router with its middleware stack
pub fn app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config()
        .http
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config().http.max_body_bytes;

    Router::new()
        .nest("/api", routes::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
