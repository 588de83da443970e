//! pitchbox-server library interface
//!
//! Exposes the application state and router so integration tests can drive
//! the HTTP surface with a stub transcription engine.

pub mod api;
pub mod config;
pub mod error;
pub mod params;
pub mod response;
pub mod staging;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::trace::TraceLayer;

use pitchbox_model::Transcriber;

/// Upload size ceiling. Generous enough for a few minutes of lossless audio.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Transcription model, loaded once at startup and read-only thereafter.
    pub model: Arc<dyn Transcriber>,
    /// Startup instant for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(model: Arc<dyn Transcriber>) -> Self {
        Self {
            model,
            started_at: Instant::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::predict_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
