//! HTTP surface of the gateway.
//!
//! Thin dispatch layer: routing, shared state, CORS, and the JSON error
//! mapping live here; all upload logic is in the batch subsystem.

mod error;
mod handlers;

pub use error::GatewayError;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::{CameraApi, MediaApi};
use crate::batch::{BatchCoordinator, ProgressStore};

/// Request body cap: a full 500-image batch of reasonably sized photos
const MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Shared application state for the handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<BatchCoordinator>,
    pub store: Arc<ProgressStore>,
    pub media: Arc<dyn MediaApi>,
    pub cameras: Arc<dyn CameraApi>,
    pub subject_uid: String,
    pub staging_root: PathBuf,
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(handlers::upload_image))
        .route("/batch-upload", post(handlers::batch_upload))
        .route("/upload-folder", post(handlers::upload_folder))
        .route("/batch-status/:batch_id", get(handlers::batch_status))
        .route("/cameras", get(handlers::list_cameras))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
