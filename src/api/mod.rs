//! Client for the external vision API.
//!
//! This module provides HTTP client functionality for the vision SaaS
//! backend: credential exchange, media creation and association, raw upload,
//! subject bootstrap, and the camera listing.

mod auth;
mod authenticated;
mod cameras;
mod client;
mod media;
mod types;

pub use authenticated::AuthenticatedClient;
pub use client::ApiClient;
pub use types::{NetworkCamera, SubjectInfo};

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

/// Media operations consumed by the upload workers.
///
/// The three calls map onto the historical calling conventions the upload
/// fallback chain cycles through.
#[async_trait]
pub trait MediaApi: Send + Sync {
    /// Create a media record from a staged file; returns the media id.
    async fn create_media(
        &self,
        path: &Path,
        meta_tags: &[String],
        force_training: bool,
    ) -> Result<String>;

    /// Associate an existing media record with a subject.
    async fn associate_media(&self, media_id: &str, subject_uid: &str) -> Result<()>;

    /// Upload raw bytes, associated with the subject at creation time.
    async fn upload_raw(
        &self,
        content: Vec<u8>,
        filename: &str,
        meta_tags: &[String],
        subject_uid: &str,
    ) -> Result<String>;
}

/// Camera directory operations consumed by the camera listing endpoint.
#[async_trait]
pub trait CameraApi: Send + Sync {
    async fn list_cameras(&self) -> Result<Vec<NetworkCamera>>;

    /// Whether a subject has any media associated with it at all.
    async fn subject_has_media(&self, subject_uid: &str) -> Result<bool>;
}
