//! Authenticated API client with stored credentials.
//!
//! Wraps `ApiClient` with the base URL and bearer token obtained at startup,
//! so callers don't pass credentials to every call and the underlying
//! `reqwest::Client` is reused for connection pooling.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::client::ApiClient;
use super::types::{NetworkCamera, SubjectInfo};
use super::{CameraApi, MediaApi};

/// Authenticated API client, created once after credential exchange.
#[derive(Clone)]
pub struct AuthenticatedClient {
    inner: Arc<ApiClient>,
    base_url: String,
    access_token: String,
}

impl AuthenticatedClient {
    pub fn from_client(client: ApiClient, base_url: String, access_token: String) -> Self {
        Self {
            inner: Arc::new(client),
            base_url,
            access_token,
        }
    }

    /// Fetch the training subject, creating it if it does not exist yet.
    pub async fn ensure_subject(&self, subject_uid: &str) -> Result<SubjectInfo> {
        match self
            .inner
            .get_subject(&self.base_url, &self.access_token, subject_uid)
            .await
        {
            Ok(subject) => Ok(subject),
            Err(_) => {
                self.inner
                    .create_subject(
                        &self.base_url,
                        &self.access_token,
                        subject_uid,
                        "Training Subject",
                    )
                    .await
            }
        }
    }
}

#[async_trait]
impl MediaApi for AuthenticatedClient {
    async fn create_media(
        &self,
        path: &Path,
        meta_tags: &[String],
        force_training: bool,
    ) -> Result<String> {
        self.inner
            .create_media(
                &self.base_url,
                &self.access_token,
                path,
                meta_tags,
                force_training,
            )
            .await
    }

    async fn associate_media(&self, media_id: &str, subject_uid: &str) -> Result<()> {
        self.inner
            .associate_media(&self.base_url, &self.access_token, media_id, subject_uid)
            .await
    }

    async fn upload_raw(
        &self,
        content: Vec<u8>,
        filename: &str,
        meta_tags: &[String],
        subject_uid: &str,
    ) -> Result<String> {
        self.inner
            .upload_raw(
                &self.base_url,
                &self.access_token,
                content,
                filename,
                meta_tags,
                subject_uid,
            )
            .await
    }
}

#[async_trait]
impl CameraApi for AuthenticatedClient {
    async fn list_cameras(&self) -> Result<Vec<NetworkCamera>> {
        self.inner
            .list_network_cameras(&self.base_url, &self.access_token)
            .await
    }

    async fn subject_has_media(&self, subject_uid: &str) -> Result<bool> {
        self.inner
            .subject_has_media(&self.base_url, &self.access_token, subject_uid)
            .await
    }
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
