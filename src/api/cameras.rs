//! Network camera listing.

use anyhow::{Context, Result};
use reqwest::Method;
use tracing::debug;

use super::client::ApiClient;
use super::types::{NetworkCamera, NetworkCamerasResponse};

impl ApiClient {
    /// List all network cameras registered for the current tenant.
    pub async fn list_network_cameras(
        &self,
        base_url: &str,
        access_token: &str,
    ) -> Result<Vec<NetworkCamera>> {
        let url = Self::build_url(base_url, "tenants/current/networkCameras")?;
        let request = self
            .request(Method::GET, url)
            .header("Authorization", format!("Bearer {}", access_token));

        let body = Self::expect_success(request, "camera listing").await?;
        let cameras: NetworkCamerasResponse =
            serde_json::from_str(&body).context("Failed to parse camera listing")?;

        let cameras = cameras.into_cameras();
        debug!("Fetched {} network cameras", cameras.len());
        Ok(cameras)
    }
}
