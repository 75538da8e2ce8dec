//! Credential exchange against the vision API.
//!
//! The API uses HTTP basic auth for two bootstrap calls: resolving the
//! caller's tenant and exchanging the credentials for a bearer token.
//! The token is fetched once at startup; there is no refresh or rotation.

use anyhow::{Context, Result};
use reqwest::Method;
use tracing::debug;

use super::client::ApiClient;
use super::types::{TenantsResponse, TokenResponse};

impl ApiClient {
    /// Look up the first tenant the credentials belong to.
    ///
    /// Used when no tenant id is configured explicitly.
    pub async fn fetch_default_tenant(
        &self,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<String> {
        let url = Self::build_url(base_url, "users/current/tenants")?;
        let request = self
            .request(Method::GET, url)
            .basic_auth(username, Some(password));

        let body = Self::expect_success(request, "tenant lookup").await?;
        let tenants: TenantsResponse =
            serde_json::from_str(&body).context("Failed to parse tenants response")?;

        let tenant = tenants
            .tenants
            .into_iter()
            .next()
            .context("Account has no tenants")?;

        debug!("Resolved default tenant {}", tenant.tenant_id);
        Ok(tenant.tenant_id)
    }

    /// Exchange username/password for a bearer access token.
    pub async fn get_access_token(
        &self,
        base_url: &str,
        username: &str,
        password: &str,
        tenant_id: &str,
    ) -> Result<String> {
        let url = Self::build_url(base_url, "token")?;
        let request = self
            .request(Method::GET, url)
            .query(&[("tenant_id", tenant_id)])
            .basic_auth(username, Some(password));

        let body = Self::expect_success(request, "token request").await?;
        let token: TokenResponse =
            serde_json::from_str(&body).context("Failed to parse token response")?;

        if token.access_token.is_empty() {
            anyhow::bail!("Token response does not contain a valid 'access_token' field");
        }

        debug!("Successfully obtained access token");
        Ok(token.access_token)
    }
}
