use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder};
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// Default service version (from Cargo.toml)
const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the User-Agent string
fn build_user_agent() -> String {
    let version =
        std::env::var("VISIONGATE_VERSION").unwrap_or_else(|_| DEFAULT_VERSION.to_string());
    std::env::var("VISIONGATE_USER_AGENT")
        .unwrap_or_else(|_| format!("visiongate.gateway/{}", version))
}

/// HTTP client for the vision API
pub struct ApiClient {
    pub(super) client: Client,
    pub(super) user_agent: String,
    pub(super) session_id: String,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(user_agent: Option<String>) -> Self {
        let user_agent = user_agent.unwrap_or_else(build_user_agent);
        let session_id = Uuid::new_v4().to_string();

        // No overall request timeout: an upload to the vision API may legally
        // take as long as the transfer needs, and a hung call stalls only the
        // worker that issued it.
        let client = Client::builder()
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            user_agent,
            session_id,
        }
    }

    pub(super) fn build_url(base_url: &str, endpoint: &str) -> Result<Url> {
        let base =
            Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
        base.join(endpoint)
            .with_context(|| format!("Failed to build URL for endpoint: {}", endpoint))
    }

    /// Start a request with the common headers attached
    pub(super) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request_id = Uuid::new_v4().to_string();
        debug!("=== API Request ===");
        debug!("URL: {} {}", method, url);

        self.client
            .request(method, url)
            .header("User-Agent", &self.user_agent)
            .header("x-request-id", request_id)
            .header("x-request-session-id", &self.session_id)
    }

    /// Send a request and read the body, converting non-2xx statuses into errors
    pub(super) async fn expect_success(request: RequestBuilder, what: &str) -> Result<String> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", what))?;

        let status = response.status();
        debug!("=== API Response ===");
        debug!("Status: {}", status);

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("{} failed with status {}: {}", what, status, error_text);
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read {} response body", what))
    }
}
