//! Reqwest-based HTTP client for the upstream data API.
//!
//! Issues `GET {base}?region={region}&uid={uid}` and returns the JSON body
//! untouched. Timeouts are reported separately from every other failure.

use crate::GateError;
use reqwest::Client;
use std::time::Duration;

/// Upstream data API client.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: Option<String>,
}

impl UpstreamClient {
    /// Create a client for `base_url`. A `None` or blank URL yields a client
    /// whose every call fails with [`GateError::UpstreamNotConfigured`].
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, GateError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Ok(Self {
            client,
            base_url,
        })
    }

    /// Whether an upstream base URL is configured.
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Fetch player data for `uid` in `region`.
    pub async fn fetch_player(
        &self,
        region: &str,
        uid: &str,
    ) -> Result<serde_json::Value, GateError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or(GateError::UpstreamNotConfigured)?;

        let response = self
            .client
            .get(base_url)
            .query(&[("region", region), ("uid", uid)])
            .send()
            .await
            .map_err(map_transport_error)?;

        response.json().await.map_err(map_transport_error)
    }
}

fn map_transport_error(e: reqwest::Error) -> GateError {
    if e.is_timeout() {
        GateError::UpstreamTimeout
    } else {
        GateError::Upstream(e.to_string())
    }
}
