//! Geolocation lookup for visit logging.
//!
//! Queries an ip-api compatible service:
//! `GET {base}/json/{ip}?fields=status,country,isp,proxy`.
//! Failures never reach the request path; callers use
//! [`GeoClient::lookup_or_unknown`].

use crate::GateError;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

/// Placeholder used when a field could not be determined.
pub const UNKNOWN: &str = "Unknown";

/// Geolocation facts about a client IP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoInfo {
    /// Country name.
    pub country: String,
    /// Internet service provider.
    pub isp: String,
    /// `Yes` if the IP is a known proxy/VPN, `No` if not, `Unknown` on failure.
    pub vpn: String,
}

impl GeoInfo {
    /// All fields unknown.
    pub fn unknown() -> Self {
        Self {
            country: UNKNOWN.to_string(),
            isp: UNKNOWN.to_string(),
            vpn: UNKNOWN.to_string(),
        }
    }
}

/// Raw service response. Every field is optional.
#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    isp: Option<String>,
    #[serde(default)]
    proxy: Option<serde_json::Value>,
}

impl GeoResponse {
    fn into_info(self) -> GeoInfo {
        let vpn = if self.proxy.as_ref().is_some_and(is_truthy) {
            "Yes"
        } else {
            "No"
        };
        GeoInfo {
            country: self.country.unwrap_or_else(|| UNKNOWN.to_string()),
            isp: self.isp.unwrap_or_else(|| UNKNOWN.to_string()),
            vpn: vpn.to_string(),
        }
    }
}

/// The service reports `proxy` as a boolean, but tolerate other encodings.
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
        serde_json::Value::Null => false,
    }
}

/// Geolocation HTTP client.
#[derive(Debug, Clone)]
pub struct GeoClient {
    client: Client,
    base_url: String,
}

impl GeoClient {
    /// Create a client for the given service base URL and timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GateError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::ConfigError(format!("Failed to build geo client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Look up an IP.
    ///
    /// `ip` may come from a client header, so anything that is not a plain
    /// IPv4/IPv6 address is refused before a URL is built.
    pub async fn lookup(&self, ip: &str) -> Result<GeoInfo, GateError> {
        let addr: IpAddr = ip
            .trim()
            .parse()
            .map_err(|_| GateError::Geo(format!("Not an IP address: {:?}", ip)))?;
        let url = format!("{}/json/{}", self.base_url, addr);

        let response = self
            .client
            .get(&url)
            .query(&[("fields", "status,country,isp,proxy")])
            .send()
            .await
            .map_err(|e| GateError::Geo(format!("Request failed: {}", e)))?;

        let body: GeoResponse = response
            .json()
            .await
            .map_err(|e| GateError::Geo(format!("Malformed response: {}", e)))?;

        Ok(body.into_info())
    }

    /// Look up an IP, substituting [`GeoInfo::unknown`] for any failure.
    pub async fn lookup_or_unknown(&self, ip: &str) -> GeoInfo {
        match self.lookup(ip).await {
            Ok(info) => info,
            Err(e) => {
                tracing::debug!(ip, error = %e, "geolocation lookup failed");
                GeoInfo::unknown()
            }
        }
    }

    /// Configured service base URL.
    #[cfg(test)]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
