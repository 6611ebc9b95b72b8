//! Keygate configuration.

use crate::GateError;
use chrono::FixedOffset;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default geolocation service base URL.
pub const DEFAULT_GEO_BASE_URL: &str = "http://ip-api.com";

/// Offset added to epoch seconds for key expiration math (UTC+3).
pub const DEFAULT_EXPIRY_REFERENCE_OFFSET_SECS: i64 = 3 * 3600;

/// Configuration for the relay.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Socket address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Directory holding the key, blocklist and visit files.
    pub data_dir: PathBuf,

    /// Upstream data API base URL (`EXTERNAL_API`).
    /// When unset the player endpoint answers 500 instead of failing startup.
    pub upstream_url: Option<String>,

    /// Upstream request timeout.
    pub upstream_timeout: Duration,

    /// Geolocation service base URL, without trailing slash.
    pub geo_base_url: String,

    /// Geolocation lookup timeout.
    pub geo_timeout: Duration,

    /// Key lifecycle monitor polling interval.
    pub monitor_interval: Duration,

    /// Seconds added to the epoch clock for expiration math.
    /// Existing key files store `expires_at` on this scale.
    pub expiry_reference_offset_secs: i64,

    /// UTC offset (hours) used for visit log timestamps.
    pub visit_utc_offset_hours: i32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            data_dir: PathBuf::from("."),
            upstream_url: None,
            upstream_timeout: Duration::from_secs(11),
            geo_base_url: DEFAULT_GEO_BASE_URL.to_string(),
            geo_timeout: Duration::from_secs(3),
            monitor_interval: Duration::from_millis(500),
            expiry_reference_offset_secs: DEFAULT_EXPIRY_REFERENCE_OFFSET_SECS,
            visit_utc_offset_hours: 3,
        }
    }
}

impl GateConfig {
    /// Build configuration from environment variables, falling back to defaults.
    ///
    /// - `EXTERNAL_API` — upstream base URL (blank counts as unset)
    /// - `KEYGATE_BIND` — bind address
    /// - `KEYGATE_DATA_DIR` — data directory
    /// - `KEYGATE_GEO_URL` — geolocation base URL
    /// - `KEYGATE_MONITOR_INTERVAL_MS` — monitor interval (100..=60000)
    /// - `KEYGATE_UTC_OFFSET_HOURS` — visit timestamp offset
    pub fn from_env() -> Result<Self, GateError> {
        let mut config = Self::default();

        config.upstream_url = env::var("EXTERNAL_API")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        if let Ok(bind) = env::var("KEYGATE_BIND") {
            config.bind_addr = bind.parse().map_err(|e| {
                GateError::ConfigError(format!("KEYGATE_BIND `{}` is invalid: {}", bind, e))
            })?;
        }

        if let Ok(dir) = env::var("KEYGATE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Ok(url) = env::var("KEYGATE_GEO_URL") {
            config.geo_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(ms) = env::var("KEYGATE_MONITOR_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| (100..=60_000).contains(v))
        {
            config.monitor_interval = Duration::from_millis(ms);
        }

        if let Ok(hours) = env::var("KEYGATE_UTC_OFFSET_HOURS") {
            config.visit_utc_offset_hours = hours.trim().parse().map_err(|e| {
                GateError::ConfigError(format!(
                    "KEYGATE_UTC_OFFSET_HOURS `{}` is invalid: {}",
                    hours, e
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), GateError> {
        if self.upstream_timeout.is_zero() {
            return Err(GateError::ConfigError(
                "upstream_timeout cannot be zero".to_string(),
            ));
        }
        if self.geo_timeout.is_zero() {
            return Err(GateError::ConfigError(
                "geo_timeout cannot be zero".to_string(),
            ));
        }
        if self.monitor_interval.is_zero() {
            return Err(GateError::ConfigError(
                "monitor_interval cannot be zero".to_string(),
            ));
        }
        if !(-23..=23).contains(&self.visit_utc_offset_hours) {
            return Err(GateError::ConfigError(format!(
                "visit_utc_offset_hours must be within -23..=23, got {}",
                self.visit_utc_offset_hours
            )));
        }
        Ok(())
    }

    /// Fixed offset used for visit timestamps.
    pub fn visit_offset(&self) -> Result<FixedOffset, GateError> {
        FixedOffset::east_opt(self.visit_utc_offset_hours * 3600).ok_or_else(|| {
            GateError::ConfigError(format!(
                "invalid UTC offset: {} hours",
                self.visit_utc_offset_hours
            ))
        })
    }
}
