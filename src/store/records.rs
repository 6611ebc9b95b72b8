//! Persisted record shapes.
//!
//! The on-disk layout is format-stable:
//! - keys: `{"keys": {id: KeyRecord}}`
//! - blocklist: `{"blocked_ips": [ip, ...]}`
//! - visits: `{"visits": [VisitRecord, ...]}`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One API key's activation and expiration state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Whether the key currently grants access.
    #[serde(default)]
    pub active: bool,

    /// Lifetime in seconds, counted from the first monitor cycle that sees it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    /// Absolute expiry on the reference clock scale (fractional seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<f64>,

    /// Provisioning metadata this crate does not interpret; preserved on save.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl KeyRecord {
    /// An active key with no expiry.
    pub fn active() -> Self {
        Self {
            active: true,
            ..Self::default()
        }
    }

    /// An active key that expires `duration` seconds after first observed.
    pub fn with_duration(duration: u64) -> Self {
        Self {
            active: true,
            duration: Some(duration),
            ..Self::default()
        }
    }
}

/// All known API keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyTable {
    /// Records keyed by the API key string.
    #[serde(default)]
    pub keys: BTreeMap<String, KeyRecord>,
}

impl KeyTable {
    /// Whether `key` exists and is active.
    pub fn is_active(&self, key: &str) -> bool {
        self.keys.get(key).is_some_and(|record| record.active)
    }
}

/// Permanently blocked client IPs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockList {
    /// IPs in insertion order.
    #[serde(default)]
    pub blocked_ips: Vec<String>,
}

/// Coarse device class derived from a User-Agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceClass {
    /// Phones and other handheld mobile agents.
    Phone,
    /// Tablets.
    Tap,
    /// Everything else.
    Pc,
}

/// One logged request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    /// Resolved client IP.
    pub ip: String,
    /// Country name from geolocation, or `Unknown`.
    pub country: String,
    /// `Yes`, `No` or `Unknown`.
    pub vpn: String,
    /// ISP name from geolocation, or `Unknown`.
    pub isp: String,
    /// Device class.
    pub device: DeviceClass,
    /// Browser label derived from the User-Agent.
    pub browser: String,
    /// Local 12-hour time.
    pub time: String,
    /// Local date.
    pub date: String,
}

/// Append-only visit log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitLog {
    /// Entries in arrival order.
    #[serde(default)]
    pub visits: Vec<VisitRecord>,
}

/// Short SHA-256 fingerprint of an API key, safe for logs.
pub fn key_fingerprint(key: &str) -> String {
    use sha2::{Digest, Sha256};
    let hash = Sha256::digest(key.as_bytes());
    hex::encode(&hash[..6])
}
