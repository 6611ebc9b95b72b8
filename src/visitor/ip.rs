//! Client IP resolution.
//!
//! `X-Forwarded-For` is client-controlled unless a trusted proxy overwrites
//! it. Without one, callers can pick the IP that is logged and checked
//! against the blocklist, so blocklist decisions are only as strong as the
//! proxy in front of the relay. The value is not validated here; consumers
//! that embed it (the geolocation lookup) parse it first.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Header carrying the original client address behind a proxy.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolve the client IP for a request.
///
/// Uses the first entry of `X-Forwarded-For` when present and non-empty,
/// otherwise the peer address of the connection.
pub fn resolve_client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(String::from)
        .unwrap_or_else(|| peer.ip().to_string())
}
