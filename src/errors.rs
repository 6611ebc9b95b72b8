//! Keygate error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Message returned to clients whose device (IP) is blocked.
pub const BLOCKED_MESSAGE: &str = "Your device has been blocked from using this API";

/// Errors that can occur while admitting, validating or forwarding a request.
#[derive(Debug, Error)]
pub enum GateError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No `key` query parameter was supplied.
    #[error("Key required")]
    MissingKey,

    /// `uid` or `region` query parameter was missing.
    #[error("uid & region required")]
    MissingParams,

    /// Key is unknown, inactive or expired.
    #[error("Invalid key")]
    InvalidKey,

    /// Client IP is on the blocklist or matched a denylisted tool.
    #[error("{}", BLOCKED_MESSAGE)]
    Blocked,

    /// Upstream base URL was never configured.
    #[error("EXTERNAL_API is not set")]
    UpstreamNotConfigured,

    /// Upstream did not answer within the forwarding timeout.
    #[error("External API timeout")]
    UpstreamTimeout,

    /// Any other upstream transport or decode failure.
    #[error("{0}")]
    Upstream(String),

    /// Geolocation lookup failed. Never surfaced to clients.
    #[error("Geolocation error: {0}")]
    Geo(String),

    /// Record store I/O error.
    #[error("Store I/O error: {0}")]
    StoreIO(String),

    /// Listener or server failure.
    #[error("Server error: {0}")]
    Server(String),
}

impl GateError {
    /// HTTP status this error maps to when it reaches a client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GateError::MissingKey | GateError::MissingParams => StatusCode::BAD_REQUEST,
            GateError::InvalidKey | GateError::Blocked => StatusCode::FORBIDDEN,
            GateError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            GateError::UpstreamNotConfigured
            | GateError::Upstream(_)
            | GateError::ConfigError(_)
            | GateError::Geo(_)
            | GateError::StoreIO(_)
            | GateError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            GateError::Blocked => serde_json::json!({ "error": BLOCKED_MESSAGE }),
            // Internal failures keep their detail in the logs only.
            GateError::ConfigError(_)
            | GateError::Geo(_)
            | GateError::StoreIO(_)
            | GateError::Server(_) => {
                tracing::error!(error = %self, "internal error reached a response");
                serde_json::json!({ "status": "error", "message": "Internal server error" })
            }
            other => serde_json::json!({ "status": "error", "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_bad_request() {
        assert_eq!(GateError::MissingKey.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(GateError::MissingParams.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_auth_and_block_errors_are_forbidden() {
        assert_eq!(GateError::InvalidKey.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(GateError::Blocked.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_upstream_errors() {
        assert_eq!(
            GateError::UpstreamTimeout.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GateError::Upstream("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(GateError::Upstream("boom".into()).to_string(), "boom");
    }

    #[test]
    fn test_messages_match_wire_text() {
        assert_eq!(GateError::MissingKey.to_string(), "Key required");
        assert_eq!(GateError::MissingParams.to_string(), "uid & region required");
        assert_eq!(GateError::Blocked.to_string(), BLOCKED_MESSAGE);
    }
}
