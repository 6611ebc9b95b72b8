//! Admission middleware for Axum.
//!
//! Every request is logged first, then checked in order:
//! 1. blocked IP -> 403
//! 2. blank User-Agent -> warn, admit
//! 3. denylisted tool -> ban IP, 403
//! 4. unrecognized agent -> warn, admit
//! 5. admit

use crate::admission::policy::{inspect_agent, AgentVerdict};
use crate::server::AppState;
use crate::store::run_blocking;
use crate::visitor::{describe_visit, resolve_client_ip};
use crate::GateError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::USER_AGENT, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

/// User-Agent recorded in the visit log when the header is absent.
const MISSING_AGENT: &str = "Unknown";

/// Gate every request through logging, the blocklist and the agent policy.
pub async fn admission_middleware(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let (ip, user_agent) = {
        let headers = request.headers();
        (resolve_client_ip(headers, peer), header_agent(headers))
    };

    record_visit(&state, &ip, user_agent.as_deref()).await;

    if let Err(refusal) = admit(&state, &ip, user_agent.as_deref().unwrap_or("")).await {
        return refusal.into_response();
    }

    next.run(request).await
}

fn header_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

/// Append the visit log entry. Failure is logged, never propagated.
async fn record_visit(state: &AppState, ip: &str, user_agent: Option<&str>) {
    let visit = describe_visit(
        &state.geo,
        state.clock.as_ref(),
        state.visit_offset,
        ip,
        user_agent.unwrap_or(MISSING_AGENT),
    )
    .await;

    let appended = run_blocking(&state.store, move |store| store.append_visit(visit)).await;
    if let Err(e) = appended.and_then(|result| result) {
        tracing::error!(ip, error = %e, "failed to record visit");
    }
}

/// Apply the blocklist and the agent policy to a resolved request.
async fn admit(state: &AppState, ip: &str, user_agent: &str) -> Result<(), GateError> {
    let owned_ip = ip.to_string();
    let blocked = run_blocking(&state.store, move |store| store.is_blocked(&owned_ip))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(ip, error = %e, "blocklist check failed");
            false
        });
    if blocked {
        tracing::info!(ip, "refused blocked ip");
        return Err(GateError::Blocked);
    }

    match inspect_agent(user_agent) {
        AgentVerdict::Empty => {
            tracing::warn!(ip, "empty User-Agent");
            Ok(())
        }
        AgentVerdict::Denied(tool) => {
            tracing::warn!(ip, ua = user_agent, tool, "denylisted client, blocking ip");
            let owned_ip = ip.to_string();
            let persisted = run_blocking(&state.store, move |store| store.block_ip(&owned_ip)).await;
            if let Err(e) = persisted.and_then(|result| result) {
                tracing::error!(ip, error = %e, "failed to persist blocked ip");
            }
            Err(GateError::Blocked)
        }
        AgentVerdict::Unrecognized => {
            tracing::warn!(ip, ua = user_agent, "unknown User-Agent");
            Ok(())
        }
        AgentVerdict::Recognized => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::config::GateConfig;
    use crate::store::{MemoryStore, RecordStore};
    use std::sync::Arc;

    fn test_state(store: Arc<MemoryStore>) -> AppState {
        let config = GateConfig {
            geo_base_url: "http://127.0.0.1:9".to_string(),
            ..GateConfig::default()
        };
        let clock = Arc::new(MockClock::from_rfc3339("2025-01-15T12:00:00Z"));
        AppState::with_clock(config, store, clock).unwrap()
    }

    #[tokio::test]
    async fn test_admit_recognized_agent() {
        let store = Arc::new(MemoryStore::new());
        let state = test_state(store.clone());
        assert!(admit(&state, "1.1.1.1", "Mozilla/5.0 Firefox/121.0").await.is_ok());
        assert!(store.blocked_ips().is_empty());
    }

    #[tokio::test]
    async fn test_admit_empty_and_unknown_agents() {
        let store = Arc::new(MemoryStore::new());
        let state = test_state(store.clone());
        assert!(admit(&state, "1.1.1.1", "").await.is_ok());
        assert!(admit(&state, "1.1.1.1", "MyCustomAgent/0.1").await.is_ok());
        assert!(store.blocked_ips().is_empty());
    }

    #[tokio::test]
    async fn test_denied_tool_bans_ip() {
        let store = Arc::new(MemoryStore::new());
        let state = test_state(store.clone());

        assert!(matches!(
            admit(&state, "6.6.6.6", "curl/7.88").await,
            Err(GateError::Blocked)
        ));
        assert!(store.is_blocked("6.6.6.6"));

        // A clean agent from the same IP stays refused.
        assert!(matches!(
            admit(&state, "6.6.6.6", "Mozilla/5.0 Chrome/120.0").await,
            Err(GateError::Blocked)
        ));
        // Other IPs are unaffected.
        assert!(admit(&state, "7.7.7.7", "Mozilla/5.0 Chrome/120.0").await.is_ok());
    }

    #[tokio::test]
    async fn test_blocked_ip_refused_even_with_empty_agent() {
        let store = Arc::new(MemoryStore::new());
        store.block_ip("9.9.9.9").unwrap();
        let state = test_state(store);
        assert!(matches!(admit(&state, "9.9.9.9", "").await, Err(GateError::Blocked)));
    }
}
