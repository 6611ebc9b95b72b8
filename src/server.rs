//! HTTP server wiring.
//!
//! `AppState` is the shared handle every handler and the admission
//! middleware receive. [`serve`] is the process entry point: it opens the
//! record store, starts the key monitor and serves until Ctrl-C.

use crate::admission::admission_middleware;
use crate::client::UpstreamClient;
use crate::clock::{Clock, SystemClock};
use crate::config::GateConfig;
use crate::forward::player;
use crate::lifecycle::KeyMonitor;
use crate::store::{FileStore, RecordStore};
use crate::visitor::GeoClient;
use crate::GateError;
use axum::{middleware, routing::get, Router};
use chrono::FixedOffset;
use std::net::SocketAddr;
use std::sync::Arc;

/// Route of the player relay endpoint.
pub const PLAYER_ROUTE: &str = "/dvm7api/player";

/// Shared application state threaded through axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Active configuration.
    pub config: Arc<GateConfig>,
    /// Keys, blocklist and visit log.
    pub store: Arc<dyn RecordStore>,
    /// Clock for visit timestamps.
    pub clock: Arc<dyn Clock>,
    /// Geolocation client.
    pub geo: GeoClient,
    /// Upstream data API client.
    pub upstream: UpstreamClient,
    /// Offset applied to visit timestamps.
    pub visit_offset: FixedOffset,
}

impl AppState {
    /// Build state from configuration and a store, using the system clock.
    pub fn new(config: GateConfig, store: Arc<dyn RecordStore>) -> Result<Self, GateError> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Build state with a custom clock.
    pub fn with_clock(
        config: GateConfig,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GateError> {
        config.validate()?;

        let geo = GeoClient::new(config.geo_base_url.clone(), config.geo_timeout)?;
        let upstream = UpstreamClient::new(config.upstream_url.clone(), config.upstream_timeout)?;
        let visit_offset = config.visit_offset()?;

        Ok(Self {
            config: Arc::new(config),
            store,
            clock,
            geo,
            upstream,
            visit_offset,
        })
    }

    /// Key monitor sharing this state's store, on the system clock.
    pub fn key_monitor(&self) -> KeyMonitor {
        KeyMonitor::new(
            self.store.clone(),
            self.config.monitor_interval,
            self.config.expiry_reference_offset_secs,
        )
    }
}

/// Build the router: the player route behind the admission middleware.
///
/// Must be served with connect info (`into_make_service_with_connect_info::<SocketAddr>`)
/// so the middleware can see the peer address.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(PLAYER_ROUTE, get(player))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission_middleware,
        ))
        .with_state(state)
}

/// Open the store, start the key monitor and serve until Ctrl-C.
pub async fn serve(config: GateConfig) -> Result<(), GateError> {
    let store = Arc::new(FileStore::open(config.data_dir.clone())?);
    let bind_addr = config.bind_addr;

    if config.upstream_url.is_none() {
        tracing::warn!("EXTERNAL_API is not set; player requests will fail with 500");
    }

    let state = AppState::new(config, store)?;
    let monitor = state.key_monitor().spawn();

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| GateError::Server(format!("Failed to bind {}: {}", bind_addr, e)))?;
    tracing::info!(addr = %bind_addr, "keygate listening");

    let result = axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| GateError::Server(e.to_string()));

    monitor.abort();
    tracing::info!("keygate stopped");
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
