//! Player lookup handler.
//!
//! `GET /dvm7api/player?uid=&region=&key=`
//!
//! Checks run in a fixed order so callers always see the first problem:
//! missing key (400), invalid key (403), missing uid/region (400),
//! unconfigured upstream (500). Only then is the upstream called.
//!
//! Repeated parameters resolve to their last value. A query string that
//! cannot be decoded at all is treated as carrying no parameters.

use crate::server::AppState;
use crate::store::records::key_fingerprint;
use crate::store::run_blocking;
use crate::GateError;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Query parameters accepted by the player endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerQuery {
    /// Player identifier.
    pub uid: Option<String>,
    /// Game region.
    pub region: Option<String>,
    /// Caller's API key.
    pub key: Option<String>,
}

/// Successful relay response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerResponse {
    /// Always `success`.
    pub status: String,
    /// Echo of the caller's key.
    pub key: String,
    /// Echo of the requested uid.
    pub uid: String,
    /// Echo of the requested region.
    pub region: String,
    /// Upstream body, verbatim.
    pub data: serde_json::Value,
}

/// A validated request, ready to forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRequest {
    /// Caller's API key.
    pub key: String,
    /// Player identifier.
    pub uid: String,
    /// Game region.
    pub region: String,
}

impl PlayerQuery {
    /// Collect the recognized parameters from decoded pairs, last value wins.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (name, value) in pairs {
            match name.as_str() {
                "uid" => query.uid = Some(value),
                "region" => query.region = Some(value),
                "key" => query.key = Some(value),
                _ => {}
            }
        }
        query
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Validate query parameters against the key table and configuration.
pub async fn validate_request(
    state: &AppState,
    query: PlayerQuery,
) -> Result<PlayerRequest, GateError> {
    let key = present(query.key).ok_or(GateError::MissingKey)?;

    let lookup = key.clone();
    let active = run_blocking(&state.store, move |store| store.load_keys().is_active(&lookup)).await?;
    if !active {
        tracing::info!(key_id = %key_fingerprint(&key), "rejected invalid key");
        return Err(GateError::InvalidKey);
    }

    let (uid, region) = match (present(query.uid), present(query.region)) {
        (Some(uid), Some(region)) => (uid, region),
        _ => return Err(GateError::MissingParams),
    };

    if !state.upstream.is_configured() {
        tracing::error!("upstream base URL is not configured");
        return Err(GateError::UpstreamNotConfigured);
    }

    Ok(PlayerRequest { key, uid, region })
}

/// Validate the caller and relay the request to the upstream data API.
pub async fn player(
    State(state): State<AppState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<PlayerResponse>, GateError> {
    let pairs = match params {
        Ok(Query(pairs)) => pairs,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "undecodable query string");
            Vec::new()
        }
    };
    let request = validate_request(&state, PlayerQuery::from_pairs(pairs)).await?;

    let data = state
        .upstream
        .fetch_player(&request.region, &request.uid)
        .await
        .map_err(|e| {
            tracing::warn!(
                key_id = %key_fingerprint(&request.key),
                uid = %request.uid,
                region = %request.region,
                error = %e,
                "upstream request failed"
            );
            e
        })?;

    Ok(Json(PlayerResponse {
        status: "success".to_string(),
        key: request.key,
        uid: request.uid,
        region: request.region,
        data,
    }))
}
