//! /servers, /online and /prune handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use teewatch_core::ServerStatus;
use teewatch_services::{effective_retries, online_servers, prune_unreachable, round_summary};

use super::{fresh_round, ApiState};

// ── /servers, /servers/cached ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ServersResponse {
    pub online: Vec<ServerStatus>,
    pub unreachable: Vec<String>,
}

pub async fn handle_servers(State(state): State<ApiState>) -> Json<ServersResponse> {
    let results = fresh_round(&state).await;
    let summary = round_summary(&results);
    Json(ServersResponse {
        online: summary.online,
        unreachable: summary.unreachable,
    })
}

pub async fn handle_servers_cached(State(state): State<ApiState>) -> Json<ServersResponse> {
    let summary = round_summary(&state.cache.snapshot());
    Json(ServersResponse {
        online: summary.online,
        unreachable: summary.unreachable,
    })
}

// ── /online ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct OnlineQuery {
    pub gametype: Option<String>,
}

#[derive(Serialize)]
pub struct OnlineResponse {
    pub gametype: String,
    pub servers: Vec<ServerStatus>,
}

pub async fn handle_online(
    State(state): State<ApiState>,
    Query(query): Query<OnlineQuery>,
) -> Json<OnlineResponse> {
    let gametype = query
        .gametype
        .map(|g| g.trim().to_lowercase())
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| state.default_gametype_filter.clone());

    let results = fresh_round(&state).await;
    let servers = online_servers(&results, &gametype);
    Json(OnlineResponse { gametype, servers })
}

// ── /prune ────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PruneQuery {
    pub retries: Option<String>,
}

#[derive(Serialize)]
pub struct PruneResponse {
    pub retries: u32,
    pub removed: Vec<String>,
    pub remaining: usize,
}

pub async fn handle_prune(
    State(state): State<ApiState>,
    Query(query): Query<PruneQuery>,
) -> Json<PruneResponse> {
    let retries = effective_retries(query.retries.as_deref(), state.prune_retries);

    let removed: Vec<String> = prune_unreachable(
        &state.registry,
        &state.aggregator,
        state.response_timeout,
        retries,
    )
    .await
    .iter()
    .map(|e| e.to_string())
    .collect();

    for key in &removed {
        state.cache.remove(key);
    }
    tracing::info!(retries, removed = removed.len(), "prune requested via API");

    Json(PruneResponse {
        retries,
        removed,
        remaining: state.registry.len(),
    })
}
