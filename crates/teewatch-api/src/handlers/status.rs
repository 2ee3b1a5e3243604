//! /status and /daemon/shutdown handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::ApiState;

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub registered: usize,
    pub cached: usize,
    pub cached_online: usize,
    pub response_timeout_ms: u64,
    /// Seconds since the newest cached result was stored; None with an empty cache.
    pub last_round_secs: Option<u64>,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let snapshot = state.cache.snapshot();
    let cached_online = snapshot.values().filter(|r| r.is_online()).count();

    Json(StatusResponse {
        registered: state.registry.len(),
        cached: snapshot.len(),
        cached_online,
        response_timeout_ms: state.response_timeout.as_millis() as u64,
        last_round_secs: state.cache.newest_age().map(|age| age.as_secs()),
    })
}

// ── /daemon/shutdown ──────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ShutdownResponse {
    pub message: String,
}

pub async fn handle_shutdown(State(state): State<ApiState>) -> Json<ShutdownResponse> {
    tracing::info!("shutdown requested via API");

    // No receivers only happens when the daemon is already on its way out.
    let _ = state.shutdown_tx.send(());

    Json(ShutdownResponse {
        message: "Shutdown initiated".to_string(),
    })
}
