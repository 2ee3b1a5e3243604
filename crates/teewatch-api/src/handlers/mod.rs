//! HTTP API handlers: exposes the registry, probe rounds and cache as JSON.

pub mod endpoints;
pub mod servers;
pub mod status;

use std::path::PathBuf;
use std::time::Duration;

use axum::http::StatusCode;

use teewatch_services::{EndpointRegistry, ProbeAggregator, ProbeResults, RegistryError, StatusCache};

#[derive(Clone)]
pub struct ApiState {
    pub registry: EndpointRegistry,
    pub aggregator: ProbeAggregator,
    pub cache: StatusCache,
    /// Per-endpoint probe timeout for rounds started by a request.
    pub response_timeout: Duration,
    /// How long results of a round stay listable in the cache.
    pub cache_ttl: Duration,
    /// Retries used by /prune when the caller gives none (or a value ≤ 1).
    pub prune_retries: u32,
    /// Server list file read by /endpoints/reload and written by /endpoints/save.
    pub server_list_path: PathBuf,
    /// Game type filter used by /online when the query has none.
    pub default_gametype_filter: String,
    /// Shutdown broadcast sender, signals graceful daemon shutdown.
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Probe every registered endpoint once and remember the results.
async fn fresh_round(state: &ApiState) -> ProbeResults {
    let endpoints = state.registry.list();
    let results = state
        .aggregator
        .probe_all(&endpoints, state.response_timeout)
        .await;
    state.cache.store_round(results.clone(), state.cache_ttl);
    results
}

fn registry_error(e: RegistryError) -> (StatusCode, String) {
    let code = match e {
        RegistryError::Duplicate(_) => StatusCode::CONFLICT,
        RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::InvalidFormat(_)
        | RegistryError::InvalidIp(_)
        | RegistryError::InvalidPort(_) => StatusCode::BAD_REQUEST,
    };
    (code, e.to_string())
}

fn internal_error(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
}

// Re-export handler functions for use in router setup.
pub use endpoints::{
    handle_endpoints_add, handle_endpoints_list, handle_endpoints_reload, handle_endpoints_remove,
    handle_endpoints_save,
};
pub use servers::{handle_online, handle_prune, handle_servers, handle_servers_cached};
pub use status::{handle_shutdown, handle_status};
