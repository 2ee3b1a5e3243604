//! /endpoints handlers: registry management and server list persistence.

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use teewatch_services::{server_list, EndpointRegistry};

use super::{internal_error, registry_error, ApiState};

// ── /endpoints (GET) ──────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct EndpointsResponse {
    pub endpoints: Vec<String>,
}

pub async fn handle_endpoints_list(State(state): State<ApiState>) -> Json<EndpointsResponse> {
    let endpoints = state
        .registry
        .sorted_list()
        .iter()
        .map(|e| e.to_string())
        .collect();
    Json(EndpointsResponse { endpoints })
}

// ── /endpoints (POST) and /endpoints/remove ───────────────────────────────────

#[derive(Deserialize)]
pub struct AddressRequest {
    pub address: String,
}

#[derive(Serialize)]
pub struct AddressResponse {
    pub address: String,
    pub registered: usize,
}

pub async fn handle_endpoints_add(
    State(state): State<ApiState>,
    Json(req): Json<AddressRequest>,
) -> Result<Json<AddressResponse>, (StatusCode, String)> {
    let endpoint = state.registry.add(&req.address).map_err(registry_error)?;
    tracing::info!(endpoint = %endpoint, "endpoint added via API");

    Ok(Json(AddressResponse {
        address: endpoint.to_string(),
        registered: state.registry.len(),
    }))
}

pub async fn handle_endpoints_remove(
    State(state): State<ApiState>,
    Json(req): Json<AddressRequest>,
) -> Result<Json<AddressResponse>, (StatusCode, String)> {
    let endpoint = state
        .registry
        .remove(&req.address)
        .map_err(registry_error)?;
    state.cache.remove(&endpoint.to_string());
    tracing::info!(endpoint = %endpoint, "endpoint removed via API");

    Ok(Json(AddressResponse {
        address: endpoint.to_string(),
        registered: state.registry.len(),
    }))
}

// ── /endpoints/save, /endpoints/reload ────────────────────────────────────────

#[derive(Serialize)]
pub struct SaveResponse {
    pub path: String,
    pub saved: usize,
}

pub async fn handle_endpoints_save(
    State(state): State<ApiState>,
) -> Result<Json<SaveResponse>, (StatusCode, String)> {
    let saved =
        server_list::save(&state.server_list_path, &state.registry).map_err(internal_error)?;

    Ok(Json(SaveResponse {
        path: state.server_list_path.display().to_string(),
        saved,
    }))
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub path: String,
    pub loaded: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

pub async fn handle_endpoints_reload(
    State(state): State<ApiState>,
) -> Result<Json<ReloadResponse>, (StatusCode, String)> {
    let path = &state.server_list_path;
    // Read before clearing so a missing file leaves the registry intact.
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read server list: {}", path.display()))
        .map_err(internal_error)?;

    // Load into a scratch registry, then swap, so rounds never see a
    // half-loaded set.
    let next = EndpointRegistry::new();
    let report = server_list::load_str(&text, &next);
    let dropped = state.registry.replace_with(&next);
    for endpoint in &dropped {
        state.cache.remove(&endpoint.to_string());
    }
    tracing::info!(
        dropped = dropped.len(),
        loaded = report.loaded,
        invalid = report.invalid,
        "server list reloaded via API"
    );

    Ok(Json(ReloadResponse {
        path: path.display().to_string(),
        loaded: report.loaded,
        duplicates: report.duplicates,
        invalid: report.invalid,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support;
    use std::time::Duration;
    use teewatch_core::{ProbeError, ProbeResult};

    fn req(address: &str) -> Json<AddressRequest> {
        Json(AddressRequest {
            address: address.to_string(),
        })
    }

    fn temp_list(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("teewatch-api-test-{}-{}", std::process::id(), name))
            .join("servers.txt")
    }

    #[tokio::test]
    async fn add_then_list_sorted() {
        let state = test_support::state();
        handle_endpoints_add(State(state.clone()), req("203.0.113.9:8303"))
            .await
            .unwrap();
        let Json(added) = handle_endpoints_add(State(state.clone()), req(" 203.0.113.10:8303"))
            .await
            .unwrap();
        assert_eq!(added.address, "203.0.113.10:8303");
        assert_eq!(added.registered, 2);

        let Json(list) = handle_endpoints_list(State(state)).await;
        assert_eq!(list.endpoints, ["203.0.113.10:8303", "203.0.113.9:8303"]);
    }

    #[tokio::test]
    async fn add_errors_map_to_status_codes() {
        let state = test_support::state();
        handle_endpoints_add(State(state.clone()), req("203.0.113.9:8303"))
            .await
            .unwrap();

        let Err((code, _)) = handle_endpoints_add(State(state.clone()), req("203.0.113.9:8303")).await
        else {
            panic!("duplicate add should fail");
        };
        assert_eq!(code, StatusCode::CONFLICT);

        let Err((code, message)) =
            handle_endpoints_add(State(state.clone()), req("203.0.113.9:80")).await
        else {
            panic!("reserved port should fail");
        };
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(message.contains("1024"));

        assert_eq!(state.registry.len(), 1);
    }

    #[tokio::test]
    async fn remove_absent_is_not_found() {
        let state = test_support::state();
        let Err((code, _)) = handle_endpoints_remove(State(state), req("203.0.113.9:8303")).await
        else {
            panic!("remove of absent endpoint should fail");
        };
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn save_then_reload_round_trips_the_file() {
        let path = temp_list("reload");
        let state = test_support::state_with_list(path.clone());
        state.registry.add("203.0.113.9:8303").unwrap();
        state.registry.add("[2001:db8::1]:8303").unwrap();

        let Json(saved) = handle_endpoints_save(State(state.clone())).await.unwrap();
        assert_eq!(saved.saved, 2);

        state.registry.add("203.0.113.77:8303").unwrap();
        state.cache.store(
            "203.0.113.77:8303",
            ProbeResult::unreachable("203.0.113.77:8303", ProbeError::Timeout),
            Duration::from_secs(60),
        );
        state.cache.store(
            "203.0.113.9:8303",
            ProbeResult::unreachable("203.0.113.9:8303", ProbeError::Timeout),
            Duration::from_secs(60),
        );

        let Json(reloaded) = handle_endpoints_reload(State(state.clone())).await.unwrap();
        assert_eq!(reloaded.loaded, 2);
        assert_eq!(state.registry.len(), 2);
        // results for endpoints the file no longer lists are gone from the cache
        assert!(state.cache.get("203.0.113.77:8303").is_none());
        assert!(state.cache.get("203.0.113.9:8303").is_some());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn reload_of_missing_file_keeps_registry() {
        let state = test_support::state_with_list(temp_list("missing"));
        state.registry.add("203.0.113.9:8303").unwrap();

        let Err((code, message)) = handle_endpoints_reload(State(state.clone())).await else {
            panic!("reload of a missing file should fail");
        };
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(message.contains("failed to read server list"));
        assert_eq!(state.registry.len(), 1);
    }
}
