//! Browse helpers: turn a probe round into ordered views, and prune
//! endpoints that never answer.

use std::collections::HashSet;
use std::time::Duration;

use teewatch_core::{Endpoint, ServerStatus};

use crate::probe::{ProbeAggregator, ProbeResults};
use crate::registry::EndpointRegistry;

/// A round split into answering servers and failure markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundSummary {
    /// Sorted by player count, descending.
    pub online: Vec<ServerStatus>,
    /// Addresses of endpoints that did not answer, sorted.
    pub unreachable: Vec<String>,
}

/// Most players first; ties broken by address so output is stable.
pub fn sort_by_players_desc(servers: &mut [ServerStatus]) {
    servers.sort_by(|a, b| {
        b.players
            .len()
            .cmp(&a.players.len())
            .then_with(|| a.address.cmp(&b.address))
    });
}

pub fn round_summary(results: &ProbeResults) -> RoundSummary {
    let mut summary = RoundSummary::default();
    for result in results.values() {
        match result.status() {
            Some(status) => summary.online.push(status.clone()),
            None => summary.unreachable.push(result.address().to_string()),
        }
    }
    sort_by_players_desc(&mut summary.online);
    summary.unreachable.sort();
    summary
}

/// Answering servers with at least one player whose game type contains
/// `gametype_filter` (case-insensitive). An empty filter matches every type.
pub fn online_servers(results: &ProbeResults, gametype_filter: &str) -> Vec<ServerStatus> {
    let filter = gametype_filter.trim().to_lowercase();
    let mut servers: Vec<ServerStatus> = results
        .values()
        .filter_map(|r| r.status())
        .filter(|s| !s.players.is_empty())
        .filter(|s| filter.is_empty() || s.game_type.to_lowercase().contains(&filter))
        .cloned()
        .collect();
    sort_by_players_desc(&mut servers);
    servers
}

/// Retry count from caller input: used when it parses and is greater than 1,
/// otherwise `default`.
pub fn effective_retries(arg: Option<&str>, default: u32) -> u32 {
    match arg.map(str::trim).and_then(|s| s.parse::<u32>().ok()) {
        Some(r) if r > 1 => r,
        _ => default,
    }
}

/// Remove every registered endpoint that fails to answer in `1 + retries`
/// rounds. Later rounds only re-probe endpoints that have not answered yet.
/// Returns the removed endpoints in canonical string order.
pub async fn prune_unreachable(
    registry: &EndpointRegistry,
    aggregator: &ProbeAggregator,
    timeout: Duration,
    retries: u32,
) -> Vec<Endpoint> {
    let mut answered: HashSet<String> = HashSet::new();
    let mut pending = registry.list();

    for round in 0..=retries {
        if pending.is_empty() {
            break;
        }
        let results = aggregator.probe_all(&pending, timeout).await;
        answered.extend(
            results
                .values()
                .filter(|r| r.is_online())
                .map(|r| r.address().to_string()),
        );
        pending.retain(|e| !answered.contains(&e.to_string()));
        tracing::debug!(round, still_silent = pending.len(), "prune round complete");
    }

    let mut removed = Vec::new();
    for endpoint in registry.sorted_list() {
        // Endpoints added after the first round were never probed; keep them.
        if !pending.contains(&endpoint) {
            continue;
        }
        if registry.remove(&endpoint.to_string()).is_ok() {
            tracing::info!(endpoint = %endpoint, "removed unreachable endpoint");
            removed.push(endpoint);
        }
    }
    removed
}
