//! Periodic probe rounds over the registry, stored into the status cache.

use std::time::Duration;

use tokio::sync::broadcast;

use teewatch_core::config::TeewatchConfig;
use teewatch_services::{EndpointRegistry, ProbeAggregator, StatusCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub response_timeout: Duration,
    pub cache_ttl: Duration,
}

/// Poller settings from config. None when `probe.interval_secs` is 0, which
/// disables background rounds.
pub fn poll_settings(config: &TeewatchConfig) -> Option<PollSettings> {
    if config.probe.interval_secs == 0 {
        return None;
    }
    Some(PollSettings {
        interval: Duration::from_secs(config.probe.interval_secs),
        response_timeout: config.probe.response_timeout(),
        cache_ttl: Duration::from_secs(config.cache.ttl_secs),
    })
}

/// Probe the current registry contents once and cache the results.
/// Returns how many endpoints answered.
pub async fn poll_once(
    registry: &EndpointRegistry,
    aggregator: &ProbeAggregator,
    cache: &StatusCache,
    settings: &PollSettings,
) -> usize {
    let endpoints = registry.list();
    if endpoints.is_empty() {
        return 0;
    }

    let results = aggregator
        .probe_all(&endpoints, settings.response_timeout)
        .await;
    let online = results.values().filter(|r| r.is_online()).count();
    tracing::info!(
        endpoints = endpoints.len(),
        online,
        "poll round complete"
    );

    cache.store_round(results, settings.cache_ttl);
    online
}

pub async fn poll_loop(
    registry: EndpointRegistry,
    aggregator: ProbeAggregator,
    cache: StatusCache,
    settings: PollSettings,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(settings.interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("poller shutting down");
                return;
            }

            _ = interval.tick() => {
                poll_once(&registry, &aggregator, &cache, &settings).await;
            }
        }
    }
}
