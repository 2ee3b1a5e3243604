//! teewatchd: game server status daemon.

mod poller;

use std::time::Duration;

use anyhow::Result;

use teewatch_core::config::TeewatchConfig;
use teewatch_services::{expiry_loop, server_list, EndpointRegistry, ProbeAggregator, StatusCache};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = TeewatchConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = TeewatchConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        TeewatchConfig::default()
    });

    let response_timeout = config.probe.response_timeout();
    let cache_ttl = Duration::from_secs(config.cache.ttl_secs);
    tracing::info!(
        response_timeout_ms = response_timeout.as_millis() as u64,
        interval_secs = config.probe.interval_secs,
        max_in_flight = config.probe.max_in_flight,
        "teewatchd starting"
    );

    // Shared state
    let registry = EndpointRegistry::new();
    let list_path = config.registry.server_list_path.clone();
    if list_path.exists() {
        if let Err(e) = server_list::load(&list_path, &registry) {
            tracing::warn!(error = %e, "failed to load server list, starting empty");
        }
    } else {
        tracing::info!(path = %list_path.display(), "no server list yet, starting empty");
    }

    let aggregator = ProbeAggregator::teeworlds().with_max_in_flight(config.probe.max_in_flight);
    let cache = StatusCache::new();

    // Shutdown broadcast
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Background tasks ─────────────────────────────────────────────────────

    let poller_task = match poller::poll_settings(&config) {
        Some(settings) => Some(tokio::spawn(poller::poll_loop(
            registry.clone(),
            aggregator.clone(),
            cache.clone(),
            settings,
            shutdown_tx.subscribe(),
        ))),
        None => {
            tracing::info!("probe.interval_secs is 0, background polling disabled");
            None
        }
    };

    let expiry_task = tokio::spawn(expiry_loop(
        cache.clone(),
        Duration::from_secs(config.cache.sweep_interval_secs.max(1)),
    ));

    // Status HTTP endpoint
    let api_port = config.api.port;
    let api_task = {
        let state = teewatch_api::ApiState {
            registry: registry.clone(),
            aggregator: aggregator.clone(),
            cache: cache.clone(),
            response_timeout,
            cache_ttl,
            prune_retries: config.probe.prune_retries,
            server_list_path: list_path,
            default_gametype_filter: config.api.gametype_filter(),
            shutdown_tx: shutdown_tx.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = teewatch_api::serve(state, api_port).await {
                tracing::error!(error = %e, "API server failed");
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => tracing::info!("shutting down"),
        // Without a poller this pattern never matches and the branch is disabled.
        Some(r) = async {
            match poller_task {
                Some(task) => Some(task.await),
                None => None,
            }
        } => tracing::error!("poller exited: {:?}", r),
        r = expiry_task        => tracing::error!("expiry task exited: {:?}", r),
        r = api_task           => tracing::error!("API server exited: {:?}", r),
    }

    Ok(())
}
