use std::time::{Duration, Instant};

use crate::*;
use teewatch_core::{ProbeError, ProbeResult};
use teewatch_services::{online_servers, round_summary, EndpointRegistry, ProbeAggregator, StatusCache};

/// Registry → probe round → cache, with every kind of endpoint in one round.
#[tokio::test]
async fn test_round_covers_every_registered_endpoint() {
    let busy = spawn_fake(Behaviour::Respond(server_status("busy", "CTF", 6))).await;
    let idle = spawn_fake(Behaviour::Respond(server_status("idle", "DM", 0))).await;
    let silent = spawn_fake(Behaviour::Silent).await;
    let junk = spawn_fake(Behaviour::Garbage).await;

    let registry = EndpointRegistry::new();
    for fake in [&busy, &idle, &silent, &junk] {
        registry.add(&fake.address).unwrap();
    }

    let timeout = Duration::from_millis(300);
    let started = Instant::now();
    let results = ProbeAggregator::teeworlds()
        .probe_all(&registry.list(), timeout)
        .await;
    let elapsed = started.elapsed();

    assert_eq!(results.len(), 4);
    assert!(elapsed < timeout * 2, "round took {elapsed:?}");

    let busy_status = results[&busy.address].status().expect("busy answers");
    assert_eq!(busy_status.address, busy.address);
    assert_eq!(busy_status.players.len(), 6);
    assert_eq!(busy_status.players[1].clan, "[it]");

    assert_eq!(
        results[&silent.address],
        ProbeResult::unreachable(silent.address.clone(), ProbeError::Timeout)
    );
    assert!(matches!(
        results[&junk.address],
        ProbeResult::Unreachable {
            reason: ProbeError::Parse(_),
            ..
        }
    ));

    let summary = round_summary(&results);
    let online: Vec<&str> = summary.online.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(online, ["busy", "idle"]);
    let mut expected = vec![silent.address.clone(), junk.address.clone()];
    expected.sort();
    assert_eq!(summary.unreachable, expected);

    let populated = online_servers(&results, "");
    assert_eq!(populated.len(), 1);
    assert_eq!(populated[0].name, "busy");

    let cache = StatusCache::new();
    cache.store_round(results, Duration::from_secs(60));
    assert_eq!(cache.snapshot().len(), 4);
    assert!(cache.get(&idle.address).unwrap().is_online());
}

/// Each endpoint receives exactly one request per round.
#[tokio::test]
async fn test_one_request_per_endpoint_per_round() {
    let fakes = [
        spawn_fake(Behaviour::Respond(server_status("a", "DM", 1))).await,
        spawn_fake(Behaviour::Silent).await,
    ];
    let registry = EndpointRegistry::new();
    for fake in &fakes {
        registry.add(&fake.address).unwrap();
    }

    let aggregator = ProbeAggregator::teeworlds();
    for _ in 0..2 {
        aggregator
            .probe_all(&registry.list(), Duration::from_millis(150))
            .await;
    }

    for fake in &fakes {
        assert_eq!(fake.requests(), 2, "{} saw the wrong request count", fake.address);
    }
}

/// Many silent endpoints still cost about one timeout, not one each.
#[tokio::test]
async fn test_silent_endpoints_do_not_serialise() {
    let registry = EndpointRegistry::new();
    let mut fakes = Vec::new();
    for _ in 0..20 {
        let fake = spawn_fake(Behaviour::Silent).await;
        registry.add(&fake.address).unwrap();
        fakes.push(fake);
    }

    let timeout = Duration::from_millis(250);
    let started = Instant::now();
    let results = ProbeAggregator::teeworlds()
        .probe_all(&registry.list(), timeout)
        .await;

    assert_eq!(results.len(), 20);
    assert!(results.values().all(|r| !r.is_online()));
    assert!(started.elapsed() < timeout * 2);
}

/// Mutating the registry during a round does not disturb that round.
#[tokio::test]
async fn test_registry_changes_during_round_are_isolated() {
    let first = spawn_fake(Behaviour::Respond(server_status("first", "DM", 1))).await;
    let late = spawn_fake(Behaviour::Respond(server_status("late", "DM", 1))).await;

    let registry = EndpointRegistry::new();
    registry.add(&first.address).unwrap();
    let snapshot = registry.list();

    let aggregator = ProbeAggregator::teeworlds();
    let round = tokio::spawn({
        let aggregator = aggregator.clone();
        async move { aggregator.probe_all(&snapshot, Duration::from_millis(300)).await }
    });
    registry.add(&late.address).unwrap();
    registry.remove(&first.address).unwrap();

    let results = round.await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[&first.address].is_online());
    assert_eq!(late.requests(), 0);
}
