use std::time::Duration;

use crate::*;
use teewatch_services::{effective_retries, prune_unreachable, EndpointRegistry, ProbeAggregator};

/// A server that misses the first round but answers a retry survives.
#[tokio::test]
async fn test_prune_keeps_late_answerers() {
    let steady = spawn_fake(Behaviour::Respond(server_status("steady", "DM", 2))).await;
    let late = spawn_fake(Behaviour::RespondAfter(1, server_status("late", "DM", 0))).await;
    let dead = spawn_fake(Behaviour::Silent).await;

    let registry = EndpointRegistry::new();
    for fake in [&steady, &late, &dead] {
        registry.add(&fake.address).unwrap();
    }

    let removed = prune_unreachable(
        &registry,
        &ProbeAggregator::teeworlds(),
        Duration::from_millis(150),
        effective_retries(Some("2"), 3),
    )
    .await;

    let removed: Vec<String> = removed.iter().map(|e| e.to_string()).collect();
    assert_eq!(removed, [dead.address.clone()]);
    assert_eq!(registry.len(), 2);

    // one initial round plus two retries for the endpoint that never answered
    assert_eq!(dead.requests(), 3);
    // answered endpoints are not probed again
    assert_eq!(steady.requests(), 1);
    assert_eq!(late.requests(), 2);
}

/// Removed endpoints come back in canonical string order.
#[tokio::test]
async fn test_prune_reports_removed_sorted() {
    let registry = EndpointRegistry::new();
    let mut addresses = Vec::new();
    for _ in 0..4 {
        let fake = spawn_fake(Behaviour::Silent).await;
        registry.add(&fake.address).unwrap();
        addresses.push(fake.address);
    }
    addresses.sort();

    let removed = prune_unreachable(
        &registry,
        &ProbeAggregator::teeworlds(),
        Duration::from_millis(100),
        0,
    )
    .await;

    let removed: Vec<String> = removed.iter().map(|e| e.to_string()).collect();
    assert_eq!(removed, addresses);
    assert!(registry.is_empty());
}
