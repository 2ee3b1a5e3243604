//! Status cache: keeps the latest probe result per endpoint for a while.
//!
//! Layered on top of probe rounds: each round's results overwrite the entry
//! for their key and push its expiry forward. Nothing is purged by a round;
//! the separate `expiry_loop` sweep removes stale entries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use teewatch_core::ProbeResult;

use crate::probe::ProbeResults;

/// A cached result and when it stops being listable.
#[derive(Debug, Clone)]
pub struct CachedStatus {
    pub result: ProbeResult,
    pub stored_at: Instant,
    pub expires_at: Instant,
}

impl CachedStatus {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Concurrent cache keyed by endpoint canonical string form.
#[derive(Clone, Default)]
pub struct StatusCache {
    entries: Arc<DashMap<String, CachedStatus>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Store every result of a round, replacing older entries for the same key.
    pub fn store_round(&self, results: ProbeResults, ttl: Duration) {
        let now = Instant::now();
        for (key, result) in results {
            self.store_at(key, result, now, ttl);
        }
    }

    /// Store a single result.
    pub fn store(&self, key: impl Into<String>, result: ProbeResult, ttl: Duration) {
        self.store_at(key.into(), result, Instant::now(), ttl);
    }

    fn store_at(&self, key: String, result: ProbeResult, now: Instant, ttl: Duration) {
        self.entries.insert(
            key,
            CachedStatus {
                result,
                stored_at: now,
                expires_at: now + ttl,
            },
        );
    }

    /// Unexpired result for `key`.
    pub fn get(&self, key: &str) -> Option<ProbeResult> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.result.clone())
    }

    /// Every unexpired result.
    pub fn snapshot(&self) -> ProbeResults {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| !e.value().is_expired(now))
            .map(|e| (e.key().clone(), e.value().result.clone()))
            .collect()
    }

    /// Age of the newest unexpired entry.
    pub fn newest_age(&self) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| !e.value().is_expired(now))
            .map(|e| now.saturating_duration_since(e.value().stored_at))
            .min()
    }

    /// Number of entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn remove(&self, key: &str) -> Option<ProbeResult> {
        self.entries.remove(key).map(|(_, e)| e.result)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Remove cache entries whose expiry has passed.
///
/// Runs forever; cancel by dropping the task handle.
pub async fn expiry_loop(cache: StatusCache, check_interval: Duration) {
    let mut interval = tokio::time::interval(check_interval);

    loop {
        interval.tick().await;

        let removed = cache.purge_expired();
        if removed > 0 {
            tracing::debug!(removed, remaining = cache.len(), "expired cached statuses");
        }
    }
}
