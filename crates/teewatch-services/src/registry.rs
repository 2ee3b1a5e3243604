//! Endpoint registry: the set of servers teewatch is allowed to probe.
//!
//! An insertion-ordered set behind a single mutex. Every operation holds the
//! lock only for its own critical section; `list` and `sorted_list` copy the
//! contents out before releasing it, so callers iterate without a lock and
//! never observe later mutations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexSet;
use teewatch_core::endpoint::{EndpointError, RESERVED_PORT_MAX};
use teewatch_core::Endpoint;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid address format: {0:?}")]
    InvalidFormat(String),

    #[error("invalid IP format: {0:?}")]
    InvalidIp(String),

    #[error("invalid port {0:?}: port should be bigger than {}", RESERVED_PORT_MAX)]
    InvalidPort(String),

    #[error("server address already exists: {0}")]
    Duplicate(Endpoint),

    #[error("server address not found: {0}")]
    NotFound(Endpoint),
}

impl From<EndpointError> for RegistryError {
    fn from(e: EndpointError) -> Self {
        match e {
            EndpointError::InvalidFormat(s) => RegistryError::InvalidFormat(s),
            EndpointError::InvalidIp(s) => RegistryError::InvalidIp(s),
            EndpointError::InvalidPort(s) => RegistryError::InvalidPort(s),
        }
    }
}

/// Thread-safe set of validated, unique endpoints. Cloning shares the set.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    entries: Arc<Mutex<IndexSet<Endpoint>>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(IndexSet::with_capacity(capacity))),
        }
    }

    // A panic while holding the lock cannot leave the set half-updated, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, IndexSet<Endpoint>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parse `text` and add it. Fails on invalid input or a duplicate.
    pub fn add(&self, text: &str) -> Result<Endpoint, RegistryError> {
        let endpoint = Endpoint::parse(text)?;
        self.insert(endpoint)?;
        Ok(endpoint)
    }

    /// Add an already-validated endpoint.
    pub fn insert(&self, endpoint: Endpoint) -> Result<(), RegistryError> {
        if !self.lock().insert(endpoint) {
            return Err(RegistryError::Duplicate(endpoint));
        }
        tracing::debug!(endpoint = %endpoint, "endpoint registered");
        Ok(())
    }

    /// Parse `text` and remove the matching endpoint.
    pub fn remove(&self, text: &str) -> Result<Endpoint, RegistryError> {
        let endpoint = Endpoint::parse(text)?;
        if !self.lock().shift_remove(&endpoint) {
            return Err(RegistryError::NotFound(endpoint));
        }
        tracing::debug!(endpoint = %endpoint, "endpoint removed");
        Ok(endpoint)
    }

    pub fn contains(&self, endpoint: &Endpoint) -> bool {
        self.lock().contains(endpoint)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Point-in-time copy in insertion order.
    pub fn list(&self) -> Vec<Endpoint> {
        self.lock().iter().copied().collect()
    }

    /// `list()` sorted ascending by canonical string form.
    pub fn sorted_list(&self) -> Vec<Endpoint> {
        let mut list = self.list();
        list.sort_by_cached_key(|e| e.to_string());
        list
    }

    /// Replace the whole contents with `other`'s in one critical section, so
    /// no reader sees a partial set. Returns the endpoints that were dropped.
    pub fn replace_with(&self, other: &EndpointRegistry) -> Vec<Endpoint> {
        let incoming: IndexSet<Endpoint> = other.list().into_iter().collect();
        let mut entries = self.lock();
        let dropped = entries
            .iter()
            .filter(|e| !incoming.contains(*e))
            .copied()
            .collect();
        *entries = incoming;
        dropped
    }

    /// Remove every endpoint. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let removed = entries.len();
        entries.clear();
        removed
    }
}
