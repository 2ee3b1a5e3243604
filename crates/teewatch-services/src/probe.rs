//! Probe aggregator: fans one status probe out per endpoint and joins them.
//!
//! Each probe runs in its own tokio task on an ephemeral UDP socket: send one
//! request datagram, wait for one response, bounded by the round timeout. A
//! round therefore costs roughly one timeout regardless of how many endpoints
//! are silent. Failures never escape a round; they are recorded as
//! `ProbeResult::Unreachable` under the endpoint's key.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;

use teewatch_core::wire::MAX_DATAGRAM;
use teewatch_core::{Endpoint, ProbeError, ProbeResult, StatusProtocol, TeeworldsProtocol};

/// Results of one round, keyed by endpoint canonical string form.
pub type ProbeResults = HashMap<String, ProbeResult>;

/// Issues concurrent status probes. Cheap to clone; clones share the
/// protocol and the in-flight limit.
#[derive(Clone)]
pub struct ProbeAggregator {
    protocol: Arc<dyn StatusProtocol>,
    /// Optional cap on simultaneous probes. None = one task per endpoint.
    limit: Option<Arc<Semaphore>>,
}

impl ProbeAggregator {
    pub fn new(protocol: Arc<dyn StatusProtocol>) -> Self {
        Self {
            protocol,
            limit: None,
        }
    }

    /// Aggregator speaking the Teeworlds server-info protocol.
    pub fn teeworlds() -> Self {
        Self::new(Arc::new(TeeworldsProtocol::new()))
    }

    /// Cap simultaneous probes at `max`. 0 removes the cap.
    ///
    /// With a cap, a round over N endpoints can take up to
    /// ceil(N / max) timeouts instead of one.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.limit = (max > 0).then(|| Arc::new(Semaphore::new(max)));
        self
    }

    /// Probe every endpoint concurrently and return once all have finished.
    ///
    /// The returned map has exactly one entry per distinct input endpoint.
    pub async fn probe_all(&self, endpoints: &[Endpoint], timeout: Duration) -> ProbeResults {
        let mut results = ProbeResults::with_capacity(endpoints.len());
        if endpoints.is_empty() {
            return results;
        }

        let started = Instant::now();
        let mut handles = Vec::with_capacity(endpoints.len());

        for &endpoint in endpoints {
            let protocol = self.protocol.clone();
            let limit = self.limit.clone();
            handles.push((
                endpoint,
                tokio::spawn(async move {
                    // Held until the probe returns; a closed semaphore means no cap.
                    let _permit = match limit {
                        Some(sem) => sem.acquire_owned().await.ok(),
                        None => None,
                    };
                    probe_one(protocol.as_ref(), endpoint, timeout).await
                }),
            ));
        }

        for (endpoint, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(endpoint = %endpoint, error = %e, "probe task failed");
                    ProbeResult::unreachable(
                        endpoint.to_string(),
                        ProbeError::Connect(format!("probe task failed: {e}")),
                    )
                }
            };
            results.insert(endpoint.to_string(), result);
        }

        let online = results.values().filter(|r| r.is_online()).count();
        tracing::debug!(
            endpoints = results.len(),
            online,
            unreachable = results.len() - online,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "probe round complete"
        );

        results
    }
}

/// Probe a single endpoint. Never fails; failures become failure markers.
pub async fn probe_one(
    protocol: &dyn StatusProtocol,
    endpoint: Endpoint,
    timeout: Duration,
) -> ProbeResult {
    let address = endpoint.to_string();

    let datagram = match tokio::time::timeout(timeout, exchange(protocol, endpoint)).await {
        Ok(Ok(datagram)) => datagram,
        Ok(Err(reason)) => {
            tracing::trace!(endpoint = %address, error = %reason, "probe failed");
            return ProbeResult::unreachable(address, reason);
        }
        Err(_) => {
            tracing::trace!(endpoint = %address, "probe timed out");
            return ProbeResult::unreachable(address, ProbeError::Timeout);
        }
    };

    match protocol.decode(&address, &datagram) {
        Ok(status) => ProbeResult::Online(status),
        Err(e) => {
            tracing::debug!(endpoint = %address, error = %e, "malformed status response");
            ProbeResult::unreachable(address, e.into())
        }
    }
}

/// One request/response exchange. The socket is dropped on every exit path,
/// including when the surrounding timeout cancels this future.
async fn exchange(
    protocol: &dyn StatusProtocol,
    endpoint: Endpoint,
) -> Result<Vec<u8>, ProbeError> {
    let connect_err = |e: std::io::Error| ProbeError::Connect(e.to_string());

    let socket = make_probe_socket(endpoint).map_err(connect_err)?;
    socket.connect(endpoint.addr()).await.map_err(connect_err)?;
    socket
        .send(&protocol.request())
        .await
        .map_err(connect_err)?;

    let mut buf = vec![0u8; MAX_DATAGRAM];
    let len = socket.recv(&mut buf).await.map_err(connect_err)?;
    buf.truncate(len);
    Ok(buf)
}

/// Create an unconnected, non-blocking UDP socket of the endpoint's family
/// bound to an ephemeral port.
fn make_probe_socket(endpoint: Endpoint) -> std::io::Result<UdpSocket> {
    let (domain, bind_addr) = if endpoint.is_ipv6() {
        (
            Domain::IPV6,
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        )
    } else {
        (Domain::IPV4, SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_recv_buffer_size(MAX_DATAGRAM)?;
    socket.set_nonblocking(true)?;
    socket.bind(&bind_addr.into())?;

    UdpSocket::from_std(socket.into())
}
