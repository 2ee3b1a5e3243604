//! teewatch-services: endpoint registry, probe aggregator, result cache,
//! server-list persistence and browse helpers.

pub mod browse;
pub mod cache;
pub mod probe;
pub mod registry;
pub mod server_list;

pub use browse::{effective_retries, online_servers, prune_unreachable, round_summary, RoundSummary};
pub use cache::{expiry_loop, CachedStatus, StatusCache};
pub use probe::{ProbeAggregator, ProbeResults};
pub use registry::{EndpointRegistry, RegistryError};
