//! teewatch-core: endpoint type, status types, the server-info wire codec
//! and configuration. All other teewatch crates depend on this one.

pub mod config;
pub mod endpoint;
pub mod status;
pub mod wire;

pub use endpoint::{Endpoint, EndpointError};
pub use status::{PlayerInfo, ProbeError, ProbeResult, ServerStatus};
pub use wire::{DecodeError, StatusProtocol, TeeworldsProtocol};
