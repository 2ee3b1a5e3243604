//! CLI command modules.

pub mod endpoints;
pub mod http;
pub mod servers;
pub mod status;
