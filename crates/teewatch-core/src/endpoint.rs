//! Endpoint: a validated game-server address (IP + UDP port).
//!
//! Accepted text form: `<ip>:<port>`, surrounding whitespace ignored. IPv6
//! addresses may be bracketed (`[::1]:8303`) or bare, in which case the last
//! colon separates the port.
//!
//! Validation is two-stage. Only the `<address>:<port>` shape decides
//! `InvalidFormat`; the address charset and its 7 to 40 character length are
//! checked afterwards and fail as `InvalidIp`. So a too-short address such as
//! `1.1.1:8303` or `::1:8303` is `InvalidIp`, not `InvalidFormat`, the same
//! as `not-an-ip:8303`.
//!
//! The canonical string form is the `SocketAddr` rendering (`1.2.3.4:8303`,
//! `[2001:db8::1]:8303`). It is used for equality, sorting and result keys.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ports at or below this value are reserved and rejected.
pub const RESERVED_PORT_MAX: u16 = 1024;

/// `<address>:<port>` with an optionally bracketed address.
static ENDPOINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\[([^\]]+)\]|([^\[\]\s]+)):(\d+)$").expect("endpoint pattern is valid")
});

/// Characters and length an address may have before IP parsing is attempted.
static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-fA-F0-9:.]{7,40}$").expect("address pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("invalid address format: {0:?}")]
    InvalidFormat(String),

    #[error("invalid IP format: {0:?}")]
    InvalidIp(String),

    #[error("invalid port {0:?}: port should be bigger than {}", RESERVED_PORT_MAX)]
    InvalidPort(String),
}

/// A probeable server address.
///
/// IPv4-mapped IPv6 addresses are folded to plain IPv4 on parse, so two
/// endpoints are equal exactly when their canonical string forms are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint(SocketAddr);

impl Endpoint {
    /// Parse and validate endpoint text.
    pub fn parse(text: &str) -> Result<Self, EndpointError> {
        let text = text.trim();
        let caps = ENDPOINT_RE
            .captures(text)
            .ok_or_else(|| EndpointError::InvalidFormat(text.to_string()))?;

        let address = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .ok_or_else(|| EndpointError::InvalidFormat(text.to_string()))?;
        let port = caps
            .get(3)
            .map(|m| m.as_str())
            .ok_or_else(|| EndpointError::InvalidFormat(text.to_string()))?;

        if !ADDRESS_RE.is_match(address) {
            return Err(EndpointError::InvalidIp(address.to_string()));
        }
        let ip = IpAddr::from_str(address)
            .map_err(|_| EndpointError::InvalidIp(address.to_string()))?
            .to_canonical();

        let port_num: u16 = port
            .parse()
            .map_err(|_| EndpointError::InvalidPort(port.to_string()))?;
        if port_num <= RESERVED_PORT_MAX {
            return Err(EndpointError::InvalidPort(port.to_string()));
        }

        Ok(Self(SocketAddr::new(ip, port_num)))
    }

    pub fn addr(&self) -> SocketAddr {
        self.0
    }

    pub fn ip(&self) -> IpAddr {
        self.0.ip()
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }

    pub fn is_ipv6(&self) -> bool {
        self.0.is_ipv6()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Endpoint> for SocketAddr {
    fn from(e: Endpoint) -> SocketAddr {
        e.0
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Endpoint::parse(&text).map_err(serde::de::Error::custom)
    }
}
