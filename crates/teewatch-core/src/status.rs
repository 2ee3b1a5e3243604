//! Server status records and per-endpoint probe outcomes.

use serde::{Deserialize, Serialize};

use crate::wire::DecodeError;

/// One connected client as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    pub clan: String,
    /// ISO 3166-1 numeric country code, -1 when unset.
    pub country: i32,
    pub score: i32,
    /// False for spectators.
    pub is_player: bool,
}

/// Decoded server-info response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Canonical string form of the endpoint that answered.
    pub address: String,
    pub version: String,
    pub name: String,
    pub map: String,
    pub game_type: String,
    pub flags: u32,
    pub num_players: u32,
    pub max_players: u32,
    pub num_clients: u32,
    pub max_clients: u32,
    pub players: Vec<PlayerInfo>,
}

impl ServerStatus {
    /// Whether the server reports a password requirement (flag bit 0).
    pub fn has_password(&self) -> bool {
        self.flags & 0x1 != 0
    }
}

/// Why a probe produced no status. Recorded in the result map, never
/// propagated out of a probe round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProbeError {
    #[error("no response within timeout")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("malformed response: {0}")]
    Parse(String),
}

impl From<DecodeError> for ProbeError {
    fn from(e: DecodeError) -> Self {
        ProbeError::Parse(e.to_string())
    }
}

/// Outcome of probing one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProbeResult {
    Online(ServerStatus),
    /// Failure marker: the endpoint did not answer usefully this round.
    Unreachable { address: String, reason: ProbeError },
}

impl ProbeResult {
    pub fn unreachable(address: impl Into<String>, reason: ProbeError) -> Self {
        ProbeResult::Unreachable {
            address: address.into(),
            reason,
        }
    }

    /// Canonical string form of the probed endpoint.
    pub fn address(&self) -> &str {
        match self {
            ProbeResult::Online(status) => &status.address,
            ProbeResult::Unreachable { address, .. } => address,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, ProbeResult::Online(_))
    }

    pub fn status(&self) -> Option<&ServerStatus> {
        match self {
            ProbeResult::Online(status) => Some(status),
            ProbeResult::Unreachable { .. } => None,
        }
    }
}
