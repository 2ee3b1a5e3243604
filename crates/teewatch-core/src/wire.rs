//! Server-info wire format (Teeworlds 0.6 connectionless exchange).
//!
//! Request (15 bytes):
//!   ff ff ff ff ff ff            connless packet header
//!   ff ff ff ff 'g' 'i' 'e' '3'  get-info marker
//!   <token>                      one byte, echoed back as a decimal string
//!
//! Response:
//!   ff ff ff ff ff ff            connless packet header
//!   ff ff ff ff 'i' 'n' 'f' '3'  info marker
//!   NUL-terminated fields: token, version, name, map, game type, flags,
//!   num players, max players, num clients, max clients, then per client:
//!   name, clan, country, score, is-player.
//!
//! The probe layer only depends on the [`StatusProtocol`] trait; this module
//! provides the Teeworlds implementation of it.

use crate::status::{PlayerInfo, ServerStatus};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Connectionless packet header.
pub const CONNLESS_HEADER: [u8; 6] = [0xff; 6];

/// Get-info request marker.
pub const GETINFO: [u8; 8] = *b"\xff\xff\xff\xffgie3";

/// Info response marker.
pub const INFO: [u8; 8] = *b"\xff\xff\xff\xffinf3";

/// Header + marker, the fixed prefix of both directions.
pub const PREFIX_LEN: usize = CONNLESS_HEADER.len() + GETINFO.len();

/// Receive buffer size for a single response datagram.
pub const MAX_DATAGRAM: usize = 2048;

/// Upper bound on client entries read from a single response.
pub const MAX_CLIENTS: usize = 64;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting a response datagram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("datagram too short: {0} bytes")]
    TooShort(usize),

    #[error("not a server-info response")]
    BadHeader,

    #[error("token mismatch: expected {expected}, got {got:?}")]
    TokenMismatch { expected: u8, got: String },

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("field {field} is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

// ── Protocol seam ─────────────────────────────────────────────────────────────

/// The two operations a probe needs from a status protocol.
pub trait StatusProtocol: Send + Sync {
    /// Bytes of a single status request datagram.
    fn request(&self) -> Vec<u8>;

    /// Decode a single response datagram received from `address`.
    fn decode(&self, address: &str, datagram: &[u8]) -> Result<ServerStatus, DecodeError>;
}

/// Teeworlds 0.6 server-info protocol with a per-instance request token.
#[derive(Debug, Clone, Copy)]
pub struct TeeworldsProtocol {
    token: u8,
}

impl Default for TeeworldsProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl TeeworldsProtocol {
    /// Protocol instance with a random token.
    pub fn new() -> Self {
        Self {
            token: rand::random(),
        }
    }

    pub fn with_token(token: u8) -> Self {
        Self { token }
    }

    pub fn token(&self) -> u8 {
        self.token
    }
}

impl StatusProtocol for TeeworldsProtocol {
    fn request(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PREFIX_LEN + 1);
        buf.extend_from_slice(&CONNLESS_HEADER);
        buf.extend_from_slice(&GETINFO);
        buf.push(self.token);
        buf
    }

    fn decode(&self, address: &str, datagram: &[u8]) -> Result<ServerStatus, DecodeError> {
        if datagram.len() < PREFIX_LEN {
            return Err(DecodeError::TooShort(datagram.len()));
        }
        if datagram[..CONNLESS_HEADER.len()] != CONNLESS_HEADER
            || datagram[CONNLESS_HEADER.len()..PREFIX_LEN] != INFO
        {
            return Err(DecodeError::BadHeader);
        }

        let mut fields = Fields::new(&datagram[PREFIX_LEN..]);

        let token = fields.text("token")?;
        if token.trim().parse::<i64>().ok() != Some(i64::from(self.token)) {
            return Err(DecodeError::TokenMismatch {
                expected: self.token,
                got: token,
            });
        }

        let version = fields.text("version")?;
        let name = fields.text("name")?;
        let map = fields.text("map")?;
        let game_type = fields.text("game_type")?;
        let flags = fields.number("flags")?;
        let num_players = fields.number("num_players")?;
        let max_players = fields.number("max_players")?;
        let num_clients: u32 = fields.number("num_clients")?;
        let max_clients = fields.number("max_clients")?;

        let expected = (num_clients as usize).min(MAX_CLIENTS);
        let mut players = Vec::with_capacity(expected);
        // Truncated client lists are accepted; a half-written entry is not.
        while players.len() < expected && !fields.is_empty() {
            players.push(PlayerInfo {
                name: fields.text("client.name")?,
                clan: fields.text("client.clan")?,
                country: fields.number("client.country")?,
                score: fields.number("client.score")?,
                is_player: fields.number::<i32>("client.is_player")? != 0,
            });
        }

        Ok(ServerStatus {
            address: address.to_string(),
            version,
            name,
            map,
            game_type,
            flags,
            num_players,
            max_players,
            num_clients,
            max_clients,
            players,
        })
    }
}

// ── Encoding helpers ──────────────────────────────────────────────────────────

/// Extract the token from a get-info request, if `datagram` is one.
pub fn request_token(datagram: &[u8]) -> Option<u8> {
    if datagram.len() != PREFIX_LEN + 1
        || datagram[..CONNLESS_HEADER.len()] != CONNLESS_HEADER
        || datagram[CONNLESS_HEADER.len()..PREFIX_LEN] != GETINFO
    {
        return None;
    }
    Some(datagram[PREFIX_LEN])
}

/// Encode an info response for `status`, answering a request with `token`.
pub fn encode_response(token: u8, status: &ServerStatus) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    buf.extend_from_slice(&CONNLESS_HEADER);
    buf.extend_from_slice(&INFO);

    let mut push = |field: &str| {
        buf.extend_from_slice(field.as_bytes());
        buf.push(0);
    };
    push(&token.to_string());
    push(&status.version);
    push(&status.name);
    push(&status.map);
    push(&status.game_type);
    push(&status.flags.to_string());
    push(&status.num_players.to_string());
    push(&status.max_players.to_string());
    push(&status.num_clients.to_string());
    push(&status.max_clients.to_string());
    for p in &status.players {
        push(&p.name);
        push(&p.clan);
        push(&p.country.to_string());
        push(&p.score.to_string());
        push(if p.is_player { "1" } else { "0" });
    }
    buf
}

// ── Field reader ──────────────────────────────────────────────────────────────

struct Fields<'a> {
    rest: &'a [u8],
}

impl<'a> Fields<'a> {
    fn new(rest: &'a [u8]) -> Self {
        Self { rest }
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    fn text(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let end = self
            .rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(DecodeError::MissingField(field))?;
        let value = String::from_utf8_lossy(&self.rest[..end]).into_owned();
        self.rest = &self.rest[end + 1..];
        Ok(value)
    }

    fn number<T: std::str::FromStr>(&mut self, field: &'static str) -> Result<T, DecodeError> {
        let value = self.text(field)?;
        value
            .trim()
            .parse()
            .map_err(|_| DecodeError::InvalidNumber { field, value })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
