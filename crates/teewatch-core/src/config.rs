//! Configuration system for teewatch.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $TEEWATCH_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/teewatch/config.toml
//!   3. ~/.config/teewatch/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Response timeout used when none (or a too-small one) is configured.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 500;

/// Smallest response timeout accepted from config.
pub const MIN_RESPONSE_TIMEOUT_MS: u64 = 5;

/// Extra probe rounds used by prune when the caller gives no usable count.
pub const DEFAULT_PRUNE_RETRIES: u32 = 3;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeewatchConfig {
    pub probe: ProbeConfig,
    pub registry: RegistryConfig,
    pub cache: CacheConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Per-endpoint response timeout. Values below 5 fall back to 500.
    pub response_timeout_ms: u64,
    /// Seconds between background probe rounds. 0 = no background polling.
    pub interval_secs: u64,
    /// Max probes in flight per round. 0 = one task per endpoint, uncapped.
    pub max_in_flight: usize,
    /// Extra rounds run by prune before an endpoint counts as dead.
    pub prune_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Server list file, one `<ip>:<port>` per line.
    pub server_list_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a probe result stays listable after its round.
    pub ttl_secs: u64,
    /// Seconds between expiry sweeps.
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Local HTTP API port.
    pub port: u16,
    /// Game type substring applied by `online` when the caller gives none.
    pub default_gametype_filter: String,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            interval_secs: 30,
            max_in_flight: 0,
            prune_retries: DEFAULT_PRUNE_RETRIES,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            server_list_path: data_dir().join("servers.txt"),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 90,
            sweep_interval_secs: 5,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 9310,
            default_gametype_filter: String::new(),
        }
    }
}

impl ProbeConfig {
    /// Effective per-endpoint timeout.
    pub fn response_timeout(&self) -> Duration {
        let ms = if self.response_timeout_ms < MIN_RESPONSE_TIMEOUT_MS {
            DEFAULT_RESPONSE_TIMEOUT_MS
        } else {
            self.response_timeout_ms
        };
        Duration::from_millis(ms)
    }
}

impl ApiConfig {
    /// Filter normalised the way `online` compares game types.
    pub fn gametype_filter(&self) -> String {
        self.default_gametype_filter.trim().to_lowercase()
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("teewatch")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("teewatch")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl TeewatchConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path, then apply env overrides.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            Self::from_toml(path, &text)?
        } else {
            TeewatchConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn from_toml(path: &std::path::Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("TEEWATCH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&TeewatchConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply TEEWATCH_* env var overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(p) = var("TEEWATCH_PROBE__RESPONSE_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.probe.response_timeout_ms = p;
        }
        if let Some(p) = var("TEEWATCH_PROBE__INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.probe.interval_secs = p;
        }
        if let Some(p) = var("TEEWATCH_PROBE__MAX_IN_FLIGHT").and_then(|v| v.parse().ok()) {
            self.probe.max_in_flight = p;
        }
        if let Some(p) = var("TEEWATCH_PROBE__PRUNE_RETRIES").and_then(|v| v.parse().ok()) {
            self.probe.prune_retries = p;
        }
        if let Some(v) = var("TEEWATCH_REGISTRY__SERVER_LIST_PATH") {
            self.registry.server_list_path = PathBuf::from(v);
        }
        if let Some(p) = var("TEEWATCH_CACHE__TTL_SECS").and_then(|v| v.parse().ok()) {
            self.cache.ttl_secs = p;
        }
        if let Some(p) = var("TEEWATCH_CACHE__SWEEP_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.cache.sweep_interval_secs = p;
        }
        if let Some(p) = var("TEEWATCH_API__PORT").and_then(|v| v.parse().ok()) {
            self.api.port = p;
        }
        if let Some(v) = var("TEEWATCH_API__DEFAULT_GAMETYPE_FILTER") {
            self.api.default_gametype_filter = v;
        }
    }
}
