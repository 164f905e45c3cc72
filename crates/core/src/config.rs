//! Configuration for a Parlay group
//!
//! Resolution order: explicit path → `$PARLAY_CONFIG` → platform config
//! directory (`config.toml`) → built-in defaults.
//!
//! Every field is optional in the file; missing sections fall back to their
//! defaults.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::PeerId;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "PARLAY_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParlayConfig {
    pub transport: TransportConfig,
    pub runtime: RuntimeConfig,
    pub channel: ChannelConfig,
}

/// Inter-process transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Host every rank listens on
    pub host: String,
    /// Rank `r` listens on `base_port + r`
    pub base_port: u16,
    /// Delay between connect attempts of an outbound link
    pub connect_retry_ms: u64,
    /// Connect attempts before a link gives up and drops its queue
    pub connect_attempts: u32,
}

/// Event loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Bounded wait on the client channel, and coordinator idle sleep
    pub poll_interval_ms: u64,
}

/// Client channel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Directory holding the per-rank FIFOs
    pub fifo_dir: PathBuf,
    /// Delay between attempts while a peer waits for its client
    pub connect_retry_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            base_port: 47100,
            connect_retry_ms: 100,
            connect_attempts: 300,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            fifo_dir: std::env::temp_dir(),
            connect_retry_ms: 500,
        }
    }
}

impl ParlayConfig {
    /// Resolve and load the configuration.
    ///
    /// An explicitly named file must exist. The default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&raw)?;
        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.transport.host.trim().is_empty() {
            return Err(Error::Config("transport.host must not be empty".into()));
        }
        if self.transport.connect_attempts == 0 {
            return Err(Error::Config(
                "transport.connect_attempts must be at least 1".into(),
            ));
        }
        if self.runtime.poll_interval_ms == 0 {
            return Err(Error::Config(
                "runtime.poll_interval_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.runtime.poll_interval_ms)
    }
}

impl TransportConfig {
    /// Listening address of `rank`
    pub fn addr_of(&self, rank: PeerId) -> Result<SocketAddr> {
        let port = u32::from(self.base_port) + rank.0;
        let port = u16::try_from(port)
            .map_err(|_| Error::Config(format!("port for rank {} exceeds 65535", rank)))?;

        (self.host.as_str(), port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::Config(format!("host '{}' did not resolve", self.host)))
    }

    /// Listening addresses of every rank in a group of `size`
    pub fn group_addrs(&self, size: usize) -> Result<Vec<SocketAddr>> {
        (0..size as u32).map(|r| self.addr_of(PeerId(r))).collect()
    }

    pub fn connect_retry(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }
}

impl ChannelConfig {
    pub fn connect_retry(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }
}

/// Platform config file location, if a home directory can be determined
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "onyx", "parlay").map(|dirs| dirs.config_dir().join("config.toml"))
}
