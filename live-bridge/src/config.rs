//! Bridge configuration
//!
//! A [`BridgeConfig`] is usually built in code, but can also be read from a
//! JSON file. Every field has a default, so a file only needs the keys it
//! changes:
//!
//! ```json
//! {
//!   "transport": { "reply": { "host": "192.168.1.20", "port": 9001 } },
//!   "clip_position_updates": false
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use osc_transport::{TransportConfig, TransportError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directory under the platform config dir holding `config.json`
pub const CONFIG_DIR_NAME: &str = "liveosc";

/// File name looked up by [`BridgeConfig::load_default`]
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Configuration loading/validation error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Configuration for a [`Bridge`](crate::Bridge)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Listen/reply endpoints and receive buffer
    /// Default: listen 0.0.0.0:9000, reply localhost:9001
    pub transport: TransportConfig,

    /// Send `/live/clip/position` while clips play. These fire on every
    /// position change and dominate outbound traffic.
    /// Default: true
    pub clip_position_updates: bool,

    /// Send `/live/track/meter`, `/live/return/meter` and
    /// `/live/master/meter` as output levels move. Visible tracks without
    /// an audio output are skipped.
    /// Default: true
    pub meter_updates: bool,

    /// Send `/live/beat` whenever the integer beat changes
    /// Default: true
    pub beat_updates: bool,

    /// Send `/remix/oscserver/startup` and `/remix/oscserver/shutdown`
    /// Default: true
    pub startup_announcements: bool,

    /// After every rebuild, push all track and clip names plus the
    /// track-name block
    /// Default: true
    pub refresh_on_rebuild: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            clip_position_updates: true,
            meter_updates: true,
            beat_updates: true,
            startup_announcements: true,
            refresh_on_rebuild: true,
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only value-change notifications: no clip positions, meters, beats
    /// or announcements
    pub fn quiet() -> Self {
        Self {
            clip_position_updates: false,
            meter_updates: false,
            beat_updates: false,
            startup_announcements: false,
            refresh_on_rebuild: false,
            ..Self::default()
        }
    }

    /// Loopback-only sockets; the listen port is picked by the OS
    pub fn loopback(reply_port: u16) -> Self {
        Self {
            transport: TransportConfig::loopback(reply_port),
            ..Self::default()
        }
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.transport.validate()?;
        Ok(())
    }

    /// Read and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        tracing::debug!("Loaded bridge config from {}", path.display());
        Ok(config)
    }

    /// Load `<config dir>/liveosc/config.json`, or defaults if it is absent
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Platform location of the config file, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(io_err)
    }
}
