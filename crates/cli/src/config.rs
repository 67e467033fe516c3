//! Configuration loading from sendauthz.toml.

use serde::Deserialize;
use sim::SimConfig;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Path of the grant database. Defaults to the platform data directory.
    pub database: Option<PathBuf>,

    /// Gas budget for each `exec`.
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,

    /// Parameters for `simulate`.
    #[serde(default)]
    pub simulation: SimConfig,
}

fn default_gas_limit() -> u64 {
    200_000
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Create a default configuration.
    pub fn default_config() -> Self {
        Self {
            database: None,
            gas_limit: default_gas_limit(),
            simulation: SimConfig::default(),
        }
    }

    /// Where the grant database lives.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => dirs_data_dir()
                .map(|dir| dir.join("grants.db"))
                .ok_or(ConfigError::NoDataDir),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("no data directory on this platform: set `database` in the config")]
    NoDataDir,
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/sendauthz"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("sendauthz"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("sendauthz"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
