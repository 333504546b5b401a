//! Configuration for the keyterm host binary.
//!
//! The configuration file is located at `~/.keyterm/config.toml`:
//!
//! ```toml
//! # Print "Setting up terminal..." / "Shutting down..."
//! announce = true
//!
//! [log]
//! level = "info"
//! file = "/tmp/keyterm.log"
//!
//! [input]
//! quit_key = "q"
//! poll_interval_ms = 10
//! ```
//!
//! Every field is optional.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Print status lines on setup and shutdown
    pub announce: bool,
    /// Log settings
    pub log: LogConfig,
    /// Input loop settings
    pub input: InputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            announce: true,
            log: LogConfig::default(),
            input: InputConfig::default(),
        }
    }
}

/// Log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. "info" or "keyterm=debug"
    pub level: String,
    /// Log file; defaults to `~/.keyterm/keyterm.log`
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Input loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub quit_key: String,
    pub poll_interval_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            quit_key: "q".to_string(),
            poll_interval_ms: 10,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// defaults when it is missing or invalid
    pub fn load() -> Self {
        Self::get_config_path()
            .and_then(|path| Self::load_from(&path).ok())
            .unwrap_or_default()
    }

    /// Load configuration from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Get config file path
    pub fn get_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Log file path
    pub fn log_path(&self) -> PathBuf {
        if let Some(ref file) = self.log.file {
            return file.clone();
        }
        config_dir()
            .map(|dir| dir.join("keyterm.log"))
            .unwrap_or_else(|| PathBuf::from("keyterm.log"))
    }

    /// Byte that ends the input loop, if the quit key is a single ASCII
    /// character
    pub fn quit_byte(&self) -> Option<u8> {
        let mut chars = self.input.quit_key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => Some(c as u8),
            _ => None,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.input.poll_interval_ms)
    }
}

fn config_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".keyterm"))
}

/// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
