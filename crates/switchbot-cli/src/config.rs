//! Configuration file management.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use switchbot_core::normalize_address;
use tracing::warn;

use crate::cli::OutputFormat;

/// Connection timeout used when neither flag nor config sets one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default connection timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Default retry count
    #[serde(default)]
    pub max_retry: Option<u32>,

    /// Default output format ("table" or "json")
    #[serde(default)]
    pub format: Option<String>,

    /// Passwords keyed by Bot address
    #[serde(default)]
    pub passwords: HashMap<String, String>,

    /// Bot aliases (friendly name -> address)
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Config {
    /// Get the default config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("switchbot")
            .join("config.toml")
    }

    /// Load config from `path` (or the default location).
    ///
    /// A missing or unreadable file yields the default config with a warning.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::path);
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load config from `path`, failing on read or parse errors.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

/// Resolve an alias to its address, or return the original if not an alias.
pub fn resolve_alias(device: &str, config: &Config) -> String {
    config
        .aliases
        .get(device)
        .cloned()
        .unwrap_or_else(|| device.to_string())
}

/// Resolve timeout: flag, then config, then default
pub fn resolve_timeout(flag: Option<u64>, config: &Config) -> u64 {
    flag.or(config.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS)
}

/// Resolve retry count: flag, then config, then zero
pub fn resolve_max_retry(flag: Option<u32>, config: &Config) -> u32 {
    flag.or(config.max_retry).unwrap_or(0)
}

/// Resolve output format: flag, then config, then table.
pub fn resolve_format(flag: Option<OutputFormat>, config: &Config) -> OutputFormat {
    if let Some(format) = flag {
        return format;
    }
    match config.format.as_deref() {
        Some(name) => OutputFormat::from_str(name, true).unwrap_or_else(|_| {
            warn!("Unknown format '{}' in config, using table", name);
            OutputFormat::Table
        }),
        None => OutputFormat::default(),
    }
}

/// Resolve the password for `address`.
///
/// `flag` already carries SWITCHBOT_PASSWORD when the flag is absent. The
/// config is searched by address (case-insensitive), then by the name the
/// user typed, so passwords may be keyed by alias.
pub fn resolve_password(
    flag: Option<String>,
    typed: &str,
    address: &str,
    config: &Config,
) -> Option<String> {
    if flag.is_some() {
        return flag;
    }
    let address = normalize_address(address);
    config
        .passwords
        .iter()
        .find(|(key, _)| normalize_address(key) == address)
        .map(|(_, password)| password.clone())
        .or_else(|| config.passwords.get(typed).cloned())
}
