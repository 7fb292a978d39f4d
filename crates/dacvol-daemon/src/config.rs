//! Daemon configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// USB scanning settings
    #[serde(default)]
    pub usb: UsbConfig,
}

/// Daemon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Socket path override (default: `$XDG_RUNTIME_DIR/dacvol/daemon.sock`)
    #[serde(default)]
    pub socket: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { log_level: default_log_level(), socket: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// USB scanning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbConfig {
    /// Seconds between enumeration snapshots
    #[serde(default = "default_rescan_interval")]
    pub rescan_interval_secs: u64,
    /// Seconds to keep polling for device access after requesting it
    #[serde(default = "default_grant_window")]
    pub grant_window_secs: u64,
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            rescan_interval_secs: default_rescan_interval(),
            grant_window_secs: default_grant_window(),
        }
    }
}

fn default_rescan_interval() -> u64 {
    2
}

fn default_grant_window() -> u64 {
    30
}

/// Load configuration from file or defaults.
///
/// # Errors
/// Returns an error if an existing config file cannot be read or parsed.
pub fn load_config() -> Result<Config> {
    let config_path = config_path()?;

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {config_path:?}"))?;
        Ok(config)
    } else {
        info!(?config_path, "Config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("dev", "dacvol", "dacvol").context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.daemon.log_level, "info");
        assert_eq!(config.usb.rescan_interval_secs, 2);
        assert_eq!(config.usb.grant_window_secs, 30);
        assert!(config.daemon.socket.is_none());
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let config: Config = toml::from_str("[usb]\nrescan_interval_secs = 10\n").unwrap();
        assert_eq!(config.usb.rescan_interval_secs, 10);
        assert_eq!(config.usb.grant_window_secs, 30);
        assert_eq!(config.daemon.log_level, "info");
    }
}
