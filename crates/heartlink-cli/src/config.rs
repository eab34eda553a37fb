//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use heartlink_core::simulator::{DEFAULT_BASE_BPM, DEFAULT_JITTER_BPM};
use serde::{Deserialize, Serialize};

/// Default connection timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Default polling interval in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default device name or address
    #[serde(default)]
    pub device: Option<String>,

    /// Connection timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Polling interval in seconds
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,

    /// Write simulated heart rates while polling
    #[serde(default)]
    pub write_enabled: bool,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,

    /// Simulated heart rate settings
    #[serde(default)]
    pub simulator: SimulatorConfig,

    /// Last successfully connected device (auto-updated)
    #[serde(default)]
    pub last_device: Option<String>,

    /// Name of the last connected device (for display)
    #[serde(default)]
    pub last_device_name: Option<String>,
}

/// Settings for the simulated heart rate written by `watch --write` and the GUI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Centre of the simulated range in bpm.
    #[serde(default = "default_base_bpm")]
    pub base_bpm: u16,

    /// Spread around the centre in bpm.
    #[serde(default = "default_jitter_bpm")]
    pub jitter_bpm: u16,
}

fn default_base_bpm() -> u16 {
    DEFAULT_BASE_BPM
}

fn default_jitter_bpm() -> u16 {
    DEFAULT_JITTER_BPM
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            base_bpm: default_base_bpm(),
            jitter_bpm: default_jitter_bpm(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("heartlink")
            .join("config.toml")
    }

    /// Load config from file, or return default if not found
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from a specific file, or return default if it is missing or invalid
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    /// Save config to a specific file
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

    /// Polling interval, falling back to the default.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.poll_interval_secs
                .filter(|&s| s > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        )
    }
}

/// Resolve device from arg, env var, or config.
/// Falls back to last_device if no default device is set.
pub fn resolve_device(device: Option<String>, config: &Config) -> Option<String> {
    device
        .or_else(|| config.device.clone())
        .or_else(|| config.last_device.clone())
}

/// Print device source feedback (e.g., "Using last connected device: ...").
pub fn print_device_source_feedback(device: Option<&str>, config: &Config, quiet: bool) {
    if quiet {
        return;
    }
    let Some(device) = device else {
        return;
    };
    if config.device.as_deref() == Some(device) {
        eprintln!("Using default device: {}", device);
    } else if config.last_device.as_deref() == Some(device) {
        match &config.last_device_name {
            Some(name) => eprintln!("Using last connected device: {} ({})", name, device),
            None => eprintln!("Using last connected device: {}", device),
        }
    }
}

/// Update the last connected device in config.
/// This is called after a successful connection.
pub fn update_last_device(identifier: &str, name: Option<&str>) -> Result<()> {
    let mut config = Config::load();
    config.last_device = Some(identifier.to_string());
    config.last_device_name = name.map(|n| n.to_string());
    config.save()
}

/// Resolve timeout: use provided value, fall back to config, then default
pub fn resolve_timeout(cmd_timeout: u64, config: &Config, default: u64) -> u64 {
    // A value equal to clap's default means the flag was not given.
    if cmd_timeout != default {
        cmd_timeout
    } else {
        config.timeout.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_device_prefers_arg() {
        let config = Config {
            device: Some("config-device".to_string()),
            ..Default::default()
        };
        let result = resolve_device(Some("arg-device".to_string()), &config);
        assert_eq!(result, Some("arg-device".to_string()));
    }

    #[test]
    fn test_resolve_device_falls_back_to_config() {
        let config = Config {
            device: Some("config-device".to_string()),
            last_device: Some("last-device".to_string()),
            ..Default::default()
        };
        let result = resolve_device(None, &config);
        assert_eq!(result, Some("config-device".to_string()));
    }

    #[test]
    fn test_resolve_device_falls_back_to_last() {
        let config = Config {
            last_device: Some("last-device".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_device(None, &config), Some("last-device".to_string()));
    }

    #[test]
    fn test_resolve_device_none_when_both_empty() {
        let config = Config::default();
        let result = resolve_device(None, &config);
        assert_eq!(result, None);
    }

    #[test]
    fn test_resolve_timeout_uses_explicit_value() {
        let config = Config {
            timeout: Some(60),
            ..Default::default()
        };
        let result = resolve_timeout(45, &config, 15);
        assert_eq!(result, 45);
    }

    #[test]
    fn test_resolve_timeout_uses_config_when_default() {
        let config = Config {
            timeout: Some(60),
            ..Default::default()
        };
        let result = resolve_timeout(15, &config, 15);
        assert_eq!(result, 60);
    }

    #[test]
    fn test_resolve_timeout_uses_default_when_no_config() {
        let config = Config::default();
        let result = resolve_timeout(15, &config, 15);
        assert_eq!(result, 15);
    }

    #[test]
    fn test_poll_interval_defaults() {
        let mut config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        config.poll_interval_secs = Some(0);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        config.poll_interval_secs = Some(5);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_simulator_defaults_when_section_missing() {
        let config: Config = toml::from_str("device = \"Polar H10\"").unwrap();
        assert_eq!(config.device.as_deref(), Some("Polar H10"));
        assert_eq!(config.simulator, SimulatorConfig::default());
        assert!(!config.write_enabled);
    }

    #[test]
    fn test_partial_simulator_section() {
        let config: Config = toml::from_str("[simulator]\nbase_bpm = 120\n").unwrap();
        assert_eq!(config.simulator.base_bpm, 120);
        assert_eq!(config.simulator.jitter_bpm, DEFAULT_JITTER_BPM);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            device: Some("AA:BB:CC:DD:EE:FF".to_string()),
            poll_interval_secs: Some(3),
            write_enabled: true,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_load_invalid_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "timeout = \"soon\"").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            Config::load_from(&dir.path().join("missing.toml")),
            Config::default()
        );
    }
}
