//! Config command implementation.

use anyhow::{Context, Result, bail};
use heartlink_types::{MAX_BPM, MIN_BPM};

use crate::cli::{ConfigAction, ConfigKey, parse_bool_arg};
use crate::config::{Config, SimulatorConfig};

pub fn cmd_config(action: ConfigAction) -> Result<()> {
    let path = Config::path();
    match action {
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Show => {
            let config = Config::load();
            let content = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            println!("# {}", path.display());
            print!("{}", content);
        }
        ConfigAction::Get { key } => {
            let config = Config::load();
            println!("{}", get_value(&config, key));
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load();
            set_value(&mut config, key, &value)?;
            config.save()?;
            println!("{} = {}", key_name(key), get_value(&config, key));
        }
        ConfigAction::Unset { key } => {
            let mut config = Config::load();
            unset_value(&mut config, key);
            config.save()?;
            println!("Unset {}", key_name(key));
        }
        ConfigAction::Init => {
            if path.exists() {
                println!("Config already exists at {}", path.display());
            } else {
                Config::default().save()?;
                println!("Created {}", path.display());
            }
        }
    }
    Ok(())
}

fn key_name(key: ConfigKey) -> &'static str {
    match key {
        ConfigKey::Device => "device",
        ConfigKey::Timeout => "timeout",
        ConfigKey::PollInterval => "poll_interval_secs",
        ConfigKey::Write => "write_enabled",
        ConfigKey::BaseBpm => "simulator.base_bpm",
        ConfigKey::JitterBpm => "simulator.jitter_bpm",
        ConfigKey::NoColor => "no_color",
    }
}

fn get_value(config: &Config, key: ConfigKey) -> String {
    fn or_unset<T: ToString>(value: Option<T>) -> String {
        value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    }

    match key {
        ConfigKey::Device => or_unset(config.device.as_deref()),
        ConfigKey::Timeout => or_unset(config.timeout),
        ConfigKey::PollInterval => {
            format!("{}", config.poll_interval().as_secs())
        }
        ConfigKey::Write => config.write_enabled.to_string(),
        ConfigKey::BaseBpm => config.simulator.base_bpm.to_string(),
        ConfigKey::JitterBpm => config.simulator.jitter_bpm.to_string(),
        ConfigKey::NoColor => config.no_color.to_string(),
    }
}

fn parse_u64(value: &str) -> Result<u64> {
    value
        .parse()
        .with_context(|| format!("'{}' is not a valid number", value))
}

fn parse_u16(value: &str) -> Result<u16> {
    value
        .parse()
        .with_context(|| format!("'{}' is not a valid number", value))
}

fn set_value(config: &mut Config, key: ConfigKey, value: &str) -> Result<()> {
    match key {
        ConfigKey::Device => config.device = Some(value.to_string()),
        ConfigKey::Timeout => {
            let secs = parse_u64(value)?;
            if secs == 0 {
                bail!("timeout must be > 0");
            }
            config.timeout = Some(secs);
        }
        ConfigKey::PollInterval => {
            let secs = parse_u64(value)?;
            if secs == 0 {
                bail!("poll interval must be > 0");
            }
            config.poll_interval_secs = Some(secs);
        }
        ConfigKey::Write => config.write_enabled = parse_bool_arg(value).map_err(anyhow::Error::msg)?,
        ConfigKey::BaseBpm => {
            let bpm = parse_u16(value)?;
            if !(MIN_BPM..=MAX_BPM).contains(&bpm) {
                bail!("base_bpm must be between {} and {}", MIN_BPM, MAX_BPM);
            }
            config.simulator.base_bpm = bpm;
        }
        ConfigKey::JitterBpm => config.simulator.jitter_bpm = parse_u16(value)?,
        ConfigKey::NoColor => config.no_color = parse_bool_arg(value).map_err(anyhow::Error::msg)?,
    }
    Ok(())
}

fn unset_value(config: &mut Config, key: ConfigKey) {
    let defaults = SimulatorConfig::default();
    match key {
        ConfigKey::Device => config.device = None,
        ConfigKey::Timeout => config.timeout = None,
        ConfigKey::PollInterval => config.poll_interval_secs = None,
        ConfigKey::Write => config.write_enabled = false,
        ConfigKey::BaseBpm => config.simulator.base_bpm = defaults.base_bpm,
        ConfigKey::JitterBpm => config.simulator.jitter_bpm = defaults.jitter_bpm,
        ConfigKey::NoColor => config.no_color = false,
    }
}
