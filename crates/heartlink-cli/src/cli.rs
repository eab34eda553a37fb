//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use heartlink_core::HeartRate;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Reusable device connection arguments
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Device name, address or UUID, or use HEARTLINK_DEVICE env var
    #[arg(short, long, env = "HEARTLINK_DEVICE")]
    pub device: Option<String>,

    /// Connection timeout in seconds
    #[arg(short = 'T', long, default_value = "15")]
    pub timeout: u64,
}

/// Reusable output format arguments
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Omit header row in CSV output (useful for appending)
    #[arg(long)]
    pub no_header: bool,
}

#[derive(Parser)]
#[command(name = "heartlink")]
#[command(author, version, about = "CLI for Bluetooth heart rate sensors", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output compact JSON (no pretty-printing)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan for nearby heart rate sensors
    Scan {
        /// Scan timeout in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,

        /// Show every peripheral, not only those advertising the Heart Rate service
        #[arg(long)]
        all: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Connect and read the Heart Rate Control Point
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Also read the Body Sensor Location
        #[arg(long)]
        location: bool,
    },

    /// Write a heart rate to the control point and read it back
    Set {
        #[command(flatten)]
        device: DeviceArgs,

        /// Heart rate in beats per minute (30-220)
        #[arg(value_parser = parse_bpm)]
        bpm: HeartRate,
    },

    /// Poll the control point on a timer
    Watch {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Polling interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,

        /// Number of polls before exiting (0 for unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        count: u64,

        /// Write a simulated heart rate on each poll
        #[arg(long)]
        write: bool,

        /// Centre of the simulated heart rate
        #[arg(long, value_parser = clap::value_parser!(u16).range(30..=220))]
        bpm: Option<u16>,

        /// Spread of the simulated heart rate around --bpm
        #[arg(long)]
        jitter: Option<u16>,

        /// Stop after this many failed polls in a row
        #[arg(long)]
        max_failures: Option<u32>,
    },

    /// Stream Heart Rate Measurement notifications
    Monitor {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Number of measurements before exiting (0 for unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        count: u64,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Open the Heart Rate Demo window
    #[cfg(feature = "gui")]
    Gui,
}

/// Parse a heart rate with range validation
fn parse_bpm(s: &str) -> Result<HeartRate, String> {
    let bpm: u16 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    HeartRate::new(bpm).map_err(|e| e.to_string())
}

/// Parse boolean argument with flexible input
pub fn parse_bool_arg(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" | "enable" | "enabled" => Ok(true),
        "false" | "no" | "off" | "0" | "disable" | "disabled" => Ok(false),
        _ => Err(format!(
            "Invalid boolean value '{}'. Use: true/false, yes/no, on/off, 1/0",
            s
        )),
    }
}

/// Configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    /// Default device name or address
    Device,
    /// Default connection timeout in seconds
    Timeout,
    /// Default polling interval in seconds
    PollInterval,
    /// Write simulated heart rates while watching
    Write,
    /// Centre of the simulated heart rate
    BaseBpm,
    /// Spread of the simulated heart rate
    JitterBpm,
    /// Disable colored output
    NoColor,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
        /// Configuration value
        value: String,
    },

    /// Unset (reset) a configuration value
    Unset {
        /// Configuration key to reset
        #[arg(value_enum)]
        key: ConfigKey,
    },

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init,
}
