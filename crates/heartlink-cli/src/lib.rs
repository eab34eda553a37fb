//! Command-line interface for Bluetooth heart rate sensors.
//!
//! The `heartlink` binary wraps [`heartlink_core`]: it finds a peripheral
//! advertising the Heart Rate service, connects, and reads or writes the
//! Heart Rate Control Point (0x2A39).
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | Scan for nearby heart rate sensors |
//! | `read` | Connect and read the control point |
//! | `set` | Write a heart rate and read it back |
//! | `watch` | Poll the control point on a timer |
//! | `monitor` | Stream Heart Rate Measurement notifications |
//! | `config` | Manage CLI configuration |
//! | `completions` | Generate shell completions |
//! | `gui` | Open the "Heart Rate Demo" window (feature `gui`) |
//!
//! # Configuration
//!
//! The CLI stores configuration in `~/.config/heartlink/config.toml` (or
//! platform equivalent):
//!
//! - `device`: Default device name or address
//! - `timeout`: Connection timeout in seconds
//! - `poll_interval_secs`: Default `watch` interval
//! - `write_enabled`: Write simulated heart rates while watching
//! - `[simulator]` `base_bpm` / `jitter_bpm`: Simulated heart rate range
//!
//! # Environment Variables
//!
//! - `HEARTLINK_DEVICE`: Default device (overridden by `--device` flag)
//! - `NO_COLOR`: Disable colored output when set
//! - `RUST_LOG`: Log filter when neither `-v` nor `-q` is given
//!
//! # Examples
//!
//! ```bash
//! heartlink scan
//! heartlink read --device "Polar H10"
//! heartlink set 85
//! heartlink watch --interval 2 --write --bpm 90 --jitter 5
//! ```

// Re-export core dependencies for convenience
pub use heartlink_core;
pub use heartlink_types;
