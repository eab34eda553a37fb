//! Visual styling utilities for the CLI.
//!
//! Spinners for long-running BLE operations, heart rate zone colours and the
//! signal strength bar used by `scan`.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

// ============================================================================
// Progress Indicators
// ============================================================================

/// Standard spinner tick characters (Braille dots animation)
const SPINNER_TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Standard spinner tick interval
const SPINNER_TICK_MS: u64 = 80;

/// Get the standard spinner style.
fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_TICK_CHARS)
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    pb
}

/// Create a spinner for scanning operations.
pub fn scanning_spinner(timeout_secs: u64) -> ProgressBar {
    spinner(format!(
        "Scanning for heart rate sensors... ({}s)",
        timeout_secs
    ))
}

/// Create a spinner for connecting to a device.
pub fn connecting_spinner(device: &str) -> ProgressBar {
    spinner(format!("Connecting to {}...", device))
}

// ============================================================================
// Heart Rate Zones
// ============================================================================

/// Heart rate zone boundaries (bpm).
pub mod zones {
    pub const RESTING: u16 = 60; // Cyan: < 60 bpm
    pub const NORMAL: u16 = 100; // Green: 60-100 bpm
    pub const ELEVATED: u16 = 140; // Yellow: 100-140 bpm
    pub const HARD: u16 = 170; // Orange: 140-170 bpm
    // Red: > 170 bpm
}

/// Name of the zone a heart rate falls in.
pub fn zone_label(bpm: u16) -> &'static str {
    if bpm < zones::RESTING {
        "Resting"
    } else if bpm < zones::NORMAL {
        "Normal"
    } else if bpm < zones::ELEVATED {
        "Elevated"
    } else if bpm < zones::HARD {
        "Hard"
    } else {
        "Maximum"
    }
}

/// Format a heart rate with its zone colour.
pub fn format_bpm_colored(bpm: u16, no_color: bool) -> String {
    if no_color {
        return format!("{}", bpm);
    }

    if bpm < zones::RESTING {
        format!("{}", bpm.cyan())
    } else if bpm < zones::NORMAL {
        format!("{}", bpm.green())
    } else if bpm < zones::ELEVATED {
        format!("{}", bpm.yellow())
    } else if bpm < zones::HARD {
        // Orange color (RGB: 255, 165, 0)
        format!("{}", bpm.truecolor(255, 165, 0))
    } else {
        format!("{}", bpm.red())
    }
}

/// Format a yes/no flag, green when set.
pub fn format_flag(value: bool, no_color: bool) -> String {
    let text = if value { "yes" } else { "no" };
    if no_color {
        text.to_string()
    } else if value {
        format!("{}", text.green())
    } else {
        format!("{}", text.dimmed())
    }
}

// ============================================================================
// Signal Strength Bar
// ============================================================================

/// Format RSSI as a visual signal bar.
/// RSSI typically ranges from -100 dBm (weak) to -30 dBm (strong).
pub fn format_signal_bar(rssi: Option<i16>, no_color: bool) -> String {
    let rssi = match rssi {
        Some(r) => r,
        None => return "N/A".to_string(),
    };

    // -30 dBm = excellent (10), -100 dBm = very weak (0)
    let strength = ((rssi + 100).clamp(0, 70) as f32 / 7.0).round() as usize;
    let filled = strength.min(10);
    let empty = 10 - filled;

    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(empty));

    if no_color {
        format!("{} {:>3}", bar, rssi)
    } else if filled >= 7 {
        format!("{} {:>3}", bar.green(), rssi)
    } else if filled >= 4 {
        format!("{} {:>3}", bar.yellow(), rssi)
    } else {
        format!("{} {:>3}", bar.red(), rssi)
    }
}
