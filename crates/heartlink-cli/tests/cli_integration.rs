//! CLI Integration Tests
//!
//! These tests run the `heartlink` binary and check its output and exit codes.
//! Tests that need a heart rate sensor are marked with #[ignore].
//!
//! Run mock tests:
//! ```
//! cargo test --package heartlink-cli --test cli_integration
//! ```
//!
//! Run hardware tests:
//! ```
//! HEARTLINK_DEVICE="Polar H10" cargo test --package heartlink-cli --test cli_integration -- --ignored --nocapture
//! ```

use std::env;
use std::path::Path;
use std::process::{Command, Output};

/// Run heartlink with its config directory redirected into `home`.
fn run_heartlink_in(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_heartlink"))
        .args(args)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("HEARTLINK_DEVICE")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run heartlink binary")
}

fn run_heartlink(args: &[&str]) -> Output {
    let home = tempfile::tempdir().expect("Failed to create temp dir");
    run_heartlink_in(home.path(), args)
}

/// Get device from environment
fn get_device() -> Option<String> {
    env::var("HEARTLINK_DEVICE").ok().filter(|s| !s.is_empty())
}

// =============================================================================
// Help and Version Tests (no hardware required)
// =============================================================================

#[test]
fn test_help_command() {
    let output = run_heartlink(&["--help"]);

    assert!(output.status.success(), "Help should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("heart rate"), "Help should mention heart rate");
    for cmd in ["scan", "read", "set", "watch", "monitor", "config"] {
        assert!(stdout.contains(cmd), "Help should list {} command", cmd);
    }
}

#[test]
fn test_version_command() {
    let output = run_heartlink(&["--version"]);

    assert!(output.status.success(), "Version should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("heartlink"));
}

#[test]
fn test_subcommand_help() {
    for cmd in ["scan", "read", "set", "watch", "monitor", "config", "completions"] {
        let output = run_heartlink(&[cmd, "--help"]);
        assert!(output.status.success(), "{} --help should succeed", cmd);

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(!stdout.is_empty(), "{} --help should produce output", cmd);
    }
}

#[test]
fn test_completions_bash() {
    let output = run_heartlink(&["completions", "bash"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("heartlink"));
}

// =============================================================================
// Argument Validation (no hardware required)
// =============================================================================

#[test]
fn test_invalid_subcommand() {
    let output = run_heartlink(&["notacommand"]);
    assert!(!output.status.success(), "Invalid subcommand should fail");
}

#[test]
fn test_set_requires_bpm() {
    let output = run_heartlink(&["set"]);
    assert!(!output.status.success());
}

#[test]
fn test_set_rejects_out_of_range_bpm() {
    let output = run_heartlink(&["set", "500"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("500"), "Error should mention the bad value");
}

// =============================================================================
// Config Commands (no device required)
// =============================================================================

#[test]
fn test_config_path() {
    let home = tempfile::tempdir().unwrap();
    let output = run_heartlink_in(home.path(), &["config", "path"]);

    assert!(output.status.success(), "Config path should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("heartlink"));
    assert!(stdout.trim_end().ends_with("config.toml"));
}

#[test]
fn test_config_init_set_get() {
    let home = tempfile::tempdir().unwrap();

    let output = run_heartlink_in(home.path(), &["config", "init"]);
    assert!(output.status.success(), "Config init should succeed");

    let output = run_heartlink_in(home.path(), &["config", "set", "poll-interval", "4"]);
    assert!(output.status.success(), "Config set should succeed");

    let output = run_heartlink_in(home.path(), &["config", "get", "poll-interval"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "4");

    let output = run_heartlink_in(home.path(), &["config", "show"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("poll_interval_secs = 4"));
    assert!(stdout.contains("[simulator]"));
}

#[test]
fn test_config_set_rejects_bad_value() {
    let home = tempfile::tempdir().unwrap();
    let output = run_heartlink_in(home.path(), &["config", "set", "base-bpm", "999"]);
    assert!(!output.status.success());
}

// =============================================================================
// Hardware Tests
// =============================================================================

#[test]
#[ignore = "requires BLE hardware"]
fn test_scan_json_output() {
    let output = run_heartlink(&["scan", "--timeout", "5", "--format", "json"]);
    assert!(output.status.success(), "Scan should succeed");

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("scan output should be JSON");
    assert!(json["count"].is_number());
    assert!(json["devices"].is_array());
}

#[test]
#[ignore = "requires BLE hardware and device"]
fn test_read_json_output() {
    let Some(device) = get_device() else {
        println!("SKIP: HEARTLINK_DEVICE not set");
        return;
    };

    let output = run_heartlink(&["read", "--device", &device, "--format", "json"]);
    assert!(output.status.success(), "Read should succeed");

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("read output should be JSON");
    assert!(json["control_point"].is_number());
}

#[test]
#[ignore = "requires BLE hardware and device"]
fn test_watch_limited_count() {
    let Some(device) = get_device() else {
        println!("SKIP: HEARTLINK_DEVICE not set");
        return;
    };

    let output = run_heartlink(&[
        "watch", "--device", &device, "--interval", "1", "-n", "2", "--format", "csv",
    ]);
    assert!(output.status.success(), "Watch should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("timestamp,tick,written_bpm,control_point"));
}

#[test]
#[ignore = "requires BLE hardware"]
fn test_invalid_device() {
    let output = run_heartlink(&["read", "--device", "NonExistentDevice12345", "-T", "5"]);

    assert!(!output.status.success(), "Read with invalid device should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to connect"));
}
