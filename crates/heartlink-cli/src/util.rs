//! Utility functions for CLI operations.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use dialoguer::{Select, theme::ColorfulTheme};
use heartlink_core::scan::{self, ScanOptions};
use heartlink_core::{
    BluetoothHost, BtleplugHost, ConnectionConfig, ConnectionHandle, ControlPointReading,
    RequestOptions, UiState, actions,
};

use crate::config::update_last_device;
use crate::style;

/// Build the request for a device, or for the strongest sensor in range when none is given.
pub fn request_options(device: Option<String>, timeout: Duration) -> RequestOptions {
    RequestOptions::new()
        .maybe_identifier(device)
        .scan_timeout(timeout)
}

/// Open the default adapter with the given connection timeout.
pub async fn open_host(timeout: Duration) -> Result<BtleplugHost> {
    let config = ConnectionConfig::new().connection_timeout(timeout);
    BtleplugHost::with_config(config).await.context(
        "No Bluetooth adapter available. Check that Bluetooth is enabled and permitted.",
    )
}

/// Pick a device, scanning and prompting when several sensors are in range.
///
/// Without a terminal, or with a single sensor in range, the host picks the
/// strongest advertiser and this returns `None`.
pub async fn select_device(device: Option<String>, quiet: bool) -> Result<Option<String>> {
    if device.is_some() || quiet {
        return Ok(device);
    }

    if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
        return Ok(None);
    }

    let options = ScanOptions::default().duration_secs(5);
    let devices = scan::scan_with_options(options)
        .await
        .context("Failed to scan for devices")?;

    match devices.len() {
        0 => bail!(
            "No heart rate sensors found nearby.\n\
             Make sure the sensor is awake and not connected to another app."
        ),
        1 => Ok(None),
        _ => {
            let items: Vec<String> = devices
                .iter()
                .map(|d| {
                    let name = d.name.as_deref().unwrap_or("Unknown");
                    format!("{} ({})", name, d.identifier)
                })
                .collect();

            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Select a device")
                .items(&items)
                .default(0)
                .interact()
                .context("Failed to get user selection")?;

            Ok(Some(devices[selection].identifier.clone()))
        }
    }
}

/// Run the Connect action with a spinner, remembering the device on success.
pub async fn connect_with_progress<H: BluetoothHost>(
    handle: &mut ConnectionHandle<H>,
    host: &H,
    state: &mut UiState,
    options: &RequestOptions,
    show_progress: bool,
) -> Result<ControlPointReading> {
    let target = options
        .identifier
        .as_deref()
        .unwrap_or("nearest heart rate sensor");
    let spinner = (show_progress && io::stderr().is_terminal())
        .then(|| style::connecting_spinner(target));

    let result = actions::connect(handle, host, state, options).await;

    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }

    let reading = result.map_err(|e| {
        anyhow::anyhow!(
            "Failed to connect to {}\n\nCause: {}\n\n\
             Possible causes:\n  \
             - Bluetooth may be disabled -- check system settings\n  \
             - The sensor may be asleep or out of range\n  \
             - The sensor may be connected to another host\n  \
             - The sensor may not expose a Heart Rate Control Point",
            target,
            e
        )
    })?;

    remember_device(handle, host);
    Ok(reading)
}

/// Save the connected device as `last_device` (ignore errors - this is a convenience feature).
pub fn remember_device<H: BluetoothHost>(handle: &ConnectionHandle<H>, host: &H) {
    if let Some(label) = handle.device_label(host)
        && let Err(e) = update_last_device(&label.identifier, label.name.as_deref())
    {
        tracing::debug!("Failed to remember last device: {}", e);
    }
}

/// Write output to file or stdout
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

/// Append output to file or write to stdout, for streaming commands.
pub fn append_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            file.write_all(content.as_bytes())
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use heartlink_core::{MockHost, MockStep};

    #[test]
    fn test_request_options() {
        let options = request_options(Some("Polar".to_string()), Duration::from_secs(7));
        assert_eq!(options.identifier.as_deref(), Some("Polar"));
        assert_eq!(options.scan_timeout, Duration::from_secs(7));

        let any = request_options(None, Duration::from_secs(7));
        assert!(any.identifier.is_none());
    }

    #[tokio::test]
    async fn test_select_device_passes_through_explicit() {
        let device = select_device(Some("AA:BB".to_string()), false).await.unwrap();
        assert_eq!(device.as_deref(), Some("AA:BB"));
        assert!(select_device(None, true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connect_with_progress_error_mentions_cause() {
        let host = MockHost::new();
        host.fail_at(MockStep::ConnectGatt, "link refused").await;
        let mut handle = ConnectionHandle::new();
        let mut state = UiState::default();

        let err = connect_with_progress(
            &mut handle,
            &host,
            &mut state,
            &RequestOptions::default(),
            false,
        )
        .await
        .unwrap_err()
        .to_string();

        assert!(err.contains("nearest heart rate sensor"));
        assert!(err.contains("link refused"));
        assert!(state.has_error());
    }

    #[test]
    fn test_write_and_append_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_output(Some(&path), "a\n").unwrap();
        append_output(Some(&path), "b\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }
}
