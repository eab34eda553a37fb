//! Set command implementation: write a heart rate and read it back.

use std::time::Duration;

use anyhow::{Result, anyhow};
use heartlink_core::{ConnectionHandle, HeartRate, UiState, actions};

use crate::style;
use crate::util::{open_host, remember_device, request_options, select_device};

pub async fn cmd_set(
    device: Option<String>,
    timeout: Duration,
    bpm: HeartRate,
    quiet: bool,
    no_color: bool,
) -> Result<()> {
    let device = select_device(device, quiet).await?;
    let options = request_options(device, timeout);
    let host = open_host(timeout).await?;
    let mut handle = ConnectionHandle::new();
    let mut state = UiState::default();

    let spinner = (!quiet).then(|| {
        style::connecting_spinner(options.identifier.as_deref().unwrap_or("nearest sensor"))
    });
    let result = actions::set_heart_rate(&mut handle, &host, &mut state, &options, bpm).await;
    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }

    if result.is_ok() {
        remember_device(&handle, &host);
    }
    handle.disconnect(&host).await;

    let reading = result.map_err(|e| anyhow!("Failed to set heart rate: {}", e))?;
    if !quiet {
        println!(
            "Heart rate set to {} bpm (control point: {})",
            style::format_bpm_colored(bpm.bpm(), no_color),
            reading.value
        );
    }
    Ok(())
}
