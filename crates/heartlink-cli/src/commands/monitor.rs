//! Monitor command implementation: stream Heart Rate Measurement notifications.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use heartlink_core::monitor::subscribe_measurements;
use heartlink_core::{ConnectionHandle, UiState};
use time::OffsetDateTime;

use crate::cli::OutputFormat;
use crate::format::{
    FormatOptions, format_measurement_csv_header, format_measurement_csv_line,
    format_measurement_json, format_measurement_line,
};
use crate::util::{
    append_output, connect_with_progress, open_host, request_options, select_device, write_output,
};

/// Arguments for the monitor command.
pub struct MonitorArgs<'a> {
    pub device: Option<String>,
    pub timeout: Duration,
    pub count: u64,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub quiet: bool,
    pub opts: &'a FormatOptions,
}

pub async fn cmd_monitor(args: MonitorArgs<'_>) -> Result<()> {
    let MonitorArgs {
        device,
        timeout,
        count,
        format,
        output,
        quiet,
        opts,
    } = args;

    let device = select_device(device, quiet).await?;
    let options = request_options(device, timeout);
    let host = open_host(timeout).await?;
    let mut handle = ConnectionHandle::new();
    let mut state = UiState::default();

    connect_with_progress(&mut handle, &host, &mut state, &options, !quiet).await?;
    let mut stream = subscribe_measurements(&mut handle, &host, &options)
        .await
        .context("Sensor does not support Heart Rate Measurement notifications")?;

    if !quiet && let Some(label) = handle.device_label(&host) {
        eprintln!("Monitoring: {} | Press Ctrl+C to stop", label);
        eprintln!("{}", "-".repeat(50));
    }
    if matches!(format, OutputFormat::Csv) {
        write_output(output, &format_measurement_csv_header(opts))?;
    }

    let mut received: u64 = 0;
    let result = loop {
        let item = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nShutting down...");
                break Ok(());
            }
            item = stream.next() => item,
        };

        let Some(item) = item else {
            eprintln!("Notification stream ended.");
            break Ok(());
        };

        match item {
            Ok(measurement) => {
                let now = OffsetDateTime::now_utc();
                let content = match format {
                    OutputFormat::Json => format_measurement_json(&measurement, now)?,
                    OutputFormat::Csv => format_measurement_csv_line(&measurement, now),
                    OutputFormat::Text => format_measurement_line(&measurement, now, opts),
                };
                if let Err(e) = append_output(output, &content) {
                    break Err(e);
                }
                received += 1;
                if count > 0 && received >= count {
                    break Ok(());
                }
            }
            Err(e) => tracing::warn!("Skipping malformed measurement: {}", e),
        }
    };

    drop(stream);
    handle.disconnect(&host).await;
    result
}
