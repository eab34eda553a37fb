//! Read command implementation: the one-shot Connect action.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use heartlink_core::monitor::read_body_sensor_location;
use heartlink_core::{
    BluetoothHost, ConnectionHandle, ControlPointReading, RequestOptions, UiState,
};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, ReadReport, format_read_csv, format_read_json, format_read_text};
use crate::util::{connect_with_progress, open_host, request_options, select_device, write_output};

/// Arguments for the read command.
pub struct ReadArgs<'a> {
    pub device: Option<String>,
    pub timeout: Duration,
    pub format: OutputFormat,
    pub location: bool,
    pub output: Option<&'a PathBuf>,
    pub quiet: bool,
    pub opts: &'a FormatOptions,
}

pub async fn cmd_read(args: ReadArgs<'_>) -> Result<()> {
    let ReadArgs {
        device,
        timeout,
        format,
        location,
        output,
        quiet,
        opts,
    } = args;

    let device = select_device(device, quiet).await?;
    let options = request_options(device, timeout);
    let host = open_host(timeout).await?;
    let mut handle = ConnectionHandle::new();
    let mut state = UiState::default();

    let reading = connect_with_progress(&mut handle, &host, &mut state, &options, !quiet).await?;
    let report = finish_read(&mut handle, &host, &options, &reading, location).await;

    let content = match format {
        OutputFormat::Json => format_read_json(&report, opts)?,
        OutputFormat::Text => format_read_text(&report, opts),
        OutputFormat::Csv => format_read_csv(&report, opts),
    };

    write_output(output, &content)
}

/// Build the report for a completed read and close the link.
///
/// The device label is taken before the optional location lookup, since a
/// failed lookup clears the handle.
async fn finish_read<H: BluetoothHost>(
    handle: &mut ConnectionHandle<H>,
    host: &H,
    options: &RequestOptions,
    reading: &ControlPointReading,
    location: bool,
) -> ReadReport {
    let label = handle.device_label(host);

    let location = if location {
        match read_body_sensor_location(handle, host, options).await {
            Ok(location) => Some(location),
            Err(e) => {
                tracing::warn!("Body Sensor Location unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    handle.disconnect(host).await;
    ReadReport::new(label.as_ref(), reading, location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heartlink_core::uuids::BODY_SENSOR_LOCATION;
    use heartlink_core::{MockHost, MockStep};

    #[tokio::test]
    async fn test_missing_location_keeps_label_and_closes_link() {
        let host = MockHost::builder()
            .name("Polar H10")
            .address("AA:BB:CC:DD:EE:FF")
            .without_characteristic(BODY_SENSOR_LOCATION)
            .build();
        let options = RequestOptions::default();
        let mut handle = ConnectionHandle::new();
        let reading = handle.read(&host, &options).await.unwrap();

        let report = finish_read(&mut handle, &host, &options, &reading, true).await;

        assert_eq!(report.name.as_deref(), Some("Polar H10"));
        assert_eq!(report.identifier, "AA:BB:CC:DD:EE:FF");
        assert!(report.body_sensor_location.is_none());
        assert!(!host.is_connected());
    }

    #[tokio::test]
    async fn test_location_included_when_available() {
        let host = MockHost::builder()
            .value(BODY_SENSOR_LOCATION, &[0x01])
            .build();
        let options = RequestOptions::default();
        let mut handle = ConnectionHandle::new();
        let reading = handle.read(&host, &options).await.unwrap();

        let report = finish_read(&mut handle, &host, &options, &reading, true).await;

        assert_eq!(report.body_sensor_location.as_deref(), Some("Chest"));
        assert_eq!(host.calls(MockStep::Disconnect), 1);
        assert!(!host.is_connected());
    }
}
