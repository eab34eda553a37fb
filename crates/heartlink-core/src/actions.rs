//! User-triggered actions.
//!
//! Each action walks the connection chain through a [`ConnectionHandle`],
//! then reflects the outcome in a [`UiState`]. The result is returned as
//! well so non-UI callers can propagate it.

use tracing::{error, info};

use heartlink_types::{ControlPointReading, HeartRate};

use crate::connection::ConnectionHandle;
use crate::error::Result;
use crate::host::{BluetoothHost, RequestOptions};
use crate::state::{DISCONNECTED_STATUS, UiState};

/// Status shown while the chain is being walked.
pub const CONNECTING_STATUS: &str = "Connecting...";

/// Connect (or reuse the connection) and read the control point.
///
/// On success the status reads `Heart Rate Control Point: <value>`. On
/// failure the error alert is raised and the handle is cleared.
pub async fn connect<H: BluetoothHost>(
    handle: &mut ConnectionHandle<H>,
    host: &H,
    state: &mut UiState,
    options: &RequestOptions,
) -> Result<ControlPointReading> {
    state.clear_error();
    state.set_status(CONNECTING_STATUS);

    let result = handle.read(host, options).await;
    match &result {
        Ok(reading) => {
            info!(value = reading.value.get(), "Control point read");
            state.set_status(format!("Heart Rate Control Point: {}", reading.value));
        }
        Err(e) => report_failure(state, e),
    }
    result
}

/// Write a heart rate to the control point and read it back.
///
/// Reuses the cached chain when there is one. On success the status reads
/// `Heart rate set to <bpm> bpm (control point: <value>)`.
pub async fn set_heart_rate<H: BluetoothHost>(
    handle: &mut ConnectionHandle<H>,
    host: &H,
    state: &mut UiState,
    options: &RequestOptions,
    bpm: HeartRate,
) -> Result<ControlPointReading> {
    state.clear_error();
    if !handle.is_ready() {
        state.set_status(CONNECTING_STATUS);
    }

    let result = write_and_read_back(handle, host, options, bpm).await;
    match &result {
        Ok(reading) => {
            info!(bpm = bpm.bpm(), value = reading.value.get(), "Heart rate written");
            state.set_status(format!(
                "Heart rate set to {} (control point: {})",
                bpm, reading.value
            ));
        }
        Err(e) => report_failure(state, e),
    }
    result
}

async fn write_and_read_back<H: BluetoothHost>(
    handle: &mut ConnectionHandle<H>,
    host: &H,
    options: &RequestOptions,
    bpm: HeartRate,
) -> Result<ControlPointReading> {
    handle.write(host, options, &bpm.to_bytes()).await?;
    handle.read(host, options).await
}

fn report_failure(state: &mut UiState, e: &crate::error::Error) {
    error!(error = %e, "Heart rate action failed");
    state.fail(e.to_string());
    state.set_status(DISCONNECTED_STATUS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Stage;
    use crate::mock::{MockHost, MockStep};
    use heartlink_types::uuids::HEART_RATE_CONTROL_POINT;

    #[tokio::test]
    async fn test_connect_sets_status() {
        let host = MockHost::builder().control_point(&[0x00, 0x48]).build();
        let mut handle = ConnectionHandle::new();
        let mut state = UiState::default();

        connect(&mut handle, &host, &mut state, &RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(state.status(), "Heart Rate Control Point: 72");
        assert!(!state.has_error());
    }

    #[tokio::test]
    async fn test_connect_failure_raises_alert() {
        let host = MockHost::new();
        host.fail_at(MockStep::PrimaryService, "No Services matching UUID found")
            .await;
        let mut handle = ConnectionHandle::new();
        let mut state = UiState::default();

        let result = connect(&mut handle, &host, &mut state, &RequestOptions::default()).await;

        assert!(result.is_err());
        assert!(state.has_error());
        assert!(
            state
                .error_message()
                .unwrap()
                .contains("No Services matching UUID found")
        );
        assert_eq!(state.status(), DISCONNECTED_STATUS);
        assert_eq!(handle.stage(), Stage::Idle);
    }

    #[tokio::test]
    async fn test_reconnect_clears_previous_error() {
        let host = MockHost::new();
        host.fail_times(MockStep::RequestDevice, 1, "User cancelled")
            .await;
        let mut handle = ConnectionHandle::new();
        let mut state = UiState::default();
        let options = RequestOptions::default();

        assert!(connect(&mut handle, &host, &mut state, &options).await.is_err());
        assert!(state.has_error());

        connect(&mut handle, &host, &mut state, &options)
            .await
            .unwrap();
        assert!(!state.has_error());
        assert_eq!(state.status(), "Heart Rate Control Point: 0");
    }

    #[tokio::test]
    async fn test_set_heart_rate_writes_and_reads_back() {
        let host = MockHost::new();
        let mut handle = ConnectionHandle::new();
        let mut state = UiState::default();
        let options = RequestOptions::default();
        let bpm = HeartRate::new(85).unwrap();

        let reading = set_heart_rate(&mut handle, &host, &mut state, &options, bpm)
            .await
            .unwrap();

        assert_eq!(reading.value.get(), 85);
        assert_eq!(
            state.status(),
            "Heart rate set to 85 bpm (control point: 85)"
        );
        assert_eq!(
            host.writes().await,
            vec![(HEART_RATE_CONTROL_POINT, vec![0x00, 85])]
        );
    }

    #[tokio::test]
    async fn test_set_heart_rate_reuses_connection() {
        let host = MockHost::new();
        let mut handle = ConnectionHandle::new();
        let mut state = UiState::default();
        let options = RequestOptions::default();

        connect(&mut handle, &host, &mut state, &options)
            .await
            .unwrap();
        for bpm in [70, 75, 80] {
            set_heart_rate(
                &mut handle,
                &host,
                &mut state,
                &options,
                HeartRate::new(bpm).unwrap(),
            )
            .await
            .unwrap();
        }

        assert_eq!(host.calls(MockStep::RequestDevice), 1);
        assert_eq!(host.calls(MockStep::Write), 3);
    }

    #[tokio::test]
    async fn test_set_heart_rate_failure_raises_alert() {
        let host = MockHost::new();
        let mut handle = ConnectionHandle::new();
        let mut state = UiState::default();
        let options = RequestOptions::default();
        connect(&mut handle, &host, &mut state, &options)
            .await
            .unwrap();

        host.fail_at(MockStep::Write, "GATT operation not permitted")
            .await;
        let result = set_heart_rate(
            &mut handle,
            &host,
            &mut state,
            &options,
            HeartRate::new(90).unwrap(),
        )
        .await;

        assert!(result.is_err());
        assert!(state.has_error());
        assert_eq!(handle.stage(), Stage::Idle);
    }
}
