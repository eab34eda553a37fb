//! Message types for UI/worker communication.
//!
//! ```text
//! +------------------+     Command      +------------------+
//! |    UI Thread     | --------------> |  SessionWorker   |
//! |      (egui)      |                 |  (tokio runtime) |
//! |                  | <-------------- |                  |
//! +------------------+  SessionEvent   +------------------+
//! ```
//!
//! - [`Command`]: Messages sent from the UI thread to the background worker
//! - [`SessionEvent`]: Events sent from the worker back to the UI thread

use std::time::Duration;

use heartlink_types::{ControlPointReading, HeartRate};

use crate::host::DeviceLabel;
use crate::polling::PollOptions;
use crate::state::UiState;

/// Commands sent from the UI thread to the background worker.
#[derive(Debug, Clone)]
pub enum Command {
    /// Connect (or reuse the connection) and read the control point.
    Connect,

    /// Write a heart rate and read it back.
    SetHeartRate {
        /// The value to write. `None` draws one from the simulator.
        bpm: Option<HeartRate>,
    },

    /// Change the simulator centre and spread.
    TuneSimulator {
        /// Centre of the simulated range.
        base_bpm: u16,
        /// Spread around the centre.
        jitter_bpm: u16,
    },

    /// Start the poll timer. Ignored while one is already running.
    StartPolling {
        /// Interval and behaviour of the timer.
        options: PollOptions,
    },

    /// Clear the poll timer.
    StopPolling,

    /// Clear the poll timer and disconnect.
    Disconnect,

    /// Shut down the worker.
    Shutdown,
}

/// Events sent from the worker back to the UI thread.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The user-visible state changed.
    StateChanged(UiState),

    /// A device was selected and its control point found.
    Connected {
        /// Label of the selected device.
        label: DeviceLabel,
    },

    /// The control point was read.
    ControlPointRead(ControlPointReading),

    /// A heart rate was written.
    HeartRateWritten {
        /// The value written.
        bpm: HeartRate,
    },

    /// The poll timer started.
    PollingStarted {
        /// Time between polls.
        interval: Duration,
    },

    /// The poll timer was cleared.
    PollingStopped,

    /// The connection was closed.
    Disconnected,
}
