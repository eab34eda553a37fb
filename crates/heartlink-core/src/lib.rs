//! Core BLE library for Bluetooth heart rate peripherals.
//!
//! This crate talks to a heart rate sensor through a short chain of host
//! Bluetooth calls: request a device advertising the Heart Rate service,
//! connect to its GATT server, look up the service, look up the Heart Rate
//! Control Point characteristic, then read or write it.
//!
//! # Features
//!
//! - **Host seam**: [`BluetoothHost`] abstracts the platform stack; [`BtleplugHost`]
//!   is the real one, [`MockHost`] the in-memory one
//! - **Memoized chain**: [`ConnectionHandle`] caches each link and clears all
//!   of them on any failure
//! - **Actions**: [`actions::connect`] and [`actions::set_heart_rate`] update a [`UiState`]
//! - **Polling**: [`Poller`] is a single cancellable periodic timer
//! - **Background worker**: [`SessionWorker`] drives a session from UI commands
//! - **Notifications**: decoded Heart Rate Measurement streams via [`monitor`]
//!
//! # Platform Differences
//!
//! - **macOS**: Devices are identified by a UUID assigned by CoreBluetooth.
//! - **Linux/Windows**: Devices are identified by their Bluetooth MAC address.
//!
//! # Quick Start
//!
//! ```no_run
//! use heartlink_core::{BtleplugHost, ConnectionHandle, RequestOptions, UiState, actions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = BtleplugHost::new().await?;
//!     let mut handle = ConnectionHandle::new();
//!     let mut state = UiState::default();
//!
//!     actions::connect(&mut handle, &host, &mut state, &RequestOptions::default()).await?;
//!     println!("{}", state.status());
//!
//!     handle.disconnect(&host).await;
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod btle;
pub mod connection;
pub mod error;
pub mod host;
pub mod messages;
pub mod mock;
pub mod monitor;
pub mod polling;
pub mod scan;
pub mod simulator;
pub mod state;
pub mod util;
pub mod worker;

pub use btle::{BtleplugHost, ConnectionConfig};
pub use connection::{ConnectionHandle, Stage};
pub use error::{ConnectionFailureReason, DeviceNotFoundReason, Error, Result};
pub use host::{BluetoothHost, DeviceLabel, RequestOptions};
pub use messages::{Command, SessionEvent};
pub use mock::{MockHost, MockHostBuilder, MockStep};
pub use polling::{PollOptions, Poller};
pub use scan::{DiscoveredDevice, ScanOptions};
pub use simulator::HeartRateSimulator;
pub use state::UiState;
pub use worker::{SessionWorker, WorkerHandle, spawn_worker};

// Re-export from heartlink-types
pub use heartlink_types::uuids;
pub use heartlink_types::{
    BodySensorLocation, ControlPointReading, ControlPointValue, HeartRate, HeartRateMeasurement,
    hex_dump,
};
