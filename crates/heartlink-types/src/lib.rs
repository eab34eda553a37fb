//! Platform-agnostic types for Bluetooth LE heart rate peripherals.
//!
//! This crate provides the shared vocabulary used by heartlink-core and the
//! heartlink CLI: GATT UUID constants, the control point value codec, the
//! Heart Rate Measurement parser and a small hex dump helper.
//!
//! # Example
//!
//! ```
//! use heartlink_types::{ControlPointValue, HeartRate};
//!
//! let bpm = HeartRate::new(72).unwrap();
//! let echoed = ControlPointValue::from_bytes(&bpm.to_bytes()).unwrap();
//! assert_eq!(echoed.get(), 72);
//! ```

pub mod error;
pub mod hex;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use hex::hex_dump;
pub use types::{
    BodySensorLocation, ControlPointReading, ControlPointValue, HeartRate, HeartRateMeasurement,
    MAX_BPM, MIN_BPM, SensorContact,
};
pub use crate::uuid as uuids;
