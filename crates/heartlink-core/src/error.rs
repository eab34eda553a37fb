//! Error types for heartlink-core.
//!
//! Every step of the connection chain (device request, GATT connect, service
//! lookup, characteristic lookup, read, write) reports failures through
//! [`Error`]. Callers never retry automatically: a failed step clears the
//! [`ConnectionHandle`](crate::connection::ConnectionHandle) and the next
//! action starts the chain from scratch.
//!
//! | Error Type | Typical cause |
//! |------------|---------------|
//! | [`Error::DeviceNotFound`] | Nothing advertising the heart rate service in range, or no adapter |
//! | [`Error::ConnectionFailed`] | The peripheral refused or dropped the GATT connection |
//! | [`Error::ServiceNotFound`] | The peripheral does not expose the requested primary service |
//! | [`Error::CharacteristicNotFound`] | The service lacks the control point characteristic |
//! | [`Error::Timeout`] | The host Bluetooth stack did not answer in time |
//! | [`Error::Parse`] | The characteristic value could not be decoded |

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use heartlink_types::ParseError;

/// Errors that can occur when talking to a heart rate peripheral.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error reported by the host stack.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// No matching device was found.
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceNotFoundReason),

    /// Operation attempted while not connected to a device.
    #[error("Not connected to device")]
    NotConnected,

    /// Connection failed with a specific reason.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// The device identifier that failed to connect.
        device_id: Option<String>,
        /// The structured reason for the failure.
        reason: ConnectionFailureReason,
    },

    /// Required primary service not found on the device.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The service UUID that was requested.
        uuid: Uuid,
    },

    /// Required characteristic not found in the service.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: Uuid,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// The device returned data that makes no sense.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A characteristic value could not be decoded.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Write operation failed.
    #[error("Write failed to characteristic {uuid}: {reason}")]
    WriteFailed {
        /// The characteristic UUID.
        uuid: Uuid,
        /// The reason for the failure.
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structured reasons for connection failures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// Connection attempt timed out.
    Timeout,
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "connection timed out"),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Reason why a device was not found.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DeviceNotFoundReason {
    /// No device advertising the requested services was found.
    NoDevicesInRange,
    /// Device with the specified name/address not found.
    NotFound { identifier: String },
    /// No Bluetooth adapter available.
    NoAdapter,
}

impl std::fmt::Display for DeviceNotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDevicesInRange => write!(f, "no heart rate devices in range"),
            Self::NotFound { identifier } => write!(f, "device '{}' not found", identifier),
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
        }
    }
}

impl Error {
    /// Create a device not found error for a specific identifier.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceNotFound(DeviceNotFoundReason::NotFound {
            identifier: identifier.into(),
        })
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: Uuid, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid,
            service_count,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a connection failure for a connect attempt that ran out of time.
    pub fn connection_timeout(device_id: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            device_id: Some(device_id.into()),
            reason: ConnectionFailureReason::Timeout,
        }
    }

    /// Create a connection failure with a string reason.
    pub fn connection_failed_str(device_id: Option<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            device_id,
            reason: ConnectionFailureReason::Other(reason.into()),
        }
    }
}

/// Result type alias using heartlink-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
