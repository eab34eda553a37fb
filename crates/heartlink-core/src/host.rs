//! The host Bluetooth API seam.
//!
//! This module provides the [`BluetoothHost`] trait that abstracts over the
//! platform Bluetooth stack ([`BtleplugHost`](crate::btle::BtleplugHost)) and
//! the in-memory [`MockHost`](crate::mock::MockHost) used in tests.
//!
//! The trait mirrors the browser-style GATT contract one call per step:
//! request a device, connect to its GATT server, look up a primary service,
//! look up a characteristic, then read or write its value. Each step hands
//! back an opaque reference that the next step consumes.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

use heartlink_types::uuids::{HEART_RATE_CONTROL_POINT, HEART_RATE_SERVICE};

use crate::error::{Error, Result};

/// Default time spent looking for a device before giving up.
const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Trait abstracting the host Bluetooth stack.
///
/// # Example
///
/// ```ignore
/// use heartlink_core::{BluetoothHost, RequestOptions, Result};
///
/// async fn read_raw<H: BluetoothHost>(host: &H) -> Result<Vec<u8>> {
///     let options = RequestOptions::default();
///     let device = host.request_device(&options).await?;
///     let server = host.connect_gatt(&device).await?;
///     let service = host.primary_service(&server, options.service).await?;
///     let characteristic = host.characteristic(&service, options.characteristic).await?;
///     host.read_value(&characteristic).await
/// }
/// ```
#[async_trait]
pub trait BluetoothHost: Send + Sync {
    /// A selected (but not necessarily connected) peripheral.
    type Device: Clone + Send + Sync;
    /// A connected GATT server.
    type Server: Clone + Send + Sync;
    /// A primary service on a connected server.
    type Service: Clone + Send + Sync;
    /// A characteristic within a service.
    type Characteristic: Clone + Send + Sync;

    /// Find the first device advertising one of the filter services.
    async fn request_device(&self, options: &RequestOptions) -> Result<Self::Device>;

    /// Connect to the device's GATT server.
    async fn connect_gatt(&self, device: &Self::Device) -> Result<Self::Server>;

    /// Look up a primary service on a connected server.
    async fn primary_service(&self, server: &Self::Server, uuid: Uuid) -> Result<Self::Service>;

    /// Look up a characteristic within a service.
    async fn characteristic(
        &self,
        service: &Self::Service,
        uuid: Uuid,
    ) -> Result<Self::Characteristic>;

    /// Read the current value of a characteristic.
    async fn read_value(&self, characteristic: &Self::Characteristic) -> Result<Vec<u8>>;

    /// Write a value to a characteristic, waiting for the response.
    async fn write_value(&self, characteristic: &Self::Characteristic, data: &[u8]) -> Result<()>;

    /// Subscribe to value notifications from a characteristic.
    async fn notifications(
        &self,
        characteristic: &Self::Characteristic,
    ) -> Result<BoxStream<'static, Vec<u8>>>;

    /// Disconnect from a GATT server.
    async fn disconnect(&self, server: &Self::Server) -> Result<()>;

    /// Display label for a device.
    fn device_label(&self, device: &Self::Device) -> DeviceLabel;
}

/// Name and identifier of a selected device, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLabel {
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// Address on Linux/Windows, peripheral UUID on macOS.
    pub identifier: String,
}

impl fmt::Display for DeviceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.identifier),
            None => write!(f, "{}", self.identifier),
        }
    }
}

/// What to ask the host for when requesting a device.
///
/// The defaults target the Heart Rate service and its control point.
///
/// ```
/// use std::time::Duration;
/// use heartlink_core::RequestOptions;
///
/// let options = RequestOptions::new()
///     .identifier("Polar H10")
///     .scan_timeout(Duration::from_secs(20));
/// assert_eq!(options.identifier.as_deref(), Some("Polar H10"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Services a device must advertise to be picked.
    pub filter_services: Vec<Uuid>,
    /// Primary service to look up after connecting.
    pub service: Uuid,
    /// Characteristic to look up within `service`.
    pub characteristic: Uuid,
    /// Restrict the request to a device whose name, address or id matches.
    pub identifier: Option<String>,
    /// How long to look for a matching device.
    pub scan_timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            filter_services: vec![HEART_RATE_SERVICE],
            service: HEART_RATE_SERVICE,
            characteristic: HEART_RATE_CONTROL_POINT,
            identifier: None,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

impl RequestOptions {
    /// Create request options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept a device matching this name, address or id.
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Set the optional identifier.
    pub fn maybe_identifier(mut self, identifier: Option<String>) -> Self {
        self.identifier = identifier;
        self
    }

    /// Set the services a device must advertise.
    pub fn filter_services(mut self, services: Vec<Uuid>) -> Self {
        self.filter_services = services;
        self
    }

    /// Set the primary service to look up.
    pub fn service(mut self, uuid: Uuid) -> Self {
        self.service = uuid;
        self
    }

    /// Set the characteristic to look up.
    pub fn characteristic(mut self, uuid: Uuid) -> Self {
        self.characteristic = uuid;
        self
    }

    /// Set how long to look for a device.
    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Check the options for obvious mistakes.
    pub fn validate(&self) -> Result<()> {
        if self.filter_services.is_empty() {
            return Err(Error::invalid_config(
                "at least one filter service is required",
            ));
        }
        if self.scan_timeout.is_zero() {
            return Err(Error::invalid_config("scan timeout must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request_targets_control_point() {
        let options = RequestOptions::default();
        assert_eq!(options.filter_services, vec![HEART_RATE_SERVICE]);
        assert_eq!(options.service, HEART_RATE_SERVICE);
        assert_eq!(options.characteristic, HEART_RATE_CONTROL_POINT);
        assert!(options.identifier.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_filter() {
        let options = RequestOptions::new().filter_services(Vec::new());
        assert!(matches!(options.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let options = RequestOptions::new().scan_timeout(Duration::ZERO);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_device_label_display() {
        let named = DeviceLabel {
            name: Some("Polar H10".into()),
            identifier: "AA:BB:CC:DD:EE:FF".into(),
        };
        assert_eq!(named.to_string(), "Polar H10 (AA:BB:CC:DD:EE:FF)");

        let anonymous = DeviceLabel {
            name: None,
            identifier: "AA:BB:CC:DD:EE:FF".into(),
        };
        assert_eq!(anonymous.to_string(), "AA:BB:CC:DD:EE:FF");
    }
}
