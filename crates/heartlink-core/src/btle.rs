//! [`BluetoothHost`] over the platform Bluetooth stack via `btleplug`.

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, Service, WriteType};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::time::timeout;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::host::{BluetoothHost, DeviceLabel, RequestOptions};
use crate::scan::{find_peripheral, get_adapter};
use crate::util::{create_identifier, format_peripheral_id};

/// Default timeout for establishing a BLE connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for BLE read operations.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE write operations.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for service discovery after connecting.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for BLE connection timeouts.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use heartlink_core::btle::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connection_timeout(Duration::from_secs(20))
///     .read_timeout(Duration::from_secs(5));
/// assert_eq!(config.read_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for establishing a BLE connection.
    pub connection_timeout: Duration,
    /// Timeout for BLE read operations.
    pub read_timeout: Duration,
    /// Timeout for BLE write operations.
    pub write_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }
}

/// A selected peripheral.
#[derive(Debug, Clone)]
pub struct BtleDevice {
    peripheral: Peripheral,
    label: DeviceLabel,
}

/// A peripheral whose GATT services have been discovered.
#[derive(Debug, Clone)]
pub struct BtleServer {
    peripheral: Peripheral,
}

/// A primary service on a connected peripheral.
#[derive(Debug, Clone)]
pub struct BtleService {
    peripheral: Peripheral,
    service: Service,
    service_count: usize,
}

/// A characteristic on a connected peripheral.
#[derive(Debug, Clone)]
pub struct BtleCharacteristic {
    peripheral: Peripheral,
    characteristic: Characteristic,
}

/// Host backed by the first Bluetooth adapter on this machine.
pub struct BtleplugHost {
    adapter: Adapter,
    config: ConnectionConfig,
}

impl BtleplugHost {
    /// Open the first available adapter with default timeouts.
    pub async fn new() -> Result<Self> {
        Self::with_config(ConnectionConfig::default()).await
    }

    /// Open the first available adapter with custom timeouts.
    pub async fn with_config(config: ConnectionConfig) -> Result<Self> {
        let adapter = get_adapter().await?;
        Ok(Self { adapter, config })
    }

    /// Use an adapter the caller already holds.
    pub fn from_adapter(adapter: Adapter, config: ConnectionConfig) -> Self {
        Self { adapter, config }
    }

    /// Get the current connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[async_trait]
impl BluetoothHost for BtleplugHost {
    type Device = BtleDevice;
    type Server = BtleServer;
    type Service = BtleService;
    type Characteristic = BtleCharacteristic;

    #[tracing::instrument(level = "info", skip_all, fields(identifier = ?options.identifier))]
    async fn request_device(&self, options: &RequestOptions) -> Result<BtleDevice> {
        options.validate()?;
        let peripheral = find_peripheral(&self.adapter, options).await?;

        let properties = peripheral.properties().await?;
        let name = properties.as_ref().and_then(|p| p.local_name.clone());
        let identifier = properties
            .as_ref()
            .map(|p| create_identifier(&p.address.to_string(), &peripheral.id()))
            .unwrap_or_else(|| format_peripheral_id(&peripheral.id()));

        Ok(BtleDevice {
            peripheral,
            label: DeviceLabel { name, identifier },
        })
    }

    #[tracing::instrument(level = "info", skip_all, fields(device = %device.label))]
    async fn connect_gatt(&self, device: &BtleDevice) -> Result<BtleServer> {
        let peripheral = device.peripheral.clone();

        if peripheral.is_connected().await.unwrap_or(false) {
            debug!("Peripheral already connected");
        } else {
            timeout(self.config.connection_timeout, peripheral.connect())
                .await
                .map_err(|_| Error::connection_timeout(device.label.identifier.clone()))??;
            info!("Connected!");
        }

        timeout(self.config.discovery_timeout, peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", self.config.discovery_timeout))??;

        for service in peripheral.services() {
            debug!("  Service: {}", service.uuid);
            for characteristic in &service.characteristics {
                debug!("    Characteristic: {}", characteristic.uuid);
            }
        }

        Ok(BtleServer { peripheral })
    }

    async fn primary_service(&self, server: &BtleServer, uuid: Uuid) -> Result<BtleService> {
        let services = server.peripheral.services();
        let service_count = services.len();
        services
            .into_iter()
            .find(|s| s.uuid == uuid && s.primary)
            .map(|service| BtleService {
                peripheral: server.peripheral.clone(),
                service,
                service_count,
            })
            .ok_or(Error::ServiceNotFound { uuid })
    }

    async fn characteristic(&self, service: &BtleService, uuid: Uuid) -> Result<BtleCharacteristic> {
        service
            .service
            .characteristics
            .iter()
            .find(|c| c.uuid == uuid)
            .map(|characteristic| BtleCharacteristic {
                peripheral: service.peripheral.clone(),
                characteristic: characteristic.clone(),
            })
            .ok_or(Error::characteristic_not_found(uuid, service.service_count))
    }

    async fn read_value(&self, characteristic: &BtleCharacteristic) -> Result<Vec<u8>> {
        let uuid = characteristic.characteristic.uuid;
        let data = timeout(
            self.config.read_timeout,
            characteristic.peripheral.read(&characteristic.characteristic),
        )
        .await
        .map_err(|_| Error::timeout(format!("read characteristic {}", uuid), self.config.read_timeout))??;
        Ok(data)
    }

    async fn write_value(&self, characteristic: &BtleCharacteristic, data: &[u8]) -> Result<()> {
        let uuid = characteristic.characteristic.uuid;
        timeout(
            self.config.write_timeout,
            characteristic.peripheral.write(
                &characteristic.characteristic,
                data,
                WriteType::WithResponse,
            ),
        )
        .await
        .map_err(|_| Error::timeout(format!("write characteristic {}", uuid), self.config.write_timeout))?
        .map_err(|e| Error::WriteFailed {
            uuid,
            reason: e.to_string(),
        })
    }

    async fn notifications(
        &self,
        characteristic: &BtleCharacteristic,
    ) -> Result<BoxStream<'static, Vec<u8>>> {
        let uuid = characteristic.characteristic.uuid;
        characteristic
            .peripheral
            .subscribe(&characteristic.characteristic)
            .await?;

        let stream = characteristic.peripheral.notifications().await?;
        Ok(stream
            .filter(move |n| futures::future::ready(n.uuid == uuid))
            .map(|n| n.value)
            .boxed())
    }

    async fn disconnect(&self, server: &BtleServer) -> Result<()> {
        info!("Disconnecting from device...");
        server.peripheral.disconnect().await?;
        Ok(())
    }

    fn device_label(&self, device: &BtleDevice) -> DeviceLabel {
        device.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.connection_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.read_timeout, DEFAULT_READ_TIMEOUT);
        assert_eq!(config.write_timeout, DEFAULT_WRITE_TIMEOUT);
        assert_eq!(config.discovery_timeout, DEFAULT_DISCOVERY_TIMEOUT);
    }

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::new()
            .connection_timeout(Duration::from_secs(30))
            .write_timeout(Duration::from_secs(2))
            .discovery_timeout(Duration::from_secs(20));
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
        assert_eq!(config.write_timeout, Duration::from_secs(2));
        assert_eq!(config.discovery_timeout, Duration::from_secs(20));
        assert_eq!(config.read_timeout, DEFAULT_READ_TIMEOUT);
    }
}
