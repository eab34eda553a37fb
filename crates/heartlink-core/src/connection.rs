//! The memoized connection chain.
//!
//! [`ConnectionHandle`] remembers the device, GATT server, service and
//! characteristic from the last successful lookup so repeated reads and
//! writes skip discovery. The links are always filled in dependency order
//! and any failure clears all of them at once, so the next call starts the
//! chain from a clean slate.

use tracing::{debug, info, warn};
use uuid::Uuid;

use heartlink_types::{ControlPointReading, hex_dump};

use crate::error::Result;
use crate::host::{BluetoothHost, DeviceLabel, RequestOptions};

/// How far the chain has been populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Nothing selected.
    Idle,
    /// A device has been picked.
    DeviceSelected,
    /// Its GATT server is connected.
    ServerConnected,
    /// The primary service has been found.
    ServiceResolved,
    /// The characteristic has been found.
    Ready,
}

/// Cached references to the device, server, service and characteristic.
pub struct ConnectionHandle<H: BluetoothHost> {
    device: Option<H::Device>,
    server: Option<H::Server>,
    service: Option<H::Service>,
    characteristic: Option<H::Characteristic>,
}

impl<H: BluetoothHost> Default for ConnectionHandle<H> {
    fn default() -> Self {
        Self {
            device: None,
            server: None,
            service: None,
            characteristic: None,
        }
    }
}

impl<H: BluetoothHost> std::fmt::Debug for ConnectionHandle<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("stage", &self.stage())
            .finish()
    }
}

impl<H: BluetoothHost> ConnectionHandle<H> {
    /// Create an empty handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// How far the chain has been populated.
    pub fn stage(&self) -> Stage {
        match (
            &self.device,
            &self.server,
            &self.service,
            &self.characteristic,
        ) {
            (Some(_), Some(_), Some(_), Some(_)) => Stage::Ready,
            (Some(_), Some(_), Some(_), None) => Stage::ServiceResolved,
            (Some(_), Some(_), None, None) => Stage::ServerConnected,
            (Some(_), None, None, None) => Stage::DeviceSelected,
            _ => Stage::Idle,
        }
    }

    /// Whether the characteristic is cached.
    pub fn is_ready(&self) -> bool {
        self.stage() == Stage::Ready
    }

    /// Label of the selected device, if any.
    pub fn device_label(&self, host: &H) -> Option<DeviceLabel> {
        self.device.as_ref().map(|d| host.device_label(d))
    }

    /// Forget every cached reference.
    ///
    /// The GATT link is left as is; use [`disconnect`](Self::disconnect) to close it.
    pub fn reset(&mut self) {
        self.characteristic = None;
        self.service = None;
        self.server = None;
        self.device = None;
    }

    /// Make sure every link of the chain is present and return the characteristic.
    ///
    /// Only the missing links are looked up. On failure the link is closed and
    /// the handle is reset.
    pub async fn ensure_characteristic(
        &mut self,
        host: &H,
        options: &RequestOptions,
    ) -> Result<H::Characteristic> {
        let result = self.populate(host, options).await;
        self.clear_on_error(host, result).await
    }

    /// Read and decode the control point value.
    pub async fn read(
        &mut self,
        host: &H,
        options: &RequestOptions,
    ) -> Result<ControlPointReading> {
        let characteristic = self.ensure_characteristic(host, options).await?;
        info!("Reading Heart Rate Control Point...");
        let result = read_decoded(host, &characteristic).await;
        self.clear_on_error(host, result).await
    }

    /// Write raw bytes to the characteristic.
    pub async fn write(&mut self, host: &H, options: &RequestOptions, data: &[u8]) -> Result<()> {
        let characteristic = self.ensure_characteristic(host, options).await?;
        info!("Writing {} to Heart Rate Control Point...", hex_dump(data));
        let result = host.write_value(&characteristic, data).await;
        self.clear_on_error(host, result).await
    }

    /// Look up another characteristic of the cached service.
    ///
    /// The cached characteristic is left as is.
    pub async fn sibling(
        &mut self,
        host: &H,
        options: &RequestOptions,
        uuid: Uuid,
    ) -> Result<H::Characteristic> {
        self.ensure_characteristic(host, options).await?;
        let result = match &self.service {
            Some(service) => host.characteristic(service, uuid).await,
            None => Err(crate::error::Error::NotConnected),
        };
        self.clear_on_error(host, result).await
    }

    /// Read the raw value of another characteristic of the cached service.
    pub async fn read_sibling(
        &mut self,
        host: &H,
        options: &RequestOptions,
        uuid: Uuid,
    ) -> Result<Vec<u8>> {
        let characteristic = self.sibling(host, options, uuid).await?;
        let result = host.read_value(&characteristic).await;
        self.clear_on_error(host, result).await
    }

    /// Reset the handle if `result` is an error.
    ///
    /// Lets callers that decode a sibling value keep the chain consistent.
    pub async fn check<T>(&mut self, host: &H, result: Result<T>) -> Result<T> {
        self.clear_on_error(host, result).await
    }

    /// Disconnect the GATT server, if any, and forget everything.
    ///
    /// A failing disconnect is logged and otherwise ignored.
    pub async fn disconnect(&mut self, host: &H) {
        if let Some(server) = &self.server
            && let Err(e) = host.disconnect(server).await
        {
            warn!(error = %e, "Disconnect failed");
        }
        self.reset();
    }

    async fn populate(&mut self, host: &H, options: &RequestOptions) -> Result<H::Characteristic> {
        let device = match &self.device {
            Some(device) => {
                debug!("Reusing selected device");
                device.clone()
            }
            None => {
                info!("Requesting Bluetooth Device...");
                let device = host.request_device(options).await?;
                info!("Selected {}", host.device_label(&device));
                self.device = Some(device.clone());
                device
            }
        };

        let server = match &self.server {
            Some(server) => {
                debug!("Reusing GATT server");
                server.clone()
            }
            None => {
                info!("Connecting to GATT Server...");
                let server = host.connect_gatt(&device).await?;
                self.server = Some(server.clone());
                server
            }
        };

        let service = match &self.service {
            Some(service) => {
                debug!("Reusing service");
                service.clone()
            }
            None => {
                info!("Getting Heart Rate Service...");
                let service = host.primary_service(&server, options.service).await?;
                self.service = Some(service.clone());
                service
            }
        };

        match &self.characteristic {
            Some(characteristic) => {
                debug!("Reusing characteristic");
                Ok(characteristic.clone())
            }
            None => {
                info!("Getting Heart Rate Control Point Characteristic...");
                let characteristic = host.characteristic(&service, options.characteristic).await?;
                self.characteristic = Some(characteristic.clone());
                Ok(characteristic)
            }
        }
    }

    async fn clear_on_error<T>(&mut self, host: &H, result: Result<T>) -> Result<T> {
        let Err(e) = &result else {
            return result;
        };
        warn!(error = %e, stage = ?self.stage(), "Clearing connection handle");
        self.disconnect(host).await;
        result
    }
}

async fn read_decoded<H: BluetoothHost>(
    host: &H,
    characteristic: &H::Characteristic,
) -> Result<ControlPointReading> {
    let raw = host.read_value(characteristic).await?;
    debug!("Control point raw value: {}", hex_dump(&raw));
    Ok(ControlPointReading::from_bytes(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mock::{MockHost, MockStep};
    use heartlink_types::uuids::{BODY_SENSOR_LOCATION, HEART_RATE_CONTROL_POINT};

    fn options() -> RequestOptions {
        RequestOptions::default()
    }

    #[tokio::test]
    async fn test_read_populates_chain_in_order() {
        let host = MockHost::builder().control_point(&[0x00, 0x48]).build();
        let mut handle = ConnectionHandle::<MockHost>::new();
        assert_eq!(handle.stage(), Stage::Idle);

        let reading = handle.read(&host, &options()).await.unwrap();
        assert_eq!(reading.value.get(), 72);
        assert_eq!(handle.stage(), Stage::Ready);
        assert!(handle.is_ready());
    }

    #[tokio::test]
    async fn test_second_read_reuses_cached_links() {
        let host = MockHost::new();
        let mut handle = ConnectionHandle::new();

        handle.read(&host, &options()).await.unwrap();
        handle.read(&host, &options()).await.unwrap();

        assert_eq!(host.calls(MockStep::RequestDevice), 1);
        assert_eq!(host.calls(MockStep::ConnectGatt), 1);
        assert_eq!(host.calls(MockStep::PrimaryService), 1);
        assert_eq!(host.calls(MockStep::Characteristic), 1);
        assert_eq!(host.calls(MockStep::Read), 2);
    }

    #[tokio::test]
    async fn test_failure_at_each_step_resets_everything() {
        for step in [
            MockStep::RequestDevice,
            MockStep::ConnectGatt,
            MockStep::PrimaryService,
            MockStep::Characteristic,
            MockStep::Read,
        ] {
            let host = MockHost::new();
            let mut handle = ConnectionHandle::new();
            host.fail_at(step, "injected").await;

            let err = handle.read(&host, &options()).await.unwrap_err();
            assert!(err.to_string().contains("injected"), "{step:?}");
            assert_eq!(handle.stage(), Stage::Idle, "{step:?}");
        }
    }

    #[tokio::test]
    async fn test_failure_after_ready_resets_and_next_call_rediscovers() {
        let host = MockHost::new();
        let mut handle = ConnectionHandle::new();
        handle.read(&host, &options()).await.unwrap();

        host.drop_link();
        assert!(matches!(
            handle.read(&host, &options()).await,
            Err(Error::NotConnected)
        ));
        assert_eq!(handle.stage(), Stage::Idle);

        handle.read(&host, &options()).await.unwrap();
        assert_eq!(host.calls(MockStep::RequestDevice), 2);
        assert_eq!(host.calls(MockStep::ConnectGatt), 2);
    }

    #[tokio::test]
    async fn test_decode_failure_resets() {
        let host = MockHost::builder().control_point(&[]).build();
        let mut handle = ConnectionHandle::new();
        let err = handle.read(&host, &options()).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert_eq!(handle.stage(), Stage::Idle);
    }

    #[tokio::test]
    async fn test_write_then_read_back() {
        let host = MockHost::new();
        let mut handle = ConnectionHandle::new();

        handle
            .write(&host, &options(), &[0x00, 0x5A])
            .await
            .unwrap();
        let reading = handle.read(&host, &options()).await.unwrap();
        assert_eq!(reading.value.get(), 90);
        assert_eq!(host.calls(MockStep::ConnectGatt), 1);
    }

    #[tokio::test]
    async fn test_write_failure_resets() {
        let host = MockHost::new();
        let mut handle = ConnectionHandle::new();
        handle.read(&host, &options()).await.unwrap();

        host.fail_times(MockStep::Write, 1, "write rejected").await;
        assert!(handle.write(&host, &options(), &[0x00, 0x50]).await.is_err());
        assert_eq!(handle.stage(), Stage::Idle);
    }

    #[tokio::test]
    async fn test_sibling_keeps_cached_characteristic() {
        let host = MockHost::new();
        let mut handle = ConnectionHandle::new();

        let location = handle
            .sibling(&host, &options(), BODY_SENSOR_LOCATION)
            .await
            .unwrap();
        assert_eq!(location.uuid(), BODY_SENSOR_LOCATION);
        assert!(handle.is_ready());

        let cp = handle.ensure_characteristic(&host, &options()).await.unwrap();
        assert_eq!(cp.uuid(), HEART_RATE_CONTROL_POINT);
    }

    #[tokio::test]
    async fn test_disconnect_resets_and_closes_link() {
        let host = MockHost::new();
        let mut handle = ConnectionHandle::new();
        handle.read(&host, &options()).await.unwrap();
        assert!(host.is_connected());

        handle.disconnect(&host).await;
        assert!(!host.is_connected());
        assert_eq!(handle.stage(), Stage::Idle);
    }

    #[tokio::test]
    async fn test_failure_after_connect_closes_link() {
        let host = MockHost::new();
        host.fail_at(MockStep::PrimaryService, "no service").await;
        let mut handle = ConnectionHandle::new();

        assert!(handle.read(&host, &options()).await.is_err());
        assert_eq!(handle.stage(), Stage::Idle);
        assert!(!host.is_connected());
        assert_eq!(host.calls(MockStep::Disconnect), 1);
    }

    #[tokio::test]
    async fn test_missing_sibling_closes_link() {
        let host = MockHost::builder()
            .without_characteristic(BODY_SENSOR_LOCATION)
            .build();
        let mut handle = ConnectionHandle::new();
        handle.read(&host, &options()).await.unwrap();
        assert!(host.is_connected());

        let err = handle
            .read_sibling(&host, &options(), BODY_SENSOR_LOCATION)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CharacteristicNotFound { .. }), "{err:?}");
        assert_eq!(handle.stage(), Stage::Idle);
        assert!(!host.is_connected());
    }

    #[tokio::test]
    async fn test_read_sibling_failure_resets() {
        let host = MockHost::new();
        let mut handle = ConnectionHandle::new();
        handle.read(&host, &options()).await.unwrap();

        host.fail_times(MockStep::Read, 1, "read rejected").await;
        assert!(
            handle
                .read_sibling(&host, &options(), BODY_SENSOR_LOCATION)
                .await
                .is_err()
        );
        assert_eq!(handle.stage(), Stage::Idle);
    }

    #[tokio::test]
    async fn test_disconnect_when_idle_is_noop() {
        let host = MockHost::new();
        let mut handle = ConnectionHandle::<MockHost>::new();
        handle.disconnect(&host).await;
        assert_eq!(host.calls(MockStep::Disconnect), 0);
    }

    #[tokio::test]
    async fn test_device_label() {
        let host = MockHost::builder()
            .name("Polar H10")
            .address("AA:BB:CC:DD:EE:FF")
            .build();
        let mut handle = ConnectionHandle::new();
        assert!(handle.device_label(&host).is_none());

        handle.read(&host, &options()).await.unwrap();
        let label = handle.device_label(&host).unwrap();
        assert_eq!(label.name.as_deref(), Some("Polar H10"));
    }
}
