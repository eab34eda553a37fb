//! Mock host implementation for testing.
//!
//! This module provides an in-memory heart rate peripheral behind the
//! [`BluetoothHost`] trait, so connection, action and worker logic can be
//! tested without BLE hardware.
//!
//! # Features
//!
//! - **Failure injection**: Fail a specific step of the chain, always or a
//!   fixed number of times
//! - **Call counters**: Verify how many times each step ran (memoization)
//! - **Latency simulation**: Add artificial delays to every host call
//! - **Stored values**: Writes are kept and read back, notifications can be pushed

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use heartlink_types::uuids::{
    BODY_SENSOR_LOCATION, HEART_RATE_CONTROL_POINT, HEART_RATE_MEASUREMENT, HEART_RATE_SERVICE,
};

use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::host::{BluetoothHost, DeviceLabel, RequestOptions};
use crate::util::matches_identifier;

/// A step of the host Bluetooth contract, for failure injection and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockStep {
    /// [`BluetoothHost::request_device`].
    RequestDevice,
    /// [`BluetoothHost::connect_gatt`].
    ConnectGatt,
    /// [`BluetoothHost::primary_service`].
    PrimaryService,
    /// [`BluetoothHost::characteristic`].
    Characteristic,
    /// [`BluetoothHost::read_value`].
    Read,
    /// [`BluetoothHost::write_value`].
    Write,
    /// [`BluetoothHost::notifications`].
    Notifications,
    /// [`BluetoothHost::disconnect`].
    Disconnect,
}

impl MockStep {
    /// Every step, in chain order.
    pub const ALL: [MockStep; 8] = [
        MockStep::RequestDevice,
        MockStep::ConnectGatt,
        MockStep::PrimaryService,
        MockStep::Characteristic,
        MockStep::Read,
        MockStep::Write,
        MockStep::Notifications,
        MockStep::Disconnect,
    ];
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    message: String,
    /// `None` fails forever.
    remaining: Option<u32>,
}

/// Opaque device reference handed out by [`MockHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDevice {
    name: Option<String>,
    address: String,
}

/// Opaque GATT server reference handed out by [`MockHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockServer {
    address: String,
}

/// Opaque service reference handed out by [`MockHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockService {
    uuid: Uuid,
}

/// Opaque characteristic reference handed out by [`MockHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCharacteristic {
    service: Uuid,
    uuid: Uuid,
}

impl MockCharacteristic {
    /// The characteristic UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

/// A mock host with a single heart rate peripheral in range.
///
/// # Example
///
/// ```
/// use heartlink_core::{BluetoothHost, MockHost, RequestOptions};
///
/// #[tokio::main]
/// async fn main() {
///     let host = MockHost::builder().control_point(&[0x00, 0x48]).build();
///     let options = RequestOptions::default();
///
///     let device = host.request_device(&options).await.unwrap();
///     let server = host.connect_gatt(&device).await.unwrap();
///     let service = host.primary_service(&server, options.service).await.unwrap();
///     let cp = host.characteristic(&service, options.characteristic).await.unwrap();
///     assert_eq!(host.read_value(&cp).await.unwrap(), vec![0x00, 0x48]);
/// }
/// ```
pub struct MockHost {
    name: Option<String>,
    address: String,
    advertised: Vec<Uuid>,
    gatt: HashMap<Uuid, Vec<Uuid>>,
    values: RwLock<HashMap<Uuid, Vec<u8>>>,
    writes: RwLock<Vec<(Uuid, Vec<u8>)>>,
    in_range: AtomicBool,
    connected: AtomicBool,
    calls: HashMap<MockStep, AtomicU32>,
    failures: RwLock<HashMap<MockStep, InjectedFailure>>,
    /// Simulated latency in milliseconds (0 = no delay).
    latency_ms: AtomicU64,
    notify_tx: broadcast::Sender<Vec<u8>>,
}

impl std::fmt::Debug for MockHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHost")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockHost {
    fn default() -> Self {
        MockHostBuilder::default().build()
    }
}

impl MockHost {
    /// Create a mock host with a default heart rate sensor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a customised mock host.
    pub fn builder() -> MockHostBuilder {
        MockHostBuilder::default()
    }

    /// Fail every call to `step` with `message`.
    pub async fn fail_at(&self, step: MockStep, message: &str) {
        self.failures.write().await.insert(
            step,
            InjectedFailure {
                message: message.to_string(),
                remaining: None,
            },
        );
    }

    /// Fail the next `times` calls to `step`, then succeed.
    pub async fn fail_times(&self, step: MockStep, times: u32, message: &str) {
        self.failures.write().await.insert(
            step,
            InjectedFailure {
                message: message.to_string(),
                remaining: Some(times),
            },
        );
    }

    /// Remove every injected failure.
    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    /// Delay every host call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Put the peripheral in or out of range.
    pub fn set_in_range(&self, in_range: bool) {
        self.in_range.store(in_range, Ordering::Relaxed);
    }

    /// Simulate the link dropping without a disconnect call.
    pub fn drop_link(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    /// Whether a GATT connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Number of times `step` has been called.
    pub fn calls(&self, step: MockStep) -> u32 {
        self.calls
            .get(&step)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Set the stored value of a characteristic.
    pub async fn set_value(&self, uuid: Uuid, value: &[u8]) {
        self.values.write().await.insert(uuid, value.to_vec());
    }

    /// Get the stored value of a characteristic.
    pub async fn value(&self, uuid: Uuid) -> Option<Vec<u8>> {
        self.values.read().await.get(&uuid).cloned()
    }

    /// Every write received so far, oldest first.
    pub async fn writes(&self) -> Vec<(Uuid, Vec<u8>)> {
        self.writes.read().await.clone()
    }

    /// Push a notification to every subscriber. Returns the subscriber count.
    pub fn notify(&self, value: &[u8]) -> usize {
        self.notify_tx.send(value.to_vec()).unwrap_or(0)
    }

    async fn enter(&self, step: MockStep) -> Result<()> {
        if let Some(counter) = self.calls.get(&step) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        let mut failures = self.failures.write().await;
        let Some(failure) = failures.get_mut(&step) else {
            return Ok(());
        };
        let fires = match failure.remaining.as_mut() {
            None => true,
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            Some(_) => false,
        };
        let message = failure.message.clone();
        if failure.remaining == Some(0) {
            failures.remove(&step);
        }

        if fires {
            Err(Error::InvalidData(message))
        } else {
            Ok(())
        }
    }

    fn require_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }
}

#[async_trait]
impl BluetoothHost for MockHost {
    type Device = MockDevice;
    type Server = MockServer;
    type Service = MockService;
    type Characteristic = MockCharacteristic;

    async fn request_device(&self, options: &RequestOptions) -> Result<MockDevice> {
        self.enter(MockStep::RequestDevice).await?;
        options.validate()?;

        let advertises = options
            .filter_services
            .iter()
            .any(|uuid| self.advertised.contains(uuid));
        if !self.in_range.load(Ordering::Relaxed) || !advertises {
            return Err(Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange));
        }

        if let Some(identifier) = &options.identifier
            && !matches_identifier(identifier, self.name.as_deref(), &self.address, &self.address)
        {
            return Err(Error::device_not_found(identifier.clone()));
        }

        Ok(MockDevice {
            name: self.name.clone(),
            address: self.address.clone(),
        })
    }

    async fn connect_gatt(&self, device: &MockDevice) -> Result<MockServer> {
        self.enter(MockStep::ConnectGatt).await?;
        if !self.in_range.load(Ordering::Relaxed) {
            return Err(Error::connection_failed_str(
                Some(device.address.clone()),
                "device out of range",
            ));
        }
        self.connected.store(true, Ordering::Relaxed);
        Ok(MockServer {
            address: device.address.clone(),
        })
    }

    async fn primary_service(&self, _server: &MockServer, uuid: Uuid) -> Result<MockService> {
        self.enter(MockStep::PrimaryService).await?;
        self.require_connected()?;
        if self.gatt.contains_key(&uuid) {
            Ok(MockService { uuid })
        } else {
            Err(Error::ServiceNotFound { uuid })
        }
    }

    async fn characteristic(&self, service: &MockService, uuid: Uuid) -> Result<MockCharacteristic> {
        self.enter(MockStep::Characteristic).await?;
        self.require_connected()?;
        let found = self
            .gatt
            .get(&service.uuid)
            .is_some_and(|chars| chars.contains(&uuid));
        if found {
            Ok(MockCharacteristic {
                service: service.uuid,
                uuid,
            })
        } else {
            Err(Error::characteristic_not_found(uuid, self.gatt.len()))
        }
    }

    async fn read_value(&self, characteristic: &MockCharacteristic) -> Result<Vec<u8>> {
        self.enter(MockStep::Read).await?;
        self.require_connected()?;
        Ok(self
            .values
            .read()
            .await
            .get(&characteristic.uuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn write_value(&self, characteristic: &MockCharacteristic, data: &[u8]) -> Result<()> {
        self.enter(MockStep::Write).await?;
        self.require_connected()?;
        self.values
            .write()
            .await
            .insert(characteristic.uuid, data.to_vec());
        self.writes
            .write()
            .await
            .push((characteristic.uuid, data.to_vec()));
        Ok(())
    }

    async fn notifications(
        &self,
        characteristic: &MockCharacteristic,
    ) -> Result<BoxStream<'static, Vec<u8>>> {
        self.enter(MockStep::Notifications).await?;
        self.require_connected()?;
        tracing::debug!(
            service = %characteristic.service,
            characteristic = %characteristic.uuid,
            "Subscribed to mock notifications"
        );

        let rx = self.notify_tx.subscribe();
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(value) => return Some((value, rx)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(stream.boxed())
    }

    async fn disconnect(&self, _server: &MockServer) -> Result<()> {
        self.enter(MockStep::Disconnect).await?;
        self.connected.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn device_label(&self, device: &MockDevice) -> DeviceLabel {
        DeviceLabel {
            name: device.name.clone(),
            identifier: device.address.clone(),
        }
    }
}

/// Builder for creating mock hosts with custom settings.
#[derive(Debug, Clone)]
pub struct MockHostBuilder {
    name: Option<String>,
    address: Option<String>,
    advertised: Vec<Uuid>,
    gatt: HashMap<Uuid, Vec<Uuid>>,
    values: HashMap<Uuid, Vec<u8>>,
    in_range: bool,
}

impl Default for MockHostBuilder {
    fn default() -> Self {
        let mut gatt = HashMap::new();
        gatt.insert(
            HEART_RATE_SERVICE,
            vec![
                HEART_RATE_MEASUREMENT,
                BODY_SENSOR_LOCATION,
                HEART_RATE_CONTROL_POINT,
            ],
        );

        let mut values = HashMap::new();
        values.insert(HEART_RATE_CONTROL_POINT, vec![0x00, 0x00]);
        values.insert(BODY_SENSOR_LOCATION, vec![0x01]);

        Self {
            name: Some("Mock HR Sensor".to_string()),
            address: None,
            advertised: vec![HEART_RATE_SERVICE],
            gatt,
            values,
            in_range: true,
        }
    }
}

impl MockHostBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the advertised device name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Advertise no name at all.
    pub fn unnamed(mut self) -> Self {
        self.name = None;
        self
    }

    /// Set the device address.
    pub fn address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Set the advertised services.
    pub fn advertised(mut self, services: Vec<Uuid>) -> Self {
        self.advertised = services;
        self
    }

    /// Set the initial control point value.
    pub fn control_point(self, value: &[u8]) -> Self {
        self.value(HEART_RATE_CONTROL_POINT, value)
    }

    /// Set the initial value of any characteristic.
    pub fn value(mut self, uuid: Uuid, value: &[u8]) -> Self {
        self.values.insert(uuid, value.to_vec());
        self
    }

    /// Remove a service from the GATT table.
    pub fn without_service(mut self, uuid: Uuid) -> Self {
        self.gatt.remove(&uuid);
        self
    }

    /// Remove a characteristic from every service.
    pub fn without_characteristic(mut self, uuid: Uuid) -> Self {
        for chars in self.gatt.values_mut() {
            chars.retain(|c| *c != uuid);
        }
        self
    }

    /// Start with the peripheral out of range.
    pub fn out_of_range(mut self) -> Self {
        self.in_range = false;
        self
    }

    /// Build the mock host.
    pub fn build(self) -> MockHost {
        let (notify_tx, _) = broadcast::channel(64);
        MockHost {
            name: self.name,
            address: self
                .address
                .unwrap_or_else(|| format!("MOCK-{:06X}", rand::random::<u32>() % 0xFFFFFF)),
            advertised: self.advertised,
            gatt: self.gatt,
            values: RwLock::new(self.values),
            writes: RwLock::new(Vec::new()),
            in_range: AtomicBool::new(self.in_range),
            connected: AtomicBool::new(false),
            calls: MockStep::ALL
                .iter()
                .map(|step| (*step, AtomicU32::new(0)))
                .collect(),
            failures: RwLock::new(HashMap::new()),
            latency_ms: AtomicU64::new(0),
            notify_tx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_control_point(host: &MockHost) -> Result<(MockServer, MockCharacteristic)> {
        let options = RequestOptions::default();
        let device = host.request_device(&options).await?;
        let server = host.connect_gatt(&device).await?;
        let service = host.primary_service(&server, options.service).await?;
        let cp = host.characteristic(&service, options.characteristic).await?;
        Ok((server, cp))
    }

    #[tokio::test]
    async fn test_mock_chain_and_read() {
        let host = MockHost::builder().control_point(&[0x00, 0x48]).build();
        let (_, cp) = open_control_point(&host).await.unwrap();
        assert!(host.is_connected());
        assert_eq!(host.read_value(&cp).await.unwrap(), vec![0x00, 0x48]);
    }

    #[tokio::test]
    async fn test_mock_write_is_read_back() {
        let host = MockHost::new();
        let (_, cp) = open_control_point(&host).await.unwrap();
        host.write_value(&cp, &[0x00, 0x50]).await.unwrap();
        assert_eq!(host.read_value(&cp).await.unwrap(), vec![0x00, 0x50]);
        assert_eq!(
            host.writes().await,
            vec![(HEART_RATE_CONTROL_POINT, vec![0x00, 0x50])]
        );
    }

    #[tokio::test]
    async fn test_mock_out_of_range() {
        let host = MockHost::builder().out_of_range().build();
        let err = host
            .request_device(&RequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange)
        ));
    }

    #[tokio::test]
    async fn test_mock_identifier_mismatch() {
        let host = MockHost::builder().name("Polar H10").build();
        let options = RequestOptions::new().identifier("Wahoo TICKR");
        let err = host.request_device(&options).await.unwrap_err();
        assert!(err.to_string().contains("Wahoo TICKR"));

        let options = RequestOptions::new().identifier("polar");
        assert!(host.request_device(&options).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_missing_service() {
        let host = MockHost::builder()
            .without_service(HEART_RATE_SERVICE)
            .build();
        let err = open_control_point(&host).await.unwrap_err();
        assert!(matches!(err, Error::ServiceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_mock_missing_characteristic() {
        let host = MockHost::builder()
            .without_characteristic(HEART_RATE_CONTROL_POINT)
            .build();
        let err = open_control_point(&host).await.unwrap_err();
        assert!(matches!(err, Error::CharacteristicNotFound { .. }));
    }

    #[tokio::test]
    async fn test_mock_fail_at() {
        let host = MockHost::new();
        host.fail_at(MockStep::ConnectGatt, "GATT Server is disconnected")
            .await;
        let err = open_control_point(&host).await.unwrap_err();
        assert!(err.to_string().contains("GATT Server is disconnected"));

        host.clear_failures().await;
        assert!(open_control_point(&host).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_fail_times() {
        let host = MockHost::new();
        host.fail_times(MockStep::Read, 2, "busy").await;
        let (_, cp) = open_control_point(&host).await.unwrap();

        assert!(host.read_value(&cp).await.is_err());
        assert!(host.read_value(&cp).await.is_err());
        assert!(host.read_value(&cp).await.is_ok());
        assert_eq!(host.calls(MockStep::Read), 3);
    }

    #[tokio::test]
    async fn test_mock_read_after_link_drop() {
        let host = MockHost::new();
        let (_, cp) = open_control_point(&host).await.unwrap();
        host.drop_link();
        assert!(matches!(
            host.read_value(&cp).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_mock_disconnect() {
        let host = MockHost::new();
        let (server, _) = open_control_point(&host).await.unwrap();
        host.disconnect(&server).await.unwrap();
        assert!(!host.is_connected());
        assert_eq!(host.calls(MockStep::Disconnect), 1);
    }

    #[tokio::test]
    async fn test_mock_notifications() {
        let host = MockHost::new();
        let options = RequestOptions::default();
        let device = host.request_device(&options).await.unwrap();
        let server = host.connect_gatt(&device).await.unwrap();
        let service = host.primary_service(&server, HEART_RATE_SERVICE).await.unwrap();
        let measurement = host
            .characteristic(&service, HEART_RATE_MEASUREMENT)
            .await
            .unwrap();

        let mut stream = host.notifications(&measurement).await.unwrap();
        assert_eq!(host.notify(&[0x00, 72]), 1);
        assert_eq!(stream.next().await, Some(vec![0x00, 72]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_latency() {
        let host = MockHost::new();
        host.set_latency(Duration::from_millis(250));
        let start = tokio::time::Instant::now();
        host.request_device(&RequestOptions::default())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn test_device_label() {
        let host = MockHost::builder()
            .name("Polar H10")
            .address("AA:BB:CC:DD:EE:FF")
            .build();
        let device = MockDevice {
            name: Some("Polar H10".into()),
            address: "AA:BB:CC:DD:EE:FF".into(),
        };
        assert_eq!(
            host.device_label(&device).to_string(),
            "Polar H10 (AA:BB:CC:DD:EE:FF)"
        );
    }
}
