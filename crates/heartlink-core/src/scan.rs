//! Device discovery and scanning.
//!
//! This module provides functionality to scan for heart rate peripherals
//! using Bluetooth Low Energy, and to pick the device a
//! [`RequestOptions`] describes.

use std::collections::HashMap;
use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use heartlink_types::uuids::HEART_RATE_SERVICE;

use crate::error::{DeviceNotFoundReason, Error, Result};
use crate::host::RequestOptions;
use crate::util::{create_identifier, format_peripheral_id, matches_identifier};

/// Number of scan attempts made while requesting a device.
const REQUEST_SCAN_ATTEMPTS: u32 = 3;

/// Shortest single scan attempt while requesting a device.
const MIN_ATTEMPT_DURATION: Duration = Duration::from_secs(2);

/// Information about a discovered peripheral.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    /// The advertised local name (e.g., "Polar H10 A1B2C3D4").
    pub name: Option<String>,
    /// The peripheral ID for connecting.
    pub id: PeripheralId,
    /// The BLE address as a string (may be zeros on macOS, use `identifier` instead).
    pub address: String,
    /// A connection identifier (peripheral ID on macOS, address on other platforms).
    pub identifier: String,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// Advertised service UUIDs.
    pub services: Vec<Uuid>,
    /// Whether the device advertises the Heart Rate service.
    pub has_heart_rate: bool,
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan for devices.
    pub duration: Duration,
    /// Only return devices advertising the Heart Rate service.
    pub heart_rate_only: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            heart_rate_only: true,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set scan duration in seconds.
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }

    /// Set whether to filter for heart rate devices only.
    pub fn heart_rate_only(mut self, filter: bool) -> Self {
        self.heart_rate_only = filter;
        self
    }

    /// Scan for all BLE devices, not just heart rate sensors.
    pub fn all_devices(self) -> Self {
        self.heart_rate_only(false)
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or(Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter))
}

/// Scan for heart rate devices in range.
///
/// An empty list indicates no devices were found (not an error).
///
/// # Errors
///
/// Returns an error if no Bluetooth adapter is available or the scan could
/// not be started or stopped.
pub async fn scan_for_devices() -> Result<Vec<DiscoveredDevice>> {
    scan_with_options(ScanOptions::default()).await
}

/// Scan for devices with custom options.
pub async fn scan_with_options(options: ScanOptions) -> Result<Vec<DiscoveredDevice>> {
    let adapter = get_adapter().await?;
    scan_with_adapter(&adapter, options).await
}

/// Scan for devices using a specific adapter.
///
/// Results are sorted strongest signal first.
pub async fn scan_with_adapter(
    adapter: &Adapter,
    options: ScanOptions,
) -> Result<Vec<DiscoveredDevice>> {
    info!(
        "Starting BLE scan for {} seconds...",
        options.duration.as_secs()
    );

    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let peripherals = adapter.peripherals().await?;
    let mut discovered = Vec::new();

    for peripheral in peripherals {
        match process_peripheral(&peripheral, options.heart_rate_only).await {
            Ok(Some(device)) => {
                debug!("Found device: {:?}", device.name);
                discovered.push(device);
            }
            Ok(None) => {}
            Err(e) => {
                debug!("Error processing peripheral: {}", e);
            }
        }
    }

    sort_by_signal(&mut discovered);
    info!("Scan complete. Found {} device(s)", discovered.len());
    Ok(discovered)
}

fn sort_by_signal(devices: &mut [DiscoveredDevice]) {
    devices.sort_by(|a, b| b.rssi.unwrap_or(i16::MIN).cmp(&a.rssi.unwrap_or(i16::MIN)));
}

async fn process_peripheral(
    peripheral: &Peripheral,
    heart_rate_only: bool,
) -> Result<Option<DiscoveredDevice>> {
    let Some(properties) = peripheral.properties().await? else {
        return Ok(None);
    };

    let has_heart_rate = advertises_any(&properties, &[HEART_RATE_SERVICE]);
    if heart_rate_only && !has_heart_rate {
        return Ok(None);
    }

    let id = peripheral.id();
    let address = properties.address.to_string();
    let identifier = create_identifier(&address, &id);

    Ok(Some(DiscoveredDevice {
        name: properties.local_name.clone(),
        id,
        address,
        identifier,
        rssi: properties.rssi,
        services: properties.services.clone(),
        has_heart_rate,
    }))
}

/// Whether advertised properties list any of `wanted`.
fn advertises_any(properties: &PeripheralProperties, wanted: &[Uuid]) -> bool {
    lists_any(&properties.services, &properties.service_data, wanted)
}

fn lists_any(services: &[Uuid], service_data: &HashMap<Uuid, Vec<u8>>, wanted: &[Uuid]) -> bool {
    wanted
        .iter()
        .any(|uuid| services.contains(uuid) || service_data.contains_key(uuid))
}

/// Find the peripheral a device request describes.
///
/// Known peripherals are checked first, then up to three scans of growing
/// length are made with a service filter. Without an identifier the
/// strongest device advertising one of the filter services wins.
pub(crate) async fn find_peripheral(
    adapter: &Adapter,
    options: &RequestOptions,
) -> Result<Peripheral> {
    if let Some(peripheral) = pick_known_peripheral(adapter, options).await? {
        info!("Found device in cache (no scan needed)");
        return Ok(peripheral);
    }

    let base = (options.scan_timeout / REQUEST_SCAN_ATTEMPTS).max(MIN_ATTEMPT_DURATION);
    let filter = ScanFilter {
        services: options.filter_services.clone(),
    };

    for attempt in 1..=REQUEST_SCAN_ATTEMPTS {
        let duration = base * attempt;
        info!(
            "Scan attempt {}/{} ({}s)...",
            attempt,
            REQUEST_SCAN_ATTEMPTS,
            duration.as_secs()
        );

        adapter.start_scan(filter.clone()).await?;
        sleep(duration).await;
        adapter.stop_scan().await?;

        if let Some(peripheral) = pick_known_peripheral(adapter, options).await? {
            info!("Found device on attempt {}", attempt);
            return Ok(peripheral);
        }

        if attempt < REQUEST_SCAN_ATTEMPTS {
            warn!("Device not found, retrying...");
        }
    }

    Err(match &options.identifier {
        Some(identifier) => Error::device_not_found(identifier.clone()),
        None => Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange),
    })
}

async fn pick_known_peripheral(
    adapter: &Adapter,
    options: &RequestOptions,
) -> Result<Option<Peripheral>> {
    let mut best: Option<(Peripheral, i16)> = None;

    for peripheral in adapter.peripherals().await? {
        let Ok(Some(props)) = peripheral.properties().await else {
            continue;
        };

        let matched = match &options.identifier {
            Some(identifier) => matches_identifier(
                identifier,
                props.local_name.as_deref(),
                &props.address.to_string(),
                &format_peripheral_id(&peripheral.id()),
            ),
            None => advertises_any(&props, &options.filter_services),
        };
        if !matched {
            continue;
        }

        if options.identifier.is_some() {
            debug!("Matched {:?} by identifier", props.local_name);
            return Ok(Some(peripheral));
        }

        let rssi = props.rssi.unwrap_or(i16::MIN);
        if best.as_ref().is_none_or(|(_, best_rssi)| rssi > *best_rssi) {
            best = Some((peripheral, rssi));
        }
    }

    Ok(best.map(|(peripheral, _)| peripheral))
}
