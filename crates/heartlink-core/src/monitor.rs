//! Heart Rate Measurement notifications and Body Sensor Location.
//!
//! Both characteristics live in the same Heart Rate service as the control
//! point, so they are looked up through the cached chain of a
//! [`ConnectionHandle`].

use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, info};

use heartlink_types::uuids::{BODY_SENSOR_LOCATION, HEART_RATE_MEASUREMENT};
use heartlink_types::{BodySensorLocation, HeartRateMeasurement, hex_dump};

use crate::connection::ConnectionHandle;
use crate::error::Result;
use crate::host::{BluetoothHost, RequestOptions};

/// Subscribe to Heart Rate Measurement notifications.
///
/// Each item is one decoded notification. Malformed payloads show up as
/// `Err` items rather than ending the stream.
pub async fn subscribe_measurements<H: BluetoothHost>(
    handle: &mut ConnectionHandle<H>,
    host: &H,
    options: &RequestOptions,
) -> Result<BoxStream<'static, Result<HeartRateMeasurement>>> {
    let characteristic = handle.sibling(host, options, HEART_RATE_MEASUREMENT).await?;
    info!("Subscribing to Heart Rate Measurement notifications...");

    let stream = handle
        .check(host, host.notifications(&characteristic).await)
        .await?;

    Ok(stream
        .map(|raw| {
            debug!("Measurement notification: {}", hex_dump(&raw));
            HeartRateMeasurement::from_bytes(&raw).map_err(Into::into)
        })
        .boxed())
}

/// Read where the sensor is worn.
///
/// A failed read or an undecodable value clears the handle like any other
/// step of the chain.
pub async fn read_body_sensor_location<H: BluetoothHost>(
    handle: &mut ConnectionHandle<H>,
    host: &H,
    options: &RequestOptions,
) -> Result<BodySensorLocation> {
    let raw = handle
        .read_sibling(host, options, BODY_SENSOR_LOCATION)
        .await?;
    debug!("Body sensor location raw value: {}", hex_dump(&raw));
    let decoded: Result<BodySensorLocation> =
        BodySensorLocation::from_bytes(&raw).map_err(Into::into);
    handle.check(host, decoded).await
}
