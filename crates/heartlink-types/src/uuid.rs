//! Bluetooth UUIDs for heart rate peripherals.
//!
//! This module contains the assigned numbers needed to talk to a Heart Rate
//! Profile device, plus the name aliases used by browser-style Bluetooth APIs
//! (`"heart_rate"`, `"heart_rate_control_point"`, ...).

use uuid::{Uuid, uuid};

use crate::error::{ParseError, ParseResult};

/// The Bluetooth base UUID (`0000xxxx-0000-1000-8000-00805f9b34fb`).
pub const BLUETOOTH_BASE_UUID: Uuid = uuid!("00000000-0000-1000-8000-00805f9b34fb");

// --- Service UUIDs ---

/// Heart Rate service.
pub const HEART_RATE_SERVICE: Uuid = uuid!("0000180d-0000-1000-8000-00805f9b34fb");

/// Generic Access Profile (GAP) service.
pub const GAP_SERVICE: Uuid = uuid!("00001800-0000-1000-8000-00805f9b34fb");

/// Device Information service.
pub const DEVICE_INFO_SERVICE: Uuid = uuid!("0000180a-0000-1000-8000-00805f9b34fb");

/// Battery service.
pub const BATTERY_SERVICE: Uuid = uuid!("0000180f-0000-1000-8000-00805f9b34fb");

// --- Heart Rate Characteristic UUIDs ---

/// Heart Rate Measurement characteristic (notify).
pub const HEART_RATE_MEASUREMENT: Uuid = uuid!("00002a37-0000-1000-8000-00805f9b34fb");

/// Body Sensor Location characteristic (read).
pub const BODY_SENSOR_LOCATION: Uuid = uuid!("00002a38-0000-1000-8000-00805f9b34fb");

/// Heart Rate Control Point characteristic.
pub const HEART_RATE_CONTROL_POINT: Uuid = uuid!("00002a39-0000-1000-8000-00805f9b34fb");

// --- Other Characteristic UUIDs ---

/// Device name characteristic.
pub const DEVICE_NAME: Uuid = uuid!("00002a00-0000-1000-8000-00805f9b34fb");

/// Battery level characteristic.
pub const BATTERY_LEVEL: Uuid = uuid!("00002a19-0000-1000-8000-00805f9b34fb");

/// Name aliases accepted by [`resolve_name`].
const ALIASES: &[(&str, Uuid)] = &[
    ("heart_rate", HEART_RATE_SERVICE),
    ("heart_rate_measurement", HEART_RATE_MEASUREMENT),
    ("body_sensor_location", BODY_SENSOR_LOCATION),
    ("heart_rate_control_point", HEART_RATE_CONTROL_POINT),
    ("generic_access", GAP_SERVICE),
    ("device_information", DEVICE_INFO_SERVICE),
    ("battery_service", BATTERY_SERVICE),
    ("battery_level", BATTERY_LEVEL),
    ("gap.device_name", DEVICE_NAME),
];

/// Expand a 16-bit assigned number into a full UUID on the Bluetooth base.
///
/// ```
/// use heartlink_types::uuid::{uuid_from_u16, HEART_RATE_SERVICE};
///
/// assert_eq!(uuid_from_u16(0x180D), HEART_RATE_SERVICE);
/// ```
#[must_use]
pub fn uuid_from_u16(short: u16) -> Uuid {
    let (high, rest) = BLUETOOTH_BASE_UUID.as_u64_pair();
    Uuid::from_u64_pair(high | ((short as u64) << 32), rest)
}

/// Return the 16-bit assigned number if `uuid` sits on the Bluetooth base.
#[must_use]
pub fn short_uuid(uuid: &Uuid) -> Option<u16> {
    let (high, rest) = uuid.as_u64_pair();
    let (base_high, base_rest) = BLUETOOTH_BASE_UUID.as_u64_pair();
    if rest != base_rest || (high & 0xFFFF_FFFF) != base_high || (high >> 48) != 0 {
        return None;
    }
    Some((high >> 32) as u16)
}

/// Resolve a GATT name, a `0x`-prefixed 16-bit number, or a full UUID string.
///
/// Names are the lowercase aliases Web Bluetooth uses, such as
/// `"heart_rate"` or `"heart_rate_control_point"`.
///
/// # Errors
///
/// Returns [`ParseError::UnknownName`] when the input matches none of the
/// accepted forms.
pub fn resolve_name(name: &str) -> ParseResult<Uuid> {
    let trimmed = name.trim();
    let lower = trimmed.to_ascii_lowercase();

    if let Some((_, uuid)) = ALIASES.iter().find(|(alias, _)| *alias == lower) {
        return Ok(*uuid);
    }

    if let Some(hex) = lower.strip_prefix("0x")
        && let Ok(short) = u16::from_str_radix(hex, 16)
    {
        return Ok(uuid_from_u16(short));
    }

    Uuid::parse_str(trimmed).map_err(|_| ParseError::UnknownName(trimmed.to_string()))
}

/// Human-readable alias for a known UUID, if any.
#[must_use]
pub fn alias_for(uuid: &Uuid) -> Option<&'static str> {
    ALIASES
        .iter()
        .find(|(_, known)| known == uuid)
        .map(|(alias, _)| *alias)
}
