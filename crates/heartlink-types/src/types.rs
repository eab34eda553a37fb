//! Core types for heart rate characteristic data.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Lowest heart rate the simulator and CLI accept, in beats per minute.
pub const MIN_BPM: u16 = 30;

/// Highest heart rate the simulator and CLI accept, in beats per minute.
pub const MAX_BPM: u16 = 220;

/// Number of bytes a control point value occupies on the wire.
pub const CONTROL_POINT_VALUE_BYTES: usize = 2;

/// Value held by the Heart Rate Control Point characteristic.
///
/// The value is decoded as an unsigned 16-bit big-endian integer from the
/// first two bytes of the payload. Peripherals that expose a one-byte control
/// point decode as that single byte.
///
/// ```
/// use heartlink_types::ControlPointValue;
///
/// let value = ControlPointValue::from_bytes(&[0x00, 0x48]).unwrap();
/// assert_eq!(value.get(), 72);
///
/// let single = ControlPointValue::from_bytes(&[0x01]).unwrap();
/// assert_eq!(single.get(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ControlPointValue(u16);

impl ControlPointValue {
    /// Wrap a raw control point value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Decode a control point payload.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InsufficientBytes`] if `data` is empty.
    pub fn from_bytes(data: &[u8]) -> ParseResult<Self> {
        use bytes::Buf;

        match data.len() {
            0 => Err(ParseError::insufficient(1, 0)),
            1 => Ok(Self(u16::from(data[0]))),
            _ => {
                let mut buf = &data[..CONTROL_POINT_VALUE_BYTES];
                Ok(Self(buf.get_u16()))
            }
        }
    }

    /// Encode the value as it is written to the characteristic.
    #[must_use]
    pub fn to_bytes(self) -> [u8; CONTROL_POINT_VALUE_BYTES] {
        self.0.to_be_bytes()
    }
}

impl From<u16> for ControlPointValue {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for ControlPointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A heart rate in beats per minute, validated against [`MIN_BPM`]..=[`MAX_BPM`].
///
/// ```
/// use heartlink_types::HeartRate;
///
/// let bpm = HeartRate::new(72).unwrap();
/// assert_eq!(bpm.to_bytes(), [0x00, 0x48]);
/// assert!(HeartRate::new(5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u16", into = "u16"))]
pub struct HeartRate(u16);

impl HeartRate {
    /// Create a heart rate, rejecting values outside the accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`] for values below [`MIN_BPM`] or
    /// above [`MAX_BPM`].
    pub fn new(bpm: u16) -> ParseResult<Self> {
        if !(MIN_BPM..=MAX_BPM).contains(&bpm) {
            return Err(ParseError::InvalidValue(format!(
                "heart rate {} bpm outside {}..={}",
                bpm, MIN_BPM, MAX_BPM
            )));
        }
        Ok(Self(bpm))
    }

    /// Create a heart rate, clamping into the accepted range.
    #[must_use]
    pub fn saturating(bpm: u16) -> Self {
        Self(bpm.clamp(MIN_BPM, MAX_BPM))
    }

    /// Beats per minute.
    #[must_use]
    pub const fn bpm(self) -> u16 {
        self.0
    }

    /// Encode for a control point write (two bytes, big-endian).
    #[must_use]
    pub fn to_bytes(self) -> [u8; CONTROL_POINT_VALUE_BYTES] {
        ControlPointValue::new(self.0).to_bytes()
    }
}

impl TryFrom<u16> for HeartRate {
    type Error = ParseError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HeartRate> for u16 {
    fn from(value: HeartRate) -> Self {
        value.0
    }
}

impl fmt::Display for HeartRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bpm", self.0)
    }
}

/// A control point value together with the raw payload and read time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlPointReading {
    /// Decoded value.
    pub value: ControlPointValue,
    /// Raw bytes as returned by the peripheral.
    pub raw: Vec<u8>,
    /// When the value was read.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub read_at: time::OffsetDateTime,
}

impl ControlPointReading {
    /// Decode a payload, stamping it with the current UTC time.
    ///
    /// # Errors
    ///
    /// Propagates the decode error from [`ControlPointValue::from_bytes`].
    pub fn from_bytes(raw: Vec<u8>) -> ParseResult<Self> {
        let value = ControlPointValue::from_bytes(&raw)?;
        Ok(Self {
            value,
            raw,
            read_at: time::OffsetDateTime::now_utc(),
        })
    }
}

/// Sensor contact state reported in a heart rate measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorContact {
    /// The sensor does not report contact.
    NotSupported,
    /// Supported, but no skin contact detected.
    NotDetected,
    /// Supported and in contact.
    Detected,
}

/// Location of the sensor on the body (characteristic 0x2A38).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
#[repr(u8)]
pub enum BodySensorLocation {
    Other = 0,
    Chest = 1,
    Wrist = 2,
    Finger = 3,
    Hand = 4,
    EarLobe = 5,
    Foot = 6,
}

impl BodySensorLocation {
    /// Decode the single-byte characteristic value.
    ///
    /// # Errors
    ///
    /// Returns an error on an empty payload or a reserved value (7..=255).
    pub fn from_bytes(data: &[u8]) -> ParseResult<Self> {
        let byte = *data.first().ok_or(ParseError::insufficient(1, 0))?;
        Self::try_from(byte)
    }
}

impl TryFrom<u8> for BodySensorLocation {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Other,
            1 => Self::Chest,
            2 => Self::Wrist,
            3 => Self::Finger,
            4 => Self::Hand,
            5 => Self::EarLobe,
            6 => Self::Foot,
            other => {
                return Err(ParseError::InvalidValue(format!(
                    "reserved body sensor location 0x{:02X}",
                    other
                )));
            }
        })
    }
}

impl fmt::Display for BodySensorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Other => "Other",
            Self::Chest => "Chest",
            Self::Wrist => "Wrist",
            Self::Finger => "Finger",
            Self::Hand => "Hand",
            Self::EarLobe => "Ear lobe",
            Self::Foot => "Foot",
        };
        f.write_str(label)
    }
}

// Heart Rate Measurement flags byte.
const FLAG_VALUE_U16: u8 = 0x01;
const FLAG_CONTACT_DETECTED: u8 = 0x02;
const FLAG_CONTACT_SUPPORTED: u8 = 0x04;
const FLAG_ENERGY_EXPENDED: u8 = 0x08;
const FLAG_RR_INTERVAL: u8 = 0x10;

/// A notification from the Heart Rate Measurement characteristic (0x2A37).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeartRateMeasurement {
    /// Heart rate in beats per minute.
    pub bpm: u16,
    /// Skin contact state.
    pub contact: SensorContact,
    /// Accumulated energy in kilojoules, if present.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub energy_expended: Option<u16>,
    /// RR intervals in units of 1/1024 second.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub rr_intervals: Vec<u16>,
}

impl HeartRateMeasurement {
    /// Parse a measurement notification.
    ///
    /// The layout is a flags byte followed by an 8- or 16-bit little-endian
    /// heart rate, an optional 16-bit energy value, and zero or more 16-bit
    /// RR intervals.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InsufficientBytes`] when the payload is shorter
    /// than the flags declare.
    pub fn from_bytes(data: &[u8]) -> ParseResult<Self> {
        use bytes::Buf;

        let mut buf = data;
        if buf.remaining() < 2 {
            return Err(ParseError::insufficient(2, data.len()));
        }
        let flags = buf.get_u8();

        let bpm = if flags & FLAG_VALUE_U16 != 0 {
            if buf.remaining() < 2 {
                return Err(ParseError::insufficient(3, data.len()));
            }
            buf.get_u16_le()
        } else {
            u16::from(buf.get_u8())
        };

        let contact = match (
            flags & FLAG_CONTACT_SUPPORTED != 0,
            flags & FLAG_CONTACT_DETECTED != 0,
        ) {
            (false, _) => SensorContact::NotSupported,
            (true, false) => SensorContact::NotDetected,
            (true, true) => SensorContact::Detected,
        };

        let energy_expended = if flags & FLAG_ENERGY_EXPENDED != 0 {
            if buf.remaining() < 2 {
                return Err(ParseError::insufficient(
                    data.len() - buf.remaining() + 2,
                    data.len(),
                ));
            }
            Some(buf.get_u16_le())
        } else {
            None
        };

        let mut rr_intervals = Vec::new();
        if flags & FLAG_RR_INTERVAL != 0 {
            while buf.remaining() >= 2 {
                rr_intervals.push(buf.get_u16_le());
            }
        }

        Ok(Self {
            bpm,
            contact,
            energy_expended,
            rr_intervals,
        })
    }

    /// RR intervals converted to milliseconds.
    #[must_use]
    pub fn rr_intervals_ms(&self) -> Vec<f64> {
        self.rr_intervals
            .iter()
            .map(|&rr| f64::from(rr) * 1000.0 / 1024.0)
            .collect()
    }
}
