//! Output formatting utilities for text, JSON, and CSV output.

use anyhow::Result;
use heartlink_core::{
    BodySensorLocation, ControlPointReading, DeviceLabel, DiscoveredDevice, HeartRate,
    HeartRateMeasurement, hex_dump,
};
use heartlink_types::SensorContact;
use owo_colors::OwoColorize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::style;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Omit header row in CSV output.
    pub no_header: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self {
            no_color,
            ..Default::default()
        }
    }

    /// Create with no_header option for CSV output.
    pub fn with_no_header(mut self, no_header: bool) -> Self {
        self.no_header = no_header;
        self
    }

    /// Create with compact JSON option.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }
}

/// Escape a CSV field.
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| "???".to_string())
}

fn contact_label(contact: SensorContact) -> &'static str {
    match contact {
        SensorContact::NotSupported => "n/a",
        SensorContact::NotDetected => "no contact",
        SensorContact::Detected => "contact",
    }
}

// ============================================================================
// Scan formatting
// ============================================================================

#[must_use]
pub fn format_scan_text(devices: &[DiscoveredDevice], opts: &FormatOptions) -> String {
    use tabled::settings::Style;
    use tabled::{Table, Tabled};

    if devices.is_empty() {
        return "No heart rate sensors found.\n".to_string();
    }

    #[derive(Tabled)]
    struct DeviceRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Heart Rate")]
        heart_rate: String,
        #[tabled(rename = "Signal")]
        signal: String,
        #[tabled(rename = "Identifier")]
        identifier: String,
    }

    let header = if opts.no_color {
        format!("Found {} device(s)\n\n", devices.len())
    } else {
        format!(
            "Found {} device(s)\n\n",
            devices.len().to_string().green().bold()
        )
    };

    let rows: Vec<DeviceRow> = devices
        .iter()
        .map(|d| {
            let name = d.name.as_deref().unwrap_or("Unknown");
            DeviceRow {
                name: if opts.no_color {
                    name.to_string()
                } else {
                    format!("{}", name.cyan())
                },
                heart_rate: style::format_flag(d.has_heart_rate, opts.no_color),
                signal: style::format_signal_bar(d.rssi, opts.no_color),
                identifier: d.identifier.clone(),
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());

    format!("{}{}\n", header, table)
}

pub fn format_scan_json(devices: &[DiscoveredDevice], opts: &FormatOptions) -> Result<String> {
    #[derive(Serialize)]
    struct ScanResult<'a> {
        count: usize,
        devices: Vec<DeviceJson<'a>>,
    }

    #[derive(Serialize)]
    struct DeviceJson<'a> {
        name: Option<&'a str>,
        address: &'a str,
        identifier: &'a str,
        rssi: Option<i16>,
        has_heart_rate: bool,
        services: Vec<String>,
    }

    let result = ScanResult {
        count: devices.len(),
        devices: devices
            .iter()
            .map(|d| DeviceJson {
                name: d.name.as_deref(),
                address: &d.address,
                identifier: &d.identifier,
                rssi: d.rssi,
                has_heart_rate: d.has_heart_rate,
                services: d.services.iter().map(|u| u.to_string()).collect(),
            })
            .collect(),
    };

    opts.as_json(&result)
}

#[must_use]
pub fn format_scan_csv(devices: &[DiscoveredDevice], opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "name,address,identifier,rssi,has_heart_rate\n".to_string()
    };
    for device in devices {
        output.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_escape(device.name.as_deref().unwrap_or("")),
            csv_escape(&device.address),
            csv_escape(&device.identifier),
            device.rssi.map(|r| r.to_string()).unwrap_or_default(),
            device.has_heart_rate
        ));
    }
    output
}

// ============================================================================
// Control point formatting
// ============================================================================

/// A control point read with the device it came from.
#[derive(Debug, Clone, Serialize)]
pub struct ReadReport {
    pub name: Option<String>,
    pub identifier: String,
    pub control_point: u16,
    pub raw: String,
    #[serde(with = "time::serde::rfc3339")]
    pub read_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_sensor_location: Option<String>,
}

impl ReadReport {
    pub fn new(
        label: Option<&DeviceLabel>,
        reading: &ControlPointReading,
        location: Option<BodySensorLocation>,
    ) -> Self {
        Self {
            name: label.and_then(|l| l.name.clone()),
            identifier: label.map(|l| l.identifier.clone()).unwrap_or_default(),
            control_point: reading.value.get(),
            raw: hex_dump(&reading.raw),
            read_at: reading.read_at,
            body_sensor_location: location.map(|l| l.to_string()),
        }
    }
}

#[must_use]
pub fn format_read_text(report: &ReadReport, opts: &FormatOptions) -> String {
    let device = match &report.name {
        Some(name) => format!("{} ({})", name, report.identifier),
        None => report.identifier.clone(),
    };
    let value = if opts.no_color {
        report.control_point.to_string()
    } else {
        format!("{}", report.control_point.bold())
    };

    let mut output = String::new();
    output.push_str(&format!("Device:         {}\n", device));
    output.push_str(&format!("Control point:  {}\n", value));
    output.push_str(&format!("Raw:            {}\n", report.raw));
    if let Some(location) = &report.body_sensor_location {
        output.push_str(&format!("Sensor on:      {}\n", location));
    }
    output.push_str(&format!("Read at:        {}\n", timestamp(report.read_at)));
    output
}

pub fn format_read_json(report: &ReadReport, opts: &FormatOptions) -> Result<String> {
    opts.as_json(report)
}

#[must_use]
pub fn format_read_csv(report: &ReadReport, opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "name,identifier,control_point,raw,body_sensor_location,read_at\n".to_string()
    };
    output.push_str(&format!(
        "{},{},{},{},{},{}\n",
        csv_escape(report.name.as_deref().unwrap_or("")),
        csv_escape(&report.identifier),
        report.control_point,
        csv_escape(&report.raw),
        csv_escape(report.body_sensor_location.as_deref().unwrap_or("")),
        timestamp(report.read_at)
    ));
    output
}

// ============================================================================
// Watch formatting
// ============================================================================

/// One poll of the `watch` loop.
#[derive(Debug, Clone, Serialize)]
pub struct PollLine {
    pub tick: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<u16>,
    pub control_point: u16,
    #[serde(with = "time::serde::rfc3339")]
    pub read_at: OffsetDateTime,
}

impl PollLine {
    pub fn new(tick: u64, written: Option<HeartRate>, reading: &ControlPointReading) -> Self {
        Self {
            tick,
            written: written.map(HeartRate::bpm),
            control_point: reading.value.get(),
            read_at: reading.read_at,
        }
    }
}

#[must_use]
pub fn format_watch_line(line: &PollLine, opts: &FormatOptions) -> String {
    let mut parts = vec![timestamp(line.read_at), format!("#{}", line.tick)];
    if let Some(bpm) = line.written {
        parts.push(format!(
            "wrote {} bpm",
            style::format_bpm_colored(bpm, opts.no_color)
        ));
    }
    parts.push(format!("control point {}", line.control_point));
    parts.join("  ") + "\n"
}

#[must_use]
pub fn format_watch_csv_header(opts: &FormatOptions) -> String {
    if opts.no_header {
        String::new()
    } else {
        "timestamp,tick,written_bpm,control_point\n".to_string()
    }
}

#[must_use]
pub fn format_watch_csv_line(line: &PollLine) -> String {
    format!(
        "{},{},{},{}\n",
        timestamp(line.read_at),
        line.tick,
        line.written.map(|b| b.to_string()).unwrap_or_default(),
        line.control_point
    )
}

pub fn format_watch_json(line: &PollLine) -> Result<String> {
    // One object per line so the stream stays parseable.
    Ok(serde_json::to_string(line)? + "\n")
}

// ============================================================================
// Measurement formatting
// ============================================================================

#[must_use]
pub fn format_measurement_line(
    measurement: &HeartRateMeasurement,
    at: OffsetDateTime,
    opts: &FormatOptions,
) -> String {
    let mut parts = vec![
        timestamp(at),
        format!(
            "{} bpm",
            style::format_bpm_colored(measurement.bpm, opts.no_color)
        ),
        style::zone_label(measurement.bpm).to_string(),
        contact_label(measurement.contact).to_string(),
    ];
    if let Some(energy) = measurement.energy_expended {
        parts.push(format!("{} kJ", energy));
    }
    if !measurement.rr_intervals.is_empty() {
        let rr: Vec<String> = measurement
            .rr_intervals_ms()
            .iter()
            .map(|ms| format!("{:.0}", ms))
            .collect();
        parts.push(format!("RR {} ms", rr.join("/")));
    }
    parts.join("  ") + "\n"
}

#[must_use]
pub fn format_measurement_csv_header(opts: &FormatOptions) -> String {
    if opts.no_header {
        String::new()
    } else {
        "timestamp,bpm,contact,energy_kj,rr_ms\n".to_string()
    }
}

#[must_use]
pub fn format_measurement_csv_line(measurement: &HeartRateMeasurement, at: OffsetDateTime) -> String {
    let rr: Vec<String> = measurement
        .rr_intervals_ms()
        .iter()
        .map(|ms| format!("{:.1}", ms))
        .collect();
    format!(
        "{},{},{},{},{}\n",
        timestamp(at),
        measurement.bpm,
        contact_label(measurement.contact),
        measurement
            .energy_expended
            .map(|e| e.to_string())
            .unwrap_or_default(),
        csv_escape(&rr.join(" "))
    )
}

pub fn format_measurement_json(
    measurement: &HeartRateMeasurement,
    at: OffsetDateTime,
) -> Result<String> {
    #[derive(Serialize)]
    struct MeasurementJson<'a> {
        #[serde(with = "time::serde::rfc3339")]
        at: OffsetDateTime,
        #[serde(flatten)]
        measurement: &'a HeartRateMeasurement,
    }

    Ok(serde_json::to_string(&MeasurementJson { at, measurement })? + "\n")
}
