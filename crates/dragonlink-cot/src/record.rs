//! Decoded record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CoT default for unknown circular / linear error.
pub const UNKNOWN_ERROR: f64 = 9_999_999.0;

/// CoT type used for records that arrive without one (ESP32 JSON).
pub const DEFAULT_DRONE_TYPE: &str = "a-f-G-U";

/// CoT type of the system-status envelope emitted by WarDragon kits.
pub const STATUS_COT_TYPE: &str = "b-m-p-s-m";

/// A drone or track report, keyed by `uid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Device-supplied identity
    pub uid: String,
    /// CoT classification (e.g. "a-f-G-U-C")
    pub cot_type: String,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Height above ellipsoid in meters
    pub hae: f64,
    /// Circular error in meters
    pub ce: f64,
    /// Linear error in meters
    pub le: f64,
    /// How the position was produced (e.g. "m-g")
    pub how: String,
    pub time: Option<DateTime<Utc>>,
    pub start: Option<DateTime<Utc>>,
    pub stale: Option<DateTime<Utc>>,
    /// Remote ID fields carried in `<detail>`
    pub detail: DroneDetail,
    /// Wire shape the record was decoded from
    pub source_format: SourceFormat,
}

impl TelemetryRecord {
    /// Creates a record at the given position with every optional field empty.
    pub fn new(uid: impl Into<String>, cot_type: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            uid: uid.into(),
            cot_type: cot_type.into(),
            lat,
            lon,
            hae: 0.0,
            ce: UNKNOWN_ERROR,
            le: UNKNOWN_ERROR,
            how: String::new(),
            time: None,
            start: None,
            stale: None,
            detail: DroneDetail::default(),
            source_format: SourceFormat::CotXml,
        }
    }
}

/// Remote ID detail reported by drone receivers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DroneDetail {
    pub device_id: Option<String>,
    pub id_type: Option<String>,
    pub description: Option<String>,
    /// Ground speed in m/s
    pub speed: Option<f64>,
    pub vertical_speed: Option<f64>,
    /// Geodetic altitude in meters
    pub altitude: Option<f64>,
    /// Height above ground in meters
    pub height: Option<f64>,
    /// Course over ground in degrees, from `<track>`
    pub course: Option<f64>,
    pub remarks: Option<String>,
    pub pilot_location: Option<PilotLocation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PilotLocation {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    #[default]
    CotXml,
    Esp32Json,
}

/// Health report from a ground system, keyed by `serial_number`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub serial_number: String,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    pub gps: GpsData,
    pub system_stats: SystemStats,
}

impl StatusRecord {
    /// Creates a record with every reading zeroed.
    pub fn new(serial_number: impl Into<String>) -> Self {
        Self {
            serial_number: serial_number.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsData {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    /// CPU usage in percent
    pub cpu_usage: f64,
    pub memory: MemoryStats,
    pub disk: DiskStats,
    /// Degrees Celsius
    pub temperature: f64,
    /// Seconds since boot
    pub uptime: f64,
}

/// Memory counters in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total: u64,
    pub available: u64,
    pub percent: f64,
    pub used: u64,
    pub free: u64,
    pub active: u64,
    pub inactive: u64,
    pub buffers: u64,
    pub cached: u64,
    pub shared: u64,
    pub slab: u64,
}

/// Disk counters in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskStats {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

/// Output of a single decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Telemetry(TelemetryRecord),
    Status(StatusRecord),
}

impl Record {
    /// The identity the record is merged under.
    pub fn identity(&self) -> &str {
        match self {
            Record::Telemetry(t) => &t.uid,
            Record::Status(s) => &s.serial_number,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Record::Telemetry(_) => "telemetry",
            Record::Status(_) => "status",
        }
    }
}

impl From<TelemetryRecord> for Record {
    fn from(record: TelemetryRecord) -> Self {
        Record::Telemetry(record)
    }
}

impl From<StatusRecord> for Record {
    fn from(record: StatusRecord) -> Self {
        Record::Status(record)
    }
}
