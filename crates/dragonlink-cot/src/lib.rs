//! Decoder for DragonLink telemetry and system-status payloads.
//!
//! Drone receivers and WarDragon kits publish loosely structured
//! Cursor-on-Target XML (and, for ESP32 receivers, JSON). This crate turns
//! one raw payload into a typed [`Record`]:
//!
//! - `<event>` with a `<point>` becomes a [`TelemetryRecord`]
//! - `<status>` (as root or nested in `<event>`) becomes a [`StatusRecord`]
//! - a `b-m-p-s-m` event with stats in `<remarks>` becomes a [`StatusRecord`]
//! - a JSON object becomes a [`TelemetryRecord`] with uid `drone-<id>`
//!
//! Missing or unparsable numbers never fail a record; a missing identity
//! always does.
//!
//! # Example
//!
//! ```rust
//! use dragonlink_cot::{decode, Record};
//!
//! let xml = br#"<status serialNumber="ABC123">
//!     <systemStats cpuUsage="42.5"><memory total="1000000"/></systemStats>
//! </status>"#;
//!
//! let Record::Status(status) = decode(xml).unwrap() else { unreachable!() };
//! assert_eq!(status.serial_number, "ABC123");
//! assert_eq!(status.system_stats.cpu_usage, 42.5);
//! assert_eq!(status.system_stats.memory.total, 1_000_000);
//! assert_eq!(status.system_stats.memory.available, 0);
//! ```

pub mod decoder;
pub mod esp32;
mod fields;
pub mod record;
pub mod remarks;
pub mod serializer;

pub use decoder::{decode, decode_str, DecodeError};
pub use record::{
    DiskStats, DroneDetail, GpsData, MemoryStats, PilotLocation, Record, SourceFormat,
    StatusRecord, SystemStats, TelemetryRecord,
};
pub use serializer::{status_to_cot_envelope, status_to_xml, telemetry_to_xml};
