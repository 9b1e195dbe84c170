//! Payload decoder for CoT telemetry and status messages.
//!
//! The XML path is a single streaming pass over quick-xml events. A small
//! state stack tracks which part of the document the reader is inside, and
//! attribute / text values are accumulated into builders that are validated
//! when the root element closes.

use crate::esp32;
use crate::fields::{
    epoch_seconds, lenient_f64, lenient_f64_or, lenient_timestamp, lenient_u64, parse_time,
};
use crate::record::{
    DroneDetail, GpsData, PilotLocation, Record, StatusRecord, SystemStats, TelemetryRecord,
    STATUS_COT_TYPE, UNKNOWN_ERROR,
};
use crate::remarks;
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;
use std::borrow::Cow;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("empty payload")]
    Empty,

    #[error("payload is not valid UTF-8")]
    NotUtf8,

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unknown root element <{0}>")]
    UnknownRoot(String),

    #[error("payload ended before the root element closed")]
    Truncated,

    #[error("missing identity field: {0}")]
    MissingIdentity(&'static str),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DecodeError {
    /// Short label used for metrics and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            DecodeError::Empty => "empty",
            DecodeError::NotUtf8 => "not_utf8",
            DecodeError::Xml(_) => "xml",
            DecodeError::UnknownRoot(_) => "unknown_root",
            DecodeError::Truncated => "truncated",
            DecodeError::MissingIdentity(_) => "missing_identity",
            DecodeError::MissingField(_) => "missing_field",
            DecodeError::Json(_) => "json",
        }
    }
}

/// Decodes one raw payload.
pub fn decode(payload: &[u8]) -> Result<Record, DecodeError> {
    let text = std::str::from_utf8(payload).map_err(|_| DecodeError::NotUtf8)?;
    decode_str(text)
}

/// Decodes one payload that is already text.
///
/// A payload whose first non-blank character is `{` is an ESP32 JSON report;
/// anything else is parsed as XML.
pub fn decode_str(text: &str) -> Result<Record, DecodeError> {
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if text.is_empty() {
        return Err(DecodeError::Empty);
    }

    if text.starts_with('{') {
        return esp32::decode_json(text).map(Record::Telemetry);
    }

    decode_xml(text)
}

fn decode_xml(text: &str) -> Result<Record, DecodeError> {
    let mut reader = Reader::from_reader(text.as_bytes());
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut walker = Walker::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            XmlEvent::Start(e) => walker.open(&e)?,
            XmlEvent::Empty(e) => {
                walker.open(&e)?;
                if walker.close() {
                    return walker.finish();
                }
            }
            XmlEvent::Text(t) => {
                let value = t.unescape().map_err(quick_xml::Error::from)?;
                walker.text(&value);
            }
            XmlEvent::CData(c) => {
                let raw = c.into_inner();
                walker.text(&String::from_utf8_lossy(&raw));
            }
            XmlEvent::End(_) => {
                if walker.close() {
                    return walker.finish();
                }
            }
            XmlEvent::Eof => return Err(DecodeError::Truncated),
            _ => {}
        }
        buf.clear();
    }
}

/// Where the reader currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingRoot,
    /// Inside `<event>` (including its `<detail>` subtree)
    InTelemetryElement,
    /// Inside `<status>`, either as the root or nested in `<event>`
    InStatusElement,
    InPointElement,
    /// Inside `<systemStats>`
    InStatsElement,
}

#[derive(Debug, Default)]
struct Walker {
    states: Vec<State>,
    path: Vec<String>,
    event: Option<EventBuilder>,
    status: Option<StatusBuilder>,
}

impl Walker {
    fn state(&self) -> State {
        self.states.last().copied().unwrap_or(State::AwaitingRoot)
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<(), DecodeError> {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

        let next = match self.state() {
            State::AwaitingRoot => match name.as_str() {
                "event" => {
                    self.event = Some(EventBuilder::from_element(e)?);
                    State::InTelemetryElement
                }
                "status" => {
                    self.status_builder().read_attributes(e)?;
                    State::InStatusElement
                }
                _ => return Err(DecodeError::UnknownRoot(name)),
            },
            State::InTelemetryElement => match name.as_str() {
                "point" => {
                    let point = read_point(e)?;
                    if let Some(ref mut event) = self.event {
                        event.point = Some(point);
                    }
                    State::InPointElement
                }
                "track" => {
                    if let Some(ref mut event) = self.event {
                        event.read_track(e)?;
                    }
                    State::InTelemetryElement
                }
                "status" => {
                    self.status_builder().read_attributes(e)?;
                    State::InStatusElement
                }
                _ => State::InTelemetryElement,
            },
            State::InStatusElement => match name.as_str() {
                "gps" => {
                    self.status_builder().gps = Some(read_gps(e)?);
                    State::InStatusElement
                }
                "systemStats" => {
                    read_stats(e, self.status_builder().stats_mut())?;
                    State::InStatsElement
                }
                _ => State::InStatusElement,
            },
            State::InStatsElement => {
                let stats = self.status_builder().stats_mut();
                match name.as_str() {
                    "memory" => read_memory(e, stats)?,
                    "disk" => read_disk(e, stats)?,
                    _ => {}
                }
                State::InStatsElement
            }
            State::InPointElement => State::InPointElement,
        };

        self.states.push(next);
        self.path.push(name);
        Ok(())
    }

    /// Pops one element. Returns true once the root has closed.
    fn close(&mut self) -> bool {
        self.states.pop();
        self.path.pop();
        self.path.is_empty()
    }

    fn text(&mut self, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }

        let depth = self.path.len();
        let leaf = match self.path.last() {
            Some(leaf) => leaf.as_str(),
            None => return,
        };
        let parent = if depth >= 2 {
            self.path[depth - 2].as_str()
        } else {
            ""
        };

        match self.state() {
            State::InStatusElement | State::InStatsElement => {
                let Some(status) = self.status.as_mut() else {
                    return;
                };
                match leaf {
                    "serialNumber" => status.serial = Some(value.to_string()),
                    "timestamp" => status.timestamp = Some(lenient_timestamp(value)),
                    _ => {}
                }
            }
            State::InTelemetryElement => {
                let Some(event) = self.event.as_mut() else {
                    return;
                };
                event.text(parent, leaf, value);
            }
            _ => {}
        }
    }

    fn status_builder(&mut self) -> &mut StatusBuilder {
        self.status.get_or_insert_with(StatusBuilder::default)
    }

    fn finish(self) -> Result<Record, DecodeError> {
        match (self.event, self.status) {
            (None, Some(status)) => status.build(None).map(Record::Status),
            (Some(event), Some(status)) if status.is_significant() => {
                status.build(Some(&event)).map(Record::Status)
            }
            (Some(event), _) if event.is_status_envelope() => {
                event.build_status().map(Record::Status)
            }
            (Some(event), _) => event.build().map(Record::Telemetry),
            (None, None) => Err(DecodeError::Truncated),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PointFields {
    lat: f64,
    lon: f64,
    hae: f64,
    ce: f64,
    le: f64,
    speed: Option<f64>,
}

#[derive(Debug, Default)]
struct EventBuilder {
    uid: Option<String>,
    cot_type: Option<String>,
    how: Option<String>,
    time: Option<DateTime<Utc>>,
    start: Option<DateTime<Utc>>,
    stale: Option<DateTime<Utc>>,
    point: Option<PointFields>,
    detail: DroneDetail,
    track_speed: Option<f64>,
    pilot_lat: Option<f64>,
    pilot_lon: Option<f64>,
}

impl EventBuilder {
    fn from_element(e: &BytesStart<'_>) -> Result<Self, DecodeError> {
        let mut builder = Self::default();
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let value = attr_value(&attr)?;
            match attr.key.as_ref() {
                b"uid" => builder.uid = Some(value.trim().to_string()),
                b"type" => builder.cot_type = Some(value.trim().to_string()),
                b"how" => builder.how = Some(value.into_owned()),
                b"time" => builder.time = parse_time(&value),
                b"start" => builder.start = parse_time(&value),
                b"stale" => builder.stale = parse_time(&value),
                _ => {}
            }
        }
        Ok(builder)
    }

    fn read_track(&mut self, e: &BytesStart<'_>) -> Result<(), DecodeError> {
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let value = attr_value(&attr)?;
            match attr.key.as_ref() {
                b"speed" => self.track_speed = Some(lenient_f64(&value)),
                b"course" => self.detail.course = Some(lenient_f64(&value)),
                _ => {}
            }
        }
        Ok(())
    }

    fn text(&mut self, parent: &str, leaf: &str, value: &str) {
        let detail = &mut self.detail;
        match (parent, leaf) {
            ("BasicID", "DeviceID") => detail.device_id = Some(value.to_string()),
            ("BasicID", "Type") => detail.id_type = Some(value.to_string()),
            ("LocationVector", "Speed") => detail.speed = Some(lenient_f64(value)),
            ("LocationVector", "VerticalSpeed") => detail.vertical_speed = Some(lenient_f64(value)),
            ("LocationVector", "Altitude") => detail.altitude = Some(lenient_f64(value)),
            ("LocationVector", "Height") => detail.height = Some(lenient_f64(value)),
            ("SelfID", "Description") => detail.description = Some(value.to_string()),
            ("PilotLocation", "lat") => self.pilot_lat = Some(lenient_f64(value)),
            ("PilotLocation", "lon") => self.pilot_lon = Some(lenient_f64(value)),
            (_, "remarks") => detail.remarks = Some(value.to_string()),
            _ => {}
        }
    }

    fn is_status_envelope(&self) -> bool {
        self.cot_type.as_deref() == Some(STATUS_COT_TYPE)
    }

    fn uid(&self) -> Result<String, DecodeError> {
        self.uid
            .clone()
            .filter(|uid| !uid.is_empty())
            .ok_or(DecodeError::MissingIdentity("uid"))
    }

    fn speed(&self) -> Option<f64> {
        self.detail
            .speed
            .or(self.track_speed)
            .or_else(|| self.point.and_then(|p| p.speed))
    }

    fn gps(&self) -> GpsData {
        match self.point {
            Some(point) => GpsData {
                latitude: point.lat,
                longitude: point.lon,
                altitude: point.hae,
                speed: self.speed().unwrap_or(0.0),
            },
            None => GpsData::default(),
        }
    }

    fn build(self) -> Result<TelemetryRecord, DecodeError> {
        let uid = self.uid()?;
        let speed = self.speed();
        let cot_type = self
            .cot_type
            .filter(|t| !t.is_empty())
            .ok_or(DecodeError::MissingField("type"))?;
        let point = self.point.ok_or(DecodeError::MissingField("point"))?;

        let mut detail = self.detail;
        detail.speed = speed;
        if self.pilot_lat.is_some() || self.pilot_lon.is_some() {
            detail.pilot_location = Some(PilotLocation {
                lat: self.pilot_lat.unwrap_or(0.0),
                lon: self.pilot_lon.unwrap_or(0.0),
            });
        }

        let mut record = TelemetryRecord::new(uid, cot_type, point.lat, point.lon);
        record.hae = point.hae;
        record.ce = point.ce;
        record.le = point.le;
        record.how = self.how.unwrap_or_default();
        record.time = self.time;
        record.start = self.start;
        record.stale = self.stale;
        record.detail = detail;
        Ok(record)
    }

    /// A `b-m-p-s-m` event without a stats block: the uid is the serial and
    /// the stats come from the remarks text.
    fn build_status(self) -> Result<StatusRecord, DecodeError> {
        let serial_number = self.uid()?;
        let gps = self.gps();
        Ok(StatusRecord {
            serial_number,
            timestamp: self.time.as_ref().map(epoch_seconds).unwrap_or(0.0),
            gps,
            system_stats: self
                .detail
                .remarks
                .as_deref()
                .map(remarks::parse_system_stats)
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default)]
struct StatusBuilder {
    serial: Option<String>,
    timestamp: Option<f64>,
    gps: Option<GpsData>,
    stats: Option<SystemStats>,
}

impl StatusBuilder {
    fn read_attributes(&mut self, e: &BytesStart<'_>) -> Result<(), DecodeError> {
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let value = attr_value(&attr)?;
            match attr.key.as_ref() {
                b"serialNumber" => self.serial = Some(value.trim().to_string()),
                b"timestamp" => self.timestamp = Some(lenient_timestamp(&value)),
                _ => {}
            }
        }
        Ok(())
    }

    fn stats_mut(&mut self) -> &mut SystemStats {
        self.stats.get_or_insert_with(SystemStats::default)
    }

    /// A nested `<status>` that carried none of these is a TAK-style
    /// battery element, not a health report.
    fn is_significant(&self) -> bool {
        self.serial.is_some() || self.gps.is_some() || self.stats.is_some()
    }

    fn build(self, event: Option<&EventBuilder>) -> Result<StatusRecord, DecodeError> {
        let serial_number = self
            .serial
            .filter(|s| !s.is_empty())
            .ok_or(DecodeError::MissingIdentity("serialNumber"))?;

        let timestamp = self
            .timestamp
            .or_else(|| event.and_then(|e| e.time.as_ref()).map(epoch_seconds))
            .unwrap_or(0.0);

        let gps = match (self.gps, event) {
            (Some(gps), _) => gps,
            (None, Some(event)) => event.gps(),
            (None, None) => GpsData::default(),
        };

        Ok(StatusRecord {
            serial_number,
            timestamp,
            gps,
            system_stats: self.stats.unwrap_or_default(),
        })
    }
}

fn attr_value<'a>(
    attr: &'a quick_xml::events::attributes::Attribute<'a>,
) -> Result<Cow<'a, str>, DecodeError> {
    Ok(attr.unescape_value().map_err(quick_xml::Error::from)?)
}

fn read_point(e: &BytesStart<'_>) -> Result<PointFields, DecodeError> {
    let mut point = PointFields {
        lat: 0.0,
        lon: 0.0,
        hae: 0.0,
        ce: UNKNOWN_ERROR,
        le: UNKNOWN_ERROR,
        speed: None,
    };

    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let value = attr_value(&attr)?;
        match attr.key.as_ref() {
            b"lat" => point.lat = lenient_f64(&value),
            b"lon" => point.lon = lenient_f64(&value),
            b"hae" => point.hae = lenient_f64(&value),
            b"ce" => point.ce = lenient_f64_or(&value, UNKNOWN_ERROR),
            b"le" => point.le = lenient_f64_or(&value, UNKNOWN_ERROR),
            b"speed" => point.speed = Some(lenient_f64(&value)),
            _ => {}
        }
    }

    Ok(point)
}

fn read_gps(e: &BytesStart<'_>) -> Result<GpsData, DecodeError> {
    let mut gps = GpsData::default();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let value = attr_value(&attr)?;
        match attr.key.as_ref() {
            b"latitude" => gps.latitude = lenient_f64(&value),
            b"longitude" => gps.longitude = lenient_f64(&value),
            b"altitude" => gps.altitude = lenient_f64(&value),
            b"speed" => gps.speed = lenient_f64(&value),
            _ => {}
        }
    }
    Ok(gps)
}

fn read_stats(e: &BytesStart<'_>, stats: &mut SystemStats) -> Result<(), DecodeError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let value = attr_value(&attr)?;
        match attr.key.as_ref() {
            b"cpuUsage" => stats.cpu_usage = lenient_f64(&value),
            b"temperature" => stats.temperature = lenient_f64(&value),
            b"uptime" => stats.uptime = lenient_f64(&value),
            _ => {}
        }
    }
    Ok(())
}

fn read_memory(e: &BytesStart<'_>, stats: &mut SystemStats) -> Result<(), DecodeError> {
    let memory = &mut stats.memory;
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let value = attr_value(&attr)?;
        match attr.key.as_ref() {
            b"total" => memory.total = lenient_u64(&value),
            b"available" => memory.available = lenient_u64(&value),
            b"percent" => memory.percent = lenient_f64(&value),
            b"used" => memory.used = lenient_u64(&value),
            b"free" => memory.free = lenient_u64(&value),
            b"active" => memory.active = lenient_u64(&value),
            b"inactive" => memory.inactive = lenient_u64(&value),
            b"buffers" => memory.buffers = lenient_u64(&value),
            b"cached" => memory.cached = lenient_u64(&value),
            b"shared" => memory.shared = lenient_u64(&value),
            b"slab" => memory.slab = lenient_u64(&value),
            _ => {}
        }
    }
    Ok(())
}

fn read_disk(e: &BytesStart<'_>, stats: &mut SystemStats) -> Result<(), DecodeError> {
    let disk = &mut stats.disk;
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let value = attr_value(&attr)?;
        match attr.key.as_ref() {
            b"total" => disk.total = lenient_u64(&value),
            b"used" => disk.used = lenient_u64(&value),
            b"free" => disk.free = lenient_u64(&value),
            b"percent" => disk.percent = lenient_f64(&value),
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRONE_COT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<event version="2.0" uid="drone-DRONE101" type="a-f-G-U-C" time="2024-01-15T10:30:00Z" start="2024-01-15T10:30:00Z" stale="2024-01-15T10:35:00Z" how="m-g">
    <point lat="35.1234" lon="-106.5678" hae="100" ce="9999999" le="9999999"/>
    <detail>
        <BasicID>
            <DeviceID>DRONE101</DeviceID>
            <Type>Serial Number</Type>
        </BasicID>
        <LocationVector>
            <Speed>12.5</Speed>
            <VerticalSpeed>-0.8</VerticalSpeed>
            <Altitude>230.4</Altitude>
            <Height>88.1</Height>
        </LocationVector>
        <SelfID>
            <Description>Test Drone DRONE101</Description>
        </SelfID>
        <System>
            <PilotLocation>
                <lat>35.1240</lat>
                <lon>-106.5670</lon>
            </PilotLocation>
        </System>
    </detail>
</event>"#;

    #[test]
    fn test_decode_drone_cot() {
        let record = decode_str(DRONE_COT).unwrap();
        let Record::Telemetry(t) = record else {
            panic!("expected telemetry");
        };

        assert_eq!(t.uid, "drone-DRONE101");
        assert_eq!(t.cot_type, "a-f-G-U-C");
        assert_eq!(t.lat, 35.1234);
        assert_eq!(t.lon, -106.5678);
        assert_eq!(t.hae, 100.0);
        assert_eq!(t.ce, 9_999_999.0);
        assert_eq!(t.how, "m-g");
        assert!(t.time.is_some());
        assert_eq!(t.detail.device_id.as_deref(), Some("DRONE101"));
        assert_eq!(t.detail.id_type.as_deref(), Some("Serial Number"));
        assert_eq!(t.detail.speed, Some(12.5));
        assert_eq!(t.detail.vertical_speed, Some(-0.8));
        assert_eq!(t.detail.altitude, Some(230.4));
        assert_eq!(t.detail.height, Some(88.1));
        assert_eq!(
            t.detail.description.as_deref(),
            Some("Test Drone DRONE101")
        );
        assert_eq!(
            t.detail.pilot_location,
            Some(PilotLocation {
                lat: 35.1240,
                lon: -106.5670
            })
        );
    }

    #[test]
    fn test_decode_status_root() {
        let xml = r#"<status serialNumber="wardragon-100" timestamp="1700000000">
            <gps latitude="35.0" longitude="-106.0" altitude="1500.5" speed="0.0"/>
            <systemStats cpuUsage="17.5" temperature="48.0" uptime="86400">
                <memory total="8589934592" available="4294967296" percent="50.0"/>
                <disk total="512000000000" used="128000000000" free="384000000000" percent="25.0"/>
            </systemStats>
        </status>"#;

        let Record::Status(s) = decode_str(xml).unwrap() else {
            panic!("expected status");
        };
        assert_eq!(s.serial_number, "wardragon-100");
        assert_eq!(s.timestamp, 1_700_000_000.0);
        assert_eq!(s.gps.altitude, 1500.5);
        assert_eq!(s.system_stats.cpu_usage, 17.5);
        assert_eq!(s.system_stats.memory.available, 4_294_967_296);
        assert_eq!(s.system_stats.disk.percent, 25.0);
        assert_eq!(s.system_stats.uptime, 86400.0);
    }

    #[test]
    fn test_serial_number_as_text_element() {
        let xml = r#"<status timestamp="12.5"><serialNumber> kit-7 </serialNumber></status>"#;
        let Record::Status(s) = decode_str(xml).unwrap() else {
            panic!("expected status");
        };
        assert_eq!(s.serial_number, "kit-7");
        assert_eq!(s.timestamp, 12.5);
        assert_eq!(s.system_stats, SystemStats::default());
    }

    #[test]
    fn test_status_nested_in_event() {
        let xml = r#"<event uid="ignored" type="a-f-G" time="2024-01-15T10:30:00Z">
            <point lat="10.0" lon="20.0" hae="30.0"/>
            <detail>
                <status serialNumber="kit-9">
                    <systemStats cpuUsage="5.0"/>
                </status>
            </detail>
        </event>"#;

        let Record::Status(s) = decode_str(xml).unwrap() else {
            panic!("expected status");
        };
        assert_eq!(s.serial_number, "kit-9");
        assert_eq!(s.gps.latitude, 10.0);
        assert_eq!(s.gps.altitude, 30.0);
        assert_eq!(s.timestamp, 1_705_314_600.0);
        assert_eq!(s.system_stats.cpu_usage, 5.0);
    }

    #[test]
    fn test_battery_status_stays_telemetry() {
        let xml = r#"<event uid="ANDROID-1" type="a-f-G-U-C">
            <point lat="1.0" lon="2.0"/>
            <detail><status battery="80"/><track speed="3.5" course="270"/></detail>
        </event>"#;

        let Record::Telemetry(t) = decode_str(xml).unwrap() else {
            panic!("expected telemetry");
        };
        assert_eq!(t.uid, "ANDROID-1");
        assert_eq!(t.detail.speed, Some(3.5));
        assert_eq!(t.detail.course, Some(270.0));
        assert_eq!(t.how, "");
        assert!(t.time.is_none());
    }

    #[test]
    fn test_status_envelope_from_remarks() {
        let xml = r#"<?xml version='1.0' encoding='UTF-8'?>
        <event version="2.0" uid="wardragon-100" type="b-m-p-s-m" time="2024-01-15T10:30:00.250000Z" how="m-g">
            <point lat="35.5" lon="-106.25" hae="1236" ce="35.0" le="999999"/>
            <detail>
                <contact endpoint="" phone="" callsign="wardragon-100"/>
                <remarks>CPU Usage: 22.5%, Memory Total: 8192 MB, Memory Available: 4096 MB, Disk Total: 512000 MB, Disk Used: 128000 MB, Temperature: 51.3°C, Uptime: 120 seconds</remarks>
            </detail>
        </event>"#;

        let Record::Status(s) = decode_str(xml).unwrap() else {
            panic!("expected status");
        };
        assert_eq!(s.serial_number, "wardragon-100");
        assert_eq!(s.timestamp, 1_705_314_600.25);
        assert_eq!(s.gps.latitude, 35.5);
        assert_eq!(s.gps.altitude, 1236.0);
        assert_eq!(s.system_stats.cpu_usage, 22.5);
        assert_eq!(s.system_stats.memory.total, 8192 * 1024 * 1024);
        assert_eq!(s.system_stats.temperature, 51.3);
        assert_eq!(s.system_stats.uptime, 120.0);
    }

    #[test]
    fn test_escaped_attribute() {
        let xml = r#"<event uid="a&amp;b" type="a-f-G"><point lat="1" lon="2"/></event>"#;
        let record = decode_str(xml).unwrap();
        assert_eq!(record.identity(), "a&b");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(decode(b""), Err(DecodeError::Empty)));
        assert!(matches!(decode(b"  \n "), Err(DecodeError::Empty)));
        assert!(matches!(decode(&[0xff, 0xfe, 0x3c]), Err(DecodeError::NotUtf8)));
        assert!(matches!(
            decode_str("<message uid=\"x\"/>"),
            Err(DecodeError::UnknownRoot(ref name)) if name == "message"
        ));
        assert!(matches!(
            decode_str(r#"<event type="a-f-G"><point lat="1" lon="2"/></event>"#),
            Err(DecodeError::MissingIdentity("uid"))
        ));
        assert!(matches!(
            decode_str(r#"<event uid="x"><point lat="1" lon="2"/></event>"#),
            Err(DecodeError::MissingField("type"))
        ));
        assert!(matches!(
            decode_str(r#"<event uid="x" type="a-f-G"></event>"#),
            Err(DecodeError::MissingField("point"))
        ));
        assert!(matches!(
            decode_str(r#"<status><gps latitude="1"/></status>"#),
            Err(DecodeError::MissingIdentity("serialNumber"))
        ));
        assert!(matches!(
            decode_str("<event></detail></event>"),
            Err(DecodeError::Xml(_))
        ));
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(DecodeError::Truncated.reason(), "truncated");
        assert_eq!(DecodeError::MissingField("type").reason(), "missing_field");
    }
}
