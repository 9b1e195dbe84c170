//! XML serialization for DragonLink records.
//!
//! Output is accepted by [`crate::decoder::decode`]; the traffic generator
//! uses it to produce test payloads.

use crate::record::{DroneDetail, StatusRecord, TelemetryRecord, STATUS_COT_TYPE};
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;

/// Serialize a telemetry record as a CoT `<event>`.
pub fn telemetry_to_xml(record: &TelemetryRecord) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');

    xml.push_str(&format!(
        r#"<event version="2.0" uid="{}" type="{}""#,
        escape(&record.uid),
        escape(&record.cot_type)
    ));
    push_time(&mut xml, "time", record.time.as_ref());
    push_time(&mut xml, "start", record.start.as_ref());
    push_time(&mut xml, "stale", record.stale.as_ref());
    xml.push_str(&format!(r#" how="{}">"#, escape(&record.how)));

    xml.push_str(&format!(
        r#"<point lat="{}" lon="{}" hae="{}" ce="{}" le="{}"/>"#,
        record.lat, record.lon, record.hae, record.ce, record.le
    ));

    let detail = serialize_detail(&record.detail);
    if !detail.is_empty() {
        xml.push_str("<detail>");
        xml.push_str(&detail);
        xml.push_str("</detail>");
    }

    xml.push_str("</event>");
    xml
}

/// Serialize a status record using the native `<status>` vocabulary.
pub fn status_to_xml(record: &StatusRecord) -> String {
    let stats = &record.system_stats;
    let memory = &stats.memory;
    let disk = &stats.disk;

    let mut xml = format!(
        r#"<status serialNumber="{}" timestamp="{}">"#,
        escape(&record.serial_number),
        record.timestamp
    );
    xml.push_str(&format!(
        r#"<gps latitude="{}" longitude="{}" altitude="{}" speed="{}"/>"#,
        record.gps.latitude, record.gps.longitude, record.gps.altitude, record.gps.speed
    ));
    xml.push_str(&format!(
        r#"<systemStats cpuUsage="{}" temperature="{}" uptime="{}">"#,
        stats.cpu_usage, stats.temperature, stats.uptime
    ));
    xml.push_str(&format!(
        r#"<memory total="{}" available="{}" percent="{}" used="{}" free="{}" active="{}" inactive="{}" buffers="{}" cached="{}" shared="{}" slab="{}"/>"#,
        memory.total,
        memory.available,
        memory.percent,
        memory.used,
        memory.free,
        memory.active,
        memory.inactive,
        memory.buffers,
        memory.cached,
        memory.shared,
        memory.slab
    ));
    xml.push_str(&format!(
        r#"<disk total="{}" used="{}" free="{}" percent="{}"/>"#,
        disk.total, disk.used, disk.free, disk.percent
    ));
    xml.push_str("</systemStats></status>");
    xml
}

/// Serialize a status record as a `b-m-p-s-m` CoT event with the stats
/// written into `<remarks>`, the way plain-CoT kits report health.
pub fn status_to_cot_envelope(record: &StatusRecord, time: DateTime<Utc>) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    let stats = &record.system_stats;

    let remarks = format!(
        "CPU Usage: {:.1}%, Memory Total: {:.0} MB, Memory Available: {:.2} MB, \
         Disk Total: {:.0} MB, Disk Used: {:.2} MB, Temperature: {:.1}°C, Uptime: {:.0} seconds",
        stats.cpu_usage,
        stats.memory.total as f64 / MB,
        stats.memory.available as f64 / MB,
        stats.disk.total as f64 / MB,
        stats.disk.used as f64 / MB,
        stats.temperature,
        stats.uptime
    );

    let stale = time + chrono::Duration::minutes(10);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<event version="2.0" uid="{uid}" type="{ty}" time="{time}" start="{time}" stale="{stale}" how="m-g"><point lat="{lat}" lon="{lon}" hae="{hae}" ce="35.0" le="999999"/><detail><contact callsign="{uid}"/><precisionlocation geopointsrc="gps" altsrc="gps"/><remarks>{remarks}</remarks></detail></event>"#,
        uid = escape(&record.serial_number),
        ty = STATUS_COT_TYPE,
        time = time.to_rfc3339(),
        stale = stale.to_rfc3339(),
        lat = record.gps.latitude,
        lon = record.gps.longitude,
        hae = record.gps.altitude,
        remarks = escape(&remarks),
    )
}

fn push_time(xml: &mut String, name: &str, value: Option<&DateTime<Utc>>) {
    if let Some(value) = value {
        xml.push_str(&format!(r#" {}="{}""#, name, value.to_rfc3339()));
    }
}

fn serialize_detail(detail: &DroneDetail) -> String {
    let mut xml = String::new();

    if detail.device_id.is_some() || detail.id_type.is_some() {
        xml.push_str("<BasicID>");
        push_text(&mut xml, "DeviceID", detail.device_id.as_deref());
        push_text(&mut xml, "Type", detail.id_type.as_deref());
        xml.push_str("</BasicID>");
    }

    let vector = [
        ("Speed", detail.speed),
        ("VerticalSpeed", detail.vertical_speed),
        ("Altitude", detail.altitude),
        ("Height", detail.height),
    ];
    if vector.iter().any(|(_, v)| v.is_some()) {
        xml.push_str("<LocationVector>");
        for (name, value) in vector {
            if let Some(value) = value {
                xml.push_str(&format!("<{name}>{value}</{name}>"));
            }
        }
        xml.push_str("</LocationVector>");
    }

    if let Some(ref description) = detail.description {
        xml.push_str("<SelfID>");
        push_text(&mut xml, "Description", Some(description));
        xml.push_str("</SelfID>");
    }

    if let Some(pilot) = detail.pilot_location {
        xml.push_str(&format!(
            "<System><PilotLocation><lat>{}</lat><lon>{}</lon></PilotLocation></System>",
            pilot.lat, pilot.lon
        ));
    }

    if let Some(course) = detail.course {
        xml.push_str(&format!(r#"<track course="{}"/>"#, course));
    }

    push_text(&mut xml, "remarks", detail.remarks.as_deref());
    xml
}

fn push_text(xml: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        xml.push_str(&format!("<{name}>{}</{name}>", escape(value)));
    }
}
