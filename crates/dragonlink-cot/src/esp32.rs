//! JSON Remote ID reports from ESP32 receivers.
//!
//! ```json
//! {
//!   "index": 12, "runtime": 340,
//!   "Basic ID": {"id": "DRONE101", "id_type": "Serial Number (ANSI/CTA-2063-A)"},
//!   "Location/Vector Message": {"latitude": 35.1, "longitude": -106.6, "speed": 12.5,
//!                               "vert_speed": 0.5, "geodetic_altitude": 120.0, "height_agl": 60.0},
//!   "Self-ID Message": {"text": "UAV DRONE101 operational"},
//!   "System Message": {"latitude": 35.1005, "longitude": -106.6004}
//! }
//! ```

use crate::decoder::DecodeError;
use crate::fields::lenient_f64;
use crate::record::{PilotLocation, SourceFormat, TelemetryRecord, DEFAULT_DRONE_TYPE};
use serde_json::Value;

const BASIC_ID: &str = "Basic ID";
const LOCATION: &str = "Location/Vector Message";
const SELF_ID: &str = "Self-ID Message";
const SYSTEM: &str = "System Message";

/// Decodes one ESP32 JSON report. The device id becomes uid `drone-<id>`.
pub fn decode_json(text: &str) -> Result<TelemetryRecord, DecodeError> {
    let value: Value = serde_json::from_str(text)?;

    let basic = value.get(BASIC_ID);
    let device_id = basic
        .and_then(|b| b.get("id"))
        .and_then(as_text)
        .filter(|id| !id.trim().is_empty())
        .ok_or(DecodeError::MissingIdentity("Basic ID.id"))?;

    let uid = if device_id.starts_with("drone-") {
        device_id.clone()
    } else {
        format!("drone-{}", device_id)
    };

    let location = value.get(LOCATION);
    let loc = |key: &str| location.and_then(|l| l.get(key)).and_then(as_number);

    let mut record = TelemetryRecord::new(
        uid,
        DEFAULT_DRONE_TYPE,
        loc("latitude").unwrap_or(0.0),
        loc("longitude").unwrap_or(0.0),
    );
    record.hae = loc("geodetic_altitude").unwrap_or(0.0);
    record.source_format = SourceFormat::Esp32Json;

    let detail = &mut record.detail;
    detail.device_id = Some(device_id);
    detail.id_type = basic.and_then(|b| b.get("id_type")).and_then(as_text);
    detail.speed = loc("speed");
    detail.vertical_speed = loc("vert_speed");
    detail.altitude = loc("geodetic_altitude");
    detail.height = loc("height_agl");
    detail.description = value
        .get(SELF_ID)
        .and_then(|s| s.get("text"))
        .and_then(as_text);

    let system = value.get(SYSTEM);
    let pilot_lat = system.and_then(|s| s.get("latitude")).and_then(as_number);
    let pilot_lon = system.and_then(|s| s.get("longitude")).and_then(as_number);
    if pilot_lat.is_some() || pilot_lon.is_some() {
        detail.pilot_location = Some(PilotLocation {
            lat: pilot_lat.unwrap_or(0.0),
            lon: pilot_lon.unwrap_or(0.0),
        });
    }

    Ok(record)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => Some(lenient_f64(s)),
        _ => None,
    }
}
