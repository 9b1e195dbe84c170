//! Decoding tests against payloads shaped like real sensor traffic

use dragonlink_cot::{decode, decode_str, DecodeError, Record, SourceFormat};

fn telemetry(payload: &str) -> dragonlink_cot::TelemetryRecord {
    match decode_str(payload).expect("Failed to decode") {
        Record::Telemetry(t) => t,
        other => panic!("expected telemetry, got {:?}", other),
    }
}

fn status(payload: &str) -> dragonlink_cot::StatusRecord {
    match decode_str(payload).expect("Failed to decode") {
        Record::Status(s) => s,
        other => panic!("expected status, got {:?}", other),
    }
}

#[test]
fn test_status_with_partial_stats() {
    let s = status(
        r#"<status serialNumber="ABC123"><systemStats cpuUsage="42.5"><memory total="1000000"/></systemStats></status>"#,
    );

    assert_eq!(s.serial_number, "ABC123");
    assert_eq!(s.system_stats.cpu_usage, 42.5);

    let memory = s.system_stats.memory;
    assert_eq!(memory.total, 1_000_000);
    assert_eq!(memory.available, 0);
    assert_eq!(memory.used, 0);
    assert_eq!(memory.free, 0);
    assert_eq!(memory.active, 0);
    assert_eq!(memory.inactive, 0);
    assert_eq!(memory.buffers, 0);
    assert_eq!(memory.cached, 0);
    assert_eq!(memory.shared, 0);
    assert_eq!(memory.slab, 0);
    assert_eq!(memory.percent, 0.0);
}

#[test]
fn test_same_uid_decodes_to_same_identity() {
    let first = telemetry(r#"<event uid="drone1" type="a-f-G-U"><point lat="1.0" lon="2.0"/></event>"#);
    let second =
        telemetry(r#"<event uid="drone1" type="a-f-G-U"><point lat="3.5" lon="4.25"/></event>"#);

    assert_eq!(first.uid, second.uid);
    assert_eq!((second.lat, second.lon), (3.5, 4.25));
}

#[test]
fn test_decoding_is_deterministic() {
    let payload = r#"<event uid="drone-7" type="a-f-G-U-C" time="2024-01-15T10:30:00Z"><point lat="12.0" lon="13.0" hae="5"/></event>"#;
    assert_eq!(decode_str(payload).unwrap(), decode_str(payload).unwrap());
}

#[test]
fn test_unparsable_numbers_default() {
    let t = telemetry(
        r#"<event uid="drone-x" type="a-f-G"><point lat="north" lon="-106.5" hae="" ce="?" le="NaN"/></event>"#,
    );
    assert_eq!(t.lat, 0.0);
    assert_eq!(t.lon, -106.5);
    assert_eq!(t.hae, 0.0);
    assert_eq!(t.ce, 9_999_999.0);
    assert_eq!(t.le, 9_999_999.0);

    let s = status(
        r#"<status serialNumber="k1"><systemStats cpuUsage="busy" uptime="12"><memory total="-4" available="2048.9"/><disk total="1e3"/></systemStats></status>"#,
    );
    assert_eq!(s.system_stats.cpu_usage, 0.0);
    assert_eq!(s.system_stats.uptime, 12.0);
    assert_eq!(s.system_stats.memory.total, 0);
    assert_eq!(s.system_stats.memory.available, 2048);
    assert_eq!(s.system_stats.disk.total, 1000);
}

#[test]
fn test_missing_identity_is_rejected() {
    let err = decode_str(r#"<event type="a-f-G"><point lat="1" lon="2"/></event>"#).unwrap_err();
    assert!(matches!(err, DecodeError::MissingIdentity(_)));

    let err = decode_str(r#"<event uid="   " type="a-f-G"><point lat="1" lon="2"/></event>"#)
        .unwrap_err();
    assert!(matches!(err, DecodeError::MissingIdentity(_)));

    let err = decode_str(r#"<status><systemStats cpuUsage="3"/></status>"#).unwrap_err();
    assert!(matches!(err, DecodeError::MissingIdentity(_)));
}

#[test]
fn test_unknown_elements_and_attributes_ignored() {
    let t = telemetry(
        r#"<event uid="u1" type="a-f-G" flavour="mint">
            <point lat="1" lon="2" accuracy="high"/>
            <detail>
                <contact callsign="Alpha-1"/>
                <usericon iconsetpath="x/y.png"/>
                <color argb="-256"/>
                <remarks>hello &amp; goodbye</remarks>
            </detail>
        </event>"#,
    );
    assert_eq!(t.uid, "u1");
    assert_eq!(t.detail.remarks.as_deref(), Some("hello & goodbye"));
}

#[test]
fn test_truncated_payload() {
    let err = decode_str(r#"<event uid="u1" type="a-f-G"><point lat="1" lon="2"/>"#).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated | DecodeError::Xml(_)));

    let err = decode_str(r#"<event uid="u1" type="a-f-G"><point lat="1" lo"#).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated | DecodeError::Xml(_)));
}

#[test]
fn test_trailing_content_after_root_is_ignored() {
    let t = telemetry("<event uid=\"u2\" type=\"a-f-G\"><point lat=\"1\" lon=\"2\"/></event>\n\0\0");
    assert_eq!(t.uid, "u2");
}

#[test]
fn test_generator_esp32_payload() {
    let payload = br#"{"index": 0, "runtime": 0, "Basic ID": {"id": "DRONE100", "id_type": "CAA Registration ID"}, "Location/Vector Message": {"latitude": 0.0, "longitude": 0.0, "speed": 0, "vert_speed": 0, "geodetic_altitude": 0, "height_agl": 0}, "Self-ID Message": {"text": "UAV DRONE100 operational"}, "System Message": {"latitude": 0.0, "longitude": 0.0}}"#;

    let Record::Telemetry(t) = decode(payload).unwrap() else {
        panic!("expected telemetry");
    };
    assert_eq!(t.uid, "drone-DRONE100");
    assert_eq!(t.source_format, SourceFormat::Esp32Json);
    assert_eq!(t.detail.id_type.as_deref(), Some("CAA Registration ID"));
}

#[test]
fn test_not_utf8() {
    let mut payload = br#"<event uid=""#.to_vec();
    payload.extend_from_slice(&[0xc3, 0x28]);
    payload.extend_from_slice(br#"" type="a"><point lat="1" lon="1"/></event>"#);
    assert!(matches!(decode(&payload), Err(DecodeError::NotUtf8)));
}
