//! Merge behaviour for decoded payloads

use dragonlink_core::config::IngestConfig;
use dragonlink_cot::decode_str;
use dragonlink_store::{StoreCoordinator, StoreEvent, StoreUpdate};

fn started() -> StoreCoordinator {
    let coordinator = StoreCoordinator::new(&IngestConfig::default());
    coordinator.start();
    coordinator
}

async fn ingest(coordinator: &StoreCoordinator, payload: &str) {
    let record = decode_str(payload).expect("payload should decode");
    coordinator
        .apply(StoreUpdate::from(record))
        .await
        .expect("coordinator running");
}

#[tokio::test]
async fn test_second_report_moves_the_drone() {
    let coordinator = started();

    ingest(
        &coordinator,
        r#"<event uid="drone1" type="a-f-G-U"><point lat="10.0" lon="20.0"/></event>"#,
    )
    .await;
    ingest(
        &coordinator,
        r#"<event uid="drone1" type="a-f-G-U"><point lat="10.5" lon="20.5"/></event>"#,
    )
    .await;

    let drones = coordinator.telemetry().all();
    assert_eq!(drones.len(), 1);
    assert_eq!((drones[0].lat, drones[0].lon), (10.5, 20.5));
}

#[tokio::test]
async fn test_last_report_wins_for_each_identity() {
    let coordinator = started();

    let payloads = [
        ("a", 1.0),
        ("b", 2.0),
        ("a", 3.0),
        ("c", 4.0),
        ("b", 5.0),
        ("a", 6.0),
    ];
    for (uid, lat) in payloads {
        ingest(
            &coordinator,
            &format!(r#"<event uid="{uid}" type="a-f-G"><point lat="{lat}" lon="0"/></event>"#),
        )
        .await;
    }

    let drones = coordinator.telemetry().all();
    let summary: Vec<_> = drones.iter().map(|d| (d.uid.as_str(), d.lat)).collect();
    assert_eq!(summary, [("a", 6.0), ("b", 5.0), ("c", 4.0)]);
}

#[tokio::test]
async fn test_status_upserts_by_serial_and_notifies() {
    let coordinator = started();
    let status = coordinator.status();
    let mut events = status.subscribe();

    ingest(
        &coordinator,
        r#"<status serialNumber="wardragon-1"><systemStats cpuUsage="10"/></status>"#,
    )
    .await;
    ingest(
        &coordinator,
        r#"<status serialNumber="wardragon-1"><systemStats cpuUsage="55.5"/></status>"#,
    )
    .await;

    assert_eq!(status.len(), 1);
    assert_eq!(status.get("wardragon-1").unwrap().system_stats.cpu_usage, 55.5);

    assert!(matches!(events.try_recv(), Ok(StoreEvent::Inserted { index: 0, .. })));
    assert!(matches!(events.try_recv(), Ok(StoreEvent::Updated { index: 0, .. })));
}

#[tokio::test]
async fn test_identity_spaces_are_disjoint() {
    let coordinator = started();

    ingest(
        &coordinator,
        r#"<event uid="same" type="a-f-G"><point lat="1" lon="1"/></event>"#,
    )
    .await;
    ingest(&coordinator, r#"<status serialNumber="same"/>"#).await;

    assert_eq!(coordinator.telemetry().len(), 1);
    assert_eq!(coordinator.status().len(), 1);
}

#[tokio::test]
async fn test_rejected_payload_leaves_stores_untouched() {
    let coordinator = started();
    let mut events = coordinator.telemetry().subscribe();

    let result = decode_str(r#"<event type="a-f-G"><point lat="1" lon="1"/></event>"#);
    assert!(result.is_err());

    assert!(coordinator.telemetry().is_empty());
    assert!(events.try_recv().is_err());
}
