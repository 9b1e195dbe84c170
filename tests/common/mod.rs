//! Shared helpers for the end-to-end tests

#![allow(dead_code)]

use dragonlink::{IngestHandler, SessionController};
use dragonlink_core::config::{ConnectionConfig, IngestConfig};
use dragonlink_core::types::ConnectionMode;
use dragonlink_store::StoreCoordinator;
use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

pub struct Harness {
    pub coordinator: Arc<StoreCoordinator>,
    pub handler: Arc<IngestHandler>,
    pub session: SessionController,
}

impl Harness {
    pub fn new(ingest: IngestConfig) -> Self {
        let coordinator = Arc::new(StoreCoordinator::new(&ingest));
        coordinator.start();
        let handler = Arc::new(IngestHandler::new(coordinator.clone()));
        let session = SessionController::new(ingest, handler.clone());
        Self {
            coordinator,
            handler,
            session,
        }
    }
}

pub fn free_udp_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Plain UDP on loopback, listening.
pub fn loopback_config() -> ConnectionConfig {
    let mut config = ConnectionConfig::default();
    config.update_connection(ConnectionMode::Multicast, Some("127.0.0.1"));
    config.telemetry_port = free_udp_port();
    config.status_port = free_udp_port();
    config.listening = true;
    config
}

pub fn send(port: u16, payload: &str) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.send_to(payload.as_bytes(), ("127.0.0.1", port)).unwrap();
}

pub fn drone_event(uid: &str, lat: f64, lon: f64) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><event version="2.0" uid="{uid}" type="a-f-G-U-C" how="m-g"><point lat="{lat}" lon="{lon}" hae="100" ce="9999999" le="9999999"/></event>"#
    )
}

/// Polls `done` until it holds or five seconds pass.
pub async fn eventually(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        sleep(Duration::from_millis(20)).await;
    }
    done()
}
