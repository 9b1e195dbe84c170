//! Loopback tests for the transport manager

use async_trait::async_trait;
use dragonlink_client::{Channel, InboundPayload, PayloadHandler, TransportKind, TransportManager};
use dragonlink_core::config::{ConnectionConfig, IngestConfig};
use dragonlink_core::types::{ConnectionMode, EndpointPair, TransportTarget};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[derive(Default)]
struct Collector {
    seen: Mutex<Vec<(Channel, TransportKind, String)>>,
}

impl Collector {
    fn texts(&self, channel: Channel) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _, _)| *c == channel)
            .map(|(_, _, text)| text.clone())
            .collect()
    }

    fn has(&self, channel: Channel, transport: TransportKind) -> bool {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .any(|(c, t, _)| *c == channel && *t == transport)
    }

    fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl PayloadHandler for Collector {
    async fn on_telemetry(&self, payload: InboundPayload) {
        self.seen
            .lock()
            .unwrap()
            .push((payload.channel, payload.transport, payload.text));
    }

    async fn on_status(&self, payload: InboundPayload) {
        self.seen
            .lock()
            .unwrap()
            .push((payload.channel, payload.transport, payload.text));
    }
}

fn free_udp_port() -> u16 {
    std::net::UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        sleep(Duration::from_millis(20)).await;
    }
    done()
}

fn bind_publisher(context: &zmq::Context) -> (zmq::Socket, u16) {
    let publisher = context.socket(zmq::PUB).unwrap();
    publisher.bind("tcp://127.0.0.1:*").unwrap();
    let endpoint = publisher.get_last_endpoint().unwrap().unwrap();
    let port = endpoint.rsplit(':').next().unwrap().parse().unwrap();
    (publisher, port)
}

#[tokio::test]
async fn test_udp_channels_are_routed_in_order() {
    let telemetry_port = free_udp_port();
    let status_port = free_udp_port();
    let target =
        TransportTarget::multicast(EndpointPair::new("127.0.0.1", telemetry_port, status_port));

    let mut manager = TransportManager::new(IngestConfig::default());
    manager.connect(&target).unwrap();

    let collector = Arc::new(Collector::default());
    manager.start_receiving(collector.clone()).unwrap();

    let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    for i in 0..5 {
        sender
            .send_to(format!("t{}", i).as_bytes(), ("127.0.0.1", telemetry_port))
            .unwrap();
    }
    sender.send_to(b"s0", ("127.0.0.1", status_port)).unwrap();

    assert!(wait_for(|| collector.texts(Channel::Telemetry).len() == 5
        && collector.texts(Channel::Status).len() == 1)
    .await);

    assert_eq!(collector.texts(Channel::Telemetry), ["t0", "t1", "t2", "t3", "t4"]);
    assert_eq!(collector.texts(Channel::Status), ["s0"]);

    let totals = manager.metrics(Some(TransportKind::Multicast));
    assert_eq!(totals.messages_received, 6);

    manager.disconnect().await;
    assert!(!manager.is_connected());

    // Ports are free again after disconnect
    std::net::UdpSocket::bind(("127.0.0.1", telemetry_port)).unwrap();
    std::net::UdpSocket::bind(("127.0.0.1", status_port)).unwrap();
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let target = TransportTarget::multicast(EndpointPair::new(
        "127.0.0.1",
        free_udp_port(),
        free_udp_port(),
    ));
    let mut manager = TransportManager::new(IngestConfig::default());

    for _ in 0..3 {
        manager.connect(&target).unwrap();
        manager
            .start_receiving(Arc::new(Collector::default()))
            .unwrap();
        manager.disconnect().await;
    }
    assert!(manager.target().is_none());
}

#[tokio::test]
async fn test_zmq_subscriber_receives_publisher_messages() {
    let context = zmq::Context::new();
    let (telemetry_pub, telemetry_port) = bind_publisher(&context);
    let (status_pub, status_port) = bind_publisher(&context);

    let config = IngestConfig {
        zmq_poll_interval_ms: 20,
        ..IngestConfig::default()
    };
    let mut manager = TransportManager::new(config);
    let target =
        TransportTarget::direct(EndpointPair::new("127.0.0.1", telemetry_port, status_port));
    manager.connect(&target).unwrap();

    let collector = Arc::new(Collector::default());
    manager.start_receiving(collector.clone()).unwrap();

    // PUB drops messages until the subscription has propagated
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline
        && (collector.texts(Channel::Telemetry).is_empty()
            || collector.texts(Channel::Status).is_empty())
    {
        telemetry_pub.send("telemetry", 0).unwrap();
        status_pub.send_multipart(["topic", "status"], 0).unwrap();
        telemetry_pub.send(&[0xffu8, 0xfe][..], 0).unwrap();
        sleep(Duration::from_millis(50)).await;
    }

    assert!(collector
        .texts(Channel::Telemetry)
        .iter()
        .all(|text| text == "telemetry"));
    assert!(!collector.texts(Channel::Telemetry).is_empty());
    // Topic frame is stripped
    assert!(collector.texts(Channel::Status).iter().all(|text| text == "status"));
    assert!(!collector.texts(Channel::Status).is_empty());

    assert!(collector
        .seen
        .lock()
        .unwrap()
        .iter()
        .all(|(_, transport, _)| *transport == TransportKind::DirectSocket));

    manager.disconnect().await;
    assert!(manager.failed_listeners().is_empty());
}

#[tokio::test]
async fn test_both_mode_delivers_from_all_sockets() {
    let context = zmq::Context::new();
    let (telemetry_pub, zmq_telemetry_port) = bind_publisher(&context);
    let (status_pub, status_port) = bind_publisher(&context);

    // UDP and ZMQ share the status port number on different protocols
    let mut config = ConnectionConfig::default();
    config.update_connection(ConnectionMode::Both, Some("127.0.0.1"));
    config.telemetry_port = free_udp_port();
    config.zmq_telemetry_port = zmq_telemetry_port;
    config.status_port = status_port;
    config.validate().unwrap();

    let mut manager = TransportManager::new(IngestConfig {
        zmq_poll_interval_ms: 20,
        ..IngestConfig::default()
    });
    manager.connect(&config.target()).unwrap();
    assert_eq!(manager.listener_states().len(), 4);

    let collector = Arc::new(Collector::default());
    manager.start_receiving(collector.clone()).unwrap();

    let all_seen = || {
        [Channel::Telemetry, Channel::Status].iter().all(|&channel| {
            collector.has(channel, TransportKind::Multicast)
                && collector.has(channel, TransportKind::DirectSocket)
        })
    };

    let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !all_seen() && Instant::now() < deadline {
        sender
            .send_to(b"udp-telemetry", ("127.0.0.1", config.telemetry_port))
            .unwrap();
        sender
            .send_to(b"udp-status", ("127.0.0.1", config.status_port))
            .unwrap();
        telemetry_pub.send("zmq-telemetry", 0).unwrap();
        status_pub.send("zmq-status", 0).unwrap();
        sleep(Duration::from_millis(50)).await;
    }
    assert!(all_seen());

    for (channel, transport, text) in collector.seen.lock().unwrap().iter() {
        let expected = match (transport, channel) {
            (TransportKind::Multicast, Channel::Telemetry) => "udp-telemetry",
            (TransportKind::Multicast, Channel::Status) => "udp-status",
            (TransportKind::DirectSocket, Channel::Telemetry) => "zmq-telemetry",
            (TransportKind::DirectSocket, Channel::Status) => "zmq-status",
        };
        assert_eq!(text, expected);
    }

    assert!(manager.metrics(Some(TransportKind::Multicast)).messages_received >= 2);
    assert!(manager.metrics(Some(TransportKind::DirectSocket)).messages_received >= 2);

    manager.disconnect().await;
}

#[tokio::test]
async fn test_no_delivery_after_disconnect_returns() {
    let telemetry_port = free_udp_port();
    let target = TransportTarget::multicast(EndpointPair::new(
        "127.0.0.1",
        telemetry_port,
        free_udp_port(),
    ));
    let mut manager = TransportManager::new(IngestConfig::default());
    manager.connect(&target).unwrap();

    let collector = Arc::new(Collector::default());
    manager.start_receiving(collector.clone()).unwrap();

    let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    sender.send_to(b"before", ("127.0.0.1", telemetry_port)).unwrap();
    assert!(wait_for(|| collector.len() == 1).await);

    manager.disconnect().await;
    let delivered = collector.len();

    for _ in 0..10 {
        // Errors from the closed port are irrelevant here
        let _ = sender.send_to(b"after", ("127.0.0.1", telemetry_port));
    }
    sleep(Duration::from_millis(200)).await;

    assert_eq!(collector.len(), delivered);
    assert!(!collector.texts(Channel::Telemetry).iter().any(|text| text == "after"));
}
