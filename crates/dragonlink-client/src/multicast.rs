//! UDP listener for the multicast transport.
//!
//! When the configured host is a multicast group the socket binds the
//! wildcard address on the port and joins the group. Any other host is bound
//! directly as a plain UDP receiver.

use crate::handler::{dispatch, InboundPayload, PayloadHandler};
use crate::state::{ConnectionState, ConnectionStatus, ListenerId};
use dragonlink_core::error::TransportError;
use dragonlink_core::types::{Channel, TransportKind};
use metrics::counter;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// A bound UDP socket that has not started receiving yet
pub struct MulticastListener {
    id: ListenerId,
    socket: UdpSocket,
    local_addr: SocketAddr,
    group: Option<IpAddr>,
    status: ConnectionStatus,
    buffer_size: usize,
}

impl MulticastListener {
    /// Bind a socket on `port` for `host`, joining the group when `host` is
    /// a multicast address.
    #[instrument(skip(status), fields(listener = %ListenerId::new(TransportKind::Multicast, channel)))]
    pub fn bind(
        host: &str,
        port: u16,
        channel: Channel,
        buffer_size: usize,
        status: ConnectionStatus,
    ) -> Result<Self, TransportError> {
        let id = ListenerId::new(TransportKind::Multicast, channel);
        status.set_state(ConnectionState::Connecting);

        let host_ip: IpAddr = host.trim().parse().map_err(|_| TransportError::InvalidAddress {
            value: host.to_string(),
        })?;

        let group = host_ip.is_multicast().then_some(host_ip);
        let local_addr = match group {
            Some(IpAddr::V4(_)) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
            Some(IpAddr::V6(_)) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port),
            None => SocketAddr::new(host_ip, port),
        };

        let socket = match Self::open_socket(local_addr, group.is_some(), buffer_size) {
            Ok(socket) => socket,
            Err(e) => {
                status.set_error(e.to_string());
                return Err(e);
            }
        };

        if let Some(group) = group {
            if let Err(e) = join_group(&socket, group) {
                let err = TransportError::join(group.to_string(), e.to_string());
                status.set_error(err.to_string());
                return Err(err);
            }
            info!(group = %group, port, "Joined multicast group");
        }

        let local_addr = socket.local_addr().unwrap_or(local_addr);
        status.set_state(ConnectionState::Connected);
        status.metrics().mark_connected();
        info!(address = %local_addr, "UDP socket bound");

        Ok(Self {
            id,
            socket,
            local_addr,
            group,
            status,
            buffer_size,
        })
    }

    fn open_socket(
        local_addr: SocketAddr,
        shared: bool,
        buffer_size: usize,
    ) -> Result<UdpSocket, TransportError> {
        let address = local_addr.to_string();
        let bind_err = |e: std::io::Error| TransportError::bind(address.clone(), &e);

        let socket2 = socket2::Socket::new(
            socket2::Domain::for_address(local_addr),
            socket2::Type::DGRAM,
            Some(socket2::Protocol::UDP),
        )
        .map_err(bind_err)?;

        // Group members share the port with other receivers on this host
        if shared {
            socket2.set_reuse_address(true).map_err(bind_err)?;
        }

        // Best-effort, the kernel may clamp it
        let _ = socket2.set_recv_buffer_size(buffer_size);

        socket2.set_nonblocking(true).map_err(bind_err)?;
        socket2.bind(&local_addr.into()).map_err(bind_err)?;

        UdpSocket::from_std(socket2.into()).map_err(bind_err)
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Address the socket is bound to; carries the real port when bound to 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start the receive loop on the runtime.
    pub fn spawn(self, handler: Arc<dyn PayloadHandler>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(handler, token))
    }

    async fn run(self, handler: Arc<dyn PayloadHandler>, token: CancellationToken) {
        let mut buffer = vec![0u8; self.buffer_size];
        let metrics = self.status.metrics();
        debug!(listener = %self.id, "UDP receive loop started");

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(listener = %self.id, "UDP receive loop cancelled");
                    break;
                }
                result = self.socket.recv_from(&mut buffer) => match result {
                    Ok((size, source)) => {
                        metrics.record_bytes_received(size as u64);
                        match std::str::from_utf8(&buffer[..size]) {
                            Ok(text) => {
                                metrics.record_message_received();
                                let payload = InboundPayload::new(
                                    self.id.channel,
                                    TransportKind::Multicast,
                                    text.to_string(),
                                )
                                .with_source(source.to_string());
                                dispatch(handler.as_ref(), payload).await;
                            }
                            Err(_) => {
                                metrics.record_non_utf8();
                                counter!(
                                    "dragonlink_payloads_dropped_total",
                                    "reason" => "not_utf8",
                                    "transport" => "multicast"
                                )
                                .increment(1);
                                debug!(listener = %self.id, %source, size, "Dropped non-UTF-8 datagram");
                            }
                        }
                    }
                    Err(e) => {
                        error!(listener = %self.id, error = %e, "UDP receive failed, stopping listener");
                        self.status.set_error(e.to_string());
                        break;
                    }
                }
            }
        }

        if let Some(group) = self.group {
            if let Err(e) = leave_group(&self.socket, group) {
                warn!(listener = %self.id, group = %group, error = %e, "Failed to leave multicast group");
            }
        }
        self.status.mark_closed();
        info!(listener = %self.id, address = %self.local_addr, "UDP socket closed");
    }
}

fn join_group(socket: &UdpSocket, group: IpAddr) -> std::io::Result<()> {
    match group {
        IpAddr::V4(addr) => socket.join_multicast_v4(addr, Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(addr) => socket.join_multicast_v6(&addr, 0),
    }
}

fn leave_group(socket: &UdpSocket, group: IpAddr) -> std::io::Result<()> {
    match group {
        IpAddr::V4(addr) => socket.leave_multicast_v4(addr, Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(addr) => socket.leave_multicast_v6(&addr, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Collector {
        telemetry: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl PayloadHandler for Collector {
        async fn on_telemetry(&self, payload: InboundPayload) {
            self.telemetry.lock().push(payload.text);
        }

        async fn on_status(&self, _payload: InboundPayload) {}
    }

    #[tokio::test]
    async fn test_invalid_host() {
        let result = MulticastListener::bind(
            "not-an-ip",
            0,
            Channel::Telemetry,
            1024,
            ConnectionStatus::new(),
        );
        assert!(matches!(result, Err(TransportError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_unicast_receive_and_non_utf8_drop() {
        let status = ConnectionStatus::new();
        let listener =
            MulticastListener::bind("127.0.0.1", 0, Channel::Telemetry, 2048, status.clone())
                .unwrap();
        assert!(status.is_connected());
        let addr = listener.local_addr();

        let collector = Arc::new(Collector::default());
        let token = CancellationToken::new();
        let handle = listener.spawn(collector.clone(), token.clone());

        let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(&[0xff, 0xfe], addr).unwrap();
        sender.send_to(b"hello", addr).unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while collector.telemetry.lock().is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(collector.telemetry.lock().as_slice(), ["hello".to_string()]);
        assert_eq!(status.metrics().non_utf8_dropped(), 1);

        token.cancel();
        handle.await.unwrap();
        assert_eq!(status.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_address_in_use() {
        let first =
            MulticastListener::bind("127.0.0.1", 0, Channel::Status, 1024, ConnectionStatus::new())
                .unwrap();
        let port = first.local_addr().port();

        let second =
            MulticastListener::bind("127.0.0.1", port, Channel::Status, 1024, ConnectionStatus::new());
        assert!(matches!(second, Err(TransportError::AddressInUse { .. })));
    }
}
