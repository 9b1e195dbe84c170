//! ZMQ SUB listener for the direct-socket transport.
//!
//! libzmq sockets are blocking and not `Sync`, so the socket lives on a
//! blocking thread that polls with a receive timeout and forwards complete
//! messages over a bounded channel. An async task drains that channel and
//! calls the payload handler in arrival order.

use crate::handler::{dispatch, InboundPayload, PayloadHandler};
use crate::state::{ConnectionState, ConnectionStatus, ListenerId};
use dragonlink_core::error::TransportError;
use dragonlink_core::types::{Channel, TransportKind};
use metrics::counter;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Builds the `tcp://` endpoint for a host and port, bracketing IPv6 literals.
pub fn endpoint(host: &str, port: u16) -> String {
    let host = host.trim();
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(addr)) => format!("tcp://[{}]:{}", addr, port),
        _ => format!("tcp://{}:{}", host, port),
    }
}

/// A connected SUB socket that has not started receiving yet
pub struct DirectListener {
    id: ListenerId,
    socket: zmq::Socket,
    endpoint: String,
    status: ConnectionStatus,
    buffer: usize,
}

impl DirectListener {
    /// Create a SUB socket subscribed to every topic and connect it to
    /// `host:port`.
    ///
    /// ZMQ connects lazily, so success here means the endpoint was accepted,
    /// not that a publisher is up.
    #[instrument(skip(context, status), fields(listener = %ListenerId::new(TransportKind::DirectSocket, channel)))]
    pub fn connect(
        context: &zmq::Context,
        host: &str,
        port: u16,
        channel: Channel,
        poll_interval: Duration,
        buffer: usize,
        status: ConnectionStatus,
    ) -> Result<Self, TransportError> {
        let id = ListenerId::new(TransportKind::DirectSocket, channel);
        let endpoint = endpoint(host, port);
        status.set_state(ConnectionState::Connecting);

        let socket = match Self::open_socket(context, &endpoint, host, poll_interval) {
            Ok(socket) => socket,
            Err(e) => {
                let err = TransportError::connect(endpoint.clone(), e.to_string());
                status.set_error(err.to_string());
                return Err(err);
            }
        };

        status.set_state(ConnectionState::Connected);
        status.metrics().mark_connected();
        info!(endpoint = %endpoint, "ZMQ subscriber connected");

        Ok(Self {
            id,
            socket,
            endpoint,
            status,
            buffer: buffer.max(1),
        })
    }

    fn open_socket(
        context: &zmq::Context,
        endpoint: &str,
        host: &str,
        poll_interval: Duration,
    ) -> Result<zmq::Socket, zmq::Error> {
        let socket = context.socket(zmq::SUB)?;
        socket.set_linger(0)?;
        let timeout = i32::try_from(poll_interval.as_millis()).unwrap_or(i32::MAX);
        socket.set_rcvtimeo(timeout.max(1))?;
        if matches!(host.trim().parse::<IpAddr>(), Ok(IpAddr::V6(_))) {
            socket.set_ipv6(true)?;
        }
        socket.set_subscribe(b"")?;
        socket.connect(endpoint)?;
        Ok(socket)
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Start the reader thread and the dispatch task.
    pub fn spawn(self, handler: Arc<dyn PayloadHandler>, token: CancellationToken) -> JoinHandle<()> {
        let (tx, rx) = mpsc::channel(self.buffer);
        let Self {
            id,
            socket,
            endpoint,
            status,
            ..
        } = self;

        let reader = {
            let status = status.clone();
            let token = token.clone();
            tokio::task::spawn_blocking(move || read_loop(id, socket, status, tx, token))
        };

        tokio::spawn(async move {
            debug!(listener = %id, "ZMQ dispatch loop started");
            let mut rx = rx;
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    message = rx.recv() => match message {
                        Some(text) => {
                            let payload = InboundPayload::new(id.channel, TransportKind::DirectSocket, text)
                                .with_source(endpoint.clone());
                            dispatch(handler.as_ref(), payload).await;
                        }
                        // Reader exited
                        None => break,
                    }
                }
            }

            // Unblocks a reader waiting on a full channel
            token.cancel();
            drop(rx);
            if let Err(e) = reader.await {
                warn!(listener = %id, error = %e, "ZMQ reader thread panicked");
            }
            status.mark_closed();
            info!(listener = %id, endpoint = %endpoint, "ZMQ subscriber closed");
        })
    }
}

fn read_loop(
    id: ListenerId,
    socket: zmq::Socket,
    status: ConnectionStatus,
    tx: mpsc::Sender<String>,
    token: CancellationToken,
) {
    let metrics = status.metrics();

    while !token.is_cancelled() {
        let frames = match socket.recv_multipart(0) {
            Ok(frames) => frames,
            Err(zmq::Error::EAGAIN) | Err(zmq::Error::EINTR) => continue,
            Err(zmq::Error::ETERM) => break,
            Err(e) => {
                error!(listener = %id, error = %e, "ZMQ receive failed, stopping listener");
                status.set_error(e.to_string());
                break;
            }
        };

        // Publishers may prefix a topic frame; the payload is the last one
        let Some(bytes) = frames.into_iter().last() else {
            continue;
        };
        metrics.record_bytes_received(bytes.len() as u64);

        match String::from_utf8(bytes) {
            Ok(text) => {
                metrics.record_message_received();
                if tx.blocking_send(text).is_err() {
                    break;
                }
            }
            Err(e) => {
                metrics.record_non_utf8();
                counter!(
                    "dragonlink_payloads_dropped_total",
                    "reason" => "not_utf8",
                    "transport" => "zmq"
                )
                .increment(1);
                debug!(listener = %id, size = e.as_bytes().len(), "Dropped non-UTF-8 message");
            }
        }
    }
    // Socket drops here with linger 0
}
