//! Socket lifecycle for one transport target.
//!
//! The manager opens every socket a [`TransportTarget`] asks for, hands
//! received payloads to a [`PayloadHandler`] and tears everything down on
//! disconnect. At most one set of sockets is open at a time.

use crate::direct::DirectListener;
use crate::handler::PayloadHandler;
use crate::multicast::MulticastListener;
use crate::state::{ConnectionStatus, ListenerId, ListenerState, MetricsSnapshot};
use dragonlink_core::config::IngestConfig;
use dragonlink_core::error::TransportError;
use dragonlink_core::types::{Channel, EndpointPair, TransportKind, TransportTarget};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

enum Listener {
    Multicast(MulticastListener),
    Direct(DirectListener),
}

impl Listener {
    fn spawn(self, handler: Arc<dyn PayloadHandler>, token: CancellationToken) -> JoinHandle<()> {
        match self {
            Listener::Multicast(l) => l.spawn(handler, token),
            Listener::Direct(l) => l.spawn(handler, token),
        }
    }
}

struct Slot {
    id: ListenerId,
    address: String,
    status: ConnectionStatus,
}

/// Opens, runs and closes the sockets for a transport target
pub struct TransportManager {
    context: zmq::Context,
    config: IngestConfig,
    target: Option<TransportTarget>,
    slots: Vec<Slot>,
    pending: Vec<Listener>,
    running: Vec<(ListenerId, JoinHandle<()>)>,
    token: CancellationToken,
}

impl TransportManager {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            context: zmq::Context::new(),
            config,
            target: None,
            slots: Vec::new(),
            pending: Vec::new(),
            running: Vec::new(),
            token: CancellationToken::new(),
        }
    }

    /// Open every socket the target needs.
    ///
    /// Either all sockets open or none stay open: a failure part way closes
    /// the ones already opened before the error is returned. Must run inside
    /// a Tokio runtime, which owns the UDP sockets.
    pub fn connect(&mut self, target: &TransportTarget) -> Result<(), TransportError> {
        if self.is_connected() {
            return Err(TransportError::AlreadyConnected);
        }

        info!(transport = %target, "Opening transport sockets");
        let (listeners, slots) = self.open_all(target)?;

        self.pending = listeners;
        self.slots = slots;
        self.target = Some(target.clone());
        info!(sockets = self.pending.len(), "Transport sockets open");
        Ok(())
    }

    fn open_all(
        &self,
        target: &TransportTarget,
    ) -> Result<(Vec<Listener>, Vec<Slot>), TransportError> {
        let mut listeners = Vec::with_capacity(target.socket_count());
        let mut slots = Vec::with_capacity(target.socket_count());

        // Dropping `listeners` on the error path closes what was opened
        if let Some(pair) = &target.multicast {
            for channel in [Channel::Telemetry, Channel::Status] {
                let (listener, slot) = self.open_multicast(pair, channel)?;
                listeners.push(listener);
                slots.push(slot);
            }
        }
        if let Some(pair) = &target.direct {
            for channel in [Channel::Telemetry, Channel::Status] {
                let (listener, slot) = self.open_direct(pair, channel)?;
                listeners.push(listener);
                slots.push(slot);
            }
        }

        Ok((listeners, slots))
    }

    fn open_multicast(
        &self,
        pair: &EndpointPair,
        channel: Channel,
    ) -> Result<(Listener, Slot), TransportError> {
        let status = ConnectionStatus::new();
        let listener = MulticastListener::bind(
            &pair.host,
            pair.port(channel),
            channel,
            self.config.recv_buffer_size,
            status.clone(),
        )?;
        let slot = Slot {
            id: listener.id(),
            address: format!("udp://{}:{}", pair.host, listener.local_addr().port()),
            status,
        };
        Ok((Listener::Multicast(listener), slot))
    }

    fn open_direct(
        &self,
        pair: &EndpointPair,
        channel: Channel,
    ) -> Result<(Listener, Slot), TransportError> {
        let status = ConnectionStatus::new();
        let listener = DirectListener::connect(
            &self.context,
            &pair.host,
            pair.port(channel),
            channel,
            self.config.zmq_poll_interval(),
            self.config.listener_buffer,
            status.clone(),
        )?;
        let slot = Slot {
            id: listener.id(),
            address: listener.endpoint().to_string(),
            status,
        };
        Ok((Listener::Direct(listener), slot))
    }

    /// Start delivering payloads from every open socket to `handler`.
    pub fn start_receiving(&mut self, handler: Arc<dyn PayloadHandler>) -> Result<(), TransportError> {
        if self.target.is_none() {
            return Err(TransportError::NotConnected);
        }

        for listener in self.pending.drain(..) {
            let id = match &listener {
                Listener::Multicast(l) => l.id(),
                Listener::Direct(l) => l.id(),
            };
            let handle = listener.spawn(handler.clone(), self.token.child_token());
            debug!(listener = %id, "Listener started");
            self.running.push((id, handle));
        }
        Ok(())
    }

    /// Close every socket. Safe to call when nothing is open.
    pub async fn disconnect(&mut self) {
        if self.target.is_none() && self.running.is_empty() && self.pending.is_empty() {
            return;
        }

        self.token.cancel();
        self.pending.clear();
        for (id, handle) in self.running.drain(..) {
            if let Err(e) = handle.await {
                warn!(listener = %id, error = %e, "Listener task ended abnormally");
            }
        }
        for slot in &self.slots {
            slot.status.mark_closed();
        }

        self.token = CancellationToken::new();
        if let Some(target) = self.target.take() {
            info!(transport = %target, "Transport sockets closed");
        }
    }

    /// True while sockets are open, whether or not receiving has started.
    pub fn is_connected(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<&TransportTarget> {
        self.target.as_ref()
    }

    /// Listeners that stopped on a socket error while connected.
    ///
    /// Empty once disconnected; [`listener_states`](Self::listener_states)
    /// still shows the last failure.
    pub fn failed_listeners(&self) -> Vec<TransportError> {
        if !self.is_connected() {
            return Vec::new();
        }
        self.slots
            .iter()
            .filter(|slot| slot.status.is_failed())
            .map(|slot| TransportError::ListenerFailed {
                listener: slot.id.to_string(),
                reason: slot.status.error_message().unwrap_or_default(),
            })
            .collect()
    }

    /// State of each socket from the most recent connect.
    pub fn listener_states(&self) -> Vec<ListenerState> {
        self.slots
            .iter()
            .map(|slot| ListenerState {
                id: slot.id,
                address: slot.address.clone(),
                state: slot.status.state(),
                error: slot.status.error_message(),
                metrics: slot.status.metrics().snapshot(),
            })
            .collect()
    }

    /// Counters summed across all sockets, optionally for one transport.
    pub fn metrics(&self, transport: Option<TransportKind>) -> MetricsSnapshot {
        let mut total = MetricsSnapshot::default();
        for slot in &self.slots {
            if transport.map_or(true, |kind| kind == slot.id.transport) {
                total.merge(&slot.status.metrics().snapshot());
            }
        }
        total
    }
}

impl Drop for TransportManager {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
