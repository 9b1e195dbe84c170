use dragonlink_core::types::{Channel, TransportKind};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Connection state for a single listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Socket closed or never opened
    Disconnected,
    /// Socket being bound or connected
    Connecting,
    /// Socket open and receiving
    Connected,
    /// Socket failed; the listener has stopped
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

/// Identifies one socket: which transport and which channel it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId {
    pub transport: TransportKind,
    pub channel: Channel,
}

impl ListenerId {
    pub fn new(transport: TransportKind, channel: Channel) -> Self {
        Self { transport, channel }
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.transport, self.channel)
    }
}

/// Metrics for tracking listener statistics
#[derive(Debug, Clone)]
pub struct ConnectionMetrics {
    /// Total bytes received
    bytes_received: Arc<AtomicU64>,
    /// Payloads handed to the handler
    messages_received: Arc<AtomicU64>,
    /// Payloads dropped because they were not UTF-8
    non_utf8_dropped: Arc<AtomicU64>,
    /// Total errors encountered
    errors: Arc<AtomicU64>,
    /// Last activity timestamp
    last_activity: Arc<parking_lot::RwLock<SystemTime>>,
    /// Socket opened timestamp
    connected_at: Arc<parking_lot::RwLock<Option<SystemTime>>>,
}

impl Default for ConnectionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionMetrics {
    pub fn new() -> Self {
        Self {
            bytes_received: Arc::new(AtomicU64::new(0)),
            messages_received: Arc::new(AtomicU64::new(0)),
            non_utf8_dropped: Arc::new(AtomicU64::new(0)),
            errors: Arc::new(AtomicU64::new(0)),
            last_activity: Arc::new(parking_lot::RwLock::new(SystemTime::now())),
            connected_at: Arc::new(parking_lot::RwLock::new(None)),
        }
    }

    pub fn record_bytes_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
        self.update_last_activity();
    }

    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_non_utf8(&self) {
        self.non_utf8_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_last_activity(&self) {
        *self.last_activity.write() = SystemTime::now();
    }

    pub fn mark_connected(&self) {
        *self.connected_at.write() = Some(SystemTime::now());
    }

    pub fn mark_disconnected(&self) {
        *self.connected_at.write() = None;
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn non_utf8_dropped(&self) -> u64 {
        self.non_utf8_dropped.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn last_activity(&self) -> SystemTime {
        *self.last_activity.read()
    }

    pub fn connected_at(&self) -> Option<SystemTime> {
        *self.connected_at.read()
    }

    /// Get time since last activity
    pub fn time_since_last_activity(&self) -> Duration {
        self.last_activity()
            .elapsed()
            .unwrap_or(Duration::from_secs(0))
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_received: self.bytes_received(),
            messages_received: self.messages_received(),
            non_utf8_dropped: self.non_utf8_dropped(),
            errors: self.errors(),
            last_activity: Some(self.last_activity()),
            connected_at: self.connected_at(),
        }
    }
}

/// Snapshot of listener metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub bytes_received: u64,
    pub messages_received: u64,
    pub non_utf8_dropped: u64,
    pub errors: u64,
    pub last_activity: Option<SystemTime>,
    pub connected_at: Option<SystemTime>,
}

impl MetricsSnapshot {
    /// Folds another listener's counters into this one.
    ///
    /// Timestamps keep the most recent activity and the earliest connect.
    pub fn merge(&mut self, other: &MetricsSnapshot) {
        self.bytes_received += other.bytes_received;
        self.messages_received += other.messages_received;
        self.non_utf8_dropped += other.non_utf8_dropped;
        self.errors += other.errors;
        self.last_activity = self.last_activity.max(other.last_activity);
        self.connected_at = match (self.connected_at, other.connected_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }
}

/// Combined listener state and metrics
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    state: Arc<parking_lot::RwLock<ConnectionState>>,
    metrics: ConnectionMetrics,
    error_message: Arc<parking_lot::RwLock<Option<String>>>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStatus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(parking_lot::RwLock::new(ConnectionState::Disconnected)),
            metrics: ConnectionMetrics::new(),
            error_message: Arc::new(parking_lot::RwLock::new(None)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    pub fn metrics(&self) -> &ConnectionMetrics {
        &self.metrics
    }

    /// Records the error and moves to `Failed`.
    pub fn set_error(&self, error: String) {
        *self.error_message.write() = Some(error);
        self.metrics.record_error();
        self.set_state(ConnectionState::Failed);
    }

    pub fn error_message(&self) -> Option<String> {
        self.error_message.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state(), ConnectionState::Connected)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state(), ConnectionState::Failed)
    }

    /// Marks the socket closed, keeping `Failed` visible if it failed.
    pub fn mark_closed(&self) {
        if !self.is_failed() {
            self.set_state(ConnectionState::Disconnected);
        }
        self.metrics.mark_disconnected();
    }
}

/// Point-in-time view of one listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerState {
    pub id: ListenerId,
    /// Bound address or connected endpoint
    pub address: String,
    pub state: ConnectionState,
    pub error: Option<String>,
    pub metrics: MetricsSnapshot,
}
