//! Live connection settings shared between the owner and the session.

use crate::config::ConnectionConfig;
use crate::error::TransportError;
use crate::types::ConnectionMode;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Single writer of the live `ConnectionConfig`.
///
/// Clones share the same underlying channel. Readers call [`subscribe`] and
/// are woken on every change; a change that leaves the value untouched does
/// not wake anyone.
///
/// [`subscribe`]: SettingsHandle::subscribe
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    tx: Arc<watch::Sender<ConnectionConfig>>,
    last_error: Arc<RwLock<Option<TransportError>>>,
}

impl SettingsHandle {
    pub fn new(initial: ConnectionConfig) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx: Arc::new(tx),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Snapshot of the current configuration.
    pub fn current(&self) -> ConnectionConfig {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionConfig> {
        self.tx.subscribe()
    }

    /// Applies `ConnectionConfig::update_connection` and notifies readers.
    pub fn update_connection(&self, mode: ConnectionMode, host: Option<&str>) {
        self.modify(|config| config.update_connection(mode, host));
    }

    /// Turns listening on or off; returns the new value.
    pub fn toggle_listening(&self) -> bool {
        let mut listening = false;
        self.modify(|config| listening = config.toggle_listening());
        listening
    }

    pub fn set_listening(&self, listening: bool) {
        self.modify(|config| config.listening = listening);
    }

    /// Replaces the whole configuration, e.g. after a reload.
    pub fn replace(&self, config: ConnectionConfig) {
        self.modify(|current| *current = config);
    }

    /// Records a transport failure and turns listening off.
    pub fn report_failure(&self, error: TransportError) {
        warn!(error = %error, "Transport failure reported, listening disabled");
        *self.last_error.write() = Some(error);
        self.modify(|config| config.listening = false);
    }

    /// Most recent transport failure, if any.
    pub fn last_error(&self) -> Option<TransportError> {
        self.last_error.read().clone()
    }

    pub fn clear_error(&self) -> Option<TransportError> {
        self.last_error.write().take()
    }

    fn modify(&self, f: impl FnOnce(&mut ConnectionConfig)) {
        self.tx.send_if_modified(|config| {
            let before = config.clone();
            f(config);
            let changed = *config != before;
            if changed {
                info!(
                    mode = %config.mode,
                    host = %config.active_host(),
                    listening = config.listening,
                    "Connection settings changed"
                );
            }
            changed
        });
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::new(ConnectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_sees_changes() {
        let settings = SettingsHandle::default();
        let mut rx = settings.subscribe();

        assert!(settings.toggle_listening());
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().listening);
    }

    #[tokio::test]
    async fn test_no_op_update_does_not_notify() {
        let settings = SettingsHandle::default();
        let mut rx = settings.subscribe();
        rx.borrow_and_update();

        settings.set_listening(false);
        assert!(!rx.has_changed().unwrap());

        settings.update_connection(ConnectionMode::DirectSocket, Some("10.1.1.1"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().telemetry_port, 4224);
    }

    #[test]
    fn test_report_failure_disables_listening() {
        let settings = SettingsHandle::default();
        settings.set_listening(true);

        settings.report_failure(TransportError::AlreadyConnected);
        assert!(!settings.current().listening);
        assert_eq!(settings.last_error(), Some(TransportError::AlreadyConnected));

        assert!(settings.clear_error().is_some());
        assert!(settings.last_error().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let settings = SettingsHandle::default();
        let other = settings.clone();
        other.update_connection(ConnectionMode::Both, Some("239.9.9.9"));
        assert_eq!(settings.current().mode, ConnectionMode::Both);
    }
}
