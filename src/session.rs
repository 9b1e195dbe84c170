//! Session controller
//!
//! Converges the transport to the live `ConnectionConfig`: connects when
//! listening is turned on, tears down when it is turned off, and rebuilds the
//! sockets when the mode or host changes.

use dragonlink_client::{PayloadHandler, TransportManager};
use dragonlink_core::config::{ConnectionConfig, IngestConfig};
use dragonlink_core::error::TransportError;
use dragonlink_core::settings::SettingsHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// How often a running session looks for listeners that died.
const LISTENER_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// What [`SessionController::apply`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    /// Transport already matched the configuration
    Unchanged,
    Connected,
    /// Old sockets closed and new ones opened
    Reconnected,
    Disconnected,
}

pub struct SessionController {
    transport: TransportManager,
    handler: Arc<dyn PayloadHandler>,
}

impl SessionController {
    pub fn new(config: IngestConfig, handler: Arc<dyn PayloadHandler>) -> Self {
        Self {
            transport: TransportManager::new(config),
            handler,
        }
    }

    /// Bring the transport in line with `config`.
    ///
    /// On error the transport is left disconnected.
    #[instrument(skip_all, fields(mode = %config.mode, listening = config.listening))]
    pub async fn apply(&mut self, config: &ConnectionConfig) -> Result<SessionChange, TransportError> {
        if !config.listening {
            if !self.transport.is_connected() {
                return Ok(SessionChange::Unchanged);
            }
            self.transport.disconnect().await;
            info!("Stopped listening");
            return Ok(SessionChange::Disconnected);
        }

        let target = config.target();
        let was_connected = self.transport.is_connected();

        if was_connected && self.transport.target() == Some(&target) {
            if self.transport.failed_listeners().is_empty() {
                debug!("Transport already matches configuration");
                return Ok(SessionChange::Unchanged);
            }
            warn!("Rebuilding transport after listener failure");
        }

        if was_connected {
            self.transport.disconnect().await;
        }

        self.transport.connect(&target)?;
        if let Err(e) = self.transport.start_receiving(self.handler.clone()) {
            self.transport.disconnect().await;
            return Err(e);
        }

        info!(transport = %target, "Listening");
        Ok(if was_connected {
            SessionChange::Reconnected
        } else {
            SessionChange::Connected
        })
    }

    /// Follow `settings` until `token` is cancelled, then shut down.
    ///
    /// Connect failures and listeners that die while running are reported
    /// through [`SettingsHandle::report_failure`], which turns listening off.
    pub async fn run(mut self, settings: SettingsHandle, token: CancellationToken) {
        let mut updates = settings.subscribe();
        let mut check = tokio::time::interval(LISTENER_CHECK_INTERVAL);
        check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // The current value counts as the first change
        updates.mark_changed();

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        debug!("Settings owner dropped");
                        break;
                    }
                    let config = updates.borrow_and_update().clone();
                    if let Err(e) = self.apply(&config).await {
                        error!(error = %e, "Failed to apply connection settings");
                        settings.report_failure(e);
                    }
                }
                _ = check.tick() => {
                    if let Some(failure) = self.transport.failed_listeners().into_iter().next() {
                        error!(error = %failure, "Listener stopped");
                        self.transport.disconnect().await;
                        settings.report_failure(failure);
                    }
                }
            }
        }

        self.shutdown().await;
    }

    /// Close every socket.
    pub async fn shutdown(&mut self) {
        if self.transport.is_connected() {
            info!("Shutting down session");
        }
        self.transport.disconnect().await;
    }

    pub fn is_listening(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn transport(&self) -> &TransportManager {
        &self.transport
    }
}
