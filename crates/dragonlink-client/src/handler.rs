use async_trait::async_trait;
use dragonlink_core::types::{Channel, TransportKind};
use std::time::SystemTime;

/// One text payload received on a listener socket
#[derive(Debug, Clone)]
pub struct InboundPayload {
    /// Channel of the socket the payload arrived on
    pub channel: Channel,
    /// Transport of that socket
    pub transport: TransportKind,
    /// Payload text (already checked to be UTF-8)
    pub text: String,
    /// Sender address, when the transport exposes one
    pub source: Option<String>,
    /// Timestamp when the payload was received
    pub received_at: SystemTime,
}

impl InboundPayload {
    pub fn new(channel: Channel, transport: TransportKind, text: String) -> Self {
        Self {
            channel,
            transport,
            text,
            source: None,
            received_at: SystemTime::now(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Receives payloads from the transport manager
///
/// Each listener awaits the callback before reading its next payload, so
/// calls for one socket arrive in order. Calls for different sockets may
/// interleave.
#[async_trait]
pub trait PayloadHandler: Send + Sync + 'static {
    /// Called for every payload received on a telemetry socket
    async fn on_telemetry(&self, payload: InboundPayload);

    /// Called for every payload received on a status socket
    async fn on_status(&self, payload: InboundPayload);
}

/// Routes a payload to the callback for its channel.
pub(crate) async fn dispatch(handler: &dyn PayloadHandler, payload: InboundPayload) {
    match payload.channel {
        Channel::Telemetry => handler.on_telemetry(payload).await,
        Channel::Status => handler.on_status(payload).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(Channel, String)>>,
    }

    #[async_trait]
    impl PayloadHandler for Recorder {
        async fn on_telemetry(&self, payload: InboundPayload) {
            self.seen.lock().push((Channel::Telemetry, payload.text));
        }

        async fn on_status(&self, payload: InboundPayload) {
            self.seen.lock().push((Channel::Status, payload.text));
        }
    }

    #[tokio::test]
    async fn test_dispatch_by_channel() {
        let recorder = Recorder::default();

        dispatch(
            &recorder,
            InboundPayload::new(Channel::Status, TransportKind::Multicast, "s".into()),
        )
        .await;
        dispatch(
            &recorder,
            InboundPayload::new(Channel::Telemetry, TransportKind::DirectSocket, "t".into())
                .with_source("10.0.0.1:4224"),
        )
        .await;

        let seen = recorder.seen.lock();
        assert_eq!(seen[0], (Channel::Status, "s".to_string()));
        assert_eq!(seen[1], (Channel::Telemetry, "t".to_string()));
    }
}
