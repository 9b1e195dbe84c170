//! # dragonlink-client
//!
//! Receive-side transports for DragonLink sensor kits.
//!
//! A kit publishes two streams: drone telemetry and its own system status.
//! Each stream arrives on its own socket over one of two transports:
//!
//! - **Multicast**: UDP datagrams on a multicast group (or a plain unicast
//!   bind when the host is not a group address)
//! - **Direct socket**: ZMQ SUB sockets connected to the kit's publishers
//!
//! [`TransportManager`] opens the sockets for a [`TransportTarget`] and
//! hands every UTF-8 payload to a [`PayloadHandler`], tagged with the
//! channel it arrived on.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dragonlink_client::{InboundPayload, PayloadHandler, TransportManager};
//! use dragonlink_core::config::{ConnectionConfig, IngestConfig};
//! use std::sync::Arc;
//!
//! struct Print;
//!
//! #[async_trait::async_trait]
//! impl PayloadHandler for Print {
//!     async fn on_telemetry(&self, payload: InboundPayload) {
//!         println!("telemetry: {}", payload.text);
//!     }
//!     async fn on_status(&self, payload: InboundPayload) {
//!         println!("status: {}", payload.text);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut manager = TransportManager::new(IngestConfig::default());
//!     manager.connect(&ConnectionConfig::default().target())?;
//!     manager.start_receiving(Arc::new(Print))?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     manager.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod direct;
pub mod handler;
pub mod multicast;
pub mod state;
pub mod transport;

pub use direct::DirectListener;
pub use handler::{InboundPayload, PayloadHandler};
pub use multicast::MulticastListener;
pub use state::{
    ConnectionMetrics, ConnectionState, ConnectionStatus, ListenerId, ListenerState,
    MetricsSnapshot,
};
pub use transport::TransportManager;
pub use dragonlink_core::types::{Channel, TransportKind, TransportTarget};
