//! DragonLink ingest service
//!
//! Wires the transports, decoder and stores together:
//!
//! - [`ingest::IngestHandler`] decodes payloads from the listeners and submits
//!   the records to the store coordinator
//! - [`session::SessionController`] keeps the transport in step with the live
//!   connection settings

pub mod ingest;
pub mod session;

pub use ingest::{IngestHandler, IngestMetrics};
pub use session::{SessionChange, SessionController};
