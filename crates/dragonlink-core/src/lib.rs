//! # DragonLink Core
//!
//! Core types, error handling, and configuration for the DragonLink telemetry
//! ingest service.
//!
//! - **Types**: `ConnectionMode`, channel/transport identifiers and the
//!   `TransportTarget` describing which sockets should be open.
//! - **Errors**: `thiserror` enums for transport and configuration failures.
//! - **Configuration**: `AppConfig` loaded from YAML with environment overrides,
//!   and the `ConnectionConfig` that drives the session.
//! - **Settings**: `SettingsHandle`, the single writer of the live connection
//!   configuration, observed by the session through a `watch` channel.
//!
//! ## Example
//!
//! ```
//! use dragonlink_core::config::ConnectionConfig;
//! use dragonlink_core::types::ConnectionMode;
//!
//! let mut config = ConnectionConfig::default();
//! config.update_connection(ConnectionMode::DirectSocket, Some("192.168.1.20"));
//!
//! assert_eq!(config.telemetry_port, 4224);
//! assert_eq!(config.active_host(), "192.168.1.20");
//! ```

pub mod config;
pub mod error;
pub mod settings;
pub mod types;

pub use config::{AppConfig, ConnectionConfig};
pub use error::{ConfigError, DragonLinkError, Result, TransportError};
pub use settings::SettingsHandle;
pub use types::{Channel, ConnectionMode, EndpointPair, TransportKind, TransportTarget};
