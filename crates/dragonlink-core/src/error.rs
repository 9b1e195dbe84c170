//! Error types for the DragonLink ingest service.
//!
//! Decoding failures live next to the decoder in `dragonlink-cot`; this module
//! covers everything that can go wrong around sockets and configuration.

use std::io;
use thiserror::Error;

/// Result type alias using DragonLinkError as the error type.
pub type Result<T> = std::result::Result<T, DragonLinkError>;

/// Top-level error type for DragonLink operations.
#[derive(Debug, Error)]
pub enum DragonLinkError {
    /// Socket lifecycle errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while opening, running or closing transport sockets.
///
/// None of these are fatal to the process: the session reports them to the
/// settings owner and stays disconnected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Failed to bind a local UDP socket
    #[error("Failed to bind {address}: {reason}")]
    BindFailed { address: String, reason: String },

    /// Failed to join a multicast group
    #[error("Failed to join multicast group {group}: {reason}")]
    JoinFailed { group: String, reason: String },

    /// Failed to open or connect a message-queue subscriber
    #[error("Failed to connect subscriber to {endpoint}: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    /// Host or group could not be parsed
    #[error("Invalid address: {value}")]
    InvalidAddress { value: String },

    /// Address already in use
    #[error("Address already in use: {address}")]
    AddressInUse { address: String },

    /// `connect` was called while sockets are still open
    #[error("Transport already connected")]
    AlreadyConnected,

    /// Receiving was requested with no sockets open
    #[error("Transport not connected")]
    NotConnected,

    /// A listener stopped because its socket failed
    #[error("Listener {listener} failed: {reason}")]
    ListenerFailed { listener: String, reason: String },
}

impl TransportError {
    /// Maps a bind-time I/O error, keeping `AddrInUse` distinguishable.
    pub fn bind(address: impl Into<String>, err: &io::Error) -> Self {
        let address = address.into();
        match err.kind() {
            io::ErrorKind::AddrInUse => Self::AddressInUse { address },
            _ => Self::BindFailed {
                address,
                reason: err.to_string(),
            },
        }
    }

    /// Creates a multicast join error.
    pub fn join(group: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::JoinFailed {
            group: group.into(),
            reason: reason.into(),
        }
    }

    /// Creates a subscriber connect error.
    pub fn connect(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectFailed {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
