//! Core types shared by the transport, decoder and session layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which transports the session should listen on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionMode {
    /// UDP multicast (or plain UDP when the host is not a group address)
    #[default]
    #[serde(alias = "Multicast")]
    Multicast,
    /// ZeroMQ subscriber sockets connected to a publisher
    #[serde(alias = "zmq", alias = "direct_socket", alias = "Direct ZMQ")]
    DirectSocket,
    /// Multicast and direct sockets at the same time
    #[serde(alias = "Both")]
    Both,
}

impl ConnectionMode {
    /// Returns true if this mode opens multicast sockets.
    pub fn uses_multicast(&self) -> bool {
        matches!(self, ConnectionMode::Multicast | ConnectionMode::Both)
    }

    /// Returns true if this mode opens direct subscriber sockets.
    pub fn uses_direct(&self) -> bool {
        matches!(self, ConnectionMode::DirectSocket | ConnectionMode::Both)
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionMode::Multicast => write!(f, "multicast"),
            ConnectionMode::DirectSocket => write!(f, "direct-socket"),
            ConnectionMode::Both => write!(f, "both"),
        }
    }
}

impl FromStr for ConnectionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multicast" => Ok(ConnectionMode::Multicast),
            "direct-socket" | "direct_socket" | "direct" | "zmq" | "direct zmq" => {
                Ok(ConnectionMode::DirectSocket)
            }
            "both" => Ok(ConnectionMode::Both),
            other => Err(format!("unknown connection mode: {}", other)),
        }
    }
}

/// Logical message channel a socket belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Drone / track telemetry
    Telemetry,
    /// Ground system health reports
    Status,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Telemetry => write!(f, "telemetry"),
            Channel::Status => write!(f, "status"),
        }
    }
}

/// Transport a socket is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    Multicast,
    DirectSocket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Multicast => write!(f, "multicast"),
            TransportKind::DirectSocket => write!(f, "zmq"),
        }
    }
}

/// Host plus the telemetry and status ports for one transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointPair {
    pub host: String,
    pub telemetry_port: u16,
    pub status_port: u16,
}

impl EndpointPair {
    pub fn new(host: impl Into<String>, telemetry_port: u16, status_port: u16) -> Self {
        Self {
            host: host.into(),
            telemetry_port,
            status_port,
        }
    }

    /// Port used for the given channel.
    pub fn port(&self, channel: Channel) -> u16 {
        match channel {
            Channel::Telemetry => self.telemetry_port,
            Channel::Status => self.status_port,
        }
    }
}

/// The complete set of sockets a session should have open.
///
/// Two targets comparing equal means the transport is already in the wanted
/// state and no reconnect is needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportTarget {
    pub mode: ConnectionMode,
    pub multicast: Option<EndpointPair>,
    pub direct: Option<EndpointPair>,
}

impl TransportTarget {
    /// Target with only multicast sockets.
    pub fn multicast(pair: EndpointPair) -> Self {
        Self {
            mode: ConnectionMode::Multicast,
            multicast: Some(pair),
            direct: None,
        }
    }

    /// Target with only direct subscriber sockets.
    pub fn direct(pair: EndpointPair) -> Self {
        Self {
            mode: ConnectionMode::DirectSocket,
            multicast: None,
            direct: Some(pair),
        }
    }

    /// Number of sockets this target opens.
    pub fn socket_count(&self) -> usize {
        2 * (self.multicast.is_some() as usize + self.direct.is_some() as usize)
    }
}

impl fmt::Display for TransportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mode)?;
        if let Some(ref pair) = self.multicast {
            write!(
                f,
                " udp://{}:{{{},{}}}",
                pair.host, pair.telemetry_port, pair.status_port
            )?;
        }
        if let Some(ref pair) = self.direct {
            write!(
                f,
                " tcp://{}:{{{},{}}}",
                pair.host, pair.telemetry_port, pair.status_port
            )?;
        }
        Ok(())
    }
}
