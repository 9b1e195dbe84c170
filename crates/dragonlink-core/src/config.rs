//! Configuration management for the DragonLink ingest service.
//!
//! This module provides:
//! - `ConnectionConfig`, the live description of which sockets should be open
//! - `AppConfig`, the file-backed application configuration
//! - Loading from YAML files with `DRAGONLINK__*` environment overrides
//! - Validation of ports, hosts and logging settings

use crate::error::{ConfigError, Result};
use crate::types::{ConnectionMode, EndpointPair, TransportTarget};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Telemetry port used by the multicast transport.
pub const DEFAULT_TELEMETRY_PORT: u16 = 6969;

/// Telemetry port used by the direct ZMQ transport.
pub const DEFAULT_ZMQ_TELEMETRY_PORT: u16 = 4224;

/// Status port shared by both transports.
pub const DEFAULT_STATUS_PORT: u16 = 4225;

/// Multicast group the sensors publish to by default.
pub const DEFAULT_MULTICAST_HOST: &str = "239.3.2.1";

/// Publisher host used by the direct transport by default.
pub const DEFAULT_DIRECT_HOST: &str = "0.0.0.0";

/// What the session should be connected to right now.
///
/// The transport converges to this value: whenever it changes the session
/// controller re-drives the sockets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Transport selection
    #[serde(default)]
    pub mode: ConnectionMode,

    /// Host of the ZMQ publisher
    #[serde(default = "default_direct_host")]
    pub direct_host: String,

    /// Multicast group (or plain UDP bind host)
    #[serde(default = "default_multicast_host")]
    pub multicast_host: String,

    /// Telemetry port for the selected mode
    #[serde(default = "default_telemetry_port")]
    pub telemetry_port: u16,

    /// Telemetry port of the ZMQ publisher
    #[serde(default = "default_zmq_telemetry_port")]
    pub zmq_telemetry_port: u16,

    /// Status port (UDP and TCP)
    #[serde(default = "default_status_port")]
    pub status_port: u16,

    /// Whether sockets should be open
    #[serde(default)]
    pub listening: bool,
}

fn default_direct_host() -> String {
    DEFAULT_DIRECT_HOST.to_string()
}

fn default_multicast_host() -> String {
    DEFAULT_MULTICAST_HOST.to_string()
}

fn default_telemetry_port() -> u16 {
    DEFAULT_TELEMETRY_PORT
}

fn default_zmq_telemetry_port() -> u16 {
    DEFAULT_ZMQ_TELEMETRY_PORT
}

fn default_status_port() -> u16 {
    DEFAULT_STATUS_PORT
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::Multicast,
            direct_host: default_direct_host(),
            multicast_host: default_multicast_host(),
            telemetry_port: DEFAULT_TELEMETRY_PORT,
            zmq_telemetry_port: DEFAULT_ZMQ_TELEMETRY_PORT,
            status_port: DEFAULT_STATUS_PORT,
            listening: false,
        }
    }
}

impl ConnectionConfig {
    /// Switches mode and, when given, the host used by that mode.
    ///
    /// `Both` applies the host to the multicast group and the direct
    /// publisher. The telemetry port follows the mode: the ZMQ telemetry port
    /// for `DirectSocket`, the multicast default otherwise.
    pub fn update_connection(&mut self, mode: ConnectionMode, host: Option<&str>) {
        self.mode = mode;

        if let Some(host) = host {
            match mode {
                ConnectionMode::Multicast => self.multicast_host = host.to_string(),
                ConnectionMode::DirectSocket => self.direct_host = host.to_string(),
                ConnectionMode::Both => {
                    self.multicast_host = host.to_string();
                    self.direct_host = host.to_string();
                }
            }
        }

        self.telemetry_port = match mode {
            ConnectionMode::DirectSocket => self.zmq_telemetry_port,
            ConnectionMode::Multicast | ConnectionMode::Both => DEFAULT_TELEMETRY_PORT,
        };
    }

    /// Flips `listening` and returns the new value.
    pub fn toggle_listening(&mut self) -> bool {
        self.listening = !self.listening;
        self.listening
    }

    /// Host(s) the current mode talks to, for display.
    pub fn active_host(&self) -> String {
        match self.mode {
            ConnectionMode::Multicast => self.multicast_host.clone(),
            ConnectionMode::DirectSocket => self.direct_host.clone(),
            ConnectionMode::Both => format!("{} and {}", self.multicast_host, self.direct_host),
        }
    }

    /// Sockets this configuration asks for.
    ///
    /// In `Both` mode the multicast side listens on `telemetry_port` while the
    /// direct side connects to `zmq_telemetry_port`; both use `status_port`.
    pub fn target(&self) -> TransportTarget {
        let multicast = || {
            EndpointPair::new(
                self.multicast_host.clone(),
                self.telemetry_port,
                self.status_port,
            )
        };

        match self.mode {
            ConnectionMode::Multicast => TransportTarget::multicast(multicast()),
            ConnectionMode::DirectSocket => TransportTarget::direct(EndpointPair::new(
                self.direct_host.clone(),
                self.telemetry_port,
                self.status_port,
            )),
            ConnectionMode::Both => TransportTarget {
                mode: ConnectionMode::Both,
                multicast: Some(multicast()),
                direct: Some(EndpointPair::new(
                    self.direct_host.clone(),
                    self.zmq_telemetry_port,
                    self.status_port,
                )),
            },
        }
    }

    /// Validates hosts and ports.
    pub fn validate(&self) -> Result<()> {
        for (field, port) in [
            ("connection.telemetry_port", self.telemetry_port),
            ("connection.zmq_telemetry_port", self.zmq_telemetry_port),
            ("connection.status_port", self.status_port),
        ] {
            if port == 0 {
                return Err(ConfigError::invalid_value(field, "Port cannot be 0").into());
            }
        }

        if self.telemetry_port == self.status_port {
            return Err(ConfigError::invalid_value(
                "connection.status_port",
                format!(
                    "Telemetry and status ports must differ (both {})",
                    self.status_port
                ),
            )
            .into());
        }

        // Both subscribers would otherwise connect to the status publisher
        if self.mode.uses_direct() && self.zmq_telemetry_port == self.status_port {
            return Err(ConfigError::invalid_value(
                "connection.zmq_telemetry_port",
                format!(
                    "ZMQ telemetry and status ports must differ (both {})",
                    self.status_port
                ),
            )
            .into());
        }

        if self.mode.uses_multicast() && self.multicast_host.parse::<IpAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "connection.multicast_host",
                format!("Not an IP address: {}", self.multicast_host),
            )
            .into());
        }

        if self.mode.uses_direct() && self.direct_host.trim().is_empty() {
            return Err(
                ConfigError::invalid_value("connection.direct_host", "Host cannot be empty").into(),
            );
        }

        Ok(())
    }
}

/// Main application configuration.
///
/// # Examples
///
/// ```no_run
/// use dragonlink_core::config::AppConfig;
///
/// let config = AppConfig::from_config_builder("dragonlink.yaml").unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Initial connection settings
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Presentation preferences, passed through untouched
    #[serde(default)]
    pub preferences: PreferencesConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Queue sizes and socket tuning
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&contents)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads configuration using the `config` crate, layering
    /// `DRAGONLINK__SECTION__FIELD` environment variables over the file.
    pub fn from_config_builder<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix("DRAGONLINK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        config.try_deserialize().map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;
        self.logging.parse_level()?;
        self.ingest.validate()?;
        Ok(())
    }
}

/// Preferences owned by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesConfig {
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,

    #[serde(default)]
    pub keep_screen_on: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            keep_screen_on: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    /// Parses the log level string to a tracing Level.
    pub fn parse_level(&self) -> Result<Level> {
        self.level.parse().map_err(|_| {
            ConfigError::invalid_value("logging.level", format!("Invalid log level: {}", self.level))
                .into()
        })
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
}

/// Queue sizes and socket tuning for the ingest path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Capacity of the store coordinator queue
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Payloads buffered between a ZMQ reader thread and its dispatcher
    #[serde(default = "default_listener_buffer")]
    pub listener_buffer: usize,

    /// Largest datagram accepted by the UDP listeners
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,

    /// ZMQ receive timeout; bounds how long cancellation takes to be seen
    #[serde(default = "default_zmq_poll_interval_ms")]
    pub zmq_poll_interval_ms: u64,

    /// Capacity of each store's change-event broadcast
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_listener_buffer() -> usize {
    256
}

fn default_recv_buffer_size() -> usize {
    65536
}

fn default_zmq_poll_interval_ms() -> u64 {
    100
}

fn default_event_capacity() -> usize {
    256
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            listener_buffer: default_listener_buffer(),
            recv_buffer_size: default_recv_buffer_size(),
            zmq_poll_interval_ms: default_zmq_poll_interval_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl IngestConfig {
    /// Returns the ZMQ poll interval as a Duration.
    pub fn zmq_poll_interval(&self) -> Duration {
        Duration::from_millis(self.zmq_poll_interval_ms)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("ingest.channel_capacity", self.channel_capacity),
            ("ingest.listener_buffer", self.listener_buffer),
            ("ingest.recv_buffer_size", self.recv_buffer_size),
            ("ingest.event_capacity", self.event_capacity),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid_value(field, "Must be greater than 0").into());
            }
        }

        if self.zmq_poll_interval_ms == 0 {
            return Err(ConfigError::invalid_value(
                "ingest.zmq_poll_interval_ms",
                "Must be greater than 0",
            )
            .into());
        }

        Ok(())
    }
}
