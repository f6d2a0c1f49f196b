//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the forward proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, port, connection limit).
    pub listener: ListenerConfig,

    /// Header values injected into every forwarded request.
    pub headers: HeaderConfig,

    /// Buffer bounds.
    pub limits: LimitsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// TCP port to accept clients on. Usually given on the command line.
    pub port: u16,

    /// Maximum concurrent client connections (backpressure).
    pub max_connections: usize,
}

impl ListenerConfig {
    /// `host:port` string for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 15213,
            max_connections: 1_024,
        }
    }
}

/// Values for the User-Agent, Connection and Proxy-Connection headers.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HeaderConfig {
    pub user_agent: String,
    pub connection: String,
    pub proxy_connection: String,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3"
                .to_string(),
            connection: "close".to_string(),
            proxy_connection: "close".to_string(),
        }
    }
}

/// Buffer bounds for reading from either socket.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest single line read at once. Longer lines are relayed in pieces.
    pub max_line_bytes: usize,

    /// Largest client header section accepted.
    pub max_header_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: 8_192,
            max_header_bytes: 64 * 1024,
        }
    }
}

/// Timeout configuration. Unset values mean "block indefinitely".
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connect timeout in seconds.
    pub connect_secs: Option<u64>,

    /// Maximum wait for a single line from either peer, in seconds.
    pub idle_secs: Option<u64>,

    /// How long shutdown waits for live connections to finish.
    pub shutdown_grace_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Option<Duration> {
        self.connect_secs.map(Duration::from_secs)
    }

    pub fn idle(&self) -> Option<Duration> {
        self.idle_secs.map(Duration::from_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: None,
            idle_secs: None,
            shutdown_grace_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
