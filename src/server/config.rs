use std::time::Duration;

use super::RequestsLoggingLevel;
use super::websocket::DEFAULT_OUTBOUND_BUFFER;

/// Liveness settings for WebSocket connections.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeartbeatConfig {
    /// How often the server pings each client.
    pub ping_interval: Duration,
    /// A connection silent for this long is considered dead and closed.
    pub ping_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        HeartbeatConfig {
            ping_interval: Duration::from_secs(25),
            ping_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub bind_address: String,
    pub port: u16,
    /// Port of the Prometheus listener, `None` disables it.
    pub metrics_port: Option<u16>,
    pub frontend_dir_path: Option<String>,
    pub heartbeat: HeartbeatConfig,
    /// Capacity of each connection's outbound queue.
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            metrics_port: Some(9091),
            frontend_dir_path: None,
            heartbeat: HeartbeatConfig::default(),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}
