mod file_config;

pub use file_config::{FileConfig, WebSocketConfig};

use crate::server::{HeartbeatConfig, RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::Path;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub bind_address: String,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub ping_interval_sec: u64,
    pub ping_timeout_sec: u64,
    pub outbound_buffer: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_address: String,
    pub port: u16,
    /// `None` when the metrics listener is disabled (port 0).
    pub metrics_port: Option<u16>,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub heartbeat: HeartbeatConfig,
    pub outbound_buffer: usize,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let websocket = file.websocket.unwrap_or_default();

        let bind_address = file
            .bind_address
            .unwrap_or_else(|| cli.bind_address.clone());
        if bind_address.trim().is_empty() {
            bail!("bind_address must not be empty");
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = match file.metrics_port.unwrap_or(cli.metrics_port) {
            0 => None,
            port => Some(port),
        };

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        if let Some(dir) = &frontend_dir_path {
            let path = Path::new(dir);
            if !path.exists() {
                bail!("Frontend directory does not exist: {:?}", path);
            }
            if !path.is_dir() {
                bail!("frontend_dir_path is not a directory: {:?}", path);
            }
        }

        let ping_interval_sec = websocket
            .ping_interval_sec
            .unwrap_or(cli.ping_interval_sec);
        let ping_timeout_sec = websocket.ping_timeout_sec.unwrap_or(cli.ping_timeout_sec);
        if ping_interval_sec == 0 {
            bail!("ping_interval_sec must be greater than 0");
        }
        if ping_timeout_sec <= ping_interval_sec {
            bail!(
                "ping_timeout_sec ({}) must be greater than ping_interval_sec ({})",
                ping_timeout_sec,
                ping_interval_sec
            );
        }

        let outbound_buffer = websocket.outbound_buffer.unwrap_or(cli.outbound_buffer);
        if outbound_buffer == 0 {
            bail!("outbound_buffer must be greater than 0");
        }

        Ok(Self {
            bind_address,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            heartbeat: HeartbeatConfig {
                ping_interval: Duration::from_secs(ping_interval_sec),
                ping_timeout: Duration::from_secs(ping_timeout_sec),
            },
            outbound_buffer,
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            bind_address: self.bind_address.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            frontend_dir_path: self.frontend_dir_path.clone(),
            heartbeat: self.heartbeat,
            outbound_buffer: self.outbound_buffer,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
