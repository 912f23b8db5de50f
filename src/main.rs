use anyhow::Result;
use clap::Parser;
use std::fmt::Debug;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use peer_signaling_server::config;
use peer_signaling_server::server::{metrics, run_server, RequestsLoggingLevel};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The address to bind the HTTP/WebSocket listener to.
    #[clap(long, default_value = "0.0.0.0")]
    pub bind_address: String,

    /// The port to listen on.
    #[clap(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping). 0 disables it.
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to a directory to be statically served (e.g. the web client).
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Seconds between server pings on each WebSocket connection.
    #[clap(long, default_value_t = 25)]
    pub ping_interval_sec: u64,

    /// Seconds of silence after which a connection is dropped.
    #[clap(long, default_value_t = 60)]
    pub ping_timeout_sec: u64,

    /// Capacity of each connection's outbound message queue.
    #[clap(long, default_value_t = 32)]
    pub outbound_buffer: usize,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            bind_address: args.bind_address.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            ping_interval_sec: args.ping_interval_sec,
            ping_timeout_sec: args.ping_timeout_sec,
            outbound_buffer: args.outbound_buffer,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  listen: {}:{}", app_config.bind_address, app_config.port);
    info!("  metrics_port: {:?}", app_config.metrics_port);
    info!("  frontend_dir_path: {:?}", app_config.frontend_dir_path);
    info!(
        "  heartbeat: ping every {:?}, timeout {:?}",
        app_config.heartbeat.ping_interval, app_config.heartbeat.ping_timeout
    );

    info!("Initializing metrics...");
    metrics::init_metrics();

    run_server(app_config.server_config()).await
}
