//! HTTP/1.0 forwarding proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client                         forward-proxy                          Origin
//!  ────────┐   ┌──────────┐   ┌──────────────────────────────┐   ┌──────────┐   ┌────────
//!  GET ... │──▶│ listener │──▶│ relay engine                 │──▶│ upstream │──▶│ HTTP/1.0
//!          │   │ (permits)│   │  request line → uri → headers│   │ connector│   │ server
//!  ◀───────│◀──┴──────────┴───│  ◀── response lines ◀────────│◀──┴──────────┴───│
//!  ────────┘                  └──────────────────────────────┘                  └────────
//! ```
//!
//! Usage: `forward-proxy <PORT> [--config FILE] [--bind HOST] [--log-level LEVEL]`

use std::path::PathBuf;

use clap::Parser;

use forward_proxy::config::loader::{load_config, ConfigError};
use forward_proxy::config::validation::validate_config;
use forward_proxy::config::ProxyConfig;
use forward_proxy::lifecycle::signals::shutdown_on_signal;
use forward_proxy::lifecycle::Shutdown;
use forward_proxy::net::listener::Listener;
use forward_proxy::observability::{logging, metrics};
use forward_proxy::ProxyServer;

#[derive(Debug, Parser)]
#[command(name = "forward-proxy")]
#[command(about = "Minimal HTTP/1.0 forwarding proxy", long_about = None)]
struct Cli {
    /// Port to accept client connections on.
    port: u16,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind, overriding the configuration file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error), overriding the file.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };

        config.listener.port = self.port;
        if let Some(bind) = self.bind {
            config.listener.bind_host = bind;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = cli.into_config()?;

    logging::init_logging(&config.observability.log_level)?;

    tracing::info!("forward-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        max_connections = config.listener.max_connections,
        max_line_bytes = config.limits.max_line_bytes,
        connect_timeout_secs = ?config.timeouts.connect_secs,
        idle_timeout_secs = ?config.timeouts.idle_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let server = ProxyServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
