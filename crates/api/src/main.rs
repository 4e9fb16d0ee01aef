//! RelationNFT API - webhook ingress and milestone mint oracle
//!
//! Loads `relationnft.toml`, connects to the RelationNFT contract and the
//! pinning service, and serves the HTTP API until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use relationnft_api::server;
use relationnft_oracle::config::{Config, LoggingConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "relationnft-api")]
#[command(version, about = "RelationNFT milestone oracle and webhook API", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "relationnft.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;

    init_logging(cli.debug, &config.logging);

    info!("RelationNFT API starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", cli.config);
    info!("  Chain ID: {}", config.network.chain_id);
    info!("  RPC URL: {}", config.network.rpc_url);

    server::run(config).await
}

/// Initialize tracing subscriber for logging
fn init_logging(debug: bool, logging: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = if debug {
        EnvFilter::new("relationnft_api=debug,relationnft_oracle=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "relationnft_api={0},relationnft_oracle={0},tower_http={0}",
                logging.level
            ))
        })
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format == "json" {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}
