//! Edgeflow - Function-pipeline runtime for IoT telemetry
//!
//! # Usage
//!
//! ```bash
//! edgeflow --config configs/edgeflow.toml
//! edgeflow --config configs/edgeflow.toml --log-level debug
//! ```

mod cmd;
mod logging;
mod pipeline_builder;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use edgeflow_config::{Config, LogLevel};

/// Edgeflow - Function-pipeline runtime for IoT telemetry
#[derive(Parser, Debug)]
#[command(name = "edgeflow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }

    logging::init(&config.log)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        config = %cli.config.display(),
        "edgeflow starting"
    );

    if let Err(e) = cmd::serve::run(config, cmd::serve::wait_for_shutdown()).await {
        tracing::error!(error = %e, "service error");
        return Err(e);
    }

    tracing::info!("edgeflow shutdown complete");
    Ok(())
}
