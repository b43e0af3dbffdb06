//! Tracing subscriber installation from `[log]`

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use edgeflow_config::{LogConfig, LogFormat, LogOutput};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.filter_directive())
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid log filter")?;

    let (writer, ansi) = make_writer(&config.output)?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_writer(writer))
            .try_init(),
        LogFormat::Console => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))
}

/// Writer for the configured output, and whether it may carry colors
fn make_writer(output: &LogOutput) -> Result<(BoxMakeWriter, bool)> {
    Ok(match output {
        LogOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), true),
        LogOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {path}"))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    })
}
