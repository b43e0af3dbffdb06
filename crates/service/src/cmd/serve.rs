//! Serve command - run the configured trigger until shutdown
//!
//! Startup order: secrets, dispatcher, pipelines, background channel,
//! trigger. Shutdown cancels the trigger and closes every pipeline function
//! at once, so open batch windows flush into the runs the trigger is
//! draining. It then waits up to `global.shutdown_timeout` for the trigger
//! and closes the functions again to disconnect exporters used by those
//! final flushes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use edgeflow_config::{Config, TriggerConfig, TriggerType};
use edgeflow_pipeline::{Dispatcher, MemoryRetryStore, background_channel};
use edgeflow_secrets::{MemorySecretStore, SecretProvider};
use edgeflow_sources::{HttpTrigger, MqttTrigger, Trigger, TriggerHandle};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::pipeline_builder;

/// Run until `shutdown_signal` resolves
pub async fn run(config: Config, shutdown_signal: impl Future<Output = Result<()>>) -> Result<()> {
    let secrets: Arc<dyn SecretProvider> =
        Arc::new(MemorySecretStore::from_config(&config.secrets));
    let dispatcher = Dispatcher::new(secrets, Arc::new(MemoryRetryStore::new()));

    let registry = edgeflow_sinks::create_default_registry();
    let pipeline_count = pipeline_builder::register_pipelines(&dispatcher, &config, &registry)?;

    let (publisher, background_rx) = background_channel(config.global.queue_size);
    let trigger = build_trigger(&config.trigger, dispatcher.clone())?;
    let trigger_name = trigger.name();

    let shutdown = CancellationToken::new();
    let handle = trigger
        .initialize(shutdown.clone(), background_rx)
        .await
        .with_context(|| format!("failed to start {trigger_name} trigger"))?;

    info!(
        trigger = trigger_name,
        pipelines = pipeline_count,
        queue_size = config.global.queue_size,
        "edgeflow running"
    );

    if let Err(e) = shutdown_signal.await {
        warn!(error = %e, "shutdown signal failed, stopping");
    }
    info!("shutdown signal received, stopping trigger...");
    stop(&shutdown, handle, &dispatcher, config.global.shutdown_timeout).await;
    drop(publisher);

    let metrics = dispatcher.metrics();
    info!(
        envelopes = metrics.envelopes_received,
        unmatched = metrics.envelopes_unmatched,
        succeeded = metrics.pipelines_succeeded,
        failed = metrics.pipelines_failed,
        responses = metrics.responses_emitted,
        retry_writes = metrics.retry_writes,
        "dispatcher stopped"
    );
    Ok(())
}

/// Stop the trigger and close every pipeline function
async fn stop(
    shutdown: &CancellationToken,
    handle: TriggerHandle,
    dispatcher: &Dispatcher,
    timeout: Duration,
) {
    shutdown.cancel();
    // wakes open batch windows so their final flush runs inside the drain
    dispatcher.close();

    if let Err(e) = handle.wait(timeout).await {
        warn!(error = %e, "trigger did not shut down cleanly");
    }
    dispatcher.close();
}

/// Trigger for `[trigger]`
fn build_trigger(config: &TriggerConfig, dispatcher: Dispatcher) -> Result<Box<dyn Trigger>> {
    Ok(match config.trigger_type {
        TriggerType::Http => Box::new(HttpTrigger::new(config.http.clone(), dispatcher)),
        TriggerType::Mqtt => Box::new(MqttTrigger::new(config.mqtt.clone(), dispatcher)),
        TriggerType::Custom => bail!(
            "custom triggers are provided by the embedding application \
             (edgeflow_sources::ChannelTrigger), not by the edgeflow binary"
        ),
    })
}

/// Wait for SIGINT or SIGTERM
pub async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?;
        tokio::select! {
            result = signal::ctrl_c() => result.context("failed to listen for Ctrl+C")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    Ok(())
}
