//! Channel Trigger - in-process ("custom") source
//!
//! Envelopes arrive on an mpsc receiver; pipeline responses and background
//! messages leave on an mpsc sender as [`TriggerOutput`]. Embedders use it
//! to drive pipelines from their own transport.
//!
//! ```ignore
//! let (envelope_tx, envelope_rx) = mpsc::channel(100);
//! let (output_tx, mut output_rx) = mpsc::channel(100);
//! let trigger = Box::new(ChannelTrigger::new(dispatcher, envelope_rx, output_tx));
//! let handle = trigger.initialize(shutdown.clone(), background_rx).await?;
//!
//! envelope_tx.send(MessageEnvelope::new("events/device/X", payload)).await?;
//! while let Some(TriggerOutput::Response(response)) = output_rx.recv().await { ... }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use edgeflow_pipeline::{
    BackgroundMessage, Dispatcher, PipelineError, PipelineResponse, ResponseHandler,
};
use edgeflow_protocol::MessageEnvelope;
use edgeflow_transform::FunctionContext;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::common::{TriggerMetrics, TriggerSnapshot};
use crate::{Result, Trigger, TriggerHandle};

/// What the channel trigger emits
#[derive(Debug, Clone)]
pub enum TriggerOutput {
    Response(PipelineResponse),
    Background(BackgroundMessage),
}

/// In-process trigger over tokio channels
pub struct ChannelTrigger {
    dispatcher: Dispatcher,
    envelopes: mpsc::Receiver<MessageEnvelope>,
    output: mpsc::Sender<TriggerOutput>,
    metrics: Arc<TriggerMetrics>,
}

impl ChannelTrigger {
    pub fn new(
        dispatcher: Dispatcher,
        envelopes: mpsc::Receiver<MessageEnvelope>,
        output: mpsc::Sender<TriggerOutput>,
    ) -> Self {
        Self {
            dispatcher,
            envelopes,
            output,
            metrics: Arc::new(TriggerMetrics::new()),
        }
    }

    pub fn metrics(&self) -> TriggerSnapshot {
        self.metrics.snapshot()
    }

    pub fn metrics_handle(&self) -> Arc<TriggerMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[async_trait]
impl Trigger for ChannelTrigger {
    fn name(&self) -> &'static str {
        "custom"
    }

    async fn initialize(
        self: Box<Self>,
        shutdown: CancellationToken,
        background: mpsc::Receiver<BackgroundMessage>,
    ) -> Result<TriggerHandle> {
        tracing::info!("channel trigger started");
        let task = tokio::spawn(run(*self, shutdown, background));
        Ok(TriggerHandle::new("custom", task))
    }
}

/// Forwards responses to the output channel
struct ChannelResponder {
    output: mpsc::Sender<TriggerOutput>,
    metrics: Arc<TriggerMetrics>,
}

#[async_trait]
impl ResponseHandler for ChannelResponder {
    async fn handle_response(
        &self,
        _ctx: &FunctionContext,
        response: PipelineResponse,
    ) -> edgeflow_pipeline::Result<()> {
        self.output
            .send(TriggerOutput::Response(response))
            .await
            .map_err(|_| {
                self.metrics.error();
                PipelineError::ChannelClosed
            })?;
        self.metrics.response_sent();
        Ok(())
    }
}

async fn run(
    trigger: ChannelTrigger,
    shutdown: CancellationToken,
    mut background: mpsc::Receiver<BackgroundMessage>,
) -> Result<()> {
    let ChannelTrigger {
        dispatcher,
        mut envelopes,
        output,
        metrics,
    } = trigger;

    let responder = Arc::new(ChannelResponder {
        output: output.clone(),
        metrics: Arc::clone(&metrics),
    });
    let mut in_flight = JoinSet::new();
    let mut background_open = true;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            envelope = envelopes.recv() => {
                let Some(envelope) = envelope else {
                    tracing::info!("envelope channel closed");
                    break;
                };
                metrics.envelope_received(envelope.payload().len() as u64);
                let dispatcher = dispatcher.clone();
                let responder: Arc<dyn ResponseHandler> = responder.clone();
                let metrics = Arc::clone(&metrics);
                in_flight.spawn(async move {
                    if dispatcher.message_received(envelope, responder).await.all_failed() {
                        metrics.error();
                    }
                });
            }

            message = background.recv(), if background_open => match message {
                Some(message) => {
                    if output.send(TriggerOutput::Background(message)).await.is_ok() {
                        metrics.background_sent();
                    } else {
                        metrics.error();
                        tracing::warn!("output channel closed, dropping background message");
                    }
                }
                None => background_open = false,
            },

            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }

    // envelopes already accepted run to completion
    while in_flight.join_next().await.is_some() {}
    tracing::info!("channel trigger stopped");
    Ok(())
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;
