//! Trigger seam
//!
//! A trigger sources envelopes, hands each to the dispatcher with a
//! response handler, and publishes background messages. `initialize`
//! starts it; the returned [`TriggerHandle`] is the deferred cleanup the
//! service awaits after cancelling the shutdown token.

use std::time::Duration;

use async_trait::async_trait;
use edgeflow_pipeline::BackgroundMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{Result, TriggerError};

/// Envelope source for the dispatcher
#[async_trait]
pub trait Trigger: Send {
    /// Trigger kind for logging
    fn name(&self) -> &'static str;

    /// Start delivering envelopes until `shutdown` is cancelled
    ///
    /// Setup failures (bind, broker connect, credentials) are returned
    /// here; once this returns `Ok`, the trigger runs on its own task.
    async fn initialize(
        self: Box<Self>,
        shutdown: CancellationToken,
        background: mpsc::Receiver<BackgroundMessage>,
    ) -> Result<TriggerHandle>;
}

/// Running trigger task
#[derive(Debug)]
pub struct TriggerHandle {
    name: &'static str,
    task: JoinHandle<Result<()>>,
}

impl TriggerHandle {
    pub fn new(name: &'static str, task: JoinHandle<Result<()>>) -> Self {
        Self { name, task }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the trigger to stop, aborting it after `timeout`
    pub async fn wait(mut self, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(TriggerError::Task(e.to_string())),
            Err(_) => {
                tracing::warn!(trigger = self.name, ?timeout, "trigger did not stop in time, aborting");
                self.task.abort();
                Err(TriggerError::ShutdownTimeout(timeout))
            }
        }
    }
}
