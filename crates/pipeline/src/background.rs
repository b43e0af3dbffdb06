//! Background publishing
//!
//! Application code that is not driven by an envelope (timers, watchers)
//! publishes through the active trigger with a [`BackgroundPublisher`].
//! The trigger owns the receiving end and drains it until shutdown.

use edgeflow_protocol::MessageEnvelope;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::{PipelineError, Result};

/// Message published outside of any pipeline run
#[derive(Debug, Clone)]
pub struct BackgroundMessage {
    /// Destination topic; the trigger's default publish topic when `None`
    pub topic: Option<String>,
    pub envelope: MessageEnvelope,
}

impl BackgroundMessage {
    pub fn new(envelope: MessageEnvelope) -> Self {
        Self {
            topic: None,
            envelope,
        }
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

/// Bounded sender for background messages
#[derive(Debug, Clone)]
pub struct BackgroundPublisher {
    sender: mpsc::Sender<BackgroundMessage>,
}

/// Create a publisher and the receiver a trigger drains
pub fn background_channel(
    capacity: usize,
) -> (BackgroundPublisher, mpsc::Receiver<BackgroundMessage>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (BackgroundPublisher { sender }, receiver)
}

impl BackgroundPublisher {
    /// Publish, waiting for channel capacity
    pub async fn publish(&self, message: BackgroundMessage) -> Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| PipelineError::ChannelClosed)
    }

    /// Publish without waiting
    pub fn try_publish(&self, message: BackgroundMessage) -> Result<()> {
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => PipelineError::ChannelFull,
            TrySendError::Closed(_) => PipelineError::ChannelClosed,
        })
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Remaining channel capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.sender.capacity()
    }
}
