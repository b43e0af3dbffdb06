//! Edgeflow - Sources
//!
//! Triggers: the sources of envelopes for the dispatcher.
//!
//! # Available Triggers
//!
//! - **HTTP** - `POST /api/v1/trigger[/{topic}]`, replies with the first pipeline response
//! - **MQTT** - Message-bus subscriber, publishes responses and background messages
//! - **Channel** - In-process ("custom") trigger over tokio mpsc channels
//!
//! # Lifecycle
//!
//! ```text
//! Trigger::initialize(shutdown, background_rx) ──→ TriggerHandle
//!        │                                              │
//!        └── envelopes ──→ Dispatcher::message_received │
//!                                                       │
//! shutdown.cancel() ──→ TriggerHandle::wait(timeout) ───┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use edgeflow_sources::{HttpTrigger, Trigger};
//! use tokio_util::sync::CancellationToken;
//!
//! let (publisher, background_rx) = edgeflow_pipeline::background_channel(1000);
//! let shutdown = CancellationToken::new();
//!
//! let trigger = Box::new(HttpTrigger::new(config.trigger.http.clone(), dispatcher.clone()));
//! let handle = trigger.initialize(shutdown.clone(), background_rx).await?;
//!
//! tokio::signal::ctrl_c().await?;
//! shutdown.cancel();
//! handle.wait(config.global.shutdown_timeout).await?;
//! ```

pub mod channel;
pub mod http;
pub mod mqtt;

mod common;
mod error;
mod trigger;

#[cfg(test)]
mod test_util;

pub use channel::{ChannelTrigger, TriggerOutput};
pub use common::{TriggerMetrics, TriggerSnapshot};
pub use error::{Result, TriggerError};
pub use http::HttpTrigger;
pub use mqtt::{MqttResponder, MqttTrigger};
pub use trigger::{Trigger, TriggerHandle};
