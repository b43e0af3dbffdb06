//! Edgeflow - Pipeline
//!
//! The dispatcher that connects triggers to function pipelines.
//!
//! # Architecture
//!
//! ```text
//! [Trigger]                 [Dispatcher]                      [Pipelines]
//!   HTTP ────┐                                          ┌──→ default-pipeline (#)
//!   MQTT ────┼──→ message_received ──→ RoutingTable ────┼──→ alarms (events/alarm)
//!   custom ──┘         │                  topic match   └──→ ...
//!                      │
//!                      └──← responses ── ResponseHandler      retry payloads ──→ RetryStore
//! ```
//!
//! # Key Design
//!
//! - **Task per pipeline**: every matched pipeline runs in its own tokio task
//! - **Failure isolation**: a failing or panicking pipeline never affects others
//! - **Narrow retry capability**: functions only call `set_retry_data`; the
//!   dispatcher owns the store and keys entries by pipeline hash
//! - **Background publishing**: application code publishes through the
//!   active trigger with a [`BackgroundPublisher`]

mod background;
mod dispatcher;
mod error;
mod hash;
mod metrics;
mod response;
mod retry;

pub use background::{BackgroundMessage, BackgroundPublisher, background_channel};
pub use dispatcher::{
    BACKGROUND_PIPELINE_ID, DEFAULT_PIPELINE_ID, DispatchSummary, Dispatcher, Pipeline,
};
pub use error::{PipelineError, Result};
pub use hash::pipeline_hash;
pub use metrics::{DispatchSnapshot, DispatcherMetrics};
pub use response::{DiscardResponses, PipelineResponse, ResponseCollector, ResponseHandler};
pub use retry::{MemoryRetryStore, RetryEntry, RetryKey, RetryStore};

/// Default capacity of the background publish channel
pub const DEFAULT_BACKGROUND_CHANNEL_SIZE: usize = 1000;

#[cfg(test)]
mod dispatcher_test;
