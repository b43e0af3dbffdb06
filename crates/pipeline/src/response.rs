//! Trigger response seam
//!
//! A pipeline run that ends successfully with response data set hands the
//! response to the trigger that delivered the envelope. HTTP writes it to
//! the reply body, the message bus publishes it, the channel trigger
//! forwards it.

use async_trait::async_trait;
use bytes::Bytes;
use edgeflow_transform::FunctionContext;
use parking_lot::Mutex;

use crate::Result;

/// Response produced by one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResponse {
    pub pipeline_id: String,
    pub correlation_id: String,
    pub data: Bytes,
    pub content_type: Option<String>,
}

/// Receives pipeline responses for one envelope
///
/// The context is the finished run's context, so implementations can
/// resolve `{name}` templates against its value store.
#[async_trait]
pub trait ResponseHandler: Send + Sync {
    async fn handle_response(&self, ctx: &FunctionContext, response: PipelineResponse)
    -> Result<()>;
}

/// Drops every response
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardResponses;

#[async_trait]
impl ResponseHandler for DiscardResponses {
    async fn handle_response(&self, _: &FunctionContext, response: PipelineResponse) -> Result<()> {
        tracing::trace!(pipeline = %response.pipeline_id, "response discarded");
        Ok(())
    }
}

/// Keeps responses in arrival order
#[derive(Debug, Default)]
pub struct ResponseCollector {
    responses: Mutex<Vec<PipelineResponse>>,
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every collected response
    pub fn take(&self) -> Vec<PipelineResponse> {
        std::mem::take(&mut *self.responses.lock())
    }

    pub fn len(&self) -> usize {
        self.responses.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.lock().is_empty()
    }
}

#[async_trait]
impl ResponseHandler for ResponseCollector {
    async fn handle_response(&self, _: &FunctionContext, response: PipelineResponse) -> Result<()> {
        self.responses.lock().push(response);
        Ok(())
    }
}
