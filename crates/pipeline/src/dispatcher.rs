//! Dispatcher - Topic-routed pipeline execution
//!
//! The `Dispatcher` receives envelopes from a trigger, selects every
//! pipeline whose topics match the envelope topic, and runs each selected
//! pipeline in its own task. Functions within one pipeline run sequentially.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use edgeflow_protocol::{Event, MessageEnvelope, Payload};
use edgeflow_routing::{RoutingError, RoutingTable, WILDCARD};
use edgeflow_secrets::SecretProvider;
use edgeflow_transform::value_store::{
    KEY_DEVICE_NAME, KEY_PROFILE_NAME, KEY_RECEIVED_TOPIC, KEY_SOURCE_NAME,
};
use edgeflow_transform::{Chain, FunctionContext};
use parking_lot::RwLock;
use tracing::Instrument;

use crate::hash::pipeline_hash;
use crate::metrics::{DispatchSnapshot, DispatcherMetrics};
use crate::response::{PipelineResponse, ResponseHandler};
use crate::retry::{RetryKey, RetryStore};
use crate::{PipelineError, Result};

/// Id of the catch-all pipeline
pub const DEFAULT_PIPELINE_ID: &str = "default-pipeline";

/// Pipeline id recorded on contexts built outside of a pipeline run
pub const BACKGROUND_PIPELINE_ID: &str = "background";

/// A registered pipeline
pub struct Pipeline {
    id: String,
    topics: Vec<String>,
    chain: Chain,
    hash: String,
}

impl Pipeline {
    fn new(id: String, topics: Vec<String>, chain: Chain) -> Self {
        let hash = pipeline_hash(&id, &chain.identifiers());
        Self {
            id,
            topics,
            chain,
            hash,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Key prefix for this pipeline's retry payloads
    #[inline]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("id", &self.id)
            .field("topics", &self.topics)
            .field("functions", &self.chain.identifiers())
            .field("hash", &self.hash)
            .finish()
    }
}

/// What happened to one envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchSummary {
    /// Pipelines selected for the envelope topic
    pub matched: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl DispatchSummary {
    /// Every selected pipeline failed
    #[inline]
    pub fn all_failed(&self) -> bool {
        self.matched > 0 && self.succeeded == 0
    }
}

#[derive(Default)]
struct Routes {
    table: RoutingTable,
    pipelines: HashMap<String, Arc<Pipeline>>,
}

struct Inner {
    routes: RwLock<Routes>,
    secrets: Arc<dyn SecretProvider>,
    retry_store: Arc<dyn RetryStore>,
    metrics: DispatcherMetrics,
}

/// Routes envelopes to pipelines
///
/// Cloning is cheap; clones share pipelines, metrics and stores.
///
/// # Example
///
/// ```ignore
/// let dispatcher = Dispatcher::new(secrets, Arc::new(MemoryRetryStore::new()));
/// dispatcher.set_default_pipeline(Chain::new(vec![Arc::new(SetResponseData::default())]))?;
/// dispatcher.add_pipeline_for_topics("alarms", &["events/alarm"], alarm_chain)?;
///
/// let summary = dispatcher
///     .message_received(envelope, Arc::new(DiscardResponses))
///     .await;
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(secrets: Arc<dyn SecretProvider>, retry_store: Arc<dyn RetryStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                routes: RwLock::new(Routes::default()),
                secrets,
                retry_store,
                metrics: DispatcherMetrics::new(),
            }),
        }
    }

    /// Define or replace the catch-all pipeline (`default-pipeline`, topics `#`)
    pub fn set_default_pipeline(&self, chain: Chain) -> Result<()> {
        self.register(DEFAULT_PIPELINE_ID, &[WILDCARD], chain, true)
    }

    /// Register a pipeline for the given topics
    ///
    /// # Errors
    /// - Blank id or empty/blank topics (`PipelineError::Routing`)
    /// - `EmptyPipeline` when `chain` has no functions
    /// - `DuplicatePipeline` when `id` is already registered
    pub fn add_pipeline_for_topics(
        &self,
        id: &str,
        topics: &[impl AsRef<str>],
        chain: Chain,
    ) -> Result<()> {
        self.register(id, topics, chain, false)
    }

    fn register(
        &self,
        id: &str,
        topics: &[impl AsRef<str>],
        chain: Chain,
        replace: bool,
    ) -> Result<()> {
        if id.trim().is_empty() {
            return Err(RoutingError::EmptyPipelineId.into());
        }
        if chain.is_empty() {
            return Err(PipelineError::EmptyPipeline(id.to_string()));
        }

        let mut routes = self.inner.routes.write();
        if !replace && routes.pipelines.contains_key(id) {
            return Err(PipelineError::DuplicatePipeline(id.to_string()));
        }
        routes.table.insert(id, topics)?;

        let topics = topics.iter().map(|t| t.as_ref().to_string()).collect();
        let pipeline = Arc::new(Pipeline::new(id.to_string(), topics, chain));
        tracing::info!(
            pipeline = %pipeline.id,
            topics = ?pipeline.topics,
            functions = ?pipeline.chain.identifiers(),
            hash = %pipeline.hash,
            "pipeline registered"
        );
        routes.pipelines.insert(id.to_string(), pipeline);
        Ok(())
    }

    /// Unregister a pipeline, returning it if it existed
    pub fn remove_pipeline(&self, id: &str) -> Option<Arc<Pipeline>> {
        let mut routes = self.inner.routes.write();
        routes.table.remove(id);
        routes.pipelines.remove(id)
    }

    pub fn pipeline(&self, id: &str) -> Option<Arc<Pipeline>> {
        self.inner.routes.read().pipelines.get(id).cloned()
    }

    /// Registered pipeline ids in registration order
    pub fn pipeline_ids(&self) -> Vec<String> {
        self.inner
            .routes
            .read()
            .table
            .ids()
            .map(str::to_string)
            .collect()
    }

    pub fn pipeline_count(&self) -> usize {
        self.inner.routes.read().pipelines.len()
    }

    /// Pipelines selected for `topic`, in registration order
    pub fn matching_pipelines(&self, topic: &str) -> Vec<Arc<Pipeline>> {
        let routes = self.inner.routes.read();
        routes
            .table
            .route(topic)
            .into_iter()
            .filter_map(|id| routes.pipelines.get(id).cloned())
            .collect()
    }

    /// Context for work that is not driven by an envelope
    pub fn build_context(
        &self,
        correlation_id: impl Into<String>,
        content_type: impl Into<String>,
    ) -> FunctionContext {
        FunctionContext::new(
            correlation_id,
            content_type,
            BACKGROUND_PIPELINE_ID,
            Arc::clone(&self.inner.secrets),
        )
    }

    /// Run every matching pipeline on `envelope`
    ///
    /// Pipelines run concurrently, each in its own task. A failing or
    /// panicking pipeline does not affect the others. Returns once every
    /// run has finished. Runs are detached from the returned future:
    /// dropping it does not cancel them.
    pub async fn message_received(
        &self,
        envelope: MessageEnvelope,
        responder: Arc<dyn ResponseHandler>,
    ) -> DispatchSummary {
        let inner = &self.inner;
        inner.metrics.record_received();

        let pipelines = self.matching_pipelines(envelope.received_topic());
        if pipelines.is_empty() {
            tracing::debug!(
                topic = %envelope.received_topic(),
                correlation_id = %envelope.correlation_id(),
                "no pipeline matches topic, dropping envelope"
            );
            inner.metrics.record_unmatched();
            return DispatchSummary::default();
        }
        inner.metrics.record_matched(pipelines.len() as u64);

        let envelope = Arc::new(envelope);
        let mut summary = DispatchSummary {
            matched: pipelines.len(),
            ..Default::default()
        };

        let mut tasks = Vec::with_capacity(pipelines.len());
        for pipeline in pipelines {
            let ctx = FunctionContext::new(
                envelope.correlation_id(),
                envelope.content_type(),
                pipeline.id(),
                Arc::clone(&inner.secrets),
            );
            let span = ctx.span().clone();
            tasks.push(tokio::spawn(
                run_pipeline(
                    Arc::clone(inner),
                    pipeline,
                    Arc::clone(&envelope),
                    ctx,
                    Arc::clone(&responder),
                )
                .instrument(span),
            ));
        }

        for task in tasks {
            match task.await {
                Ok(true) => summary.succeeded += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    tracing::error!(
                        correlation_id = %envelope.correlation_id(),
                        error = %e,
                        "pipeline task aborted"
                    );
                    inner.metrics.record_failure();
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Point-in-time dispatcher metrics
    pub fn metrics(&self) -> DispatchSnapshot {
        self.inner.metrics.snapshot()
    }

    pub fn retry_store(&self) -> &Arc<dyn RetryStore> {
        &self.inner.retry_store
    }

    pub fn secret_provider(&self) -> &Arc<dyn SecretProvider> {
        &self.inner.secrets
    }

    /// Close every function of every pipeline
    ///
    /// Wakes batch windows and disconnects exporters. Functions shared by
    /// several pipelines are closed once per pipeline.
    pub fn close(&self) {
        let pipelines: Vec<_> = self.inner.routes.read().pipelines.values().cloned().collect();
        for pipeline in pipelines {
            tracing::debug!(pipeline = %pipeline.id, "closing pipeline");
            pipeline.chain.close();
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pipelines", &self.pipeline_ids())
            .finish()
    }
}

/// One pipeline run; returns whether it succeeded
async fn run_pipeline(
    inner: Arc<Inner>,
    pipeline: Arc<Pipeline>,
    envelope: Arc<MessageEnvelope>,
    mut ctx: FunctionContext,
    responder: Arc<dyn ResponseHandler>,
) -> bool {
    ctx.add_value(KEY_RECEIVED_TOPIC, envelope.received_topic());

    let result = match decode_input(&pipeline, &envelope, &mut ctx) {
        Ok(input) => pipeline
            .chain
            .execute(&mut ctx, input)
            .await
            .map_err(PipelineError::from),
        Err(e) => Err(e),
    };

    let succeeded = match result {
        Ok(_) => {
            inner.metrics.record_success();
            if let Some((data, content_type)) = ctx.take_response() {
                let response = PipelineResponse {
                    pipeline_id: pipeline.id.clone(),
                    correlation_id: ctx.correlation_id().to_string(),
                    data,
                    content_type,
                };
                match responder.handle_response(&ctx, response).await {
                    Ok(()) => inner.metrics.record_response(),
                    Err(e) => {
                        inner.metrics.record_response_failure();
                        tracing::warn!(error = %e, "failed to deliver pipeline response");
                    }
                }
            }
            true
        }
        Err(e) => {
            inner.metrics.record_failure();
            tracing::error!(
                topic = %envelope.received_topic(),
                error = %e,
                "pipeline failed"
            );
            false
        }
    };

    if let Some(data) = ctx.take_retry_data() {
        let key = RetryKey::new(pipeline.hash.clone(), ctx.correlation_id());
        match inner.retry_store.put(key, data).await {
            Ok(()) => {
                inner.metrics.record_retry_write();
                tracing::info!("payload stored for retry");
            }
            Err(e) => {
                inner.metrics.record_retry_failure();
                tracing::error!(error = %e, "failed to store retry payload");
            }
        }
    }

    succeeded
}

/// Input for the first function of `pipeline`
///
/// JSON envelopes are decoded into an `Event` when the first function wants
/// one, and the event names are recorded in the value store.
fn decode_input(
    pipeline: &Pipeline,
    envelope: &MessageEnvelope,
    ctx: &mut FunctionContext,
) -> Result<Option<Payload>> {
    if !(pipeline.chain.wants_event() && envelope.is_json()) {
        return Ok(Some(Payload::from(envelope.payload().clone())));
    }

    let event = Event::from_json(envelope.payload())
        .map_err(|e| PipelineError::decode(pipeline.id(), e))?;
    ctx.add_value(KEY_DEVICE_NAME, event.device_name.clone());
    ctx.add_value(KEY_PROFILE_NAME, event.profile_name.clone());
    ctx.add_value(KEY_SOURCE_NAME, event.source_name.clone());
    Ok(Some(Payload::from(event)))
}
