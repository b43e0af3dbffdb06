//! Dispatcher tests
//!
//! Registration rules, topic selection, failure isolation, responses and
//! retry persistence.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use edgeflow_protocol::{CONTENT_TYPE_TEXT, Event, MessageEnvelope, Payload, ValueType};
use edgeflow_routing::RoutingError;
use edgeflow_secrets::MemorySecretStore;
use edgeflow_transform::{
    BatchTransformer, Chain, ConversionTransformer, FunctionContext, Outcome, SetResponseData, TransformError,
    TransformFuture, Transformer, require_event,
};

use crate::{
    BACKGROUND_PIPELINE_ID, DEFAULT_PIPELINE_ID, DiscardResponses, Dispatcher, MemoryRetryStore,
    PipelineError, ResponseCollector, RetryKey, RetryStore, pipeline_hash,
};

/// Responds with a fixed body
struct Respond(&'static str);

impl Transformer for Respond {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        _input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            ctx.set_response_data(Bytes::from_static(self.0.as_bytes()));
            ctx.set_response_content_type(CONTENT_TYPE_TEXT);
            Ok(Outcome::Continue(None))
        })
    }

    fn name(&self) -> &'static str {
        "respond"
    }
}

/// Asks for a retry of its input, then fails like an unreachable broker
struct FailWithRetry;

impl Transformer for FailWithRetry {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            if let Some(Payload::Bytes(bytes)) = input {
                ctx.set_retry_data(bytes);
            }
            Err(TransformError::transport("broker unreachable"))
        })
    }

    fn name(&self) -> &'static str {
        "fail"
    }
}

struct Panics;

impl Transformer for Panics {
    fn transform<'a>(
        &'a self,
        _ctx: &'a mut FunctionContext,
        _input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let bug = true;
            if bug {
                panic!("function bug");
            }
            Ok(Outcome::Stop)
        })
    }

    fn name(&self) -> &'static str {
        "panics"
    }
}

/// Responds with the templated device name and topic
struct EchoValues;

impl Transformer for EchoValues {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            require_event(self.name(), ctx, input)?;
            let body = ctx.apply_values("{devicename}|{profilename}|{sourcename}|{receivedtopic}")?;
            ctx.set_response_data(Bytes::from(body));
            Ok(Outcome::Continue(None))
        })
    }

    fn name(&self) -> &'static str {
        "echo_values"
    }

    fn wants_event(&self) -> bool {
        true
    }
}

fn func<T: Transformer + 'static>(function: T) -> Arc<dyn Transformer> {
    Arc::new(function)
}

fn chain(functions: Vec<Arc<dyn Transformer>>) -> Chain {
    Chain::new(functions)
}

fn respond(body: &'static str) -> Chain {
    chain(vec![func(Respond(body))])
}

fn dispatcher() -> (Dispatcher, Arc<MemoryRetryStore>) {
    let store = Arc::new(MemoryRetryStore::new());
    let dispatcher = Dispatcher::new(
        Arc::new(MemorySecretStore::new()),
        Arc::clone(&store) as Arc<dyn RetryStore>,
    );
    (dispatcher, store)
}

fn device_event() -> Event {
    let mut event = Event::new("thermostat", "X", "temperature");
    event.add_simple_reading("r", ValueType::INT32, "42");
    event
}

fn event_envelope(topic: &str) -> MessageEnvelope {
    let json = device_event().to_json().unwrap();
    MessageEnvelope::new(topic, json.into_bytes()).with_correlation_id("corr-7")
}

async fn responses_for(dispatcher: &Dispatcher, envelope: MessageEnvelope) -> Vec<String> {
    let collector = Arc::new(ResponseCollector::new());
    dispatcher.message_received(envelope, collector.clone()).await;
    let mut ids: Vec<_> = collector.take().into_iter().map(|r| r.pipeline_id).collect();
    ids.sort();
    ids
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_set_default_pipeline() {
    let (dispatcher, _) = dispatcher();
    dispatcher.set_default_pipeline(respond("a")).unwrap();

    let pipeline = dispatcher.pipeline(DEFAULT_PIPELINE_ID).unwrap();
    assert_eq!(pipeline.topics(), &["#".to_string()]);
    assert_eq!(pipeline.hash(), pipeline_hash(DEFAULT_PIPELINE_ID, &["respond"]));
}

#[test]
fn test_set_default_pipeline_replaces() {
    let (dispatcher, _) = dispatcher();
    dispatcher.set_default_pipeline(respond("a")).unwrap();
    dispatcher
        .set_default_pipeline(chain(vec![
            func(Respond("a")),
            func(Respond("b")),
        ]))
        .unwrap();

    assert_eq!(dispatcher.pipeline_count(), 1);
    assert_eq!(
        dispatcher.pipeline(DEFAULT_PIPELINE_ID).unwrap().chain().len(),
        2
    );
}

#[test]
fn test_add_pipeline_validation() {
    let (dispatcher, _) = dispatcher();
    let none: &[&str] = &[];

    assert!(matches!(
        dispatcher.add_pipeline_for_topics("", &["t"], respond("a")),
        Err(PipelineError::Routing(RoutingError::EmptyPipelineId))
    ));
    assert!(matches!(
        dispatcher.add_pipeline_for_topics("p", none, respond("a")),
        Err(PipelineError::Routing(RoutingError::EmptyTopics { .. }))
    ));
    assert!(matches!(
        dispatcher.add_pipeline_for_topics("p", &["t", " "], respond("a")),
        Err(PipelineError::Routing(RoutingError::InvalidTopic { .. }))
    ));
    assert!(matches!(
        dispatcher.add_pipeline_for_topics("p", &["t"], Chain::default()),
        Err(PipelineError::EmptyPipeline(id)) if id == "p"
    ));
    assert_eq!(dispatcher.pipeline_count(), 0);

    dispatcher.add_pipeline_for_topics("p", &["t"], respond("a")).unwrap();
    assert!(matches!(
        dispatcher.add_pipeline_for_topics("p", &["u"], respond("b")),
        Err(PipelineError::DuplicatePipeline(id)) if id == "p"
    ));
    assert_eq!(dispatcher.pipeline("p").unwrap().topics(), &["t".to_string()]);
}

#[test]
fn test_remove_pipeline() {
    let (dispatcher, _) = dispatcher();
    dispatcher.add_pipeline_for_topics("p", &["t"], respond("a")).unwrap();
    dispatcher.add_pipeline_for_topics("q", &["t"], respond("b")).unwrap();

    assert!(dispatcher.remove_pipeline("p").is_some());
    assert!(dispatcher.remove_pipeline("p").is_none());
    assert_eq!(dispatcher.pipeline_ids(), vec!["q".to_string()]);
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_topic_selection() {
    let (dispatcher, _) = dispatcher();
    dispatcher.set_default_pipeline(respond("default")).unwrap();
    dispatcher
        .add_pipeline_for_topics("alarms", &["events/alarm", "events/fault"], respond("alarm"))
        .unwrap();
    dispatcher
        .add_pipeline_for_topics("faults", &["events/fault"], respond("fault"))
        .unwrap();

    assert_eq!(
        responses_for(&dispatcher, MessageEnvelope::new("events/alarm", "x")).await,
        vec!["alarms", DEFAULT_PIPELINE_ID]
    );
    assert_eq!(
        responses_for(&dispatcher, MessageEnvelope::new("events/fault", "x")).await,
        vec!["alarms", DEFAULT_PIPELINE_ID, "faults"]
    );
    assert_eq!(
        responses_for(&dispatcher, MessageEnvelope::new("other", "x")).await,
        vec![DEFAULT_PIPELINE_ID]
    );
}

#[tokio::test]
async fn test_unmatched_envelope() {
    let (dispatcher, _) = dispatcher();
    dispatcher.add_pipeline_for_topics("p", &["t"], respond("a")).unwrap();

    let summary = dispatcher
        .message_received(MessageEnvelope::new("u", "x"), Arc::new(DiscardResponses))
        .await;

    assert_eq!(summary.matched, 0);
    assert!(!summary.all_failed());
    let metrics = dispatcher.metrics();
    assert_eq!(metrics.envelopes_received, 1);
    assert_eq!(metrics.envelopes_unmatched, 1);
}

#[tokio::test]
async fn test_xml_response_end_to_end() {
    let (dispatcher, _) = dispatcher();
    dispatcher
        .set_default_pipeline(chain(vec![
            func(ConversionTransformer::xml()),
            func(SetResponseData::new(None)),
        ]))
        .unwrap();

    let collector = Arc::new(ResponseCollector::new());
    let summary = dispatcher
        .message_received(event_envelope("events/device/X"), collector.clone())
        .await;
    assert_eq!(summary.succeeded, 1);

    let responses = collector.take();
    assert_eq!(responses.len(), 1);
    let response = &responses[0];
    assert_eq!(response.correlation_id, "corr-7");
    assert_eq!(response.content_type.as_deref(), Some("application/xml"));

    let body = std::str::from_utf8(&response.data).unwrap();
    assert!(body.contains("<Event>"));
    assert!(body.contains("<DeviceName>X</DeviceName>"));
    assert!(body.contains("<Value>42</Value>"));
}

#[tokio::test]
async fn test_response_is_deterministic() {
    let (dispatcher, _) = dispatcher();
    dispatcher
        .set_default_pipeline(chain(vec![
            func(ConversionTransformer::json()),
            func(SetResponseData::new(None)),
        ]))
        .unwrap();

    let envelope = event_envelope("t");
    let mut bodies = Vec::new();
    for _ in 0..2 {
        let collector = Arc::new(ResponseCollector::new());
        dispatcher
            .message_received(envelope.clone(), collector.clone())
            .await;
        bodies.push(collector.take().remove(0).data);
    }
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn test_event_values_populated() {
    let (dispatcher, _) = dispatcher();
    dispatcher.set_default_pipeline(chain(vec![func(EchoValues)])).unwrap();

    let collector = Arc::new(ResponseCollector::new());
    dispatcher
        .message_received(event_envelope("events/device/X"), collector.clone())
        .await;

    let responses = collector.take();
    assert_eq!(
        responses[0].data,
        Bytes::from_static(b"X|thermostat|temperature|events/device/X")
    );
    assert_eq!(responses[0].content_type, None);
}

#[tokio::test]
async fn test_failure_isolation() {
    let (dispatcher, _) = dispatcher();
    dispatcher
        .add_pipeline_for_topics("broken", &["t"], chain(vec![func(FailWithRetry)]))
        .unwrap();
    dispatcher
        .add_pipeline_for_topics("panicky", &["t"], chain(vec![func(Panics)]))
        .unwrap();
    dispatcher.add_pipeline_for_topics("ok", &["t"], respond("fine")).unwrap();

    let collector = Arc::new(ResponseCollector::new());
    let summary = dispatcher
        .message_received(MessageEnvelope::new("t", "x"), collector.clone())
        .await;

    assert_eq!(summary.matched, 3);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 2);
    assert!(!summary.all_failed());

    let responses = collector.take();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].pipeline_id, "ok");
    assert_eq!(responses[0].data, Bytes::from_static(b"fine"));

    let metrics = dispatcher.metrics();
    assert_eq!(metrics.pipelines_matched, 3);
    assert_eq!(metrics.pipelines_succeeded, 1);
    assert_eq!(metrics.pipelines_failed, 2);
    assert_eq!(metrics.responses_emitted, 1);
}

#[tokio::test]
async fn test_all_failed() {
    let (dispatcher, _) = dispatcher();
    dispatcher
        .set_default_pipeline(chain(vec![func(FailWithRetry)]))
        .unwrap();

    let summary = dispatcher
        .message_received(MessageEnvelope::new("t", "x"), Arc::new(DiscardResponses))
        .await;
    assert!(summary.all_failed());
}

#[tokio::test]
async fn test_retry_payload_stored() {
    let (dispatcher, store) = dispatcher();
    dispatcher
        .add_pipeline_for_topics("export", &["t"], chain(vec![func(FailWithRetry)]))
        .unwrap();

    let envelope = MessageEnvelope::new("t", "payload").with_correlation_id("c-1");
    dispatcher
        .message_received(envelope, Arc::new(DiscardResponses))
        .await;

    let key = RetryKey::new(pipeline_hash("export", &["fail"]), "c-1");
    assert_eq!(store.get(&key), Some(Bytes::from_static(b"payload")));
    assert_eq!(dispatcher.metrics().retry_writes, 1);
}

#[tokio::test]
async fn test_no_retry_without_request() {
    let (dispatcher, store) = dispatcher();
    dispatcher.set_default_pipeline(respond("a")).unwrap();

    dispatcher
        .message_received(MessageEnvelope::new("t", "x"), Arc::new(DiscardResponses))
        .await;

    assert!(store.is_empty());
    assert_eq!(dispatcher.metrics().retry_writes, 0);
}

#[tokio::test]
async fn test_decode_failure_fails_only_that_pipeline() {
    let (dispatcher, _) = dispatcher();
    dispatcher
        .add_pipeline_for_topics("wants_event", &["t"], chain(vec![func(EchoValues)]))
        .unwrap();
    dispatcher.add_pipeline_for_topics("raw", &["t"], respond("raw")).unwrap();

    let collector = Arc::new(ResponseCollector::new());
    let summary = dispatcher
        .message_received(MessageEnvelope::new("t", "not json"), collector.clone())
        .await;

    assert_eq!((summary.succeeded, summary.failed), (1, 1));
    assert_eq!(collector.take()[0].pipeline_id, "raw");
}

#[tokio::test]
async fn test_non_json_envelope_passes_bytes() {
    let (dispatcher, _) = dispatcher();
    dispatcher
        .set_default_pipeline(chain(vec![func(ConversionTransformer::xml())]))
        .unwrap();

    let envelope = event_envelope("t").with_content_type("application/cbor");
    let summary = dispatcher
        .message_received(envelope, Arc::new(DiscardResponses))
        .await;
    assert!(summary.all_failed());
}

#[tokio::test(start_paused = true)]
async fn test_runs_outlive_dropped_caller() {
    let (dispatcher, _) = dispatcher();
    let window = BatchTransformer::by_time(Duration::from_secs(10)).with_merge_on_send(true);
    dispatcher
        .set_default_pipeline(chain(vec![func(window), func(SetResponseData::new(None))]))
        .unwrap();

    let collector = Arc::new(ResponseCollector::new());
    let caller = {
        let dispatcher = dispatcher.clone();
        let collector = Arc::clone(&collector);
        tokio::spawn(async move {
            dispatcher
                .message_received(MessageEnvelope::new("t", "1"), collector)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_secs(11)).await;
    let responses = collector.take();
    assert_eq!(responses.len(), 1);
    assert_eq!(&responses[0].data[..], b"[1]");
}

#[test]
fn test_build_context() {
    let (dispatcher, _) = dispatcher();
    let ctx = dispatcher.build_context("bg-1", "text/plain");

    assert_eq!(ctx.correlation_id(), "bg-1");
    assert_eq!(ctx.input_content_type(), "text/plain");
    assert_eq!(ctx.pipeline_id(), BACKGROUND_PIPELINE_ID);
}
