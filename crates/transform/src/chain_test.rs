//! Tests for function chain

use super::*;
use crate::test_util::{sample_event, test_context};
use crate::{ConversionTransformer, SetResponseData, TransformError, TransformFuture, require_input};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Appends `!` to text input and counts calls
#[derive(Default)]
struct Shout {
    calls: AtomicUsize,
}

impl Transformer for Shout {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let input = require_input(self.name(), ctx, input)?;
            let Payload::Text(text) = input else {
                return Err(TransformError::unexpected_type(
                    self.name(),
                    ctx.pipeline_id(),
                    "text",
                    input.kind(),
                ));
            };
            Ok(Outcome::next(format!("{text}!")))
        })
    }

    fn name(&self) -> &'static str {
        "shout"
    }
}

struct Halt;

impl Transformer for Halt {
    fn transform<'a>(&'a self, _: &'a mut FunctionContext, _: Option<Payload>) -> TransformFuture<'a> {
        Box::pin(async { Ok(Outcome::Stop) })
    }

    fn name(&self) -> &'static str {
        "halt"
    }
}

struct Broken;

impl Transformer for Broken {
    fn transform<'a>(&'a self, _: &'a mut FunctionContext, _: Option<Payload>) -> TransformFuture<'a> {
        Box::pin(async { Err(TransformError::transport("broker unreachable")) })
    }

    fn name(&self) -> &'static str {
        "broken"
    }

    fn close(&self) -> TransformResult<()> {
        Err(TransformError::config("already closed"))
    }
}

#[tokio::test]
async fn test_empty_chain_returns_input() {
    let chain = Chain::default();
    assert!(chain.is_empty());
    assert!(!chain.wants_event());

    let mut ctx = test_context();
    let out = chain.execute(&mut ctx, Some(Payload::from("x"))).await.unwrap();
    assert_eq!(out, Some(Payload::from("x")));
}

#[tokio::test]
async fn test_output_feeds_next_function() {
    let chain = Chain::new(vec![Arc::new(Shout::default()), Arc::new(Shout::default())]);
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.identifiers(), vec!["shout", "shout"]);

    let mut ctx = test_context();
    let out = chain.execute(&mut ctx, Some(Payload::from("hi"))).await.unwrap();
    assert_eq!(out, Some(Payload::from("hi!!")));
}

#[tokio::test]
async fn test_stop_skips_remaining() {
    let tail = Arc::new(Shout::default());
    let chain = Chain::new(vec![Arc::new(Halt), tail.clone() as Arc<dyn Transformer>]);

    let mut ctx = test_context();
    let out = chain.execute(&mut ctx, Some(Payload::from("hi"))).await.unwrap();
    assert!(out.is_none());
    assert_eq!(tail.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_error_skips_remaining() {
    let tail = Arc::new(Shout::default());
    let chain = Chain::new(vec![Arc::new(Broken), tail.clone() as Arc<dyn Transformer>]);

    let mut ctx = test_context();
    let err = chain
        .execute(&mut ctx, Some(Payload::from("hi")))
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(tail.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_xml_then_response() {
    let chain = Chain::new(vec![
        Arc::new(ConversionTransformer::xml()),
        Arc::new(SetResponseData::new(None)),
    ]);
    assert!(chain.wants_event());

    let mut ctx = test_context();
    let out = chain
        .execute(&mut ctx, Some(sample_event().into()))
        .await
        .unwrap();

    let Some(Payload::Text(xml)) = out else {
        panic!("expected xml text, got {out:?}");
    };
    assert!(xml.contains("<DeviceName>X</DeviceName>"));
    assert_eq!(ctx.response_data().unwrap().as_ref(), xml.as_bytes());
    assert_eq!(ctx.response_content_type(), Some("application/xml"));
}

#[test]
fn test_named_identifiers() {
    let chain = Chain::named(vec![
        ("loud".to_string(), Arc::new(Shout::default()) as Arc<dyn Transformer>),
        ("quiet".to_string(), Arc::new(Halt) as Arc<dyn Transformer>),
    ]);
    assert_eq!(chain.identifiers(), vec!["loud", "quiet"]);
    assert_eq!(format!("{chain:?}"), r#"Chain { functions: ["loud", "quiet"] }"#);
}

#[test]
fn test_close_tolerates_failures() {
    let chain = Chain::new(vec![Arc::new(Broken), Arc::new(Halt)]);
    chain.close();
}
