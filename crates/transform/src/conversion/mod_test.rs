//! Tests for event conversion

use super::*;
use crate::test_util::{sample_event, test_context};

#[tokio::test]
async fn test_to_xml_sets_content_type() {
    let mut ctx = test_context();
    let outcome = ConversionTransformer::xml()
        .transform(&mut ctx, Some(sample_event().into()))
        .await
        .unwrap();

    let Outcome::Continue(Some(Payload::Text(xml))) = outcome else {
        panic!("expected text output, got {outcome:?}");
    };
    assert!(xml.starts_with("<Event>"));
    assert!(xml.contains("<DeviceName>X</DeviceName>"));
    assert!(xml.contains("<Value>42</Value>"));
    assert_eq!(ctx.response_content_type(), Some("application/xml"));
}

#[tokio::test]
async fn test_to_json_round_trips() {
    let event = sample_event();
    let mut ctx = test_context();
    let outcome = ConversionTransformer::json()
        .transform(&mut ctx, Some(event.clone().into()))
        .await
        .unwrap();

    let Outcome::Continue(Some(Payload::Text(json))) = outcome else {
        panic!("expected text output, got {outcome:?}");
    };
    let decoded = edgeflow_protocol::Event::from_json(json.as_bytes()).unwrap();
    assert_eq!(decoded, event);
    assert_eq!(ctx.response_content_type(), Some("application/json"));
}

#[tokio::test]
async fn test_output_is_deterministic() {
    let event = sample_event();
    let xml = ConversionTransformer::xml();
    let mut a = test_context();
    let mut b = test_context();
    let first = xml.transform(&mut a, Some(event.clone().into())).await.unwrap();
    let second = xml.transform(&mut b, Some(event.into())).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_no_data() {
    let mut ctx = test_context();
    let err = ConversionTransformer::json()
        .transform(&mut ctx, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TransformError::NoData { .. }));
    assert!(ctx.response_content_type().is_none());
}

#[tokio::test]
async fn test_rejects_bytes() {
    let mut ctx = test_context();
    let err = ConversionTransformer::xml()
        .transform(&mut ctx, Some(Payload::from(vec![1u8, 2, 3])))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TransformError::UnexpectedType { expected: "event", got: "bytes", .. }
    ));
}

#[test]
fn test_factory_names() {
    let config = FunctionConfig::new("to_xml");
    let xml = ConversionFactory::new(ConversionFormat::Xml).create(&config).unwrap();
    assert_eq!(xml.name(), "to_xml");
    let json = ConversionFactory::new(ConversionFormat::Json).create(&config).unwrap();
    assert_eq!(json.name(), "to_json");
}
