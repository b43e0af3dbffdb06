//! Tests for the function context

use super::*;
use edgeflow_secrets::MemorySecretStore;

fn context() -> (FunctionContext, MemorySecretStore) {
    let store = MemorySecretStore::new();
    let ctx = FunctionContext::new(
        "corr-1",
        "application/json",
        "p1",
        Arc::new(store.clone()),
    );
    (ctx, store)
}

#[test]
fn test_new_copies_envelope_metadata() {
    let (ctx, _) = context();
    assert_eq!(ctx.correlation_id(), "corr-1");
    assert_eq!(ctx.input_content_type(), "application/json");
    assert_eq!(ctx.pipeline_id(), "p1");
    assert!(ctx.response_data().is_none());
    assert!(ctx.retry_data().is_none());
    assert_eq!(ctx.values().get("correlationid"), Some("corr-1"));
    assert_eq!(ctx.values().get("pipelineid"), Some("p1"));
}

#[test]
fn test_response_last_writer_wins() {
    let (mut ctx, _) = context();
    ctx.set_response_data(Bytes::from_static(b"first"));
    ctx.set_response_content_type("text/plain");
    ctx.set_response_data(Bytes::from_static(b"second"));
    ctx.set_response_content_type("application/xml");

    assert_eq!(ctx.response_data().unwrap().as_ref(), b"second");
    assert_eq!(ctx.response_content_type(), Some("application/xml"));

    let (data, content_type) = ctx.take_response().unwrap();
    assert_eq!(data.as_ref(), b"second");
    assert_eq!(content_type.as_deref(), Some("application/xml"));
    assert!(ctx.take_response().is_none());
}

#[test]
fn test_retry_data() {
    let (mut ctx, _) = context();
    ctx.set_retry_data(Bytes::from_static(b"payload"));
    assert_eq!(ctx.retry_data().unwrap().as_ref(), b"payload");
    assert_eq!(ctx.take_retry_data().unwrap().as_ref(), b"payload");
    assert!(ctx.retry_data().is_none());
}

#[test]
fn test_clone_is_independent_but_shares_secrets() {
    let (mut ctx, store) = context();
    ctx.add_value("devicename", "X");

    let mut copy = ctx.clone();
    copy.add_value("devicename", "Y");
    copy.set_response_data(Bytes::from_static(b"copy"));

    assert_eq!(ctx.values().get("devicename"), Some("X"));
    assert!(ctx.response_data().is_none());

    store.seed("p", [("k".to_string(), "v".to_string())].into());
    assert_eq!(ctx.secrets_last_updated(), copy.secrets_last_updated());
}

#[test]
fn test_apply_values_uses_store() {
    let (mut ctx, _) = context();
    ctx.add_value("devicename", "X");
    assert_eq!(ctx.apply_values("out/{devicename}").unwrap(), "out/X");
    assert!(ctx.apply_values("out/{missing}").is_err());
}

#[tokio::test]
async fn test_get_secret() {
    let (ctx, store) = context();
    store.seed(
        "aes",
        [
            ("key".to_string(), "abc".to_string()),
            ("other".to_string(), "x".to_string()),
        ]
        .into(),
    );

    let secrets = ctx.get_secret("aes", &["key"]).await.unwrap();
    assert_eq!(secrets.len(), 1);
    assert_eq!(secrets["key"], "abc");

    let err = ctx.get_secret("aes", &["missing"]).await.unwrap_err();
    assert!(matches!(err, crate::TransformError::Secret(_)));
}

#[test]
fn test_secrets_last_updated_tracks_store() {
    let (ctx, store) = context();
    let before = ctx.secrets_last_updated();
    store.seed("p", [("k".to_string(), "v".to_string())].into());
    assert!(ctx.secrets_last_updated() > before);
}
