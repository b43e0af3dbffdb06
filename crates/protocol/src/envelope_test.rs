//! Tests for the message envelope

use crate::{MessageEnvelope, CONTENT_TYPE_JSON, CONTENT_TYPE_XML};

#[test]
fn test_new_generates_correlation_id() {
    let a = MessageEnvelope::new("t", &b"x"[..]);
    let b = MessageEnvelope::new("t", &b"x"[..]);
    assert!(!a.correlation_id().is_empty());
    assert_ne!(a.correlation_id(), b.correlation_id());
}

#[test]
fn test_new_defaults_to_json() {
    let envelope = MessageEnvelope::new("events", &b"{}"[..]);
    assert_eq!(envelope.content_type(), CONTENT_TYPE_JSON);
    assert!(envelope.is_json());
}

#[test]
fn test_builders() {
    let envelope = MessageEnvelope::new("events/device/X", &b"<a/>"[..])
        .with_correlation_id("corr-1")
        .with_content_type(CONTENT_TYPE_XML);
    assert_eq!(envelope.correlation_id(), "corr-1");
    assert_eq!(envelope.content_type(), CONTENT_TYPE_XML);
    assert_eq!(envelope.received_topic(), "events/device/X");
    assert_eq!(envelope.payload().as_ref(), b"<a/>");
    assert!(!envelope.is_json());
}

#[test]
fn test_is_json_with_charset_and_empty() {
    let with_charset =
        MessageEnvelope::new("t", &b""[..]).with_content_type("application/json; charset=utf-8");
    assert!(with_charset.is_json());

    let empty = MessageEnvelope::new("t", &b""[..]).with_content_type("");
    assert!(empty.is_json());
}

#[test]
fn test_debug_hides_payload() {
    let envelope = MessageEnvelope::new("t", &b"secret-bytes"[..]);
    let debug = format!("{:?}", envelope);
    assert!(debug.contains("payload_len: 12"));
    assert!(!debug.contains("secret-bytes"));
}
