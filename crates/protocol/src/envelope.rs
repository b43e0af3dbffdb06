//! Message envelope
//!
//! The envelope is the unit a trigger hands to the dispatcher. It is never
//! mutated after construction; pipelines copy what they need into their
//! function context.

use std::fmt;

use bytes::Bytes;
use uuid::Uuid;

/// `application/json`
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// `application/xml`
pub const CONTENT_TYPE_XML: &str = "application/xml";

/// `text/plain`
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// `application/cbor`
pub const CONTENT_TYPE_CBOR: &str = "application/cbor";

/// Immutable message delivered by a trigger
///
/// # Example
///
/// ```
/// use edgeflow_protocol::MessageEnvelope;
///
/// let envelope = MessageEnvelope::new("events/device/X", &b"{}"[..])
///     .with_correlation_id("abc-123");
/// assert_eq!(envelope.received_topic(), "events/device/X");
/// assert_eq!(envelope.correlation_id(), "abc-123");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct MessageEnvelope {
    correlation_id: String,
    content_type: String,
    received_topic: String,
    payload: Bytes,
}

impl MessageEnvelope {
    /// Create an envelope with a generated correlation id and JSON content type
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            content_type: CONTENT_TYPE_JSON.to_string(),
            received_topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Set the correlation id
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Set the content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Correlation id used to trace the message end-to-end
    #[inline]
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Content type of the payload
    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Topic the message was received on
    #[inline]
    pub fn received_topic(&self) -> &str {
        &self.received_topic
    }

    /// Raw payload bytes (cheap clone)
    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Whether the payload is JSON
    pub fn is_json(&self) -> bool {
        self.content_type.is_empty() || self.content_type.starts_with(CONTENT_TYPE_JSON)
    }
}

impl fmt::Debug for MessageEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageEnvelope")
            .field("correlation_id", &self.correlation_id)
            .field("content_type", &self.content_type)
            .field("received_topic", &self.received_topic)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
