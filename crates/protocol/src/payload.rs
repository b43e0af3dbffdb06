//! Payload carried between pipeline functions
//!
//! A closed set of variants replaces untyped values flowing between stages.
//! `coerce` is the only place a payload is normalized to bytes.

use bytes::Bytes;

use crate::{Event, ProtocolError, Result};

/// Data passed from one pipeline function to the next
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw byte buffer
    Bytes(Bytes),
    /// UTF-8 text
    Text(String),
    /// Decoded device event
    Event(Box<Event>),
    /// Sequence of byte buffers, produced by batching
    Sequence(Vec<Bytes>),
    /// Arbitrary JSON value
    Json(serde_json::Value),
}

impl Payload {
    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "text",
            Self::Event(_) => "event",
            Self::Sequence(_) => "sequence",
            Self::Json(_) => "json",
        }
    }

    /// Take the event out of an `Event` payload, or decode one from JSON
    ///
    /// Returns `None` for variants that cannot carry an event.
    pub fn into_event(self) -> Option<Result<Event>> {
        match self {
            Self::Event(event) => Some(Ok(*event)),
            Self::Json(value) => Some(serde_json::from_value(value).map_err(ProtocolError::from)),
            _ => None,
        }
    }
}

impl From<Event> for Payload {
    fn from(event: Event) -> Self {
        Self::Event(Box::new(event))
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Normalize a payload to a byte buffer
///
/// Bytes are returned as-is (cheap clone), text as its UTF-8 bytes, events and
/// JSON values via their JSON encoding. Sequences have no single byte form and
/// are rejected.
pub fn coerce(payload: &Payload) -> Result<Bytes> {
    match payload {
        Payload::Bytes(bytes) => Ok(bytes.clone()),
        Payload::Text(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
        Payload::Event(event) => Ok(Bytes::from(serde_json::to_vec(event.as_ref())?)),
        Payload::Json(value) => Ok(Bytes::from(serde_json::to_vec(value)?)),
        other => Err(ProtocolError::unsupported(other.kind())),
    }
}
