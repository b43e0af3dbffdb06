//! Protocol error types
//!
//! Errors that can occur when decoding envelopes or coercing payloads.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload variant cannot be normalized to bytes
    #[error("passed in data must be of type bytes, string, or JSON-serializable (got {kind})")]
    UnsupportedType { kind: &'static str },

    /// JSON encoding or decoding failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML encoding failed
    #[error("xml error: {0}")]
    Xml(String),

    /// Envelope payload is empty
    #[error("empty payload")]
    EmptyPayload,
}

impl ProtocolError {
    /// Create an unsupported type error
    #[inline]
    pub fn unsupported(kind: &'static str) -> Self {
        Self::UnsupportedType { kind }
    }

    /// Create an XML error
    #[inline]
    pub fn xml(msg: impl Into<String>) -> Self {
        Self::Xml(msg.into())
    }
}
