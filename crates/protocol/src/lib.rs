//! Edgeflow Protocol - Core types that flow through function pipelines
//!
//! This crate provides the foundational types shared by triggers, the
//! dispatcher and every pipeline function:
//! - `MessageEnvelope` - Immutable message handed in by a trigger
//! - `Event` / `Reading` - Device telemetry model
//! - `Payload` - Tagged sum carried between pipeline functions
//! - `coerce` - The single normalization point from payload to bytes
//!
//! # Design Principles
//!
//! - **Zero-copy where possible**: Envelope and byte payloads use `bytes::Bytes`
//! - **Closed payload set**: Functions pattern-match on `Payload` instead of
//!   downcasting untyped values
//! - **Deterministic encoding**: Tags are kept in a `BTreeMap` so serialized
//!   output is stable for a fixed input

mod envelope;
mod error;
mod event;
mod payload;

pub use envelope::{
    MessageEnvelope, CONTENT_TYPE_CBOR, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT, CONTENT_TYPE_XML,
};
pub use error::ProtocolError;
pub use event::{Event, Reading, ValueType};
pub use payload::{coerce, Payload};

// Re-export bytes for convenience
pub use bytes::Bytes;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

// Test modules - only compiled during testing
#[cfg(test)]
mod envelope_test;
