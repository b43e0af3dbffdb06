//! Retry store seam
//!
//! Functions never see the store. They call `set_retry_data` on their
//! context and the dispatcher writes the payload here when the run ends.
//! An external reprocessor reads entries back and re-injects them.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::Result;

/// Key of one stored payload
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RetryKey {
    /// Hash of the pipeline shape that produced the payload
    pub pipeline_hash: String,
    pub correlation_id: String,
}

impl RetryKey {
    pub fn new(pipeline_hash: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            pipeline_hash: pipeline_hash.into(),
            correlation_id: correlation_id.into(),
        }
    }
}

impl fmt::Display for RetryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pipeline_hash, self.correlation_id)
    }
}

/// Persisted payload awaiting reprocessing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEntry {
    pub key: RetryKey,
    pub data: Bytes,
}

/// Storage for payloads of failed exports
#[async_trait]
pub trait RetryStore: Send + Sync {
    /// Store `data` under `key`, replacing any previous payload
    async fn put(&self, key: RetryKey, data: Bytes) -> Result<()>;

    /// Every stored entry
    async fn iter(&self) -> Result<Vec<RetryEntry>>;
}

/// In-process retry store
///
/// Entries are returned ordered by key.
#[derive(Debug, Default)]
pub struct MemoryRetryStore {
    entries: Mutex<BTreeMap<RetryKey, Bytes>>,
}

impl MemoryRetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RetryKey) -> Option<Bytes> {
        self.entries.lock().get(key).cloned()
    }

    /// Remove an entry once it has been reprocessed
    pub fn remove(&self, key: &RetryKey) -> Option<Bytes> {
        self.entries.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl RetryStore for MemoryRetryStore {
    async fn put(&self, key: RetryKey, data: Bytes) -> Result<()> {
        tracing::debug!(key = %key, bytes = data.len(), "stored retry payload");
        self.entries.lock().insert(key, data);
        Ok(())
    }

    async fn iter(&self) -> Result<Vec<RetryEntry>> {
        Ok(self
            .entries
            .lock()
            .iter()
            .map(|(key, data)| RetryEntry {
                key: key.clone(),
                data: data.clone(),
            })
            .collect())
    }
}
