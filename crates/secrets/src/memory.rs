//! In-memory secret store
//!
//! Backs the insecure `[secrets.<path>]` config section and tests. Secrets are
//! not persisted across restarts.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use edgeflow_config::SecretsConfig;
use parking_lot::RwLock;

use crate::error::{Result, SecretsError};
use crate::provider::{SecretProvider, Secrets};

/// In-memory secret store
///
/// Cheap to clone; clones share the same data.
#[derive(Debug, Clone)]
pub struct MemorySecretStore {
    data: Arc<RwLock<HashMap<String, Secrets>>>,
    /// Nanoseconds since the epoch of the last write, strictly increasing
    last_updated: Arc<AtomicU64>,
}

impl Default for MemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            last_updated: Arc::new(AtomicU64::new(now_nanos())),
        }
    }

    /// Build a store seeded with the insecure secrets from config
    pub fn from_config(config: &SecretsConfig) -> Self {
        let store = Self::new();
        for (path, secrets) in config.iter() {
            store.seed(path, secrets.clone());
        }
        store
    }

    /// Merge secrets under `path` without going through the async trait
    pub fn seed(&self, path: &str, secrets: Secrets) {
        let count = secrets.len();
        self.data
            .write()
            .entry(path.to_string())
            .or_default()
            .extend(secrets);
        self.bump();
        tracing::debug!(secret.path = path, count, "secrets stored");
    }

    /// Number of paths holding secrets
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn bump(&self) {
        let now = now_nanos();
        // Writes landing in the same clock tick still move the instant forward
        let _ = self
            .last_updated
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                Some(now.max(prev + 1))
            });
    }
}

#[async_trait]
impl SecretProvider for MemorySecretStore {
    async fn get_secrets(&self, path: &str, keys: &[&str]) -> Result<Secrets> {
        let data = self.data.read();
        let stored = data.get(path).ok_or_else(|| SecretsError::not_found(path))?;

        if keys.is_empty() {
            return Ok(stored.clone());
        }

        let missing: Vec<&str> = keys
            .iter()
            .copied()
            .filter(|k| !stored.contains_key(*k))
            .collect();
        if !missing.is_empty() {
            return Err(SecretsError::missing_keys(path, &missing));
        }

        Ok(keys
            .iter()
            .filter_map(|k| stored.get(*k).map(|v| ((*k).to_string(), v.clone())))
            .collect())
    }

    async fn store_secrets(&self, path: &str, secrets: Secrets) -> Result<()> {
        self.seed(path, secrets);
        Ok(())
    }

    fn secrets_last_updated(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(self.last_updated.load(Ordering::Acquire))
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
