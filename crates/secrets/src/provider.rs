//! Secret provider trait

use std::collections::BTreeMap;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::Result;

/// Secret values under one path, keyed by name
pub type Secrets = BTreeMap<String, String>;

/// Source of secrets for pipeline functions
///
/// Reads may be served from a cache. Every write bumps
/// [`secrets_last_updated`](SecretProvider::secrets_last_updated), so holders
/// of derived material (connected clients, parsed keys) can compare it with
/// the instant they last read and rebuild when stale.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Fetch the secrets under `path`
    ///
    /// With an empty `keys` slice every secret under the path is returned.
    /// Otherwise only the named keys are returned, and any missing key is an
    /// error.
    async fn get_secrets(&self, path: &str, keys: &[&str]) -> Result<Secrets>;

    /// Store (merge) secrets under `path`
    async fn store_secrets(&self, path: &str, secrets: Secrets) -> Result<()>;

    /// Instant of the last change to any secret
    ///
    /// Must be cheap and lock-free; it is read on every message by senders
    /// that cache connections.
    fn secrets_last_updated(&self) -> SystemTime;
}
