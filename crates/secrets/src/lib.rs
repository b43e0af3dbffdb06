//! Edgeflow Secrets
//!
//! Secret access for pipeline functions. Functions only see the
//! [`SecretProvider`] trait; the service wires in a concrete store.
//!
//! ```
//! use edgeflow_secrets::MemorySecretStore;
//!
//! let store = MemorySecretStore::new();
//! store.seed("mqtt", [("username".to_string(), "edge".to_string())].into());
//! assert_eq!(store.len(), 1);
//! ```

mod error;
mod memory;
mod provider;

pub use error::{Result, SecretsError};
pub use memory::MemorySecretStore;
pub use provider::{SecretProvider, Secrets};
