//! Error types for secret access

use thiserror::Error;

/// Errors that can occur when reading or writing secrets
#[derive(Debug, Error)]
pub enum SecretsError {
    /// Nothing is stored under the path
    #[error("no secrets found at path '{path}'")]
    NotFound { path: String },

    /// The path exists but some requested keys are absent
    #[error("secrets at path '{path}' are missing keys: {keys}")]
    MissingKeys { path: String, keys: String },

    /// The backing store failed
    #[error("secret store error: {0}")]
    Backend(String),
}

impl SecretsError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn missing_keys(path: impl Into<String>, keys: &[&str]) -> Self {
        Self::MissingKeys {
            path: path.into(),
            keys: keys.join(", "),
        }
    }
}

/// Result type for secret operations
pub type Result<T> = std::result::Result<T, SecretsError>;
