//! Function error types
//!
//! Every error returned by a pipeline function stops that pipeline run. The
//! variants group the failure kinds the dispatcher cares about: bad input,
//! transport trouble (retryable via the retry buffer), security failures
//! (never retried), configuration and template errors.

use edgeflow_protocol::ProtocolError;
use edgeflow_secrets::SecretsError;
use thiserror::Error;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Errors returned by pipeline functions
#[derive(Debug, Error)]
pub enum TransformError {
    /// The function was invoked without input
    #[error("{function} in pipeline '{pipeline}': No Data Received")]
    NoData { function: String, pipeline: String },

    /// The input variant is not one the function accepts
    #[error("{function} in pipeline '{pipeline}': type received is not {expected} (got {got})")]
    UnexpectedType {
        function: String,
        pipeline: String,
        expected: &'static str,
        got: &'static str,
    },

    /// Input could not be normalized to bytes
    #[error(transparent)]
    Coercion(#[from] ProtocolError),

    /// Serializing output failed
    #[error("failed to encode {format}: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    /// Broker connect or publish failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Secret lookup failed
    #[error("secret error: {0}")]
    Secret(#[from] SecretsError),

    /// Key material or authentication failure
    #[error("crypto error: {0}")]
    Crypto(String),

    /// TLS material could not be loaded
    #[error("tls error: {0}")]
    Tls(String),

    /// Invalid function configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A `{name}` placeholder has no value
    #[error("placeholder not satisfied: {0}")]
    UnsatisfiedPlaceholder(String),

    /// Template syntax error
    #[error("invalid template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// Compression stream error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    pub fn no_data(function: impl Into<String>, pipeline: impl Into<String>) -> Self {
        Self::NoData {
            function: function.into(),
            pipeline: pipeline.into(),
        }
    }

    pub fn unexpected_type(
        function: impl Into<String>,
        pipeline: impl Into<String>,
        expected: &'static str,
        got: &'static str,
    ) -> Self {
        Self::UnexpectedType {
            function: function.into(),
            pipeline: pipeline.into(),
            expected,
            got,
        }
    }

    pub fn encode(format: &'static str, message: impl Into<String>) -> Self {
        Self::Encode {
            format,
            message: message.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure may succeed if the same payload is retried later
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
