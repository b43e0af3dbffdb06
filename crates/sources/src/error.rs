//! Trigger error types

use edgeflow_pipeline::PipelineError;
use edgeflow_transform::TransformError;

/// Trigger errors
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    /// Failed to bind the HTTP listener
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// HTTP server failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Broker connection or subscription failure
    #[error("mqtt error: {0}")]
    Mqtt(String),

    /// Invalid trigger settings or credentials
    #[error(transparent)]
    Setup(#[from] TransformError),

    /// Dispatcher or channel failure
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Trigger task ended abnormally
    #[error("trigger task failed: {0}")]
    Task(String),

    /// Shutdown did not finish in time
    #[error("trigger did not stop within {0:?}")]
    ShutdownTimeout(std::time::Duration),
}

impl TriggerError {
    pub fn mqtt(msg: impl Into<String>) -> Self {
        Self::Mqtt(msg.into())
    }
}

/// Result type for trigger operations
pub type Result<T> = std::result::Result<T, TriggerError>;
