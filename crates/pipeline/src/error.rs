//! Pipeline error types

use edgeflow_routing::RoutingError;
use edgeflow_transform::TransformError;
use thiserror::Error;

/// Dispatcher and pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid pipeline id or topic list
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// Pipeline registered without functions
    #[error("pipeline '{0}' has no functions")]
    EmptyPipeline(String),

    /// Pipeline id already registered
    #[error("pipeline '{0}' is already registered")]
    DuplicatePipeline(String),

    /// Envelope payload could not be decoded for the first function
    #[error("pipeline '{pipeline}': failed to decode event: {message}")]
    Decode { pipeline: String, message: String },

    /// A function failed
    #[error(transparent)]
    Function(#[from] TransformError),

    /// Retry store rejected a write
    #[error("retry store error: {0}")]
    RetryStore(String),

    /// Response handler failed to deliver a response
    #[error("response error: {0}")]
    Response(String),

    /// Background publish channel closed
    #[error("background publish channel closed")]
    ChannelClosed,

    /// Background publish channel full
    #[error("background publish channel full")]
    ChannelFull,
}

impl PipelineError {
    pub fn decode(pipeline: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            pipeline: pipeline.into(),
            message: message.to_string(),
        }
    }

    pub fn retry_store(msg: impl Into<String>) -> Self {
        Self::RetryStore(msg.into())
    }

    pub fn response(msg: impl Into<String>) -> Self {
        Self::Response(msg.into())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::EmptyPipeline("p1".into());
        assert_eq!(err.to_string(), "pipeline 'p1' has no functions");

        let err = PipelineError::DuplicatePipeline("p1".into());
        assert!(err.to_string().contains("already registered"));

        let err = PipelineError::decode("p1", "expected value at line 1");
        assert!(err.to_string().contains("failed to decode event"));

        let err = PipelineError::from(RoutingError::EmptyPipelineId);
        assert_eq!(err.to_string(), RoutingError::EmptyPipelineId.to_string());

        assert!(PipelineError::ChannelClosed.to_string().contains("closed"));
    }
}
