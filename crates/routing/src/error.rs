//! Routing error types

use thiserror::Error;

/// Result type for routing operations
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors raised while registering routes
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    /// Route registered without an id
    #[error("pipeline id must not be empty")]
    EmptyPipelineId,

    /// Route registered without topics
    #[error("pipeline '{pipeline}' has no topics")]
    EmptyTopics {
        /// Pipeline with empty topics
        pipeline: String,
    },

    /// Topic filter that can never match
    #[error("pipeline '{pipeline}' has an invalid topic '{topic}'")]
    InvalidTopic {
        pipeline: String,
        topic: String,
    },
}

impl RoutingError {
    pub fn empty_topics(pipeline: impl Into<String>) -> Self {
        Self::EmptyTopics {
            pipeline: pipeline.into(),
        }
    }

    pub fn invalid_topic(pipeline: impl Into<String>, topic: impl Into<String>) -> Self {
        Self::InvalidTopic {
            pipeline: pipeline.into(),
            topic: topic.into(),
        }
    }
}
