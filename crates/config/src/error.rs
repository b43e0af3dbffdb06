//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A pipeline references a function that is not declared
    #[error("pipeline '{pipeline}' references unknown function '{function}'")]
    UnknownFunction {
        /// Pipeline id
        pipeline: String,
        /// Missing function name
        function: String,
    },

    /// A function declares a type the registry does not know
    #[error("function '{name}' has unknown type '{function_type}'")]
    UnknownFunctionType {
        /// Function instance name
        name: String,
        /// Declared type
        function_type: String,
    },

    /// A pipeline has no functions
    #[error("pipeline '{pipeline}' has no functions")]
    EmptyPipeline {
        /// Pipeline id
        pipeline: String,
    },

    /// Two pipelines share the same id
    #[error("pipeline id '{pipeline}' is declared more than once")]
    DuplicatePipeline {
        /// Pipeline id
        pipeline: String,
    },

    /// Validation error - required field missing
    #[error("{component} '{name}' is missing required field '{field}'")]
    MissingField {
        /// Component type (e.g., "function", "trigger")
        component: &'static str,
        /// Name of the component
        name: String,
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Field name
        field: String,
        /// Error message
        message: String,
    },

    /// Neither a default nor a per-topic pipeline is configured
    #[error("no pipelines are configured - set pipelines.default or add pipelines.per_topic entries")]
    NoPipelines,
}

impl ConfigError {
    /// Create an UnknownFunction error
    pub fn unknown_function(pipeline: impl Into<String>, function: impl Into<String>) -> Self {
        Self::UnknownFunction {
            pipeline: pipeline.into(),
            function: function.into(),
        }
    }

    /// Create an UnknownFunctionType error
    pub fn unknown_function_type(
        name: impl Into<String>,
        function_type: impl Into<String>,
    ) -> Self {
        Self::UnknownFunctionType {
            name: name.into(),
            function_type: function_type.into(),
        }
    }

    /// Create an EmptyPipeline error
    pub fn empty_pipeline(pipeline: impl Into<String>) -> Self {
        Self::EmptyPipeline {
            pipeline: pipeline.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
    ) -> Self {
        Self::MissingField {
            component,
            name: name.into(),
            field,
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}
