//! Function Registry - Config-driven function creation
//!
//! The registry maps function type names (`to_xml`, `batch_by_count`, ...)
//! to factories. The service builds one instance per `[functions.<name>]`
//! entry and shares it across every pipeline that lists the name.
//!
//! # Example
//!
//! ```ignore
//! let registry = create_default_registry();
//! let config = FunctionConfig::new("compress_gzip");
//! let function = registry.create(&config)?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use edgeflow_config::FunctionConfig;

use crate::{TransformError, TransformResult, Transformer};

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

/// Factory trait for creating functions
pub trait FunctionFactory: Send + Sync {
    /// Create a function instance from its configuration
    ///
    /// # Errors
    /// Returns `TransformError::Config` if the options are invalid
    fn create(&self, config: &FunctionConfig) -> TransformResult<Arc<dyn Transformer>>;

    /// Human-readable name for this factory (for error messages)
    fn name(&self) -> &'static str;
}

/// Registry of function factories keyed by type name
pub struct FunctionRegistry {
    factories: HashMap<String, Box<dyn FunctionFactory>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory, replacing any previous one under the same name
    pub fn register<F: FunctionFactory + 'static>(&mut self, type_name: &str, factory: F) {
        if self
            .factories
            .insert(type_name.to_string(), Box::new(factory))
            .is_some()
        {
            tracing::debug!(function_type = type_name, "function factory replaced");
        }
    }

    /// Create a function from its config
    ///
    /// # Errors
    /// - `TransformError::Config` if the type is not registered
    /// - whatever the factory returns for invalid options
    pub fn create(&self, config: &FunctionConfig) -> TransformResult<Arc<dyn Transformer>> {
        let factory = self.factories.get(&config.function_type).ok_or_else(|| {
            TransformError::config(format!(
                "unknown function type '{}', available: [{}]",
                config.function_type,
                self.available_types().join(", ")
            ))
        })?;

        factory.create(config)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn available_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a string list option that must be present
pub(crate) fn required_list(config: &FunctionConfig, key: &str) -> TransformResult<Vec<String>> {
    config.get_list(key).ok_or_else(|| {
        TransformError::config(format!(
            "{}: missing required option '{key}'",
            config.function_type
        ))
    })
}

/// Read a string option that must be present and non-empty
pub(crate) fn required_str<'a>(config: &'a FunctionConfig, key: &str) -> TransformResult<&'a str> {
    match config.get_str(key) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(TransformError::config(format!(
            "{}: missing required option '{key}'",
            config.function_type
        ))),
    }
}
