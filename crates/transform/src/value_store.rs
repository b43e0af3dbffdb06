//! Per-context key/value store with `{name}` interpolation
//!
//! Topic templates such as `edge/{devicename}/{sourcename}` are resolved
//! against this store at send time. Placeholder names match
//! `[A-Za-z0-9_.-]+`; there is no escape for a literal brace.

use std::collections::HashMap;

use crate::{TransformError, TransformResult};

#[cfg(test)]
#[path = "value_store_test.rs"]
mod tests;

/// Topic the envelope was received on
pub const KEY_RECEIVED_TOPIC: &str = "receivedtopic";
/// Correlation id of the envelope
pub const KEY_CORRELATION_ID: &str = "correlationid";
/// Device name of the decoded event
pub const KEY_DEVICE_NAME: &str = "devicename";
/// Profile name of the decoded event
pub const KEY_PROFILE_NAME: &str = "profilename";
/// Source name of the decoded event
pub const KEY_SOURCE_NAME: &str = "sourcename";
/// Id of the pipeline being run
pub const KEY_PIPELINE_ID: &str = "pipelineid";

/// String key/value bag, case-sensitive keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueStore {
    values: HashMap<String, String>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Read-only view of every value
    pub fn all(&self) -> &HashMap<String, String> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace every `{name}` in `template` with its value
    ///
    /// Placeholders are resolved left to right without re-scanning
    /// substituted text.
    ///
    /// # Errors
    ///
    /// - `UnsatisfiedPlaceholder` when a referenced key is absent
    /// - `InvalidTemplate` for unbalanced braces or an invalid name
    pub fn apply_values(&self, template: &str) -> TransformResult<String> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            if rest[pos..].starts_with('}') {
                return Err(TransformError::invalid_template(template, "unbalanced '}'"));
            }

            let after = &rest[pos + 1..];
            let close = match after.find(['{', '}']) {
                Some(i) if after[i..].starts_with('}') => i,
                _ => return Err(TransformError::invalid_template(template, "unbalanced '{'")),
            };

            let key = &after[..close];
            if !is_valid_name(key) {
                return Err(TransformError::invalid_template(
                    template,
                    format!("invalid placeholder name '{key}'"),
                ));
            }

            let value = self
                .get(key)
                .ok_or_else(|| TransformError::UnsatisfiedPlaceholder(key.to_string()))?;
            out.push_str(value);
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
}
