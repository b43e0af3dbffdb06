//! Function context
//!
//! One context exists per pipeline run on one envelope. Functions read the
//! envelope metadata from it, fetch secrets through it, and leave their
//! side effects (response, retry payload, values) on it for the dispatcher.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use edgeflow_secrets::{SecretProvider, Secrets};
use tracing::Span;

use crate::TransformResult;
use crate::value_store::{KEY_CORRELATION_ID, KEY_PIPELINE_ID, ValueStore};

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;

/// Per-run state handed to every function of a pipeline
///
/// `clone()` copies the value store and output buffers and shares the secret
/// provider and tracing span.
#[derive(Clone)]
pub struct FunctionContext {
    correlation_id: String,
    input_content_type: String,
    pipeline_id: String,
    response_data: Option<Bytes>,
    response_content_type: Option<String>,
    retry_data: Option<Bytes>,
    values: ValueStore,
    secrets: Arc<dyn SecretProvider>,
    span: Span,
}

impl FunctionContext {
    /// Create a context for one pipeline run
    ///
    /// The correlation id and pipeline id are also recorded in the value
    /// store so templates can reference them.
    pub fn new(
        correlation_id: impl Into<String>,
        input_content_type: impl Into<String>,
        pipeline_id: impl Into<String>,
        secrets: Arc<dyn SecretProvider>,
    ) -> Self {
        let correlation_id = correlation_id.into();
        let pipeline_id = pipeline_id.into();
        let span = tracing::info_span!(
            "pipeline",
            pipeline = %pipeline_id,
            correlation_id = %correlation_id
        );

        let mut values = ValueStore::new();
        values.add(KEY_CORRELATION_ID, correlation_id.clone());
        values.add(KEY_PIPELINE_ID, pipeline_id.clone());

        Self {
            correlation_id,
            input_content_type: input_content_type.into(),
            pipeline_id,
            response_data: None,
            response_content_type: None,
            retry_data: None,
            values,
            secrets,
            span,
        }
    }

    #[inline]
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    #[inline]
    pub fn input_content_type(&self) -> &str {
        &self.input_content_type
    }

    #[inline]
    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    /// Span carrying `pipeline` and `correlation_id` fields
    #[inline]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Set the response returned to the trigger (last writer wins)
    pub fn set_response_data(&mut self, data: Bytes) {
        self.response_data = Some(data);
    }

    pub fn response_data(&self) -> Option<&Bytes> {
        self.response_data.as_ref()
    }

    /// Set the response content type (last writer wins)
    pub fn set_response_content_type(&mut self, content_type: impl Into<String>) {
        self.response_content_type = Some(content_type.into());
    }

    pub fn response_content_type(&self) -> Option<&str> {
        self.response_content_type.as_deref()
    }

    /// Ask the dispatcher to hand `data` to the retry store
    pub fn set_retry_data(&mut self, data: Bytes) {
        self.retry_data = Some(data);
    }

    pub fn retry_data(&self) -> Option<&Bytes> {
        self.retry_data.as_ref()
    }

    /// Take the response, leaving none behind
    pub fn take_response(&mut self) -> Option<(Bytes, Option<String>)> {
        self.response_data
            .take()
            .map(|data| (data, self.response_content_type.take()))
    }

    pub fn take_retry_data(&mut self) -> Option<Bytes> {
        self.retry_data.take()
    }

    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ValueStore {
        &mut self.values
    }

    pub fn add_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.add(key, value);
    }

    /// Resolve `{name}` placeholders against the value store
    pub fn apply_values(&self, template: &str) -> TransformResult<String> {
        self.values.apply_values(template)
    }

    /// Fetch secrets under `path`, restricted to `keys` when non-empty
    pub async fn get_secret(&self, path: &str, keys: &[&str]) -> TransformResult<Secrets> {
        Ok(self.secrets.get_secrets(path, keys).await?)
    }

    /// Instant of the last change in the secret store
    pub fn secrets_last_updated(&self) -> SystemTime {
        self.secrets.secrets_last_updated()
    }

    /// Shared secret provider, for functions that build long-lived clients
    pub fn secret_provider(&self) -> &Arc<dyn SecretProvider> {
        &self.secrets
    }
}

impl fmt::Debug for FunctionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionContext")
            .field("correlation_id", &self.correlation_id)
            .field("input_content_type", &self.input_content_type)
            .field("pipeline_id", &self.pipeline_id)
            .field("response_len", &self.response_data.as_ref().map(Bytes::len))
            .field("response_content_type", &self.response_content_type)
            .field("retry_len", &self.retry_data.as_ref().map(Bytes::len))
            .field("values", &self.values.len())
            .finish()
    }
}
