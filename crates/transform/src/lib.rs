//! Edgeflow - Transform
//!
//! The pipeline function contract and the built-in function library.
//!
//! # Overview
//!
//! A pipeline is an ordered list of functions. Each function receives the
//! previous function's output (or the decoded envelope, for the first one)
//! plus a mutable [`FunctionContext`], and decides whether the pipeline
//! continues:
//!
//! ```text
//! [Envelope] → [Function 1] → [Function 2] → ... → response / publish / retry
//! ```
//!
//! - `Ok(Outcome::Continue(output))` forwards `output` to the next function
//! - `Ok(Outcome::Stop)` ends the run successfully (filtered out, batched)
//! - `Err(e)` ends the run with a failure
//!
//! # Modules
//!
//! - `chain` - Sequential function execution
//! - `registry` - Function creation from config
//! - `context` / `value_store` - Per-run state and `{name}` interpolation
//! - `filter` - Keep or drop events by device, profile, source or resource
//! - `conversion` - Event to JSON / XML
//! - `tags` - Merge tags into events
//! - `compression` - Gzip / zlib with pooled buffers
//! - `encryption` - AES-256-CBC + HMAC-SHA-512 protection
//! - `batch` - Count and time windows
//! - `response` - Set the trigger response
//!
//! # Example
//!
//! ```ignore
//! let chain = Chain::new(vec![
//!     Arc::new(ConversionTransformer::xml()),
//!     Arc::new(SetResponseData::new(None)),
//! ]);
//! let output = chain.execute(&mut ctx, Some(Payload::from(event))).await?;
//! ```

mod chain;
mod context;
mod error;
pub mod batch;
pub mod compression;
pub mod conversion;
pub mod encryption;
pub mod filter;
pub mod registry;
pub mod response;
pub mod tags;
pub mod value_store;

pub use batch::{BatchFactory, BatchMode, BatchTransformer};
pub use chain::Chain;
pub use compression::{CompressionAlgorithm, CompressionFactory, CompressionTransformer};
pub use context::FunctionContext;
pub use conversion::{ConversionFactory, ConversionFormat, ConversionTransformer};
pub use encryption::{Aes256CbcHmacSha512, AesProtection, EncryptionFactory};
pub use error::TransformError;
pub use filter::{FilterFactory, FilterField, FilterMode, FilterTransformer};
pub use registry::{FunctionFactory, FunctionRegistry};
pub use response::{ResponseFactory, SetResponseData};
pub use tags::{TagsFactory, TagsTransformer};
pub use value_store::ValueStore;

use edgeflow_protocol::{Event, Payload};
use std::future::Future;
use std::pin::Pin;

/// Result type for function operations
pub type TransformResult<T> = Result<T, TransformError>;

/// Boxed future returned by [`Transformer::transform`]
pub type TransformFuture<'a> = Pin<Box<dyn Future<Output = TransformResult<Outcome>> + Send + 'a>>;

/// What a function asks the pipeline to do next
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Run the next function with this input (`None` is "no data")
    Continue(Option<Payload>),
    /// End the run successfully
    Stop,
}

impl Outcome {
    /// Shorthand for `Continue(Some(payload))`
    pub fn next(payload: impl Into<Payload>) -> Self {
        Self::Continue(Some(payload.into()))
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }
}

/// A pipeline function
///
/// Implementors must be `Send + Sync`: one instance is shared by every
/// pipeline that lists it and may run concurrently for different envelopes.
///
/// # Example
///
/// ```ignore
/// struct Uppercase;
///
/// impl Transformer for Uppercase {
///     fn transform<'a>(
///         &'a self,
///         ctx: &'a mut FunctionContext,
///         input: Option<Payload>,
///     ) -> TransformFuture<'a> {
///         Box::pin(async move {
///             let input = require_input(self.name(), ctx, input)?;
///             let bytes = coerce(&input)?;
///             Ok(Outcome::next(bytes.to_ascii_uppercase()))
///         })
///     }
///
///     fn name(&self) -> &'static str {
///         "uppercase"
///     }
/// }
/// ```
pub trait Transformer: Send + Sync {
    /// Process one input in the context of one pipeline run
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformFuture<'a>;

    /// Name of this function type for logging and error messages
    fn name(&self) -> &'static str;

    /// Whether this function expects an `Event` when it runs first
    ///
    /// The dispatcher decodes JSON envelopes into events for such functions.
    fn wants_event(&self) -> bool {
        false
    }

    /// Release resources and wake any blocked callers
    ///
    /// Called during graceful shutdown. Default implementation is a no-op.
    fn close(&self) -> TransformResult<()> {
        Ok(())
    }
}

/// Fail with `NoData` when `input` is absent
pub fn require_input(
    function: &str,
    ctx: &FunctionContext,
    input: Option<Payload>,
) -> TransformResult<Payload> {
    input.ok_or_else(|| TransformError::no_data(function, ctx.pipeline_id()))
}

/// Require an event input, decoding JSON values when necessary
pub fn require_event(
    function: &str,
    ctx: &FunctionContext,
    input: Option<Payload>,
) -> TransformResult<Event> {
    let input = require_input(function, ctx, input)?;
    let kind = input.kind();
    match input.into_event() {
        Some(Ok(event)) => Ok(event),
        Some(Err(_)) | None => Err(TransformError::unexpected_type(
            function,
            ctx.pipeline_id(),
            "event",
            kind,
        )),
    }
}

/// Create a registry with every built-in function type registered
///
/// `mqtt_export` lives in `edgeflow-sinks` and is added there.
pub fn create_default_registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry.register("filter_by_device_name", FilterFactory::new(FilterField::Device));
    registry.register("filter_by_profile_name", FilterFactory::new(FilterField::Profile));
    registry.register("filter_by_source_name", FilterFactory::new(FilterField::Source));
    registry.register("filter_by_resource_name", FilterFactory::new(FilterField::Resource));
    registry.register("to_json", ConversionFactory::new(ConversionFormat::Json));
    registry.register("to_xml", ConversionFactory::new(ConversionFormat::Xml));
    registry.register("add_tags", TagsFactory);
    registry.register("compress_gzip", CompressionFactory::new(CompressionAlgorithm::Gzip));
    registry.register("compress_zlib", CompressionFactory::new(CompressionAlgorithm::Zlib));
    registry.register("encrypt_aes256", EncryptionFactory);
    registry.register("batch_by_count", BatchFactory::new(BatchMode::CountOnly));
    registry.register("batch_by_time", BatchFactory::new(BatchMode::TimeOnly));
    registry.register("batch_by_time_and_count", BatchFactory::new(BatchMode::TimeAndCount));
    registry.register("set_response_data", ResponseFactory);
    registry
}

#[cfg(test)]
mod test_util;

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
