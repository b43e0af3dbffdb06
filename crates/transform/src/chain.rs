//! Function Chain - Sequential pipeline execution
//!
//! # Design
//!
//! - **Sequential execution**: functions run in order, each receiving the
//!   output of the previous
//! - **Early stop**: `Outcome::Stop` ends the run successfully
//! - **Fail-fast**: the first error ends the run
//! - **Immutable**: a chain is never modified after construction

use std::fmt;
use std::sync::Arc;

use edgeflow_protocol::Payload;
use tracing::Instrument;

use crate::{FunctionContext, Outcome, TransformResult, Transformer};

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;

/// A function together with the identifier it was registered under
#[derive(Clone)]
struct NamedFunction {
    id: String,
    function: Arc<dyn Transformer>,
}

/// Ordered, non-empty-by-convention list of functions
#[derive(Clone, Default)]
pub struct Chain {
    functions: Vec<NamedFunction>,
}

impl Chain {
    /// Build a chain identifying each function by its type name
    pub fn new(functions: Vec<Arc<dyn Transformer>>) -> Self {
        Self {
            functions: functions
                .into_iter()
                .map(|function| NamedFunction {
                    id: function.name().to_string(),
                    function,
                })
                .collect(),
        }
    }

    /// Build a chain with caller-supplied identifiers (config instance names)
    pub fn named(functions: Vec<(String, Arc<dyn Transformer>)>) -> Self {
        Self {
            functions: functions
                .into_iter()
                .map(|(id, function)| NamedFunction { id, function })
                .collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Identifiers in execution order
    pub fn identifiers(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.id.as_str()).collect()
    }

    /// Whether the first function wants a decoded event
    pub fn wants_event(&self) -> bool {
        self.functions
            .first()
            .is_some_and(|f| f.function.wants_event())
    }

    /// Run every function in order
    ///
    /// Returns the last function's output, or `None` if a function stopped
    /// the run. The run executes inside the context's span.
    pub async fn execute(
        &self,
        ctx: &mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformResult<Option<Payload>> {
        let span = ctx.span().clone();
        self.execute_inner(ctx, input).instrument(span).await
    }

    async fn execute_inner(
        &self,
        ctx: &mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformResult<Option<Payload>> {
        let mut current = input;

        for (index, f) in self.functions.iter().enumerate() {
            match f.function.transform(ctx, current).await {
                Ok(Outcome::Continue(output)) => current = output,
                Ok(Outcome::Stop) => {
                    tracing::debug!(function = %f.id, index, "pipeline stopped");
                    return Ok(None);
                }
                Err(e) => {
                    tracing::debug!(function = %f.id, index, error = %e, "function failed");
                    return Err(e);
                }
            }
        }

        Ok(current)
    }

    /// Close every function, logging failures
    pub fn close(&self) {
        for f in &self.functions {
            if let Err(e) = f.function.close() {
                tracing::warn!(function = %f.id, error = %e, "failed to close function");
            }
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("functions", &self.identifiers())
            .finish()
    }
}
