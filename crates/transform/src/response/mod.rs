//! Response Transformer - Hand data back to the trigger
//!
//! Stores the coerced input as the pipeline response and forwards the
//! original input unchanged, so later functions can keep working on it.

use std::sync::Arc;

use edgeflow_config::FunctionConfig;
use edgeflow_protocol::{Payload, coerce};

use crate::registry::FunctionFactory;
use crate::{
    FunctionContext, Outcome, TransformFuture, TransformResult, Transformer, require_input,
};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Sets the response data, and optionally its content type
#[derive(Debug, Clone, Default)]
pub struct SetResponseData {
    content_type: Option<String>,
}

impl SetResponseData {
    pub fn new(content_type: Option<String>) -> Self {
        Self { content_type }
    }
}

impl Transformer for SetResponseData {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let input = require_input(self.name(), ctx, input)?;
            let data = coerce(&input)?;

            ctx.set_response_data(data);
            if let Some(content_type) = &self.content_type {
                ctx.set_response_content_type(content_type.clone());
            }
            Ok(Outcome::Continue(Some(input)))
        })
    }

    fn name(&self) -> &'static str {
        "set_response_data"
    }
}

/// Factory for `set_response_data`
pub struct ResponseFactory;

impl FunctionFactory for ResponseFactory {
    fn create(&self, config: &FunctionConfig) -> TransformResult<Arc<dyn Transformer>> {
        let content_type = config
            .get_str("content_type")
            .filter(|ct| !ct.is_empty())
            .map(str::to_string);
        Ok(Arc::new(SetResponseData::new(content_type)))
    }

    fn name(&self) -> &'static str {
        "set_response_data"
    }
}
