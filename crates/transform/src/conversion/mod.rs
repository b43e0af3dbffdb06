//! Conversion Transformer - Event to JSON or XML
//!
//! Serializes the incoming event, sets the response content type to match,
//! and forwards the serialized text. XML uses PascalCase element names under
//! an `<Event>` root; JSON uses the camelCase wire names.

use std::sync::Arc;

use edgeflow_config::FunctionConfig;
use edgeflow_protocol::{CONTENT_TYPE_JSON, CONTENT_TYPE_XML, Payload};

use crate::registry::FunctionFactory;
use crate::{
    FunctionContext, Outcome, TransformError, TransformFuture, TransformResult, Transformer,
    require_event,
};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionFormat {
    Json,
    Xml,
}

impl ConversionFormat {
    fn content_type(self) -> &'static str {
        match self {
            Self::Json => CONTENT_TYPE_JSON,
            Self::Xml => CONTENT_TYPE_XML,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }
}

/// Event serializer
pub struct ConversionTransformer {
    format: ConversionFormat,
}

impl ConversionTransformer {
    pub fn new(format: ConversionFormat) -> Self {
        Self { format }
    }

    pub fn json() -> Self {
        Self::new(ConversionFormat::Json)
    }

    pub fn xml() -> Self {
        Self::new(ConversionFormat::Xml)
    }
}

impl Transformer for ConversionTransformer {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let event = require_event(self.name(), ctx, input)?;

            let encoded = match self.format {
                ConversionFormat::Json => event.to_json(),
                ConversionFormat::Xml => event.to_xml(),
            }
            .map_err(|e| TransformError::encode(self.format.as_str(), e.to_string()))?;

            ctx.set_response_content_type(self.format.content_type());
            Ok(Outcome::next(encoded))
        })
    }

    fn name(&self) -> &'static str {
        match self.format {
            ConversionFormat::Json => "to_json",
            ConversionFormat::Xml => "to_xml",
        }
    }

    fn wants_event(&self) -> bool {
        true
    }
}

/// Factory for one output format
pub struct ConversionFactory {
    format: ConversionFormat,
}

impl ConversionFactory {
    pub fn new(format: ConversionFormat) -> Self {
        Self { format }
    }
}

impl FunctionFactory for ConversionFactory {
    fn create(&self, _config: &FunctionConfig) -> TransformResult<Arc<dyn Transformer>> {
        Ok(Arc::new(ConversionTransformer::new(self.format)))
    }

    fn name(&self) -> &'static str {
        match self.format {
            ConversionFormat::Json => "to_json",
            ConversionFormat::Xml => "to_xml",
        }
    }
}
