//! Tags Transformer - Merge static tags into events
//!
//! Configured tags overwrite event tags with the same key. With no tags
//! configured the event passes through untouched.
//!
//! ```toml
//! [functions.site_tags]
//! type = "add_tags"
//! tags = { Latitude = "29.630771", GatewayId = "HoustonStore000123" }
//!
//! # or, string form
//! [functions.more_tags]
//! type = "add_tags"
//! tags = "Floor:3,Wing:East"
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use edgeflow_config::FunctionConfig;
use edgeflow_protocol::Payload;
use serde_json::Value;

use crate::registry::FunctionFactory;
use crate::{
    FunctionContext, Outcome, TransformError, TransformFuture, TransformResult, Transformer,
    require_event,
};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Adds configured tags to every event
pub struct TagsTransformer {
    tags: BTreeMap<String, Value>,
}

impl TagsTransformer {
    pub fn new(tags: BTreeMap<String, Value>) -> Self {
        Self { tags }
    }

    /// Parse `key:value,key2:value2`
    pub fn parse_tag_string(spec: &str) -> TransformResult<BTreeMap<String, Value>> {
        spec.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (key, value) = entry.split_once(':').ok_or_else(|| {
                    TransformError::config(format!(
                        "add_tags: tag '{entry}' is not in key:value form"
                    ))
                })?;
                let key = key.trim();
                if key.is_empty() {
                    return Err(TransformError::config(format!(
                        "add_tags: tag '{entry}' has an empty key"
                    )));
                }
                Ok((key.to_string(), Value::String(value.trim().to_string())))
            })
            .collect()
    }

    pub fn tags(&self) -> &BTreeMap<String, Value> {
        &self.tags
    }
}

impl Transformer for TagsTransformer {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let mut event = require_event(self.name(), ctx, input)?;
            if !self.tags.is_empty() {
                event
                    .tags
                    .extend(self.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Ok(Outcome::next(event))
        })
    }

    fn name(&self) -> &'static str {
        "add_tags"
    }

    fn wants_event(&self) -> bool {
        true
    }
}

/// Factory for `add_tags`
pub struct TagsFactory;

impl FunctionFactory for TagsFactory {
    fn create(&self, config: &FunctionConfig) -> TransformResult<Arc<dyn Transformer>> {
        let tags = if let Some(spec) = config.get_str("tags") {
            TagsTransformer::parse_tag_string(spec)?
        } else if let Some(table) = config.get_table("tags") {
            table
                .into_iter()
                .map(|(k, v)| {
                    serde_json::to_value(&v)
                        .map(|v| (k, v))
                        .map_err(|e| TransformError::config(format!("add_tags: {e}")))
                })
                .collect::<TransformResult<_>>()?
        } else {
            BTreeMap::new()
        };
        Ok(Arc::new(TagsTransformer::new(tags)))
    }

    fn name(&self) -> &'static str {
        "add_tags"
    }
}
