//! Filter Transformer - Keep or drop events by identity
//!
//! Filters an event by its device, profile or source name, or filters the
//! readings of an event by resource name.
//!
//! # Configuration
//!
//! | Option | Type | Default | Description |
//! |--------|------|---------|-------------|
//! | `names` | array or comma-separated string | required | Names to match |
//! | `mode` | string | `"include"` | `include` keeps matches, `exclude` drops them |
//!
//! An empty `names` list passes every event through.
//!
//! # TOML Example
//!
//! ```toml
//! [functions.only_sensors]
//! type = "filter_by_device_name"
//! names = ["Random-Integer-Device", "Random-Float-Device"]
//!
//! [functions.no_debug_readings]
//! type = "filter_by_resource_name"
//! names = "debug,trace"
//! mode = "exclude"
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use edgeflow_config::FunctionConfig;
use edgeflow_protocol::{Event, Payload};

use crate::registry::{FunctionFactory, required_list};
use crate::{
    FunctionContext, Outcome, TransformError, TransformFuture, TransformResult, Transformer,
    require_event,
};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Which event attribute is compared against the configured names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Device,
    Profile,
    Source,
    /// Filters readings rather than whole events
    Resource,
}

impl FilterField {
    fn function_name(self) -> &'static str {
        match self {
            Self::Device => "filter_by_device_name",
            Self::Profile => "filter_by_profile_name",
            Self::Source => "filter_by_source_name",
            Self::Resource => "filter_by_resource_name",
        }
    }
}

/// Keep matches or drop matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Include,
    Exclude,
}

impl FilterMode {
    fn parse(s: &str) -> Result<Self, String> {
        match s {
            "include" => Ok(Self::Include),
            "exclude" => Ok(Self::Exclude),
            other => Err(format!("unknown filter mode '{other}', expected include or exclude")),
        }
    }
}

/// Metrics for the filter transformer
#[derive(Debug, Default)]
pub struct FilterMetrics {
    /// Events passed on
    pub events_passed: AtomicU64,
    /// Events that stopped the pipeline
    pub events_dropped: AtomicU64,
    /// Readings removed by resource filtering
    pub readings_dropped: AtomicU64,
}

/// Event filter
pub struct FilterTransformer {
    field: FilterField,
    mode: FilterMode,
    names: HashSet<String>,
    metrics: FilterMetrics,
}

impl FilterTransformer {
    pub fn new(field: FilterField, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            field,
            mode: FilterMode::Include,
            names: names.into_iter().map(Into::into).collect(),
            metrics: FilterMetrics::default(),
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: FilterMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn metrics(&self) -> &FilterMetrics {
        &self.metrics
    }

    /// Whether a value survives the filter
    fn keeps(&self, value: &str) -> bool {
        let matched = self.names.contains(value);
        match self.mode {
            FilterMode::Include => matched,
            FilterMode::Exclude => !matched,
        }
    }

    fn apply(&self, mut event: Event) -> Outcome {
        if self.names.is_empty() {
            self.metrics.events_passed.fetch_add(1, Ordering::Relaxed);
            return Outcome::next(event);
        }

        let kept = match self.field {
            FilterField::Device => self.keeps(&event.device_name),
            FilterField::Profile => self.keeps(&event.profile_name),
            FilterField::Source => self.keeps(&event.source_name),
            FilterField::Resource => {
                let before = event.readings.len();
                event.readings.retain(|r| self.keeps(&r.resource_name));
                let removed = before - event.readings.len();
                self.metrics
                    .readings_dropped
                    .fetch_add(removed as u64, Ordering::Relaxed);
                !event.readings.is_empty()
            }
        };

        if kept {
            self.metrics.events_passed.fetch_add(1, Ordering::Relaxed);
            Outcome::next(event)
        } else {
            self.metrics.events_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                function = self.name(),
                device = %event.device_name,
                "event filtered out"
            );
            Outcome::Stop
        }
    }
}

impl Transformer for FilterTransformer {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let event = require_event(self.name(), ctx, input)?;
            Ok(self.apply(event))
        })
    }

    fn name(&self) -> &'static str {
        self.field.function_name()
    }

    fn wants_event(&self) -> bool {
        true
    }
}

/// Factory for one filter field
pub struct FilterFactory {
    field: FilterField,
}

impl FilterFactory {
    pub fn new(field: FilterField) -> Self {
        Self { field }
    }
}

impl FunctionFactory for FilterFactory {
    fn create(&self, config: &FunctionConfig) -> TransformResult<Arc<dyn Transformer>> {
        let names = required_list(config, "names")?;
        let mode = config
            .get_str("mode")
            .map(FilterMode::parse)
            .transpose()
            .map_err(TransformError::config)?
            .unwrap_or_default();
        Ok(Arc::new(FilterTransformer::new(self.field, names).with_mode(mode)))
    }

    fn name(&self) -> &'static str {
        self.field.function_name()
    }
}
