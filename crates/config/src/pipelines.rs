//! Pipeline configuration
//!
//! The default pipeline receives every topic. Per-topic pipelines receive
//! only envelopes whose topic is listed (or `#` for all).
//!
//! # Example
//!
//! ```toml
//! [pipelines]
//! default = ["to_xml", "response"]
//!
//! [pipelines.per_topic.floor1]
//! topics = ["events/device/X", "events/device/Y"]
//! functions = ["only_x", "compress", "export"]
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;

/// Reserved id of the default pipeline
pub const DEFAULT_PIPELINE_ID: &str = "default-pipeline";

/// Pipeline wiring: which functions run, in which order, for which topics
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelinesConfig {
    /// Functions of the default pipeline (topic `#`)
    /// If empty, no default pipeline is registered
    pub default: Vec<String>,

    /// Pipelines selected by topic, keyed by pipeline id
    pub per_topic: BTreeMap<String, TopicPipelineConfig>,
}

/// A pipeline bound to a set of topics
#[derive(Debug, Clone, Deserialize)]
pub struct TopicPipelineConfig {
    /// Topics this pipeline receives (`#` matches any topic)
    pub topics: Vec<String>,

    /// Function names, in execution order
    pub functions: Vec<String>,
}

impl PipelinesConfig {
    pub fn has_default(&self) -> bool {
        !self.default.is_empty()
    }

    /// True when no pipeline at all is configured
    pub fn is_empty(&self) -> bool {
        self.default.is_empty() && self.per_topic.is_empty()
    }

    /// Iterate `(pipeline id, function names)` over every configured pipeline,
    /// default first
    pub fn iter_functions(&self) -> impl Iterator<Item = (&str, &[String])> {
        let default = self
            .has_default()
            .then_some((DEFAULT_PIPELINE_ID, self.default.as_slice()));
        default.into_iter().chain(
            self.per_topic
                .iter()
                .map(|(id, p)| (id.as_str(), p.functions.as_slice())),
        )
    }
}
