//! Build function chains from `[functions]` and register `[pipelines]`
//!
//! Each pipeline gets its own function instances, so stateful functions
//! (batching, MQTT clients) never share state across pipelines.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use edgeflow_config::{Config, FunctionConfig};
use edgeflow_pipeline::Dispatcher;
use edgeflow_transform::{Chain, FunctionRegistry, Transformer};

/// Instantiate the named functions, in order
pub fn build_chain(
    registry: &FunctionRegistry,
    functions: &BTreeMap<String, FunctionConfig>,
    pipeline_id: &str,
    names: &[String],
) -> Result<Chain> {
    let mut chain: Vec<(String, Arc<dyn Transformer>)> = Vec::with_capacity(names.len());
    for name in names {
        let Some(function) = functions.get(name) else {
            bail!("pipeline '{pipeline_id}' references unknown function '{name}'");
        };
        let transformer = registry.create(function).with_context(|| {
            format!("failed to create function '{name}' for pipeline '{pipeline_id}'")
        })?;
        chain.push((name.clone(), transformer));
    }
    Ok(Chain::named(chain))
}

/// Register the default and per-topic pipelines, returning how many were added
pub fn register_pipelines(
    dispatcher: &Dispatcher,
    config: &Config,
    registry: &FunctionRegistry,
) -> Result<usize> {
    let pipelines = &config.pipelines;
    let mut registered = 0;

    if pipelines.has_default() {
        let chain = build_chain(
            registry,
            &config.functions,
            edgeflow_pipeline::DEFAULT_PIPELINE_ID,
            &pipelines.default,
        )?;
        dispatcher
            .set_default_pipeline(chain)
            .context("failed to register default pipeline")?;
        registered += 1;
    }

    for (id, pipeline) in &pipelines.per_topic {
        let chain = build_chain(registry, &config.functions, id, &pipeline.functions)?;
        dispatcher
            .add_pipeline_for_topics(id, &pipeline.topics, chain)
            .with_context(|| format!("failed to register pipeline '{id}'"))?;
        registered += 1;
    }

    for (id, functions) in pipelines.iter_functions() {
        tracing::info!(pipeline = %id, functions = ?functions, "pipeline registered");
    }
    Ok(registered)
}
