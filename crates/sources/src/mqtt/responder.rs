//! Publishes pipeline responses back to the broker

use std::sync::Arc;

use async_trait::async_trait;
use edgeflow_pipeline::{PipelineError, PipelineResponse, ResponseHandler, Result};
use edgeflow_transform::FunctionContext;
use rumqttc::{AsyncClient, QoS};

use crate::common::TriggerMetrics;

/// Response handler for envelopes received over MQTT
///
/// The publish topic may contain `{name}` placeholders, resolved against
/// the value store of the context that produced the response.
pub struct MqttResponder {
    client: AsyncClient,
    publish_topic: Option<String>,
    qos: QoS,
    retain: bool,
    metrics: Arc<TriggerMetrics>,
}

impl MqttResponder {
    pub fn new(
        client: AsyncClient,
        publish_topic: Option<String>,
        qos: QoS,
        retain: bool,
        metrics: Arc<TriggerMetrics>,
    ) -> Self {
        Self {
            client,
            publish_topic,
            qos,
            retain,
            metrics,
        }
    }
}

#[async_trait]
impl ResponseHandler for MqttResponder {
    async fn handle_response(&self, ctx: &FunctionContext, response: PipelineResponse) -> Result<()> {
        let Some(template) = self.publish_topic.as_deref() else {
            tracing::debug!(
                pipeline = %response.pipeline_id,
                correlation_id = %response.correlation_id,
                "no publish topic configured, dropping response"
            );
            return Ok(());
        };

        let topic = ctx.apply_values(template)?;
        if let Err(e) = self
            .client
            .publish(topic.as_str(), self.qos, self.retain, response.data.to_vec())
            .await
        {
            self.metrics.error();
            return Err(PipelineError::response(format!(
                "publish to '{topic}' failed: {e}"
            )));
        }

        self.metrics.response_sent();
        tracing::debug!(
            topic = %topic,
            pipeline = %response.pipeline_id,
            correlation_id = %response.correlation_id,
            "response published"
        );
        Ok(())
    }
}
