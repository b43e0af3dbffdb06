//! MQTT Export - Publish pipeline output to a broker
//!
//! The client is built lazily on first use and rebuilt whenever the secret
//! store reports newer secrets than the ones the client was built with.
//! The current client is read without locking; construction and connection
//! are each serialized behind their own lock, and publishing is not.
//!
//! On a connect or publish failure with `persist_on_error`, the payload is
//! handed to the retry store through the function context.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use bytes::Bytes;
use edgeflow_config::FunctionConfig;
use edgeflow_protocol::{Payload, coerce};
use edgeflow_transform::{
    FunctionContext, FunctionFactory, Outcome, TransformFuture, TransformResult, Transformer,
    require_input,
};
use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;

use super::client::{ClientFactory, MqttClient, SecretClientFactory};
use super::config::MqttExportConfig;

#[cfg(test)]
#[path = "sender_test.rs"]
mod tests;

/// Resolves the publish topic for one message
pub type TopicFormatter =
    Arc<dyn Fn(&str, &FunctionContext) -> TransformResult<String> + Send + Sync>;

/// Export counters
#[derive(Debug, Default)]
pub struct SenderMetrics {
    pub published: AtomicU64,
    pub bytes_published: AtomicU64,
    pub publish_failures: AtomicU64,
    pub connect_failures: AtomicU64,
    pub client_builds: AtomicU64,
    pub retries_requested: AtomicU64,
}

/// Point-in-time copy of [`SenderMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderMetricsSnapshot {
    pub published: u64,
    pub bytes_published: u64,
    pub publish_failures: u64,
    pub connect_failures: u64,
    pub client_builds: u64,
    pub retries_requested: u64,
}

impl SenderMetrics {
    pub fn snapshot(&self) -> SenderMetricsSnapshot {
        SenderMetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            bytes_published: self.bytes_published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            client_builds: self.client_builds.load(Ordering::Relaxed),
            retries_requested: self.retries_requested.load(Ordering::Relaxed),
        }
    }
}

/// Client together with the secrets timestamp it was built from
struct CachedClient {
    client: Arc<dyn MqttClient>,
    secrets_last_retrieved: SystemTime,
}

impl CachedClient {
    fn fresh(&self, secrets_last_updated: SystemTime) -> bool {
        self.secrets_last_retrieved >= secrets_last_updated
    }
}

/// Secret-backed MQTT publisher
pub struct MqttSecretSender {
    config: MqttExportConfig,
    factory: Arc<dyn ClientFactory>,
    topic_formatter: Option<TopicFormatter>,
    current: ArcSwapOption<CachedClient>,
    build_lock: Mutex<()>,
    connect_lock: Mutex<()>,
    metrics: SenderMetrics,
}

impl MqttSecretSender {
    pub fn new(config: MqttExportConfig) -> Self {
        Self::with_factory(config, Arc::new(SecretClientFactory))
    }

    pub fn with_factory(config: MqttExportConfig, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            config,
            factory,
            topic_formatter: None,
            current: ArcSwapOption::empty(),
            build_lock: Mutex::new(()),
            connect_lock: Mutex::new(()),
            metrics: SenderMetrics::default(),
        }
    }

    /// Replace `{name}` interpolation with a custom topic resolver
    pub fn with_topic_formatter(mut self, formatter: TopicFormatter) -> Self {
        self.topic_formatter = Some(formatter);
        self
    }

    pub fn config(&self) -> &MqttExportConfig {
        &self.config
    }

    pub fn metrics(&self) -> &SenderMetrics {
        &self.metrics
    }

    /// Current client, rebuilt when missing or built from stale secrets
    async fn client(&self, ctx: &FunctionContext) -> TransformResult<Arc<dyn MqttClient>> {
        let updated = ctx.secrets_last_updated();
        if let Some(cached) = self.current.load_full()
            && cached.fresh(updated)
        {
            return Ok(Arc::clone(&cached.client));
        }

        let _guard = self.build_lock.lock().await;
        let current = self.current.load_full();
        if let Some(cached) = &current
            && cached.fresh(updated)
        {
            return Ok(Arc::clone(&cached.client));
        }

        if let Some(stale) = current {
            tracing::info!(
                broker = %self.config.connection.broker,
                "secrets updated, rebuilding mqtt client"
            );
            stale.client.disconnect().await;
        }

        let client = self
            .factory
            .create(&self.config, ctx.secret_provider().as_ref())
            .await?;
        self.metrics.client_builds.fetch_add(1, Ordering::Relaxed);
        self.current.store(Some(Arc::new(CachedClient {
            client: Arc::clone(&client),
            secrets_last_retrieved: updated,
        })));
        Ok(client)
    }

    async fn ensure_connected(&self, client: &dyn MqttClient) -> TransformResult<()> {
        if client.is_connected() {
            return Ok(());
        }
        let _guard = self.connect_lock.lock().await;
        if client.is_connected() {
            return Ok(());
        }
        client.connect().await
    }

    fn topic(&self, ctx: &FunctionContext) -> TransformResult<String> {
        match &self.topic_formatter {
            Some(format) => format(&self.config.topic, ctx),
            None => ctx.apply_values(&self.config.topic),
        }
    }

    fn request_retry(&self, ctx: &mut FunctionContext, data: &Bytes) {
        if self.config.persist_on_error {
            ctx.set_retry_data(data.clone());
            self.metrics.retries_requested.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Transformer for MqttSecretSender {
    fn transform<'a>(
        &'a self,
        ctx: &'a mut FunctionContext,
        input: Option<Payload>,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let input = require_input(self.name(), ctx, input)?;
            let data = coerce(&input)?;

            let client = self.client(ctx).await?;

            if let Err(e) = self.ensure_connected(client.as_ref()).await {
                self.metrics.connect_failures.fetch_add(1, Ordering::Relaxed);
                self.request_retry(ctx, &data);
                return Err(e);
            }

            let topic = self.topic(ctx)?;
            let len = data.len();
            if let Err(e) = client
                .publish(&topic, self.config.qos, self.config.retain, data.clone())
                .await
            {
                self.metrics.publish_failures.fetch_add(1, Ordering::Relaxed);
                self.request_retry(ctx, &data);
                return Err(e);
            }

            self.metrics.published.fetch_add(1, Ordering::Relaxed);
            self.metrics
                .bytes_published
                .fetch_add(len as u64, Ordering::Relaxed);
            tracing::debug!(topic = %topic, bytes = len, "published to mqtt");
            Ok(Outcome::Continue(None))
        })
    }

    fn name(&self) -> &'static str {
        "mqtt_export"
    }

    fn close(&self) -> TransformResult<()> {
        if self.build_lock.try_lock().is_err() {
            tracing::warn!(
                broker = %self.config.connection.broker,
                "mqtt client build in progress during close, it stays connected until the next close"
            );
        }
        let Some(cached) = self.current.swap(None) else {
            return Ok(());
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { cached.client.disconnect().await });
            }
            Err(_) => tracing::warn!(
                broker = %self.config.connection.broker,
                "no runtime to disconnect mqtt client, dropping it"
            ),
        }
        Ok(())
    }
}

/// Factory for `mqtt_export`
pub struct MqttSenderFactory {
    client_factory: Arc<dyn ClientFactory>,
}

impl MqttSenderFactory {
    pub fn new(client_factory: Arc<dyn ClientFactory>) -> Self {
        Self { client_factory }
    }
}

impl Default for MqttSenderFactory {
    fn default() -> Self {
        Self::new(Arc::new(SecretClientFactory))
    }
}

impl FunctionFactory for MqttSenderFactory {
    fn create(&self, config: &FunctionConfig) -> TransformResult<Arc<dyn Transformer>> {
        let config = MqttExportConfig::from_function(config)?;
        Ok(Arc::new(MqttSecretSender::with_factory(
            config,
            Arc::clone(&self.client_factory),
        )))
    }

    fn name(&self) -> &'static str {
        "mqtt_export"
    }
}
