//! MQTT Trigger - message-bus source
//!
//! Subscribes to the configured topics and dispatches every publish as an
//! envelope. Pipeline responses go to `publish_topic`; background messages
//! go to their own topic, or `publish_topic` when they carry none.
//!
//! The broker connection reuses the `mqtt_export` plumbing: the same URL
//! schemes, auth modes and secret-store credentials. Setup waits for the
//! first ConnAck so a bad broker fails `initialize`. After that the event
//! loop reconnects on its own and subscriptions are renewed on every
//! ConnAck.

mod responder;


use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use edgeflow_config::MqttTriggerConfig;
use edgeflow_pipeline::{BackgroundMessage, Dispatcher};
use edgeflow_protocol::MessageEnvelope;
use edgeflow_sinks::mqtt::{
    BrokerUrl, MqttConnectionConfig, build_mqtt_options, load_credentials, qos_from_level,
};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, Packet, Publish, QoS};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use responder::MqttResponder;

use crate::common::{TriggerMetrics, TriggerSnapshot};
use crate::{Result, Trigger, TriggerError, TriggerHandle};

/// Outstanding client requests before publishes back-pressure
const REQUEST_CAPACITY: usize = 256;

/// Pause after an event-loop error before polling again
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// MQTT trigger
pub struct MqttTrigger {
    config: MqttTriggerConfig,
    dispatcher: Dispatcher,
    metrics: Arc<TriggerMetrics>,
}

impl MqttTrigger {
    pub fn new(config: MqttTriggerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher,
            metrics: Arc::new(TriggerMetrics::new()),
        }
    }

    pub fn metrics(&self) -> TriggerSnapshot {
        self.metrics.snapshot()
    }

    pub fn metrics_handle(&self) -> Arc<TriggerMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[async_trait]
impl Trigger for MqttTrigger {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    async fn initialize(
        self: Box<Self>,
        shutdown: CancellationToken,
        background: mpsc::Receiver<BackgroundMessage>,
    ) -> Result<TriggerHandle> {
        let connection = MqttConnectionConfig::from_trigger(&self.config)?;
        let qos = qos_from_level(i64::from(self.config.qos))?;
        if self.config.subscribe_topics.is_empty() {
            tracing::warn!("mqtt trigger has no subscribe topics, no envelopes will arrive");
        }

        let credentials = load_credentials(
            &**self.dispatcher.secret_provider(),
            connection.auth_mode,
            &connection.secret_path,
        )
        .await?;
        let options = build_mqtt_options(&connection, &credentials)?;
        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        await_connack(&mut eventloop, &connection.broker, connection.connect_timeout).await?;
        tracing::info!(
            broker = %connection.broker,
            client_id = %connection.client_id,
            topics = ?self.config.subscribe_topics,
            "mqtt trigger connected"
        );

        let session = Arc::new(Session {
            client,
            dispatcher: self.dispatcher.clone(),
            subscribe_topics: self.config.subscribe_topics.clone(),
            publish_topic: self.config.publish_topic.clone(),
            qos,
            retain: self.config.retain,
            metrics: Arc::clone(&self.metrics),
        });
        session.subscribe_all();

        let task = tokio::spawn(run(session, eventloop, shutdown, background));
        Ok(TriggerHandle::new("mqtt", task))
    }
}

/// Poll until the broker accepts or refuses the connection
async fn await_connack(
    eventloop: &mut EventLoop,
    broker: &BrokerUrl,
    timeout: Duration,
) -> Result<()> {
    let connect = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    return if ack.code == ConnectReturnCode::Success {
                        Ok(())
                    } else {
                        Err(TriggerError::mqtt(format!(
                            "broker {broker} refused connection: {:?}",
                            ack.code
                        )))
                    };
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(TriggerError::mqtt(format!(
                        "failed to connect to {broker}: {e}"
                    )));
                }
            }
        }
    };

    tokio::time::timeout(timeout, connect)
        .await
        .map_err(|_| {
            TriggerError::mqtt(format!(
                "timed out connecting to {broker} after {timeout:?}"
            ))
        })?
}

/// State shared by the event loop and spawned dispatches
struct Session {
    client: AsyncClient,
    dispatcher: Dispatcher,
    subscribe_topics: Vec<String>,
    publish_topic: Option<String>,
    qos: QoS,
    retain: bool,
    metrics: Arc<TriggerMetrics>,
}

impl Session {
    /// Queue a subscribe for every configured topic
    fn subscribe_all(&self) {
        for topic in &self.subscribe_topics {
            match self.client.try_subscribe(topic.as_str(), self.qos) {
                Ok(()) => tracing::debug!(topic = %topic, "subscribed"),
                Err(e) => {
                    self.metrics.error();
                    tracing::error!(topic = %topic, error = %e, "subscribe failed");
                }
            }
        }
    }

    /// Dispatch one publish on its own task
    fn dispatch(&self, publish: Publish) {
        let envelope = envelope_from_publish(publish);
        self.metrics
            .envelope_received(envelope.payload().len() as u64);

        let responder = Arc::new(MqttResponder::new(
            self.client.clone(),
            self.publish_topic.clone(),
            self.qos,
            self.retain,
            Arc::clone(&self.metrics),
        ));
        let dispatcher = self.dispatcher.clone();
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            let summary = dispatcher.message_received(envelope, responder).await;
            if summary.all_failed() {
                metrics.error();
            }
        });
    }

    /// Publish a background message without blocking the event loop
    fn publish_background(&self, message: BackgroundMessage) {
        let Some(topic) =
            resolve_background_topic(message.topic.as_deref(), self.publish_topic.as_deref())
        else {
            tracing::warn!(
                correlation_id = %message.envelope.correlation_id(),
                "background message has no topic and no publish topic is configured, dropping"
            );
            return;
        };

        let payload = message.envelope.payload().to_vec();
        match self.client.try_publish(topic, self.qos, self.retain, payload) {
            Ok(()) => self.metrics.background_sent(),
            Err(e) => {
                self.metrics.error();
                tracing::error!(topic = %topic, error = %e, "background publish failed");
            }
        }
    }
}

async fn run(
    session: Arc<Session>,
    mut eventloop: EventLoop,
    shutdown: CancellationToken,
    mut background: mpsc::Receiver<BackgroundMessage>,
) -> Result<()> {
    let mut background_open = true;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                if let Err(e) = session.client.try_disconnect() {
                    tracing::debug!(error = %e, "mqtt disconnect request failed");
                }
                break;
            }

            message = background.recv(), if background_open => match message {
                Some(message) => session.publish_background(message),
                None => background_open = false,
            },

            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => session.dispatch(publish),
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("mqtt trigger reconnected");
                    session.subscribe_all();
                }
                Ok(_) => {}
                Err(e) => {
                    session.metrics.error();
                    tracing::warn!(error = %e, "mqtt connection error, retrying");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            },
        }
    }

    tracing::info!("mqtt trigger stopped");
    Ok(())
}

/// Envelope for an incoming publish
///
/// MQTT 3.1.1 carries no headers, so every envelope gets a fresh
/// correlation id and the JSON content type.
fn envelope_from_publish(publish: Publish) -> MessageEnvelope {
    MessageEnvelope::new(publish.topic, publish.payload)
}

/// Topic for a background message: its own, else the publish topic
fn resolve_background_topic<'a>(
    message_topic: Option<&'a str>,
    publish_topic: Option<&'a str>,
) -> Option<&'a str> {
    message_topic
        .filter(|t| !t.is_empty())
        .or(publish_topic.filter(|t| !t.is_empty()))
}
