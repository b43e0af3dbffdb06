//! MQTT client seam
//!
//! [`MqttClient`] is the narrow surface the export function needs. The
//! production implementation wraps a rumqttc client and drives its event loop
//! on a background task. Publishing waits for the broker's acknowledgement
//! (or, at QoS 0, for the write) up to the connect timeout.
//! [`ClientFactory`] builds clients from settings and the secret store, so
//! tests can swap in fakes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use edgeflow_secrets::SecretProvider;
use edgeflow_transform::{TransformError, TransformResult};
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use super::acks::PublishTracker;
use super::config::{MqttConnectionConfig, MqttExportConfig};
use super::credentials::{ClientCredentials, load_credentials};
use super::tls::tls_transport;

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

/// Capacity of the request channel between client handle and event loop
const REQUEST_CAPACITY: usize = 64;

/// Pause between reconnect attempts after the connection drops
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Publishing MQTT client
#[async_trait]
pub trait MqttClient: Send + Sync {
    /// Connect and wait for the broker's acknowledgement
    async fn connect(&self) -> TransformResult<()>;

    fn is_connected(&self) -> bool;

    /// Publish and wait until the broker has it
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Bytes,
    ) -> TransformResult<()>;

    /// Close the connection; the client may be discarded afterwards
    async fn disconnect(&self) {}
}

/// Builds clients for `mqtt_export` functions
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(
        &self,
        config: &MqttExportConfig,
        secrets: &dyn SecretProvider,
    ) -> TransformResult<Arc<dyn MqttClient>>;
}

/// Factory reading credentials from the secret store
#[derive(Debug, Default, Clone, Copy)]
pub struct SecretClientFactory;

#[async_trait]
impl ClientFactory for SecretClientFactory {
    async fn create(
        &self,
        config: &MqttExportConfig,
        secrets: &dyn SecretProvider,
    ) -> TransformResult<Arc<dyn MqttClient>> {
        let connection = &config.connection;
        let credentials =
            load_credentials(secrets, connection.auth_mode, &connection.secret_path).await?;
        let options = build_mqtt_options(connection, &credentials)?;

        tracing::debug!(
            broker = %connection.broker,
            client_id = %connection.client_id,
            auth_mode = %connection.auth_mode,
            "mqtt client created"
        );
        Ok(Arc::new(RumqttClient::new(
            options,
            connection.connect_timeout,
            config.auto_reconnect,
        )))
    }
}

/// Translate connection settings and credentials into client options
pub fn build_mqtt_options(
    connection: &MqttConnectionConfig,
    credentials: &ClientCredentials,
) -> TransformResult<MqttOptions> {
    let mut options = MqttOptions::new(
        connection.client_id.clone(),
        connection.broker.host.clone(),
        connection.broker.port,
    );

    let keep_alive = if connection.keep_alive.is_zero() {
        Duration::ZERO
    } else {
        connection.keep_alive.max(Duration::from_secs(1))
    };
    options.set_keep_alive(keep_alive);

    if let (Some(username), Some(password)) = (&credentials.username, &credentials.password) {
        options.set_credentials(username.clone(), password.clone());
    }

    if connection.broker.is_tls() {
        options.set_transport(tls_transport(credentials, connection.skip_verify)?);
    } else if credentials.has_tls_material() {
        tracing::warn!(
            broker = %connection.broker,
            "tls material ignored for a plain tcp broker"
        );
    }

    Ok(options)
}

struct Session {
    client: AsyncClient,
    tracker: Arc<PublishTracker>,
    driver: JoinHandle<()>,
}

impl Session {
    fn end(self, reason: &str) {
        let abandoned = self.tracker.on_connection_lost(reason, false);
        if abandoned > 0 {
            tracing::warn!(abandoned, reason, "mqtt publishes abandoned");
        }
        self.driver.abort();
    }
}

/// rumqttc-backed client
pub struct RumqttClient {
    options: MqttOptions,
    connect_timeout: Duration,
    auto_reconnect: bool,
    session: Mutex<Option<Session>>,
    connected: Arc<AtomicBool>,
}

impl RumqttClient {
    pub fn new(options: MqttOptions, connect_timeout: Duration, auto_reconnect: bool) -> Self {
        Self {
            options,
            connect_timeout,
            auto_reconnect,
            session: Mutex::new(None),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl MqttClient for RumqttClient {
    async fn connect(&self) -> TransformResult<()> {
        let mut session = self.session.lock().await;
        if self.is_connected() {
            return Ok(());
        }
        if let Some(old) = session.take() {
            old.end("connection replaced");
        }

        let (client, eventloop) = AsyncClient::new(self.options.clone(), REQUEST_CAPACITY);
        let tracker = Arc::new(PublishTracker::default());
        let (ready_tx, ready_rx) = oneshot::channel();
        let driver = tokio::spawn(drive_event_loop(
            eventloop,
            Arc::clone(&self.connected),
            Arc::clone(&tracker),
            self.auto_reconnect,
            ready_tx,
        ));

        let (host, port) = self.options.broker_address();
        match tokio::time::timeout(self.connect_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!(broker = %host, port, "connected to mqtt broker");
                *session = Some(Session {
                    client,
                    tracker,
                    driver,
                });
                Ok(())
            }
            Ok(Ok(Err(reason))) => {
                driver.abort();
                Err(TransformError::transport(format!(
                    "failed to connect to {host}:{port}: {reason}"
                )))
            }
            Ok(Err(_)) => {
                driver.abort();
                Err(TransformError::transport(format!(
                    "connection to {host}:{port} closed before acknowledgement"
                )))
            }
            Err(_) => {
                driver.abort();
                Err(TransformError::transport(format!(
                    "timed out connecting to {host}:{port} after {:?}",
                    self.connect_timeout
                )))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Bytes,
    ) -> TransformResult<()> {
        let ack = {
            let guard = self.session.lock().await;
            let Some(session) = guard.as_ref() else {
                return Err(TransformError::transport("mqtt client is not connected"));
            };
            // registration and submission stay in the same order under the lock
            let ack = session.tracker.register(qos);
            if let Err(e) = session
                .client
                .publish(topic, qos, retain, payload.to_vec())
                .await
            {
                session.tracker.unregister_last();
                return Err(TransformError::transport(format!(
                    "publish to '{topic}' failed: {e}"
                )));
            }
            ack
        };

        match tokio::time::timeout(self.connect_timeout, ack).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(TransformError::transport(format!(
                "publish to '{topic}' failed: {reason}"
            ))),
            Ok(Err(_)) => Err(TransformError::transport(format!(
                "connection closed before publish to '{topic}' was acknowledged"
            ))),
            Err(_) => Err(TransformError::transport(format!(
                "publish to '{topic}' not acknowledged within {:?}",
                self.connect_timeout
            ))),
        }
    }

    async fn disconnect(&self) {
        if let Some(session) = self.session.lock().await.take() {
            if let Err(e) = session.client.disconnect().await {
                tracing::debug!(error = %e, "mqtt disconnect request failed");
            }
            session.end("client disconnected");
        }
        self.connected.store(false, Ordering::Release);
    }
}

impl Drop for RumqttClient {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.end("client dropped");
        }
    }
}

/// Poll the event loop until it fails for good
///
/// The first ConnAck, or the first error, is reported through `ready`.
/// Publish writes and acknowledgements are reported to `tracker`.
async fn drive_event_loop(
    mut eventloop: EventLoop,
    connected: Arc<AtomicBool>,
    tracker: Arc<PublishTracker>,
    auto_reconnect: bool,
    ready: oneshot::Sender<Result<(), String>>,
) {
    let mut ready = Some(ready);
    loop {
        match eventloop.poll().await {
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => tracker.on_outgoing(pkid),
            Ok(Event::Incoming(Packet::PubAck(ack))) => tracker.on_acknowledged(ack.pkid),
            Ok(Event::Incoming(Packet::PubComp(comp))) => tracker.on_acknowledged(comp.pkid),
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    connected.store(true, Ordering::Release);
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Ok(()));
                    } else {
                        tracing::info!("reconnected to mqtt broker");
                    }
                } else {
                    connected.store(false, Ordering::Release);
                    let reason = format!("broker refused connection: {:?}", ack.code);
                    match ready.take() {
                        Some(tx) => {
                            let _ = tx.send(Err(reason));
                            return;
                        }
                        None => tracing::warn!(%reason, "mqtt reconnect refused"),
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                connected.store(false, Ordering::Release);
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Err(e.to_string()));
                    return;
                }
                let failed = tracker.on_connection_lost(&e.to_string(), auto_reconnect);
                if failed > 0 {
                    tracing::warn!(failed, "mqtt publishes failed with the connection");
                }
                if !auto_reconnect {
                    tracing::warn!(error = %e, "mqtt connection lost");
                    return;
                }
                tracing::warn!(error = %e, "mqtt connection lost, reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}
