//! HTTP Trigger - REST endpoint feeding the dispatcher
//!
//! # Endpoints
//!
//! - `POST /api/v1/trigger` - Dispatch the body on the configured topic
//! - `POST /api/v1/trigger/{topic}` - Dispatch the body on `{topic}` (may contain `/`)
//! - `GET /api/v1/ping` - Liveness check
//!
//! # Request
//!
//! ```text
//! POST /api/v1/trigger/events/device/X
//! Content-Type: application/json
//! X-Correlation-ID: 7f0c...
//!
//! {"deviceName":"X", ...}
//! ```
//!
//! # Response
//!
//! - `200` with the first pipeline response and its content type
//! - `204` when no pipeline produced a response
//! - `500` when every matched pipeline failed
//!
//! The correlation id (generated when absent) is echoed in `X-Correlation-ID`.

mod handlers;


use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::routing::{get, post};
use edgeflow_config::HttpTriggerConfig;
use edgeflow_pipeline::{BackgroundMessage, Dispatcher};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use handlers::CORRELATION_ID_HEADER;

use handlers::{HandlerState, ping, trigger_default_topic, trigger_topic};

use crate::common::{TriggerMetrics, TriggerSnapshot};
use crate::{Result, Trigger, TriggerError, TriggerHandle};

/// HTTP trigger
pub struct HttpTrigger {
    config: HttpTriggerConfig,
    dispatcher: Dispatcher,
    metrics: Arc<TriggerMetrics>,
}

impl HttpTrigger {
    pub fn new(config: HttpTriggerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher,
            metrics: Arc::new(TriggerMetrics::new()),
        }
    }

    pub fn metrics(&self) -> TriggerSnapshot {
        self.metrics.snapshot()
    }

    /// Shared metrics, valid after `initialize` consumes the trigger
    pub fn metrics_handle(&self) -> Arc<TriggerMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[async_trait]
impl Trigger for HttpTrigger {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn initialize(
        self: Box<Self>,
        shutdown: CancellationToken,
        background: mpsc::Receiver<BackgroundMessage>,
    ) -> Result<TriggerHandle> {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| TriggerError::Bind {
                address: bind_addr.clone(),
                source: e,
            })?;

        tracing::info!(
            address = %bind_addr,
            topic = %self.config.topic,
            "http trigger listening"
        );

        let state = Arc::new(HandlerState {
            dispatcher: self.dispatcher.clone(),
            default_topic: self.config.topic.clone(),
            metrics: Arc::clone(&self.metrics),
        });
        let app = build_router(state);

        tokio::spawn(drain_background(background, shutdown.clone()));

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .map_err(|e| TriggerError::Http(e.to_string()))?;
            tracing::info!("http trigger stopped");
            Ok(())
        });

        Ok(TriggerHandle::new("http", task))
    }
}

/// Build the axum router
fn build_router(state: Arc<HandlerState>) -> Router {
    Router::new()
        .route("/api/v1/trigger", post(trigger_default_topic))
        .route("/api/v1/trigger/{*topic}", post(trigger_topic))
        .route("/api/v1/ping", get(ping))
        .with_state(state)
}

/// HTTP has no outbound channel; background messages are dropped
async fn drain_background(
    mut background: mpsc::Receiver<BackgroundMessage>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            message = background.recv() => match message {
                Some(message) => tracing::warn!(
                    topic = ?message.topic,
                    correlation_id = %message.envelope.correlation_id(),
                    "http trigger cannot publish background messages, dropping"
                ),
                None => break,
            },
        }
    }
}
