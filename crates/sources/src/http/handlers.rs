//! HTTP route handlers

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use edgeflow_pipeline::{Dispatcher, ResponseCollector};
use edgeflow_protocol::{CONTENT_TYPE_JSON, MessageEnvelope};
use uuid::Uuid;

use crate::common::TriggerMetrics;

/// Correlation id request and response header
pub const CORRELATION_ID_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

/// Shared state for handlers
pub struct HandlerState {
    pub dispatcher: Dispatcher,
    pub default_topic: String,
    pub metrics: Arc<TriggerMetrics>,
}

/// POST /api/v1/trigger
pub async fn trigger_default_topic(
    State(state): State<Arc<HandlerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let topic = state.default_topic.clone();
    dispatch(&state, topic, &headers, body).await
}

/// POST /api/v1/trigger/{topic}
pub async fn trigger_topic(
    State(state): State<Arc<HandlerState>>,
    Path(topic): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(&state, topic, &headers, body).await
}

/// GET /api/v1/ping
pub async fn ping() -> &'static str {
    "pong"
}

async fn dispatch(state: &HandlerState, topic: String, headers: &HeaderMap, body: Bytes) -> Response {
    let correlation_id = header_str(headers, &CORRELATION_ID_HEADER)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let content_type = header_str(headers, &CONTENT_TYPE).unwrap_or(CONTENT_TYPE_JSON);

    state.metrics.envelope_received(body.len() as u64);
    let envelope = MessageEnvelope::new(topic, body)
        .with_correlation_id(correlation_id.clone())
        .with_content_type(content_type);

    let collector = Arc::new(ResponseCollector::new());
    let summary = state
        .dispatcher
        .message_received(envelope, collector.clone())
        .await;

    let mut response = if summary.all_failed() {
        state.metrics.error();
        (StatusCode::INTERNAL_SERVER_ERROR, "pipeline execution failed").into_response()
    } else {
        match collector.take().into_iter().next() {
            Some(first) => {
                state.metrics.response_sent();
                let mut response = (StatusCode::OK, first.data).into_response();
                if let Some(value) = first
                    .content_type
                    .and_then(|ct| HeaderValue::from_str(&ct).ok())
                {
                    response.headers_mut().insert(CONTENT_TYPE, value);
                }
                response
            }
            None => StatusCode::NO_CONTENT.into_response(),
        }
    };

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
