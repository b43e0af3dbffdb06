//! Trigger configuration
//!
//! The trigger is the single source of envelopes for the service.
//!
//! # Example
//!
//! ```toml
//! [trigger]
//! type = "mqtt"
//!
//! [trigger.mqtt]
//! broker_url = "tcp://localhost:1883"
//! subscribe_topics = ["events/#"]
//! publish_topic = "processed/{devicename}"
//! ```

use serde::Deserialize;
use std::time::Duration;

/// Kind of trigger
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    /// HTTP POST endpoint
    #[default]
    Http,
    /// MQTT message bus subscriber
    Mqtt,
    /// In-process channel, wired by the embedding application
    Custom,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Mqtt => "mqtt",
            Self::Custom => "custom",
        }
    }
}

/// Trigger configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,

    pub http: HttpTriggerConfig,

    pub mqtt: MqttTriggerConfig,
}

/// HTTP trigger settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpTriggerConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 59700
    pub port: u16,

    /// Topic assigned to envelopes posted without a topic path segment
    /// Default: "http"
    pub topic: String,
}

impl Default for HttpTriggerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 59700,
            topic: "http".into(),
        }
    }
}

impl HttpTriggerConfig {
    /// `address:port` for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// MQTT trigger settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttTriggerConfig {
    /// Broker URL (`tcp://`, `ssl://`, `tls://`, `tcps://`, `mqtts://`)
    /// Default: "tcp://localhost:1883"
    pub broker_url: String,

    /// Client id
    /// Default: "edgeflow-trigger"
    pub client_id: String,

    /// Topics to subscribe to
    pub subscribe_topics: Vec<String>,

    /// Topic for pipeline responses, may contain `{name}` placeholders
    /// If unset, responses are dropped
    pub publish_topic: Option<String>,

    /// QoS for subscribe and publish (0, 1, 2)
    pub qos: u8,

    /// Retain flag on response publishes
    pub retain: bool,

    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub keep_alive: Duration,

    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// `none`, `usernamepassword`, `clientcert`, `cacert`
    pub auth_mode: String,

    /// Secret path holding credentials for `auth_mode`
    pub secret_path: String,

    /// Skip server certificate verification
    pub skip_verify: bool,
}

impl Default for MqttTriggerConfig {
    fn default() -> Self {
        Self {
            broker_url: "tcp://localhost:1883".into(),
            client_id: "edgeflow-trigger".into(),
            subscribe_topics: Vec::new(),
            publish_topic: None,
            qos: 0,
            retain: false,
            keep_alive: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            auth_mode: "none".into(),
            secret_path: String::new(),
            skip_verify: false,
        }
    }
}
