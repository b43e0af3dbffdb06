//! MQTT connection and export settings
//!
//! Settings come from a `[functions.<name>]` table of type `mqtt_export` or
//! from the `[trigger.mqtt]` section. Both share [`MqttConnectionConfig`].

use std::fmt;
use std::time::Duration;

pub use edgeflow_config::{BrokerUrl, DEFAULT_TCP_PORT, DEFAULT_TLS_PORT};

use edgeflow_config::{FunctionConfig, MqttTriggerConfig};
use edgeflow_transform::{TransformError, TransformResult};
use rumqttc::QoS;

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

const DEFAULT_EXPORT_CLIENT_ID: &str = "edgeflow-export";
const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How the client authenticates to the broker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// No credentials; an optional `cacert` is still honoured
    #[default]
    None,
    /// `username` and `password` secrets
    UsernamePassword,
    /// `clientcert` and `clientkey` PEM secrets
    ClientCert,
    /// `cacert` PEM secret only
    CaCert,
}

impl AuthMode {
    /// Parse an auth mode name, case-insensitively
    ///
    /// An empty name means [`AuthMode::None`].
    pub fn parse(mode: &str) -> TransformResult<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "" => {
                tracing::warn!("mqtt auth mode not set, defaulting to 'none'");
                Ok(Self::None)
            }
            "none" => Ok(Self::None),
            "usernamepassword" => Ok(Self::UsernamePassword),
            "clientcert" => Ok(Self::ClientCert),
            "cacert" => Ok(Self::CaCert),
            other => Err(TransformError::config(format!(
                "invalid mqtt auth mode '{other}', expected one of: none, usernamepassword, clientcert, cacert"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::UsernamePassword => "usernamepassword",
            Self::ClientCert => "clientcert",
            Self::CaCert => "cacert",
        }
    }

    /// Whether this mode reads anything from the secret store
    pub fn needs_secrets(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a broker URL, reporting failures as configuration errors
pub fn parse_broker_url(url: &str) -> TransformResult<BrokerUrl> {
    BrokerUrl::parse(url).map_err(|e| TransformError::config(e.to_string()))
}

/// Map a config QoS level to the client's
pub fn qos_from_level(level: i64) -> TransformResult<QoS> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(TransformError::config(format!(
            "invalid mqtt qos {other}, must be 0, 1 or 2"
        ))),
    }
}

/// Everything needed to open a broker connection
#[derive(Debug, Clone)]
pub struct MqttConnectionConfig {
    pub broker: BrokerUrl,
    pub client_id: String,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
    pub auth_mode: AuthMode,
    pub secret_path: String,
    pub skip_verify: bool,
}

impl MqttConnectionConfig {
    /// Plain connection to `broker` with default settings
    pub fn new(broker: BrokerUrl, client_id: impl Into<String>) -> Self {
        Self {
            broker,
            client_id: client_id.into(),
            keep_alive: DEFAULT_KEEP_ALIVE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            auth_mode: AuthMode::None,
            secret_path: String::new(),
            skip_verify: false,
        }
    }

    /// Settings for the message-bus trigger
    pub fn from_trigger(trigger: &MqttTriggerConfig) -> TransformResult<Self> {
        let config = Self {
            broker: parse_broker_url(&trigger.broker_url)?,
            client_id: trigger.client_id.clone(),
            keep_alive: trigger.keep_alive,
            connect_timeout: trigger.connect_timeout,
            auth_mode: AuthMode::parse(&trigger.auth_mode)?,
            secret_path: trigger.secret_path.clone(),
            skip_verify: trigger.skip_verify,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> TransformResult<()> {
        if self.auth_mode.needs_secrets() && self.secret_path.is_empty() {
            return Err(TransformError::config(format!(
                "mqtt auth mode '{}' requires 'secret_path'",
                self.auth_mode
            )));
        }
        Ok(())
    }
}

/// Settings of one `mqtt_export` function
#[derive(Debug, Clone)]
pub struct MqttExportConfig {
    pub connection: MqttConnectionConfig,
    /// Publish topic, may contain `{name}` placeholders
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
    pub auto_reconnect: bool,
    /// Hand failed payloads to the retry store
    pub persist_on_error: bool,
}

impl MqttExportConfig {
    pub fn new(connection: MqttConnectionConfig, topic: impl Into<String>) -> Self {
        Self {
            connection,
            topic: topic.into(),
            qos: QoS::AtMostOnce,
            retain: false,
            auto_reconnect: false,
            persist_on_error: false,
        }
    }

    /// Read the options of an `mqtt_export` function
    ///
    /// ```toml
    /// [functions.export]
    /// type = "mqtt_export"
    /// broker_address = "ssl://broker:8883"
    /// topic = "edge/{devicename}"
    /// client_id = "gateway-7"
    /// qos = 1
    /// auth_mode = "usernamepassword"
    /// secret_path = "mqtt"
    /// persist_on_error = true
    /// ```
    pub fn from_function(config: &FunctionConfig) -> TransformResult<Self> {
        let broker_address = required(config, "broker_address")?;
        let topic = required(config, "topic")?;

        let duration = |key: &str, default: Duration| -> TransformResult<Duration> {
            config
                .get_duration(key)
                .map(|d| d.unwrap_or(default))
                .map_err(|e| TransformError::config(format!("mqtt_export: {e}")))
        };

        let connection = MqttConnectionConfig {
            broker: parse_broker_url(broker_address)?,
            client_id: config
                .get_str("client_id")
                .filter(|id| !id.is_empty())
                .unwrap_or(DEFAULT_EXPORT_CLIENT_ID)
                .to_string(),
            keep_alive: duration("keep_alive", DEFAULT_KEEP_ALIVE)?,
            connect_timeout: duration("connect_timeout", DEFAULT_CONNECT_TIMEOUT)?,
            auth_mode: AuthMode::parse(config.get_str("auth_mode").unwrap_or("none"))?,
            secret_path: config.get_str("secret_path").unwrap_or_default().to_string(),
            skip_verify: config.get_bool("skip_verify").unwrap_or(false),
        };
        connection.validate()?;

        Ok(Self {
            connection,
            topic: topic.to_string(),
            qos: qos_from_level(config.get_int("qos").unwrap_or(0))?,
            retain: config.get_bool("retain").unwrap_or(false),
            auto_reconnect: config.get_bool("auto_reconnect").unwrap_or(false),
            persist_on_error: config.get_bool("persist_on_error").unwrap_or(false),
        })
    }
}

fn required<'a>(config: &'a FunctionConfig, key: &str) -> TransformResult<&'a str> {
    match config.get_str(key) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(TransformError::config(format!(
            "mqtt_export: missing required option '{key}'"
        ))),
    }
}
