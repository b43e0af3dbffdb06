//! MQTT egress
//!
//! - `config` - Broker URL, auth mode and export settings
//! - `credentials` - Secret-store lookup per auth mode
//! - `tls` - rustls transport from PEM material
//! - `acks` - Pairs published messages with broker acknowledgements
//! - `client` - Client seam, rumqttc implementation and factory
//! - `sender` - The `mqtt_export` pipeline function

mod acks;
mod client;
mod config;
mod credentials;
mod sender;
mod tls;

pub use client::{ClientFactory, MqttClient, RumqttClient, SecretClientFactory, build_mqtt_options};
pub use config::{
    AuthMode, BrokerUrl, DEFAULT_TCP_PORT, DEFAULT_TLS_PORT, MqttConnectionConfig,
    MqttExportConfig, parse_broker_url, qos_from_level,
};
pub use credentials::{
    ClientCredentials, SECRET_CA_CERT, SECRET_CLIENT_CERT, SECRET_CLIENT_KEY, SECRET_PASSWORD,
    SECRET_USERNAME, load_credentials,
};
pub use sender::{
    MqttSecretSender, MqttSenderFactory, SenderMetrics, SenderMetricsSnapshot, TopicFormatter,
};
pub use tls::{parse_ca_pool, parse_client_identity, tls_transport};
