//! MQTT broker URLs
//!
//! `scheme://[user[:password]@]host[:port][/path][?query]`. Only the scheme,
//! host and port are used; credentials come from the secret store, so any
//! userinfo in the URL is ignored.

use std::fmt;

use thiserror::Error;
use url::{Host, Url};

/// Broker URL schemes accepted for MQTT connections
pub const BROKER_SCHEMES: &[&str] = &["tcp", "ssl", "tls", "tcps", "mqtts"];

/// Default port for plain `tcp://` brokers
pub const DEFAULT_TCP_PORT: u16 = 1883;

/// Default port for TLS brokers
pub const DEFAULT_TLS_PORT: u16 = 8883;

/// Broker URL that could not be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid broker url '{url}': {reason}")]
pub struct BrokerUrlError {
    pub url: String,
    pub reason: String,
}

/// Parsed broker URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerUrl {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl BrokerUrl {
    pub fn parse(input: &str) -> Result<Self, BrokerUrlError> {
        let invalid = |reason: String| BrokerUrlError {
            url: input.to_string(),
            reason,
        };

        let url = Url::parse(input.trim()).map_err(|e| invalid(e.to_string()))?;

        let scheme = url.scheme();
        if !BROKER_SCHEMES.contains(&scheme) {
            return Err(invalid(format!(
                "scheme must be one of: {}",
                BROKER_SCHEMES.join(", ")
            )));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => return Err(invalid("missing host".to_string())),
        };

        let default_port = if scheme == "tcp" {
            DEFAULT_TCP_PORT
        } else {
            DEFAULT_TLS_PORT
        };
        let port = match url.port() {
            Some(0) => return Err(invalid("port must not be 0".to_string())),
            Some(port) => port,
            None => default_port,
        };

        Ok(Self {
            scheme: scheme.to_string(),
            host,
            port,
        })
    }

    /// Whether the scheme requires TLS
    pub fn is_tls(&self) -> bool {
        self.scheme != "tcp"
    }
}

impl fmt::Display for BrokerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}
