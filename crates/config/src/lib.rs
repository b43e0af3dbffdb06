//! Edgeflow Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Only the function instances and pipeline wiring are required.
//!
//! # Parsing
//!
//! ```
//! use edgeflow_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str(r#"
//! [functions.xml]
//! type = "to_xml"
//!
//! [pipelines]
//! default = ["xml"]
//! "#).unwrap();
//! assert_eq!(config.pipelines.default, vec!["xml"]);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [global]
//! shutdown_timeout = "5s"
//!
//! [log]
//! level = "debug"
//!
//! [trigger]
//! type = "http"
//!
//! [secrets.aes]
//! key = "..."
//!
//! [functions.xml]
//! type = "to_xml"
//!
//! [functions.response]
//! type = "set_response_data"
//!
//! [pipelines]
//! default = ["xml", "response"]
//! ```

mod broker;
mod error;
mod functions;
mod global;
mod logging;
mod pipelines;
mod secrets;
mod trigger;
mod validation;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use broker::{BROKER_SCHEMES, BrokerUrl, BrokerUrlError, DEFAULT_TCP_PORT, DEFAULT_TLS_PORT};
pub use error::{ConfigError, Result};
pub use functions::{
    is_known_function_type, FunctionConfig, DURATION_OPTION_KEYS, KNOWN_FUNCTION_TYPES,
};
pub use global::GlobalConfig;
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use pipelines::{PipelinesConfig, TopicPipelineConfig, DEFAULT_PIPELINE_ID};
pub use secrets::SecretsConfig;
pub use trigger::{HttpTriggerConfig, MqttTriggerConfig, TriggerConfig, TriggerType};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults; validation requires at
/// least one pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global settings (queue sizes, shutdown timeout)
    pub global: GlobalConfig,

    /// Logging configuration
    pub log: LogConfig,

    /// Envelope source
    pub trigger: TriggerConfig,

    /// Insecure secrets seeded into the in-memory store
    pub secrets: SecretsConfig,

    /// Named function instances
    pub functions: BTreeMap<String, FunctionConfig>,

    /// Pipeline wiring
    pub pipelines: PipelinesConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
