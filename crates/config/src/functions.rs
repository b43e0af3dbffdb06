//! Pipeline function configuration
//!
//! Each named function instance has a type plus type-specific options. The
//! same instance may appear in several pipelines; it is built once and shared.
//!
//! # Example
//!
//! ```toml
//! [functions.only_x]
//! type = "filter_by_device_name"
//! names = ["X"]
//!
//! [functions.batch]
//! type = "batch_by_time_and_count"
//! batch_threshold = 30
//! time_interval = "60s"
//! merge_on_send = true
//!
//! [functions.export]
//! type = "mqtt_export"
//! broker_address = "tcps://broker:8883"
//! topic = "edge/{devicename}"
//! secret_path = "mqtt"
//! auth_mode = "usernamepassword"
//! ```

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Configuration for a single function instance
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionConfig {
    /// Function type (e.g., "to_xml", "mqtt_export")
    #[serde(rename = "type")]
    pub function_type: String,

    /// Type-specific options, handed to the function factory
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

impl FunctionConfig {
    /// Create a config with no options
    pub fn new(function_type: impl Into<String>) -> Self {
        Self {
            function_type: function_type.into(),
            options: HashMap::new(),
        }
    }

    /// Builder-style option setter, mostly for tests and programmatic wiring
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Get an array option as Vec<String>
    pub fn get_string_array(&self, key: &str) -> Option<Vec<String>> {
        self.options.get(key).and_then(|v| {
            v.as_array().map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
        })
    }

    /// Get a string list that may be written as an array or a comma-separated string
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        if let Some(s) = self.get_str(key) {
            return Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            );
        }
        self.get_string_array(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.options.get(key).and_then(|v| v.as_integer())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }

    /// Get a table option with its values kept as TOML values
    pub fn get_table(&self, key: &str) -> Option<BTreeMap<String, toml::Value>> {
        self.options.get(key).and_then(|v| {
            v.as_table()
                .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        })
    }

    /// Get a humantime duration option (`"500ms"`, `"1m 30s"`)
    ///
    /// Returns `Ok(None)` when absent and an error message when the value is
    /// not a string or does not parse.
    pub fn get_duration(&self, key: &str) -> Result<Option<Duration>, String> {
        match self.options.get(key) {
            None => Ok(None),
            Some(toml::Value::String(s)) => humantime::parse_duration(s)
                .map(Some)
                .map_err(|e| e.to_string()),
            Some(other) => Err(format!("expected a duration string, got {}", other.type_str())),
        }
    }
}

/// Function types understood by the default registry
pub const KNOWN_FUNCTION_TYPES: &[&str] = &[
    "filter_by_device_name",
    "filter_by_profile_name",
    "filter_by_source_name",
    "filter_by_resource_name",
    "to_json",
    "to_xml",
    "add_tags",
    "compress_gzip",
    "compress_zlib",
    "encrypt_aes256",
    "batch_by_count",
    "batch_by_time",
    "batch_by_time_and_count",
    "set_response_data",
    "mqtt_export",
];

/// Option keys that carry durations and are checked at load time
pub const DURATION_OPTION_KEYS: &[&str] = &["time_interval", "keep_alive", "connect_timeout"];

/// Check if a function type is known
pub fn is_known_function_type(function_type: &str) -> bool {
    KNOWN_FUNCTION_TYPES.contains(&function_type)
}
