//! Global configuration settings

use serde::Deserialize;
use std::time::Duration;

/// Settings shared by the trigger, dispatcher and shutdown logic
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Capacity of the background publish channel
    /// Default: 1000
    pub queue_size: usize,

    /// How long to wait for the trigger to drain on shutdown
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            queue_size: 1000,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GlobalConfig::default();
        assert_eq!(config.queue_size, 1000);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_deserialize_empty() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.queue_size, 1000);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
queue_size = 64
shutdown_timeout = "2s 500ms"
"#;
        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.queue_size, 64);
        assert_eq!(config.shutdown_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_deserialize_bad_duration() {
        let result = toml::from_str::<GlobalConfig>("shutdown_timeout = \"soon\"");
        assert!(result.is_err());
    }
}
