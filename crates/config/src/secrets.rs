//! Insecure secrets
//!
//! Secrets declared in the config file are loaded into the in-memory secret
//! store at boot. Intended for development and for deployments where the
//! config file itself is protected.
//!
//! ```toml
//! [secrets.mqtt]
//! username = "edge"
//! password = "hunter2"
//!
//! [secrets.aes]
//! key = "000102...3f"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;

/// Secret values grouped by path
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SecretsConfig(BTreeMap<String, BTreeMap<String, String>>);

impl SecretsConfig {
    /// Secrets under one path
    pub fn get(&self, path: &str) -> Option<&BTreeMap<String, String>> {
        self.0.get(path)
    }

    /// Iterate `(path, secrets)`
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, String>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_paths() {
        let toml = r#"
[mqtt]
username = "edge"
password = "pw"

[aes]
key = "abcd"
"#;
        let config: SecretsConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.iter().count(), 2);
        let mqtt = config.get("mqtt").unwrap();
        assert_eq!(mqtt.get("username").map(String::as_str), Some("edge"));
        assert!(config.get("missing").is_none());
    }

    #[test]
    fn test_non_string_value_rejected() {
        assert!(toml::from_str::<SecretsConfig>("[mqtt]\nport = 1883").is_err());
    }
}
