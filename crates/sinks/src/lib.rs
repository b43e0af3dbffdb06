//! Edgeflow - Sinks
//!
//! Outbound delivery for pipeline output. Today that is MQTT: a
//! secret-backed client factory and the `mqtt_export` pipeline function.
//!
//! ```text
//! [Pipeline] → mqtt_export → [Secret store] → [rumqttc client] → [Broker]
//! ```
//!
//! # Example
//!
//! ```ignore
//! let registry = edgeflow_sinks::create_default_registry();
//! let export = registry.create(&function_config)?;
//! ```

pub mod mqtt;

pub use mqtt::{MqttSecretSender, MqttSenderFactory};

use edgeflow_transform::FunctionRegistry;

/// Every built-in function type, including `mqtt_export`
pub fn create_default_registry() -> FunctionRegistry {
    let mut registry = edgeflow_transform::create_default_registry();
    registry.register("mqtt_export", MqttSenderFactory::default());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgeflow_config::KNOWN_FUNCTION_TYPES;

    #[test]
    fn test_registry_covers_every_known_type() {
        let registry = create_default_registry();
        assert_eq!(registry.len(), KNOWN_FUNCTION_TYPES.len());
        for function_type in KNOWN_FUNCTION_TYPES {
            assert!(registry.contains(function_type), "missing {function_type}");
        }
    }
}
