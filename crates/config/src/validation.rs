//! Configuration validation
//!
//! Validates config consistency:
//! - Function types are known and their required options are present
//! - Duration options parse
//! - Pipelines are non-empty and reference declared functions
//! - The selected trigger has usable settings

use crate::broker::BrokerUrl;
use crate::error::{ConfigError, Result};
use crate::functions::{DURATION_OPTION_KEYS, FunctionConfig, is_known_function_type};
use crate::pipelines::DEFAULT_PIPELINE_ID;
use crate::trigger::TriggerType;
use crate::Config;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_functions(config)?;
    validate_pipelines(config)?;
    validate_trigger(config)?;
    Ok(())
}

/// Validate function instances
fn validate_functions(config: &Config) -> Result<()> {
    for (name, function) in &config.functions {
        if !is_known_function_type(&function.function_type) {
            return Err(ConfigError::unknown_function_type(
                name,
                &function.function_type,
            ));
        }

        for key in DURATION_OPTION_KEYS {
            if let Err(message) = function.get_duration(key) {
                return Err(ConfigError::invalid_value("function", name, *key, message));
            }
        }

        validate_function_options(name, function)?;
    }
    Ok(())
}

/// Type-specific required options
fn validate_function_options(name: &str, function: &FunctionConfig) -> Result<()> {
    let require = |field: &'static str| -> Result<()> {
        match function.get_str(field) {
            Some(v) if !v.is_empty() => Ok(()),
            _ => Err(ConfigError::missing_field("function", name, field)),
        }
    };

    match function.function_type.as_str() {
        "filter_by_device_name"
        | "filter_by_profile_name"
        | "filter_by_source_name"
        | "filter_by_resource_name" => {
            if function.get_list("names").is_none() {
                return Err(ConfigError::missing_field("function", name, "names"));
            }
            if let Some(mode) = function.get_str("mode")
                && mode != "include"
                && mode != "exclude"
            {
                return Err(ConfigError::invalid_value(
                    "function",
                    name,
                    "mode",
                    "must be 'include' or 'exclude'",
                ));
            }
        }
        "encrypt_aes256" => {
            require("secret_path")?;
            require("secret_name")?;
        }
        "mqtt_export" => {
            require("broker_address")?;
            require("topic")?;
            if let Some(url) = function.get_str("broker_address") {
                validate_broker_url("function", name, "broker_address", url)?;
            }
            if let Some(qos) = function.get_int("qos")
                && !(0..=2).contains(&qos)
            {
                return Err(ConfigError::invalid_value(
                    "function",
                    name,
                    "qos",
                    "must be 0, 1 or 2",
                ));
            }
        }
        "batch_by_count" | "batch_by_time_and_count" | "batch_by_time" => {
            let needs_count = function.function_type != "batch_by_time";
            let needs_time = function.function_type != "batch_by_count";
            if needs_count {
                match function.get_int("batch_threshold") {
                    None => {
                        return Err(ConfigError::missing_field("function", name, "batch_threshold"));
                    }
                    Some(n) if n <= 0 => {
                        return Err(ConfigError::invalid_value(
                            "function",
                            name,
                            "batch_threshold",
                            "must be greater than zero",
                        ));
                    }
                    Some(_) => {}
                }
            }
            if needs_time {
                match function.get_duration("time_interval") {
                    Ok(Some(d)) if !d.is_zero() => {}
                    Ok(Some(_)) => {
                        return Err(ConfigError::invalid_value(
                            "function",
                            name,
                            "time_interval",
                            "must be greater than zero",
                        ));
                    }
                    _ => return Err(ConfigError::missing_field("function", name, "time_interval")),
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Validate pipeline wiring
fn validate_pipelines(config: &Config) -> Result<()> {
    let pipelines = &config.pipelines;
    if pipelines.is_empty() {
        return Err(ConfigError::NoPipelines);
    }

    for (id, pipeline) in &pipelines.per_topic {
        if id.is_empty() {
            return Err(ConfigError::invalid_value(
                "pipeline",
                id,
                "id",
                "must not be empty",
            ));
        }
        if id == DEFAULT_PIPELINE_ID {
            return Err(ConfigError::DuplicatePipeline {
                pipeline: id.clone(),
            });
        }
        if pipeline.topics.is_empty() {
            return Err(ConfigError::invalid_value(
                "pipeline",
                id,
                "topics",
                "at least one topic must be specified",
            ));
        }
        if pipeline.functions.is_empty() {
            return Err(ConfigError::empty_pipeline(id));
        }
    }

    for (id, functions) in pipelines.iter_functions() {
        for function in functions {
            if !config.functions.contains_key(function) {
                return Err(ConfigError::unknown_function(id, function));
            }
        }
    }

    Ok(())
}

/// Validate the selected trigger
fn validate_trigger(config: &Config) -> Result<()> {
    match config.trigger.trigger_type {
        TriggerType::Http => {
            if config.trigger.http.port == 0 {
                return Err(ConfigError::invalid_value(
                    "trigger",
                    "http",
                    "port",
                    "must be non-zero",
                ));
            }
        }
        TriggerType::Mqtt => {
            let mqtt = &config.trigger.mqtt;
            validate_broker_url("trigger", "mqtt", "broker_url", &mqtt.broker_url)?;
            if mqtt.subscribe_topics.is_empty() {
                return Err(ConfigError::missing_field(
                    "trigger",
                    "mqtt",
                    "subscribe_topics",
                ));
            }
            if mqtt.qos > 2 {
                return Err(ConfigError::invalid_value(
                    "trigger",
                    "mqtt",
                    "qos",
                    "must be 0, 1 or 2",
                ));
            }
        }
        TriggerType::Custom => {}
    }
    Ok(())
}

fn validate_broker_url(
    component: &'static str,
    name: &str,
    field: &'static str,
    url: &str,
) -> Result<()> {
    BrokerUrl::parse(url)
        .map(|_| ())
        .map_err(|e| ConfigError::invalid_value(component, name, field, e.to_string()))
}

#[cfg(test)]
mod tests {
    use crate::{Config, ConfigError};
    use std::str::FromStr;

    const RESPONSE: &str = r#"
[functions.response]
type = "set_response_data"
"#;

    fn parse(extra: &str) -> Result<Config, ConfigError> {
        Config::from_str(&format!("{RESPONSE}\n{extra}"))
    }

    #[test]
    fn test_valid_minimal_config() {
        let config = parse("[pipelines]\ndefault = [\"response\"]").unwrap();
        assert_eq!(config.pipelines.default, vec!["response"]);
    }

    #[test]
    fn test_no_pipelines() {
        assert!(matches!(parse(""), Err(ConfigError::NoPipelines)));
    }

    #[test]
    fn test_unknown_function_reference() {
        let result = parse("[pipelines]\ndefault = [\"response\", \"missing\"]");
        assert!(matches!(
            result,
            Err(ConfigError::UnknownFunction { ref function, .. }) if function == "missing"
        ));
    }

    #[test]
    fn test_unknown_function_type() {
        let result = parse(
            r#"
[functions.zip]
type = "compress_brotli"

[pipelines]
default = ["zip"]
"#,
        );
        assert!(matches!(result, Err(ConfigError::UnknownFunctionType { .. })));
    }

    #[test]
    fn test_empty_per_topic_functions() {
        let result = parse(
            r#"
[pipelines.per_topic.p1]
topics = ["a"]
functions = []
"#,
        );
        assert!(matches!(result, Err(ConfigError::EmptyPipeline { .. })));
    }

    #[test]
    fn test_empty_per_topic_topics() {
        let result = parse(
            r#"
[pipelines.per_topic.p1]
topics = []
functions = ["response"]
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue { ref field, .. }) if field == "topics"));
    }

    #[test]
    fn test_per_topic_cannot_shadow_default_id() {
        let result = parse(
            r#"
[pipelines.per_topic.default-pipeline]
topics = ["a"]
functions = ["response"]
"#,
        );
        assert!(matches!(result, Err(ConfigError::DuplicatePipeline { .. })));
    }

    #[test]
    fn test_invalid_duration() {
        let result = parse(
            r#"
[functions.batch]
type = "batch_by_time"
time_interval = "eventually"

[pipelines]
default = ["batch"]
"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "time_interval"
        ));
    }

    #[test]
    fn test_batch_requires_threshold() {
        let result = parse(
            r#"
[functions.batch]
type = "batch_by_count"

[pipelines]
default = ["batch"]
"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::MissingField { field: "batch_threshold", .. })
        ));
    }

    #[test]
    fn test_batch_zero_threshold() {
        let result = parse(
            r#"
[functions.batch]
type = "batch_by_time_and_count"
batch_threshold = 0
time_interval = "1s"

[pipelines]
default = ["batch"]
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_encrypt_requires_secret_name() {
        let result = parse(
            r#"
[functions.encrypt]
type = "encrypt_aes256"
secret_path = "aes"

[pipelines]
default = ["encrypt"]
"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::MissingField { field: "secret_name", .. })
        ));
    }

    #[test]
    fn test_mqtt_export_bad_scheme() {
        let result = parse(
            r#"
[functions.export]
type = "mqtt_export"
broker_address = "http://broker:1883"
topic = "out"

[pipelines]
default = ["export"]
"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "broker_address"
        ));
    }

    #[test]
    fn test_filter_requires_names() {
        let result = parse(
            r#"
[functions.only_x]
type = "filter_by_device_name"

[pipelines]
default = ["only_x"]
"#,
        );
        assert!(matches!(result, Err(ConfigError::MissingField { field: "names", .. })));
    }

    #[test]
    fn test_filter_bad_mode() {
        let result = parse(
            r#"
[functions.only_x]
type = "filter_by_device_name"
names = ["X"]
mode = "sometimes"

[pipelines]
default = ["only_x"]
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_mqtt_trigger_requires_subscriptions() {
        let result = parse(
            r#"
[trigger]
type = "mqtt"

[pipelines]
default = ["response"]
"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::MissingField { field: "subscribe_topics", .. })
        ));
    }

    #[test]
    fn test_mqtt_trigger_valid() {
        let result = parse(
            r#"
[trigger]
type = "mqtt"

[trigger.mqtt]
broker_url = "tcps://broker:8883"
subscribe_topics = ["events/#"]

[pipelines]
default = ["response"]
"#,
        );
        assert!(result.is_ok());
    }
}
