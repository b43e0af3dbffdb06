//! Device event model
//!
//! An `Event` is a set of readings taken by one device for one source at one
//! point in time. JSON uses camelCase field names; XML uses PascalCase element
//! names under an `<Event>` root.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ProtocolError, Result};

/// Well-known reading value types
pub struct ValueType;

impl ValueType {
    pub const BOOL: &'static str = "Bool";
    pub const STRING: &'static str = "String";
    pub const INT32: &'static str = "Int32";
    pub const INT64: &'static str = "Int64";
    pub const FLOAT32: &'static str = "Float32";
    pub const FLOAT64: &'static str = "Float64";
    pub const BINARY: &'static str = "Binary";
    pub const OBJECT: &'static str = "Object";
}

/// A single sensor reading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reading {
    pub id: String,
    pub origin: i64,
    pub device_name: String,
    pub resource_name: String,
    pub profile_name: String,
    pub value_type: String,
    pub value: String,

    /// Base64-encoded bytes for `Binary` readings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_value: Option<serde_json::Value>,
}

/// Device telemetry event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub id: String,
    pub device_name: String,
    pub profile_name: String,
    pub source_name: String,
    pub origin: i64,
    pub readings: Vec<Reading>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, serde_json::Value>,
}

impl Event {
    /// Create an empty event stamped with a fresh id and the current time
    pub fn new(
        profile_name: impl Into<String>,
        device_name: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            device_name: device_name.into(),
            profile_name: profile_name.into(),
            source_name: source_name.into(),
            origin: now_nanos(),
            readings: Vec::new(),
            tags: BTreeMap::new(),
        }
    }

    /// Append a simple (string-valued) reading inheriting the event's identity
    pub fn add_simple_reading(
        &mut self,
        resource_name: impl Into<String>,
        value_type: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.readings.push(Reading {
            id: Uuid::new_v4().to_string(),
            origin: self.origin,
            device_name: self.device_name.clone(),
            resource_name: resource_name.into(),
            profile_name: self.profile_name.clone(),
            value_type: value_type.into(),
            value: value.into(),
            ..Default::default()
        });
        self
    }

    /// Decode an event from JSON bytes
    pub fn from_json(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ProtocolError::EmptyPayload);
        }
        Ok(serde_json::from_slice(data)?)
    }

    /// Encode as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encode as XML with an `<Event>` root
    pub fn to_xml(&self) -> Result<String> {
        let view = XmlEvent::from(self);
        quick_xml::se::to_string(&view).map_err(|e| ProtocolError::xml(e.to_string()))
    }
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}

// XML views. Element names are PascalCase and tag values are flattened to
// strings since XML has no typed scalars.

#[derive(Serialize)]
#[serde(rename = "Event", rename_all = "PascalCase")]
struct XmlEvent<'a> {
    id: &'a str,
    device_name: &'a str,
    profile_name: &'a str,
    source_name: &'a str,
    origin: i64,
    readings: Vec<XmlReading<'a>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<&'a str, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct XmlReading<'a> {
    id: &'a str,
    origin: i64,
    device_name: &'a str,
    resource_name: &'a str,
    profile_name: &'a str,
    value_type: &'a str,
    value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    binary_value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_type: Option<&'a str>,
}

impl<'a> From<&'a Event> for XmlEvent<'a> {
    fn from(event: &'a Event) -> Self {
        Self {
            id: &event.id,
            device_name: &event.device_name,
            profile_name: &event.profile_name,
            source_name: &event.source_name,
            origin: event.origin,
            readings: event.readings.iter().map(XmlReading::from).collect(),
            tags: event
                .tags
                .iter()
                .map(|(k, v)| (k.as_str(), tag_to_string(v)))
                .collect(),
        }
    }
}

impl<'a> From<&'a Reading> for XmlReading<'a> {
    fn from(reading: &'a Reading) -> Self {
        Self {
            id: &reading.id,
            origin: reading.origin,
            device_name: &reading.device_name,
            resource_name: &reading.resource_name,
            profile_name: &reading.profile_name,
            value_type: &reading.value_type,
            value: &reading.value,
            binary_value: reading.binary_value.as_deref(),
            media_type: reading.media_type.as_deref(),
        }
    }
}

fn tag_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
