//! State file structures
//!
//! Attribute values are stored as plain JSON so the file stays readable and
//! diffable. Conversion to and from the engine's `Value` happens here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use powerscale_core::resource::{Attributes, ResourceId, State, Value};

/// The persisted state of one configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Incremented on every write
    pub serial: u64,
    /// Identifies this state across writes
    pub lineage: String,
    /// Version of the tool that last wrote this file
    pub tool_version: String,
    /// Managed resources, in the order they were first recorded
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Bump the serial before a write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.tool_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find_resource(&self, resource_type: &str, name: &str) -> Option<&ResourceState> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type && r.name == name)
    }

    /// Add a resource, or replace the entry with the same type and name in place
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        match self
            .resources
            .iter_mut()
            .find(|r| r.resource_type == resource.resource_type && r.name == resource.name)
        {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub fn remove_resource(&mut self, resource_type: &str, name: &str) -> Option<ResourceState> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.resource_type == resource_type && r.name == name)?;
        Some(self.resources.remove(pos))
    }

    /// Record the outcome of a lifecycle call
    ///
    /// A state that no longer exists removes the entry.
    pub fn record(&mut self, state: &State) {
        if state.exists {
            self.upsert_resource(ResourceState::from_state(state));
        } else {
            self.remove_resource(&state.id.resource_type, &state.id.name);
        }
    }

    /// Engine states in file order
    pub fn states(&self) -> Vec<State> {
        self.resources.iter().map(ResourceState::to_state).collect()
    }

    /// Engine states keyed by resource id
    pub fn state_map(&self) -> HashMap<ResourceId, State> {
        self.resources
            .iter()
            .map(|r| {
                let state = r.to_state();
                (state.id.clone(), state)
            })
            .collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "smb_share", "quota")
    pub resource_type: String,
    /// Binding name or `name` attribute from the configuration
    pub name: String,
    /// Remote identifier used for read, update and delete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl ResourceState {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            identifier: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    pub fn from_state(state: &State) -> Self {
        Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            identifier: state.identifier.clone(),
            attributes: state
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        }
    }

    pub fn to_state(&self) -> State {
        let attributes: Attributes = self
            .attributes
            .iter()
            .filter_map(|(k, v)| json_to_value(v).map(|v| (k.clone(), v)))
            .collect();
        let state = State::existing(self.id(), attributes);
        match &self.identifier {
            Some(identifier) => state.with_identifier(identifier.clone()),
            None => state,
        }
    }
}

/// Convert an engine value to JSON
///
/// References are resolved before anything is stored; one that slips through
/// is kept in its `${binding.attribute}` form.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
        Value::ResourceRef(binding, attr) => {
            serde_json::Value::String(format!("${{{}.{}}}", binding, attr))
        }
    }
}

/// Convert stored JSON back to an engine value; `null` has no counterpart
pub fn json_to_value(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => Some(match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::String(n.to_string()),
        }),
        serde_json::Value::Array(items) => {
            Some(Value::List(items.iter().filter_map(json_to_value).collect()))
        }
        serde_json::Value::Object(map) => Some(Value::Map(
            map.iter()
                .filter_map(|(k, v)| json_to_value(v).map(|v| (k.clone(), v)))
                .collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn share_state() -> State {
        let mut attributes = Attributes::new();
        attributes.insert("path".to_string(), Value::from("/ifs/home"));
        attributes.insert("browsable".to_string(), Value::Bool(true));
        attributes.insert(
            "host_acl".to_string(),
            Value::List(vec![Value::from("allow:10.0.0.0/8")]),
        );
        State::existing(ResourceId::new("smb_share", "home"), attributes).with_identifier("home")
    }

    #[test]
    fn new_state_file_is_empty() {
        let state = StateFile::new();
        assert_eq!(state.version, StateFile::CURRENT_VERSION);
        assert_eq!(state.serial, 0);
        assert!(!state.lineage.is_empty());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn increment_serial() {
        let mut state = StateFile::new();
        state.increment_serial();
        state.increment_serial();
        assert_eq!(state.serial, 2);
    }

    #[test]
    fn upsert_keeps_position() {
        let mut file = StateFile::new();
        file.upsert_resource(ResourceState::new("access_zone", "hr").with_identifier("hr"));
        file.upsert_resource(ResourceState::new("smb_share", "home").with_identifier("home"));
        file.upsert_resource(
            ResourceState::new("access_zone", "hr")
                .with_identifier("hr")
                .with_attribute("path", json!("/ifs/hr2")),
        );

        assert_eq!(file.resources.len(), 2);
        assert_eq!(file.resources[0].resource_type, "access_zone");
        assert_eq!(file.resources[0].attributes.get("path"), Some(&json!("/ifs/hr2")));
    }

    #[test]
    fn record_removes_missing_resources() {
        let mut file = StateFile::new();
        file.record(&share_state());
        assert!(file.find_resource("smb_share", "home").is_some());

        file.record(&State::not_found(ResourceId::new("smb_share", "home")));
        assert!(file.find_resource("smb_share", "home").is_none());
        assert!(file.remove_resource("smb_share", "home").is_none());
    }

    #[test]
    fn engine_state_survives_the_file() {
        let mut file = StateFile::new();
        file.record(&share_state());

        let text = serde_json::to_string_pretty(&file).unwrap();
        let read: StateFile = serde_json::from_str(&text).unwrap();
        let states = read.state_map();
        let state = &states[&ResourceId::new("smb_share", "home")];
        assert_eq!(state, &share_state());
    }

    #[test]
    fn nulls_are_dropped() {
        let resource = ResourceState::new("quota", "home")
            .with_attribute("container", json!(null))
            .with_attribute("thresholds", json!({"hard": 1024, "soft": null}));
        let state = resource.to_state();

        assert!(!state.attributes.contains_key("container"));
        let thresholds = state.attributes["thresholds"].as_map().unwrap();
        assert_eq!(thresholds.get("hard"), Some(&Value::Int(1024)));
        assert!(!thresholds.contains_key("soft"));
        assert_eq!(state.identifier, None);
    }

    #[test]
    fn fractional_numbers_keep_their_text() {
        let state = ResourceState::new("quota", "home")
            .with_attribute("efficiency_ratio", json!(1.5))
            .to_state();
        assert_eq!(state.attributes.get("efficiency_ratio"), Some(&Value::from("1.5")));
    }

    #[test]
    fn identifier_is_omitted_when_unset() {
        let text = serde_json::to_string(&ResourceState::new("cluster_email", "mail")).unwrap();
        assert!(!text.contains("identifier"));
    }
}
