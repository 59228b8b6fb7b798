//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type. The schema drives
//! validation of the configuration, planning (which attributes force a
//! replacement, which are compared as sets) and rendering of plans.

use std::collections::HashMap;
use std::fmt;

use crate::resource::{Attributes, Value};

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested block with its own attributes
    Struct(Vec<AttributeSchema>),
}

impl AttributeType {
    /// Shorthand for an enum over static strings
    pub fn enumeration(variants: &[&str]) -> Self {
        AttributeType::Enum(variants.iter().map(|v| v.to_string()).collect())
    }

    pub fn list_of(inner: AttributeType) -> Self {
        AttributeType::List(Box::new(inner))
    }

    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            // References resolve at apply time; their type is checked by the target
            (_, Value::ResourceRef(_, _)) => Ok(()),
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Struct(fields), Value::Map(map)) => {
                for field in fields {
                    if field.required && !map.contains_key(&field.name) {
                        return Err(TypeError::MissingRequired {
                            name: field.name.clone(),
                        });
                    }
                }
                for (k, v) in map {
                    let field = fields
                        .iter()
                        .find(|f| &f.name == k)
                        .ok_or_else(|| TypeError::UnknownAttribute { name: k.clone() })?;
                    field.attr_type.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Struct(_) => "Block".to_string(),
        }
    }

    /// Turn a nested block written once (a one-element list of maps) into a map
    fn normalize(&self, value: Value) -> Value {
        match (self, value) {
            (AttributeType::Struct(fields), Value::List(mut items))
                if items.len() == 1 && matches!(items[0], Value::Map(_)) =>
            {
                self.normalize_struct(fields, items.remove(0))
            }
            (AttributeType::Struct(fields), v @ Value::Map(_)) => self.normalize_struct(fields, v),
            (AttributeType::List(inner), Value::List(items)) => {
                Value::List(items.into_iter().map(|v| inner.normalize(v)).collect())
            }
            (_, v) => v,
        }
    }

    fn normalize_struct(&self, fields: &[AttributeSchema], value: Value) -> Value {
        match value {
            Value::Map(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| {
                        let normalized = match fields.iter().find(|f| f.name == k) {
                            Some(field) => field.attr_type.normalize(v),
                            None => v,
                        };
                        (k, normalized)
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl TypeError {
    /// Attribute the error is about, when the error carries one
    pub fn attribute(&self) -> Option<&str> {
        match self {
            TypeError::MissingRequired { name }
            | TypeError::UnknownAttribute { name }
            | TypeError::ComputedAttribute { name } => Some(name),
            _ => None,
        }
    }
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::ResourceRef(binding, attr) => format!("ResourceRef({}.{})", binding, attr),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Filled in by the cluster; output only unless `optional` is also set
    pub computed: bool,
    /// May be set by the user even though it is computed
    pub optional: bool,
    /// Hidden in plan output
    pub sensitive: bool,
    /// Never returned by the API; the prior state value is kept
    pub write_only: bool,
    /// A change cannot be applied in place
    pub force_new: bool,
    /// Lists compared without regard to order
    pub unordered: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            optional: true,
            sensitive: false,
            write_only: false,
            force_new: false,
            unordered: false,
            default: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Output only attribute
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self.optional = false;
        self
    }

    /// User may set it, cluster fills it otherwise
    pub fn optional_computed(mut self) -> Self {
        self.computed = true;
        self.optional = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self.sensitive = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn unordered(mut self) -> Self {
        self.unordered = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// True if the user is not allowed to set this attribute
    pub fn is_output_only(&self) -> bool {
        self.computed && !self.optional
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
    /// Read-only data source rather than a managed resource
    pub data_source: bool,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
            data_source: false,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn data_source(mut self) -> Self {
        self.data_source = true;
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.get(name)
    }

    pub fn is_sensitive(&self, name: &str) -> bool {
        self.get(name).is_some_and(|a| a.sensitive)
    }

    /// Names of attributes whose value must be carried over from prior state
    pub fn write_only_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .values()
            .filter(|a| a.write_only)
            .map(|a| a.name.as_str())
    }

    /// Collapse singly written nested blocks into maps
    pub fn normalize(&self, attributes: &mut Attributes) {
        let keys: Vec<String> = attributes.keys().cloned().collect();
        for key in keys {
            if let Some(schema) = self.attributes.get(&key)
                && let Some(value) = attributes.remove(&key)
            {
                attributes.insert(key, schema.attr_type.normalize(value));
            }
        }
    }

    /// Insert default values for attributes the user did not set
    pub fn apply_defaults(&self, attributes: &mut Attributes) {
        for (name, schema) in &self.attributes {
            if let Some(default) = &schema.default
                && !attributes.contains_key(name)
            {
                attributes.insert(name.clone(), default.clone());
            }
        }
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &Attributes) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        for (name, schema) in &self.attributes {
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        for (name, value) in attributes {
            if name.starts_with('_') {
                continue;
            }
            match self.attributes.get(name) {
                Some(schema) if schema.is_output_only() => {
                    errors.push(TypeError::ComputedAttribute { name: name.clone() });
                }
                Some(schema) => {
                    if let Err(e) = schema.attr_type.validate(value) {
                        errors.push(TypeError::MapValueError {
                            key: name.clone(),
                            inner: Box::new(e),
                        });
                    }
                }
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    fn custom(
        name: &str,
        base: AttributeType,
        validate: fn(&Value) -> Result<(), String>,
    ) -> AttributeType {
        AttributeType::Custom {
            name: name.to_string(),
            base: Box::new(base),
            validate,
        }
    }

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        custom("PositiveInt", AttributeType::Int, |value| match value {
            Value::Int(n) if *n > 0 => Ok(()),
            Value::Int(_) => Err("Value must be positive".to_string()),
            _ => Ok(()),
        })
    }

    /// Non-negative integer type
    pub fn non_negative_int() -> AttributeType {
        custom("NonNegativeInt", AttributeType::Int, |value| match value {
            Value::Int(n) if *n < 0 => Err("Value must not be negative".to_string()),
            _ => Ok(()),
        })
    }

    /// TCP/UDP port
    pub fn port() -> AttributeType {
        custom("Port", AttributeType::Int, |value| match value {
            Value::Int(n) if (1..=65535).contains(n) => Ok(()),
            Value::Int(n) => Err(format!("Port {} out of range 1-65535", n)),
            _ => Ok(()),
        })
    }

    /// IPv4 address (e.g., "10.0.0.1")
    pub fn ipv4_address() -> AttributeType {
        custom("Ipv4Address", AttributeType::String, |value| match value {
            Value::String(s) => validate_ipv4(s),
            _ => Ok(()),
        })
    }

    /// IPv4 or IPv6 address
    pub fn ip_address() -> AttributeType {
        custom("IpAddress", AttributeType::String, |value| match value {
            Value::String(s) => s
                .parse::<std::net::IpAddr>()
                .map(|_| ())
                .map_err(|_| format!("Invalid IP address '{}'", s)),
            _ => Ok(()),
        })
    }

    /// CIDR block type (e.g., "10.0.0.0/16")
    pub fn cidr() -> AttributeType {
        custom("Cidr", AttributeType::String, |value| match value {
            Value::String(s) => validate_cidr(s),
            _ => Ok(()),
        })
    }

    /// Path inside the OneFS file system
    pub fn ifs_path() -> AttributeType {
        custom("IfsPath", AttributeType::String, |value| match value {
            Value::String(s) => validate_ifs_path(s),
            _ => Ok(()),
        })
    }

    /// Email address
    pub fn email() -> AttributeType {
        custom("Email", AttributeType::String, |value| match value {
            Value::String(s) => {
                let re = regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
                    .map_err(|e| e.to_string())?;
                if re.is_match(s) {
                    Ok(())
                } else {
                    Err(format!("Invalid email address '{}'", s))
                }
            }
            _ => Ok(()),
        })
    }
}

/// Validate an IPv4 address
pub fn validate_ipv4(ip: &str) -> Result<(), String> {
    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return Err(format!("Invalid IP address '{}': expected 4 octets", ip));
    }

    for octet in &octets {
        if octet.parse::<u8>().is_err() {
            return Err(format!(
                "Invalid octet '{}' in IP address: must be 0-255",
                octet
            ));
        }
    }
    Ok(())
}

/// Validate CIDR block format (e.g., "10.0.0.0/16")
pub fn validate_cidr(cidr: &str) -> Result<(), String> {
    let parts: Vec<&str> = cidr.split('/').collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid CIDR format '{}': expected IP/prefix",
            cidr
        ));
    }

    validate_ipv4(parts[0])?;

    match parts[1].parse::<u8>() {
        Ok(p) if p <= 32 => Ok(()),
        Ok(p) => Err(format!("Invalid prefix length '{}': must be 0-32", p)),
        Err(_) => Err(format!(
            "Invalid prefix length '{}': must be a number",
            parts[1]
        )),
    }
}

/// Validate a OneFS path: absolute, rooted at /ifs, no trailing slash
pub fn validate_ifs_path(path: &str) -> Result<(), String> {
    if path != "/ifs" && !path.starts_with("/ifs/") {
        return Err(format!("Path '{}' must be under /ifs", path));
    }
    if path.len() > 4 && path.ends_with('/') {
        return Err(format!("Path '{}' must not end with '/'", path));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = AttributeType::enumeration(&["allow", "deny"]);
        assert!(t.validate(&Value::String("allow".to_string())).is_ok());
        assert!(t.validate(&Value::String("maybe".to_string())).is_err());
    }

    #[test]
    fn references_pass_type_checks() {
        let t = types::positive_int();
        assert!(
            t.validate(&Value::ResourceRef("zone".to_string(), "zone_id".to_string()))
                .is_ok()
        );
    }

    #[test]
    fn validate_positive_int() {
        let t = types::positive_int();
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(-1)).is_err());
        assert!(t.validate(&Value::String("1".to_string())).is_err());
    }

    #[test]
    fn validate_port() {
        let t = types::port();
        assert!(t.validate(&Value::Int(25)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(70000)).is_err());
    }

    #[test]
    fn validate_resource_schema() {
        let schema = ResourceSchema::new("smb_share")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("path", types::ifs_path()).required())
            .attribute(AttributeSchema::new("browsable", AttributeType::Bool));

        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("home".to_string()));
        attrs.insert("path".to_string(), Value::String("/ifs/home".to_string()));
        attrs.insert("browsable".to_string(), Value::Bool(true));
        attrs.insert("_binding".to_string(), Value::String("home".to_string()));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("smb_share")
            .attribute(AttributeSchema::new("name", AttributeType::String).required());

        let result = schema.validate(&HashMap::new());
        assert!(matches!(
            result.unwrap_err()[0],
            TypeError::MissingRequired { .. }
        ));
    }

    #[test]
    fn unknown_and_computed_attributes_are_rejected() {
        let schema = ResourceSchema::new("quota")
            .attribute(AttributeSchema::new("path", AttributeType::String).required())
            .attribute(AttributeSchema::new("ready", AttributeType::Bool).computed());

        let mut attrs = HashMap::new();
        attrs.insert("path".to_string(), Value::String("/ifs/a".to_string()));
        attrs.insert("ready".to_string(), Value::Bool(true));
        attrs.insert("colour".to_string(), Value::String("red".to_string()));

        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, TypeError::ComputedAttribute { name } if name == "ready"))
        );
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, TypeError::UnknownAttribute { name } if name == "colour"))
        );
    }

    #[test]
    fn nested_block_is_normalized_and_validated() {
        let thresholds = AttributeType::Struct(vec![
            AttributeSchema::new("hard", types::positive_int()),
            AttributeSchema::new("soft", types::positive_int()),
        ]);
        let schema = ResourceSchema::new("quota")
            .attribute(AttributeSchema::new("thresholds", thresholds));

        let mut block = HashMap::new();
        block.insert("hard".to_string(), Value::Int(100));
        let mut attrs = HashMap::new();
        attrs.insert(
            "thresholds".to_string(),
            Value::List(vec![Value::Map(block)]),
        );

        schema.normalize(&mut attrs);
        assert!(matches!(attrs.get("thresholds"), Some(Value::Map(_))));
        assert!(schema.validate(&attrs).is_ok());

        let mut bad = HashMap::new();
        bad.insert("hardest".to_string(), Value::Int(1));
        attrs.insert("thresholds".to_string(), Value::Map(bad));
        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn defaults_fill_unset_attributes() {
        let schema = ResourceSchema::new("smb_share").attribute(
            AttributeSchema::new("zone", AttributeType::String).with_default("System"),
        );
        let mut attrs = HashMap::new();
        schema.apply_defaults(&mut attrs);
        assert_eq!(attrs.get("zone"), Some(&Value::String("System".to_string())));

        attrs.insert("zone".to_string(), Value::String("hr".to_string()));
        schema.apply_defaults(&mut attrs);
        assert_eq!(attrs.get("zone"), Some(&Value::String("hr".to_string())));
    }

    #[test]
    fn validate_cidr_type() {
        let t = types::cidr();
        assert!(t.validate(&Value::String("10.0.0.0/16".to_string())).is_ok());
        assert!(t.validate(&Value::String("0.0.0.0/0".to_string())).is_ok());
        assert!(t.validate(&Value::String("10.0.0.0".to_string())).is_err());
        assert!(t.validate(&Value::String("10.0.0.0/33".to_string())).is_err());
        assert!(t.validate(&Value::String("10.0.0.256/16".to_string())).is_err());
    }

    #[test]
    fn validate_ifs_paths() {
        assert!(validate_ifs_path("/ifs").is_ok());
        assert!(validate_ifs_path("/ifs/data/home").is_ok());
        assert!(validate_ifs_path("/data").is_err());
        assert!(validate_ifs_path("/ifsdata").is_err());
        assert!(validate_ifs_path("/ifs/data/").is_err());
    }

    #[test]
    fn validate_addresses() {
        assert!(types::ip_address().validate(&Value::String("fd00::1".to_string())).is_ok());
        assert!(types::ipv4_address().validate(&Value::String("fd00::1".to_string())).is_err());
        assert!(types::email().validate(&Value::String("ops@example.com".to_string())).is_ok());
        assert!(types::email().validate(&Value::String("ops".to_string())).is_err());
    }
}
