//! Conversion between configuration values and OneFS JSON
//!
//! Attribute names match the OneFS field names, so conversion is driven by
//! the resource schema: only attributes the schema knows are carried across.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use powerscale_core::resource::{Attributes, Value};
use powerscale_core::schema::ResourceSchema;

/// Zone used when an import id has no `zone:` prefix
pub const SYSTEM_ZONE: &str = "System";

/// Convert JSON value to configuration Value (`null` has no counterpart)
pub fn json_to_value(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => Some(number_to_value(n)),
        serde_json::Value::Array(arr) => {
            let items: Vec<Value> = arr.iter().filter_map(json_to_value).collect();
            Some(Value::List(items))
        }
        serde_json::Value::Object(obj) => Some(Value::Map(
            obj.iter()
                .filter_map(|(k, v)| json_to_value(v).map(|v| (k.clone(), v)))
                .collect(),
        )),
        serde_json::Value::Null => None,
    }
}

/// Integers stay integers; fractions and out-of-range values keep their
/// exact text instead of being truncated
fn number_to_value(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        return Value::Int(i);
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Value::Int(f as i64)
        }
        _ => Value::String(n.to_string()),
    }
}

/// Convert configuration Value to JSON (unresolved references are dropped)
pub fn value_to_json(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::String(s) => Some(json!(s)),
        Value::Bool(b) => Some(json!(b)),
        Value::Int(i) => Some(json!(i)),
        Value::List(items) => {
            let arr: Vec<serde_json::Value> = items.iter().filter_map(value_to_json).collect();
            Some(serde_json::Value::Array(arr))
        }
        Value::Map(map) => {
            let obj: serde_json::Map<String, serde_json::Value> = map
                .iter()
                .filter_map(|(k, v)| value_to_json(v).map(|v| (k.clone(), v)))
                .collect();
            Some(serde_json::Value::Object(obj))
        }
        Value::ResourceRef(_, _) => None,
    }
}

/// Configured attributes as a JSON object suitable for a request body
///
/// Internal keys, unknown attributes and output-only attributes are left out.
/// Nested blocks are normalized and defaults applied first.
pub fn attributes_to_json(
    attributes: &Attributes,
    schema: &ResourceSchema,
) -> serde_json::Map<String, serde_json::Value> {
    let mut attributes = attributes.clone();
    schema.normalize(&mut attributes);
    schema.apply_defaults(&mut attributes);

    attributes
        .iter()
        .filter(|(name, _)| !name.starts_with('_'))
        .filter(|(name, _)| schema.get(name).is_some_and(|a| !a.is_output_only()))
        .filter_map(|(name, value)| value_to_json(value).map(|v| (name.clone(), v)))
        .collect()
}

/// Decode configured attributes into a typed request model
pub fn decode<T: DeserializeOwned>(
    attributes: &Attributes,
    schema: &ResourceSchema,
) -> Result<T, serde_json::Error> {
    serde_json::from_value(serde_json::Value::Object(attributes_to_json(attributes, schema)))
}

/// Typed response model as attributes known to the schema
pub fn to_attributes<T: Serialize>(model: &T, schema: &ResourceSchema) -> Attributes {
    let mut attributes = Attributes::new();
    if let Ok(serde_json::Value::Object(obj)) = serde_json::to_value(model) {
        for (key, value) in &obj {
            if schema.get(key).is_some_and(|a| !a.write_only)
                && let Some(v) = json_to_value(value)
            {
                attributes.insert(key.clone(), v);
            }
        }
    }
    attributes
}

/// Copy write-only attributes the API never returns from `source`
pub fn carry_write_only(attributes: &mut Attributes, source: &Attributes, schema: &ResourceSchema) {
    for name in schema.write_only_attributes() {
        if let Some(value) = source.get(name)
            && !value.has_unresolved_ref()
        {
            attributes.insert(name.to_string(), value.clone());
        }
    }
}

/// String attribute, if set to a literal string
pub fn string_attr(attributes: &Attributes, name: &str) -> Option<String> {
    attributes.get(name).and_then(Value::as_str).map(str::to_string)
}

/// List of strings, skipping non-string items
pub fn string_list_attr(attributes: &Attributes, name: &str) -> Option<Vec<String>> {
    attributes.get(name).and_then(Value::as_list).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

/// Split an import id of the form `zone:id`
///
/// A bare id returns no zone, meaning the System zone.
pub fn parse_zone_id(import_id: &str) -> (Option<String>, String) {
    match import_id.split_once(':') {
        Some((zone, id)) if !zone.is_empty() && !id.is_empty() => {
            (Some(zone.to_string()), id.to_string())
        }
        _ => (None, import_id.to_string()),
    }
}
