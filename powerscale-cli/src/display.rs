//! Terminal output for plans, state and diagnostics

use std::collections::HashMap;

use colored::Colorize;

use powerscale_core::diagnostics::Diagnostics;
use powerscale_core::effect::Effect;
use powerscale_core::plan::Plan;
use powerscale_core::resource::{Attributes, Value};
use powerscale_core::schema::ResourceSchema;

pub const SENSITIVE: &str = "(sensitive)";

const ATTR_INDENT: &str = "      ";

pub fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("{}", diagnostic);
        eprintln!();
    }
}

pub fn print_plan(plan: &Plan, schemas: &HashMap<String, ResourceSchema>) {
    if plan.has_no_changes() {
        println!("{}", "No changes. The cluster matches the configuration.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        let schema = schemas.get(&effect.resource_id().resource_type);
        print_effect(effect, schema);
    }

    let summary = plan.summary();
    println!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete.",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.replace.to_string().magenta(),
        summary.delete.to_string().red()
    );
}

fn print_effect(effect: &Effect, schema: Option<&ResourceSchema>) {
    let id = effect.resource_id();
    let symbol = match effect {
        Effect::Read(_) => "<=".cyan().bold(),
        Effect::Create(_) => "+".green().bold(),
        Effect::Update { .. } => "~".yellow().bold(),
        Effect::Replace { .. } => "-/+".magenta().bold(),
        Effect::Delete(_) => "-".red().bold(),
    };
    let mut header = format!("  {} {}", symbol, id.to_string().cyan().bold());
    if let Effect::Replace { changed, .. } = effect {
        header.push_str(&format!(" (forced by {})", changed.join(", ")).dimmed().to_string());
    }
    println!("{}", header);

    match effect {
        Effect::Read(_) => {}
        Effect::Create(resource) => {
            for key in sorted_keys(&resource.attributes) {
                let value = display_value(schema, key, &resource.attributes[key]);
                println!("{}{}: {}", ATTR_INDENT, key, value.green());
            }
        }
        Effect::Update { from, to, changed, .. } | Effect::Replace { from, to, changed } => {
            for key in changed {
                let Some(new_value) = to.attributes.get(key) else {
                    continue;
                };
                let old = from
                    .attributes
                    .get(key)
                    .map(|v| display_value(schema, key, v))
                    .unwrap_or_else(|| "(none)".to_string());
                println!(
                    "{}{}: {} → {}",
                    ATTR_INDENT,
                    key,
                    old.red(),
                    display_value(schema, key, new_value).green()
                );
            }
        }
        Effect::Delete(state) => {
            if let Some(identifier) = &state.identifier {
                println!("{}{}: {}", ATTR_INDENT, "id".bold(), identifier.red());
            }
        }
    }
    println!();
}

/// Print a stored state entry
pub fn print_attributes(identifier: Option<&str>, attributes: &Attributes, schema: Option<&ResourceSchema>) {
    if let Some(identifier) = identifier {
        println!("  {}: {}", "identifier".bold(), identifier);
    }
    for key in sorted_keys(attributes) {
        println!("  {}: {}", key, display_value(schema, key, &attributes[key]));
    }
}

/// Format an attribute, masking sensitive values
pub fn display_value(schema: Option<&ResourceSchema>, key: &str, value: &Value) -> String {
    if schema.is_some_and(|s| s.is_sensitive(key)) {
        return SENSITIVE.to_string();
    }
    format_value(value)
}

/// `name` first, then alphabetical, internal keys hidden
fn sorted_keys(attributes: &Attributes) -> Vec<&String> {
    let mut keys: Vec<_> = attributes.keys().filter(|k| !k.starts_with('_')).collect();
    keys.sort_by(|a, b| match (a.as_str(), b.as_str()) {
        ("name", _) => std::cmp::Ordering::Less,
        (_, "name") => std::cmp::Ordering::Greater,
        _ => a.cmp(b),
    });
    keys
}

pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let strs: Vec<_> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
        Value::ResourceRef(binding, attr) => format!("{}.{} (known after apply)", binding, attr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerscale_core::schema::{AttributeSchema, AttributeType};

    #[test]
    fn sensitive_values_are_masked() {
        let schema = ResourceSchema::new("ldap_provider")
            .attribute(AttributeSchema::new("bind_password", AttributeType::String).sensitive())
            .attribute(AttributeSchema::new("base_dn", AttributeType::String));

        assert_eq!(
            display_value(Some(&schema), "bind_password", &Value::from("secret")),
            SENSITIVE
        );
        assert_eq!(
            display_value(Some(&schema), "base_dn", &Value::from("dc=corp")),
            "\"dc=corp\""
        );
    }

    #[test]
    fn maps_print_in_key_order() {
        let value = Value::Map(
            [
                ("soft".to_string(), Value::Int(10)),
                ("hard".to_string(), Value::Int(20)),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(format_value(&value), "{hard: 20, soft: 10}");
        assert_eq!(
            format_value(&Value::ResourceRef("zone".to_string(), "id".to_string())),
            "zone.id (known after apply)"
        );
    }

    #[test]
    fn name_sorts_first() {
        let mut attrs = Attributes::new();
        attrs.insert("path".to_string(), Value::from("/ifs"));
        attrs.insert("name".to_string(), Value::from("hr"));
        attrs.insert("_binding".to_string(), Value::from("hr"));
        let keys = sorted_keys(&attrs);
        assert_eq!(keys, vec!["name", "path"]);
    }
}
