//! Graph - Dependencies between resources and reference resolution
//!
//! Resources refer to each other with `binding.attribute`. Those references
//! order the resources for apply and are substituted once the referenced
//! values are known (either from configuration or from state).

use std::collections::{HashMap, HashSet};

use crate::resource::{Attributes, Resource, ResourceId, State, Value};

/// binding name -> known attributes
pub type BindingMap = HashMap<String, Attributes>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("Dependency cycle detected involving '{0}'")]
    Cycle(String),

    #[error("Reference to undefined binding '{binding}' in {resource}")]
    UndefinedBinding { binding: String, resource: ResourceId },
}

/// Binding names a resource refers to
pub fn dependencies(resource: &Resource) -> HashSet<String> {
    let mut deps = HashSet::new();
    for value in resource.attributes.values() {
        collect_dependencies(value, &mut deps);
    }
    deps
}

fn collect_dependencies(value: &Value, deps: &mut HashSet<String>) {
    match value {
        Value::ResourceRef(binding, _) => {
            deps.insert(binding.clone());
        }
        Value::List(items) => {
            for item in items {
                collect_dependencies(item, deps);
            }
        }
        Value::Map(map) => {
            for v in map.values() {
                collect_dependencies(v, deps);
            }
        }
        _ => {}
    }
}

/// Sort resources so that every resource comes after the ones it refers to
///
/// Declaration order is kept among independent resources.
pub fn sort_by_dependencies(resources: &[Resource]) -> Result<Vec<Resource>, GraphError> {
    let by_binding: HashMap<&str, usize> = resources
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.binding().map(|b| (b, i)))
        .collect();

    for resource in resources {
        for dep in dependencies(resource) {
            if !by_binding.contains_key(dep.as_str()) {
                return Err(GraphError::UndefinedBinding {
                    binding: dep,
                    resource: resource.id.clone(),
                });
            }
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit(
        index: usize,
        resources: &[Resource],
        by_binding: &HashMap<&str, usize>,
        marks: &mut HashMap<usize, Mark>,
        sorted: &mut Vec<Resource>,
    ) -> Result<(), GraphError> {
        match marks.get(&index) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                return Err(GraphError::Cycle(resources[index].id.to_string()));
            }
            None => {}
        }
        marks.insert(index, Mark::Visiting);

        let mut deps: Vec<String> = dependencies(&resources[index]).into_iter().collect();
        deps.sort();
        for dep in deps {
            if let Some(&dep_index) = by_binding.get(dep.as_str()) {
                visit(dep_index, resources, by_binding, marks, sorted)?;
            }
        }

        marks.insert(index, Mark::Done);
        sorted.push(resources[index].clone());
        Ok(())
    }

    let mut marks = HashMap::new();
    let mut sorted = Vec::with_capacity(resources.len());
    for index in 0..resources.len() {
        visit(index, resources, &by_binding, &mut marks, &mut sorted)?;
    }
    Ok(sorted)
}

/// Build the binding map from configured attributes, overlaid with state
///
/// State wins for attributes the configuration does not set, so computed
/// values such as ids become available to dependents.
pub fn build_binding_map(
    resources: &[Resource],
    states: &HashMap<ResourceId, State>,
) -> BindingMap {
    let mut bindings = BindingMap::new();
    for resource in resources {
        if let Some(binding) = resource.binding() {
            let mut attrs = resource.attributes.clone();
            if let Some(state) = states.get(&resource.id)
                && state.exists
            {
                for (k, v) in &state.attributes {
                    attrs.entry(k.clone()).or_insert_with(|| v.clone());
                }
                if let Some(identifier) = &state.identifier {
                    attrs
                        .entry("id".to_string())
                        .or_insert_with(|| Value::String(identifier.clone()));
                }
            }
            bindings.insert(binding.to_string(), attrs);
        }
    }
    bindings
}

/// Record a new state for a binding after a successful operation
pub fn update_binding(bindings: &mut BindingMap, resource: &Resource, state: &State) {
    if let Some(binding) = resource.binding() {
        let mut attrs = resource.attributes.clone();
        for (k, v) in &state.attributes {
            attrs.insert(k.clone(), v.clone());
        }
        if let Some(identifier) = &state.identifier {
            attrs
                .entry("id".to_string())
                .or_insert_with(|| Value::String(identifier.clone()));
        }
        bindings.insert(binding.to_string(), attrs);
    }
}

/// Substitute references whose target value is known
pub fn resolve_value(value: &Value, bindings: &BindingMap) -> Value {
    match value {
        Value::ResourceRef(binding, attr) => match bindings.get(binding).and_then(|a| a.get(attr)) {
            Some(Value::ResourceRef(b, a)) if b == binding && a == attr => value.clone(),
            Some(resolved) => resolve_value(resolved, bindings),
            None => value.clone(),
        },
        Value::List(items) => Value::List(items.iter().map(|v| resolve_value(v, bindings)).collect()),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, bindings)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Resolve every attribute of a resource
pub fn resolve_resource(resource: &Resource, bindings: &BindingMap) -> Resource {
    let mut resolved = resource.clone();
    for (key, value) in &resource.attributes {
        resolved
            .attributes
            .insert(key.clone(), resolve_value(value, bindings));
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(resource_type: &str, binding: &str) -> Resource {
        Resource::new(resource_type, binding).with_attribute("_binding", binding)
    }

    #[test]
    fn dependents_come_after_dependencies() {
        let share = bound("smb_share", "share").with_attribute(
            "zone",
            Value::ResourceRef("zone".to_string(), "name".to_string()),
        );
        let zone = bound("access_zone", "zone").with_attribute(
            "groupnet",
            Value::ResourceRef("gn".to_string(), "name".to_string()),
        );
        let groupnet = bound("groupnet", "gn");

        let sorted = sort_by_dependencies(&[share, zone, groupnet]).unwrap();
        let order: Vec<&str> = sorted.iter().map(|r| r.id.name.as_str()).collect();
        assert_eq!(order, vec!["gn", "zone", "share"]);
    }

    #[test]
    fn cycle_is_an_error() {
        let a = bound("groupnet", "a")
            .with_attribute("x", Value::ResourceRef("b".to_string(), "id".to_string()));
        let b = bound("groupnet", "b")
            .with_attribute("x", Value::ResourceRef("a".to_string(), "id".to_string()));
        assert!(matches!(
            sort_by_dependencies(&[a, b]),
            Err(GraphError::Cycle(_))
        ));
    }

    #[test]
    fn undefined_binding_is_an_error() {
        let a = bound("smb_share", "a")
            .with_attribute("zone", Value::ResourceRef("nope".to_string(), "name".to_string()));
        assert!(matches!(
            sort_by_dependencies(&[a]),
            Err(GraphError::UndefinedBinding { .. })
        ));
    }

    #[test]
    fn state_fills_computed_values() {
        let zone = bound("access_zone", "zone").with_attribute("name", "hr");
        let share = bound("smb_share", "share").with_attribute(
            "zone_id",
            Value::ResourceRef("zone".to_string(), "zone_id".to_string()),
        );

        let mut states = HashMap::new();
        let mut attrs = Attributes::new();
        attrs.insert("zone_id".to_string(), Value::Int(7));
        states.insert(
            zone.id.clone(),
            State::existing(zone.id.clone(), attrs).with_identifier("7"),
        );

        let bindings = build_binding_map(&[zone, share.clone()], &states);
        let resolved = resolve_resource(&share, &bindings);
        assert_eq!(resolved.attributes.get("zone_id"), Some(&Value::Int(7)));
        assert_eq!(
            bindings["zone"].get("id"),
            Some(&Value::String("7".to_string()))
        );
    }

    #[test]
    fn unknown_values_stay_references() {
        let bindings = BindingMap::new();
        let value = Value::List(vec![Value::ResourceRef(
            "zone".to_string(),
            "id".to_string(),
        )]);
        assert_eq!(resolve_value(&value, &bindings), value);
    }
}
