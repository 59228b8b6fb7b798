//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the "desired state" declared in the configuration with the
//! "current state" read from the cluster, and generates the list of required
//! Effects (Plan).

use std::collections::{HashMap, HashSet};

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Attributes, Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// An immutable attribute differs -> delete and create
    Replace {
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: Option<&ResourceSchema>) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes, schema);

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let forces_replace = changed.iter().any(|name| {
        schema
            .and_then(|s| s.get(name))
            .is_some_and(|a| a.force_new)
    });

    if forces_replace {
        Diff::Replace {
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state
///
/// Only attributes present in the desired state are compared, so values the
/// cluster fills in on its own never show up as drift.
fn find_changed_attributes(
    desired: &Attributes,
    current: &Attributes,
    schema: Option<&ResourceSchema>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') {
            continue;
        }

        let unordered = schema
            .and_then(|s| s.get(key))
            .is_some_and(|a| a.unordered);

        match current.get(key) {
            Some(current_value) if value_matches(desired_value, current_value, unordered) => {}
            // An empty list is the same as an unset list on the cluster
            None if matches!(desired_value, Value::List(items) if items.is_empty()) => {}
            _ => changed.push(key.clone()),
        }
    }

    changed.sort();
    changed
}

/// Check whether the current value satisfies the desired one
///
/// Maps compare as subsets: keys absent from the desired map are computed
/// by the cluster and ignored.
pub fn value_matches(desired: &Value, current: &Value, unordered: bool) -> bool {
    match (desired, current) {
        (Value::Map(d), Value::Map(c)) => d.iter().all(|(k, dv)| match c.get(k) {
            Some(cv) => value_matches(dv, cv, false),
            None => matches!(dv, Value::List(items) if items.is_empty()),
        }),
        (Value::List(d), Value::List(c)) => {
            if d.len() != c.len() {
                return false;
            }
            if unordered {
                let mut remaining: Vec<&Value> = c.iter().collect();
                d.iter().all(|dv| {
                    match remaining
                        .iter()
                        .position(|cv| value_matches(dv, cv, false))
                    {
                        Some(pos) => {
                            remaining.swap_remove(pos);
                            true
                        }
                        None => false,
                    }
                })
            } else {
                d.iter()
                    .zip(c.iter())
                    .all(|(dv, cv)| value_matches(dv, cv, false))
            }
        }
        _ => desired == current,
    }
}

/// Compute Diffs for multiple resources and generate a Plan
///
/// `desired` must already be in dependency order. State entries whose id is
/// not in `desired` are deleted, in reverse order of `orphans`.
pub fn create_plan(
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
    schemas: &HashMap<String, ResourceSchema>,
    orphans: &[State],
) -> Plan {
    let mut plan = Plan::new();

    for resource in desired {
        if resource.is_data_source() {
            plan.add(Effect::Read(resource.clone()));
            continue;
        }

        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        match diff(resource, &current, schemas.get(&resource.id.resource_type)) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update {
                id,
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Update {
                id,
                from,
                to,
                changed: changed_attributes,
            }),
            Diff::Replace {
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Replace {
                from,
                to,
                changed: changed_attributes,
            }),
            Diff::NoChange(_) => {}
        }
    }

    let configured: HashSet<&ResourceId> = desired.iter().map(|r| &r.id).collect();
    for state in orphans.iter().rev() {
        if !configured.contains(&state.id) {
            plan.add(Effect::Delete(state.clone()));
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, AttributeType};

    fn existing(resource_type: &str, name: &str, attrs: &[(&str, Value)]) -> State {
        let attributes = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        State::existing(ResourceId::new(resource_type, name), attributes).with_identifier(name)
    }

    fn share_schema() -> ResourceSchema {
        ResourceSchema::new("smb_share")
            .attribute(AttributeSchema::new("path", AttributeType::String).force_new())
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(
                AttributeSchema::new(
                    "host_acl",
                    AttributeType::list_of(AttributeType::String),
                )
                .unordered(),
            )
    }

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Resource::new("smb_share", "home");
        let current = State::not_found(ResourceId::new("smb_share", "home"));

        let result = diff(&desired, &current, None);
        assert!(matches!(result, Diff::Create(_)));
    }

    #[test]
    fn diff_no_change_when_same() {
        let desired = Resource::new("smb_share", "home").with_attribute("description", "Home");
        let current = existing(
            "smb_share",
            "home",
            &[
                ("description", Value::from("Home")),
                ("browsable", Value::Bool(true)),
            ],
        );

        assert!(matches!(diff(&desired, &current, None), Diff::NoChange(_)));
    }

    #[test]
    fn diff_update_when_different() {
        let desired = Resource::new("smb_share", "home").with_attribute("description", "new");
        let current = existing("smb_share", "home", &[("description", Value::from("old"))]);

        match diff(&desired, &current, Some(&share_schema())) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["description".to_string()]),
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn diff_replace_when_force_new_changes() {
        let desired = Resource::new("smb_share", "home").with_attribute("path", "/ifs/new");
        let current = existing("smb_share", "home", &[("path", Value::from("/ifs/old"))]);

        assert!(matches!(
            diff(&desired, &current, Some(&share_schema())),
            Diff::Replace { .. }
        ));
    }

    #[test]
    fn unordered_lists_ignore_order() {
        let desired = Resource::new("smb_share", "home").with_attribute(
            "host_acl",
            Value::List(vec![Value::from("allow:a"), Value::from("deny:b")]),
        );
        let current = existing(
            "smb_share",
            "home",
            &[(
                "host_acl",
                Value::List(vec![Value::from("deny:b"), Value::from("allow:a")]),
            )],
        );

        assert!(matches!(
            diff(&desired, &current, Some(&share_schema())),
            Diff::NoChange(_)
        ));
        assert!(diff(&desired, &current, None).is_change());
    }

    #[test]
    fn nested_maps_compare_as_subset() {
        let mut desired_thresholds = HashMap::new();
        desired_thresholds.insert("hard".to_string(), Value::Int(100));
        let mut current_thresholds = desired_thresholds.clone();
        current_thresholds.insert("hard_exceeded".to_string(), Value::Bool(false));

        assert!(value_matches(
            &Value::Map(desired_thresholds.clone()),
            &Value::Map(current_thresholds.clone()),
            false
        ));

        desired_thresholds.insert("soft".to_string(), Value::Int(50));
        assert!(!value_matches(
            &Value::Map(desired_thresholds),
            &Value::Map(current_thresholds),
            false
        ));
    }

    #[test]
    fn empty_list_matches_missing_attribute() {
        let desired =
            Resource::new("smb_share", "home").with_attribute("host_acl", Value::List(vec![]));
        let current = existing("smb_share", "home", &[]);
        assert!(matches!(diff(&desired, &current, None), Diff::NoChange(_)));
    }

    #[test]
    fn create_plan_from_resources() {
        let resources = vec![
            Resource::new("smb_share", "new-share"),
            Resource::new("smb_share", "existing-share").with_attribute("description", "x"),
            Resource::new("cluster", "this").with_read_only(true),
        ];

        let mut current_states = HashMap::new();
        current_states.insert(
            ResourceId::new("smb_share", "existing-share"),
            existing("smb_share", "existing-share", &[("description", Value::from("y"))]),
        );
        let orphan = existing("quota", "old", &[]);

        let plan = create_plan(&resources, &current_states, &HashMap::new(), &[orphan]);

        assert_eq!(plan.effects().len(), 4);
        assert!(matches!(plan.effects()[0], Effect::Create(_)));
        assert!(matches!(plan.effects()[1], Effect::Update { .. }));
        assert!(matches!(plan.effects()[2], Effect::Read(_)));
        assert!(matches!(plan.effects()[3], Effect::Delete(_)));
    }

    #[test]
    fn configured_state_is_not_deleted() {
        let resources = vec![Resource::new("smb_share", "home")];
        let state = existing("smb_share", "home", &[]);
        let mut current = HashMap::new();
        current.insert(state.id.clone(), state.clone());

        let plan = create_plan(&resources, &current, &HashMap::new(), &[state]);
        assert!(plan.is_empty());
    }
}
