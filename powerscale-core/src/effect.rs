//! Effect - Side effects represented as values
//!
//! An Effect describes one operation against the cluster. Building a Plan
//! produces Effects; only the Interpreter executes them.

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Read a data source
    Read(Resource),
    /// Create a new resource
    Create(Resource),
    /// Update an existing resource in place
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed: Vec<String>,
    },
    /// Delete and recreate because an immutable attribute changed
    Replace {
        from: State,
        to: Resource,
        changed: Vec<String>,
    },
    /// Delete a resource that is no longer configured
    Delete(State),
}

impl Effect {
    /// Returns whether this Effect modifies the cluster
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read(_))
    }

    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read(r) | Effect::Create(r) => &r.id,
            Effect::Update { id, .. } => id,
            Effect::Replace { to, .. } => &to.id,
            Effect::Delete(state) => &state.id,
        }
    }

    /// Human readable verb for plan output
    pub fn verb(&self) -> &'static str {
        match self {
            Effect::Read(_) => "read",
            Effect::Create(_) => "create",
            Effect::Update { .. } => "update",
            Effect::Replace { .. } => "replace",
            Effect::Delete(_) => "delete",
        }
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = self.verb();
        let mut chars = verb.chars();
        let capitalized: String = chars
            .next()
            .map(|c| c.to_uppercase().chain(chars).collect())
            .unwrap_or_default();
        write!(f, "{} {}", capitalized, self.resource_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_is_not_mutating() {
        let effect = Effect::Read(Resource::new("cluster", "this"));
        assert!(!effect.is_mutating());
        assert!(Effect::Create(Resource::new("quota", "home")).is_mutating());
    }

    #[test]
    fn display_uses_resource_id() {
        let effect = Effect::Delete(State::not_found(ResourceId::new("smb_share", "home")));
        assert_eq!(effect.to_string(), "Delete smb_share.home");
    }
}
