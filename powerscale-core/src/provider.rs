//! Provider - Trait abstracting resource operations
//!
//! A Provider maps resource types onto a remote API. It is responsible for
//! turning Effects into actual API calls and reporting the resulting state.

use std::future::Future;
use std::pin::Pin;

use crate::resource::{Attributes, Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Error type for Provider operations
///
/// `message` is a short, static summary ("Error creating SMB share"); the
/// remote error text goes into `detail`.
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub detail: Option<String>,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(detail) = self.full_detail() {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
            resource_id: None,
            cause: None,
        }
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Detail text followed by the cause, if any
    pub fn full_detail(&self) -> Option<String> {
        match (&self.detail, &self.cause) {
            (Some(d), Some(c)) => Some(format!("{}: {}", d, c)),
            (Some(d), None) => Some(d.clone()),
            (None, Some(c)) => Some(c.to_string()),
            (None, None) => None,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Main Provider trait
///
/// All operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "powerscale")
    fn name(&self) -> &'static str;

    /// Schemas of every resource type and data source this Provider handles
    fn schemas(&self) -> Vec<ResourceSchema>;

    /// Get the current state of a resource
    ///
    /// `identifier` is the remote id recorded in state. Without it (data
    /// sources), the lookup uses `attributes`. Returns `State::not_found()`
    /// if the resource does not exist.
    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
        attributes: &Attributes,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource, returning its state with the identifier set
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place
    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    fn delete(&self, state: &State) -> BoxFuture<'_, ProviderResult<()>>;

    /// Bring an existing remote object under management
    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>>;

    /// Schema for a single resource type
    fn schema(&self, resource_type: &str) -> Option<ResourceSchema> {
        self.schemas()
            .into_iter()
            .find(|s| s.resource_type == resource_type)
    }
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        (**self).schemas()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
        attributes: &Attributes,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(id, identifier, attributes)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(id, identifier, from, to)
    }

    fn delete(&self, state: &State) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(state)
    }

    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(id, import_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mock Provider for testing
    struct MockProvider;

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn schemas(&self) -> Vec<ResourceSchema> {
            vec![ResourceSchema::new("share")]
        }

        fn read(
            &self,
            id: &ResourceId,
            _identifier: Option<&str>,
            _attributes: &Attributes,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            Box::pin(async move { Ok(State::not_found(id)) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let id = resource.id.clone();
            let attrs = resource.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs).with_identifier("mock-id-123")) })
        }

        fn update(
            &self,
            id: &ResourceId,
            _identifier: &str,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let id = id.clone();
            let attrs = to.attributes.clone();
            Box::pin(async move { Ok(State::existing(id, attrs)) })
        }

        fn delete(&self, _state: &State) -> BoxFuture<'_, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
            let state = State::existing(id.clone(), Attributes::new()).with_identifier(import_id);
            Box::pin(async move { Ok(state) })
        }
    }

    #[tokio::test]
    async fn mock_provider_read_returns_not_found() {
        let provider = MockProvider;
        let id = ResourceId::new("share", "example");
        let state = provider.read(&id, None, &Attributes::new()).await.unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn mock_provider_create_returns_existing() {
        let provider = MockProvider;
        let resource = Resource::new("share", "example");
        let state = provider.create(&resource).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier, Some("mock-id-123".to_string()));
    }

    #[test]
    fn schema_lookup_by_type() {
        let provider: Box<dyn Provider> = Box::new(MockProvider);
        assert!(provider.schema("share").is_some());
        assert!(provider.schema("quota").is_none());
    }

    #[test]
    fn error_display_includes_detail() {
        let err = ProviderError::new("Error deleting quota")
            .with_detail("AEC_NOT_FOUND")
            .for_resource(ResourceId::new("quota", "home"));
        assert_eq!(
            err.to_string(),
            "[quota.home] Error deleting quota: AEC_NOT_FOUND"
        );
    }
}
