//! ResourceHandler - lifecycle of one resource type

use async_trait::async_trait;

use powerscale_client::{ClientError, ClientResult, PowerScaleClient};
use powerscale_core::provider::{ProviderError, ProviderResult};
use powerscale_core::resource::{Attributes, Resource, ResourceId, State};
use powerscale_core::schema::ResourceSchema;

/// Create/Read/Update/Delete/Import for one resource type
///
/// Data sources only implement `read`; the other operations default to an
/// error.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn resource_type(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    /// Read the remote object; `State::not_found` when it is gone
    async fn read(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: Option<&str>,
        attributes: &Attributes,
    ) -> ProviderResult<State>;

    async fn create(&self, _client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        Err(read_only_error(&resource.id))
    }

    async fn update(
        &self,
        _client: &PowerScaleClient,
        id: &ResourceId,
        _identifier: &str,
        _from: &State,
        _to: &Resource,
    ) -> ProviderResult<State> {
        Err(read_only_error(id))
    }

    async fn delete(&self, _client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        Err(read_only_error(&state.id))
    }

    async fn import(
        &self,
        _client: &PowerScaleClient,
        id: &ResourceId,
        _import_id: &str,
    ) -> ProviderResult<State> {
        Err(ProviderError::new(format!("{} does not support import", id.resource_type))
            .for_resource(id.clone()))
    }
}

fn read_only_error(id: &ResourceId) -> ProviderError {
    ProviderError::new(format!("{} is a data source and cannot be modified", id.resource_type))
        .for_resource(id.clone())
}

/// Wrap a failure with the operation's static message
pub(crate) fn fail(
    message: &'static str,
    id: &ResourceId,
    err: impl std::error::Error + Send + Sync + 'static,
) -> ProviderError {
    ProviderError::new(message)
        .for_resource(id.clone())
        .with_cause(err)
}

/// Treat 404 as absence
pub(crate) fn found<T>(result: ClientResult<T>) -> ClientResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ClientError::Api { status: 404, .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Remote identifier required for update/delete
pub(crate) fn require_identifier<'a>(
    message: &'static str,
    state: &'a State,
) -> ProviderResult<&'a str> {
    state.identifier.as_deref().ok_or_else(|| {
        ProviderError::new(message)
            .for_resource(state.id.clone())
            .with_detail("state has no remote identifier")
    })
}
