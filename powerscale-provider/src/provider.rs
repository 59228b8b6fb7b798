//! PowerScaleProvider - dispatches lifecycle calls to resource handlers

use std::collections::HashMap;

use log::debug;

use powerscale_client::{ClientConfig, PowerScaleClient};
use powerscale_core::provider::{ProviderError, ProviderResult};
use powerscale_core::resource::{Attributes, Resource, ResourceId, State};
use powerscale_core::schema::ResourceSchema;

use crate::convert::carry_write_only;
use crate::handler::ResourceHandler;
use crate::resources;

/// Provider for one PowerScale cluster
pub struct PowerScaleProvider {
    client: PowerScaleClient,
    handlers: HashMap<&'static str, Box<dyn ResourceHandler>>,
}

impl PowerScaleProvider {
    /// Connect using the given configuration
    pub fn new(config: &ClientConfig) -> ProviderResult<Self> {
        let client = PowerScaleClient::new(config).map_err(|e| {
            ProviderError::new("Unable to create PowerScale client").with_cause(e)
        })?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: PowerScaleClient) -> Self {
        let handlers = resources::all()
            .into_iter()
            .map(|h| (h.resource_type(), h))
            .collect();
        Self { client, handlers }
    }

    pub fn client(&self) -> &PowerScaleClient {
        &self.client
    }

    fn handler(&self, id: &ResourceId) -> ProviderResult<&dyn ResourceHandler> {
        self.handlers
            .get(id.resource_type.as_str())
            .map(|h| h.as_ref())
            .ok_or_else(|| {
                ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
                    .for_resource(id.clone())
            })
    }

    pub(crate) async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
        attributes: &Attributes,
    ) -> ProviderResult<State> {
        let handler = self.handler(id)?;
        debug!("reading {} ({:?})", id, identifier);
        handler.read(&self.client, id, identifier, attributes).await
    }

    pub(crate) async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        let handler = self.handler(&resource.id)?;
        let mut state = handler.create(&self.client, resource).await?;
        carry_write_only(&mut state.attributes, &resource.attributes, &handler.schema());
        Ok(state)
    }

    pub(crate) async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let handler = self.handler(id)?;
        let mut state = handler.update(&self.client, id, identifier, from, to).await?;
        carry_write_only(&mut state.attributes, &to.attributes, &handler.schema());
        Ok(state)
    }

    pub(crate) async fn delete_resource(&self, state: &State) -> ProviderResult<()> {
        let handler = self.handler(&state.id)?;
        handler.delete(&self.client, state).await
    }

    pub(crate) async fn import_resource(&self, id: &ResourceId, import_id: &str) -> ProviderResult<State> {
        let handler = self.handler(id)?;
        handler.import(&self.client, id, import_id).await
    }

    pub(crate) fn resource_schemas(&self) -> Vec<ResourceSchema> {
        schemas()
    }
}

/// Schemas of every resource type, in registration order
pub fn schemas() -> Vec<ResourceSchema> {
    resources::all().iter().map(|h| h.schema()).collect()
}
