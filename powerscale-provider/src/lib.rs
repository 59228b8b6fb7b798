//! PowerScale Provider
//!
//! Maps OneFS objects onto the create/read/update/delete/import lifecycle.
//!
//! ## Module Structure
//!
//! - `config` - Provider block and environment settings
//! - `convert` - Attribute/JSON conversion driven by schemas
//! - `handler` - The `ResourceHandler` trait
//! - `provider` - PowerScaleProvider implementation
//! - `resources` - One handler per resource type

pub mod config;
pub mod convert;
pub mod handler;
pub mod provider;
pub mod resources;

// Re-export main types
pub use handler::ResourceHandler;
pub use provider::{PowerScaleProvider, schemas};

use powerscale_core::provider::{BoxFuture, Provider, ProviderResult};
use powerscale_core::resource::{Attributes, Resource, ResourceId, State};
use powerscale_core::schema::ResourceSchema;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for PowerScaleProvider {
    fn name(&self) -> &'static str {
        "powerscale"
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        self.resource_schemas()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
        attributes: &Attributes,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        let attributes = attributes.clone();
        Box::pin(async move {
            self.read_resource(&id, identifier.as_deref(), &attributes)
                .await
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&id, &identifier, &from, &to).await })
    }

    fn delete(&self, state: &State) -> BoxFuture<'_, ProviderResult<()>> {
        let state = state.clone();
        Box::pin(async move { self.delete_resource(&state).await })
    }

    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let import_id = import_id.to_string();
        Box::pin(async move { self.import_resource(&id, &import_id).await })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use powerscale_client::{MemoryTransport, PowerScaleClient};
    use serde_json::json;

    /// Client backed by an in-memory transport
    pub fn client() -> (Arc<MemoryTransport>, PowerScaleClient) {
        let transport = Arc::new(MemoryTransport::new());
        let client = PowerScaleClient::with_transport(transport.clone());
        (transport, client)
    }

    pub fn zone_response(id: i64, name: &str) -> serde_json::Value {
        json!({"zones": [{
            "zone_id": id,
            "id": name,
            "name": name,
            "path": "/ifs/hr",
            "groupnet": "groupnet0"
        }]})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerscale_client::Method;
    use powerscale_core::resource::Value;
    use serde_json::json;

    #[tokio::test]
    async fn write_only_values_survive_create() {
        let (transport, client) = testing::client();
        transport
            .on(Method::Post, "/platform/11/auth/providers/ldap", 201, json!({"id": "corp"}))
            .on(
                Method::Get,
                "/platform/11/auth/providers/ldap/corp",
                200,
                json!({"ldap": [{"id": "corp", "name": "corp", "base_dn": "dc=corp"}]}),
            );

        let provider = PowerScaleProvider::with_client(client);
        let resource = Resource::new("ldap_provider", "corp")
            .with_attribute("name", "corp")
            .with_attribute("base_dn", "dc=corp")
            .with_attribute("server_uris", Value::List(vec![Value::from("ldap://a")]))
            .with_attribute("bind_password", "pw");
        let state = provider.create(&resource).await.unwrap();
        assert_eq!(state.attributes.get("bind_password"), Some(&Value::from("pw")));
    }

    #[tokio::test]
    async fn unknown_type_is_an_error() {
        let (_transport, client) = testing::client();
        let provider = PowerScaleProvider::with_client(client);
        let id = ResourceId::new("snapshot", "daily");
        let err = provider.read(&id, Some("1"), &Attributes::new()).await.unwrap_err();
        assert!(err.message.contains("Unknown resource type"));
    }

    #[test]
    fn every_schema_is_exposed() {
        let (_transport, client) = testing::client();
        let provider = PowerScaleProvider::with_client(client);
        assert!(provider.schema("smb_share").is_some());
        assert!(provider.schema("cluster").is_some());
        assert_eq!(provider.schemas().len(), schemas().len());
    }
}
