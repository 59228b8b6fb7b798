//! powerscale.groupnet

use async_trait::async_trait;
use log::{info, warn};

use powerscale_client::PowerScaleClient;
use powerscale_client::network::{Groupnet as GroupnetModel, GroupnetParams};
use powerscale_core::provider::{ProviderError, ProviderResult};
use powerscale_core::resource::{Attributes, Resource, ResourceId, State};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::convert::{decode, string_attr, to_attributes};
use crate::handler::{ResourceHandler, fail, found, require_identifier};

const CREATE_ERROR: &str = "Error creating groupnet";
const READ_ERROR: &str = "Error reading groupnet";
const UPDATE_ERROR: &str = "Error updating groupnet";
const DELETE_ERROR: &str = "Error deleting groupnet";
const IMPORT_ERROR: &str = "Error importing groupnet";

pub struct Groupnet;

impl Groupnet {
    fn state(&self, id: &ResourceId, groupnet: &GroupnetModel, name: &str) -> State {
        State::existing(id.clone(), to_attributes(groupnet, &self.schema())).with_identifier(
            groupnet.name.clone().unwrap_or_else(|| name.to_string()),
        )
    }
}

#[async_trait]
impl ResourceHandler for Groupnet {
    fn resource_type(&self) -> &'static str {
        "groupnet"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("groupnet")
            .with_description("A groupnet: DNS settings shared by a set of subnets")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("description", AttributeType::String).optional_computed())
            .attribute(
                AttributeSchema::new("dns_servers", AttributeType::list_of(types::ip_address()))
                    .optional_computed(),
            )
            .attribute(
                AttributeSchema::new("dns_search", AttributeType::list_of(AttributeType::String))
                    .optional_computed(),
            )
            .attribute(AttributeSchema::new("dns_cache_enabled", AttributeType::Bool).optional_computed())
            .attribute(
                AttributeSchema::new("allow_wildcard_subdomains", AttributeType::Bool).optional_computed(),
            )
            .attribute(
                AttributeSchema::new("server_side_dns_search", AttributeType::Bool).optional_computed(),
            )
            .attribute(AttributeSchema::new("subnets", AttributeType::list_of(AttributeType::String)).computed())
            .attribute(AttributeSchema::new("id", AttributeType::String).computed())
    }

    async fn read(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: Option<&str>,
        _attributes: &Attributes,
    ) -> ProviderResult<State> {
        let Some(name) = identifier else {
            return Ok(State::not_found(id.clone()));
        };
        match found(client.get_groupnet(name).await).map_err(|e| fail(READ_ERROR, id, e))? {
            Some(groupnet) => Ok(self.state(id, &groupnet, name)),
            None => Ok(State::not_found(id.clone())),
        }
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let body: GroupnetParams =
            decode(&resource.attributes, &self.schema()).map_err(|e| fail(CREATE_ERROR, id, e))?;
        let name = client
            .create_groupnet(&body)
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        info!("created groupnet {}", name);

        match client.get_groupnet(&name).await {
            Ok(groupnet) => Ok(self.state(id, &groupnet, &name)),
            Err(read_err) => {
                // Do not leave an unmanaged groupnet behind
                warn!("reading new groupnet {} failed, deleting it", name);
                if let Err(delete_err) = client.delete_groupnet(&name).await {
                    return Err(ProviderError::new(CREATE_ERROR)
                        .for_resource(id.clone())
                        .with_detail(format!(
                            "read after create failed ({}) and the groupnet could not be removed",
                            read_err
                        ))
                        .with_cause(delete_err));
                }
                Err(fail(CREATE_ERROR, id, read_err))
            }
        }
    }

    async fn update(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: &str,
        _from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let body: GroupnetParams =
            decode(&to.attributes, &self.schema()).map_err(|e| fail(UPDATE_ERROR, id, e))?;
        client
            .update_groupnet(identifier, &body)
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;

        // A rename moves the groupnet to its new name
        let name = string_attr(&to.attributes, "name").unwrap_or_else(|| identifier.to_string());
        let groupnet = client
            .get_groupnet(&name)
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;
        Ok(self.state(id, &groupnet, &name))
    }

    async fn delete(&self, client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        let name = require_identifier(DELETE_ERROR, state)?;
        client
            .delete_groupnet(name)
            .await
            .map_err(|e| fail(DELETE_ERROR, &state.id, e))
    }

    async fn import(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        import_id: &str,
    ) -> ProviderResult<State> {
        let groupnet = client
            .get_groupnet(import_id)
            .await
            .map_err(|e| fail(IMPORT_ERROR, id, e))?;
        Ok(self.state(id, &groupnet, import_id))
    }
}
