//! powerscale.subnet

use async_trait::async_trait;
use log::info;

use powerscale_client::PowerScaleClient;
use powerscale_client::network::{Subnet as SubnetModel, SubnetCreate, SubnetUpdate};
use powerscale_core::provider::{ProviderError, ProviderResult};
use powerscale_core::resource::{Attributes, Resource, ResourceId, State, Value};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::convert::{decode, string_attr, to_attributes};
use crate::handler::{ResourceHandler, fail, found, require_identifier};

const CREATE_ERROR: &str = "Error creating subnet";
const READ_ERROR: &str = "Error reading subnet";
const UPDATE_ERROR: &str = "Error updating subnet";
const DELETE_ERROR: &str = "Error deleting subnet";
const IMPORT_ERROR: &str = "Error importing subnet";

pub struct Subnet;

impl Subnet {
    fn state(&self, id: &ResourceId, subnet: &SubnetModel, groupnet: &str, name: &str) -> State {
        let mut attributes = to_attributes(subnet, &self.schema());
        attributes.insert("groupnet".to_string(), Value::from(groupnet));
        State::existing(id.clone(), attributes)
            .with_identifier(subnet.name.clone().unwrap_or_else(|| name.to_string()))
    }

    fn groupnet(message: &'static str, id: &ResourceId, attributes: &Attributes) -> ProviderResult<String> {
        string_attr(attributes, "groupnet").ok_or_else(|| {
            ProviderError::new(message)
                .for_resource(id.clone())
                .with_detail("groupnet is not known")
        })
    }
}

#[async_trait]
impl ResourceHandler for Subnet {
    fn resource_type(&self) -> &'static str {
        "subnet"
    }

    fn schema(&self) -> ResourceSchema {
        let address_range = AttributeType::Struct(vec![
            AttributeSchema::new("low", types::ip_address()).required(),
            AttributeSchema::new("high", types::ip_address()).required(),
        ]);

        ResourceSchema::new("subnet")
            .with_description("A subnet within a groupnet")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(
                AttributeSchema::new("groupnet", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("addr_family", AttributeType::enumeration(&["ipv4", "ipv6"]))
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("prefixlen", types::positive_int()).required())
            .attribute(AttributeSchema::new("description", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("gateway", types::ip_address()).optional_computed())
            .attribute(AttributeSchema::new("gateway_priority", AttributeType::Int).optional_computed())
            .attribute(AttributeSchema::new("mtu", types::positive_int()).optional_computed())
            .attribute(AttributeSchema::new("vlan_enabled", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("vlan_id", AttributeType::Int).optional_computed())
            .attribute(
                AttributeSchema::new("sc_service_addrs", AttributeType::list_of(address_range))
                    .optional_computed(),
            )
            .attribute(AttributeSchema::new("sc_service_name", AttributeType::String).optional_computed())
            .attribute(
                AttributeSchema::new("dsr_addrs", AttributeType::list_of(types::ip_address()))
                    .optional_computed()
                    .unordered(),
            )
            .attribute(AttributeSchema::new("pools", AttributeType::list_of(AttributeType::String)).computed())
            .attribute(AttributeSchema::new("id", AttributeType::String).computed())
    }

    async fn read(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: Option<&str>,
        attributes: &Attributes,
    ) -> ProviderResult<State> {
        let Some(name) = identifier else {
            return Ok(State::not_found(id.clone()));
        };
        let groupnet = Self::groupnet(READ_ERROR, id, attributes)?;
        match found(client.get_subnet(&groupnet, name).await).map_err(|e| fail(READ_ERROR, id, e))? {
            Some(subnet) => Ok(self.state(id, &subnet, &groupnet, name)),
            None => Ok(State::not_found(id.clone())),
        }
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let groupnet = Self::groupnet(CREATE_ERROR, id, &resource.attributes)?;
        let body: SubnetCreate =
            decode(&resource.attributes, &self.schema()).map_err(|e| fail(CREATE_ERROR, id, e))?;
        client
            .create_subnet(&groupnet, &body)
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        info!("created subnet {}.{}", groupnet, body.name);

        let subnet = client
            .get_subnet(&groupnet, &body.name)
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        Ok(self.state(id, &subnet, &groupnet, &body.name))
    }

    async fn update(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: &str,
        _from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let groupnet = Self::groupnet(UPDATE_ERROR, id, &to.attributes)?;
        let body: SubnetUpdate =
            decode(&to.attributes, &self.schema()).map_err(|e| fail(UPDATE_ERROR, id, e))?;
        client
            .update_subnet(&groupnet, identifier, &body)
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;

        let name = body.name.clone().unwrap_or_else(|| identifier.to_string());
        let subnet = client
            .get_subnet(&groupnet, &name)
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;
        Ok(self.state(id, &subnet, &groupnet, &name))
    }

    async fn delete(&self, client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        let name = require_identifier(DELETE_ERROR, state)?;
        let groupnet = Self::groupnet(DELETE_ERROR, &state.id, &state.attributes)?;
        client
            .delete_subnet(&groupnet, name)
            .await
            .map_err(|e| fail(DELETE_ERROR, &state.id, e))
    }

    /// Import id is `groupnet.subnet`
    async fn import(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        import_id: &str,
    ) -> ProviderResult<State> {
        let Some((groupnet, name)) = import_id.split_once('.') else {
            return Err(ProviderError::new(IMPORT_ERROR)
                .for_resource(id.clone())
                .with_detail(format!(
                    "expected import id '<groupnet>.<subnet>', got '{}'",
                    import_id
                )));
        };
        let subnet = client
            .get_subnet(groupnet, name)
            .await
            .map_err(|e| fail(IMPORT_ERROR, id, e))?;
        Ok(self.state(id, &subnet, groupnet, name))
    }
}
