//! powerscale.role

use async_trait::async_trait;
use log::info;

use powerscale_client::PowerScaleClient;
use powerscale_client::auth::{Persona, Role as RoleModel, RoleParams};
use powerscale_core::provider::ProviderResult;
use powerscale_core::resource::{Attributes, Resource, ResourceId, State, Value};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use crate::convert::{decode, parse_zone_id, string_attr, string_list_attr, to_attributes};
use crate::handler::{ResourceHandler, fail, found, require_identifier};

const CREATE_ERROR: &str = "Error creating role";
const READ_ERROR: &str = "Error reading role";
const UPDATE_ERROR: &str = "Error updating role";
const DELETE_ERROR: &str = "Error deleting role";
const IMPORT_ERROR: &str = "Error importing role";

pub struct Role;

impl Role {
    fn state(&self, id: &ResourceId, role: &RoleModel, role_id: &str, zone: Option<&str>) -> State {
        let mut attributes = to_attributes(role, &self.schema());
        let members: Vec<Value> = role
            .members
            .iter()
            .filter_map(|m| m.name.clone().or_else(|| m.id.clone()))
            .map(Value::String)
            .collect();
        attributes.insert("members".to_string(), Value::List(members));
        if let Some(zone) = zone {
            attributes.insert("zone".to_string(), Value::from(zone));
        }
        State::existing(id.clone(), attributes)
            .with_identifier(role.id.clone().unwrap_or_else(|| role_id.to_string()))
    }

    /// Request body; members are configured as user names
    fn params(&self, attributes: &Attributes) -> Result<RoleParams, serde_json::Error> {
        let members = string_list_attr(attributes, "members");
        let mut attributes = attributes.clone();
        attributes.remove("members");
        let mut params: RoleParams = decode(&attributes, &self.schema())?;
        params.members = members.map(|names| names.into_iter().map(Persona::user).collect());
        Ok(params)
    }
}

#[async_trait]
impl ResourceHandler for Role {
    fn resource_type(&self) -> &'static str {
        "role"
    }

    fn schema(&self) -> ResourceSchema {
        let privilege = AttributeType::Struct(vec![
            AttributeSchema::new("id", AttributeType::String).required(),
            AttributeSchema::new("permission", AttributeType::enumeration(&["r", "w", "x", "-"])),
            AttributeSchema::new("name", AttributeType::String).computed(),
        ]);

        ResourceSchema::new("role")
            .with_description("An RBAC role granting privileges to its members")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("description", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("zone", AttributeType::String).force_new())
            .attribute(
                AttributeSchema::new("privileges", AttributeType::list_of(privilege))
                    .optional_computed()
                    .unordered(),
            )
            .attribute(
                AttributeSchema::new("members", AttributeType::list_of(AttributeType::String))
                    .optional_computed()
                    .unordered()
                    .with_description("User names"),
            )
            .attribute(AttributeSchema::new("id", AttributeType::String).computed())
    }

    async fn read(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: Option<&str>,
        attributes: &Attributes,
    ) -> ProviderResult<State> {
        let Some(role_id) = identifier else {
            return Ok(State::not_found(id.clone()));
        };
        let zone = string_attr(attributes, "zone");
        match found(client.get_role(role_id, zone.as_deref()).await).map_err(|e| fail(READ_ERROR, id, e))? {
            Some(role) => Ok(self.state(id, &role, role_id, zone.as_deref())),
            None => Ok(State::not_found(id.clone())),
        }
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let zone = string_attr(&resource.attributes, "zone");
        let body = self
            .params(&resource.attributes)
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        let role_id = client
            .create_role(&body, zone.as_deref())
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        info!("created role {}", role_id);

        let role = client
            .get_role(&role_id, zone.as_deref())
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        Ok(self.state(id, &role, &role_id, zone.as_deref()))
    }

    async fn update(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: &str,
        _from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let zone = string_attr(&to.attributes, "zone");
        let body = self.params(&to.attributes).map_err(|e| fail(UPDATE_ERROR, id, e))?;
        client
            .update_role(identifier, &body, zone.as_deref())
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;

        // Renaming a role changes its id
        let role_id = body.name.clone().unwrap_or_else(|| identifier.to_string());
        let role = client
            .get_role(&role_id, zone.as_deref())
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;
        Ok(self.state(id, &role, &role_id, zone.as_deref()))
    }

    async fn delete(&self, client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        let role_id = require_identifier(DELETE_ERROR, state)?;
        let zone = string_attr(&state.attributes, "zone");
        client
            .delete_role(role_id, zone.as_deref())
            .await
            .map_err(|e| fail(DELETE_ERROR, &state.id, e))
    }

    /// Import id is `zone:role` or `role`
    async fn import(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        import_id: &str,
    ) -> ProviderResult<State> {
        let (zone, role_id) = parse_zone_id(import_id);
        let role = client
            .get_role(&role_id, zone.as_deref())
            .await
            .map_err(|e| fail(IMPORT_ERROR, id, e))?;
        Ok(self.state(id, &role, &role_id, zone.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::client;
    use powerscale_client::Method;
    use serde_json::json;
    use std::collections::HashMap;

    fn role_response(name: &str) -> serde_json::Value {
        json!({"roles": [{
            "id": name,
            "name": name,
            "description": "Storage operators",
            "members": [{"id": "UID:2001", "name": "alice", "type": "user"}],
            "privileges": [{"id": "ISI_PRIV_QUOTA", "name": "Quota", "permission": "w"}]
        }]})
    }

    #[tokio::test]
    async fn create_sends_members_as_personas() {
        let (transport, client) = client();
        transport
            .on(Method::Post, "/platform/14/auth/roles", 201, json!({"id": "operators"}))
            .on(Method::Get, "/platform/14/auth/roles/operators", 200, role_response("operators"));

        let mut privilege = HashMap::new();
        privilege.insert("id".to_string(), Value::from("ISI_PRIV_QUOTA"));
        privilege.insert("permission".to_string(), Value::from("w"));
        let resource = Resource::new("role", "operators")
            .with_attribute("name", "operators")
            .with_attribute("members", Value::List(vec![Value::from("alice")]))
            .with_attribute("privileges", Value::List(vec![Value::Map(privilege)]));
        let state = Role.create(&client, &resource).await.unwrap();

        assert_eq!(state.identifier(), "operators");
        assert_eq!(
            state.attributes.get("members"),
            Some(&Value::List(vec![Value::from("alice")]))
        );

        let body = transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["members"], json!([{"name": "alice", "type": "user"}]));
        assert_eq!(body["privileges"], json!([{"id": "ISI_PRIV_QUOTA", "permission": "w"}]));
    }

    #[tokio::test]
    async fn rename_reads_under_new_id() {
        let (transport, client) = client();
        transport
            .on(Method::Put, "/platform/14/auth/roles/operators", 204, json!(null))
            .on(Method::Get, "/platform/14/auth/roles/storage-ops", 200, role_response("storage-ops"));

        let to = Resource::new("role", "operators")
            .with_attribute("name", "storage-ops")
            .with_attribute("zone", "hr");
        let from = State::existing(to.id.clone(), Attributes::new()).with_identifier("operators");
        let state = Role.update(&client, &to.id, "operators", &from, &to).await.unwrap();

        assert_eq!(state.identifier(), "storage-ops");
        assert_eq!(transport.requests()[0].query_value("zone"), Some("hr"));
        let body = transport.requests()[0].body.clone().unwrap();
        assert!(body.get("members").is_none());
    }
}
