//! powerscale.smb_share

use async_trait::async_trait;
use log::info;

use powerscale_client::PowerScaleClient;
use powerscale_client::protocols::{SmbShare as SmbShareModel, SmbShareParams};
use powerscale_core::provider::ProviderResult;
use powerscale_core::resource::{Attributes, Resource, ResourceId, State, Value};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::convert::{decode, parse_zone_id, string_attr, to_attributes};
use crate::handler::{ResourceHandler, fail, found, require_identifier};
use crate::resources::persona_type;

const CREATE_ERROR: &str = "Error creating SMB share";
const READ_ERROR: &str = "Error reading SMB share";
const UPDATE_ERROR: &str = "Error updating SMB share";
const DELETE_ERROR: &str = "Error deleting SMB share";
const IMPORT_ERROR: &str = "Error importing SMB share";

pub struct SmbShare;

impl SmbShare {
    fn state(&self, id: &ResourceId, share: &SmbShareModel, name: &str, zone: Option<&str>) -> State {
        let mut attributes = to_attributes(share, &self.schema());
        if let Some(zone) = zone {
            attributes.insert("zone".to_string(), Value::from(zone));
        }
        State::existing(id.clone(), attributes)
            .with_identifier(share.name.clone().unwrap_or_else(|| name.to_string()))
    }
}

#[async_trait]
impl ResourceHandler for SmbShare {
    fn resource_type(&self) -> &'static str {
        "smb_share"
    }

    fn schema(&self) -> ResourceSchema {
        let permission = AttributeType::Struct(vec![
            AttributeSchema::new("permission", AttributeType::enumeration(&["full", "change", "read"]))
                .required(),
            AttributeSchema::new("permission_type", AttributeType::enumeration(&["allow", "deny"]))
                .required(),
            AttributeSchema::new("trustee", persona_type()).required(),
        ]);

        ResourceSchema::new("smb_share")
            .with_description("An SMB share")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("path", types::ifs_path()).required())
            .attribute(AttributeSchema::new("zone", AttributeType::String).force_new())
            .attribute(AttributeSchema::new("create_path", AttributeType::Bool).write_only())
            .attribute(AttributeSchema::new("description", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("browsable", AttributeType::Bool).optional_computed())
            .attribute(
                AttributeSchema::new("access_based_enumeration", AttributeType::Bool).optional_computed(),
            )
            .attribute(AttributeSchema::new("ca_timeout", AttributeType::Int).optional_computed())
            .attribute(
                AttributeSchema::new("continuously_available", AttributeType::Bool).optional_computed(),
            )
            .attribute(AttributeSchema::new("oplocks", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("ntfs_acl_support", AttributeType::Bool).optional_computed())
            .attribute(
                AttributeSchema::new("host_acl", AttributeType::list_of(AttributeType::String))
                    .optional_computed()
                    .unordered(),
            )
            .attribute(
                AttributeSchema::new("permissions", AttributeType::list_of(permission))
                    .optional_computed()
                    .with_description("Share-level permissions; order is significant"),
            )
            .attribute(
                AttributeSchema::new("run_as_root", AttributeType::list_of(persona_type()))
                    .optional_computed()
                    .unordered(),
            )
            .attribute(AttributeSchema::new("zid", AttributeType::Int).computed())
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
        let zone = string_attr(attributes, "zone");
        match found(client.get_smb_share(name, zone.as_deref()).await)
            .map_err(|e| fail(READ_ERROR, id, e))?
        {
            Some(share) => Ok(self.state(id, &share, name, zone.as_deref())),
            None => Ok(State::not_found(id.clone())),
        }
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let zone = string_attr(&resource.attributes, "zone");
        let body: SmbShareParams =
            decode(&resource.attributes, &self.schema()).map_err(|e| fail(CREATE_ERROR, id, e))?;
        let name = client
            .create_smb_share(&body, zone.as_deref())
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        info!("created SMB share {}", name);

        let share = client
            .get_smb_share(&name, zone.as_deref())
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        Ok(self.state(id, &share, &name, zone.as_deref()))
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
        let mut body: SmbShareParams =
            decode(&to.attributes, &self.schema()).map_err(|e| fail(UPDATE_ERROR, id, e))?;
        body.create_path = None;
        client
            .update_smb_share(identifier, &body, zone.as_deref())
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;

        // A rename moves the share to its new name
        let name = body.name.clone().unwrap_or_else(|| identifier.to_string());
        let share = client
            .get_smb_share(&name, zone.as_deref())
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;
        Ok(self.state(id, &share, &name, zone.as_deref()))
    }

    async fn delete(&self, client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        let name = require_identifier(DELETE_ERROR, state)?;
        let zone = string_attr(&state.attributes, "zone");
        client
            .delete_smb_share(name, zone.as_deref())
            .await
            .map_err(|e| fail(DELETE_ERROR, &state.id, e))
    }

    /// Import id is `zone:name` or `name`
    async fn import(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        import_id: &str,
    ) -> ProviderResult<State> {
        let (zone, name) = parse_zone_id(import_id);
        let share = client
            .get_smb_share(&name, zone.as_deref())
            .await
            .map_err(|e| fail(IMPORT_ERROR, id, e))?;
        Ok(self.state(id, &share, &name, zone.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::client;
    use powerscale_client::Method;
    use serde_json::json;
    use std::collections::HashMap;

    const PATH: &str = "/platform/7/protocols/smb/shares/eng";

    fn share_response(name: &str) -> serde_json::Value {
        json!({"shares": [{
            "id": name,
            "name": name,
            "path": "/ifs/eng",
            "browsable": true,
            "zid": 1,
            "permissions": [{
                "permission": "full",
                "permission_type": "allow",
                "trustee": {"id": "SID:S-1-1-0", "name": "Everyone", "type": "wellknown"}
            }]
        }]})
    }

    fn permissions_block() -> Value {
        let mut trustee = HashMap::new();
        trustee.insert("id".to_string(), Value::from("SID:S-1-1-0"));
        let mut perm = HashMap::new();
        perm.insert("permission".to_string(), Value::from("full"));
        perm.insert("permission_type".to_string(), Value::from("allow"));
        perm.insert("trustee".to_string(), Value::List(vec![Value::Map(trustee)]));
        Value::List(vec![Value::Map(perm)])
    }

    #[tokio::test]
    async fn create_sends_nested_permissions() {
        let (transport, client) = client();
        transport
            .on(Method::Post, "/platform/7/protocols/smb/shares", 201, json!({"id": "eng"}))
            .on(Method::Get, PATH, 200, share_response("eng"));

        let resource = Resource::new("smb_share", "eng")
            .with_attribute("name", "eng")
            .with_attribute("path", "/ifs/eng")
            .with_attribute("create_path", true)
            .with_attribute("permissions", permissions_block());
        let state = SmbShare.create(&client, &resource).await.unwrap();
        assert_eq!(state.identifier(), "eng");
        assert_eq!(state.attributes.get("zid"), Some(&Value::Int(1)));

        let body = transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["create_path"], true);
        assert_eq!(body["permissions"][0]["trustee"], json!({"id": "SID:S-1-1-0"}));
    }

    #[tokio::test]
    async fn read_of_deleted_share_is_not_found() {
        let (_transport, client) = client();
        let id = ResourceId::new("smb_share", "eng");
        let state = SmbShare
            .read(&client, &id, Some("eng"), &Attributes::new())
            .await
            .unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn rename_changes_identifier() {
        let (transport, client) = client();
        transport
            .on(Method::Put, PATH, 204, json!(null))
            .on(
                Method::Get,
                "/platform/7/protocols/smb/shares/engineering",
                200,
                share_response("engineering"),
            );

        let to = Resource::new("smb_share", "eng")
            .with_attribute("name", "engineering")
            .with_attribute("path", "/ifs/eng")
            .with_attribute("zone", "hr");
        let from = State::existing(to.id.clone(), Attributes::new()).with_identifier("eng");
        let state = SmbShare.update(&client, &to.id, "eng", &from, &to).await.unwrap();
        assert_eq!(state.identifier(), "engineering");
        assert_eq!(state.attributes.get("zone"), Some(&Value::from("hr")));
        assert_eq!(transport.requests()[0].query_value("zone"), Some("hr"));
    }

    #[tokio::test]
    async fn import_defaults_to_system_zone() {
        let (transport, client) = client();
        transport.on(Method::Get, PATH, 200, share_response("eng"));

        let id = ResourceId::new("smb_share", "eng");
        let state = SmbShare.import(&client, &id, "eng").await.unwrap();
        assert!(!state.attributes.contains_key("zone"));
        assert!(transport.requests()[0].query.is_empty());
    }
}
