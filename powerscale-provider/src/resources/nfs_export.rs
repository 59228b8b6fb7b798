//! powerscale.nfs_export

use async_trait::async_trait;
use log::info;

use powerscale_client::PowerScaleClient;
use powerscale_client::protocols::{NfsExport as NfsExportModel, NfsExportParams};
use powerscale_core::provider::ProviderResult;
use powerscale_core::resource::{Attributes, Resource, ResourceId, State, Value};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::convert::{decode, parse_zone_id, string_attr, to_attributes};
use crate::handler::{ResourceHandler, fail, found, require_identifier};
use crate::resources::persona_type;

const CREATE_ERROR: &str = "Error creating NFS export";
const READ_ERROR: &str = "Error reading NFS export";
const UPDATE_ERROR: &str = "Error updating NFS export";
const DELETE_ERROR: &str = "Error deleting NFS export";
const IMPORT_ERROR: &str = "Error importing NFS export";

pub struct NfsExport;

impl NfsExport {
    fn state(&self, id: &ResourceId, export: &NfsExportModel, export_id: &str, zone: Option<&str>) -> State {
        let mut attributes = to_attributes(export, &self.schema());
        // The API reports the zone name even for System; keep what was configured
        attributes.remove("zone");
        if let Some(zone) = zone {
            attributes.insert("zone".to_string(), Value::from(zone));
        }
        let identifier = export
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| export_id.to_string());
        State::existing(id.clone(), attributes).with_identifier(identifier)
    }
}

fn mapping_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("enabled", AttributeType::Bool),
        AttributeSchema::new("user", persona_type()),
        AttributeSchema::new("primary_group", persona_type()),
    ])
}

#[async_trait]
impl ResourceHandler for NfsExport {
    fn resource_type(&self) -> &'static str {
        "nfs_export"
    }

    fn schema(&self) -> ResourceSchema {
        let clients = || AttributeType::list_of(AttributeType::String);

        ResourceSchema::new("nfs_export")
            .with_description("An NFS export of one or more directories")
            .attribute(
                AttributeSchema::new("paths", AttributeType::list_of(types::ifs_path()))
                    .required()
                    .unordered(),
            )
            .attribute(AttributeSchema::new("zone", AttributeType::String).force_new())
            .attribute(AttributeSchema::new("description", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("clients", clients()).optional_computed().unordered())
            .attribute(AttributeSchema::new("root_clients", clients()).optional_computed().unordered())
            .attribute(
                AttributeSchema::new("read_only_clients", clients())
                    .optional_computed()
                    .unordered(),
            )
            .attribute(
                AttributeSchema::new("read_write_clients", clients())
                    .optional_computed()
                    .unordered(),
            )
            .attribute(AttributeSchema::new("read_only", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("all_dirs", AttributeType::Bool).optional_computed())
            .attribute(
                AttributeSchema::new(
                    "security_flavors",
                    AttributeType::list_of(AttributeType::enumeration(&[
                        "unix", "krb5", "krb5i", "krb5p",
                    ])),
                )
                .optional_computed()
                .unordered(),
            )
            .attribute(AttributeSchema::new("map_root", mapping_type()).optional_computed())
            .attribute(AttributeSchema::new("map_all", mapping_type()).optional_computed())
            .attribute(AttributeSchema::new("id", AttributeType::Int).computed())
    }

    async fn read(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: Option<&str>,
        attributes: &Attributes,
    ) -> ProviderResult<State> {
        let Some(export_id) = identifier else {
            return Ok(State::not_found(id.clone()));
        };
        let zone = string_attr(attributes, "zone");
        match found(client.get_nfs_export(export_id, zone.as_deref()).await)
            .map_err(|e| fail(READ_ERROR, id, e))?
        {
            Some(export) => Ok(self.state(id, &export, export_id, zone.as_deref())),
            None => Ok(State::not_found(id.clone())),
        }
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let zone = string_attr(&resource.attributes, "zone");
        let body: NfsExportParams =
            decode(&resource.attributes, &self.schema()).map_err(|e| fail(CREATE_ERROR, id, e))?;
        let export_id = client
            .create_nfs_export(&body, zone.as_deref())
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?
            .to_string();
        info!("created NFS export {}", export_id);

        let export = client
            .get_nfs_export(&export_id, zone.as_deref())
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        Ok(self.state(id, &export, &export_id, zone.as_deref()))
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
        let body: NfsExportParams =
            decode(&to.attributes, &self.schema()).map_err(|e| fail(UPDATE_ERROR, id, e))?;
        client
            .update_nfs_export(identifier, &body, zone.as_deref())
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;

        let export = client
            .get_nfs_export(identifier, zone.as_deref())
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;
        Ok(self.state(id, &export, identifier, zone.as_deref()))
    }

    async fn delete(&self, client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        let export_id = require_identifier(DELETE_ERROR, state)?;
        let zone = string_attr(&state.attributes, "zone");
        client
            .delete_nfs_export(export_id, zone.as_deref())
            .await
            .map_err(|e| fail(DELETE_ERROR, &state.id, e))
    }

    /// Import id is `zone:id` or `id`
    async fn import(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        import_id: &str,
    ) -> ProviderResult<State> {
        let (zone, export_id) = parse_zone_id(import_id);
        let export = client
            .get_nfs_export(&export_id, zone.as_deref())
            .await
            .map_err(|e| fail(IMPORT_ERROR, id, e))?;
        Ok(self.state(id, &export, &export_id, zone.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::client;
    use powerscale_client::Method;
    use serde_json::json;
    use std::collections::HashMap;

    const PATH: &str = "/platform/4/protocols/nfs/exports/12";

    fn export_response() -> serde_json::Value {
        json!({"exports": [{
            "id": 12,
            "zone": "hr",
            "paths": ["/ifs/hr/projects"],
            "clients": ["10.0.0.0/24"],
            "read_only": false,
            "map_root": {
                "enabled": true,
                "user": {"id": "USER:nobody"},
                "primary_group": {"id": "GROUP:nobody"}
            }
        }]})
    }

    #[tokio::test]
    async fn create_uses_numeric_id() {
        let (transport, client) = client();
        transport
            .on(Method::Post, "/platform/4/protocols/nfs/exports", 201, json!({"id": 12}))
            .on(Method::Get, PATH, 200, export_response());

        let mut user = HashMap::new();
        user.insert("id".to_string(), Value::from("USER:nobody"));
        let mut map_root = HashMap::new();
        map_root.insert("enabled".to_string(), Value::Bool(true));
        map_root.insert("user".to_string(), Value::List(vec![Value::Map(user)]));

        let resource = Resource::new("nfs_export", "projects")
            .with_attribute("paths", Value::List(vec![Value::from("/ifs/hr/projects")]))
            .with_attribute("zone", "hr")
            .with_attribute("map_root", Value::List(vec![Value::Map(map_root)]));
        let state = NfsExport.create(&client, &resource).await.unwrap();

        assert_eq!(state.identifier(), "12");
        assert_eq!(state.attributes.get("id"), Some(&Value::Int(12)));
        assert_eq!(state.attributes.get("zone"), Some(&Value::from("hr")));

        let post = &transport.requests()[0];
        assert_eq!(post.query_value("zone"), Some("hr"));
        let body = post.body.clone().unwrap();
        assert_eq!(body["map_root"]["user"]["id"], "USER:nobody");
        assert!(body.get("zone").is_none());
    }

    #[tokio::test]
    async fn system_zone_export_has_no_zone_attribute() {
        let (transport, client) = client();
        transport.on(Method::Get, PATH, 200, export_response());

        let id = ResourceId::new("nfs_export", "projects");
        let state = NfsExport
            .read(&client, &id, Some("12"), &Attributes::new())
            .await
            .unwrap();
        assert!(state.exists);
        assert!(!state.attributes.contains_key("zone"));
    }

    #[tokio::test]
    async fn import_with_zone_prefix() {
        let (transport, client) = client();
        transport.on(Method::Get, PATH, 200, export_response());

        let id = ResourceId::new("nfs_export", "projects");
        let state = NfsExport.import(&client, &id, "hr:12").await.unwrap();
        assert_eq!(state.identifier(), "12");
        assert_eq!(transport.requests()[0].query_value("zone"), Some("hr"));
    }
}
