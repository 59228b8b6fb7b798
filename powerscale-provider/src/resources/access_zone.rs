//! powerscale.access_zone

use async_trait::async_trait;
use log::info;

use powerscale_client::PowerScaleClient;
use powerscale_client::zones::{Zone, ZoneCreate, ZoneUpdate};
use powerscale_core::provider::ProviderResult;
use powerscale_core::resource::{Attributes, Resource, ResourceId, State};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::convert::{decode, to_attributes};
use crate::handler::{ResourceHandler, fail, found, require_identifier};

const CREATE_ERROR: &str = "Error creating access zone";
const READ_ERROR: &str = "Error reading access zone";
const UPDATE_ERROR: &str = "Error updating access zone";
const DELETE_ERROR: &str = "Error deleting access zone";
const IMPORT_ERROR: &str = "Error importing access zone";

pub struct AccessZone;

impl AccessZone {
    fn state(&self, id: &ResourceId, zone: &Zone) -> State {
        let attributes = to_attributes(zone, &self.schema());
        let state = State::existing(id.clone(), attributes);
        match zone.zone_id {
            Some(zone_id) => state.with_identifier(zone_id.to_string()),
            None => state,
        }
    }
}

#[async_trait]
impl ResourceHandler for AccessZone {
    fn resource_type(&self) -> &'static str {
        "access_zone"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("access_zone")
            .with_description("An access zone isolating data and authentication per tenant")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(
                AttributeSchema::new("path", types::ifs_path())
                    .required()
                    .force_new()
                    .with_description("Base directory of the zone"),
            )
            .attribute(
                AttributeSchema::new("groupnet", AttributeType::String)
                    .optional_computed()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("auth_providers", AttributeType::list_of(AttributeType::String))
                    .optional_computed(),
            )
            .attribute(AttributeSchema::new("alternate_system_provider", AttributeType::String).optional_computed())
            .attribute(
                AttributeSchema::new("create_path", AttributeType::Bool)
                    .write_only()
                    .with_description("Create the base directory if it does not exist"),
            )
            .attribute(AttributeSchema::new("home_directory_umask", AttributeType::Int).optional_computed())
            .attribute(AttributeSchema::new("skeleton_directory", AttributeType::String).optional_computed())
            .attribute(
                AttributeSchema::new("map_untrusted", AttributeType::String).optional_computed(),
            )
            .attribute(AttributeSchema::new("netbios_name", AttributeType::String).optional_computed())
            .attribute(
                AttributeSchema::new(
                    "user_mapping_rules",
                    AttributeType::list_of(AttributeType::String),
                )
                .optional_computed(),
            )
            .attribute(AttributeSchema::new("zone_id", AttributeType::Int).computed())
            .attribute(AttributeSchema::new("system_provider", AttributeType::String).computed())
            .attribute(AttributeSchema::new("system", AttributeType::Bool).computed())
    }

    async fn read(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: Option<&str>,
        _attributes: &Attributes,
    ) -> ProviderResult<State> {
        let Some(identifier) = identifier else {
            return Ok(State::not_found(id.clone()));
        };
        match found(client.get_zone(identifier).await).map_err(|e| fail(READ_ERROR, id, e))? {
            Some(zone) => Ok(self.state(id, &zone)),
            None => Ok(State::not_found(id.clone())),
        }
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let body: ZoneCreate =
            decode(&resource.attributes, &self.schema()).map_err(|e| fail(CREATE_ERROR, id, e))?;
        let zone_id = client
            .create_zone(&body)
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        info!("created access zone {} (id {})", body.name, zone_id);

        let zone = client
            .get_zone(&zone_id.to_string())
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        Ok(self.state(id, &zone))
    }

    async fn update(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: &str,
        _from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let body: ZoneUpdate =
            decode(&to.attributes, &self.schema()).map_err(|e| fail(UPDATE_ERROR, id, e))?;
        client
            .update_zone(identifier, &body)
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;

        let zone = client
            .get_zone(identifier)
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;
        Ok(self.state(id, &zone))
    }

    async fn delete(&self, client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        let identifier = require_identifier(DELETE_ERROR, state)?;
        client
            .delete_zone(identifier)
            .await
            .map_err(|e| fail(DELETE_ERROR, &state.id, e))
    }

    /// Import by zone name
    async fn import(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        import_id: &str,
    ) -> ProviderResult<State> {
        let zone = client
            .get_zone(import_id)
            .await
            .map_err(|e| fail(IMPORT_ERROR, id, e))?;
        Ok(self.state(id, &zone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, zone_response};
    use powerscale_client::Method;
    use powerscale_core::resource::Value;
    use serde_json::json;

    fn resource() -> Resource {
        Resource::new("access_zone", "hr")
            .with_attribute("name", "hr")
            .with_attribute("path", "/ifs/hr")
            .with_attribute("create_path", true)
            .with_attribute("_binding", "hr")
    }

    #[tokio::test]
    async fn create_reads_back_the_zone() {
        let (transport, client) = client();
        transport
            .on(Method::Post, "/platform/3/zones", 201, json!({"id": 5}))
            .on(Method::Get, "/platform/3/zones/5", 200, zone_response(5, "hr"));

        let state = AccessZone.create(&client, &resource()).await.unwrap();
        assert_eq!(state.identifier.as_deref(), Some("5"));
        assert_eq!(state.attributes.get("zone_id"), Some(&Value::Int(5)));
        assert_eq!(state.attributes.get("path"), Some(&Value::from("/ifs/hr")));

        let body = transport.requests_to(Method::Post, "/platform/3/zones")[0]
            .body
            .clone()
            .unwrap();
        assert_eq!(body["name"], "hr");
        assert_eq!(body["create_path"], true);
        assert!(body.get("_binding").is_none());
    }

    #[tokio::test]
    async fn update_sends_only_mutable_fields() {
        let (transport, client) = client();
        transport
            .on(Method::Put, "/platform/3/zones/5", 204, json!(null))
            .on(Method::Get, "/platform/3/zones/5", 200, zone_response(5, "hr"));

        let to = resource().with_attribute(
            "auth_providers",
            Value::List(vec![Value::from("lsa-local-provider:hr")]),
        );
        let from = State::existing(to.id.clone(), Attributes::new()).with_identifier("5");
        AccessZone
            .update(&client, &to.id, "5", &from, &to)
            .await
            .unwrap();

        let body = transport.requests_to(Method::Put, "/platform/3/zones/5")[0]
            .body
            .clone()
            .unwrap();
        assert!(body.get("path").is_none());
        assert!(body.get("create_path").is_none());
        assert_eq!(body["auth_providers"], json!(["lsa-local-provider:hr"]));
    }

    #[tokio::test]
    async fn missing_zone_reads_as_not_found() {
        let (_transport, client) = client();
        let id = ResourceId::new("access_zone", "hr");
        let state = AccessZone
            .read(&client, &id, Some("9"), &Attributes::new())
            .await
            .unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn import_by_name_records_zone_id() {
        let (transport, client) = client();
        transport.on(Method::Get, "/platform/3/zones/hr", 200, zone_response(5, "hr"));

        let id = ResourceId::new("access_zone", "hr");
        let state = AccessZone.import(&client, &id, "hr").await.unwrap();
        assert_eq!(state.identifier(), "5");
    }

    #[tokio::test]
    async fn api_failure_keeps_static_summary() {
        let (transport, client) = client();
        transport.on(
            Method::Delete,
            "/platform/3/zones/5",
            500,
            json!({"errors": [{"code": "AEC_EXCEPTION", "message": "zone busy"}]}),
        );
        let state = State::existing(ResourceId::new("access_zone", "hr"), Attributes::new())
            .with_identifier("5");
        let err = AccessZone.delete(&client, &state).await.unwrap_err();
        assert_eq!(err.message, DELETE_ERROR);
        assert!(err.to_string().contains("zone busy"));
    }
}
