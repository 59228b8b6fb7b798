//! powerscale.ldap_provider

use async_trait::async_trait;
use log::{info, warn};

use powerscale_client::PowerScaleClient;
use powerscale_client::auth::{LdapProvider as LdapModel, LdapProviderParams};
use powerscale_core::provider::{ProviderError, ProviderResult};
use powerscale_core::resource::{Attributes, Resource, ResourceId, State, Value};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use crate::convert::{decode, parse_zone_id, string_attr, to_attributes};
use crate::handler::{ResourceHandler, fail, found, require_identifier};

const CREATE_ERROR: &str = "Error creating LDAP provider";
const READ_ERROR: &str = "Error reading LDAP provider";
const UPDATE_ERROR: &str = "Error updating LDAP provider";
const DELETE_ERROR: &str = "Error deleting LDAP provider";
const IMPORT_ERROR: &str = "Error importing LDAP provider";

pub struct LdapProvider;

impl LdapProvider {
    fn state(&self, id: &ResourceId, provider: &LdapModel, name: &str, zone: Option<&str>) -> State {
        let mut attributes = to_attributes(provider, &self.schema());
        if let Some(zone) = zone {
            attributes.insert("zone".to_string(), Value::from(zone));
        }
        State::existing(id.clone(), attributes)
            .with_identifier(provider.name.clone().unwrap_or_else(|| name.to_string()))
    }
}

#[async_trait]
impl ResourceHandler for LdapProvider {
    fn resource_type(&self) -> &'static str {
        "ldap_provider"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("ldap_provider")
            .with_description("LDAP authentication provider")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("base_dn", AttributeType::String).required())
            .attribute(
                AttributeSchema::new("server_uris", AttributeType::list_of(AttributeType::String))
                    .required(),
            )
            .attribute(AttributeSchema::new("bind_dn", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("bind_password", AttributeType::String).write_only())
            .attribute(
                AttributeSchema::new("groupnet", AttributeType::String)
                    .optional_computed()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("zone", AttributeType::String)
                    .force_new()
                    .with_description("Access zone the provider is created in"),
            )
            .attribute(AttributeSchema::new("bind_timeout", AttributeType::Int).optional_computed())
            .attribute(AttributeSchema::new("search_timeout", AttributeType::Int).optional_computed())
            .attribute(
                AttributeSchema::new(
                    "search_scope",
                    AttributeType::enumeration(&["base", "onelevel", "subtree", "children"]),
                )
                .optional_computed(),
            )
            .attribute(
                AttributeSchema::new("require_secure_connection", AttributeType::Bool).optional_computed(),
            )
            .attribute(AttributeSchema::new("ignore_tls_errors", AttributeType::Bool).optional_computed())
            .attribute(
                AttributeSchema::new("certificate_authority_file", AttributeType::String).optional_computed(),
            )
            .attribute(AttributeSchema::new("status", AttributeType::String).computed())
            .attribute(AttributeSchema::new("zone_name", AttributeType::String).computed())
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
        match found(client.get_ldap_provider(name, zone.as_deref()).await)
            .map_err(|e| fail(READ_ERROR, id, e))?
        {
            Some(provider) => Ok(self.state(id, &provider, name, zone.as_deref())),
            None => Ok(State::not_found(id.clone())),
        }
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let zone = string_attr(&resource.attributes, "zone");
        let body: LdapProviderParams =
            decode(&resource.attributes, &self.schema()).map_err(|e| fail(CREATE_ERROR, id, e))?;
        let name = client
            .create_ldap_provider(&body, zone.as_deref())
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        info!("created LDAP provider {}", name);

        match client.get_ldap_provider(&name, zone.as_deref()).await {
            Ok(provider) => Ok(self.state(id, &provider, &name, zone.as_deref())),
            Err(read_err) => {
                warn!("reading new LDAP provider {} failed, deleting it", name);
                if let Err(delete_err) = client.delete_ldap_provider(&name, zone.as_deref()).await {
                    return Err(ProviderError::new(CREATE_ERROR)
                        .for_resource(id.clone())
                        .with_detail(format!(
                            "read after create failed ({}) and the provider could not be removed",
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
        let zone = string_attr(&to.attributes, "zone");
        let mut body: LdapProviderParams =
            decode(&to.attributes, &self.schema()).map_err(|e| fail(UPDATE_ERROR, id, e))?;
        // groupnet is fixed at creation
        body.groupnet = None;
        client
            .update_ldap_provider(identifier, &body, zone.as_deref())
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;

        let name = body.name.clone().unwrap_or_else(|| identifier.to_string());
        let provider = client
            .get_ldap_provider(&name, zone.as_deref())
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;
        Ok(self.state(id, &provider, &name, zone.as_deref()))
    }

    async fn delete(&self, client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        let name = require_identifier(DELETE_ERROR, state)?;
        let zone = string_attr(&state.attributes, "zone");
        client
            .delete_ldap_provider(name, zone.as_deref())
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
        let provider = client
            .get_ldap_provider(&name, zone.as_deref())
            .await
            .map_err(|e| fail(IMPORT_ERROR, id, e))?;
        Ok(self.state(id, &provider, &name, zone.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::client;
    use powerscale_client::Method;
    use serde_json::json;

    const PATH: &str = "/platform/11/auth/providers/ldap/corp";

    fn resource() -> Resource {
        Resource::new("ldap_provider", "corp")
            .with_attribute("name", "corp")
            .with_attribute("base_dn", "dc=corp,dc=com")
            .with_attribute(
                "server_uris",
                Value::List(vec![Value::from("ldap://10.0.0.5")]),
            )
            .with_attribute("bind_password", "pw")
            .with_attribute("zone", "hr")
    }

    fn ldap_response() -> serde_json::Value {
        json!({"ldap": [{
            "id": "corp",
            "name": "corp",
            "base_dn": "dc=corp,dc=com",
            "server_uris": ["ldap://10.0.0.5"],
            "zone_name": "hr",
            "status": "online"
        }]})
    }

    #[tokio::test]
    async fn create_in_zone() {
        let (transport, client) = client();
        transport
            .on(Method::Post, "/platform/11/auth/providers/ldap", 201, json!({"id": "corp"}))
            .on(Method::Get, PATH, 200, ldap_response());

        let state = LdapProvider.create(&client, &resource()).await.unwrap();
        assert_eq!(state.identifier(), "corp");
        assert_eq!(state.attributes.get("zone"), Some(&Value::from("hr")));
        assert!(!state.attributes.contains_key("bind_password"));

        let post = &transport.requests()[0];
        assert_eq!(post.query_value("zone"), Some("hr"));
        let body = post.body.clone().unwrap();
        assert_eq!(body["bind_password"], "pw");
        assert!(body.get("zone").is_none());
    }

    #[tokio::test]
    async fn not_found_after_create_rolls_back() {
        let (transport, client) = client();
        transport
            .on(Method::Post, "/platform/11/auth/providers/ldap", 201, json!({"id": "corp"}))
            .on(Method::Get, PATH, 200, json!({"ldap": []}))
            .on(Method::Delete, PATH, 204, json!(null));

        let err = LdapProvider.create(&client, &resource()).await.unwrap_err();
        assert_eq!(err.message, CREATE_ERROR);
        let deletes = transport.requests_to(Method::Delete, PATH);
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].query_value("zone"), Some("hr"));
    }

    #[tokio::test]
    async fn import_with_zone_prefix() {
        let (transport, client) = client();
        transport.on(Method::Get, PATH, 200, ldap_response());

        let id = ResourceId::new("ldap_provider", "corp");
        let state = LdapProvider.import(&client, &id, "hr:corp").await.unwrap();
        assert_eq!(state.attributes.get("zone"), Some(&Value::from("hr")));
        assert_eq!(transport.requests()[0].query_value("zone"), Some("hr"));
    }
}
