//! powerscale.ads_provider

use async_trait::async_trait;
use log::info;

use powerscale_client::PowerScaleClient;
use powerscale_client::auth::{AdsProvider as AdsModel, AdsProviderCreate, AdsProviderUpdate};
use powerscale_core::provider::ProviderResult;
use powerscale_core::resource::{Attributes, Resource, ResourceId, State};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use crate::convert::{decode, to_attributes};
use crate::handler::{ResourceHandler, fail, found, require_identifier};

const CREATE_ERROR: &str = "Error creating ADS provider";
const READ_ERROR: &str = "Error reading ADS provider";
const UPDATE_ERROR: &str = "Error updating ADS provider";
const DELETE_ERROR: &str = "Error deleting ADS provider";
const IMPORT_ERROR: &str = "Error importing ADS provider";

pub struct AdsProvider;

impl AdsProvider {
    fn state(&self, id: &ResourceId, provider: &AdsModel, identifier: &str) -> State {
        State::existing(id.clone(), to_attributes(provider, &self.schema()))
            .with_identifier(provider.id.clone().unwrap_or_else(|| identifier.to_string()))
    }
}

#[async_trait]
impl ResourceHandler for AdsProvider {
    fn resource_type(&self) -> &'static str {
        "ads_provider"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("ads_provider")
            .with_description("Active Directory provider; creating it joins the cluster to the domain")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Fully qualified domain name"),
            )
            .attribute(
                AttributeSchema::new("user", AttributeType::String)
                    .required()
                    .write_only()
                    .with_description("Account used to join the domain"),
            )
            .attribute(AttributeSchema::new("password", AttributeType::String).required().write_only())
            .attribute(
                AttributeSchema::new("groupnet", AttributeType::String)
                    .optional_computed()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("machine_account", AttributeType::String)
                    .optional_computed()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("organizational_unit", AttributeType::String)
                    .optional_computed()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("dns_domain", AttributeType::String)
                    .optional_computed()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("allocate_gids", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("allocate_uids", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("assume_default_domain", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("check_online_interval", AttributeType::Int).optional_computed())
            .attribute(AttributeSchema::new("create_home_directory", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("domain_offline_alerts", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("home_directory_template", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("login_shell", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("lookup_users", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("nss_enumeration", AttributeType::Bool).optional_computed())
            .attribute(
                AttributeSchema::new("sfu_support", AttributeType::enumeration(&["none", "rfc2307"]))
                    .optional_computed(),
            )
            .attribute(AttributeSchema::new("store_sfu_mappings", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("id", AttributeType::String).computed())
            .attribute(AttributeSchema::new("status", AttributeType::String).computed())
            .attribute(AttributeSchema::new("hostname", AttributeType::String).computed())
            .attribute(AttributeSchema::new("netbios_domain", AttributeType::String).computed())
            .attribute(AttributeSchema::new("site", AttributeType::String).computed())
            .attribute(AttributeSchema::new("forest", AttributeType::String).computed())
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
        match found(client.get_ads_provider(identifier).await).map_err(|e| fail(READ_ERROR, id, e))? {
            Some(provider) => Ok(self.state(id, &provider, identifier)),
            None => Ok(State::not_found(id.clone())),
        }
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let body: AdsProviderCreate =
            decode(&resource.attributes, &self.schema()).map_err(|e| fail(CREATE_ERROR, id, e))?;
        let provider_id = client
            .create_ads_provider(&body)
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        info!("joined domain {} as ADS provider {}", body.name, provider_id);

        let provider = client
            .get_ads_provider(&provider_id)
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        Ok(self.state(id, &provider, &provider_id))
    }

    async fn update(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: &str,
        _from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let body: AdsProviderUpdate =
            decode(&to.attributes, &self.schema()).map_err(|e| fail(UPDATE_ERROR, id, e))?;
        client
            .update_ads_provider(identifier, &body)
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;

        let provider = client
            .get_ads_provider(identifier)
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;
        Ok(self.state(id, &provider, identifier))
    }

    async fn delete(&self, client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        let identifier = require_identifier(DELETE_ERROR, state)?;
        client
            .delete_ads_provider(identifier)
            .await
            .map_err(|e| fail(DELETE_ERROR, &state.id, e))
    }

    async fn import(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        import_id: &str,
    ) -> ProviderResult<State> {
        let provider = client
            .get_ads_provider(import_id)
            .await
            .map_err(|e| fail(IMPORT_ERROR, id, e))?;
        Ok(self.state(id, &provider, import_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::client;
    use powerscale_client::Method;
    use powerscale_core::resource::Value;
    use serde_json::json;

    const PATH: &str = "/platform/14/auth/providers/ads/AD.EXAMPLE.COM";

    fn ads_response() -> serde_json::Value {
        json!({"ads": [{
            "id": "AD.EXAMPLE.COM",
            "name": "AD.EXAMPLE.COM",
            "groupnet": "groupnet0",
            "status": "online",
            "allocate_uids": true
        }]})
    }

    #[tokio::test]
    async fn create_joins_and_hides_credentials() {
        let (transport, client) = client();
        transport
            .on(
                Method::Post,
                "/platform/14/auth/providers/ads",
                201,
                json!({"id": "AD.EXAMPLE.COM"}),
            )
            .on(Method::Get, PATH, 200, ads_response());

        let resource = Resource::new("ads_provider", "ad")
            .with_attribute("name", "AD.EXAMPLE.COM")
            .with_attribute("user", "administrator")
            .with_attribute("password", "secret")
            .with_attribute("allocate_uids", true);
        let state = AdsProvider.create(&client, &resource).await.unwrap();

        assert_eq!(state.identifier(), "AD.EXAMPLE.COM");
        assert_eq!(state.attributes.get("status"), Some(&Value::from("online")));
        assert!(!state.attributes.contains_key("password"));

        let body = transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["user"], "administrator");
        assert_eq!(body["password"], "secret");
        assert_eq!(body["allocate_uids"], true);
    }

    #[tokio::test]
    async fn update_leaves_out_join_settings() {
        let (transport, client) = client();
        transport
            .on(Method::Put, PATH, 204, json!(null))
            .on(Method::Get, PATH, 200, ads_response());

        let to = Resource::new("ads_provider", "ad")
            .with_attribute("name", "AD.EXAMPLE.COM")
            .with_attribute("user", "administrator")
            .with_attribute("password", "secret")
            .with_attribute("login_shell", "/bin/zsh");
        let from = State::existing(to.id.clone(), Attributes::new());
        AdsProvider
            .update(&client, &to.id, "AD.EXAMPLE.COM", &from, &to)
            .await
            .unwrap();

        let body = transport.requests_to(Method::Put, PATH)[0].body.clone().unwrap();
        assert_eq!(body, json!({"login_shell": "/bin/zsh"}));
    }
}
