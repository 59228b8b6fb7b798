//! powerscale.ntp_settings
//!
//! Cluster-wide singleton. Creating it applies the settings; destroying it
//! only stops managing them.

use async_trait::async_trait;
use log::info;

use powerscale_client::PowerScaleClient;
use powerscale_client::protocols::NtpSettings as NtpSettingsModel;
use powerscale_core::provider::ProviderResult;
use powerscale_core::resource::{Attributes, Resource, ResourceId, State};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::convert::{decode, to_attributes};
use crate::handler::{ResourceHandler, fail};

const IDENTIFIER: &str = "ntp_settings";

const CREATE_ERROR: &str = "Error applying NTP settings";
const READ_ERROR: &str = "Error reading NTP settings";
const UPDATE_ERROR: &str = "Error updating NTP settings";
const IMPORT_ERROR: &str = "Error importing NTP settings";

pub struct NtpSettings;

impl NtpSettings {
    async fn apply(
        &self,
        client: &PowerScaleClient,
        message: &'static str,
        resource: &Resource,
    ) -> ProviderResult<State> {
        let id = &resource.id;
        let body: NtpSettingsModel =
            decode(&resource.attributes, &self.schema()).map_err(|e| fail(message, id, e))?;
        client
            .update_ntp_settings(&body)
            .await
            .map_err(|e| fail(message, id, e))?;

        let settings = client
            .get_ntp_settings()
            .await
            .map_err(|e| fail(message, id, e))?;
        Ok(self.state(id, &settings))
    }

    fn state(&self, id: &ResourceId, settings: &NtpSettingsModel) -> State {
        State::existing(id.clone(), to_attributes(settings, &self.schema())).with_identifier(IDENTIFIER)
    }
}

#[async_trait]
impl ResourceHandler for NtpSettings {
    fn resource_type(&self) -> &'static str {
        "ntp_settings"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("ntp_settings")
            .with_description("Cluster NTP settings")
            .attribute(
                AttributeSchema::new("chimers", types::non_negative_int())
                    .optional_computed()
                    .with_description("Number of nodes that contact the NTP servers; 0 means all"),
            )
            .attribute(
                AttributeSchema::new("excluded", AttributeType::list_of(types::positive_int()))
                    .optional_computed()
                    .unordered(),
            )
            .attribute(AttributeSchema::new("key_file", AttributeType::String).optional_computed())
    }

    async fn read(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: Option<&str>,
        _attributes: &Attributes,
    ) -> ProviderResult<State> {
        if identifier.is_none() {
            return Ok(State::not_found(id.clone()));
        }
        let settings = client
            .get_ntp_settings()
            .await
            .map_err(|e| fail(READ_ERROR, id, e))?;
        Ok(self.state(id, &settings))
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let state = self.apply(client, CREATE_ERROR, resource).await?;
        info!("applied NTP settings");
        Ok(state)
    }

    async fn update(
        &self,
        client: &PowerScaleClient,
        _id: &ResourceId,
        _identifier: &str,
        _from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        self.apply(client, UPDATE_ERROR, to).await
    }

    async fn delete(&self, _client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        info!(
            "{}: NTP settings cannot be deleted, removing them from state only",
            state.id
        );
        Ok(())
    }

    async fn import(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        _import_id: &str,
    ) -> ProviderResult<State> {
        let settings = client
            .get_ntp_settings()
            .await
            .map_err(|e| fail(IMPORT_ERROR, id, e))?;
        Ok(self.state(id, &settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::client;
    use powerscale_client::Method;
    use powerscale_core::resource::Value;
    use serde_json::json;

    const PATH: &str = "/platform/3/protocols/ntp/settings";

    #[tokio::test]
    async fn create_puts_then_reads() {
        let (transport, client) = client();
        transport
            .on(Method::Put, PATH, 204, json!(null))
            .on(
                Method::Get,
                PATH,
                200,
                json!({"settings": {"chimers": 3, "excluded": [], "key_file": ""}}),
            );

        let resource = Resource::new("ntp_settings", "ntp").with_attribute("chimers", Value::Int(3));
        let state = NtpSettings.create(&client, &resource).await.unwrap();
        assert_eq!(state.identifier(), IDENTIFIER);
        assert_eq!(state.attributes.get("chimers"), Some(&Value::Int(3)));

        let body = transport.requests_to(Method::Put, PATH)[0].body.clone().unwrap();
        assert_eq!(body, json!({"chimers": 3}));
    }

    #[tokio::test]
    async fn delete_makes_no_call() {
        let (transport, client) = client();
        let state = State::existing(ResourceId::new("ntp_settings", "ntp"), Attributes::new())
            .with_identifier(IDENTIFIER);
        NtpSettings.delete(&client, &state).await.unwrap();
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn read_without_identifier_is_not_found() {
        let (transport, client) = client();
        let id = ResourceId::new("ntp_settings", "ntp");
        let state = NtpSettings.read(&client, &id, None, &Attributes::new()).await.unwrap();
        assert!(!state.exists);
        assert!(transport.requests().is_empty());
    }
}
