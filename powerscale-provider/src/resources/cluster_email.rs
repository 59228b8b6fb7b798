//! powerscale.cluster_email

use async_trait::async_trait;
use log::info;

use powerscale_client::PowerScaleClient;
use powerscale_client::cluster::EmailSettings;
use powerscale_core::provider::ProviderResult;
use powerscale_core::resource::{Attributes, Resource, ResourceId, State};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::convert::{decode, to_attributes};
use crate::handler::{ResourceHandler, fail};

const IDENTIFIER: &str = "cluster_email";

const CREATE_ERROR: &str = "Error applying cluster email settings";
const READ_ERROR: &str = "Error reading cluster email settings";
const UPDATE_ERROR: &str = "Error updating cluster email settings";
const IMPORT_ERROR: &str = "Error importing cluster email settings";

/// SMTP settings singleton
pub struct ClusterEmail;

impl ClusterEmail {
    async fn apply(
        &self,
        client: &PowerScaleClient,
        message: &'static str,
        resource: &Resource,
    ) -> ProviderResult<State> {
        let id = &resource.id;
        let body: EmailSettings =
            decode(&resource.attributes, &self.schema()).map_err(|e| fail(message, id, e))?;
        client
            .update_email_settings(&body)
            .await
            .map_err(|e| fail(message, id, e))?;

        let settings = client
            .get_email_settings()
            .await
            .map_err(|e| fail(message, id, e))?;
        Ok(self.state(id, &settings))
    }

    fn state(&self, id: &ResourceId, settings: &EmailSettings) -> State {
        State::existing(id.clone(), to_attributes(settings, &self.schema())).with_identifier(IDENTIFIER)
    }
}

#[async_trait]
impl ResourceHandler for ClusterEmail {
    fn resource_type(&self) -> &'static str {
        "cluster_email"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("cluster_email")
            .with_description("SMTP settings for cluster event notifications")
            .attribute(AttributeSchema::new("mail_relay", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("mail_sender", types::email()).optional_computed())
            .attribute(AttributeSchema::new("mail_subject", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("smtp_port", types::port()).optional_computed())
            .attribute(AttributeSchema::new("use_smtp_auth", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("smtp_auth_username", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("smtp_auth_passwd", AttributeType::String).write_only())
            .attribute(
                AttributeSchema::new("smtp_auth_security", AttributeType::enumeration(&["none", "starttls"]))
                    .optional_computed(),
            )
            .attribute(
                AttributeSchema::new("batch_mode", AttributeType::enumeration(&["all", "severity", "category", "none"]))
                    .optional_computed(),
            )
            .attribute(AttributeSchema::new("user_template", AttributeType::String).optional_computed())
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
            .get_email_settings()
            .await
            .map_err(|e| fail(READ_ERROR, id, e))?;
        Ok(self.state(id, &settings))
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let state = self.apply(client, CREATE_ERROR, resource).await?;
        info!("applied cluster email settings");
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
            "{}: email settings cannot be deleted, removing them from state only",
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
            .get_email_settings()
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

    const PATH: &str = "/platform/1/cluster/email";

    #[tokio::test]
    async fn password_is_sent_but_not_stored() {
        let (transport, client) = client();
        transport.on(Method::Put, PATH, 204, json!(null)).on(
            Method::Get,
            PATH,
            200,
            json!({"settings": {
                "mail_relay": "smtp.example.com",
                "smtp_port": 587,
                "use_smtp_auth": true,
                "smtp_auth_username": "isilon"
            }}),
        );

        let resource = Resource::new("cluster_email", "email")
            .with_attribute("mail_relay", "smtp.example.com")
            .with_attribute("smtp_port", Value::Int(587))
            .with_attribute("use_smtp_auth", true)
            .with_attribute("smtp_auth_username", "isilon")
            .with_attribute("smtp_auth_passwd", "secret");
        let state = ClusterEmail.create(&client, &resource).await.unwrap();

        assert_eq!(state.identifier(), IDENTIFIER);
        assert_eq!(state.attributes.get("smtp_port"), Some(&Value::Int(587)));
        assert!(!state.attributes.contains_key("smtp_auth_passwd"));

        let body = transport.requests_to(Method::Put, PATH)[0].body.clone().unwrap();
        assert_eq!(body["smtp_auth_passwd"], "secret");
    }

    #[tokio::test]
    async fn import_reads_current_settings() {
        let (transport, client) = client();
        transport.on(
            Method::Get,
            PATH,
            200,
            json!({"settings": {"mail_sender": "cluster@example.com"}}),
        );

        let id = ResourceId::new("cluster_email", "email");
        let state = ClusterEmail.import(&client, &id, "cluster_email").await.unwrap();
        assert_eq!(
            state.attributes.get("mail_sender"),
            Some(&Value::from("cluster@example.com"))
        );
    }
}
