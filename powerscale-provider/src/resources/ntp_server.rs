//! powerscale.ntp_server

use async_trait::async_trait;
use log::info;

use powerscale_client::PowerScaleClient;
use powerscale_client::protocols::NtpServer as NtpServerModel;
use powerscale_core::provider::ProviderResult;
use powerscale_core::resource::{Attributes, Resource, ResourceId, State};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use crate::convert::{decode, string_attr, to_attributes};
use crate::handler::{ResourceHandler, fail, found, require_identifier};

const CREATE_ERROR: &str = "Error creating NTP server";
const READ_ERROR: &str = "Error reading NTP server";
const UPDATE_ERROR: &str = "Error updating NTP server";
const DELETE_ERROR: &str = "Error deleting NTP server";
const IMPORT_ERROR: &str = "Error importing NTP server";

pub struct NtpServer;

impl NtpServer {
    fn state(&self, id: &ResourceId, server: &NtpServerModel, server_id: &str) -> State {
        State::existing(id.clone(), to_attributes(server, &self.schema()))
            .with_identifier(server.id.clone().unwrap_or_else(|| server_id.to_string()))
    }
}

#[async_trait]
impl ResourceHandler for NtpServer {
    fn resource_type(&self) -> &'static str {
        "ntp_server"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("ntp_server")
            .with_description("An external NTP server the cluster synchronizes with")
            .attribute(
                AttributeSchema::new("name", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Host name or address of the server"),
            )
            .attribute(
                AttributeSchema::new("key", AttributeType::String)
                    .optional_computed()
                    .with_description("Key from the NTP key file used to authenticate"),
            )
            .attribute(AttributeSchema::new("id", AttributeType::String).computed())
    }

    async fn read(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: Option<&str>,
        _attributes: &Attributes,
    ) -> ProviderResult<State> {
        let Some(server_id) = identifier else {
            return Ok(State::not_found(id.clone()));
        };
        match found(client.get_ntp_server(server_id).await).map_err(|e| fail(READ_ERROR, id, e))? {
            Some(server) => Ok(self.state(id, &server, server_id)),
            None => Ok(State::not_found(id.clone())),
        }
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let body: NtpServerModel =
            decode(&resource.attributes, &self.schema()).map_err(|e| fail(CREATE_ERROR, id, e))?;
        let server_id = client
            .create_ntp_server(&body)
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        info!("added NTP server {}", server_id);

        let server = client
            .get_ntp_server(&server_id)
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        Ok(self.state(id, &server, &server_id))
    }

    async fn update(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: &str,
        _from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let key = string_attr(&to.attributes, "key").unwrap_or_default();
        client
            .update_ntp_server_key(identifier, &key)
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;

        let server = client
            .get_ntp_server(identifier)
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;
        Ok(self.state(id, &server, identifier))
    }

    async fn delete(&self, client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        let server_id = require_identifier(DELETE_ERROR, state)?;
        client
            .delete_ntp_server(server_id)
            .await
            .map_err(|e| fail(DELETE_ERROR, &state.id, e))
    }

    async fn import(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        import_id: &str,
    ) -> ProviderResult<State> {
        let server = client
            .get_ntp_server(import_id)
            .await
            .map_err(|e| fail(IMPORT_ERROR, id, e))?;
        Ok(self.state(id, &server, import_id))
    }
}
