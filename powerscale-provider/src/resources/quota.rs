//! powerscale.quota

use async_trait::async_trait;
use log::info;

use powerscale_client::PowerScaleClient;
use powerscale_client::quota::{Quota as QuotaModel, QuotaCreate, QuotaUpdate};
use powerscale_core::provider::ProviderResult;
use powerscale_core::resource::{Attributes, Resource, ResourceId, State, Value};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::convert::{decode, string_attr, to_attributes};
use crate::handler::{ResourceHandler, fail, found, require_identifier};
use crate::resources::persona_type;

const CREATE_ERROR: &str = "Error creating quota";
const READ_ERROR: &str = "Error reading quota";
const UPDATE_ERROR: &str = "Error updating quota";
const DELETE_ERROR: &str = "Error deleting quota";
const IMPORT_ERROR: &str = "Error importing quota";

pub struct Quota;

impl Quota {
    fn state(&self, id: &ResourceId, quota: &QuotaModel, quota_id: &str, zone: Option<&str>) -> State {
        let mut attributes = to_attributes(quota, &self.schema());
        if let Some(zone) = zone {
            attributes.insert("zone".to_string(), Value::from(zone));
        }
        State::existing(id.clone(), attributes)
            .with_identifier(quota.id.clone().unwrap_or_else(|| quota_id.to_string()))
    }
}

#[async_trait]
impl ResourceHandler for Quota {
    fn resource_type(&self) -> &'static str {
        "quota"
    }

    fn schema(&self) -> ResourceSchema {
        let thresholds = AttributeType::Struct(vec![
            AttributeSchema::new("hard", types::non_negative_int()),
            AttributeSchema::new("soft", types::non_negative_int()),
            AttributeSchema::new("advisory", types::non_negative_int()),
            AttributeSchema::new("soft_grace", types::non_negative_int()),
            AttributeSchema::new("hard_exceeded", AttributeType::Bool).computed(),
            AttributeSchema::new("soft_exceeded", AttributeType::Bool).computed(),
            AttributeSchema::new("advisory_exceeded", AttributeType::Bool).computed(),
        ]);
        let usage = AttributeType::Struct(vec![
            AttributeSchema::new("applogical", AttributeType::Int),
            AttributeSchema::new("fslogical", AttributeType::Int),
            AttributeSchema::new("physical", AttributeType::Int),
            AttributeSchema::new("inodes", AttributeType::Int),
        ]);

        ResourceSchema::new("quota")
            .with_description("A SmartQuotas quota on a directory")
            .attribute(AttributeSchema::new("path", types::ifs_path()).required().force_new())
            .attribute(
                AttributeSchema::new(
                    "type",
                    AttributeType::enumeration(&["directory", "user", "group", "default-user", "default-group"]),
                )
                .required()
                .force_new(),
            )
            .attribute(
                AttributeSchema::new("include_snapshots", AttributeType::Bool)
                    .with_default(false)
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("persona", persona_type())
                    .force_new()
                    .with_description("User or group the quota applies to"),
            )
            .attribute(
                AttributeSchema::new("zone", AttributeType::String)
                    .force_new()
                    .with_description("Access zone used to resolve the persona"),
            )
            .attribute(AttributeSchema::new("ignore_limit_checks", AttributeType::Bool).write_only())
            .attribute(AttributeSchema::new("enforced", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("container", AttributeType::Bool).optional_computed())
            .attribute(AttributeSchema::new("thresholds", thresholds).optional_computed())
            .attribute(
                AttributeSchema::new(
                    "thresholds_on",
                    AttributeType::enumeration(&["applogicalsize", "fslogicalsize", "physicalsize"]),
                )
                .optional_computed(),
            )
            .attribute(AttributeSchema::new("usage", usage).computed())
            .attribute(AttributeSchema::new("linked", AttributeType::Bool).computed())
            .attribute(AttributeSchema::new("ready", AttributeType::Bool).computed())
            .attribute(AttributeSchema::new("id", AttributeType::String).computed())
    }

    async fn read(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: Option<&str>,
        attributes: &Attributes,
    ) -> ProviderResult<State> {
        let Some(quota_id) = identifier else {
            return Ok(State::not_found(id.clone()));
        };
        let zone = string_attr(attributes, "zone");
        match found(client.get_quota(quota_id).await).map_err(|e| fail(READ_ERROR, id, e))? {
            Some(quota) => Ok(self.state(id, &quota, quota_id, zone.as_deref())),
            None => Ok(State::not_found(id.clone())),
        }
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let zone = string_attr(&resource.attributes, "zone");
        let body: QuotaCreate =
            decode(&resource.attributes, &self.schema()).map_err(|e| fail(CREATE_ERROR, id, e))?;
        let quota_id = client
            .create_quota(&body, zone.as_deref())
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        info!("created {} quota {} on {}", body.quota_type, quota_id, body.path);

        let quota = client
            .get_quota(&quota_id)
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        Ok(self.state(id, &quota, &quota_id, zone.as_deref()))
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
        let body: QuotaUpdate =
            decode(&to.attributes, &self.schema()).map_err(|e| fail(UPDATE_ERROR, id, e))?;
        client
            .update_quota(identifier, &body)
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;

        let quota = client
            .get_quota(identifier)
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;
        Ok(self.state(id, &quota, identifier, zone.as_deref()))
    }

    async fn delete(&self, client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        let quota_id = require_identifier(DELETE_ERROR, state)?;
        client
            .delete_quota(quota_id)
            .await
            .map_err(|e| fail(DELETE_ERROR, &state.id, e))
    }

    async fn import(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        import_id: &str,
    ) -> ProviderResult<State> {
        let quota = client
            .get_quota(import_id)
            .await
            .map_err(|e| fail(IMPORT_ERROR, id, e))?;
        Ok(self.state(id, &quota, import_id, None))
    }
}
