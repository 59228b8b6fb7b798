//! powerscale.s3_bucket

use async_trait::async_trait;
use log::info;

use powerscale_client::PowerScaleClient;
use powerscale_client::protocols::{S3Bucket as S3BucketModel, S3BucketCreate, S3BucketUpdate};
use powerscale_core::provider::ProviderResult;
use powerscale_core::resource::{Attributes, Resource, ResourceId, State, Value};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::convert::{decode, parse_zone_id, string_attr, to_attributes};
use crate::handler::{ResourceHandler, fail, found, require_identifier};
use crate::resources::persona_type;

const CREATE_ERROR: &str = "Error creating S3 bucket";
const READ_ERROR: &str = "Error reading S3 bucket";
const UPDATE_ERROR: &str = "Error updating S3 bucket";
const DELETE_ERROR: &str = "Error deleting S3 bucket";
const IMPORT_ERROR: &str = "Error importing S3 bucket";

pub struct S3Bucket;

impl S3Bucket {
    fn state(&self, id: &ResourceId, bucket: &S3BucketModel, bucket_id: &str, zone: Option<&str>) -> State {
        let mut attributes = to_attributes(bucket, &self.schema());
        attributes.remove("zone");
        if let Some(zone) = zone {
            attributes.insert("zone".to_string(), Value::from(zone));
        }
        State::existing(id.clone(), attributes)
            .with_identifier(bucket.id.clone().unwrap_or_else(|| bucket_id.to_string()))
    }
}

#[async_trait]
impl ResourceHandler for S3Bucket {
    fn resource_type(&self) -> &'static str {
        "s3_bucket"
    }

    fn schema(&self) -> ResourceSchema {
        let grant = AttributeType::Struct(vec![
            AttributeSchema::new("grantee", persona_type()).required(),
            AttributeSchema::new(
                "permission",
                AttributeType::enumeration(&["READ", "WRITE", "READ_ACP", "WRITE_ACP", "FULL_CONTROL"]),
            )
            .required(),
        ]);

        ResourceSchema::new("s3_bucket")
            .with_description("An S3 bucket backed by a directory")
            .attribute(AttributeSchema::new("name", AttributeType::String).required().force_new())
            .attribute(AttributeSchema::new("path", types::ifs_path()).required().force_new())
            .attribute(
                AttributeSchema::new("owner", AttributeType::String)
                    .optional_computed()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("zone", AttributeType::String).force_new())
            .attribute(AttributeSchema::new("create_path", AttributeType::Bool).write_only())
            .attribute(AttributeSchema::new("description", AttributeType::String).optional_computed())
            .attribute(
                AttributeSchema::new("object_acl_policy", AttributeType::enumeration(&["replace", "deny"]))
                    .optional_computed(),
            )
            .attribute(AttributeSchema::new("acl", AttributeType::list_of(grant)).optional_computed())
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
        let Some(bucket_id) = identifier else {
            return Ok(State::not_found(id.clone()));
        };
        let zone = string_attr(attributes, "zone");
        match found(client.get_s3_bucket(bucket_id, zone.as_deref()).await)
            .map_err(|e| fail(READ_ERROR, id, e))?
        {
            Some(bucket) => Ok(self.state(id, &bucket, bucket_id, zone.as_deref())),
            None => Ok(State::not_found(id.clone())),
        }
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let zone = string_attr(&resource.attributes, "zone");
        let body: S3BucketCreate =
            decode(&resource.attributes, &self.schema()).map_err(|e| fail(CREATE_ERROR, id, e))?;
        let bucket_id = client
            .create_s3_bucket(&body, zone.as_deref())
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        info!("created S3 bucket {} on {}", body.name, body.path);

        let bucket = client
            .get_s3_bucket(&bucket_id, zone.as_deref())
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        Ok(self.state(id, &bucket, &bucket_id, zone.as_deref()))
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
        let body: S3BucketUpdate =
            decode(&to.attributes, &self.schema()).map_err(|e| fail(UPDATE_ERROR, id, e))?;
        client
            .update_s3_bucket(identifier, &body, zone.as_deref())
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;

        let bucket = client
            .get_s3_bucket(identifier, zone.as_deref())
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;
        Ok(self.state(id, &bucket, identifier, zone.as_deref()))
    }

    async fn delete(&self, client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        let bucket_id = require_identifier(DELETE_ERROR, state)?;
        let zone = string_attr(&state.attributes, "zone");
        client
            .delete_s3_bucket(bucket_id, zone.as_deref())
            .await
            .map_err(|e| fail(DELETE_ERROR, &state.id, e))
    }

    /// Import id is `zone:bucket` or `bucket`
    async fn import(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        import_id: &str,
    ) -> ProviderResult<State> {
        let (zone, bucket_id) = parse_zone_id(import_id);
        let bucket = client
            .get_s3_bucket(&bucket_id, zone.as_deref())
            .await
            .map_err(|e| fail(IMPORT_ERROR, id, e))?;
        Ok(self.state(id, &bucket, &bucket_id, zone.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::client;
    use powerscale_client::Method;
    use serde_json::json;
    use std::collections::HashMap;

    const PATH: &str = "/platform/10/protocols/s3/buckets/logs";

    fn bucket_response() -> serde_json::Value {
        json!({"buckets": [{
            "id": "logs",
            "name": "logs",
            "path": "/ifs/data/logs",
            "owner": "root",
            "object_acl_policy": "replace",
            "acl": [{"grantee": {"id": "UID:0", "name": "root", "type": "user"}, "permission": "FULL_CONTROL"}],
            "zid": 1,
            "zone": "System"
        }]})
    }

    #[tokio::test]
    async fn create_with_acl() {
        let (transport, client) = client();
        transport
            .on(Method::Post, "/platform/10/protocols/s3/buckets", 201, json!({"id": "logs"}))
            .on(Method::Get, PATH, 200, bucket_response());

        let mut grantee = HashMap::new();
        grantee.insert("name".to_string(), Value::from("root"));
        grantee.insert("type".to_string(), Value::from("user"));
        let mut grant = HashMap::new();
        grant.insert("grantee".to_string(), Value::List(vec![Value::Map(grantee)]));
        grant.insert("permission".to_string(), Value::from("FULL_CONTROL"));

        let resource = Resource::new("s3_bucket", "logs")
            .with_attribute("name", "logs")
            .with_attribute("path", "/ifs/data/logs")
            .with_attribute("create_path", true)
            .with_attribute("acl", Value::List(vec![Value::Map(grant)]));
        let state = S3Bucket.create(&client, &resource).await.unwrap();

        assert_eq!(state.identifier(), "logs");
        assert_eq!(state.attributes.get("owner"), Some(&Value::from("root")));
        assert!(!state.attributes.contains_key("zone"));

        let body = transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["create_path"], true);
        assert_eq!(body["acl"][0]["grantee"]["type"], "user");
    }

    #[tokio::test]
    async fn update_sends_only_mutable_settings() {
        let (transport, client) = client();
        transport
            .on(Method::Put, PATH, 204, json!(null))
            .on(Method::Get, PATH, 200, bucket_response());

        let to = Resource::new("s3_bucket", "logs")
            .with_attribute("name", "logs")
            .with_attribute("path", "/ifs/data/logs")
            .with_attribute("owner", "root")
            .with_attribute("object_acl_policy", "deny");
        let from = State::existing(to.id.clone(), Attributes::new());
        S3Bucket.update(&client, &to.id, "logs", &from, &to).await.unwrap();

        let body = transport.requests_to(Method::Put, PATH)[0].body.clone().unwrap();
        assert_eq!(body, json!({"object_acl_policy": "deny"}));
    }
}
