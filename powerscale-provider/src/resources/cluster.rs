//! powerscale.cluster data source

use async_trait::async_trait;

use powerscale_client::PowerScaleClient;
use powerscale_client::cluster::ClusterConfig;
use powerscale_core::provider::ProviderResult;
use powerscale_core::resource::{Attributes, ResourceId, State};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use crate::convert::to_attributes;
use crate::handler::{ResourceHandler, fail};

const READ_ERROR: &str = "Error reading cluster configuration";

/// Identity and version of the cluster being managed
pub struct Cluster;

impl Cluster {
    fn state(&self, id: &ResourceId, config: &ClusterConfig) -> State {
        let state = State::existing(id.clone(), to_attributes(config, &self.schema()));
        match &config.guid {
            Some(guid) => state.with_identifier(guid.clone()),
            None => state,
        }
    }
}

#[async_trait]
impl ResourceHandler for Cluster {
    fn resource_type(&self) -> &'static str {
        "cluster"
    }

    fn schema(&self) -> ResourceSchema {
        let version = AttributeType::Struct(vec![
            AttributeSchema::new("build", AttributeType::String),
            AttributeSchema::new("release", AttributeType::String),
            AttributeSchema::new("revision", AttributeType::String),
            AttributeSchema::new("type", AttributeType::String),
            AttributeSchema::new("version", AttributeType::String),
        ]);

        ResourceSchema::new("cluster")
            .with_description("Cluster identity (data source)")
            .data_source()
            .attribute(AttributeSchema::new("name", AttributeType::String).computed())
            .attribute(AttributeSchema::new("guid", AttributeType::String).computed())
            .attribute(AttributeSchema::new("description", AttributeType::String).computed())
            .attribute(AttributeSchema::new("encoding", AttributeType::String).computed())
            .attribute(AttributeSchema::new("local_devid", AttributeType::Int).computed())
            .attribute(AttributeSchema::new("local_lnn", AttributeType::Int).computed())
            .attribute(AttributeSchema::new("onefs_version", version).computed())
    }

    async fn read(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        _identifier: Option<&str>,
        _attributes: &Attributes,
    ) -> ProviderResult<State> {
        let config = client
            .get_cluster_config()
            .await
            .map_err(|e| fail(READ_ERROR, id, e))?;
        Ok(self.state(id, &config))
    }
}
