//! Groupnets and subnets (`/platform/10/network/groupnets`)

use serde::{Deserialize, Serialize};

use crate::client::{CreateResponse, PowerScaleClient, segment, single};
use crate::error::ClientResult;

const GROUPNETS_PATH: &str = "/platform/10/network/groupnets";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Groupnet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_servers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_search: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_cache_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_wildcard_subdomains: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_side_dns_search: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnets: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of groupnet create and update calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupnetParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_servers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_search: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_cache_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_wildcard_subdomains: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_side_dns_search: Option<bool>,
}

/// SmartConnect service address range
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressRange {
    pub low: String,
    pub high: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefixlen: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc_service_addrs: Option<Vec<AddressRange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc_service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsr_addrs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pools: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST .../subnets`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubnetCreate {
    pub name: String,
    pub addr_family: String,
    pub prefixlen: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc_service_addrs: Option<Vec<AddressRange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc_service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsr_addrs: Option<Vec<String>>,
}

/// Body of `PUT .../subnets/{name}`; the address family cannot change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubnetUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefixlen: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc_service_addrs: Option<Vec<AddressRange>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc_service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsr_addrs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Groupnets {
    #[serde(default)]
    groupnets: Vec<Groupnet>,
}

#[derive(Debug, Deserialize)]
struct Subnets {
    #[serde(default)]
    subnets: Vec<Subnet>,
}

fn groupnet_path(name: &str) -> String {
    format!("{}/{}", GROUPNETS_PATH, segment(name))
}

fn subnets_path(groupnet: &str) -> String {
    format!("{}/subnets", groupnet_path(groupnet))
}

fn subnet_path(groupnet: &str, name: &str) -> String {
    format!("{}/{}", subnets_path(groupnet), segment(name))
}

impl PowerScaleClient {
    pub async fn get_groupnet(&self, name: &str) -> ClientResult<Groupnet> {
        let groupnets: Groupnets = self.get(&groupnet_path(name), &[]).await?;
        single(groupnets.groupnets, "groupnet")
    }

    pub async fn create_groupnet(&self, groupnet: &GroupnetParams) -> ClientResult<String> {
        let created: CreateResponse<String> = self.post(GROUPNETS_PATH, &[], groupnet).await?;
        Ok(created.id)
    }

    pub async fn update_groupnet(&self, name: &str, groupnet: &GroupnetParams) -> ClientResult<()> {
        self.put(&groupnet_path(name), &[], groupnet).await
    }

    pub async fn delete_groupnet(&self, name: &str) -> ClientResult<()> {
        self.delete(&groupnet_path(name), &[]).await
    }

    pub async fn get_subnet(&self, groupnet: &str, name: &str) -> ClientResult<Subnet> {
        let subnets: Subnets = self.get(&subnet_path(groupnet, name), &[]).await?;
        single(subnets.subnets, "subnet")
    }

    pub async fn create_subnet(&self, groupnet: &str, subnet: &SubnetCreate) -> ClientResult<String> {
        let created: CreateResponse<String> = self.post(&subnets_path(groupnet), &[], subnet).await?;
        Ok(created.id)
    }

    pub async fn update_subnet(
        &self,
        groupnet: &str,
        name: &str,
        subnet: &SubnetUpdate,
    ) -> ClientResult<()> {
        self.put(&subnet_path(groupnet, name), &[], subnet).await
    }

    pub async fn delete_subnet(&self, groupnet: &str, name: &str) -> ClientResult<()> {
        self.delete(&subnet_path(groupnet, name), &[]).await
    }
}
