//! Access zones (`/platform/3/zones`)

use serde::{Deserialize, Serialize};

use crate::client::{CreateResponse, PowerScaleClient, segment, single};
use crate::error::ClientResult;

const ZONES_PATH: &str = "/platform/3/zones";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_providers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_system_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_directory_umask: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skeleton_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_untrusted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub netbios_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_mapping_rules: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST /platform/3/zones`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneCreate {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_providers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_system_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_path: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_directory_umask: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skeleton_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_untrusted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub netbios_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_mapping_rules: Option<Vec<String>>,
}

/// Body of `PUT /platform/3/zones/{id}`; path and groupnet are fixed at creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_providers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_system_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_directory_umask: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skeleton_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_untrusted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub netbios_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_mapping_rules: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Zones {
    #[serde(default)]
    zones: Vec<Zone>,
}

impl PowerScaleClient {
    /// Get a zone by numeric id or by name
    pub async fn get_zone(&self, id_or_name: &str) -> ClientResult<Zone> {
        let path = format!("{}/{}", ZONES_PATH, segment(id_or_name));
        let zones: Zones = self.get(&path, &[]).await?;
        single(zones.zones, "zone")
    }

    pub async fn list_zones(&self) -> ClientResult<Vec<Zone>> {
        let zones: Zones = self.get(ZONES_PATH, &[]).await?;
        Ok(zones.zones)
    }

    /// Create a zone and return its numeric id
    pub async fn create_zone(&self, zone: &ZoneCreate) -> ClientResult<i64> {
        let created: CreateResponse<i64> = self.post(ZONES_PATH, &[], zone).await?;
        Ok(created.id)
    }

    pub async fn update_zone(&self, id: &str, zone: &ZoneUpdate) -> ClientResult<()> {
        let path = format!("{}/{}", ZONES_PATH, segment(id));
        self.put(&path, &[], zone).await
    }

    pub async fn delete_zone(&self, id: &str) -> ClientResult<()> {
        let path = format!("{}/{}", ZONES_PATH, segment(id));
        self.delete(&path, &[]).await
    }
}
