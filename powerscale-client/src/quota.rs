//! SmartQuotas (`/platform/12/quota/quotas`)

use serde::{Deserialize, Serialize};

use crate::auth::Persona;
use crate::client::{CreateResponse, PowerScaleClient, segment, single};
use crate::error::ClientResult;

const QUOTAS_PATH: &str = "/platform/12/quota/quotas";

/// Usage limits in bytes; `soft_grace` is in seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaThresholds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_grace: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_exceeded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_exceeded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory_exceeded: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applogical: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fslogical: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inodes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub quota_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_snapshots: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<QuotaThresholds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<QuotaUsage>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST /platform/12/quota/quotas`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaCreate {
    pub path: String,
    #[serde(rename = "type")]
    pub quota_type: String,
    pub include_snapshots: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_limit_checks: Option<bool>,
    #[serde(flatten)]
    pub settings: QuotaUpdate,
}

/// Settings accepted by `PUT /platform/12/quota/quotas/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<QuotaThresholds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds_on: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Quotas {
    #[serde(default)]
    quotas: Vec<Quota>,
}

impl PowerScaleClient {
    pub async fn get_quota(&self, id: &str) -> ClientResult<Quota> {
        let path = format!("{}/{}", QUOTAS_PATH, segment(id));
        let quotas: Quotas = self.get(&path, &[]).await?;
        single(quotas.quotas, "quota")
    }

    pub async fn create_quota(&self, quota: &QuotaCreate, zone: Option<&str>) -> ClientResult<String> {
        let created: CreateResponse<String> = self.post(QUOTAS_PATH, &[("zone", zone)], quota).await?;
        Ok(created.id)
    }

    pub async fn update_quota(&self, id: &str, quota: &QuotaUpdate) -> ClientResult<()> {
        let path = format!("{}/{}", QUOTAS_PATH, segment(id));
        self.put(&path, &[], quota).await
    }

    pub async fn delete_quota(&self, id: &str) -> ClientResult<()> {
        let path = format!("{}/{}", QUOTAS_PATH, segment(id));
        self.delete(&path, &[]).await
    }
}
