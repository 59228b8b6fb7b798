//! Cluster-wide settings and identity

use serde::{Deserialize, Serialize};

use crate::client::PowerScaleClient;
use crate::error::ClientResult;

const EMAIL_PATH: &str = "/platform/1/cluster/email";
const CONFIG_PATH: &str = "/platform/3/cluster/config";

/// SMTP settings used for event notifications
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_relay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_smtp_auth: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_auth_username: Option<String>,
    /// Never returned by the cluster
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_auth_passwd: Option<String>,
    /// `none` or `starttls`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_auth_security: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_template: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailEnvelope {
    settings: EmailSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnefsVersion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub version_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Identity and software version of the cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_devid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_lnn: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onefs_version: Option<OnefsVersion>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PowerScaleClient {
    pub async fn get_email_settings(&self) -> ClientResult<EmailSettings> {
        let envelope: EmailEnvelope = self.get(EMAIL_PATH, &[]).await?;
        Ok(envelope.settings)
    }

    pub async fn update_email_settings(&self, settings: &EmailSettings) -> ClientResult<()> {
        self.put(EMAIL_PATH, &[], settings).await
    }

    pub async fn get_cluster_config(&self) -> ClientResult<ClusterConfig> {
        self.get(CONFIG_PATH, &[]).await
    }
}
