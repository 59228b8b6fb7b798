//! File and object protocols: SMB shares, NFS exports, S3 buckets and NTP

use serde::{Deserialize, Serialize};

use crate::auth::Persona;
use crate::client::{CreateResponse, PowerScaleClient, segment, single};
use crate::error::ClientResult;

const SMB_SHARES_PATH: &str = "/platform/7/protocols/smb/shares";
const NFS_EXPORTS_PATH: &str = "/platform/4/protocols/nfs/exports";
const S3_BUCKETS_PATH: &str = "/platform/10/protocols/s3/buckets";
const NTP_SERVERS_PATH: &str = "/platform/3/protocols/ntp/servers";
const NTP_SETTINGS_PATH: &str = "/platform/3/protocols/ntp/settings";

// --- SMB ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmbPermission {
    /// `full`, `change` or `read`
    pub permission: String,
    /// `allow` or `deny`
    pub permission_type: String,
    pub trustee: Persona,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmbShare {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browsable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_based_enumeration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuously_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oplocks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ntfs_acl_support: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_acl: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<SmbPermission>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_as_root: Option<Vec<Persona>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zid: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of SMB share create and update calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmbShareParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Only accepted on create
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_path: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browsable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_based_enumeration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuously_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oplocks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ntfs_acl_support: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_acl: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<SmbPermission>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_as_root: Option<Vec<Persona>>,
}

#[derive(Debug, Deserialize)]
struct SmbShares {
    #[serde(default)]
    shares: Vec<SmbShare>,
}

// --- NFS ---

/// Identity mapping for root or all users of an export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NfsMapping {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Persona>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_group: Option<Persona>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NfsExport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_clients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_clients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_write_clients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_dirs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_flavors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_root: Option<NfsMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_all: Option<NfsMapping>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of NFS export create and update calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NfsExportParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_clients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_clients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_write_clients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_dirs: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_flavors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_root: Option<NfsMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_all: Option<NfsMapping>,
}

#[derive(Debug, Deserialize)]
struct NfsExports {
    #[serde(default)]
    exports: Vec<NfsExport>,
}

// --- S3 ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct S3Grant {
    pub grantee: Persona,
    /// `READ`, `WRITE`, `READ_ACP`, `WRITE_ACP` or `FULL_CONTROL`
    pub permission: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct S3Bucket {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_acl_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<Vec<S3Grant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST /platform/10/protocols/s3/buckets`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct S3BucketCreate {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_path: Option<bool>,
    #[serde(flatten)]
    pub settings: S3BucketUpdate,
}

/// Only these bucket settings can change after creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct S3BucketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_acl_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<Vec<S3Grant>>,
}

#[derive(Debug, Deserialize)]
struct S3Buckets {
    #[serde(default)]
    buckets: Vec<S3Bucket>,
}

// --- NTP ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NtpServer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NtpServers {
    #[serde(default)]
    servers: Vec<NtpServer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NtpSettings {
    /// Number of nodes that will contact the NTP servers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chimers: Option<i64>,
    /// Node numbers that are not allowed to contact the NTP servers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NtpSettingsEnvelope {
    settings: NtpSettings,
}

#[derive(Debug, Serialize)]
struct NtpKeyUpdate<'a> {
    key: &'a str,
}

impl PowerScaleClient {
    // SMB

    pub async fn get_smb_share(&self, name: &str, zone: Option<&str>) -> ClientResult<SmbShare> {
        let path = format!("{}/{}", SMB_SHARES_PATH, segment(name));
        let shares: SmbShares = self.get(&path, &[("zone", zone)]).await?;
        single(shares.shares, "SMB share")
    }

    pub async fn create_smb_share(&self, share: &SmbShareParams, zone: Option<&str>) -> ClientResult<String> {
        let created: CreateResponse<String> =
            self.post(SMB_SHARES_PATH, &[("zone", zone)], share).await?;
        Ok(created.id)
    }

    pub async fn update_smb_share(
        &self,
        name: &str,
        share: &SmbShareParams,
        zone: Option<&str>,
    ) -> ClientResult<()> {
        let path = format!("{}/{}", SMB_SHARES_PATH, segment(name));
        self.put(&path, &[("zone", zone)], share).await
    }

    pub async fn delete_smb_share(&self, name: &str, zone: Option<&str>) -> ClientResult<()> {
        let path = format!("{}/{}", SMB_SHARES_PATH, segment(name));
        self.delete(&path, &[("zone", zone)]).await
    }

    // NFS

    pub async fn get_nfs_export(&self, id: &str, zone: Option<&str>) -> ClientResult<NfsExport> {
        let path = format!("{}/{}", NFS_EXPORTS_PATH, segment(id));
        let exports: NfsExports = self.get(&path, &[("zone", zone)]).await?;
        single(exports.exports, "NFS export")
    }

    /// Create an export and return its numeric id
    pub async fn create_nfs_export(&self, export: &NfsExportParams, zone: Option<&str>) -> ClientResult<i64> {
        let created: CreateResponse<i64> =
            self.post(NFS_EXPORTS_PATH, &[("zone", zone)], export).await?;
        Ok(created.id)
    }

    pub async fn update_nfs_export(
        &self,
        id: &str,
        export: &NfsExportParams,
        zone: Option<&str>,
    ) -> ClientResult<()> {
        let path = format!("{}/{}", NFS_EXPORTS_PATH, segment(id));
        self.put(&path, &[("zone", zone)], export).await
    }

    pub async fn delete_nfs_export(&self, id: &str, zone: Option<&str>) -> ClientResult<()> {
        let path = format!("{}/{}", NFS_EXPORTS_PATH, segment(id));
        self.delete(&path, &[("zone", zone)]).await
    }

    // S3

    pub async fn get_s3_bucket(&self, id: &str, zone: Option<&str>) -> ClientResult<S3Bucket> {
        let path = format!("{}/{}", S3_BUCKETS_PATH, segment(id));
        let buckets: S3Buckets = self.get(&path, &[("zone", zone)]).await?;
        single(buckets.buckets, "S3 bucket")
    }

    pub async fn create_s3_bucket(&self, bucket: &S3BucketCreate, zone: Option<&str>) -> ClientResult<String> {
        let created: CreateResponse<String> =
            self.post(S3_BUCKETS_PATH, &[("zone", zone)], bucket).await?;
        Ok(created.id)
    }

    pub async fn update_s3_bucket(
        &self,
        id: &str,
        bucket: &S3BucketUpdate,
        zone: Option<&str>,
    ) -> ClientResult<()> {
        let path = format!("{}/{}", S3_BUCKETS_PATH, segment(id));
        self.put(&path, &[("zone", zone)], bucket).await
    }

    pub async fn delete_s3_bucket(&self, id: &str, zone: Option<&str>) -> ClientResult<()> {
        let path = format!("{}/{}", S3_BUCKETS_PATH, segment(id));
        self.delete(&path, &[("zone", zone)]).await
    }

    // NTP

    pub async fn get_ntp_server(&self, id: &str) -> ClientResult<NtpServer> {
        let path = format!("{}/{}", NTP_SERVERS_PATH, segment(id));
        let servers: NtpServers = self.get(&path, &[]).await?;
        single(servers.servers, "NTP server")
    }

    pub async fn create_ntp_server(&self, server: &NtpServer) -> ClientResult<String> {
        let created: CreateResponse<String> = self.post(NTP_SERVERS_PATH, &[], server).await?;
        Ok(created.id)
    }

    pub async fn update_ntp_server_key(&self, id: &str, key: &str) -> ClientResult<()> {
        let path = format!("{}/{}", NTP_SERVERS_PATH, segment(id));
        self.put(&path, &[], &NtpKeyUpdate { key }).await
    }

    pub async fn delete_ntp_server(&self, id: &str) -> ClientResult<()> {
        let path = format!("{}/{}", NTP_SERVERS_PATH, segment(id));
        self.delete(&path, &[]).await
    }

    pub async fn get_ntp_settings(&self) -> ClientResult<NtpSettings> {
        let envelope: NtpSettingsEnvelope = self.get(NTP_SETTINGS_PATH, &[]).await?;
        Ok(envelope.settings)
    }

    pub async fn update_ntp_settings(&self, settings: &NtpSettings) -> ClientResult<()> {
        self.put(NTP_SETTINGS_PATH, &[], settings).await
    }
}
