//! Authentication providers, local users and RBAC roles

use serde::{Deserialize, Serialize};

use crate::client::{CreateResponse, PowerScaleClient, segment, single};
use crate::error::ClientResult;

const ADS_PATH: &str = "/platform/14/auth/providers/ads";
const LDAP_PATH: &str = "/platform/11/auth/providers/ldap";
const USERS_PATH: &str = "/platform/1/auth/users";
const ROLES_PATH: &str = "/platform/14/auth/roles";

/// A user, group or well-known identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub persona_type: Option<String>,
}

impl Persona {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            persona_type: Some("user".to_string()),
        }
    }
}

// --- Active Directory ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdsProvider {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocate_gids: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocate_uids: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assume_default_domain: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_online_interval: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_home_directory: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_offline_alerts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_directory_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_shell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_users: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nss_enumeration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sfu_support: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_sfu_mappings: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub netbios_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forest: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST /platform/14/auth/providers/ads` (joins the domain)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdsProviderCreate {
    pub name: String,
    pub user: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_domain: Option<String>,
    #[serde(flatten)]
    pub settings: AdsProviderUpdate,
}

/// Settings that can change after the domain is joined
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdsProviderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocate_gids: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocate_uids: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assume_default_domain: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_online_interval: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_home_directory: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_offline_alerts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_directory_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_shell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_users: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nss_enumeration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sfu_support: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_sfu_mappings: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct AdsProviders {
    #[serde(default)]
    ads: Vec<AdsProvider>,
}

// --- LDAP ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LdapProvider {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_uris: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_dn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_secure_connection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_tls_errors: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of LDAP provider create and update calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LdapProviderParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_uris: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_dn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,
    /// Only accepted on create
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_secure_connection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_tls_errors: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_authority_file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LdapProviders {
    #[serde(default)]
    ldap: Vec<LdapProvider>,
}

// --- Users ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<Persona>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<Persona>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_group_sid: Option<Persona>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gecos: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_expires: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST /platform/1/auth/users`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_group: Option<Persona>,
    #[serde(flatten)]
    pub settings: UserUpdate,
}

/// Settings accepted by `PUT /platform/1/auth/users/{name}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gecos: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_expires: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct PasswordChange {
    password: String,
}

#[derive(Debug, Deserialize)]
struct Users {
    #[serde(default)]
    users: Vec<User>,
}

// --- Roles ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privilege {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `r`, `w`, `x` or `-`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<Persona>,
    #[serde(default)]
    pub privileges: Vec<Privilege>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of role create and update calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Persona>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privileges: Option<Vec<Privilege>>,
}

#[derive(Debug, Deserialize)]
struct Roles {
    #[serde(default)]
    roles: Vec<Role>,
}

impl PowerScaleClient {
    // ADS

    pub async fn get_ads_provider(&self, id: &str) -> ClientResult<AdsProvider> {
        let path = format!("{}/{}", ADS_PATH, segment(id));
        let providers: AdsProviders = self.get(&path, &[]).await?;
        single(providers.ads, "ADS provider")
    }

    pub async fn create_ads_provider(&self, provider: &AdsProviderCreate) -> ClientResult<String> {
        let created: CreateResponse<String> = self.post(ADS_PATH, &[], provider).await?;
        Ok(created.id)
    }

    pub async fn update_ads_provider(&self, id: &str, provider: &AdsProviderUpdate) -> ClientResult<()> {
        let path = format!("{}/{}", ADS_PATH, segment(id));
        self.put(&path, &[], provider).await
    }

    pub async fn delete_ads_provider(&self, id: &str) -> ClientResult<()> {
        let path = format!("{}/{}", ADS_PATH, segment(id));
        self.delete(&path, &[]).await
    }

    // LDAP

    pub async fn get_ldap_provider(&self, name: &str, zone: Option<&str>) -> ClientResult<LdapProvider> {
        let path = format!("{}/{}", LDAP_PATH, segment(name));
        let providers: LdapProviders = self.get(&path, &[("zone", zone)]).await?;
        single(providers.ldap, "LDAP provider")
    }

    pub async fn create_ldap_provider(
        &self,
        provider: &LdapProviderParams,
        zone: Option<&str>,
    ) -> ClientResult<String> {
        let created: CreateResponse<String> =
            self.post(LDAP_PATH, &[("zone", zone)], provider).await?;
        Ok(created.id)
    }

    pub async fn update_ldap_provider(
        &self,
        name: &str,
        provider: &LdapProviderParams,
        zone: Option<&str>,
    ) -> ClientResult<()> {
        let path = format!("{}/{}", LDAP_PATH, segment(name));
        self.put(&path, &[("zone", zone)], provider).await
    }

    pub async fn delete_ldap_provider(&self, name: &str, zone: Option<&str>) -> ClientResult<()> {
        let path = format!("{}/{}", LDAP_PATH, segment(name));
        self.delete(&path, &[("zone", zone)]).await
    }

    // Users

    pub async fn get_user(&self, name: &str, zone: Option<&str>) -> ClientResult<User> {
        let path = format!("{}/{}", USERS_PATH, segment(name));
        let users: Users = self.get(&path, &[("zone", zone)]).await?;
        single(users.users, "user")
    }

    /// Create a local user and return its SID
    pub async fn create_user(&self, user: &UserCreate, zone: Option<&str>) -> ClientResult<String> {
        let created: CreateResponse<String> = self.post(USERS_PATH, &[("zone", zone)], user).await?;
        Ok(created.id)
    }

    pub async fn update_user(&self, name: &str, user: &UserUpdate, zone: Option<&str>) -> ClientResult<()> {
        let path = format!("{}/{}", USERS_PATH, segment(name));
        self.put(&path, &[("zone", zone)], user).await
    }

    pub async fn change_user_password(
        &self,
        name: &str,
        password: &str,
        zone: Option<&str>,
    ) -> ClientResult<()> {
        let path = format!("{}/{}", USERS_PATH, segment(name));
        let body = PasswordChange {
            password: password.to_string(),
        };
        self.put(&path, &[("zone", zone)], &body).await
    }

    pub async fn delete_user(&self, name: &str, zone: Option<&str>) -> ClientResult<()> {
        let path = format!("{}/{}", USERS_PATH, segment(name));
        self.delete(&path, &[("zone", zone)]).await
    }

    // Roles

    pub async fn list_roles(&self, zone: Option<&str>) -> ClientResult<Vec<Role>> {
        let roles: Roles = self.get(ROLES_PATH, &[("zone", zone)]).await?;
        Ok(roles.roles)
    }

    pub async fn get_role(&self, id: &str, zone: Option<&str>) -> ClientResult<Role> {
        let path = format!("{}/{}", ROLES_PATH, segment(id));
        let roles: Roles = self.get(&path, &[("zone", zone)]).await?;
        single(roles.roles, "role")
    }

    pub async fn create_role(&self, role: &RoleParams, zone: Option<&str>) -> ClientResult<String> {
        let created: CreateResponse<String> = self.post(ROLES_PATH, &[("zone", zone)], role).await?;
        Ok(created.id)
    }

    pub async fn update_role(&self, id: &str, role: &RoleParams, zone: Option<&str>) -> ClientResult<()> {
        let path = format!("{}/{}", ROLES_PATH, segment(id));
        self.put(&path, &[("zone", zone)], role).await
    }

    pub async fn delete_role(&self, id: &str, zone: Option<&str>) -> ClientResult<()> {
        let path = format!("{}/{}", ROLES_PATH, segment(id));
        self.delete(&path, &[("zone", zone)]).await
    }

    pub async fn add_role_member(&self, role: &str, member: &Persona, zone: Option<&str>) -> ClientResult<()> {
        let path = format!("{}/{}/members", ROLES_PATH, segment(role));
        self.post_unit(&path, &[("zone", zone)], member).await
    }

    /// Remove a member by persona id (e.g. `UID:2000`)
    pub async fn remove_role_member(&self, role: &str, member_id: &str, zone: Option<&str>) -> ClientResult<()> {
        let path = format!("{}/{}/members/{}", ROLES_PATH, segment(role), segment(member_id));
        self.delete(&path, &[("zone", zone)]).await
    }
}
