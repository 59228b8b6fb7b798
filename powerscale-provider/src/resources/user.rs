//! powerscale.user
//!
//! Local users of an access zone, including their role memberships. Roles
//! hold the membership, so reading a user also lists the zone's roles.

use std::collections::BTreeSet;

use async_trait::async_trait;
use log::{debug, info};

use powerscale_client::auth::{Persona, Role, User as UserModel, UserCreate, UserUpdate};
use powerscale_client::{ClientResult, PowerScaleClient};
use powerscale_core::provider::ProviderResult;
use powerscale_core::resource::{Attributes, Resource, ResourceId, State, Value};
use powerscale_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::convert::{decode, parse_zone_id, string_attr, string_list_attr, to_attributes};
use crate::handler::{ResourceHandler, fail, found, require_identifier};

const CREATE_ERROR: &str = "Error creating user";
const READ_ERROR: &str = "Error reading user";
const UPDATE_ERROR: &str = "Error updating user";
const DELETE_ERROR: &str = "Error deleting user";
const IMPORT_ERROR: &str = "Error importing user";

pub struct User;

/// Whether `member` is the user `name` rather than a group or well-known
/// persona that happens to share the name
fn is_user_member(member: &Persona, name: &str) -> bool {
    if member.name.as_deref() != Some(name) {
        return false;
    }
    match member.persona_type.as_deref() {
        Some(kind) => kind.eq_ignore_ascii_case("user"),
        None => member
            .id
            .as_deref()
            .is_none_or(|id| id.starts_with("UID:") || id.starts_with("USER:")),
    }
}

/// Ids of the roles that list the user `name` as a member, sorted
fn roles_of(name: &str, roles: &[Role]) -> Vec<String> {
    let ids: BTreeSet<String> = roles
        .iter()
        .filter(|role| role.members.iter().any(|member| is_user_member(member, name)))
        .filter_map(|role| role.id.clone().or_else(|| role.name.clone()))
        .collect();
    ids.into_iter().collect()
}

/// Persona id used to remove a user from a role
fn member_id(name: &str) -> String {
    format!("USER:{}", name)
}

/// Numeric part of a persona id like `UID:2000`
fn persona_number(persona: Option<&Persona>) -> Option<i64> {
    persona
        .and_then(|p| p.id.as_deref())
        .and_then(|id| id.split_once(':'))
        .and_then(|(_, n)| n.parse().ok())
}

impl User {
    fn state(
        &self,
        id: &ResourceId,
        user: &UserModel,
        roles: &[Role],
        name: &str,
        zone: Option<&str>,
    ) -> State {
        let mut attributes = to_attributes(user, &self.schema());
        attributes.remove("uid");
        attributes.remove("sid");
        if let Some(uid) = persona_number(user.uid.as_ref()) {
            attributes.insert("uid".to_string(), Value::Int(uid));
        }
        if let Some(sid) = user.sid.as_ref().and_then(|p| p.id.clone()) {
            attributes.insert("sid".to_string(), Value::String(sid));
        }
        if let Some(group) = user.primary_group_sid.as_ref().and_then(|p| p.name.clone()) {
            attributes.insert("primary_group".to_string(), Value::String(group));
        }
        let name = user.name.clone().unwrap_or_else(|| name.to_string());
        attributes.insert(
            "roles".to_string(),
            Value::List(roles_of(&name, roles).into_iter().map(Value::String).collect()),
        );
        if let Some(zone) = zone {
            attributes.insert("zone".to_string(), Value::from(zone));
        }
        State::existing(id.clone(), attributes).with_identifier(name)
    }

    async fn fetch(
        client: &PowerScaleClient,
        name: &str,
        zone: Option<&str>,
    ) -> ClientResult<(UserModel, Vec<Role>)> {
        tokio::try_join!(client.get_user(name, zone), client.list_roles(zone))
    }

    /// Add and remove role memberships so the user is in exactly `desired`
    async fn sync_roles(
        client: &PowerScaleClient,
        name: &str,
        current: &[String],
        desired: &[String],
        zone: Option<&str>,
    ) -> ClientResult<()> {
        let current: BTreeSet<&String> = current.iter().collect();
        let desired: BTreeSet<&String> = desired.iter().collect();
        for role in desired.difference(&current) {
            debug!("adding user {} to role {}", name, role);
            client.add_role_member(role, &Persona::user(name), zone).await?;
        }
        for role in current.difference(&desired) {
            debug!("removing user {} from role {}", name, role);
            client.remove_role_member(role, &member_id(name), zone).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceHandler for User {
    fn resource_type(&self) -> &'static str {
        "user"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("user")
            .with_description("A local user of an access zone")
            .attribute(AttributeSchema::new("name", AttributeType::String).required().force_new())
            .attribute(AttributeSchema::new("password", AttributeType::String).write_only())
            .attribute(AttributeSchema::new("zone", AttributeType::String).force_new())
            .attribute(
                AttributeSchema::new("uid", types::positive_int())
                    .optional_computed()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("primary_group", AttributeType::String)
                    .optional_computed()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("email", types::email()).optional_computed())
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool).optional_computed())
            .attribute(
                AttributeSchema::new("expiry", AttributeType::Int)
                    .optional_computed()
                    .with_description("Expiry as seconds since the epoch"),
            )
            .attribute(AttributeSchema::new("gecos", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("home_directory", types::ifs_path()).optional_computed())
            .attribute(AttributeSchema::new("shell", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("password_expires", AttributeType::Bool).optional_computed())
            .attribute(
                AttributeSchema::new("roles", AttributeType::list_of(AttributeType::String))
                    .optional_computed()
                    .unordered()
                    .with_description("Roles the user is a member of"),
            )
            .attribute(AttributeSchema::new("sid", AttributeType::String).computed())
            .attribute(AttributeSchema::new("locked", AttributeType::Bool).computed())
            .attribute(AttributeSchema::new("provider", AttributeType::String).computed())
    }

    async fn read(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: Option<&str>,
        attributes: &Attributes,
    ) -> ProviderResult<State> {
        let Some(name) = identifier else {
            return Ok(State::not_found(id.clone()));
        };
        let zone = string_attr(attributes, "zone");
        match found(Self::fetch(client, name, zone.as_deref()).await)
            .map_err(|e| fail(READ_ERROR, id, e))?
        {
            Some((user, roles)) => Ok(self.state(id, &user, &roles, name, zone.as_deref())),
            None => Ok(State::not_found(id.clone())),
        }
    }

    async fn create(&self, client: &PowerScaleClient, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let attributes = &resource.attributes;
        let zone = string_attr(attributes, "zone");
        let settings: UserUpdate = decode(attributes, &self.schema()).map_err(|e| fail(CREATE_ERROR, id, e))?;
        let body = UserCreate {
            name: string_attr(attributes, "name").unwrap_or_else(|| id.name.clone()),
            password: string_attr(attributes, "password"),
            uid: attributes.get("uid").and_then(Value::as_int),
            primary_group: string_attr(attributes, "primary_group").map(|group| Persona {
                id: None,
                name: Some(group),
                persona_type: Some("group".to_string()),
            }),
            settings,
        };
        let sid = client
            .create_user(&body, zone.as_deref())
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        info!("created user {} ({})", body.name, sid);

        if let Some(roles) = string_list_attr(attributes, "roles") {
            Self::sync_roles(client, &body.name, &[], &roles, zone.as_deref())
                .await
                .map_err(|e| fail(CREATE_ERROR, id, e))?;
        }

        let (user, roles) = Self::fetch(client, &body.name, zone.as_deref())
            .await
            .map_err(|e| fail(CREATE_ERROR, id, e))?;
        Ok(self.state(id, &user, &roles, &body.name, zone.as_deref()))
    }

    async fn update(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let zone = string_attr(&to.attributes, "zone");
        let settings: UserUpdate =
            decode(&to.attributes, &self.schema()).map_err(|e| fail(UPDATE_ERROR, id, e))?;
        client
            .update_user(identifier, &settings, zone.as_deref())
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;

        // The previous password is only known from state
        if let Some(password) = string_attr(&to.attributes, "password")
            && string_attr(&from.attributes, "password").as_deref() != Some(password.as_str())
        {
            client
                .change_user_password(identifier, &password, zone.as_deref())
                .await
                .map_err(|e| fail(UPDATE_ERROR, id, e))?;
            info!("changed password of user {}", identifier);
        }

        if let Some(desired) = string_list_attr(&to.attributes, "roles") {
            let current = string_list_attr(&from.attributes, "roles").unwrap_or_default();
            Self::sync_roles(client, identifier, &current, &desired, zone.as_deref())
                .await
                .map_err(|e| fail(UPDATE_ERROR, id, e))?;
        }

        let (user, roles) = Self::fetch(client, identifier, zone.as_deref())
            .await
            .map_err(|e| fail(UPDATE_ERROR, id, e))?;
        Ok(self.state(id, &user, &roles, identifier, zone.as_deref()))
    }

    async fn delete(&self, client: &PowerScaleClient, state: &State) -> ProviderResult<()> {
        let name = require_identifier(DELETE_ERROR, state)?;
        let zone = string_attr(&state.attributes, "zone");
        let roles = client
            .list_roles(zone.as_deref())
            .await
            .map_err(|e| fail(DELETE_ERROR, &state.id, e))?;
        Self::sync_roles(client, name, &roles_of(name, &roles), &[], zone.as_deref())
            .await
            .map_err(|e| fail(DELETE_ERROR, &state.id, e))?;
        client
            .delete_user(name, zone.as_deref())
            .await
            .map_err(|e| fail(DELETE_ERROR, &state.id, e))
    }

    /// Import id is `zone:name` or `name`
    async fn import(
        &self,
        client: &PowerScaleClient,
        id: &ResourceId,
        import_id: &str,
    ) -> ProviderResult<State> {
        let (zone, name) = parse_zone_id(import_id);
        let (user, roles) = Self::fetch(client, &name, zone.as_deref())
            .await
            .map_err(|e| fail(IMPORT_ERROR, id, e))?;
        Ok(self.state(id, &user, &roles, &name, zone.as_deref()))
    }
}
