//! Resource handlers, one per resource type

mod access_zone;
mod ads_provider;
mod cluster;
mod cluster_email;
mod groupnet;
mod ldap_provider;
mod nfs_export;
mod ntp_server;
mod ntp_settings;
mod quota;
mod role;
mod s3_bucket;
mod smb_share;
mod subnet;
mod user;

pub use access_zone::AccessZone;
pub use ads_provider::AdsProvider;
pub use cluster::Cluster;
pub use cluster_email::ClusterEmail;
pub use groupnet::Groupnet;
pub use ldap_provider::LdapProvider;
pub use nfs_export::NfsExport;
pub use ntp_server::NtpServer;
pub use ntp_settings::NtpSettings;
pub use quota::Quota;
pub use role::Role;
pub use s3_bucket::S3Bucket;
pub use smb_share::SmbShare;
pub use subnet::Subnet;
pub use user::User;

use powerscale_core::schema::{AttributeSchema, AttributeType};

use crate::handler::ResourceHandler;

/// Every handler the provider serves
pub fn all() -> Vec<Box<dyn ResourceHandler>> {
    vec![
        Box::new(AccessZone),
        Box::new(Groupnet),
        Box::new(Subnet),
        Box::new(AdsProvider),
        Box::new(LdapProvider),
        Box::new(SmbShare),
        Box::new(NfsExport),
        Box::new(S3Bucket),
        Box::new(Quota),
        Box::new(User),
        Box::new(Role),
        Box::new(NtpServer),
        Box::new(NtpSettings),
        Box::new(ClusterEmail),
        Box::new(Cluster),
    ]
}

/// A user, group or well-known identity block: `{ id, name, type }`
pub(crate) fn persona_type() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("id", AttributeType::String),
        AttributeSchema::new("name", AttributeType::String),
        AttributeSchema::new(
            "type",
            AttributeType::enumeration(&["user", "group", "wellknown"]),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn resource_types_are_unique() {
        let handlers = all();
        let types: HashSet<&str> = handlers.iter().map(|h| h.resource_type()).collect();
        assert_eq!(types.len(), handlers.len());
    }

    #[test]
    fn schema_type_matches_handler() {
        for handler in all() {
            assert_eq!(handler.schema().resource_type, handler.resource_type());
        }
    }
}
