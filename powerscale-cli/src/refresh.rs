//! Refreshing recorded state against the cluster

use std::collections::HashMap;

use log::{debug, warn};

use powerscale_core::diagnostics::{Diagnostic, Diagnostics};
use powerscale_core::provider::Provider;
use powerscale_core::schema::ResourceSchema;
use powerscale_provider::convert::carry_write_only;
use powerscale_state::StateFile;

/// Re-read every resource recorded in `state_file`
///
/// Write-only values come from the prior entry. Entries the cluster no longer
/// has are dropped with a warning so the plan recreates them if they are still
/// configured. Read failures are returned as errors and leave the entry as is.
pub async fn refresh<P: Provider>(
    provider: &P,
    schemas: &HashMap<String, ResourceSchema>,
    state_file: &mut StateFile,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    for prior in state_file.states() {
        debug!("refreshing {}", prior.id);
        let result = provider
            .read(&prior.id, prior.identifier.as_deref(), &prior.attributes)
            .await;

        match result {
            Ok(mut current) if current.exists => {
                if let Some(schema) = schemas.get(&prior.id.resource_type) {
                    carry_write_only(&mut current.attributes, &prior.attributes, schema);
                }
                if current.identifier.is_none() {
                    current.identifier = prior.identifier.clone();
                }
                if current.attributes != prior.attributes {
                    warn!("{} changed outside of this configuration", prior.id);
                }
                state_file.record(&current);
            }
            Ok(_) => {
                diagnostics.push(
                    Diagnostic::warning("Resource no longer exists")
                        .with_detail(format!(
                            "{} was removed outside of this configuration and will be recreated if still declared",
                            prior.id
                        ))
                        .for_resource(prior.id.clone()),
                );
                state_file.remove_resource(&prior.id.resource_type, &prior.id.name);
            }
            Err(e) => diagnostics.push(Diagnostic::from(&e)),
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use powerscale_client::{Method, MemoryTransport, PowerScaleClient};
    use powerscale_core::resource::{Attributes, ResourceId, State, Value};
    use powerscale_provider::PowerScaleProvider;
    use serde_json::json;

    use crate::workspace::schema_map;

    fn provider() -> (Arc<MemoryTransport>, PowerScaleProvider) {
        let transport = Arc::new(MemoryTransport::new());
        let client = PowerScaleClient::with_transport(transport.clone());
        (transport, PowerScaleProvider::with_client(client))
    }

    fn recorded_ldap() -> StateFile {
        let mut attributes = Attributes::new();
        attributes.insert("name".to_string(), Value::from("corp"));
        attributes.insert("base_dn".to_string(), Value::from("dc=old"));
        attributes.insert("bind_password".to_string(), Value::from("pw"));
        let mut file = StateFile::new();
        file.record(
            &State::existing(ResourceId::new("ldap_provider", "corp"), attributes)
                .with_identifier("corp"),
        );
        file
    }

    #[tokio::test]
    async fn refresh_keeps_write_only_values() {
        let (transport, provider) = provider();
        transport.on(
            Method::Get,
            "/platform/11/auth/providers/ldap/corp",
            200,
            json!({"ldap": [{"id": "corp", "name": "corp", "base_dn": "dc=corp"}]}),
        );

        let mut file = recorded_ldap();
        let diagnostics = refresh(&provider, &schema_map(), &mut file).await;
        assert!(diagnostics.is_empty());

        let state = &file.state_map()[&ResourceId::new("ldap_provider", "corp")];
        assert_eq!(state.attributes.get("base_dn"), Some(&Value::from("dc=corp")));
        assert_eq!(state.attributes.get("bind_password"), Some(&Value::from("pw")));
        assert_eq!(state.identifier.as_deref(), Some("corp"));
    }

    #[tokio::test]
    async fn vanished_resources_are_dropped_with_a_warning() {
        let (transport, provider) = provider();
        transport.on(
            Method::Get,
            "/platform/11/auth/providers/ldap/corp",
            404,
            json!({"errors": [{"code": "AEC_NOT_FOUND", "message": "Provider not found"}]}),
        );

        let mut file = recorded_ldap();
        let diagnostics = refresh(&provider, &schema_map(), &mut file).await;
        assert!(!diagnostics.has_errors());
        assert!(!diagnostics.is_empty());
        assert!(file.resources.is_empty());
    }
}
