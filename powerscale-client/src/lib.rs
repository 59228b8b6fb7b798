//! PowerScale Client
//!
//! Thin REST client for the PowerScale OneFS platform API. Each API area
//! adds typed methods to [`PowerScaleClient`].

pub mod auth;
pub mod client;
pub mod cluster;
pub mod config;
pub mod error;
pub mod network;
pub mod protocols;
pub mod quota;
pub mod transport;
pub mod zones;

pub use client::PowerScaleClient;
pub use config::{AuthType, ClientConfig};
pub use error::{ClientError, ClientResult};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, MemoryTransport, Method, Transport};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn client() -> (Arc<MemoryTransport>, PowerScaleClient) {
        let transport = Arc::new(MemoryTransport::new());
        let client = PowerScaleClient::with_transport(transport.clone());
        (transport, client)
    }

    #[tokio::test]
    async fn get_zone_unwraps_envelope() {
        let (transport, client) = client();
        transport.on(
            Method::Get,
            "/platform/3/zones/5",
            200,
            json!({"zones": [{"zone_id": 5, "name": "hr", "path": "/ifs/hr", "groupnet": "groupnet0"}]}),
        );

        let zone = client.get_zone("5").await.unwrap();
        assert_eq!(zone.zone_id, Some(5));
        assert_eq!(zone.name.as_deref(), Some("hr"));
    }

    #[tokio::test]
    async fn api_errors_are_decoded() {
        let (transport, client) = client();
        transport.on(
            Method::Post,
            "/platform/7/protocols/smb/shares",
            409,
            json!({"errors": [{"code": "AEC_CONFLICT", "message": "Share name already in use"}]}),
        );

        let err = client
            .create_smb_share(&protocols::SmbShareParams::default(), Some("hr"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert!(err.to_string().contains("Share name already in use"));

        let sent = transport.requests_to(Method::Post, "/platform/7/protocols/smb/shares");
        assert_eq!(sent[0].query_value("zone"), Some("hr"));
    }

    #[tokio::test]
    async fn zone_query_is_omitted_when_unset() {
        let (transport, client) = client();
        transport.on(Method::Delete, "/platform/7/protocols/smb/shares/home", 204, json!(null));

        client.delete_smb_share("home", None).await.unwrap();
        let sent = transport.requests_to(Method::Delete, "/platform/7/protocols/smb/shares/home");
        assert!(sent[0].query.is_empty());
    }

    #[tokio::test]
    async fn update_bodies_skip_unset_fields() {
        let (transport, client) = client();
        transport.on(Method::Put, "/platform/12/quota/quotas/abc", 204, json!(null));

        let update = quota::QuotaUpdate {
            enforced: Some(true),
            ..Default::default()
        };
        client.update_quota("abc", &update).await.unwrap();

        let sent = transport.requests_to(Method::Put, "/platform/12/quota/quotas/abc");
        assert_eq!(sent[0].body, Some(json!({"enforced": true})));
    }

    #[tokio::test]
    async fn create_returns_id() {
        let (transport, client) = client();
        transport.on(Method::Post, "/platform/4/protocols/nfs/exports", 201, json!({"id": 17}));

        let id = client
            .create_nfs_export(&protocols::NfsExportParams::default(), None)
            .await
            .unwrap();
        assert_eq!(id, 17);
    }

    #[tokio::test]
    async fn settings_endpoints_use_settings_envelope() {
        let (transport, client) = client();
        transport.on(
            Method::Get,
            "/platform/3/protocols/ntp/settings",
            200,
            json!({"settings": {"chimers": 3, "excluded": [2], "key_file": ""}}),
        );
        let settings = client.get_ntp_settings().await.unwrap();
        assert_eq!(settings.chimers, Some(3));
        assert_eq!(settings.excluded, Some(vec![2]));
    }
}
