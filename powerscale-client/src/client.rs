//! PowerScaleClient - typed access to the OneFS platform API

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};

/// Client for one cluster
///
/// Cheap to clone; clones share the transport (and therefore the session).
#[derive(Clone)]
pub struct PowerScaleClient {
    transport: Arc<dyn Transport>,
}

impl PowerScaleClient {
    /// Connect over HTTP with the given configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Execute a request and fail on non-success statuses
    pub async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        self.transport.execute(request).await?.error_for_status()
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, Option<&str>)],
    ) -> ClientResult<T> {
        let request = with_query(ApiRequest::new(Method::Get, path), query);
        self.execute(request).await?.decode()
    }

    /// POST a body and decode the response
    pub(crate) async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, Option<&str>)],
        body: &B,
    ) -> ClientResult<T> {
        let request = with_query(ApiRequest::new(Method::Post, path), query).with_body(to_json(body)?);
        self.execute(request).await?.decode()
    }

    /// POST a body and ignore the response
    pub(crate) async fn post_unit<B: Serialize>(
        &self,
        path: &str,
        query: &[(&str, Option<&str>)],
        body: &B,
    ) -> ClientResult<()> {
        let request = with_query(ApiRequest::new(Method::Post, path), query).with_body(to_json(body)?);
        self.execute(request).await.map(|_| ())
    }

    pub(crate) async fn put<B: Serialize>(
        &self,
        path: &str,
        query: &[(&str, Option<&str>)],
        body: &B,
    ) -> ClientResult<()> {
        let request = with_query(ApiRequest::new(Method::Put, path), query).with_body(to_json(body)?);
        self.execute(request).await.map(|_| ())
    }

    pub(crate) async fn delete(&self, path: &str, query: &[(&str, Option<&str>)]) -> ClientResult<()> {
        let request = with_query(ApiRequest::new(Method::Delete, path), query);
        self.execute(request).await.map(|_| ())
    }
}

fn with_query(request: ApiRequest, query: &[(&str, Option<&str>)]) -> ApiRequest {
    query
        .iter()
        .fold(request, |req, (key, value)| req.with_optional_query(key, *value))
}

fn to_json<B: Serialize>(body: &B) -> ClientResult<serde_json::Value> {
    Ok(serde_json::to_value(body)?)
}

/// Percent-encode a path segment (names may contain spaces or slashes)
pub(crate) fn segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Take the single object out of a OneFS list envelope like `{"zones":[..]}`
pub(crate) fn single<T>(items: Vec<T>, what: &str) -> ClientResult<T> {
    items.into_iter().next().ok_or_else(|| ClientError::Api {
        status: 404,
        code: Some("AEC_NOT_FOUND".to_string()),
        message: format!("{} not found in response", what),
    })
}

/// `{"id": ..}` body returned by create calls
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateResponse<T> {
    pub id: T,
}
