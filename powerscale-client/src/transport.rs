//! Transport - Send API requests to the cluster
//!
//! `HttpTransport` talks to a real cluster. `MemoryTransport` answers from an
//! in-memory route table and records every request it sees.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::{AuthType, ClientConfig};
use crate::error::{ClientError, ClientResult};

/// Path of the session service
pub const SESSION_PATH: &str = "/session/1/session";

const SESSION_COOKIE: &str = "isisessid";
const CSRF_COOKIE: &str = "isicsrf";
const CSRF_HEADER: &str = "X-CSRF-Token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        write!(f, "{}", s)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the endpoint, e.g. `/platform/3/zones`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    /// Add `key=value` when a value is present
    pub fn with_optional_query(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.with_query(key, v),
            None => self,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response from the cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-success response into an error
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::from_response(self.status, &self.body))
        }
    }

    /// Decode the body; an empty body decodes as JSON `null`
    pub fn decode<T: DeserializeOwned>(&self) -> ClientResult<T> {
        let body = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Sends requests and returns raw responses
///
/// Implementations only report transport failures as errors. Non-success
/// statuses are returned as responses and turned into errors by the client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse>;
}

#[derive(Debug, Clone)]
struct Session {
    cookie: String,
    csrf: Option<String>,
}

/// reqwest-based transport
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    username: String,
    password: String,
    auth_type: AuthType,
    session: tokio::sync::Mutex<Option<Session>>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
            username: config.username.clone(),
            password: config.password.clone(),
            auth_type: config.auth_type,
            session: tokio::sync::Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::configuration(format!("invalid path '{}': {}", path, e)))
    }

    /// Create a session and remember its cookie and CSRF token
    async fn login(&self) -> ClientResult<Session> {
        debug!("POST {} (session login)", SESSION_PATH);
        let body = serde_json::json!({
            "username": self.username,
            "password": self.password,
            "services": ["platform", "namespace"],
        });
        let response = self
            .client
            .post(self.url(SESSION_PATH)?)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let session = session_from_headers(response.headers());
        if !(200..300).contains(&status) {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::from_response(status, &text));
        }

        session.ok_or_else(|| {
            ClientError::Transport(format!(
                "session response did not set the {} cookie",
                SESSION_COOKIE
            ))
        })
    }

    async fn current_session(&self, renew: bool) -> ClientResult<Session> {
        let mut guard = self.session.lock().await;
        if !renew && let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }
        let session = self.login().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn send(&self, request: &ApiRequest, session: Option<&Session>) -> ClientResult<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method.into(), self.url(&request.path)?)
            .query(&request.query);

        builder = match session {
            Some(session) => {
                let mut headers = HeaderMap::new();
                let cookie = HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, session.cookie))
                    .map_err(|e| ClientError::Transport(e.to_string()))?;
                headers.insert(COOKIE, cookie);
                if let Some(csrf) = &session.csrf {
                    let value = HeaderValue::from_str(csrf)
                        .map_err(|e| ClientError::Transport(e.to_string()))?;
                    headers.insert(CSRF_HEADER, value);
                }
                builder.headers(headers)
            }
            None => builder.basic_auth(&self.username, Some(&self.password)),
        };

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("{} {} -> {}", request.method, request.path, status);
        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        debug!("{} {} {:?}", request.method, request.path, request.query);
        match self.auth_type {
            AuthType::Basic => self.send(&request, None).await,
            AuthType::Session => {
                let session = self.current_session(false).await?;
                let response = self.send(&request, Some(&session)).await?;
                if response.status != 401 {
                    return Ok(response);
                }
                // Session expired: log in again once
                debug!("session rejected, logging in again");
                let session = self.current_session(true).await?;
                self.send(&request, Some(&session)).await
            }
        }
    }
}

/// Extract the session cookie and CSRF token from Set-Cookie headers
fn session_from_headers(headers: &HeaderMap) -> Option<Session> {
    let mut cookie = None;
    let mut csrf = None;
    for value in headers.get_all(SET_COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let Some(pair) = value.split(';').next() else {
            continue;
        };
        match pair.trim().split_once('=') {
            Some((SESSION_COOKIE, v)) => cookie = Some(v.to_string()),
            Some((CSRF_COOKIE, v)) => csrf = Some(v.to_string()),
            _ => {}
        }
    }
    cookie.map(|cookie| Session { cookie, csrf })
}

/// In-memory transport answering from canned responses
///
/// Responses registered for a method and path are returned in order. The
/// last one keeps being returned once the others are used up. Unknown routes
/// answer 404 with a OneFS error body. The query string is not part of the
/// route; use [`MemoryTransport::requests`] to check it.
#[derive(Default)]
pub struct MemoryTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response for a route
    pub fn on(&self, method: Method, path: &str, status: u16, body: serde_json::Value) -> &Self {
        let response = if body.is_null() {
            ApiResponse::new(status, "")
        } else {
            ApiResponse::json(status, body)
        };
        if let Ok(mut routes) = self.routes.lock() {
            routes
                .entry((method, path.to_string()))
                .or_default()
                .push_back(response);
        }
        self
    }

    /// Drop all responses registered for a route
    pub fn clear(&self, method: Method, path: &str) -> &Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.remove(&(method, path.to_string()));
        }
        self
    }

    /// Every request executed so far, in order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Requests executed for a method and path
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let key = (request.method, request.path.clone());
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let mut routes = self
            .routes
            .lock()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let response = match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        Ok(response.unwrap_or_else(|| {
            ApiResponse::json(
                404,
                serde_json::json!({
                    "errors": [{
                        "code": "AEC_NOT_FOUND",
                        "message": format!("{} {} not found", key.0, key.1),
                    }]
                }),
            )
        }))
    }
}
