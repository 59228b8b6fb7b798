//! Client configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::{ClientError, ClientResult};

/// Default request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// How the client authenticates against the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthType {
    /// HTTP basic credentials on every request
    #[default]
    Basic,
    /// Session cookie plus CSRF token obtained from `/session/1/session`
    Session,
}

impl FromStr for AuthType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" | "0" => Ok(AuthType::Basic),
            "session" | "1" => Ok(AuthType::Session),
            other => Err(ClientError::configuration(format!(
                "unknown auth type '{}', expected 'basic' or 'session'",
                other
            ))),
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::Basic => write!(f, "basic"),
            AuthType::Session => write!(f, "session"),
        }
    }
}

/// Connection settings for a PowerScale cluster
#[derive(Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    /// Skip TLS certificate verification
    pub insecure: bool,
    pub timeout: Duration,
    pub auth_type: AuthType,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"(sensitive)")
            .field("insecure", &self.insecure)
            .field("timeout", &self.timeout)
            .field("auth_type", &self.auth_type)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            insecure: false,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            auth_type: AuthType::default(),
        }
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }

    /// Parse and check the endpoint
    ///
    /// The endpoint must be an http(s) URL with a host. A trailing slash is
    /// dropped so that API paths can be appended directly.
    pub fn base_url(&self) -> ClientResult<Url> {
        let url = Url::parse(self.endpoint.trim_end_matches('/')).map_err(|e| {
            ClientError::configuration(format!("invalid endpoint '{}': {}", self.endpoint, e))
        })?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ClientError::configuration(format!(
                "unsupported endpoint scheme '{}'",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(ClientError::configuration(format!(
                "endpoint '{}' has no host",
                self.endpoint
            )));
        }
        Ok(url)
    }

    /// Check that every field needed to talk to the cluster is present
    pub fn validate(&self) -> ClientResult<()> {
        self.base_url()?;
        if self.username.is_empty() {
            return Err(ClientError::configuration("username must not be empty"));
        }
        if self.password.is_empty() {
            return Err(ClientError::configuration("password must not be empty"));
        }
        if self.timeout.is_zero() {
            return Err(ClientError::configuration("timeout must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_auth_type() {
        assert_eq!("session".parse::<AuthType>().unwrap(), AuthType::Session);
        assert_eq!("Basic".parse::<AuthType>().unwrap(), AuthType::Basic);
        assert_eq!("1".parse::<AuthType>().unwrap(), AuthType::Session);
        assert!("kerberos".parse::<AuthType>().is_err());
    }

    #[test]
    fn validates_endpoint() {
        let config = ClientConfig::new("https://10.0.0.1:8080/", "admin", "secret");
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url().unwrap().as_str(), "https://10.0.0.1:8080/");

        let bad = ClientConfig::new("ftp://cluster", "admin", "secret");
        assert!(bad.validate().is_err());

        let not_a_url = ClientConfig::new("cluster:8080", "admin", "secret");
        assert!(not_a_url.validate().is_err());
    }

    #[test]
    fn requires_credentials() {
        let config = ClientConfig::new("https://cluster:8080", "", "secret");
        assert!(config.validate().is_err());
        let config = ClientConfig::new("https://cluster:8080", "admin", "");
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_masks_password() {
        let config = ClientConfig::new("https://cluster:8080", "admin", "hunter2");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
    }
}
