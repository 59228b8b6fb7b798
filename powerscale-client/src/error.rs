//! Client error types

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the PowerScale client
#[derive(Debug, Error)]
pub enum ClientError {
    /// The cluster answered with a non-success status
    #[error("{}", format_api_error(*status, code, message))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body did not match the expected model
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The client configuration is unusable
    #[error("Invalid client configuration: {0}")]
    Configuration(String),
}

fn format_api_error(status: u16, code: &Option<String>, message: &str) -> String {
    match code {
        Some(code) => format!("{} (HTTP {}, {})", message, status, code),
        None => format!("{} (HTTP {})", message, status),
    }
}

impl ClientError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Build an API error from a OneFS error body
    ///
    /// OneFS reports failures as `{"errors":[{"code":..,"message":..}]}`.
    /// Multiple messages are joined; an undecodable body is kept verbatim.
    pub fn from_response(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            #[serde(default)]
            errors: Vec<ErrorEntry>,
        }

        #[derive(Deserialize)]
        struct ErrorEntry {
            code: Option<String>,
            message: Option<String>,
        }

        if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body)
            && !parsed.errors.is_empty()
        {
            let code = parsed.errors.iter().find_map(|e| e.code.clone());
            let message = parsed
                .errors
                .iter()
                .filter_map(|e| e.message.as_deref())
                .collect::<Vec<_>>()
                .join("; ");
            return Self::Api {
                status,
                code,
                message,
            };
        }

        let message = if body.trim().is_empty() {
            "empty response body".to_string()
        } else {
            body.trim().to_string()
        };
        Self::Api {
            status,
            code: None,
            message,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_onefs_error_body() {
        let body = r#"{"errors":[{"code":"AEC_NOT_FOUND","message":"Path not found"}]}"#;
        let err = ClientError::from_response(404, body);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Path not found (HTTP 404, AEC_NOT_FOUND)"
        );
    }

    #[test]
    fn joins_multiple_messages() {
        let body = r#"{"errors":[{"message":"first"},{"code":"AEC_EXCEPTION","message":"second"}]}"#;
        match ClientError::from_response(500, body) {
            ClientError::Api { code, message, .. } => {
                assert_eq!(code.as_deref(), Some("AEC_EXCEPTION"));
                assert_eq!(message, "first; second");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn keeps_plain_text_body() {
        let err = ClientError::from_response(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "Bad Gateway (HTTP 502)");
        assert!(!err.is_not_found());
    }
}
