//! Provider configuration
//!
//! Settings come from the `provider powerscale { ... }` block. Any field not
//! set there falls back to a `POWERSCALE_*` environment variable.

use std::time::Duration;

use powerscale_client::{AuthType, ClientConfig};
use powerscale_core::diagnostics::{Diagnostic, Diagnostics};
use powerscale_core::parser::ProviderConfig;
use powerscale_core::resource::Value;

pub const ENV_ENDPOINT: &str = "POWERSCALE_ENDPOINT";
pub const ENV_USERNAME: &str = "POWERSCALE_USERNAME";
pub const ENV_PASSWORD: &str = "POWERSCALE_PASSWORD";
pub const ENV_INSECURE: &str = "POWERSCALE_INSECURE";
pub const ENV_TIMEOUT: &str = "POWERSCALE_TIMEOUT";
pub const ENV_AUTH_TYPE: &str = "POWERSCALE_AUTH_TYPE";

const SUMMARY: &str = "Invalid provider configuration";

const KNOWN_ATTRIBUTES: &[&str] = &[
    "endpoint",
    "username",
    "password",
    "insecure",
    "timeout",
    "auth_type",
];

/// Build the client configuration from the provider block and the process
/// environment
pub fn client_config(provider: Option<&ProviderConfig>) -> Result<ClientConfig, Diagnostics> {
    resolve(provider, |key| std::env::var(key).ok())
}

/// Same as [`client_config`] with an explicit environment lookup
pub fn resolve(
    provider: Option<&ProviderConfig>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig, Diagnostics> {
    let mut diagnostics = Diagnostics::new();
    let attribute = |name: &str| provider.and_then(|p| p.attributes.get(name));

    if let Some(provider) = provider {
        for name in provider.attributes.keys() {
            if !KNOWN_ATTRIBUTES.contains(&name.as_str()) {
                diagnostics.push(
                    Diagnostic::error(SUMMARY)
                        .with_detail(format!("unknown provider attribute '{}'", name))
                        .for_attribute(name.clone()),
                );
            }
        }
    }

    let mut string = |name: &str, env_key: &str| -> Option<String> {
        match attribute(name) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                diagnostics.push(
                    Diagnostic::error(SUMMARY)
                        .with_detail(format!("{} must be a string, got {:?}", name, other))
                        .for_attribute(name),
                );
                None
            }
            None => env(env_key).filter(|v| !v.is_empty()),
        }
    };

    let endpoint = string("endpoint", ENV_ENDPOINT);
    let username = string("username", ENV_USERNAME);
    let password = string("password", ENV_PASSWORD);
    let auth_type_raw = string("auth_type", ENV_AUTH_TYPE);

    let insecure = match attribute("insecure") {
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            diagnostics.push(
                Diagnostic::error(SUMMARY)
                    .with_detail("insecure must be a boolean")
                    .for_attribute("insecure"),
            );
            false
        }
        None => env(ENV_INSECURE)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false),
    };

    let timeout = match attribute("timeout") {
        Some(Value::Int(ms)) if *ms > 0 => Some(*ms as u64),
        Some(_) => {
            diagnostics.push(
                Diagnostic::error(SUMMARY)
                    .with_detail("timeout must be a positive number of milliseconds")
                    .for_attribute("timeout"),
            );
            None
        }
        None => match env(ENV_TIMEOUT) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Some(ms),
                _ => {
                    diagnostics.add_error(
                        SUMMARY,
                        format!("{} must be a positive integer, got '{}'", ENV_TIMEOUT, raw),
                    );
                    None
                }
            },
            None => None,
        },
    };

    let auth_type = match auth_type_raw {
        Some(raw) => match raw.parse::<AuthType>() {
            Ok(auth_type) => auth_type,
            Err(e) => {
                diagnostics.push(
                    Diagnostic::error(SUMMARY)
                        .with_detail(e.to_string())
                        .for_attribute("auth_type"),
                );
                AuthType::default()
            }
        },
        None => AuthType::default(),
    };

    for (value, name, env_key) in [
        (&endpoint, "endpoint", ENV_ENDPOINT),
        (&username, "username", ENV_USERNAME),
        (&password, "password", ENV_PASSWORD),
    ] {
        if value.is_none() {
            diagnostics.push(
                Diagnostic::error(format!("Missing provider {}", name)).with_detail(format!(
                    "set '{}' in the provider block or the {} environment variable",
                    name, env_key
                )),
            );
        }
    }

    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    let mut config = ClientConfig::new(
        endpoint.unwrap_or_default(),
        username.unwrap_or_default(),
        password.unwrap_or_default(),
    )
    .with_insecure(insecure)
    .with_auth_type(auth_type);
    if let Some(ms) = timeout {
        config = config.with_timeout(Duration::from_millis(ms));
    }

    if let Err(e) = config.validate() {
        diagnostics.add_error(SUMMARY, e.to_string());
        return Err(diagnostics);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn block(attrs: &[(&str, Value)]) -> ProviderConfig {
        ProviderConfig {
            name: "powerscale".to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn block_values_win_over_environment() {
        let provider = block(&[
            ("endpoint", Value::from("https://10.0.0.1:8080")),
            ("username", Value::from("admin")),
            ("password", Value::from("pw")),
            ("insecure", Value::Bool(true)),
            ("timeout", Value::Int(5000)),
            ("auth_type", Value::from("session")),
        ]);
        let env = |key: &str| (key == ENV_ENDPOINT).then(|| "https://other:8080".to_string());
        let config = resolve(Some(&provider), env).unwrap();
        assert_eq!(config.endpoint, "https://10.0.0.1:8080");
        assert!(config.insecure);
        assert_eq!(config.timeout, Duration::from_millis(5000));
        assert_eq!(config.auth_type, AuthType::Session);
    }

    #[test]
    fn environment_fills_missing_fields() {
        let vars: HashMap<&str, &str> = [
            (ENV_ENDPOINT, "https://ps.example.com:8080"),
            (ENV_USERNAME, "admin"),
            (ENV_PASSWORD, "pw"),
            (ENV_INSECURE, "true"),
            (ENV_TIMEOUT, "3000"),
        ]
        .into_iter()
        .collect();
        let config = resolve(None, |key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.username, "admin");
        assert!(config.insecure);
        assert_eq!(config.timeout, Duration::from_millis(3000));
        assert_eq!(config.auth_type, AuthType::Basic);
    }

    #[test]
    fn missing_credentials_are_reported_together() {
        let provider = block(&[("endpoint", Value::from("https://10.0.0.1:8080"))]);
        let diags = resolve(Some(&provider), no_env).unwrap_err();
        assert_eq!(diags.error_count(), 2);
    }

    #[test]
    fn invalid_values_are_errors() {
        let provider = block(&[
            ("endpoint", Value::from("ftp://10.0.0.1")),
            ("username", Value::from("admin")),
            ("password", Value::from("pw")),
        ]);
        assert!(resolve(Some(&provider), no_env).is_err());

        let provider = block(&[
            ("endpoint", Value::from("https://10.0.0.1")),
            ("username", Value::from("admin")),
            ("password", Value::from("pw")),
            ("auth_type", Value::from("kerberos")),
            ("timeout", Value::Int(0)),
            ("region", Value::from("x")),
        ]);
        let diags = resolve(Some(&provider), no_env).unwrap_err();
        assert_eq!(diags.error_count(), 3);
    }
}
