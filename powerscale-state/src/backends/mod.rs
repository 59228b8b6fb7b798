//! Backend implementations for state storage

mod local;

pub use local::LocalBackend;

use powerscale_core::parser::BackendConfig;

use crate::backend::{BackendError, BackendResult, StateBackend};

/// Create the backend named by a `backend` block, or the local default
pub fn create_backend(config: Option<&BackendConfig>) -> BackendResult<Box<dyn StateBackend>> {
    let Some(config) = config else {
        return Ok(Box::new(LocalBackend::new()));
    };
    match config.backend_type.as_str() {
        "local" => Ok(Box::new(LocalBackend::from_config(config)?)),
        other => Err(BackendError::UnsupportedBackend(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_is_local() {
        let backend = create_backend(None).unwrap();
        assert_eq!(backend.location(), LocalBackend::DEFAULT_STATE_FILE);
    }

    #[test]
    fn unsupported_backend() {
        let config = BackendConfig {
            backend_type: "s3".to_string(),
            attributes: HashMap::new(),
        };
        match create_backend(Some(&config)) {
            Err(BackendError::UnsupportedBackend(name)) => assert_eq!(name, "s3"),
            _ => panic!("Expected UnsupportedBackend error"),
        }
    }
}
