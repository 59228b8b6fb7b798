//! State backend trait and error types

use async_trait::async_trait;
use thiserror::Error;

use crate::lock::LockInfo;
use crate::state::StateFile;

/// Errors from reading, writing or locking state
#[derive(Debug, Error)]
pub enum BackendError {
    /// Another process holds the lock
    #[error("State is locked by {who} (lock ID: {lock_id}, operation: {operation})")]
    Locked {
        lock_id: String,
        who: String,
        operation: String,
    },

    /// A lock file exists but does not hold a complete lock, either because
    /// its owner is still writing it or because it was damaged
    #[error("Lock file {0} is unreadable; if no command is running, remove it with force-unlock")]
    UnreadableLock(String),

    /// No lock to release or unlock
    #[error("Lock not found: {0}")]
    LockNotFound(String),

    /// The lock on disk belongs to someone else
    #[error("Lock ID mismatch: expected {expected}, got {actual}")]
    LockMismatch { expected: String, actual: String },

    /// The `backend` block names a type with no implementation
    #[error("Unsupported backend type: {0}")]
    UnsupportedBackend(String),

    /// The `backend` block has a missing or invalid attribute
    #[error("Backend configuration error: {0}")]
    Configuration(String),

    /// The state file is corrupted or invalid
    #[error("Invalid state file: {0}")]
    InvalidState(String),

    /// The state file was written by a newer version of this tool
    #[error("State file version {0} is newer than this tool supports")]
    UnsupportedVersion(u32),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BackendError {
    /// Create a Locked error from a LockInfo
    pub fn locked(lock: &LockInfo) -> Self {
        Self::Locked {
            lock_id: lock.id.clone(),
            who: lock.who.clone(),
            operation: lock.operation.clone(),
        }
    }

    /// Create a Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Storage for the state file with exclusive locking
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Human readable location, for messages
    fn location(&self) -> String;

    /// Read the current state; `None` before the first write
    async fn read_state(&self) -> BackendResult<Option<StateFile>>;

    /// Write the state. Callers increment the serial first.
    async fn write_state(&self, state: &StateFile) -> BackendResult<()>;

    /// Take the lock, failing while another unexpired lock is held
    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo>;

    /// Release a lock this process acquired
    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()>;

    /// Remove a lock by id, whoever holds it
    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_error_names_holder() {
        let lock = LockInfo::new("apply");
        match BackendError::locked(&lock) {
            BackendError::Locked {
                lock_id,
                who,
                operation,
            } => {
                assert_eq!(lock_id, lock.id);
                assert_eq!(who, lock.who);
                assert_eq!(operation, "apply");
            }
            other => panic!("Expected Locked error, got {:?}", other),
        }
    }

    #[test]
    fn error_display() {
        let error = BackendError::UnsupportedBackend("s3".to_string());
        assert_eq!(error.to_string(), "Unsupported backend type: s3");
        assert_eq!(
            BackendError::UnsupportedVersion(9).to_string(),
            "State file version 9 is newer than this tool supports"
        );
    }
}
