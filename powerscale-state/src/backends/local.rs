//! Local file backend
//!
//! State lives in a JSON file (default: powerscale.state.json). A sibling
//! `.lock` file holds the serialized `LockInfo` while a command runs.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use log::warn;

use powerscale_core::parser::BackendConfig;
use powerscale_core::resource::Value;

use crate::backend::{BackendError, BackendResult, StateBackend};
use crate::lock::LockInfo;
use crate::state::StateFile;

pub struct LocalBackend {
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl LocalBackend {
    pub const DEFAULT_STATE_FILE: &'static str = "powerscale.state.json";

    pub fn new() -> Self {
        Self::with_path(PathBuf::from(Self::DEFAULT_STATE_FILE))
    }

    pub fn with_path(state_path: PathBuf) -> Self {
        let lock_path = state_path.with_extension("lock");
        Self {
            state_path,
            lock_path,
        }
    }

    /// Build from a `backend local { path = "..." }` block
    pub fn from_config(config: &BackendConfig) -> BackendResult<Self> {
        let mut path = None;
        for (key, value) in &config.attributes {
            match (key.as_str(), value) {
                ("path", Value::String(s)) if !s.is_empty() => path = Some(PathBuf::from(s)),
                ("path", _) => {
                    return Err(BackendError::configuration(
                        "path must be a non-empty string",
                    ));
                }
                (other, _) => {
                    return Err(BackendError::configuration(format!(
                        "unknown attribute '{}' for local backend",
                        other
                    )));
                }
            }
        }
        Ok(match path {
            Some(path) => Self::with_path(path),
            None => Self::new(),
        })
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    async fn read_lock(&self) -> BackendResult<Option<LockFile>> {
        read_lock_at(&self.lock_path).await
    }

    async fn remove_lock(&self) -> BackendResult<()> {
        tokio::fs::remove_file(&self.lock_path)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to remove lock file: {}", e)))
    }

    async fn create_parent_dir(&self) -> BackendResult<()> {
        if let Some(parent) = self.state_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BackendError::Io(format!("Failed to create state directory: {}", e)))?;
        }
        Ok(())
    }

    /// Sibling of the lock file that no other process will pick
    fn scratch_path(&self, suffix: &str) -> PathBuf {
        let mut name = self.lock_path.as_os_str().to_owned();
        name.push(format!(".{}.{}", uuid::Uuid::new_v4(), suffix));
        PathBuf::from(name)
    }

    /// Publish `content` as the lock file unless one already exists
    ///
    /// The lock is written in full to a scratch file and hard-linked into
    /// place, so the lock path never holds a partial `LockInfo`.
    async fn try_create_lock(&self, content: &str) -> BackendResult<bool> {
        let scratch = self.scratch_path("new");
        tokio::fs::write(&scratch, content)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to write lock file: {}", e)))?;
        let linked = tokio::fs::hard_link(&scratch, &self.lock_path).await;
        let _ = tokio::fs::remove_file(&scratch).await;
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(BackendError::Io(format!("Failed to create lock file: {}", e))),
        }
    }

    /// Move the expired lock `stale` out of the way
    ///
    /// Returns false when another process replaced it first; that lock is put
    /// back untouched.
    async fn clear_expired_lock(&self, stale: &LockInfo) -> BackendResult<bool> {
        let aside = self.scratch_path("expired");
        match tokio::fs::rename(&self.lock_path, &aside).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(BackendError::Io(format!("Failed to move lock file: {}", e))),
        }

        let moved = read_lock_at(&aside).await?;
        if matches!(&moved, Some(LockFile::Held(lock)) if lock.id == stale.id) {
            let _ = tokio::fs::remove_file(&aside).await;
            return Ok(true);
        }

        warn!("lock file changed while taking over expired lock {}", stale.id);
        let restored = tokio::fs::hard_link(&aside, &self.lock_path).await;
        let _ = tokio::fs::remove_file(&aside).await;
        match restored {
            Ok(()) => Ok(false),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(BackendError::Io(format!("Failed to restore lock file: {}", e))),
        }
    }

    /// Error describing whoever holds the lock now
    async fn current_lock_error(&self) -> BackendError {
        match self.read_lock().await {
            Ok(Some(LockFile::Held(existing))) => BackendError::locked(&existing),
            Ok(Some(LockFile::Unreadable)) => {
                BackendError::UnreadableLock(self.lock_path.display().to_string())
            }
            Ok(None) => BackendError::Io("Lock file changed while acquiring the lock".to_string()),
            Err(e) => e,
        }
    }
}

/// Contents of an existing lock file
enum LockFile {
    Held(LockInfo),
    /// Present but not a complete `LockInfo`
    Unreadable,
}

async fn read_lock_at(path: &Path) -> BackendResult<Option<LockFile>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(match serde_json::from_str(&content) {
            Ok(lock) => LockFile::Held(lock),
            Err(_) => LockFile::Unreadable,
        })),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BackendError::Io(format!("Failed to read lock file: {}", e))),
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize<T: serde::Serialize>(value: &T) -> BackendResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| BackendError::Serialization(e.to_string()))
}

#[async_trait]
impl StateBackend for LocalBackend {
    fn location(&self) -> String {
        self.state_path.display().to_string()
    }

    async fn read_state(&self) -> BackendResult<Option<StateFile>> {
        let content = match tokio::fs::read_to_string(&self.state_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackendError::Io(format!("Failed to read state file: {}", e))),
        };

        let state: StateFile = serde_json::from_str(&content)
            .map_err(|e| BackendError::InvalidState(format!("Failed to parse state file: {}", e)))?;
        if state.version > StateFile::CURRENT_VERSION {
            return Err(BackendError::UnsupportedVersion(state.version));
        }
        Ok(Some(state))
    }

    async fn write_state(&self, state: &StateFile) -> BackendResult<()> {
        let content = serialize(state)?;

        self.create_parent_dir().await?;

        // Readers only ever see a complete file
        let tmp_path = self.state_path.with_extension("tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to write state file: {}", e)))?;
        tokio::fs::rename(&tmp_path, &self.state_path)
            .await
            .map_err(|e| BackendError::Io(format!("Failed to write state file: {}", e)))
    }

    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo> {
        let lock = LockInfo::new(operation);
        let content = serialize(&lock)?;
        self.create_parent_dir().await?;

        if self.try_create_lock(&content).await? {
            return Ok(lock);
        }

        let existing = match self.read_lock().await? {
            // Released between the two calls
            None => None,
            Some(LockFile::Held(existing)) if existing.is_expired() => Some(existing),
            Some(LockFile::Held(existing)) => return Err(BackendError::locked(&existing)),
            Some(LockFile::Unreadable) => {
                return Err(BackendError::UnreadableLock(self.lock_path.display().to_string()));
            }
        };

        if let Some(stale) = existing {
            if !self.clear_expired_lock(&stale).await? {
                return Err(self.current_lock_error().await);
            }
            warn!("taking over expired lock {} held by {}", stale.id, stale.who);
        }

        if self.try_create_lock(&content).await? {
            Ok(lock)
        } else {
            Err(self.current_lock_error().await)
        }
    }

    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()> {
        let existing = match self.read_lock().await? {
            Some(LockFile::Held(existing)) => existing,
            Some(LockFile::Unreadable) => {
                return Err(BackendError::UnreadableLock(self.lock_path.display().to_string()));
            }
            None => return Err(BackendError::LockNotFound(lock.id.clone())),
        };
        if existing.id != lock.id {
            return Err(BackendError::LockMismatch {
                expected: lock.id.clone(),
                actual: existing.id,
            });
        }
        self.remove_lock().await
    }

    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()> {
        if !self.lock_path.exists() {
            return Err(BackendError::LockNotFound(lock_id.to_string()));
        }
        if let Some(LockFile::Held(existing)) = self.read_lock().await?
            && existing.id != lock_id
        {
            return Err(BackendError::LockMismatch {
                expected: lock_id.to_string(),
                actual: existing.id,
            });
        }
        self.remove_lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ResourceState;
    use tempfile::tempdir;

    fn config(attrs: &[(&str, Value)]) -> BackendConfig {
        BackendConfig {
            backend_type: "local".to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn read_write() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("nested/test.state.json"));

        assert!(backend.read_state().await.unwrap().is_none());

        let mut state = StateFile::new();
        state.upsert_resource(ResourceState::new("access_zone", "hr").with_identifier("hr"));
        state.increment_serial();
        backend.write_state(&state).await.unwrap();

        let read = backend.read_state().await.unwrap().unwrap();
        assert_eq!(read.serial, 1);
        assert_eq!(read.lineage, state.lineage);
        assert_eq!(read.resources, state.resources);
        assert!(!dir.path().join("nested/test.state.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_and_future_files_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.state.json");
        let backend = LocalBackend::with_path(path.clone());

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            backend.read_state().await,
            Err(BackendError::InvalidState(_))
        ));

        let mut state = StateFile::new();
        state.version = StateFile::CURRENT_VERSION + 1;
        std::fs::write(&path, serde_json::to_string(&state).unwrap()).unwrap();
        assert!(matches!(
            backend.read_state().await,
            Err(BackendError::UnsupportedVersion(_))
        ));
    }

    #[tokio::test]
    async fn locking() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        let lock = backend.acquire_lock("apply").await.unwrap();
        assert!(backend.lock_path().exists());
        assert!(matches!(
            backend.acquire_lock("destroy").await,
            Err(BackendError::Locked { .. })
        ));

        let stranger = LockInfo::new("apply");
        assert!(matches!(
            backend.release_lock(&stranger).await,
            Err(BackendError::LockMismatch { .. })
        ));

        backend.release_lock(&lock).await.unwrap();
        assert!(!backend.lock_path().exists());

        let lock = backend.acquire_lock("destroy").await.unwrap();
        assert_eq!(lock.operation, "destroy");
        backend.release_lock(&lock).await.unwrap();
    }

    #[tokio::test]
    async fn expired_lock_is_taken_over() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        let stale = LockInfo::with_timeout("apply", -60);
        std::fs::write(backend.lock_path(), serde_json::to_string(&stale).unwrap()).unwrap();

        let lock = backend.acquire_lock("apply").await.unwrap();
        assert_ne!(lock.id, stale.id);
        // only the new lock file remains
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn partially_written_lock_counts_as_held() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        std::fs::write(backend.lock_path(), "").unwrap();

        assert!(matches!(
            backend.acquire_lock("apply").await,
            Err(BackendError::UnreadableLock(_))
        ));
        assert_eq!(std::fs::read_to_string(backend.lock_path()).unwrap(), "");

        backend.force_unlock("unknown").await.unwrap();
        let lock = backend.acquire_lock("apply").await.unwrap();
        backend.release_lock(&lock).await.unwrap();
    }

    #[tokio::test]
    async fn expired_takeover_backs_off_when_lock_was_replaced() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));
        let stale = LockInfo::with_timeout("apply", -60);
        let fresh = LockInfo::new("destroy");
        std::fs::write(backend.lock_path(), serde_json::to_string(&fresh).unwrap()).unwrap();

        assert!(!backend.clear_expired_lock(&stale).await.unwrap());
        let on_disk: LockInfo =
            serde_json::from_str(&std::fs::read_to_string(backend.lock_path()).unwrap()).unwrap();
        assert_eq!(on_disk.id, fresh.id);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn force_unlock_checks_id() {
        let dir = tempdir().unwrap();
        let backend = LocalBackend::with_path(dir.path().join("test.state.json"));

        assert!(matches!(
            backend.force_unlock("nope").await,
            Err(BackendError::LockNotFound(_))
        ));

        let lock = backend.acquire_lock("apply").await.unwrap();
        assert!(backend.force_unlock("other").await.is_err());
        backend.force_unlock(&lock.id).await.unwrap();
        assert!(!backend.lock_path().exists());
    }

    #[test]
    fn from_config() {
        let backend = LocalBackend::from_config(&config(&[])).unwrap();
        assert_eq!(backend.state_path(), Path::new("powerscale.state.json"));
        assert_eq!(backend.lock_path(), Path::new("powerscale.state.lock"));

        let backend =
            LocalBackend::from_config(&config(&[("path", Value::from("state/prod.json"))])).unwrap();
        assert_eq!(backend.state_path(), Path::new("state/prod.json"));

        assert!(LocalBackend::from_config(&config(&[("path", Value::Int(1))])).is_err());
        assert!(LocalBackend::from_config(&config(&[("bucket", Value::from("x"))])).is_err());
    }
}
