//! PowerScale State Management
//!
//! Persists what the provider knows about managed OneFS objects between runs:
//! the remote identifier of each resource and the attributes last read back
//! from the cluster.
//!
//! # Overview
//!
//! - **StateFile**: All managed resources plus serial and lineage
//! - **StateBackend**: Storage trait with locking
//! - **LocalBackend**: JSON file on disk with a sibling `.lock` file
//! - **LockInfo**: Who holds the lock and until when
//!
//! # Example
//!
//! ```ignore
//! use powerscale_state::create_backend;
//!
//! let backend = create_backend(parsed.backend.as_ref())?;
//! let lock = backend.acquire_lock("apply").await?;
//! let mut state = backend.read_state().await?.unwrap_or_default();
//!
//! // ... apply changes, then record them ...
//!
//! state.increment_serial();
//! backend.write_state(&state).await?;
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendError, BackendResult, StateBackend};
pub use backends::{LocalBackend, create_backend};
pub use lock::LockInfo;
pub use state::{ResourceState, StateFile};
