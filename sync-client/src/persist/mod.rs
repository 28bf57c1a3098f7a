//! Durable storage for the sync register and local stores.
//!
//! Only [`PersistedState`] is written for the register; in-flight status,
//! the round guard, pull progress and the network snapshot are rebuilt on
//! load. Backends:
//! - [`JsonFilePersistence`] - two JSON files in a data directory
//! - [`MemoryPersistence`] - in-process, for tests

mod file;
mod memory;

pub use file::JsonFilePersistence;
pub use memory::MemoryPersistence;

use async_trait::async_trait;
use spendsync_core::PersistedState;
use thiserror::Error;

use crate::store::LocalSnapshot;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend refused the write.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Storage backend for sync state and local entity stores.
#[async_trait]
pub trait StatePersistence: Send + Sync {
    /// Load the register, or `None` on first run.
    async fn load_state(&self) -> Result<Option<PersistedState>, PersistError>;

    /// Save the register.
    async fn save_state(&self, state: &PersistedState) -> Result<(), PersistError>;

    /// Load the local stores, or `None` on first run.
    async fn load_stores(&self) -> Result<Option<LocalSnapshot>, PersistError>;

    /// Save the local stores.
    async fn save_stores(&self, stores: &LocalSnapshot) -> Result<(), PersistError>;
}
