//! In-memory persistence for testing.

use super::{PersistError, StatePersistence};
use crate::store::LocalSnapshot;
use async_trait::async_trait;
use spendsync_core::PersistedState;
use std::sync::{Arc, Mutex};

/// In-memory persistence. Clones share the stored data.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    state: Option<PersistedState>,
    stores: Option<LocalSnapshot>,
    fail_saves: bool,
    saves: usize,
}

impl MemoryPersistence {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-loaded with a register, as after a restart.
    pub fn with_state(state: PersistedState) -> Self {
        let persistence = Self::new();
        persistence.inner.lock().unwrap().state = Some(state);
        persistence
    }

    /// Make every save fail until turned off.
    pub fn set_fail_saves(&self, fail: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_saves = fail;
    }

    /// Last saved register.
    pub fn state(&self) -> Option<PersistedState> {
        let inner = self.inner.lock().unwrap();
        inner.state.clone()
    }

    /// Last saved stores.
    pub fn stores(&self) -> Option<LocalSnapshot> {
        let inner = self.inner.lock().unwrap();
        inner.stores.clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.saves
    }
}

impl Clone for MemoryPersistence {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl StatePersistence for MemoryPersistence {
    async fn load_state(&self) -> Result<Option<PersistedState>, PersistError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.state.clone())
    }

    async fn save_state(&self, state: &PersistedState) -> Result<(), PersistError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_saves {
            return Err(PersistError::Unavailable("saves disabled".into()));
        }
        inner.state = Some(state.clone());
        inner.saves += 1;
        Ok(())
    }

    async fn load_stores(&self) -> Result<Option<LocalSnapshot>, PersistError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.stores.clone())
    }

    async fn save_stores(&self, stores: &LocalSnapshot) -> Result<(), PersistError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_saves {
            return Err(PersistError::Unavailable("saves disabled".into()));
        }
        inner.stores = Some(stores.clone());
        inner.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load() {
        let persistence = MemoryPersistence::new();
        let state = PersistedState {
            sync_enabled: false,
            ..PersistedState::default()
        };

        persistence.save_state(&state).await.unwrap();

        let loaded = persistence.load_state().await.unwrap().unwrap();
        assert!(!loaded.sync_enabled);
        assert_eq!(persistence.save_count(), 1);
    }

    #[tokio::test]
    async fn failing_saves_keep_previous_value() {
        let persistence = MemoryPersistence::with_state(PersistedState::default());
        persistence.set_fail_saves(true);

        let changed = PersistedState {
            has_hydrated_from_cloud: true,
            ..PersistedState::default()
        };
        assert!(persistence.save_state(&changed).await.is_err());
        assert!(!persistence.state().unwrap().has_hydrated_from_cloud);
    }
}
