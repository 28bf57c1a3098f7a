//! JSON file persistence.

use super::{PersistError, StatePersistence};
use crate::store::LocalSnapshot;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use spendsync_core::PersistedState;
use std::path::{Path, PathBuf};

const STATE_FILE: &str = "sync_state.json";
const STORES_FILE: &str = "stores.json";

/// Stores `sync_state.json` and `stores.json` in a directory.
///
/// Writes go to a temporary file that is renamed into place, so a crash
/// mid-write leaves the previous version intact.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    dir: PathBuf,
}

impl JsonFilePersistence {
    /// Persist into `dir`, which is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, PersistError> {
        let path = self.dir.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_json<T: Serialize + Sync>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<(), PersistError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{}.tmp", name));

        let contents = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&tmp, contents).await?;
        set_file_permissions_0600(&tmp).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl StatePersistence for JsonFilePersistence {
    async fn load_state(&self) -> Result<Option<PersistedState>, PersistError> {
        self.read_json(STATE_FILE).await
    }

    async fn save_state(&self, state: &PersistedState) -> Result<(), PersistError> {
        self.write_json(STATE_FILE, state).await
    }

    async fn load_stores(&self) -> Result<Option<LocalSnapshot>, PersistError> {
        self.read_json(STORES_FILE).await
    }

    async fn save_stores(&self, stores: &LocalSnapshot) -> Result<(), PersistError> {
        self.write_json(STORES_FILE, stores).await
    }
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> Result<(), PersistError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStores;
    use spendsync_types::{MutationAction, SyncQueueItem, User};
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_files_load_as_none() {
        let dir = tempdir().unwrap();
        let persistence = JsonFilePersistence::new(dir.path());

        assert!(persistence.load_state().await.unwrap().is_none());
        assert!(persistence.load_stores().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn state_survives_reload() {
        let dir = tempdir().unwrap();
        let persistence = JsonFilePersistence::new(dir.path().join("nested"));

        let mut state = PersistedState::default();
        state
            .queue
            .enqueue(SyncQueueItem::new(MutationAction::Create, User::new("u1", "Ada")));
        state.has_hydrated_from_cloud = true;
        persistence.save_state(&state).await.unwrap();

        let reopened = JsonFilePersistence::new(dir.path().join("nested"));
        let loaded = reopened.load_state().await.unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn stores_survive_reload() {
        let dir = tempdir().unwrap();
        let persistence = JsonFilePersistence::new(dir.path());

        let mut stores = LocalStores::new();
        stores.apply_local(MutationAction::Create, &User::new("u1", "Ada").into());
        persistence.save_stores(&stores.snapshot()).await.unwrap();

        let loaded = persistence.load_stores().await.unwrap().unwrap();
        assert_eq!(loaded.users.len(), 1);
        assert!(!dir.path().join("stores.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_state_is_an_error() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join(STATE_FILE), b"{not json")
            .await
            .unwrap();

        let persistence = JsonFilePersistence::new(dir.path());
        assert!(matches!(
            persistence.load_state().await,
            Err(PersistError::Json(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn state_file_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let persistence = JsonFilePersistence::new(dir.path());
        persistence
            .save_state(&PersistedState::default())
            .await
            .unwrap();

        let path = dir.path().join(STATE_FILE);
        let perms = tokio::fs::metadata(&path).await.unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o600, "file should be 0600");
    }
}
