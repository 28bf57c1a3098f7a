//! Directory-backed remote store.
//!
//! Lets the CLI exercise the full sync engine without a cloud backend.
//! Records live at `<root>/<account>/<kind>/<id>.json`, one tagged
//! payload per file. Point several data directories at the same root to
//! simulate multiple devices sharing one account.

use async_trait::async_trait;
use spendsync_client::{Credential, RemoteError, RemoteStore};
use spendsync_types::{AccountId, EntityId, EntityKind, EntityPayload};
use std::io;
use std::path::{Path, PathBuf};

/// A [`RemoteStore`] over a shared directory.
#[derive(Debug, Clone)]
pub struct DirRemoteStore {
    root: PathBuf,
}

impl DirRemoteStore {
    /// Use `root` as the remote store. Created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The remote root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_dir(&self, account: &AccountId, kind: EntityKind) -> Result<PathBuf, RemoteError> {
        let account = safe_segment(account.as_str())?;
        Ok(self.root.join(account).join(kind.as_str()))
    }

    fn record_path(
        &self,
        account: &AccountId,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<PathBuf, RemoteError> {
        let id = safe_segment(id.as_str())?;
        Ok(self.kind_dir(account, kind)?.join(format!("{}.json", id)))
    }

    async fn write_record(
        &self,
        account: &AccountId,
        entity: &EntityPayload,
    ) -> Result<(), RemoteError> {
        let dir = self.kind_dir(account, entity.kind())?;
        let path = self.record_path(account, entity.kind(), entity.entity_id())?;
        let json = entity
            .clone()
            .with_synced(true)
            .to_json()
            .map_err(|e| RemoteError::Other(e.to_string()))?;

        tokio::fs::create_dir_all(&dir).await.map_err(unavailable)?;
        tokio::fs::write(&path, json).await.map_err(unavailable)?;
        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for DirRemoteStore {
    async fn create(
        &self,
        account: &AccountId,
        credential: &Credential,
        entity: &EntityPayload,
    ) -> Result<(), RemoteError> {
        authorize(credential)?;
        self.write_record(account, entity).await
    }

    async fn update(
        &self,
        account: &AccountId,
        credential: &Credential,
        entity: &EntityPayload,
    ) -> Result<(), RemoteError> {
        authorize(credential)?;
        let path = self.record_path(account, entity.kind(), entity.entity_id())?;
        if !tokio::fs::try_exists(&path).await.map_err(unavailable)? {
            return Err(RemoteError::Rejected {
                reason: format!("{} not found", entity.entity_key()),
            });
        }
        self.write_record(account, entity).await
    }

    async fn delete(
        &self,
        account: &AccountId,
        credential: &Credential,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<(), RemoteError> {
        authorize(credential)?;
        let path = self.record_path(account, kind, id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn fetch_all(
        &self,
        account: &AccountId,
        credential: &Credential,
        kind: EntityKind,
    ) -> Result<Vec<EntityPayload>, RemoteError> {
        authorize(credential)?;
        let dir = self.kind_dir(account, kind)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(unavailable(e)),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(unavailable)?;
            match EntityPayload::from_json(&contents) {
                Ok(payload) if payload.kind() == kind => records.push(payload),
                Ok(payload) => {
                    tracing::warn!("Skipping {} record in {} directory", payload.kind(), kind)
                }
                Err(e) => tracing::warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }
}

fn authorize(credential: &Credential) -> Result<(), RemoteError> {
    if credential.as_str().is_empty() {
        return Err(RemoteError::Unauthorized("empty token".into()));
    }
    Ok(())
}

/// Refuse ids that would escape their directory.
fn safe_segment(segment: &str) -> Result<&str, RemoteError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\'])
    {
        return Err(RemoteError::Rejected {
            reason: format!("invalid path segment {:?}", segment),
        });
    }
    Ok(segment)
}

fn unavailable(e: io::Error) -> RemoteError {
    RemoteError::Unavailable(e.to_string())
}
