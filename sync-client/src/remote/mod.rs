//! Remote store abstraction for SpendSync.
//!
//! This module provides a pluggable remote store that abstracts the cloud
//! backend (HTTP API, document database, mock for testing).
//!
//! # Design
//!
//! The trait is async and keyed by account and bearer credential:
//! - `create()` / `update()` / `delete()` apply one mutation
//! - `fetch_all()` returns the complete set of one entity type
//!
//! Every call is independent; the sync service decides ordering, retry
//! and failure classification.
//!
//! # Example
//!
//! ```ignore
//! let remote = MockRemoteStore::new();
//! remote.create(&account, &credential, &payload).await?;
//! let users = remote.fetch_all(&account, &credential, EntityKind::User).await?;
//! ```

mod mock;

pub use mock::{MockRemoteStore, RemoteCall};

use async_trait::async_trait;
use spendsync_types::{AccountId, EntityId, EntityKind, EntityPayload, SyncErrorKind};
use thiserror::Error;

use crate::auth::Credential;

/// Remote store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Remote unreachable.
    #[error("remote unreachable: {0}")]
    Unavailable(String),

    /// Bearer credential expired.
    #[error("credential expired")]
    CredentialExpired,

    /// Credential refused for another reason.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The remote refused this specific mutation.
    #[error("rejected: {reason}")]
    Rejected {
        /// Validation or conflict detail from the remote.
        reason: String,
    },

    /// Call exceeded its deadline.
    #[error("request timed out")]
    Timeout,

    /// Anything else.
    #[error("remote error: {0}")]
    Other(String),
}

impl RemoteError {
    /// Classification surfaced to the UI.
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            RemoteError::Unavailable(_) => SyncErrorKind::NetworkUnavailable,
            RemoteError::CredentialExpired | RemoteError::Unauthorized(_) => {
                SyncErrorKind::AuthFailure
            }
            RemoteError::Rejected { .. } => SyncErrorKind::RemoteRejected,
            RemoteError::Timeout => SyncErrorKind::Timeout,
            RemoteError::Other(_) => SyncErrorKind::Unknown,
        }
    }
}

/// Remote store trait for applying mutations and fetching snapshots.
///
/// Implementations handle the underlying backend (REST, document store,
/// mock, etc).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create a record. Creating an existing id overwrites it.
    async fn create(
        &self,
        account: &AccountId,
        credential: &Credential,
        entity: &EntityPayload,
    ) -> Result<(), RemoteError>;

    /// Update an existing record.
    async fn update(
        &self,
        account: &AccountId,
        credential: &Credential,
        entity: &EntityPayload,
    ) -> Result<(), RemoteError>;

    /// Delete a record. Deleting a missing record succeeds.
    async fn delete(
        &self,
        account: &AccountId,
        credential: &Credential,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<(), RemoteError>;

    /// Fetch every record of one type for the account.
    async fn fetch_all(
        &self,
        account: &AccountId,
        credential: &Credential,
        kind: EntityKind,
    ) -> Result<Vec<EntityPayload>, RemoteError>;
}
