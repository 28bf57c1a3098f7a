//! Mock remote store for testing.
//!
//! Keeps records in memory, captures every call for verification and
//! allows scripting failures by call number, entity or entity type.

use super::{RemoteError, RemoteStore};
use crate::auth::Credential;
use crate::network::NetworkMonitor;
use async_trait::async_trait;
use spendsync_types::{AccountId, EntityId, EntityKey, EntityKind, EntityPayload};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A call observed by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// `create()` of an entity.
    Create(EntityKey),
    /// `update()` of an entity.
    Update(EntityKey),
    /// `delete()` of an entity.
    Delete(EntityKey),
    /// `fetch_all()` of one type.
    FetchAll(EntityKind),
}

/// Mock remote store for testing.
///
/// Clones share state, so a test can keep a handle after moving one into
/// the sync service.
#[derive(Debug, Default)]
pub struct MockRemoteStore {
    inner: Arc<Mutex<MockRemoteInner>>,
}

#[derive(Debug, Default)]
struct MockRemoteInner {
    records: BTreeMap<EntityKey, EntityPayload>,
    calls: Vec<RemoteCall>,
    tokens_seen: Vec<String>,
    fail_calls: HashMap<usize, RemoteError>,
    reject_entities: HashMap<EntityKey, String>,
    fail_fetch: HashMap<EntityKind, RemoteError>,
    accepted_token: Option<String>,
    latency: Option<Duration>,
    offline_after_fetch: Option<(EntityKind, NetworkMonitor)>,
}

impl MockRemoteStore {
    /// Create an empty mock remote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record as if another device had pushed it.
    pub fn seed(&self, entity: impl Into<EntityPayload>) {
        let entity = entity.into();
        let mut inner = self.inner.lock().unwrap();
        inner.records.insert(entity.entity_key(), entity);
    }

    /// Current remote record for an entity.
    pub fn record(&self, key: &EntityKey) -> Option<EntityPayload> {
        let inner = self.inner.lock().unwrap();
        inner.records.get(key).cloned()
    }

    /// All remote records, ordered by key.
    pub fn records(&self) -> Vec<EntityPayload> {
        let inner = self.inner.lock().unwrap();
        inner.records.values().cloned().collect()
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<RemoteCall> {
        let inner = self.inner.lock().unwrap();
        inner.calls.clone()
    }

    /// Bearer tokens presented, one per call.
    pub fn tokens_seen(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.tokens_seen.clone()
    }

    /// Cause the Nth call (1-based, counting every operation) to fail.
    pub fn fail_call(&self, call_number: usize, error: RemoteError) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_calls.insert(call_number, error);
    }

    /// Reject every create/update/delete of the given entity.
    pub fn reject_entity(&self, key: EntityKey, reason: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.reject_entities.insert(key, reason.to_string());
    }

    /// Cause every `fetch_all()` of a type to fail.
    pub fn fail_fetch(&self, kind: EntityKind, error: RemoteError) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_fetch.insert(kind, error);
    }

    /// Only accept this bearer token; others get `CredentialExpired`.
    pub fn accept_only(&self, token: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.accepted_token = Some(token.to_string());
    }

    /// Delay every call by the given duration.
    pub fn set_latency(&self, latency: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.latency = Some(latency);
    }

    /// Flip the monitor offline right after a fetch of `kind` succeeds.
    pub fn go_offline_after_fetch(&self, kind: EntityKind, monitor: NetworkMonitor) {
        let mut inner = self.inner.lock().unwrap();
        inner.offline_after_fetch = Some((kind, monitor));
    }

    /// Clear all state (records, calls, scripted failures).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockRemoteInner::default();
    }

    /// Record the call and return any scripted failure for it.
    fn begin_call(
        &self,
        call: RemoteCall,
        credential: &Credential,
    ) -> (Option<Duration>, Result<(), RemoteError>) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call.clone());
        inner.tokens_seen.push(credential.as_str().to_string());
        let call_number = inner.calls.len();

        if let Some(error) = inner.fail_calls.remove(&call_number) {
            return (inner.latency, Err(error));
        }
        if let Some(accepted) = &inner.accepted_token {
            if accepted != credential.as_str() {
                return (inner.latency, Err(RemoteError::CredentialExpired));
            }
        }
        let rejected = match &call {
            RemoteCall::Create(key) | RemoteCall::Update(key) | RemoteCall::Delete(key) => {
                inner.reject_entities.get(key).cloned()
            }
            RemoteCall::FetchAll(kind) => {
                if let Some(error) = inner.fail_fetch.get(kind) {
                    return (inner.latency, Err(error.clone()));
                }
                None
            }
        };
        match rejected {
            Some(reason) => (inner.latency, Err(RemoteError::Rejected { reason })),
            None => (inner.latency, Ok(())),
        }
    }

    async fn simulate(&self, call: RemoteCall, credential: &Credential) -> Result<(), RemoteError> {
        // Lock is released before sleeping.
        let (latency, result) = self.begin_call(call, credential);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        result
    }
}

impl Clone for MockRemoteStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn create(
        &self,
        _account: &AccountId,
        credential: &Credential,
        entity: &EntityPayload,
    ) -> Result<(), RemoteError> {
        let key = entity.entity_key();
        self.simulate(RemoteCall::Create(key.clone()), credential)
            .await?;

        let mut inner = self.inner.lock().unwrap();
        inner.records.insert(key, entity.clone().with_synced(true));
        Ok(())
    }

    async fn update(
        &self,
        _account: &AccountId,
        credential: &Credential,
        entity: &EntityPayload,
    ) -> Result<(), RemoteError> {
        let key = entity.entity_key();
        self.simulate(RemoteCall::Update(key.clone()), credential)
            .await?;

        let mut inner = self.inner.lock().unwrap();
        if !inner.records.contains_key(&key) {
            return Err(RemoteError::Rejected {
                reason: format!("{} does not exist", key),
            });
        }
        inner.records.insert(key, entity.clone().with_synced(true));
        Ok(())
    }

    async fn delete(
        &self,
        _account: &AccountId,
        credential: &Credential,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<(), RemoteError> {
        let key = EntityKey {
            kind,
            id: id.clone(),
        };
        self.simulate(RemoteCall::Delete(key.clone()), credential)
            .await?;

        let mut inner = self.inner.lock().unwrap();
        inner.records.remove(&key);
        Ok(())
    }

    async fn fetch_all(
        &self,
        _account: &AccountId,
        credential: &Credential,
        kind: EntityKind,
    ) -> Result<Vec<EntityPayload>, RemoteError> {
        self.simulate(RemoteCall::FetchAll(kind), credential)
            .await?;

        let mut inner = self.inner.lock().unwrap();
        let records = inner
            .records
            .iter()
            .filter(|(key, _)| key.kind == kind)
            .map(|(_, record)| record.clone())
            .collect();

        if matches!(&inner.offline_after_fetch, Some((k, _)) if *k == kind) {
            if let Some((_, monitor)) = inner.offline_after_fetch.take() {
                monitor.set_offline();
            }
        }
        Ok(records)
    }
}
