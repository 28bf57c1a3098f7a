//! The sync context: one instance per device.
//!
//! [`SyncContext`] owns the [`SyncState`] register, the [`LocalStores`],
//! the persistence backend and the status channel. It is created once with
//! [`SyncContext::open`], shared as `Arc<SyncContext>` with the sync
//! service and dispatcher, and flushed with [`SyncContext::flush`] at
//! shutdown.
//!
//! # Locking
//!
//! When both locks are needed the stores lock is taken before the state
//! lock. Every state transition persists the durable subset (if it
//! changed) and publishes a fresh [`SyncStatusView`].
//!
//! A round that is cancelled mid-flight (its task aborted or its future
//! dropped) releases the guard through [`RoundGuard`].

use spendsync_core::{SyncState, SyncStatusView};
use spendsync_types::{
    EntityKind, EntityPayload, MutationAction, QueueItemId, SyncErrorKind, SyncFailure,
    SyncQueueItem,
};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::persist::{MemoryPersistence, PersistError, StatePersistence};
use crate::store::LocalStores;

/// Single-instance owner of sync state and local data.
pub struct SyncContext {
    state: Mutex<SyncState>,
    stores: Mutex<LocalStores>,
    persistence: Arc<dyn StatePersistence>,
    status_tx: watch::Sender<SyncStatusView>,
}

impl SyncContext {
    /// Load persisted state and stores from `persistence`.
    pub async fn open(persistence: Arc<dyn StatePersistence>) -> Result<Self, PersistError> {
        let persisted = persistence.load_state().await?.unwrap_or_default();
        let snapshot = persistence.load_stores().await?.unwrap_or_default();

        let state = SyncState::from_persisted(persisted);
        tracing::info!(
            "Sync context opened: {} queued, hydrated={}, enabled={}",
            state.queue().len(),
            state.has_hydrated_from_cloud(),
            state.sync_enabled()
        );

        Ok(Self::from_parts(
            state,
            LocalStores::from_snapshot(snapshot),
            persistence,
        ))
    }

    /// A fresh context backed by [`MemoryPersistence`].
    pub fn in_memory() -> Self {
        Self::from_parts(
            SyncState::new(),
            LocalStores::new(),
            Arc::new(MemoryPersistence::new()),
        )
    }

    fn from_parts(
        state: SyncState,
        stores: LocalStores,
        persistence: Arc<dyn StatePersistence>,
    ) -> Self {
        let (status_tx, _rx) = watch::channel(state.view());
        Self {
            state: Mutex::new(state),
            stores: Mutex::new(stores),
            persistence,
            status_tx,
        }
    }

    /// Apply a transition to the register, then persist and publish.
    pub async fn update<T>(&self, f: impl FnOnce(&mut SyncState) -> T) -> T {
        let mut state = self.state.lock().await;
        let before = state.persisted();
        let result = f(&mut state);
        let after = state.persisted();
        if after != before {
            if let Err(e) = self.persistence.save_state(&after).await {
                tracing::warn!("Failed to persist sync state: {}", e);
            }
        }
        self.publish(&state);
        result
    }

    /// Read the register without changing it.
    pub async fn read<T>(&self, f: impl FnOnce(&SyncState) -> T) -> T {
        let state = self.state.lock().await;
        f(&state)
    }

    /// Read the local stores.
    pub async fn read_stores<T>(&self, f: impl FnOnce(&LocalStores) -> T) -> T {
        let stores = self.stores.lock().await;
        f(&stores)
    }

    /// Apply a UI mutation to the local store and enqueue it.
    ///
    /// Never rejects: a persistence failure is logged and the item stays
    /// queued in memory.
    pub async fn record_local_mutation(
        &self,
        action: MutationAction,
        payload: EntityPayload,
    ) -> QueueItemId {
        let mut stores = self.stores.lock().await;
        stores.apply_local(action, &payload);
        self.save_stores(&stores).await;

        let item = SyncQueueItem::new(action, payload);
        let id = item.id;
        tracing::debug!("Enqueued {} {}", action, item.entity_key());
        self.update(|state| state.enqueue(item)).await;
        id
    }

    /// Record a confirmed push of one queue item.
    ///
    /// Dequeues the item by id. The local entity is only marked synced when
    /// no newer item for it is still queued, so a later edit is never
    /// reported as confirmed.
    pub async fn confirm(&self, item: &SyncQueueItem) {
        let mut stores = self.stores.lock().await;
        let key = item.entity_key();
        let mark = self
            .update(|state| {
                state.dequeue_confirmed(&[item.id]);
                item.action != MutationAction::Delete && state.queue().pending_for(&key) == 0
            })
            .await;
        if mark && stores.mark_synced(&key) {
            self.save_stores(&stores).await;
        }
    }

    /// Replace one local store with a fetched snapshot.
    pub async fn replace_kind(&self, kind: EntityKind, records: Vec<EntityPayload>) -> usize {
        let mut stores = self.stores.lock().await;
        let count = stores.replace_kind(kind, records);
        self.save_stores(&stores).await;
        count
    }

    /// Latest status view.
    pub fn status(&self) -> SyncStatusView {
        self.status_tx.borrow().clone()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatusView> {
        self.status_tx.subscribe()
    }

    /// Queued items, oldest first.
    pub async fn queue_snapshot(&self) -> Vec<SyncQueueItem> {
        self.read(|state| state.queue().snapshot()).await
    }

    /// Write everything to the backend, reporting failures.
    pub async fn flush(&self) -> Result<(), PersistError> {
        let stores = self.stores.lock().await;
        self.persistence.save_stores(&stores.snapshot()).await?;
        let state = self.state.lock().await;
        self.persistence.save_state(&state.persisted()).await?;
        Ok(())
    }

    /// Release a round whose future was dropped before it finished.
    ///
    /// Called from `Drop`, so it never waits for the state lock: a free
    /// lock is released in place, a held one is handed to a task.
    fn abandon_round(self: &Arc<Self>) {
        let failure = SyncFailure::new(SyncErrorKind::Unknown, "round cancelled");
        tracing::warn!("Sync round cancelled, releasing guard");

        if let Ok(mut state) = self.state.try_lock() {
            state.abandon_round(failure);
            self.publish(&state);
            let persisted = state.persisted();
            drop(state);

            let persistence = Arc::clone(&self.persistence);
            spawn_detached(async move {
                if let Err(e) = persistence.save_state(&persisted).await {
                    tracing::warn!("Failed to persist sync state: {}", e);
                }
            });
            return;
        }

        let context = Arc::clone(self);
        spawn_detached(async move {
            context.update(|s| s.abandon_round(failure)).await;
        });
    }

    async fn save_stores(&self, stores: &LocalStores) {
        if let Err(e) = self.persistence.save_stores(&stores.snapshot()).await {
            tracing::warn!("Failed to persist local stores: {}", e);
        }
    }

    fn publish(&self, state: &SyncState) {
        let view = state.view();
        self.status_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}

/// Releases the round guard if a round stops without finishing.
///
/// Arm it in the same transition that takes the guard and disarm it in the
/// one that releases it. While armed, `is_syncing` belongs to this round,
/// so a drop can release it without touching anyone else's round.
pub(crate) struct RoundGuard {
    context: Arc<SyncContext>,
    armed: bool,
}

impl RoundGuard {
    pub(crate) fn new(context: &Arc<SyncContext>) -> Self {
        Self {
            context: Arc::clone(context),
            armed: false,
        }
    }

    /// The round now holds the guard.
    pub(crate) fn arm(&mut self) {
        self.armed = true;
    }

    /// The round released the guard itself.
    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RoundGuard {
    fn drop(&mut self) {
        if self.armed {
            self.context.abandon_round();
        }
    }
}

fn spawn_detached(task: impl std::future::Future<Output = ()> + Send + 'static) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
        }
        Err(_) => tracing::warn!("No runtime to finish releasing the round guard"),
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
