//! Sync state register for SpendSync.
//!
//! [`SyncState`] is the single, process-wide register the sync engine
//! publishes to the UI: queue, round guard, status, last error, last
//! successful sync, network snapshot and pull progress. Every transition
//! is a plain method call with no side effects; the client decides when
//! to persist ([`SyncState::persisted`]) and publish ([`SyncState::view`]).
//!
//! The `is_syncing` flag is the mutual-exclusion token for rounds. It is
//! taken by [`SyncState::try_begin_round`] and released by
//! [`SyncState::end_round`], or by [`SyncState::abandon_round`] when the
//! round's task was cancelled.

use serde::{Deserialize, Serialize};
use spendsync_types::{QueueItemId, SyncFailure, SyncQueueItem, Timestamp};
use thiserror::Error;

use crate::queue::SyncQueue;

/// Status register published to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Nothing in flight (the `null` status).
    #[default]
    Idle,
    /// A full pull is in flight.
    Pulling,
    /// A push round is in flight.
    Syncing,
    /// The last round failed; see `last_error`.
    Error,
}

/// Last observed connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    /// A network interface is up.
    pub is_connected: bool,
    /// The internet is reachable, if the platform could tell.
    pub is_internet_reachable: Option<bool>,
}

impl NetworkSnapshot {
    /// Connected with reachability confirmed.
    pub fn online() -> Self {
        Self {
            is_connected: true,
            is_internet_reachable: Some(true),
        }
    }

    /// No connectivity.
    pub fn offline() -> Self {
        Self {
            is_connected: false,
            is_internet_reachable: Some(false),
        }
    }

    /// Usable for remote calls.
    ///
    /// Unknown reachability counts as usable; only an explicit `false`
    /// blocks a connected interface.
    pub fn is_online(&self) -> bool {
        self.is_connected && self.is_internet_reachable != Some(false)
    }
}

/// Which kind of round holds the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundKind {
    /// Incremental push of the queue.
    Push,
    /// Full pull for a new device.
    Pull,
}

/// Returned when a round is requested while another is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a sync round is already in flight")]
pub struct RoundBusy;

/// The fields of [`SyncState`] that survive a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Pending mutations.
    #[serde(default)]
    pub queue: SyncQueue,
    /// User/device sync toggle.
    #[serde(default = "default_sync_enabled")]
    pub sync_enabled: bool,
    /// Initial full pull completed or declined.
    #[serde(default)]
    pub has_hydrated_from_cloud: bool,
    /// Last successful round.
    #[serde(default)]
    pub last_sync: Option<Timestamp>,
    /// Last failure, kept so the UI can show it after a restart.
    #[serde(default)]
    pub last_error: Option<SyncFailure>,
}

fn default_sync_enabled() -> bool {
    true
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            queue: SyncQueue::new(),
            sync_enabled: default_sync_enabled(),
            has_hydrated_from_cloud: false,
            last_sync: None,
            last_error: None,
        }
    }
}

/// Read-only snapshot of the register for UI observers.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncStatusView {
    /// Current status.
    pub status: SyncStatus,
    /// A round is in flight.
    pub is_syncing: bool,
    /// Last failure.
    pub last_error: Option<SyncFailure>,
    /// Last successful round.
    pub last_sync: Option<Timestamp>,
    /// Full-pull progress in `0.0..=1.0`.
    pub pull_progress: f32,
    /// Last observed connectivity.
    pub network: NetworkSnapshot,
    /// Number of queued mutations.
    pub pending: usize,
    /// Sync toggle.
    pub sync_enabled: bool,
    /// Initial pull done or declined.
    pub has_hydrated_from_cloud: bool,
    /// An automatic pull failed offline and the user may continue offline.
    pub offline_escape_available: bool,
}

/// Process-wide sync register. NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    queue: SyncQueue,
    is_syncing: bool,
    status: SyncStatus,
    last_error: Option<SyncFailure>,
    last_sync: Option<Timestamp>,
    sync_enabled: bool,
    network: NetworkSnapshot,
    pull_progress: f32,
    has_hydrated_from_cloud: bool,
    offline_escape_available: bool,
}

impl SyncState {
    /// A fresh register: empty queue, sync enabled, not hydrated.
    pub fn new() -> Self {
        Self::from_persisted(PersistedState::default())
    }

    /// Rebuild the register after a restart.
    ///
    /// In-flight statuses are not persisted, so a round interrupted by a
    /// crash can never leave the guard taken.
    pub fn from_persisted(persisted: PersistedState) -> Self {
        let status = if persisted.last_error.is_some() {
            SyncStatus::Error
        } else {
            SyncStatus::Idle
        };
        Self {
            queue: persisted.queue,
            is_syncing: false,
            status,
            last_error: persisted.last_error,
            last_sync: persisted.last_sync,
            sync_enabled: persisted.sync_enabled,
            network: NetworkSnapshot::default(),
            pull_progress: 0.0,
            has_hydrated_from_cloud: persisted.has_hydrated_from_cloud,
            offline_escape_available: false,
        }
    }

    /// Extract the durable subset.
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            queue: self.queue.clone(),
            sync_enabled: self.sync_enabled,
            has_hydrated_from_cloud: self.has_hydrated_from_cloud,
            last_sync: self.last_sync,
            last_error: self.last_error.clone(),
        }
    }

    /// Snapshot for UI observers.
    pub fn view(&self) -> SyncStatusView {
        SyncStatusView {
            status: self.status,
            is_syncing: self.is_syncing,
            last_error: self.last_error.clone(),
            last_sync: self.last_sync,
            pull_progress: self.pull_progress,
            network: self.network,
            pending: self.queue.len(),
            sync_enabled: self.sync_enabled,
            has_hydrated_from_cloud: self.has_hydrated_from_cloud,
            offline_escape_available: self.offline_escape_available,
        }
    }

    /// Append a mutation. Never rejects, whatever the sync toggle says.
    pub fn enqueue(&mut self, item: SyncQueueItem) {
        self.queue.enqueue(item);
    }

    /// Remove confirmed items by id.
    pub fn dequeue_confirmed(&mut self, ids: &[QueueItemId]) -> usize {
        self.queue.dequeue_confirmed(ids)
    }

    /// Discard every pending item.
    pub fn clear_queue(&mut self) -> usize {
        self.queue.clear()
    }

    /// The pending queue.
    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    /// Take the round guard.
    ///
    /// Sets `is_syncing` and the matching status in one step. A pull also
    /// resets progress to zero.
    pub fn try_begin_round(&mut self, kind: RoundKind) -> Result<(), RoundBusy> {
        if self.is_syncing {
            return Err(RoundBusy);
        }
        self.is_syncing = true;
        self.offline_escape_available = false;
        match kind {
            RoundKind::Push => self.status = SyncStatus::Syncing,
            RoundKind::Pull => {
                self.status = SyncStatus::Pulling;
                self.pull_progress = 0.0;
            }
        }
        Ok(())
    }

    /// Release the round guard. Safe to call when not held.
    pub fn end_round(&mut self) {
        self.is_syncing = false;
    }

    /// Release the guard of a round that stopped without finishing.
    ///
    /// Records `failure` as the last error. No-op when no round is held.
    pub fn abandon_round(&mut self, failure: SyncFailure) {
        if !self.is_syncing {
            return;
        }
        self.is_syncing = false;
        self.last_error = Some(failure);
        self.status = SyncStatus::Error;
    }

    /// Whether a round is in flight.
    pub fn is_syncing(&self) -> bool {
        self.is_syncing
    }

    /// Set the status register.
    pub fn set_status(&mut self, status: SyncStatus) {
        self.status = status;
    }

    /// Set or clear the last error.
    pub fn set_error(&mut self, error: Option<SyncFailure>) {
        self.last_error = error;
    }

    /// Record the time of a successful round.
    pub fn set_last_sync(&mut self, at: Timestamp) {
        self.last_sync = Some(at);
    }

    /// Advance pull progress.
    ///
    /// Clamped to `0.0..=1.0` and never moves backwards within a pull;
    /// only [`SyncState::try_begin_round`] resets it.
    pub fn set_pull_progress(&mut self, fraction: f32) {
        let clamped = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        if clamped > self.pull_progress {
            self.pull_progress = clamped;
        }
    }

    /// Toggle sync.
    pub fn set_sync_enabled(&mut self, enabled: bool) {
        self.sync_enabled = enabled;
    }

    /// Store the latest connectivity snapshot.
    pub fn set_network(&mut self, network: NetworkSnapshot) {
        self.network = network;
    }

    /// Mark the initial pull as done (or declined).
    pub fn set_hydrated(&mut self, hydrated: bool) {
        self.has_hydrated_from_cloud = hydrated;
    }

    /// Offer or withdraw the "continue offline" escape hatch.
    pub fn set_offline_escape(&mut self, available: bool) {
        self.offline_escape_available = available;
    }

    /// A round finished cleanly.
    pub fn record_success(&mut self, at: Timestamp) {
        self.last_error = None;
        self.last_sync = Some(at);
        self.status = SyncStatus::Idle;
    }

    /// A round failed (wholly or partially).
    pub fn record_failure(&mut self, failure: SyncFailure) {
        self.last_error = Some(failure);
        self.status = SyncStatus::Error;
    }

    /// Whether the "continue offline" escape is on offer.
    pub fn offline_escape_available(&self) -> bool {
        self.offline_escape_available
    }

    /// Current status.
    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Last failure.
    pub fn last_error(&self) -> Option<&SyncFailure> {
        self.last_error.as_ref()
    }

    /// Last successful round.
    pub fn last_sync(&self) -> Option<Timestamp> {
        self.last_sync
    }

    /// Sync toggle.
    pub fn sync_enabled(&self) -> bool {
        self.sync_enabled
    }

    /// Last observed connectivity.
    pub fn network(&self) -> NetworkSnapshot {
        self.network
    }

    /// Full-pull progress.
    pub fn pull_progress(&self) -> f32 {
        self.pull_progress
    }

    /// Initial pull done or declined.
    pub fn has_hydrated_from_cloud(&self) -> bool {
        self.has_hydrated_from_cloud
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}
