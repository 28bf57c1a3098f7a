//! SyncService - push and pull rounds.
//!
//! [`SyncService`] drives the pure register in sync-core through the I/O
//! seams: [`RemoteStore`] for the backend, [`TokenProvider`] for bearer
//! credentials and [`NetworkMonitor`] for connectivity.
//!
//! ```text
//! UI → SyncDispatcher → SyncService → RemoteStore → Cloud
//!                           ↓
//!                      SyncContext (SyncState + LocalStores)
//! ```
//!
//! # Rounds
//!
//! - [`SyncService::push_changes`] replays the queue in FIFO order, one
//!   call at a time. Items fail independently; failed items stay queued.
//! - [`SyncService::pull_all_data_for_new_device`] replaces each local
//!   store with the remote snapshot, one entity type at a time, checking
//!   connectivity before each type.
//!
//! Both take the round guard in the register before any I/O and release
//! it on every exit path, including cancellation of the round's future.
//! Each round may refresh the credential at most once.
//!
//! # Example
//!
//! ```ignore
//! let context = Arc::new(SyncContext::open(persistence).await?);
//! let service = SyncService::new(config, context, remote, tokens, network);
//!
//! service.enqueue_mutation(MutationAction::Create, User::new("u1", "Ada")).await;
//! let outcome = service.push_changes().await;
//! ```

use spendsync_core::{
    is_new_device, DispatchInputs, NetworkSnapshot, PullPlan, RoundKind, SyncState, SyncStatus,
    SyncStatusView,
};
use spendsync_types::{
    AccountId, Budget, CodecError, EntityKey, EntityKind, EntityPayload, Friend, MutationAction,
    QueueItemId, SyncErrorKind, SyncFailure, SyncQueueItem, Timestamp, Transaction, User,
};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, RwLock};

use crate::auth::{Credential, TokenProvider};
use crate::context::{RoundGuard, SyncContext};
use crate::network::NetworkMonitor;
use crate::persist::PersistError;
use crate::remote::{RemoteError, RemoteStore};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Persistence error.
    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),

    /// Payload could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// No account is signed in.
    #[error("not signed in")]
    NotSignedIn,
}

/// Configuration for SyncService.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Signed-in account, `None` when signed out.
    pub account_id: Option<AccountId>,
    /// Deadline for each remote call.
    pub request_timeout: Duration,
}

impl SyncConfig {
    /// Default deadline for a single remote call.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

    /// Signed-out configuration with default timeouts.
    pub fn new() -> Self {
        Self {
            account_id: None,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the signed-in account.
    pub fn with_account(mut self, account: AccountId) -> Self {
        self.account_id = Some(account);
        self
    }

    /// Set the per-call deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of [`SyncService::push_changes`].
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// Sync is toggled off; nothing changed.
    Disabled,
    /// Another round holds the guard; nothing changed.
    AlreadyRunning,
    /// The queue was empty; nothing changed.
    NothingToPush,
    /// The round stopped before any item was attempted.
    Aborted(SyncFailure),
    /// Every item was confirmed.
    Completed {
        /// Items confirmed.
        pushed: usize,
    },
    /// Sync was disabled mid-round; the rest of the queue is frozen.
    Interrupted {
        /// Items confirmed before the toggle.
        pushed: usize,
        /// Items left queued.
        remaining: usize,
    },
    /// Some items failed and remain queued.
    Partial {
        /// Items confirmed.
        pushed: usize,
        /// Items attempted and refused.
        failed: usize,
        /// Items left untouched this round.
        deferred: usize,
        /// The failure reported as `lastError`.
        error: SyncFailure,
    },
}

/// Result of [`SyncService::pull_all_data_for_new_device`].
#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    /// No account to pull for; nothing changed.
    NotSignedIn,
    /// Another round holds the guard; nothing changed.
    AlreadyRunning,
    /// Connectivity was missing or lost.
    Offline {
        /// The user may choose to continue offline.
        can_continue_offline: bool,
    },
    /// Every entity type was replaced.
    Completed {
        /// Records stored across all types.
        records: usize,
    },
    /// The pull failed for another reason.
    Failed(SyncFailure),
}

/// Credential state for one round.
struct RoundAuth {
    credential: Credential,
    can_refresh: bool,
}

#[derive(Default)]
struct PushTally {
    pushed: usize,
    failed: usize,
    deferred: usize,
    interrupted: bool,
    error: Option<SyncFailure>,
    blocked: HashSet<EntityKey>,
}

impl PushTally {
    fn record(&mut self, failure: SyncFailure) {
        self.failed += 1;
        self.error = Some(SyncFailure::most_severe(self.error.take(), failure));
    }

    fn into_outcome(self) -> PushOutcome {
        match self.error {
            Some(error) => PushOutcome::Partial {
                pushed: self.pushed,
                failed: self.failed,
                deferred: self.deferred,
                error,
            },
            None if self.interrupted => PushOutcome::Interrupted {
                pushed: self.pushed,
                remaining: self.deferred,
            },
            None => PushOutcome::Completed {
                pushed: self.pushed,
            },
        }
    }
}

/// The sync engine for one device.
pub struct SyncService<R, A> {
    config: SyncConfig,
    account: RwLock<Option<AccountId>>,
    context: Arc<SyncContext>,
    remote: R,
    tokens: A,
    network: NetworkMonitor,
}

impl<R: RemoteStore, A: TokenProvider> SyncService<R, A> {
    /// Create a service over an opened context.
    pub fn new(
        config: SyncConfig,
        context: Arc<SyncContext>,
        remote: R,
        tokens: A,
        network: NetworkMonitor,
    ) -> Self {
        Self {
            account: RwLock::new(config.account_id.clone()),
            config,
            context,
            remote,
            tokens,
            network,
        }
    }

    /// The shared context.
    pub fn context(&self) -> &Arc<SyncContext> {
        &self.context
    }

    /// The connectivity monitor.
    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    /// The remote store.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Signed-in account, if any.
    pub async fn account(&self) -> Option<AccountId> {
        self.account.read().await.clone()
    }

    /// Signed-in account, or [`ClientError::NotSignedIn`].
    pub async fn require_account(&self) -> Result<AccountId, ClientError> {
        self.account().await.ok_or(ClientError::NotSignedIn)
    }

    /// Sign in as `account`.
    pub async fn sign_in(&self, account: AccountId) {
        tracing::info!("Signed in as {}", account);
        *self.account.write().await = Some(account);
    }

    /// Sign out. Queued mutations are kept.
    pub async fn sign_out(&self) {
        tracing::info!("Signed out");
        *self.account.write().await = None;
    }

    /// Whether this device still needs its initial full pull.
    pub async fn is_new_device(&self) -> bool {
        let signed_in = self.account().await.is_some();
        let hydrated = self.context.read(|s| s.has_hydrated_from_cloud()).await;
        is_new_device(signed_in, hydrated)
    }

    /// Latest status view.
    pub fn status(&self) -> SyncStatusView {
        self.context.status()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatusView> {
        self.context.subscribe()
    }

    /// Conditions for the scheduling policy.
    pub async fn dispatch_inputs(&self) -> DispatchInputs {
        let signed_in = self.account().await.is_some();
        let network_connected = self.network.is_online();
        self.context
            .read(|s| DispatchInputs {
                round_active: s.is_syncing(),
                sync_enabled: s.sync_enabled(),
                signed_in,
                network_connected,
                has_hydrated_from_cloud: s.has_hydrated_from_cloud(),
                queue_len: s.queue().len(),
            })
            .await
    }

    /// Store a connectivity snapshot in the register.
    pub async fn observe_network(&self, snapshot: NetworkSnapshot) {
        self.context.update(|s| s.set_network(snapshot)).await;
    }

    // =========================================================================
    // Inbound operations
    // =========================================================================

    /// Apply a mutation locally and enqueue it for push.
    ///
    /// Never rejects, whatever the sync toggle or connectivity.
    pub async fn enqueue_mutation(
        &self,
        action: MutationAction,
        payload: impl Into<EntityPayload>,
    ) -> QueueItemId {
        self.context
            .record_local_mutation(action, payload.into())
            .await
    }

    /// Enqueue a mutation whose record arrives as JSON.
    ///
    /// The JSON must decode as a record of `kind`; anything else is
    /// refused before it reaches the queue.
    pub async fn enqueue_json(
        &self,
        kind: EntityKind,
        action: MutationAction,
        json: &str,
    ) -> Result<QueueItemId, ClientError> {
        let payload = decode_record(kind, json)?;
        Ok(self.enqueue_mutation(action, payload).await)
    }

    /// Toggle sync. Disabling freezes the queue until re-enabled.
    pub async fn set_sync_enabled(&self, enabled: bool) {
        tracing::info!("Sync {}", if enabled { "enabled" } else { "disabled" });
        self.context.update(|s| s.set_sync_enabled(enabled)).await;
    }

    /// Decline the initial pull and work offline.
    ///
    /// Marks the device hydrated so no automatic pull runs again. The
    /// queue is left untouched. Only the offline failure that offered the
    /// escape is cleared; any other `lastError` stays.
    pub async fn continue_offline(&self) {
        tracing::info!("Continuing offline without initial pull");
        self.context
            .update(|s| {
                let offline_failure = s.offline_escape_available()
                    && s.last_error().map(|e| e.kind) == Some(SyncErrorKind::NetworkUnavailable);
                s.set_hydrated(true);
                s.set_offline_escape(false);
                if offline_failure && !s.is_syncing() {
                    s.set_error(None);
                    s.set_status(SyncStatus::Idle);
                }
            })
            .await;
    }

    /// Discard every queued mutation. Returns how many were dropped.
    pub async fn clear_queue(&self) -> usize {
        let cleared = self.context.update(|s| s.clear_queue()).await;
        tracing::warn!("Cleared {} queued mutations", cleared);
        cleared
    }

    // =========================================================================
    // Push
    // =========================================================================

    /// Push queued mutations to the remote store.
    pub async fn push_changes(&self) -> PushOutcome {
        let network = self.network.current();
        let mut guard = RoundGuard::new(&self.context);
        let begun = self
            .context
            .update(|s| {
                let begun = begin_push(s);
                if begun.is_ok() {
                    guard.arm();
                    s.set_network(network);
                }
                begun
            })
            .await;
        let items = match begun {
            Ok(items) => items,
            Err(outcome) => {
                tracing::debug!("Push skipped: {:?}", outcome);
                return outcome;
            }
        };

        tracing::info!("Push round started: {} queued", items.len());
        let outcome = self.run_push(&items, network).await;

        self.context
            .update(|s| {
                match &outcome {
                    PushOutcome::Completed { .. } => s.record_success(Timestamp::now()),
                    PushOutcome::Partial { error, .. } | PushOutcome::Aborted(error) => {
                        s.record_failure(error.clone())
                    }
                    PushOutcome::Interrupted { .. } => s.set_status(SyncStatus::Idle),
                    PushOutcome::Disabled
                    | PushOutcome::AlreadyRunning
                    | PushOutcome::NothingToPush => {}
                }
                s.end_round();
                guard.disarm();
            })
            .await;

        tracing::info!("Push round finished: {:?}", outcome);
        outcome
    }

    async fn run_push(&self, items: &[SyncQueueItem], network: NetworkSnapshot) -> PushOutcome {
        if !network.is_online() {
            tracing::warn!("Push aborted: network unavailable");
            return PushOutcome::Aborted(SyncFailure::network_unavailable());
        }
        let Some(account) = self.account().await else {
            return PushOutcome::Aborted(SyncFailure::new(
                SyncErrorKind::AuthFailure,
                "not signed in",
            ));
        };
        let mut auth = match self.acquire_credential().await {
            Ok(auth) => auth,
            Err(failure) => return PushOutcome::Aborted(failure),
        };

        let account = &account;
        let mut tally = PushTally::default();
        for (index, item) in items.iter().enumerate() {
            if !self.context.read(|s| s.sync_enabled()).await {
                tally.interrupted = true;
                tally.deferred += items.len() - index;
                tracing::info!("Sync disabled mid-round, {} items frozen", items.len() - index);
                break;
            }

            let key = item.entity_key();
            if tally.blocked.contains(&key) {
                tracing::debug!("Deferring {} {}: earlier item failed", item.action, key);
                tally.deferred += 1;
                continue;
            }

            let result = self
                .call_with_refresh(&mut auth, move |credential| async move {
                    self.apply_item(account, &credential, item).await
                })
                .await;

            match result {
                Ok(()) => {
                    self.context.confirm(item).await;
                    tally.pushed += 1;
                }
                Err(e) if e.kind() == SyncErrorKind::AuthFailure => {
                    let failure = SyncFailure::for_item(
                        SyncErrorKind::AuthFailure,
                        format!("{} {}: {}", item.action, key, e),
                        item.id,
                    );
                    tracing::warn!("Push round stopped: {}", failure);
                    tally.record(failure);
                    tally.deferred += items.len() - index - 1;
                    break;
                }
                Err(e) => {
                    let failure = SyncFailure::for_item(
                        e.kind(),
                        format!("{} {}: {}", item.action, key, e),
                        item.id,
                    );
                    tracing::warn!("Push item failed: {}", failure);
                    tally.record(failure);
                    tally.blocked.insert(key);
                }
            }
        }
        tally.into_outcome()
    }

    async fn apply_item(
        &self,
        account: &AccountId,
        credential: &Credential,
        item: &SyncQueueItem,
    ) -> Result<(), RemoteError> {
        match item.action {
            MutationAction::Create => self.remote.create(account, credential, &item.payload).await,
            MutationAction::Update => self.remote.update(account, credential, &item.payload).await,
            MutationAction::Delete => {
                self.remote
                    .delete(account, credential, item.kind(), item.entity_id())
                    .await
            }
        }
    }

    // =========================================================================
    // Pull
    // =========================================================================

    /// Replace every local store with the account's remote data.
    ///
    /// `is_manual_retry` is false for automatic invocations (startup,
    /// reconnect); only those offer the "continue offline" escape when
    /// connectivity is missing.
    pub async fn pull_all_data_for_new_device(&self, is_manual_retry: bool) -> PullOutcome {
        let Some(account) = self.account().await else {
            tracing::debug!("Pull skipped: not signed in");
            return PullOutcome::NotSignedIn;
        };
        let network = self.network.current();
        let mut guard = RoundGuard::new(&self.context);
        let begun = self
            .context
            .update(|s| {
                let begun = s.try_begin_round(RoundKind::Pull);
                if begun.is_ok() {
                    guard.arm();
                    s.set_network(network);
                }
                begun
            })
            .await;
        if begun.is_err() {
            tracing::debug!("Pull skipped: round already in flight");
            return PullOutcome::AlreadyRunning;
        }

        tracing::info!("Full pull started (manual={})", is_manual_retry);
        match self.run_pull(&account).await {
            Ok(records) => {
                self.context
                    .update(|s| {
                        s.set_pull_progress(1.0);
                        s.set_hydrated(true);
                        s.record_success(Timestamp::now());
                        s.end_round();
                        guard.disarm();
                    })
                    .await;
                tracing::info!("Full pull finished: {} records", records);
                PullOutcome::Completed { records }
            }
            Err(failure) => {
                let offline = failure.kind == SyncErrorKind::NetworkUnavailable;
                let can_continue_offline = offline && !is_manual_retry;
                tracing::warn!("Full pull failed: {}", failure);
                self.context
                    .update(|s| {
                        s.record_failure(failure.clone());
                        s.set_offline_escape(can_continue_offline);
                        s.end_round();
                        guard.disarm();
                    })
                    .await;
                if offline {
                    PullOutcome::Offline {
                        can_continue_offline,
                    }
                } else {
                    PullOutcome::Failed(failure)
                }
            }
        }
    }

    async fn run_pull(&self, account: &AccountId) -> Result<usize, SyncFailure> {
        if !self.network.is_online() {
            return Err(SyncFailure::network_unavailable());
        }
        let mut auth = self.acquire_credential().await?;

        let plan = PullPlan::full();
        let mut records = 0;
        for (kind, progress) in plan.steps() {
            if !self.network.is_online() {
                return Err(SyncFailure::new(
                    SyncErrorKind::NetworkUnavailable,
                    format!("network lost before fetching {}", kind),
                ));
            }

            let fetched = self
                .call_with_refresh(&mut auth, move |credential| async move {
                    self.remote.fetch_all(account, &credential, kind).await
                })
                .await
                .map_err(|e| SyncFailure::new(e.kind(), format!("fetch {}: {}", kind, e)))?;

            let count = self.context.replace_kind(kind, fetched).await;
            records += count;
            self.context.update(|s| s.set_pull_progress(progress)).await;
            tracing::debug!("Pulled {} {} records ({:.0}%)", count, kind, progress * 100.0);
        }
        Ok(records)
    }

    // =========================================================================
    // Credential handling
    // =========================================================================

    /// Get a credential for a round, spending the refresh if none exists.
    async fn acquire_credential(&self) -> Result<RoundAuth, SyncFailure> {
        if let Some(credential) = self.tokens.get_token().await {
            return Ok(RoundAuth {
                credential,
                can_refresh: true,
            });
        }
        tracing::warn!("No credential available, refreshing");
        match self.tokens.refresh_token().await {
            Some(credential) => Ok(RoundAuth {
                credential,
                can_refresh: false,
            }),
            None => Err(SyncFailure::new(
                SyncErrorKind::AuthFailure,
                "no credential available",
            )),
        }
    }

    /// Run one remote call, refreshing and retrying once on expiry.
    async fn call_with_refresh<T, F, Fut>(
        &self,
        auth: &mut RoundAuth,
        mut call: F,
    ) -> Result<T, RemoteError>
    where
        F: FnMut(Credential) -> Fut + Send,
        Fut: Future<Output = Result<T, RemoteError>> + Send,
        T: Send,
    {
        let error = match self.timed(call(auth.credential.clone())).await {
            Err(e) if self.tokens.is_expired_error(&e) => e,
            other => return other,
        };
        if !auth.can_refresh {
            return Err(error);
        }
        auth.can_refresh = false;

        tracing::warn!("Credential expired, refreshing once for this round");
        match self.tokens.refresh_token().await {
            Some(fresh) => {
                auth.credential = fresh;
                self.timed(call(auth.credential.clone())).await
            }
            None => Err(RemoteError::Unauthorized("credential refresh failed".into())),
        }
    }

    async fn timed<T>(
        &self,
        call: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        match tokio::time::timeout(self.config.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        }
    }
}

impl<R, A> std::fmt::Debug for SyncService<R, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("config", &self.config)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Take the push guard, or say why not.
fn begin_push(state: &mut SyncState) -> Result<Vec<SyncQueueItem>, PushOutcome> {
    if !state.sync_enabled() {
        return Err(PushOutcome::Disabled);
    }
    if state.is_syncing() {
        return Err(PushOutcome::AlreadyRunning);
    }
    if state.queue().is_empty() {
        return Err(PushOutcome::NothingToPush);
    }
    state
        .try_begin_round(RoundKind::Push)
        .map_err(|_| PushOutcome::AlreadyRunning)?;
    Ok(state.queue().snapshot())
}

/// Decode a bare record of `kind` into a tagged payload.
fn decode_record(kind: EntityKind, json: &str) -> Result<EntityPayload, CodecError> {
    let payload = match kind {
        EntityKind::User => serde_json::from_str::<User>(json).map(EntityPayload::from),
        EntityKind::Friend => serde_json::from_str::<Friend>(json).map(EntityPayload::from),
        EntityKind::Transaction => {
            serde_json::from_str::<Transaction>(json).map(EntityPayload::from)
        }
        EntityKind::Budget => serde_json::from_str::<Budget>(json).map(EntityPayload::from),
    };
    payload.map_err(CodecError::Decode)
}
