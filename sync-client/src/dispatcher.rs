//! Sync dispatcher.
//!
//! [`SyncDispatcher`] is the only place that decides when a round runs.
//! Every trigger (startup, reconnect, manual retry, queue change) goes
//! through [`SyncDispatcher::trigger`], which evaluates the pure policy in
//! sync-core and runs at most one push or pull. Triggers that arrive while
//! a round is in flight collapse on the round guard.

use spendsync_core::{decide, Decision, SkipReason, SyncStatusView, Trigger};
use spendsync_types::{EntityPayload, MutationAction, QueueItemId};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::TokenProvider;
use crate::remote::RemoteStore;
use crate::service::{PullOutcome, PushOutcome, SyncService};

/// What a trigger did.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A push round ran (or found the guard taken).
    Pushed(PushOutcome),
    /// A full pull ran (or found the guard taken).
    Pulled(PullOutcome),
    /// The policy declined to start a round.
    Skipped(SkipReason),
}

/// Owns scheduling for one [`SyncService`].
pub struct SyncDispatcher<R, A> {
    service: Arc<SyncService<R, A>>,
}

impl<R, A> SyncDispatcher<R, A>
where
    R: RemoteStore + 'static,
    A: TokenProvider + 'static,
{
    /// Wrap a service.
    pub fn new(service: Arc<SyncService<R, A>>) -> Self {
        Self { service }
    }

    /// The wrapped service.
    pub fn service(&self) -> &Arc<SyncService<R, A>> {
        &self.service
    }

    /// Evaluate the policy for `trigger` and run the chosen round.
    pub async fn trigger(&self, trigger: Trigger) -> DispatchOutcome {
        let inputs = self.service.dispatch_inputs().await;
        let decision = decide(inputs, trigger);
        tracing::debug!("Dispatch {:?}: {:?}", trigger, decision);

        match decision {
            Decision::Skip(reason) => DispatchOutcome::Skipped(reason),
            Decision::Push => DispatchOutcome::Pushed(self.service.push_changes().await),
            Decision::Pull => DispatchOutcome::Pulled(
                self.service
                    .pull_all_data_for_new_device(trigger.is_manual())
                    .await,
            ),
        }
    }

    /// Explicit "sync now" / retry from the UI.
    pub async fn trigger_sync(&self) -> DispatchOutcome {
        self.trigger(Trigger::Manual).await
    }

    /// Enqueue a mutation, then give the dispatcher a chance to push it.
    pub async fn enqueue_mutation(
        &self,
        action: MutationAction,
        payload: impl Into<EntityPayload>,
    ) -> QueueItemId {
        let id = self.service.enqueue_mutation(action, payload).await;
        self.trigger(Trigger::QueueChanged).await;
        id
    }

    /// Toggle sync. Re-enabling resumes draining the queue.
    pub async fn set_sync_enabled(&self, enabled: bool) {
        self.service.set_sync_enabled(enabled).await;
        if enabled {
            self.trigger(Trigger::Manual).await;
        }
    }

    /// Decline the initial pull and push anything queued.
    pub async fn continue_offline(&self) -> DispatchOutcome {
        self.service.continue_offline().await;
        self.trigger(Trigger::QueueChanged).await
    }

    /// Latest status view.
    pub fn status(&self) -> SyncStatusView {
        self.service.status()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatusView> {
        self.service.subscribe()
    }

    /// Dispatch the startup trigger, then start the reconnect listener.
    pub async fn start(self: &Arc<Self>) -> (DispatchOutcome, JoinHandle<()>) {
        let snapshot = self.service.network().current();
        self.service.observe_network(snapshot).await;
        let outcome = self.trigger(Trigger::Startup).await;
        (outcome, self.spawn_network_listener())
    }

    /// Watch connectivity and dispatch [`Trigger::Reconnect`] on every
    /// disconnected to connected transition.
    ///
    /// Every snapshot is stored in the register. Each reconnect round runs
    /// in its own task, so aborting the returned handle only unsubscribes
    /// and never cancels a round in flight.
    pub fn spawn_network_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        let mut rx = self.service.network().subscribe();
        let mut was_online = rx.borrow_and_update().is_online();

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = *rx.borrow_and_update();
                dispatcher.service.observe_network(snapshot).await;

                let online = snapshot.is_online();
                if online && !was_online {
                    tracing::info!("Network reconnected");
                    let round = Arc::clone(&dispatcher);
                    tokio::spawn(async move {
                        let outcome = round.trigger(Trigger::Reconnect).await;
                        tracing::debug!("Reconnect dispatch: {:?}", outcome);
                    });
                }
                was_online = online;
            }
            tracing::debug!("Network listener stopped");
        })
    }
}

impl<R, A> Clone for SyncDispatcher<R, A> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<R, A> std::fmt::Debug for SyncDispatcher<R, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncDispatcher")
            .field("service", &self.service)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockTokenProvider;
    use crate::context::SyncContext;
    use crate::network::NetworkMonitor;
    use crate::remote::{MockRemoteStore, RemoteCall};
    use crate::service::SyncConfig;
    use spendsync_types::{AccountId, User};
    use std::time::Duration;

    type TestDispatcher = SyncDispatcher<MockRemoteStore, MockTokenProvider>;

    fn dispatcher(remote: MockRemoteStore, network: NetworkMonitor) -> Arc<TestDispatcher> {
        let service = SyncService::new(
            SyncConfig::new().with_account(AccountId::new("acct-1")),
            Arc::new(SyncContext::in_memory()),
            remote,
            MockTokenProvider::new("tok"),
            network,
        );
        Arc::new(SyncDispatcher::new(Arc::new(service)))
    }

    async fn hydrated(remote: MockRemoteStore, network: NetworkMonitor) -> Arc<TestDispatcher> {
        let snapshot = network.current();
        let dispatcher = dispatcher(remote, network);
        dispatcher.service().continue_offline().await;
        dispatcher.service().observe_network(snapshot).await;
        dispatcher
    }

    async fn wait_for<F: Fn(&SyncStatusView) -> bool>(dispatcher: &TestDispatcher, check: F) {
        let mut rx = dispatcher.subscribe();
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let done = check(&*rx.borrow_and_update());
                if done {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        })
        .await;
        assert!(result.is_ok(), "timed out waiting for status");
    }

    #[tokio::test]
    async fn startup_on_new_device_pulls() {
        let remote = MockRemoteStore::new();
        remote.seed(User::new("u1", "Ada"));
        let dispatcher = dispatcher(remote, NetworkMonitor::online());

        let (outcome, listener) = dispatcher.start().await;
        listener.abort();

        assert_eq!(
            outcome,
            DispatchOutcome::Pulled(PullOutcome::Completed { records: 1 })
        );
    }

    #[tokio::test]
    async fn enqueue_pushes_when_online() {
        let remote = MockRemoteStore::new();
        let dispatcher = hydrated(remote.clone(), NetworkMonitor::online()).await;

        dispatcher
            .enqueue_mutation(MutationAction::Create, User::new("u1", "Ada"))
            .await;

        assert_eq!(remote.records().len(), 1);
        assert_eq!(dispatcher.status().pending, 0);
    }

    #[tokio::test]
    async fn enqueue_offline_waits_for_reconnect() {
        let remote = MockRemoteStore::new();
        let network = NetworkMonitor::offline();
        let dispatcher = hydrated(remote.clone(), network.clone()).await;
        let listener = dispatcher.spawn_network_listener();

        dispatcher
            .enqueue_mutation(MutationAction::Create, User::new("u1", "Ada"))
            .await;
        assert!(remote.calls().is_empty());

        network.set_online();
        wait_for(&dispatcher, |s| s.pending == 0 && !s.is_syncing).await;
        listener.abort();

        assert_eq!(remote.records().len(), 1);
        assert!(dispatcher.status().network.is_online());
    }

    #[tokio::test]
    async fn reconnect_on_new_device_pulls_instead_of_pushing() {
        let remote = MockRemoteStore::new();
        remote.seed(User::new("u1", "Ada"));
        let network = NetworkMonitor::offline();
        let dispatcher = dispatcher(remote.clone(), network.clone());
        dispatcher
            .service()
            .enqueue_mutation(MutationAction::Create, User::new("u2", "Bea"))
            .await;
        let listener = dispatcher.spawn_network_listener();

        network.set_online();
        wait_for(&dispatcher, |s| s.has_hydrated_from_cloud && !s.is_syncing).await;
        listener.abort();

        let users = dispatcher
            .service()
            .context()
            .read_stores(|s| s.users.len())
            .await;
        assert_eq!(users, 1);
        assert!(remote
            .calls()
            .iter()
            .all(|call| matches!(call, RemoteCall::FetchAll(_))));
        assert_eq!(dispatcher.status().pending, 1);
    }

    #[tokio::test]
    async fn aborting_listener_mid_round_keeps_round_running() {
        let remote = MockRemoteStore::new();
        remote.set_latency(Duration::from_millis(200));
        let network = NetworkMonitor::offline();
        let dispatcher = hydrated(remote.clone(), network.clone()).await;
        dispatcher
            .enqueue_mutation(MutationAction::Create, User::new("u1", "Ada"))
            .await;
        let listener = dispatcher.spawn_network_listener();

        network.set_online();
        wait_for(&dispatcher, |s| s.is_syncing).await;
        listener.abort();
        wait_for(&dispatcher, |s| s.pending == 0 && !s.is_syncing).await;

        assert_eq!(remote.records().len(), 1);
        assert!(dispatcher.status().last_error.is_none());

        dispatcher
            .enqueue_mutation(MutationAction::Create, User::new("u2", "Bea"))
            .await;
        assert_eq!(dispatcher.status().pending, 0);
    }

    #[tokio::test]
    async fn going_offline_does_not_trigger() {
        let remote = MockRemoteStore::new();
        let network = NetworkMonitor::online();
        let dispatcher = hydrated(remote.clone(), network.clone()).await;
        dispatcher.service().set_sync_enabled(false).await;
        dispatcher
            .enqueue_mutation(MutationAction::Create, User::new("u1", "Ada"))
            .await;
        dispatcher.service().set_sync_enabled(true).await;
        let listener = dispatcher.spawn_network_listener();

        network.set_offline();
        wait_for(&dispatcher, |s| !s.network.is_connected).await;
        listener.abort();

        assert!(remote.calls().is_empty());
        assert_eq!(dispatcher.status().pending, 1);
    }

    #[tokio::test]
    async fn disabled_sync_skips_triggers() {
        let remote = MockRemoteStore::new();
        let dispatcher = hydrated(remote.clone(), NetworkMonitor::online()).await;
        dispatcher.service().set_sync_enabled(false).await;

        dispatcher
            .enqueue_mutation(MutationAction::Create, User::new("u1", "Ada"))
            .await;

        assert_eq!(
            dispatcher.trigger_sync().await,
            DispatchOutcome::Skipped(SkipReason::SyncDisabled)
        );
        assert!(remote.calls().is_empty());

        dispatcher.set_sync_enabled(true).await;
        assert_eq!(dispatcher.status().pending, 0);
    }

    #[tokio::test]
    async fn manual_trigger_offline_surfaces_error() {
        let remote = MockRemoteStore::new();
        let dispatcher = hydrated(remote, NetworkMonitor::offline()).await;
        dispatcher
            .enqueue_mutation(MutationAction::Create, User::new("u1", "Ada"))
            .await;

        let outcome = dispatcher.trigger_sync().await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Pushed(PushOutcome::Aborted(_))
        ));
        assert!(dispatcher.status().last_error.is_some());
    }
}
