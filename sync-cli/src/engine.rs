//! Wires the sync engine from CLI configuration.

use anyhow::{Context, Result};
use spendsync_client::{
    DispatchOutcome, JsonFilePersistence, NetworkMonitor, PullOutcome, PushOutcome,
    StaticTokenProvider, SyncConfig, SyncContext, SyncDispatcher, SyncService,
};
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::remote::DirRemoteStore;

/// Dispatcher type used by every command.
pub type Dispatcher = SyncDispatcher<DirRemoteStore, StaticTokenProvider>;

/// One open engine for the duration of a command.
pub struct Engine {
    /// Schedules push and pull rounds.
    pub dispatcher: Arc<Dispatcher>,
    /// Shared state and local stores.
    pub context: Arc<SyncContext>,
}

impl Engine {
    /// Open the engine stored in `data_dir`.
    pub async fn open(data_dir: &Path, config: &Config, force_offline: bool) -> Result<Self> {
        let persistence = JsonFilePersistence::new(data_dir);
        let context = Arc::new(
            SyncContext::open(Arc::new(persistence))
                .await
                .context("Failed to load sync state")?,
        );

        let mut sync_config = SyncConfig::new().with_request_timeout(config.request_timeout());
        if let Some(account) = config.account_id() {
            sync_config = sync_config.with_account(account);
        }

        let tokens = match config.token() {
            Some(token) => StaticTokenProvider::new(token),
            None => StaticTokenProvider::none(),
        };

        let network = if force_offline || config.network.offline {
            NetworkMonitor::offline()
        } else {
            NetworkMonitor::online()
        };

        let remote = DirRemoteStore::new(config.remote_dir(data_dir));
        tracing::debug!("Remote store at {}", remote.root().display());

        let service = SyncService::new(
            sync_config,
            Arc::clone(&context),
            remote,
            tokens,
            network.clone(),
        );
        service.observe_network(network.current()).await;

        Ok(Self {
            dispatcher: Arc::new(SyncDispatcher::new(Arc::new(service))),
            context,
        })
    }

    /// Flush state and stores to disk.
    pub async fn close(self) -> Result<()> {
        self.context
            .flush()
            .await
            .context("Failed to save sync state")
    }
}

/// One-line summary of a dispatch.
pub fn describe(outcome: &DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Skipped(reason) => format!("Skipped ({:?})", reason),
        DispatchOutcome::Pushed(push) => describe_push(push),
        DispatchOutcome::Pulled(pull) => describe_pull(pull),
    }
}

/// One-line summary of a push round.
pub fn describe_push(outcome: &PushOutcome) -> String {
    match outcome {
        PushOutcome::Disabled => "Push skipped: sync disabled".to_string(),
        PushOutcome::AlreadyRunning => "Push skipped: round in flight".to_string(),
        PushOutcome::NothingToPush => "Nothing to push".to_string(),
        PushOutcome::Aborted(failure) => format!("Push aborted: {}", failure),
        PushOutcome::Completed { pushed } => format!("Pushed {} mutation(s)", pushed),
        PushOutcome::Interrupted { pushed, remaining } => {
            format!("Push interrupted: {} pushed, {} left", pushed, remaining)
        }
        PushOutcome::Partial {
            pushed,
            failed,
            deferred,
            error,
        } => format!(
            "Push partial: {} pushed, {} failed, {} deferred ({})",
            pushed, failed, deferred, error
        ),
    }
}

/// One-line summary of a full pull.
pub fn describe_pull(outcome: &PullOutcome) -> String {
    match outcome {
        PullOutcome::NotSignedIn => "Pull skipped: not signed in".to_string(),
        PullOutcome::AlreadyRunning => "Pull skipped: round in flight".to_string(),
        PullOutcome::Offline {
            can_continue_offline: true,
        } => "Pull failed: offline (run 'spendsync continue-offline' to work offline)".to_string(),
        PullOutcome::Offline { .. } => "Pull failed: offline".to_string(),
        PullOutcome::Completed { records } => format!("Pulled {} record(s)", records),
        PullOutcome::Failed(failure) => format!("Pull failed: {}", failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spendsync_core::SkipReason;
    use tempfile::tempdir;

    #[tokio::test]
    async fn signed_out_engine_skips_rounds() {
        let dir = tempdir().unwrap();
        let engine = Engine::open(dir.path(), &Config::default(), false)
            .await
            .unwrap();

        let outcome = engine.dispatcher.trigger_sync().await;

        assert_eq!(outcome, DispatchOutcome::Skipped(SkipReason::SignedOut));
        engine.close().await.unwrap();
        assert!(dir.path().join("sync_state.json").exists());
    }

    #[tokio::test]
    async fn forced_offline_is_observed() {
        let dir = tempdir().unwrap();
        let engine = Engine::open(dir.path(), &Config::default(), true)
            .await
            .unwrap();

        assert!(!engine.dispatcher.status().network.is_online());
    }

    #[test]
    fn describes_offline_escape() {
        let text = describe_pull(&PullOutcome::Offline {
            can_continue_offline: true,
        });
        assert!(text.contains("continue-offline"));
    }
}
