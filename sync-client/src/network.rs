//! Connectivity monitor.
//!
//! [`NetworkMonitor`] holds the latest [`NetworkSnapshot`] in a
//! `tokio::sync::watch` channel. The platform layer (or the CLI) pushes
//! updates; the dispatcher subscribes to detect reconnects and the pull
//! round checks it before each entity type.

use spendsync_core::NetworkSnapshot;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared connectivity state. Clones observe the same channel.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    tx: Arc<watch::Sender<NetworkSnapshot>>,
}

impl NetworkMonitor {
    /// Monitor starting from `initial`.
    pub fn new(initial: NetworkSnapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Monitor that starts online.
    pub fn online() -> Self {
        Self::new(NetworkSnapshot::online())
    }

    /// Monitor that starts offline.
    pub fn offline() -> Self {
        Self::new(NetworkSnapshot::offline())
    }

    /// Publish a new snapshot. Subscribers are only woken on change.
    pub fn update(&self, snapshot: NetworkSnapshot) {
        self.tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                tracing::debug!(
                    "Network changed: connected={} reachable={:?}",
                    snapshot.is_connected,
                    snapshot.is_internet_reachable
                );
                *current = snapshot;
                true
            }
        });
    }

    /// Shorthand for `update(NetworkSnapshot::online())`.
    pub fn set_online(&self) {
        self.update(NetworkSnapshot::online());
    }

    /// Shorthand for `update(NetworkSnapshot::offline())`.
    pub fn set_offline(&self) {
        self.update(NetworkSnapshot::offline());
    }

    /// Latest snapshot.
    pub fn current(&self) -> NetworkSnapshot {
        *self.tx.borrow()
    }

    /// Whether the latest snapshot is usable for remote calls.
    pub fn is_online(&self) -> bool {
        self.current().is_online()
    }

    /// Receiver for connectivity transitions.
    pub fn subscribe(&self) -> watch::Receiver<NetworkSnapshot> {
        self.tx.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::online()
    }
}
