//! # sync-client
//!
//! Offline-first sync engine for SpendSync.
//!
//! This is the library the app embeds: every local edit is applied to the
//! local stores and queued, and queued edits are replayed against the
//! cloud when connectivity, credentials and the sync toggle allow.
//!
//! ## Features
//!
//! - **Durable Queue**: FIFO mutation queue that survives restarts
//! - **Partial Failure**: One refused item never blocks unrelated items
//! - **New-Device Pull**: Determinate full hydration with offline escape
//! - **Pluggable Seams**: Remote store, token provider and persistence traits
//! - **Pure Core**: Uses sync-core for side-effect-free state transitions
//!
//! ## Example
//!
//! ```ignore
//! use spendsync_client::{SyncConfig, SyncContext, SyncDispatcher, SyncService};
//!
//! let context = Arc::new(SyncContext::open(persistence).await?);
//! let service = SyncService::new(config, context, remote, tokens, network);
//! let dispatcher = Arc::new(SyncDispatcher::new(Arc::new(service)));
//!
//! let (_, listener) = dispatcher.start().await;
//! dispatcher.enqueue_mutation(MutationAction::Create, user).await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod context;
pub mod dispatcher;
pub mod network;
pub mod persist;
pub mod remote;
pub mod service;
pub mod store;

pub use auth::{Credential, MockTokenProvider, StaticTokenProvider, TokenProvider};
pub use context::SyncContext;
pub use dispatcher::{DispatchOutcome, SyncDispatcher};
pub use network::NetworkMonitor;
pub use persist::{JsonFilePersistence, MemoryPersistence, PersistError, StatePersistence};
pub use remote::{MockRemoteStore, RemoteCall, RemoteError, RemoteStore};
pub use service::{ClientError, PullOutcome, PushOutcome, SyncConfig, SyncService};
pub use store::{EntityStore, LocalSnapshot, LocalStores};
