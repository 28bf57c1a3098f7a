//! # sync-core
//!
//! Pure logic for SpendSync (no I/O, instant tests).
//!
//! This crate implements the sync queue, the state register and the
//! scheduling policy without any network or disk I/O, enabling fast unit
//! tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (remote store, disk, connectivity) is performed by
//! `sync-client`, which drives these types.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod policy;
pub mod pull;
pub mod queue;
pub mod state;

pub use policy::{decide, is_new_device, Decision, DispatchInputs, SkipReason, Trigger};
pub use pull::PullPlan;
pub use queue::SyncQueue;
pub use state::{
    NetworkSnapshot, PersistedState, RoundBusy, RoundKind, SyncState, SyncStatus, SyncStatusView,
};
