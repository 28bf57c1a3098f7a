//! # sync-types
//!
//! Data model for the SpendSync offline-first sync engine.
//!
//! This crate provides the foundational types used across all SpendSync crates:
//! - [`EntityId`], [`QueueItemId`], [`AccountId`], [`Timestamp`] - Identity and time
//! - [`User`], [`Friend`], [`Transaction`], [`Budget`] - Synced entity records
//! - [`EntityPayload`], [`SyncQueueItem`] - Pending mutations, tagged by entity type
//! - [`SyncErrorKind`], [`SyncFailure`], [`CodecError`] - Error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

mod entity;
mod error;
mod ids;
mod mutation;

pub use entity::{Budget, BudgetPeriod, Entity, EntityKind, Friend, Transaction, User};
pub use error::{CodecError, SyncErrorKind, SyncFailure};
pub use ids::{AccountId, EntityId, QueueItemId, Timestamp};
pub use mutation::{EntityKey, EntityPayload, MutationAction, SyncQueueItem};
