//! Error types for SpendSync.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::{QueueItemId, Timestamp};

/// JSON encoding/decoding failure at the serialization boundary.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Serialization failed
    #[error("serialization failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed
    #[error("deserialization failed: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Classification of a sync failure, as surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncErrorKind {
    /// No connectivity at attempt time.
    NetworkUnavailable,
    /// Missing or expired credential after one refresh attempt.
    AuthFailure,
    /// The remote store refused a specific item.
    RemoteRejected,
    /// A remote call exceeded its deadline.
    Timeout,
    /// Unclassified.
    Unknown,
}

impl SyncErrorKind {
    /// Relative severity, used to pick which failure a round reports.
    ///
    /// Round-level failures outrank per-item ones.
    pub fn severity(&self) -> u8 {
        match self {
            SyncErrorKind::AuthFailure => 4,
            SyncErrorKind::NetworkUnavailable => 3,
            SyncErrorKind::Timeout => 2,
            SyncErrorKind::RemoteRejected => 1,
            SyncErrorKind::Unknown => 0,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncErrorKind::NetworkUnavailable => "NETWORK_UNAVAILABLE",
            SyncErrorKind::AuthFailure => "AUTH_FAILURE",
            SyncErrorKind::RemoteRejected => "REMOTE_REJECTED",
            SyncErrorKind::Timeout => "TIMEOUT",
            SyncErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure descriptor stored as `lastError`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    /// Classification.
    pub kind: SyncErrorKind,
    /// Human-readable detail.
    pub message: String,
    /// Queue item that failed, for per-item failures.
    #[serde(default)]
    pub item_id: Option<QueueItemId>,
    /// When the failure was recorded.
    pub at: Timestamp,
}

impl SyncFailure {
    /// A round-level failure.
    pub fn new(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            item_id: None,
            at: Timestamp::now(),
        }
    }

    /// A failure tied to one queue item.
    pub fn for_item(kind: SyncErrorKind, message: impl Into<String>, item_id: QueueItemId) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::new(kind, message)
        }
    }

    /// Shorthand for `NETWORK_UNAVAILABLE`.
    pub fn network_unavailable() -> Self {
        Self::new(SyncErrorKind::NetworkUnavailable, "network unavailable")
    }

    /// Keep the more severe of two failures; ties keep the first.
    pub fn most_severe(current: Option<SyncFailure>, candidate: SyncFailure) -> SyncFailure {
        match current {
            Some(existing) if existing.kind.severity() >= candidate.kind.severity() => existing,
            _ => candidate,
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
