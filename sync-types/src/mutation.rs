//! Pending mutations and their payloads.
//!
//! A [`SyncQueueItem`] records one local mutation that the remote store
//! has not confirmed yet. Its payload is an [`EntityPayload`], a tagged
//! union keyed by the entity `type`, so the type tag and the snapshot can
//! never disagree once decoded.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    Budget, CodecError, Entity, EntityId, EntityKind, Friend, QueueItemId, Timestamp, Transaction,
    User,
};

/// The kind of mutation a queue item replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationAction {
    /// Record did not exist remotely.
    Create,
    /// Record exists remotely and changed.
    Update,
    /// Record should be removed remotely.
    Delete,
}

impl MutationAction {
    /// Lowercase name, as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationAction::Create => "create",
            MutationAction::Update => "update",
            MutationAction::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MutationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(MutationAction::Create),
            "update" => Ok(MutationAction::Update),
            "delete" => Ok(MutationAction::Delete),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

/// Snapshot of a single entity, tagged by its type.
///
/// For create/update this is the full record at enqueue time; for delete
/// it is the last known record, which carries the id to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum EntityPayload {
    /// A user snapshot.
    User(User),
    /// A friend snapshot.
    Friend(Friend),
    /// A transaction snapshot.
    Transaction(Transaction),
    /// A budget snapshot.
    Budget(Budget),
}

impl EntityPayload {
    /// The entity type this payload carries.
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityPayload::User(_) => EntityKind::User,
            EntityPayload::Friend(_) => EntityKind::Friend,
            EntityPayload::Transaction(_) => EntityKind::Transaction,
            EntityPayload::Budget(_) => EntityKind::Budget,
        }
    }

    /// The id of the entity this payload carries.
    pub fn entity_id(&self) -> &EntityId {
        match self {
            EntityPayload::User(e) => e.id(),
            EntityPayload::Friend(e) => e.id(),
            EntityPayload::Transaction(e) => e.id(),
            EntityPayload::Budget(e) => e.id(),
        }
    }

    /// The `(kind, id)` key identifying the entity.
    pub fn entity_key(&self) -> EntityKey {
        EntityKey {
            kind: self.kind(),
            id: self.entity_id().clone(),
        }
    }

    /// Return a copy with the `synced` flag set.
    pub fn with_synced(mut self, synced: bool) -> Self {
        match &mut self {
            EntityPayload::User(e) => e.set_synced(synced),
            EntityPayload::Friend(e) => e.set_synced(synced),
            EntityPayload::Transaction(e) => e.set_synced(synced),
            EntityPayload::Budget(e) => e.set_synced(synced),
        }
        self
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(CodecError::Encode)
    }

    /// Decode from JSON, rejecting unknown `type` tags.
    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        serde_json::from_str(json).map_err(CodecError::Decode)
    }
}

impl From<User> for EntityPayload {
    fn from(value: User) -> Self {
        EntityPayload::User(value)
    }
}

impl From<Friend> for EntityPayload {
    fn from(value: Friend) -> Self {
        EntityPayload::Friend(value)
    }
}

impl From<Transaction> for EntityPayload {
    fn from(value: Transaction) -> Self {
        EntityPayload::Transaction(value)
    }
}

impl From<Budget> for EntityPayload {
    fn from(value: Budget) -> Self {
        EntityPayload::Budget(value)
    }
}

/// `(type, id)` pair naming one entity across all stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    /// Entity type.
    pub kind: EntityKind,
    /// Entity id.
    pub id: EntityId,
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A pending mutation in the sync queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueItem {
    /// Queue entry id (not the entity id).
    pub id: QueueItemId,
    /// Mutation to replay.
    pub action: MutationAction,
    /// Entity snapshot, tagged by type.
    pub payload: EntityPayload,
    /// When the mutation was enqueued.
    pub enqueued_at: Timestamp,
}

impl SyncQueueItem {
    /// Create a queue item with a fresh id.
    pub fn new(action: MutationAction, payload: impl Into<EntityPayload>) -> Self {
        Self {
            id: QueueItemId::new(),
            action,
            payload: payload.into(),
            enqueued_at: Timestamp::now(),
        }
    }

    /// Entity type of the payload.
    pub fn kind(&self) -> EntityKind {
        self.payload.kind()
    }

    /// Entity id of the payload.
    pub fn entity_id(&self) -> &EntityId {
        self.payload.entity_id()
    }

    /// `(type, id)` of the payload.
    pub fn entity_key(&self) -> EntityKey {
        self.payload.entity_key()
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(CodecError::Encode)
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        serde_json::from_str(json).map_err(CodecError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_tagged_by_type() {
        let payload = EntityPayload::from(User::new("u1", "Ada"));
        let json: serde_json::Value = serde_json::from_str(&payload.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "user");
        assert_eq!(json["data"]["id"], "u1");
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let json = r#"{"type":"wallet","data":{"id":"w1"}}"#;
        assert!(matches!(
            EntityPayload::from_json(json),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn mismatched_payload_shape_is_rejected() {
        // A friend tag with a transaction body is missing required fields.
        let json = r#"{"type":"friend","data":{"id":"t1","description":"x","amountCents":1}}"#;
        assert!(EntityPayload::from_json(json).is_err());
    }

    #[test]
    fn queue_item_decodes_from_wire_form() {
        let item = SyncQueueItem::new(
            MutationAction::Update,
            Budget::new("b1", "Food", "food", 40000),
        );
        let decoded = SyncQueueItem::from_json(&item.to_json().unwrap()).unwrap();
        assert_eq!(decoded, item);
        assert_eq!(decoded.kind(), EntityKind::Budget);
        assert_eq!(decoded.entity_id().as_str(), "b1");
    }

    #[test]
    fn entity_key_display() {
        let item = SyncQueueItem::new(MutationAction::Delete, Friend::new("f9", "Bob"));
        assert_eq!(item.entity_key().to_string(), "friend:f9");
    }

    #[test]
    fn with_synced_marks_snapshot() {
        let payload = EntityPayload::from(Friend::new("f1", "Bob")).with_synced(true);
        match payload {
            EntityPayload::Friend(f) => assert!(f.synced),
            other => panic!("Expected Friend, got {:?}", other),
        }
    }

    #[test]
    fn action_parses_from_wire_name() {
        assert_eq!("create".parse::<MutationAction>().unwrap(), MutationAction::Create);
        assert!("upsert".parse::<MutationAction>().is_err());
    }
}
