//! Sync queue for SpendSync.
//!
//! This module provides the durable, ordered list of pending mutations:
//! - FIFO ordering (insertion order is replay order)
//! - Removal only by explicit confirmation of specific queue-item ids
//! - An explicit, separate `clear()` for superseding all pending work
//!
//! Nothing here performs I/O. The client persists the queue after every
//! change via [`crate::PersistedState`].

use serde::{Deserialize, Serialize};
use spendsync_types::{EntityKey, QueueItemId, SyncQueueItem};

/// Ordered queue of mutations not yet confirmed by the remote store.
///
/// Several items for the same entity may coexist (e.g. create, update,
/// delete while offline). They are never collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncQueue {
    items: Vec<SyncQueueItem>,
}

impl SyncQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item. Never rejects.
    pub fn enqueue(&mut self, item: SyncQueueItem) {
        self.items.push(item);
    }

    /// Remove the items whose remote confirmation has been received.
    ///
    /// Matching is by queue-item id only, so a newer mutation of the same
    /// entity survives an older confirmation. Unknown ids are ignored.
    /// Returns the number of items removed.
    pub fn dequeue_confirmed(&mut self, ids: &[QueueItemId]) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !ids.contains(&item.id));
        before - self.items.len()
    }

    /// Drop every pending item, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let count = self.items.len();
        self.items.clear();
        count
    }

    /// Items in replay order.
    pub fn items(&self) -> &[SyncQueueItem] {
        &self.items
    }

    /// Owned copy of the current items, for a push round.
    pub fn snapshot(&self) -> Vec<SyncQueueItem> {
        self.items.clone()
    }

    /// Look up an item by id.
    pub fn get(&self, id: &QueueItemId) -> Option<&SyncQueueItem> {
        self.items.iter().find(|item| item.id == *id)
    }

    /// Check if an item is still queued.
    pub fn contains(&self, id: &QueueItemId) -> bool {
        self.get(id).is_some()
    }

    /// Number of queued items targeting the given entity.
    pub fn pending_for(&self, key: &EntityKey) -> usize {
        self.items
            .iter()
            .filter(|item| item.entity_key() == *key)
            .count()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spendsync_types::{Friend, MutationAction, User};

    fn create_user(id: &str) -> SyncQueueItem {
        SyncQueueItem::new(MutationAction::Create, User::new(id, "Ada"))
    }

    #[test]
    fn queue_preserves_insertion_order() {
        let mut queue = SyncQueue::new();
        let a = create_user("u1");
        let b = SyncQueueItem::new(MutationAction::Update, User::new("u1", "Ada L."));
        let c = SyncQueueItem::new(MutationAction::Delete, User::new("u1", "Ada L."));
        let ids = [a.id, b.id, c.id];

        queue.enqueue(a);
        queue.enqueue(b);
        queue.enqueue(c);

        let order: Vec<_> = queue.items().iter().map(|i| i.id).collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn same_entity_mutations_are_not_collapsed() {
        let mut queue = SyncQueue::new();
        queue.enqueue(create_user("u1"));
        queue.enqueue(SyncQueueItem::new(MutationAction::Update, User::new("u1", "B")));

        assert_eq!(queue.len(), 2);
        let key = queue.items()[0].entity_key();
        assert_eq!(queue.pending_for(&key), 2);
    }

    #[test]
    fn dequeue_confirmed_removes_only_given_ids() {
        let mut queue = SyncQueue::new();
        let first = create_user("u1");
        let second = SyncQueueItem::new(MutationAction::Update, User::new("u1", "B"));
        let first_id = first.id;
        let second_id = second.id;
        queue.enqueue(first);
        queue.enqueue(second);

        let removed = queue.dequeue_confirmed(&[first_id]);

        assert_eq!(removed, 1);
        assert!(!queue.contains(&first_id));
        assert!(queue.contains(&second_id));
    }

    #[test]
    fn dequeue_unknown_id_is_no_op() {
        let mut queue = SyncQueue::new();
        queue.enqueue(create_user("u1"));

        assert_eq!(queue.dequeue_confirmed(&[QueueItemId::new()]), 0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn clear_reports_discarded_count() {
        let mut queue = SyncQueue::new();
        queue.enqueue(create_user("u1"));
        queue.enqueue(SyncQueueItem::new(MutationAction::Create, Friend::new("f1", "Bob")));

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn snapshot_is_independent_of_later_enqueues() {
        let mut queue = SyncQueue::new();
        queue.enqueue(create_user("u1"));
        let snapshot = queue.snapshot();

        queue.enqueue(create_user("u2"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn queue_serializes_as_plain_array() {
        let mut queue = SyncQueue::new();
        queue.enqueue(create_user("u1"));

        let json = serde_json::to_value(&queue).unwrap();
        assert!(json.is_array());
        let restored: SyncQueue = serde_json::from_value(json).unwrap();
        assert_eq!(restored, queue);
    }
}
