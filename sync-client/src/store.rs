//! Local entity stores.
//!
//! The device's source of truth between sync rounds. UI actions write here
//! (and enqueue a mutation); the sync service flips `synced` on
//! confirmation and a full pull replaces a store wholesale.

use serde::{Deserialize, Serialize};
use spendsync_types::{
    Budget, Entity, EntityId, EntityKey, EntityKind, EntityPayload, Friend, MutationAction,
    Transaction, User,
};
use std::collections::BTreeMap;

/// Store of one entity type, keyed by id.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityStore<E: Entity> {
    records: BTreeMap<EntityId, E>,
}

impl<E: Entity> EntityStore<E> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Build a store from records (later duplicates win).
    pub fn from_records(records: Vec<E>) -> Self {
        let mut store = Self::new();
        store.replace_all(records);
        store
    }

    /// Look up a record.
    pub fn get(&self, id: &EntityId) -> Option<&E> {
        self.records.get(id)
    }

    /// Insert a new record. Returns false if the id already exists.
    pub fn add(&mut self, record: E) -> bool {
        if self.records.contains_key(record.id()) {
            return false;
        }
        self.records.insert(record.id().clone(), record);
        true
    }

    /// Replace an existing record. Returns false if the id is unknown.
    pub fn update(&mut self, record: E) -> bool {
        match self.records.get_mut(record.id()) {
            Some(existing) => {
                *existing = record;
                true
            }
            None => false,
        }
    }

    /// Insert or replace.
    pub fn upsert(&mut self, record: E) {
        self.records.insert(record.id().clone(), record);
    }

    /// Remove a record.
    pub fn delete(&mut self, id: &EntityId) -> Option<E> {
        self.records.remove(id)
    }

    /// Records ordered by creation time, then id.
    pub fn list(&self) -> Vec<&E> {
        let mut records: Vec<&E> = self.records.values().collect();
        records.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        records
    }

    /// Replace the whole store. Returns the new record count.
    pub fn replace_all(&mut self, records: Vec<E>) -> usize {
        self.records = records
            .into_iter()
            .map(|record| (record.id().clone(), record))
            .collect();
        self.records.len()
    }

    /// Set `synced = true` on a record. Returns false if it is gone.
    pub fn mark_synced(&mut self, id: &EntityId) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                record.set_synced(true);
                true
            }
            None => false,
        }
    }

    /// Records not yet confirmed by the remote.
    pub fn dirty(&self) -> Vec<&E> {
        self.list().into_iter().filter(|r| !r.synced()).collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn records_cloned(&self) -> Vec<E> {
        self.list().into_iter().cloned().collect()
    }
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable copy of every local store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSnapshot {
    /// Users.
    #[serde(default)]
    pub users: Vec<User>,
    /// Friends.
    #[serde(default)]
    pub friends: Vec<Friend>,
    /// Transactions.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Budgets.
    #[serde(default)]
    pub budgets: Vec<Budget>,
}

/// The four local stores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalStores {
    /// Users.
    pub users: EntityStore<User>,
    /// Friends.
    pub friends: EntityStore<Friend>,
    /// Transactions.
    pub transactions: EntityStore<Transaction>,
    /// Budgets.
    pub budgets: EntityStore<Budget>,
}

impl LocalStores {
    /// Empty stores.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a persisted snapshot.
    pub fn from_snapshot(snapshot: LocalSnapshot) -> Self {
        Self {
            users: EntityStore::from_records(snapshot.users),
            friends: EntityStore::from_records(snapshot.friends),
            transactions: EntityStore::from_records(snapshot.transactions),
            budgets: EntityStore::from_records(snapshot.budgets),
        }
    }

    /// Serializable copy.
    pub fn snapshot(&self) -> LocalSnapshot {
        LocalSnapshot {
            users: self.users.records_cloned(),
            friends: self.friends.records_cloned(),
            transactions: self.transactions.records_cloned(),
            budgets: self.budgets.records_cloned(),
        }
    }

    /// Apply a local (UI) mutation.
    ///
    /// Create and update upsert the record as dirty; delete removes it.
    pub fn apply_local(&mut self, action: MutationAction, payload: &EntityPayload) {
        if action == MutationAction::Delete {
            self.delete(&payload.entity_key());
            return;
        }
        match payload.clone().with_synced(false) {
            EntityPayload::User(e) => self.users.upsert(e),
            EntityPayload::Friend(e) => self.friends.upsert(e),
            EntityPayload::Transaction(e) => self.transactions.upsert(e),
            EntityPayload::Budget(e) => self.budgets.upsert(e),
        }
    }

    /// Current record for an entity, as a payload.
    pub fn get(&self, key: &EntityKey) -> Option<EntityPayload> {
        match key.kind {
            EntityKind::User => self.users.get(&key.id).cloned().map(Into::into),
            EntityKind::Friend => self.friends.get(&key.id).cloned().map(Into::into),
            EntityKind::Transaction => self.transactions.get(&key.id).cloned().map(Into::into),
            EntityKind::Budget => self.budgets.get(&key.id).cloned().map(Into::into),
        }
    }

    /// Remove an entity.
    pub fn delete(&mut self, key: &EntityKey) -> bool {
        match key.kind {
            EntityKind::User => self.users.delete(&key.id).is_some(),
            EntityKind::Friend => self.friends.delete(&key.id).is_some(),
            EntityKind::Transaction => self.transactions.delete(&key.id).is_some(),
            EntityKind::Budget => self.budgets.delete(&key.id).is_some(),
        }
    }

    /// Mark an entity as confirmed by the remote.
    pub fn mark_synced(&mut self, key: &EntityKey) -> bool {
        match key.kind {
            EntityKind::User => self.users.mark_synced(&key.id),
            EntityKind::Friend => self.friends.mark_synced(&key.id),
            EntityKind::Transaction => self.transactions.mark_synced(&key.id),
            EntityKind::Budget => self.budgets.mark_synced(&key.id),
        }
    }

    /// Replace one store with fetched records, all marked synced.
    ///
    /// Payloads of another kind are ignored. Returns the new record count.
    pub fn replace_kind(&mut self, kind: EntityKind, payloads: Vec<EntityPayload>) -> usize {
        let mut users = Vec::new();
        let mut friends = Vec::new();
        let mut transactions = Vec::new();
        let mut budgets = Vec::new();
        for payload in payloads {
            if payload.kind() != kind {
                tracing::warn!(
                    "Ignoring {} record {} in {} snapshot",
                    payload.kind(),
                    payload.entity_id(),
                    kind
                );
                continue;
            }
            match payload.with_synced(true) {
                EntityPayload::User(e) => users.push(e),
                EntityPayload::Friend(e) => friends.push(e),
                EntityPayload::Transaction(e) => transactions.push(e),
                EntityPayload::Budget(e) => budgets.push(e),
            }
        }
        match kind {
            EntityKind::User => self.users.replace_all(users),
            EntityKind::Friend => self.friends.replace_all(friends),
            EntityKind::Transaction => self.transactions.replace_all(transactions),
            EntityKind::Budget => self.budgets.replace_all(budgets),
        }
    }

    /// Number of records of one kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::User => self.users.len(),
            EntityKind::Friend => self.friends.len(),
            EntityKind::Transaction => self.transactions.len(),
            EntityKind::Budget => self.budgets.len(),
        }
    }

    /// Number of records not yet confirmed, across all stores.
    pub fn dirty_count(&self) -> usize {
        self.users.dirty().len()
            + self.friends.dirty().len()
            + self.transactions.dirty().len()
            + self.budgets.dirty().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spendsync_types::Timestamp;

    fn user(id: &str, name: &str, created: u64) -> User {
        let mut user = User::new(id, name);
        user.created_at = Timestamp::from_millis(created);
        user
    }

    // ===========================================
    // EntityStore Tests
    // ===========================================

    #[test]
    fn add_rejects_duplicate_ids() {
        let mut store = EntityStore::new();
        assert!(store.add(user("u1", "Ada", 1)));
        assert!(!store.add(user("u1", "Other", 2)));
        assert_eq!(store.get(&EntityId::new("u1")).unwrap().name, "Ada");
    }

    #[test]
    fn update_requires_existing_record() {
        let mut store = EntityStore::new();
        assert!(!store.update(user("u1", "Ada", 1)));

        store.add(user("u1", "Ada", 1));
        assert!(store.update(user("u1", "Ada L.", 1)));
        assert_eq!(store.get(&EntityId::new("u1")).unwrap().name, "Ada L.");
    }

    #[test]
    fn list_orders_by_creation_then_id() {
        let mut store = EntityStore::new();
        store.add(user("b", "B", 5));
        store.add(user("c", "C", 1));
        store.add(user("a", "A", 5));

        let ids: Vec<&str> = store.list().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn dirty_lists_unsynced_records() {
        let mut store = EntityStore::new();
        store.add(user("u1", "Ada", 1));
        store.add(user("u2", "Bea", 2));
        store.mark_synced(&EntityId::new("u1"));

        let dirty: Vec<&str> = store.dirty().iter().map(|u| u.id.as_str()).collect();
        assert_eq!(dirty, vec!["u2"]);
    }

    #[test]
    fn replace_all_drops_previous_records() {
        let mut store = EntityStore::new();
        store.add(user("u1", "Ada", 1));

        let count = store.replace_all(vec![user("u2", "Bea", 2)]);

        assert_eq!(count, 1);
        assert!(store.get(&EntityId::new("u1")).is_none());
    }

    // ===========================================
    // LocalStores Tests
    // ===========================================

    #[test]
    fn apply_local_marks_records_dirty() {
        let mut stores = LocalStores::new();
        let payload = EntityPayload::from(User::new("u1", "Ada")).with_synced(true);

        stores.apply_local(MutationAction::Create, &payload);

        assert_eq!(stores.users.dirty().len(), 1);
    }

    #[test]
    fn apply_local_delete_removes_record() {
        let mut stores = LocalStores::new();
        let payload = EntityPayload::from(Friend::new("f1", "Bob"));
        stores.apply_local(MutationAction::Create, &payload);

        stores.apply_local(MutationAction::Delete, &payload);

        assert!(stores.get(&payload.entity_key()).is_none());
    }

    #[test]
    fn replace_kind_only_touches_that_store() {
        let mut stores = LocalStores::new();
        stores.apply_local(MutationAction::Create, &User::new("u1", "Ada").into());
        stores.apply_local(MutationAction::Create, &Friend::new("f1", "Bob").into());

        let count = stores.replace_kind(
            EntityKind::Friend,
            vec![
                Friend::new("f2", "Cy").into(),
                User::new("stray", "Wrong kind").into(),
            ],
        );

        assert_eq!(count, 1);
        assert_eq!(stores.count(EntityKind::User), 1);
        assert!(stores.friends.get(&EntityId::new("f1")).is_none());
        assert!(stores.friends.get(&EntityId::new("f2")).unwrap().synced);
    }

    #[test]
    fn snapshot_restores_identical_stores() {
        let mut stores = LocalStores::new();
        stores.apply_local(MutationAction::Create, &User::new("u1", "Ada").into());
        stores.apply_local(
            MutationAction::Create,
            &Budget::new("b1", "Food", "groceries", 40_000).into(),
        );

        let json = serde_json::to_string(&stores.snapshot()).unwrap();
        let restored = LocalStores::from_snapshot(serde_json::from_str(&json).unwrap());

        assert_eq!(restored, stores);
        assert_eq!(restored.dirty_count(), 2);
    }
}
