//! Entity records owned by the Local Entity Stores.
//!
//! Every record carries a `synced` flag (false = local changes not yet
//! confirmed by the remote store) and a `created_at` timestamp used only
//! for ordering list views.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{EntityId, Timestamp};

/// The four entity types that participate in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Account owner profile.
    User,
    /// A person expenses are shared with.
    Friend,
    /// A single expense or income entry.
    Transaction,
    /// A spending limit for a category and period.
    Budget,
}

impl EntityKind {
    /// All kinds in their canonical order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::User,
        EntityKind::Friend,
        EntityKind::Transaction,
        EntityKind::Budget,
    ];

    /// Lowercase name, as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Friend => "friend",
            EntityKind::Transaction => "transaction",
            EntityKind::Budget => "budget",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(EntityKind::User),
            "friend" => Ok(EntityKind::Friend),
            "transaction" => Ok(EntityKind::Transaction),
            "budget" => Ok(EntityKind::Budget),
            other => Err(format!("unknown entity type: {}", other)),
        }
    }
}

/// Common shape of every synced record.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// The kind tag for this record type.
    const KIND: EntityKind;

    /// The record's own id.
    fn id(&self) -> &EntityId;

    /// Whether the record matches what the remote store has confirmed.
    fn synced(&self) -> bool;

    /// Set the `synced` flag.
    fn set_synced(&mut self, synced: bool);

    /// Creation time, for list ordering.
    fn created_at(&self) -> Timestamp;
}

macro_rules! impl_entity {
    ($ty:ty, $kind:expr) => {
        impl Entity for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> &EntityId {
                &self.id
            }

            fn synced(&self) -> bool {
                self.synced
            }

            fn set_synced(&mut self, synced: bool) {
                self.synced = synced;
            }

            fn created_at(&self) -> Timestamp {
                self.created_at
            }
        }
    };
}

/// The account owner's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Record id.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Contact email, if provided.
    #[serde(default)]
    pub email: Option<String>,
    /// ISO 4217 currency code used for amounts.
    pub currency: String,
    /// Local changes confirmed remotely.
    #[serde(default)]
    pub synced: bool,
    /// Creation time.
    pub created_at: Timestamp,
}

impl User {
    /// Create a new, unsynced user record.
    pub fn new(id: impl Into<EntityId>, name: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            email: None,
            currency: "USD".to_string(),
            synced: false,
            created_at: Timestamp::now(),
        }
    }
}

/// Someone expenses can be split with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    /// Record id.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Contact email, if provided.
    #[serde(default)]
    pub email: Option<String>,
    /// Net balance in minor units; positive means the friend owes the user.
    #[serde(default)]
    pub balance_cents: i64,
    /// Local changes confirmed remotely.
    #[serde(default)]
    pub synced: bool,
    /// Creation time.
    pub created_at: Timestamp,
}

impl Friend {
    /// Create a new, unsynced friend record.
    pub fn new(id: impl Into<EntityId>, name: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            email: None,
            balance_cents: 0,
            synced: false,
            created_at: Timestamp::now(),
        }
    }
}

/// A single expense (negative) or income (positive) entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Record id.
    pub id: EntityId,
    /// Free-text description.
    pub description: String,
    /// Signed amount in minor units.
    pub amount_cents: i64,
    /// Spending category.
    pub category: String,
    /// Friend this transaction is shared with, if any.
    #[serde(default)]
    pub friend_id: Option<EntityId>,
    /// When the transaction happened.
    pub occurred_at: Timestamp,
    /// Local changes confirmed remotely.
    #[serde(default)]
    pub synced: bool,
    /// Creation time.
    pub created_at: Timestamp,
}

impl Transaction {
    /// Create a new, unsynced transaction record.
    pub fn new(
        id: impl Into<EntityId>,
        description: &str,
        amount_cents: i64,
        category: &str,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: id.into(),
            description: description.to_string(),
            amount_cents,
            category: category.to_string(),
            friend_id: None,
            occurred_at: now,
            synced: false,
            created_at: now,
        }
    }
}

/// Budget period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    /// Resets every week.
    Weekly,
    /// Resets every month.
    Monthly,
    /// Resets every year.
    Yearly,
}

/// A spending limit for a category over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// Record id.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Category the limit applies to.
    pub category: String,
    /// Limit in minor units.
    pub limit_cents: i64,
    /// Reset period.
    pub period: BudgetPeriod,
    /// Local changes confirmed remotely.
    #[serde(default)]
    pub synced: bool,
    /// Creation time.
    pub created_at: Timestamp,
}

impl Budget {
    /// Create a new, unsynced monthly budget record.
    pub fn new(id: impl Into<EntityId>, name: &str, category: &str, limit_cents: i64) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            category: category.to_string(),
            limit_cents,
            period: BudgetPeriod::Monthly,
            synced: false,
            created_at: Timestamp::now(),
        }
    }
}

impl_entity!(User, EntityKind::User);
impl_entity!(Friend, EntityKind::Friend);
impl_entity!(Transaction, EntityKind::Transaction);
impl_entity!(Budget, EntityKind::Budget);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_from_wire_name() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
        assert!("wallet".parse::<EntityKind>().is_err());
    }

    #[test]
    fn new_records_start_unsynced() {
        assert!(!User::new("u1", "Ada").synced());
        assert!(!Friend::new("f1", "Bob").synced());
        assert!(!Transaction::new("t1", "Lunch", -1250, "food").synced());
        assert!(!Budget::new("b1", "Food", "food", 40000).synced());
    }

    #[test]
    fn set_synced_flips_flag() {
        let mut user = User::new("u1", "Ada");
        user.set_synced(true);
        assert!(user.synced());
    }

    #[test]
    fn records_use_camel_case_fields() {
        let tx = Transaction::new("t1", "Lunch", -1250, "food");
        let json = serde_json::to_value(&tx).unwrap();
        assert!(json.get("amountCents").is_some());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn missing_synced_defaults_to_false() {
        let json = r#"{"id":"f1","name":"Bob","createdAt":5}"#;
        let friend: Friend = serde_json::from_str(json).unwrap();
        assert!(!friend.synced);
        assert_eq!(friend.balance_cents, 0);
    }
}
