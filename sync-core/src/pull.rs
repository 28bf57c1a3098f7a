//! Full-pull schedule.
//!
//! A new device fetches the account's data one entity type at a time.
//! [`PullPlan`] fixes that order and the progress fraction reported after
//! each step, so progress is determinate and strictly increasing.

use spendsync_types::EntityKind;

/// Ordered entity types for a full pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullPlan {
    kinds: Vec<EntityKind>,
}

impl PullPlan {
    /// Every entity type, users first.
    ///
    /// Users and friends come before transactions and budgets, which
    /// reference them.
    pub fn full() -> Self {
        Self {
            kinds: EntityKind::ALL.to_vec(),
        }
    }

    /// A plan over a custom list of kinds (duplicates removed, order kept).
    pub fn of(kinds: &[EntityKind]) -> Self {
        let mut unique = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }
        Self { kinds: unique }
    }

    /// Kinds in fetch order.
    pub fn kinds(&self) -> &[EntityKind] {
        &self.kinds
    }

    /// Number of fetch steps.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check if the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Progress once `completed` steps are done.
    pub fn progress_after(&self, completed: usize) -> f32 {
        if self.kinds.is_empty() {
            return 1.0;
        }
        (completed.min(self.kinds.len()) as f32) / (self.kinds.len() as f32)
    }

    /// `(kind, progress once that kind is stored)` for each step.
    pub fn steps(&self) -> impl Iterator<Item = (EntityKind, f32)> + '_ {
        self.kinds
            .iter()
            .enumerate()
            .map(move |(i, kind)| (*kind, self.progress_after(i + 1)))
    }
}

impl Default for PullPlan {
    fn default() -> Self {
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_plan_starts_with_users() {
        let plan = PullPlan::full();
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.kinds()[0], EntityKind::User);
    }

    #[test]
    fn progress_strictly_increases_to_one() {
        let plan = PullPlan::full();
        let fractions: Vec<f32> = plan.steps().map(|(_, p)| p).collect();

        assert!(fractions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*fractions.last().unwrap(), 1.0);
        assert_eq!(fractions[0], 0.25);
    }

    #[test]
    fn custom_plan_drops_duplicates() {
        let plan = PullPlan::of(&[EntityKind::Budget, EntityKind::User, EntityKind::Budget]);
        assert_eq!(plan.kinds(), &[EntityKind::Budget, EntityKind::User]);
    }

    #[test]
    fn empty_plan_is_complete() {
        let plan = PullPlan::of(&[]);
        assert!(plan.is_empty());
        assert_eq!(plan.progress_after(0), 1.0);
    }
}
