//! Termination policies
//!
//! The goal-driven policy stops a stratum once every goal atom has been
//! achieved. Atoms enter the fact set in cost-bucket order, so the first
//! achievement of a goal atom carries its optimal cost under the chosen
//! aggregator.

use crate::ir::{Fluent, GroundAtom, GroupIndex};
use ahash::AHashSet;

/// Decides when a stratum may stop early.
pub trait TerminationPolicy: Send {
    /// An atom entered the fact set.
    fn achieve(&mut self, atom: GroupIndex<GroundAtom<Fluent>>);

    /// True once evaluation may stop.
    fn check(&self) -> bool;

    /// Forget all achievements, keeping the goal.
    fn clear(&mut self);
}

/// Never stops early; the stratum runs to fixpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTermination;

impl TerminationPolicy for NoTermination {
    fn achieve(&mut self, _atom: GroupIndex<GroundAtom<Fluent>>) {}

    fn check(&self) -> bool {
        false
    }

    fn clear(&mut self) {}
}

/// Stops once all goal atoms are achieved.
#[derive(Debug, Clone, Default)]
pub struct GoalTermination {
    goals: AHashSet<GroupIndex<GroundAtom<Fluent>>>,
    achieved: AHashSet<GroupIndex<GroundAtom<Fluent>>>,
}

impl GoalTermination {
    /// Create a policy for the given goal atoms.
    pub fn new(goals: impl IntoIterator<Item = GroupIndex<GroundAtom<Fluent>>>) -> Self {
        GoalTermination {
            goals: goals.into_iter().collect(),
            achieved: AHashSet::new(),
        }
    }

    /// Replace the goal.
    pub fn set_goals(&mut self, goals: impl IntoIterator<Item = GroupIndex<GroundAtom<Fluent>>>) {
        self.goals = goals.into_iter().collect();
        self.achieved.clear();
    }

    /// The goal atoms.
    pub fn goals(&self) -> impl Iterator<Item = GroupIndex<GroundAtom<Fluent>>> + '_ {
        self.goals.iter().copied()
    }

    /// True if `atom` is a goal atom.
    pub fn is_goal(&self, atom: GroupIndex<GroundAtom<Fluent>>) -> bool {
        self.goals.contains(&atom)
    }
}

impl TerminationPolicy for GoalTermination {
    fn achieve(&mut self, atom: GroupIndex<GroundAtom<Fluent>>) {
        if self.goals.contains(&atom) {
            self.achieved.insert(atom);
        }
    }

    fn check(&self) -> bool {
        !self.goals.is_empty() && self.achieved.len() == self.goals.len()
    }

    fn clear(&mut self) {
        self.achieved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_termination() {
        let a = GroupIndex::new(0, 0);
        let b = GroupIndex::new(1, 2);
        let mut policy = GoalTermination::new([a, b]);
        assert!(!policy.check());

        policy.achieve(a);
        policy.achieve(GroupIndex::new(5, 5)); // not a goal
        assert!(!policy.check());

        policy.achieve(b);
        assert!(policy.check());

        policy.clear();
        assert!(!policy.check());
    }

    #[test]
    fn test_no_termination_never_stops() {
        let mut policy = NoTermination;
        policy.achieve(GroupIndex::new(0, 0));
        assert!(!policy.check());
    }

    #[test]
    fn test_empty_goal_does_not_stop_immediately() {
        // A run without goals computes the full closure.
        let policy = GoalTermination::new([]);
        assert!(!policy.check());
    }
}
