//! Cost-bucket driver
//!
//! A monotone queue of derived atoms keyed by their annotated cost. The
//! driver expands one non-empty bucket per iteration; a head whose
//! annotation improves before its bucket is visited is re-bucketed at the
//! cheaper cost, and the stale entry is skipped at visit time because the
//! atom is already in the fact set by then.

use crate::ir::{Fluent, GroundAtom, GroupIndex};
use std::collections::BTreeMap;

/// Monotone bucket queue of pending heads.
#[derive(Debug, Clone, Default)]
pub struct CostBuckets {
    buckets: BTreeMap<u32, Vec<GroupIndex<GroundAtom<Fluent>>>>,
    current_cost: u32,
    current: Vec<GroupIndex<GroundAtom<Fluent>>>,
}

impl CostBuckets {
    /// Create an empty queue at cost 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cost of the bucket being expanded.
    #[inline]
    pub fn current_cost(&self) -> u32 {
        self.current_cost
    }

    /// Queue `head` into the bucket of `cost`.
    pub fn push(&mut self, cost: u32, head: GroupIndex<GroundAtom<Fluent>>) {
        debug_assert!(cost >= self.current_cost);
        self.buckets.entry(cost).or_default().push(head);
    }

    /// Drop the already-expanded bucket contents.
    pub fn clear_current(&mut self) {
        self.current.clear();
    }

    /// Advance to the next non-empty bucket; false if none remains.
    /// Advancing is monotone in cost.
    pub fn advance_to_next_nonempty(&mut self) -> bool {
        while let Some((&cost, _)) = self.buckets.iter().next() {
            debug_assert!(cost >= self.current_cost);
            let heads = self
                .buckets
                .remove(&cost)
                .unwrap_or_default();
            if heads.is_empty() {
                continue;
            }
            self.current_cost = cost;
            self.current = heads;
            return true;
        }
        false
    }

    /// The heads of the bucket being expanded.
    pub fn current_bucket(&self) -> &[GroupIndex<GroundAtom<Fluent>>] {
        &self.current
    }

    /// Empty the queue and reset the cost cursor.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.current.clear();
        self.current_cost = 0;
    }
}
