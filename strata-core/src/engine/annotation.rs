//! Annotation policies
//!
//! The grounding derivation graph is an AND/OR graph: atoms are OR-nodes
//! (any witness derives them), rule applications are AND-nodes (all body
//! sub-goals plus the rule cost). A policy aggregates AND-node costs with
//! Sum (h_add, h_ff) or Max (h_max), keeps the cheapest witness per atom,
//! and exposes the witness DAG for relaxed-plan extraction. The no-op
//! policy turns the engine into a plain closure computation.

use crate::ir::{Fluent, GroundAtom, GroupIndex, Index, Object, Rule};
use ahash::AHashMap;
use std::marker::PhantomData;

/// Cost of an unannotated atom.
pub const UNREACHED: u32 = u32::MAX;

/// AND-node cost aggregation over body sub-goals.
pub trait Aggregation: Copy + Default + Send + Sync + 'static {
    /// Aggregation identity.
    const IDENTITY: u32;
    /// Fold one sub-goal cost into the accumulator.
    fn combine(acc: u32, item: u32) -> u32;
}

/// Sum aggregation: cost(AND) = sum of sub-goal costs + rule cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumAggregation;

impl Aggregation for SumAggregation {
    const IDENTITY: u32 = 0;
    fn combine(acc: u32, item: u32) -> u32 {
        acc.saturating_add(item)
    }
}

/// Max aggregation: cost(AND) = max sub-goal cost + rule cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxAggregation;

impl Aggregation for MaxAggregation {
    const IDENTITY: u32 = 0;
    fn combine(acc: u32, item: u32) -> u32 {
        acc.max(item)
    }
}

/// The recorded justification of a derived atom: the rule application and
/// the body sub-goals it consumed. Witnesses reference other atoms'
/// annotations, forming a DAG after stratification.
#[derive(Debug, Clone)]
pub struct Witness {
    /// The applied rule.
    pub rule: Index<Rule>,
    /// The variable binding.
    pub binding: Vec<Index<Object>>,
    /// Ground positive fluent body atoms.
    pub subgoals: Vec<GroupIndex<GroundAtom<Fluent>>>,
}

/// OR/AND annotation policy of one run.
pub trait AnnotationPolicy: Send + Sync {
    /// AND-node cost of a rule application. `current_cost` is the cost
    /// bucket being expanded, used by policies that do not track costs.
    fn and_cost(
        &self,
        rule_cost: u32,
        subgoals: &[GroupIndex<GroundAtom<Fluent>>],
        current_cost: u32,
    ) -> u32;

    /// Offer a new witness for `head` at `cost`; returns true if the
    /// OR-annotation improved (monotonically decreasing).
    fn update(&mut self, head: GroupIndex<GroundAtom<Fluent>>, cost: u32, witness: Witness)
        -> bool;

    /// Annotate a seed fact.
    fn initialize(&mut self, head: GroupIndex<GroundAtom<Fluent>>, cost: u32);

    /// Current OR-annotation of `head`, if any.
    fn cost(&self, head: GroupIndex<GroundAtom<Fluent>>) -> Option<u32>;

    /// Witness of `head`; seed facts have none.
    fn witness(&self, head: GroupIndex<GroundAtom<Fluent>>) -> Option<&Witness>;

    /// Drop all annotations.
    fn clear(&mut self);
}

/// The no-op policy for plain closure computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnnotation;

impl AnnotationPolicy for NoAnnotation {
    fn and_cost(
        &self,
        _rule_cost: u32,
        _subgoals: &[GroupIndex<GroundAtom<Fluent>>],
        current_cost: u32,
    ) -> u32 {
        current_cost
    }

    fn update(
        &mut self,
        _head: GroupIndex<GroundAtom<Fluent>>,
        _cost: u32,
        _witness: Witness,
    ) -> bool {
        true
    }

    fn initialize(&mut self, _head: GroupIndex<GroundAtom<Fluent>>, _cost: u32) {}

    fn cost(&self, _head: GroupIndex<GroundAtom<Fluent>>) -> Option<u32> {
        None
    }

    fn witness(&self, _head: GroupIndex<GroundAtom<Fluent>>) -> Option<&Witness> {
        None
    }

    fn clear(&mut self) {}
}

/// Cost-tracking policy parameterized by the AND aggregation.
#[derive(Debug, Clone, Default)]
pub struct CostAnnotation<A> {
    /// OR-node costs per fluent group.
    or_costs: Vec<Vec<u32>>,
    /// Best witness per derived atom.
    witnesses: AHashMap<GroupIndex<GroundAtom<Fluent>>, Witness>,
    /// AND-node costs per (rule, binding).
    and_costs: AHashMap<(Index<Rule>, Vec<Index<Object>>), u32>,
    _marker: PhantomData<fn() -> A>,
}

impl<A: Aggregation> CostAnnotation<A> {
    /// Create an empty policy.
    pub fn new() -> Self {
        CostAnnotation {
            or_costs: Vec::new(),
            witnesses: AHashMap::new(),
            and_costs: AHashMap::new(),
            _marker: PhantomData,
        }
    }

    fn or_cost(&self, head: GroupIndex<GroundAtom<Fluent>>) -> u32 {
        self.or_costs
            .get(head.group as usize)
            .and_then(|g| g.get(head.value as usize))
            .copied()
            .unwrap_or(UNREACHED)
    }

    fn set_or_cost(&mut self, head: GroupIndex<GroundAtom<Fluent>>, cost: u32) {
        let group = head.group as usize;
        if self.or_costs.len() <= group {
            self.or_costs.resize_with(group + 1, Vec::new);
        }
        let costs = &mut self.or_costs[group];
        if costs.len() <= head.value as usize {
            costs.resize(head.value as usize + 1, UNREACHED);
        }
        costs[head.value as usize] = cost;
    }

    /// AND-annotation of a rule application, if recorded.
    pub fn and_annotation(&self, rule: Index<Rule>, binding: &[Index<Object>]) -> Option<u32> {
        self.and_costs.get(&(rule, binding.to_vec())).copied()
    }
}

impl<A: Aggregation> AnnotationPolicy for CostAnnotation<A> {
    fn and_cost(
        &self,
        rule_cost: u32,
        subgoals: &[GroupIndex<GroundAtom<Fluent>>],
        _current_cost: u32,
    ) -> u32 {
        let aggregated = subgoals
            .iter()
            .fold(A::IDENTITY, |acc, &g| A::combine(acc, self.or_cost(g)));
        aggregated.saturating_add(rule_cost)
    }

    fn update(
        &mut self,
        head: GroupIndex<GroundAtom<Fluent>>,
        cost: u32,
        witness: Witness,
    ) -> bool {
        let and_key = (witness.rule, witness.binding.clone());
        let and_entry = self.and_costs.entry(and_key).or_insert(UNREACHED);
        *and_entry = (*and_entry).min(cost);

        if cost < self.or_cost(head) {
            self.set_or_cost(head, cost);
            self.witnesses.insert(head, witness);
            true
        } else {
            false
        }
    }

    fn initialize(&mut self, head: GroupIndex<GroundAtom<Fluent>>, cost: u32) {
        self.set_or_cost(head, cost);
        self.witnesses.remove(&head);
    }

    fn cost(&self, head: GroupIndex<GroundAtom<Fluent>>) -> Option<u32> {
        match self.or_cost(head) {
            UNREACHED => None,
            c => Some(c),
        }
    }

    fn witness(&self, head: GroupIndex<GroundAtom<Fluent>>) -> Option<&Witness> {
        self.witnesses.get(&head)
    }

    fn clear(&mut self) {
        for group in &mut self.or_costs {
            group.fill(UNREACHED);
        }
        self.witnesses.clear();
        self.and_costs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(value: u32) -> GroupIndex<GroundAtom<Fluent>> {
        GroupIndex::new(0, value)
    }

    fn witness(rule: u32, subgoals: &[u32]) -> Witness {
        Witness {
            rule: Index::new(rule),
            binding: vec![],
            subgoals: subgoals.iter().map(|&v| head(v)).collect(),
        }
    }

    #[test]
    fn test_sum_aggregation() {
        let mut policy: CostAnnotation<SumAggregation> = CostAnnotation::new();
        policy.initialize(head(0), 0);
        policy.initialize(head(1), 0);
        // AND over two zero-cost sub-goals with rule cost 1.
        let cost = policy.and_cost(1, &[head(0), head(1)], 0);
        assert_eq!(cost, 1);
        assert!(policy.update(head(2), cost, witness(0, &[0, 1])));
        assert_eq!(policy.cost(head(2)), Some(1));

        // Sum counts both sub-goals.
        policy.update(head(3), policy.and_cost(2, &[head(2), head(2)], 0), witness(1, &[2]));
        assert_eq!(policy.cost(head(3)), Some(4));
    }

    #[test]
    fn test_max_aggregation() {
        let mut policy: CostAnnotation<MaxAggregation> = CostAnnotation::new();
        policy.initialize(head(0), 0);
        policy.update(head(1), policy.and_cost(1, &[head(0)], 0), witness(0, &[0]));
        policy.update(head(2), policy.and_cost(1, &[head(0), head(1)], 0), witness(1, &[0, 1]));
        // max(0, 1) + 1
        assert_eq!(policy.cost(head(2)), Some(2));
    }

    #[test]
    fn test_or_annotation_is_monotone() {
        let mut policy: CostAnnotation<SumAggregation> = CostAnnotation::new();
        assert!(policy.update(head(0), 5, witness(0, &[])));
        assert!(!policy.update(head(0), 7, witness(1, &[])));
        assert_eq!(policy.cost(head(0)), Some(5));
        // The witness of the losing offer is not recorded.
        assert_eq!(policy.witness(head(0)).unwrap().rule, Index::new(0));

        assert!(policy.update(head(0), 2, witness(2, &[])));
        assert_eq!(policy.cost(head(0)), Some(2));
        assert_eq!(policy.witness(head(0)).unwrap().rule, Index::new(2));
    }

    #[test]
    fn test_unreached_subgoal_saturates() {
        let policy: CostAnnotation<SumAggregation> = CostAnnotation::new();
        assert_eq!(policy.and_cost(1, &[head(9)], 0), UNREACHED);
    }

    #[test]
    fn test_seed_facts_have_no_witness() {
        let mut policy: CostAnnotation<SumAggregation> = CostAnnotation::new();
        policy.update(head(0), 3, witness(0, &[]));
        policy.initialize(head(0), 0);
        assert_eq!(policy.cost(head(0)), Some(0));
        assert!(policy.witness(head(0)).is_none());
    }

    #[test]
    fn test_and_annotation_recorded() {
        let mut policy: CostAnnotation<SumAggregation> = CostAnnotation::new();
        policy.update(head(0), 4, witness(3, &[]));
        assert_eq!(policy.and_annotation(Index::new(3), &[]), Some(4));
    }
}
