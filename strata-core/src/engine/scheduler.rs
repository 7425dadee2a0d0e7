//! Rule scheduler
//!
//! Per stratum, tracks which rules must run in the next iteration. A rule
//! wakes iff one of the fluent predicates it listens on (positive body
//! literals) received a new atom during the previous iteration.

use crate::analysis::ListenerMap;
use crate::bitset::DynamicBitset;
use crate::ir::{Index, Rule};
use ahash::AHashSet;

/// Scheduler of one stratum.
#[derive(Debug, Clone)]
pub struct RuleScheduler {
    rules: Vec<Index<Rule>>,
    listeners: ListenerMap,
    active: AHashSet<Index<Rule>>,
    generated_predicates: DynamicBitset,
}

impl RuleScheduler {
    /// Create a scheduler for a stratum's rules and listener map.
    pub fn new(rules: Vec<Index<Rule>>, listeners: ListenerMap, num_fluent_predicates: usize) -> Self {
        RuleScheduler {
            rules,
            listeners,
            active: AHashSet::new(),
            generated_predicates: DynamicBitset::new(num_fluent_predicates),
        }
    }

    /// Wake every rule of the stratum.
    pub fn activate_all(&mut self) {
        self.active = self.rules.iter().copied().collect();
    }

    /// Forget the predicate marks of the previous iteration.
    pub fn on_start_iteration(&mut self) {
        self.generated_predicates.clear();
    }

    /// A new atom of `predicate` entered the fact set.
    pub fn on_generate(&mut self, predicate: u32) {
        self.generated_predicates.set(predicate as usize);
    }

    /// Recompute the active set from the listener map.
    pub fn on_finish_iteration(&mut self) {
        self.active.clear();
        for predicate in self.generated_predicates.iter_ones() {
            if let Some(listeners) = self.listeners.get(&(predicate as u32)) {
                self.active.extend(listeners.iter().copied());
            }
        }
    }

    /// The currently active rules, in stratum order.
    pub fn active_rules(&self) -> Vec<Index<Rule>> {
        self.rules
            .iter()
            .copied()
            .filter(|rule| self.active.contains(rule))
            .collect()
    }

    /// All rules of the stratum.
    pub fn rules(&self) -> &[Index<Rule>] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_wakeup() {
        let r0: Index<Rule> = Index::new(0);
        let r1: Index<Rule> = Index::new(1);
        let mut listeners = ListenerMap::new();
        listeners.insert(3, vec![r0]);
        listeners.insert(4, vec![r0, r1]);

        let mut scheduler = RuleScheduler::new(vec![r0, r1], listeners, 8);
        scheduler.activate_all();
        assert_eq!(scheduler.active_rules(), vec![r0, r1]);

        // Only predicate 3 generated: r0 wakes, r1 sleeps.
        scheduler.on_start_iteration();
        scheduler.on_generate(3);
        scheduler.on_finish_iteration();
        assert_eq!(scheduler.active_rules(), vec![r0]);

        // Nothing generated: everyone sleeps.
        scheduler.on_start_iteration();
        scheduler.on_finish_iteration();
        assert!(scheduler.active_rules().is_empty());

        // Predicate 4 wakes both.
        scheduler.on_start_iteration();
        scheduler.on_generate(4);
        scheduler.on_finish_iteration();
        assert_eq!(scheduler.active_rules(), vec![r0, r1]);
    }
}
