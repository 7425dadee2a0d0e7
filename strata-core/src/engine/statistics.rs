//! Run statistics
//!
//! Plain counters only; wall-clock and peak-memory telemetry belong to the
//! outer search loop, not to the core.

/// Counters for one rule across a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleStatistics {
    /// Times the rule was scheduled.
    pub executions: u64,
    /// Cliques proposed by the enumerator.
    pub cliques: u64,
    /// Bindings that passed the full applicability check.
    pub applicable_bindings: u64,
    /// Bindings parked as pending.
    pub pending_parked: u64,
    /// Pending bindings re-checked.
    pub pending_rechecks: u64,
}

impl RuleStatistics {
    /// Fold another rule's counters into this one.
    pub fn merge(&mut self, other: &RuleStatistics) {
        self.executions += other.executions;
        self.cliques += other.cliques;
        self.applicable_bindings += other.applicable_bindings;
        self.pending_parked += other.pending_parked;
        self.pending_rechecks += other.pending_rechecks;
    }
}

/// Counters for a whole bottom-up run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramStatistics {
    /// Completed runs.
    pub executions: u64,
    /// Iterations across all strata.
    pub iterations: u64,
    /// Strata evaluated.
    pub strata: u64,
    /// Facts added to the global fact set.
    pub facts_derived: u64,
    /// Aggregate of all rule counters.
    pub rules: RuleStatistics,
}
