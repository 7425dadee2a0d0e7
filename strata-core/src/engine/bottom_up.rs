//! The bottom-up driver
//!
//! Per stratum: activate all rules, then loop. Each iteration runs the
//! active rules in parallel (every worker owns its rule workspace and an
//! overlay over the program repository), merges the produced heads
//! sequentially, advances the cost buckets, and inserts the next bucket
//! into the fact and assignment sets, waking listeners. Heads derived in
//! an iteration never enter the fact set before that iteration's merge
//! completes; within a stratum, atoms enter in cost-bucket order; across
//! strata, stratum s+1 sees the closed fact set of stratum s.

use super::annotation::AnnotationPolicy;
use super::assignment_sets::AssignmentSets;
use super::cost_buckets::CostBuckets;
use super::fact_sets::FactSets;
use super::scheduler::RuleScheduler;
use super::statistics::{ProgramStatistics, RuleStatistics};
use super::termination::TerminationPolicy;
use super::workspace::{HeadDerivation, ProgramWorkspace};
use crate::ir::repository::GroupedLookup;
use crate::ir::Repository;
use rayon::prelude::*;

/// Run the stratified bottom-up evaluation to completion.
pub fn solve<P: AnnotationPolicy, T: TerminationPolicy>(
    workspace: &mut ProgramWorkspace,
    repository: &mut Repository,
    policy: &mut P,
    termination: &mut T,
) {
    workspace.stats.executions += 1;

    for stratum in 0..workspace.strata.strata.len() {
        solve_stratum(workspace, repository, policy, termination, stratum);
        workspace.stats.strata += 1;
    }

    let mut aggregated = RuleStatistics::default();
    for rule_workspace in &workspace.rule_workspaces {
        aggregated.merge(&rule_workspace.stats);
    }
    workspace.stats.rules = aggregated;

    tracing::debug!(
        facts = workspace.facts.fluent_atoms.len(),
        iterations = workspace.stats.iterations,
        "bottom-up run finished"
    );
}

fn solve_stratum<P: AnnotationPolicy, T: TerminationPolicy>(
    workspace: &mut ProgramWorkspace,
    repository: &mut Repository,
    policy: &mut P,
    termination: &mut T,
    stratum: usize,
) {
    let ProgramWorkspace {
        schedulers,
        rule_workspaces,
        facts,
        assignment,
        cost_buckets,
        stats,
        config,
        rule_position,
        pool,
        ..
    } = workspace;

    let scheduler = &mut schedulers[stratum];
    scheduler.activate_all();
    // Costs restart per stratum; annotations persist.
    cost_buckets.clear();
    let intra_parallel = config.num_threads >= 2;

    loop {
        // The main iteration loop of this stratum.
        loop {
            // Stop once the minimum cost of every goal atom is proven.
            if termination.check() {
                return;
            }

            scheduler.on_start_iteration();
            let positions: Vec<usize> = scheduler
                .active_rules()
                .iter()
                .map(|rule| rule_position[rule])
                .collect();
            let current_cost = cost_buckets.current_cost();
            tracing::trace!(stratum, active = positions.len(), current_cost, "iteration");

            // Parallel phase: pending re-checks and delta-kPKC generation
            // per active rule. Workspaces are disjoint; the repository,
            // fact sets, and annotations are shared read-only.
            {
                let repository: &Repository = repository;
                let facts: &FactSets = facts;
                let assignment: &AssignmentSets = assignment;
                let policy: &P = policy;
                let mut active_mask = vec![false; rule_workspaces.len()];
                for &position in &positions {
                    active_mask[position] = true;
                }
                pool.install(|| {
                    rule_workspaces
                        .par_iter_mut()
                        .enumerate()
                        .for_each(|(position, rule_workspace)| {
                            if active_mask[position] {
                                rule_workspace.execute_iteration(
                                    repository,
                                    facts,
                                    assignment,
                                    policy,
                                    current_cost,
                                    intra_parallel,
                                );
                            }
                        });
                });
            }

            facts.delta_atoms.clear();
            cost_buckets.clear_current();

            // Sequential merge: intern heads into the program repository,
            // update annotations, queue improvements.
            for &position in &positions {
                let heads = std::mem::take(&mut rule_workspaces[position].heads);
                merge_heads(heads, repository, facts, policy, cost_buckets);
            }

            if !cost_buckets.advance_to_next_nonempty() {
                break;
            }
            emit_current_bucket(
                cost_buckets,
                repository,
                facts,
                assignment,
                scheduler,
                termination,
                stats,
            );
            scheduler.on_finish_iteration();
            stats.iterations += 1;
        }

        if termination.check() {
            return;
        }

        // End-of-stratum sweep: re-check every rule's pending bindings
        // against the final fact sets. Anything that fires re-enters the
        // main loop through the scheduler.
        scheduler.on_start_iteration();
        let current_cost = cost_buckets.current_cost();
        let stratum_positions: Vec<usize> = scheduler
            .rules()
            .iter()
            .map(|rule| rule_position[rule])
            .collect();
        for &position in &stratum_positions {
            let rule_workspace = &mut rule_workspaces[position];
            if rule_workspace.num_pending() == 0 {
                continue;
            }
            rule_workspace.recheck_pending(repository, facts, policy, current_cost);
            let heads = std::mem::take(&mut rule_workspace.heads);
            merge_heads(heads, repository, facts, policy, cost_buckets);
        }
        if !cost_buckets.advance_to_next_nonempty() {
            return;
        }
        emit_current_bucket(
            cost_buckets,
            repository,
            facts,
            assignment,
            scheduler,
            termination,
            stats,
        );
        scheduler.on_finish_iteration();
        stats.iterations += 1;
    }
}

fn merge_heads<P: AnnotationPolicy>(
    heads: Vec<HeadDerivation>,
    repository: &mut Repository,
    facts: &FactSets,
    policy: &mut P,
    cost_buckets: &mut CostBuckets,
) {
    for head in heads {
        let group = head.data.predicate().value();
        let (index, _) = repository.fluent_ground_atoms.get_or_create(group, &head.data);
        if facts.fluent_atoms.contains(index) {
            continue; // optimal cost proven
        }
        if policy.update(index, head.cost, head.witness) {
            cost_buckets.push(head.cost, index);
        }
    }
}

fn emit_current_bucket<T: TerminationPolicy>(
    cost_buckets: &mut CostBuckets,
    repository: &Repository,
    facts: &mut FactSets,
    assignment: &mut AssignmentSets,
    scheduler: &mut RuleScheduler,
    termination: &mut T,
    stats: &mut ProgramStatistics,
) {
    let bucket: Vec<_> = cost_buckets.current_bucket().to_vec();
    for head in bucket {
        if !facts.fluent_atoms.insert(head) {
            continue; // stale re-bucketed entry
        }
        facts.delta_atoms.insert(head);
        let data = repository.fluent_ground_atoms.resolve(head);
        assignment.fluent_predicates.insert(head.group, data);
        scheduler.on_generate(head.group);
        termination.achieve(head);
        stats.facts_derived += 1;
    }
}
