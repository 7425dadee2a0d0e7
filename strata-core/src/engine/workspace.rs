//! Per-rule and per-program workspaces
//!
//! A [`RuleWorkspace`] owns everything one rule needs across iterations:
//! its static consistency graph, the dynamic graph with activation masks,
//! the clique walk buffers, pending bindings, and scratch builders. During
//! the parallel phase each workspace is exclusively owned by its worker;
//! heads are interned into an iteration-scoped overlay over the program
//! repository and handed to the sequential merge as plain data.

use super::annotation::{AnnotationPolicy, Witness};
use super::applicability::{dynamically_valid, statically_valid};
use super::assignment_sets::AssignmentSets;
use super::consistency_graph::{DeltaActivation, StaticConsistencyGraph};
use super::cost_buckets::CostBuckets;
use super::fact_sets::FactSets;
use super::kpkc::{enumerate_new_cliques, CliqueWorkspace, DeltaGraph};
use super::scheduler::RuleScheduler;
use super::statistics::{ProgramStatistics, RuleStatistics};
use super::termination::TerminationPolicy;
use crate::analysis::{compute_listeners, stratify};
use crate::analysis::domains::compute_domains;
use crate::error::{GroundError, Result};
use crate::ir::builder::Builders;
use crate::ir::ground::{ground_atom, ground_atom_into};
use crate::ir::repository::{GroupedInterner, GroupedLookup, GroupedOverlay, Lookup};
use crate::ir::{
    Atom, AtomData, Condition, ConditionData, Fluent, GroundAtom, GroundAtomData,
    GroundFunctionTerm, GroupIndex, Index, Object, Program, Repository, Rule, Static,
};
use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use serde::Deserialize;

/// Engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Worker threads for the per-rule enumeration phase.
    #[serde(default = "default_threads")]
    pub num_threads: usize,
}

fn default_threads() -> usize {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { num_threads: 1 }
    }
}

/// Clique batches below this size are processed on the rule's own worker.
const INTRA_RULE_THRESHOLD: usize = 1024;
/// Cliques per intra-rule batch.
const INTRA_RULE_GRAIN: usize = 256;

type HeadOverlay<'p> = GroupedOverlay<
    'p,
    GroupedInterner<GroundAtom<Fluent>, GroundAtomData<Fluent>>,
    GroundAtom<Fluent>,
    GroundAtomData<Fluent>,
>;

/// A head produced by one rule in one iteration, ready for the merge.
#[derive(Debug, Clone)]
pub struct HeadDerivation {
    /// The ground head.
    pub data: GroundAtomData<Fluent>,
    /// AND-node cost of the producing application.
    pub cost: u32,
    /// The application itself.
    pub witness: Witness,
}

enum Verdict {
    /// Head already proven or the static body failed.
    Skip,
    /// Statically fine, dynamically premature: park the binding.
    Pend(Vec<Index<Object>>),
    /// Applicable right now.
    Derive {
        binding: Vec<Index<Object>>,
        subgoals: Vec<GroupIndex<GroundAtom<Fluent>>>,
    },
}

fn judge_binding(
    condition: &ConditionData,
    head_atom: &AtomData<Fluent>,
    repository: &Repository,
    facts: &FactSets,
    binding: &[Index<Object>],
    builders: &mut Builders,
) -> Verdict {
    // A head already in the fact set carries its proven optimal cost;
    // nothing to add.
    let scratch = builders.fluent_atom();
    ground_atom_into(head_atom, &repository.variables, binding, scratch);
    if let Some(index) = repository
        .fluent_ground_atoms
        .find(head_atom.predicate.value(), scratch)
    {
        if facts.fluent_atoms.contains(index) {
            return Verdict::Skip;
        }
    }

    if !statically_valid(condition, repository, binding, facts, builders) {
        return Verdict::Skip;
    }

    // A binding can pass the graph yet fail the dynamic body (a nullary
    // precondition, a higher-arity literal). It may become applicable
    // later without any new kPKC vertex or edge, so it must be parked and
    // re-checked, not dropped.
    match dynamically_valid(condition, repository, binding, facts, builders) {
        Some(subgoals) => Verdict::Derive {
            binding: binding.to_vec(),
            subgoals,
        },
        None => Verdict::Pend(binding.to_vec()),
    }
}

/// Everything one rule owns across a run.
pub struct RuleWorkspace {
    /// The rule.
    pub rule: Index<Rule>,
    /// Its body condition.
    pub body: Index<Condition>,
    /// Its head atom.
    pub head: GroupIndex<Atom<Fluent>>,
    /// Its cost.
    pub cost: u32,
    /// Number of parameters.
    pub arity: usize,
    /// The static consistency graph.
    pub graph: StaticConsistencyGraph,
    /// Activation masks over the static graph.
    pub activation: DeltaActivation,
    /// The dynamic graph fed to the enumerator.
    pub delta: DeltaGraph,
    /// Per-run statistics.
    pub stats: RuleStatistics,
    clique_workspace: CliqueWorkspace,
    cliques: Vec<u32>,
    pending: AHashSet<Vec<Index<Object>>>,
    pub(crate) heads: Vec<HeadDerivation>,
    head_slots: AHashMap<GroupIndex<GroundAtom<Fluent>>, usize>,
    builders: Builders,
}

impl RuleWorkspace {
    /// Build the workspace of `rule` over its analysis domains.
    pub fn new(
        rule: Index<Rule>,
        repository: &Repository,
        parameter_domains: &[Vec<Index<Object>>],
        facts: &FactSets,
        assignment: &AssignmentSets,
    ) -> Self {
        let rule_data = repository.rules.resolve(rule);
        let condition = repository.conditions.resolve(rule_data.body);
        let mut builders = Builders::new();
        let graph = StaticConsistencyGraph::build(
            condition,
            repository,
            parameter_domains,
            facts,
            assignment,
            &mut builders,
        );
        let activation = DeltaActivation::new(&graph);
        let delta = DeltaGraph::new(&graph.layout, &graph.dependency);
        let clique_workspace = CliqueWorkspace::new(&graph.layout);

        RuleWorkspace {
            rule,
            body: rule_data.body,
            head: GroupIndex::new(rule_data.head.group, rule_data.head.value),
            cost: rule_data.cost,
            arity: condition.variables.len(),
            graph,
            activation,
            delta,
            stats: RuleStatistics::default(),
            clique_workspace,
            cliques: Vec::new(),
            pending: AHashSet::new(),
            heads: Vec::new(),
            head_slots: AHashMap::new(),
            builders,
        }
    }

    /// Back to the pre-run state: empty dynamic graph, no pending
    /// bindings.
    pub fn reset_run(&mut self) {
        self.activation.reset();
        self.delta.reset(&self.graph.layout);
        self.pending.clear();
        self.heads.clear();
        self.head_slots.clear();
        self.cliques.clear();
    }

    /// Number of pending bindings.
    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    /// One scheduled iteration: re-check pending bindings, refresh the
    /// dynamic graph, enumerate the new cliques, and verify each proposed
    /// binding. Results land in the iteration head list.
    pub fn execute_iteration<P: AnnotationPolicy>(
        &mut self,
        repository: &Repository,
        facts: &FactSets,
        assignment: &AssignmentSets,
        policy: &P,
        current_cost: u32,
        intra_parallel: bool,
    ) {
        self.stats.executions += 1;
        self.heads.clear();
        self.head_slots.clear();

        let mut overlay = GroupedOverlay::new(&repository.fluent_ground_atoms);

        self.recheck_pending_into(&mut overlay, repository, facts, policy, current_cost);

        if self.arity == 0 {
            // Nullary rule: no graph; fire iff the whole body holds.
            let condition = repository.conditions.resolve(self.body);
            let head_atom = repository.fluent_atoms.resolve(self.head);
            let verdict =
                judge_binding(condition, head_atom, repository, facts, &[], &mut self.builders);
            self.apply_verdict(verdict, &mut overlay, repository, policy, current_cost);
            return;
        }

        self.activation.advance(
            &self.graph,
            &mut self.delta,
            repository,
            facts,
            assignment,
            &mut self.builders,
        );
        self.cliques.clear();
        enumerate_new_cliques(
            &self.graph.layout,
            &self.delta,
            &mut self.clique_workspace,
            &mut self.cliques,
        );
        let num_cliques = self.cliques.len() / self.arity;
        self.stats.cliques += num_cliques as u64;

        let cliques = std::mem::take(&mut self.cliques);
        if intra_parallel && num_cliques >= INTRA_RULE_THRESHOLD {
            let condition = repository.conditions.resolve(self.body);
            let head_atom = repository.fluent_atoms.resolve(self.head);
            let arity = self.arity;
            let vertices = &self.graph.vertices;
            let verdicts: Vec<Verdict> = cliques
                .par_chunks(arity * INTRA_RULE_GRAIN)
                .flat_map_iter(|batch| {
                    let mut builders = Builders::new();
                    let mut out = Vec::with_capacity(batch.len() / arity);
                    for clique in batch.chunks_exact(arity) {
                        let binding: Vec<Index<Object>> = clique
                            .iter()
                            .map(|&v| vertices[v as usize].object)
                            .collect();
                        out.push(judge_binding(
                            condition,
                            head_atom,
                            repository,
                            facts,
                            &binding,
                            &mut builders,
                        ));
                    }
                    out
                })
                .collect();
            for verdict in verdicts {
                self.apply_verdict(verdict, &mut overlay, repository, policy, current_cost);
            }
        } else {
            let mut binding = Vec::with_capacity(self.arity);
            for start in (0..cliques.len()).step_by(self.arity) {
                binding.clear();
                binding.extend(
                    cliques[start..start + self.arity]
                        .iter()
                        .map(|&v| self.graph.vertices[v as usize].object),
                );
                let condition = repository.conditions.resolve(self.body);
                let head_atom = repository.fluent_atoms.resolve(self.head);
                let verdict = judge_binding(
                    condition,
                    head_atom,
                    repository,
                    facts,
                    &binding,
                    &mut self.builders,
                );
                self.apply_verdict(verdict, &mut overlay, repository, policy, current_cost);
            }
        }
        self.cliques = cliques;
    }

    /// Re-check the pending bindings only, filling the head list. Used by
    /// the driver's end-of-stratum pass.
    pub fn recheck_pending<P: AnnotationPolicy>(
        &mut self,
        repository: &Repository,
        facts: &FactSets,
        policy: &P,
        current_cost: u32,
    ) {
        self.heads.clear();
        self.head_slots.clear();
        let mut overlay = GroupedOverlay::new(&repository.fluent_ground_atoms);
        self.recheck_pending_into(&mut overlay, repository, facts, policy, current_cost);
    }

    fn recheck_pending_into<P: AnnotationPolicy>(
        &mut self,
        overlay: &mut HeadOverlay<'_>,
        repository: &Repository,
        facts: &FactSets,
        policy: &P,
        current_cost: u32,
    ) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        let condition = repository.conditions.resolve(self.body);
        let head_atom = repository.fluent_atoms.resolve(self.head);

        for binding in pending {
            self.stats.pending_rechecks += 1;

            let scratch = self.builders.fluent_atom();
            ground_atom_into(head_atom, &repository.variables, &binding, scratch);
            let proven = repository
                .fluent_ground_atoms
                .find(head_atom.predicate.value(), scratch)
                .is_some_and(|index| facts.fluent_atoms.contains(index));
            if proven {
                continue;
            }

            match dynamically_valid(condition, repository, &binding, facts, &mut self.builders) {
                Some(subgoals) => {
                    let verdict = Verdict::Derive { binding, subgoals };
                    self.apply_verdict(verdict, overlay, repository, policy, current_cost);
                }
                None => {
                    self.pending.insert(binding);
                }
            }
        }
    }

    fn apply_verdict<P: AnnotationPolicy>(
        &mut self,
        verdict: Verdict,
        overlay: &mut HeadOverlay<'_>,
        repository: &Repository,
        policy: &P,
        current_cost: u32,
    ) {
        match verdict {
            Verdict::Skip => {}
            Verdict::Pend(binding) => {
                if self.pending.insert(binding) {
                    self.stats.pending_parked += 1;
                }
            }
            Verdict::Derive { binding, subgoals } => {
                self.stats.applicable_bindings += 1;
                let head_atom = repository.fluent_atoms.resolve(self.head);
                let (index, _) = ground_atom(
                    head_atom,
                    &repository.variables,
                    &binding,
                    self.builders.fluent_atom(),
                    overlay,
                );
                let cost = policy.and_cost(self.cost, &subgoals, current_cost);
                let witness = Witness {
                    rule: self.rule,
                    binding,
                    subgoals,
                };
                match self.head_slots.entry(index) {
                    std::collections::hash_map::Entry::Occupied(entry) => {
                        let slot = *entry.get();
                        if cost < self.heads[slot].cost {
                            self.heads[slot].cost = cost;
                            self.heads[slot].witness = witness;
                        }
                    }
                    std::collections::hash_map::Entry::Vacant(entry) => {
                        entry.insert(self.heads.len());
                        self.heads.push(HeadDerivation {
                            data: overlay.resolve(index).clone(),
                            cost,
                            witness,
                        });
                    }
                }
            }
        }
    }
}

/// The workspace of one program: rule workspaces, fact and assignment
/// sets, cost buckets, schedulers, and the thread pool.
pub struct ProgramWorkspace {
    /// The program.
    pub program: Program,
    /// Rule strata, bottom first.
    pub strata: crate::analysis::RuleStrata,
    /// One scheduler per stratum.
    pub schedulers: Vec<RuleScheduler>,
    /// One workspace per program rule, in program order.
    pub rule_workspaces: Vec<RuleWorkspace>,
    /// The run's fact sets.
    pub facts: FactSets,
    /// The run's assignment sets.
    pub assignment: AssignmentSets,
    /// The cost-bucket queue.
    pub cost_buckets: CostBuckets,
    /// Run statistics.
    pub stats: ProgramStatistics,
    /// Configuration.
    pub config: EngineConfig,
    pub(crate) rule_position: AHashMap<Index<Rule>, usize>,
    pub(crate) pool: rayon::ThreadPool,
}

impl ProgramWorkspace {
    /// Stratify `program`, run the domain analysis, seed the static fact
    /// and assignment sets, and build one workspace per rule.
    pub fn new(
        program: Program,
        repository: &Repository,
        static_values: &[(Index<GroundFunctionTerm<Static>>, f64)],
        config: EngineConfig,
    ) -> Result<Self> {
        let strata = stratify(&program, repository)?;
        let listeners = compute_listeners(&strata, repository);
        let num_fluent = repository.fluent_predicates.len();

        let schedulers = strata
            .strata
            .iter()
            .zip(listeners)
            .map(|(rules, map)| RuleScheduler::new(rules.clone(), map, num_fluent))
            .collect();

        let mut facts = FactSets::new();
        let mut assignment = AssignmentSets::for_repository(repository);
        for group in 0..repository.static_ground_atoms.num_groups() as u32 {
            for (index, data) in repository.static_ground_atoms.iter_group(group) {
                facts.static_atoms.insert(index);
                assignment.static_predicates.insert(group, data);
            }
        }
        for &(index, value) in static_values {
            facts.static_values.set(index, value);
            let data = repository.static_ground_fterms.resolve(index);
            if let Some(function) = data.function {
                assignment
                    .static_functions
                    .insert(function.value(), data, value);
            }
        }

        let domains = compute_domains(&program, repository);
        let mut rule_workspaces = Vec::with_capacity(program.rules.len());
        let mut rule_position = AHashMap::new();
        for (i, &rule) in program.rules.iter().enumerate() {
            rule_position.insert(rule, i);
            rule_workspaces.push(RuleWorkspace::new(
                rule,
                repository,
                &domains.rule_parameters[i],
                &facts,
                &assignment,
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads.max(1))
            .build()
            .map_err(|e| GroundError::Config(format!("thread pool: {e}")))?;

        Ok(ProgramWorkspace {
            program,
            strata,
            schedulers,
            rule_workspaces,
            facts,
            assignment,
            cost_buckets: CostBuckets::new(),
            stats: ProgramStatistics::default(),
            config,
            rule_position,
            pool,
        })
    }

    /// Position of `rule` in the workspace vectors.
    pub fn rule_position(&self, rule: Index<Rule>) -> usize {
        self.rule_position[&rule]
    }

    /// Reset run state and seed the run's fluent facts, function values,
    /// and goal. Seed atoms get a zero OR-annotation and count as
    /// achieved for the termination policy.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare_run<P: AnnotationPolicy, T: TerminationPolicy>(
        &mut self,
        repository: &Repository,
        atoms: &[GroupIndex<GroundAtom<Fluent>>],
        values: &[(Index<GroundFunctionTerm<Fluent>>, f64)],
        goals: &[GroupIndex<GroundAtom<Fluent>>],
        policy: &mut P,
        termination: &mut T,
    ) {
        self.facts.clear_run();
        self.assignment.clear_run();
        self.cost_buckets.clear();
        policy.clear();
        termination.clear();
        for workspace in &mut self.rule_workspaces {
            workspace.reset_run();
        }

        for &atom in atoms {
            if !self.facts.fluent_atoms.insert(atom) {
                continue;
            }
            self.facts.delta_atoms.insert(atom);
            let data = repository.fluent_ground_atoms.resolve(atom);
            self.assignment.fluent_predicates.insert(atom.group, data);
            policy.initialize(atom, 0);
            termination.achieve(atom);
        }
        for &(index, value) in values {
            self.facts.fluent_values.set(index, value);
            let data = repository.fluent_ground_fterms.resolve(index);
            if let Some(function) = data.function {
                self.assignment
                    .fluent_functions
                    .insert(function.value(), data, value);
            }
        }
        for &goal in goals {
            self.facts.goal_atoms.insert(goal);
        }
    }
}
