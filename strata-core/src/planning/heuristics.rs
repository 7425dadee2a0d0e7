//! Heuristics: h_max, h_add, h_ff
//!
//! Each heuristic runs the relaxed-planning-graph program from
//! `state ∪ static` with the annotation policy its semantics needs:
//! Max aggregation for h_max, Sum for h_add and h_ff. h_ff additionally
//! extracts a relaxed plan by walking the recorded witness DAG from the
//! goal atoms, collecting the ground actions behind the header atoms it
//! crosses. A goal atom without a witness after termination is a dead
//! end; the heuristic reports infinity.

use super::state::State;
use super::task::LiftedTask;
use crate::engine::applicability::{dynamically_valid, statically_valid};
use crate::engine::bottom_up;
use crate::engine::fact_sets::{FactSets, PredicateFactSet};
use crate::engine::workspace::ProgramWorkspace;
use crate::engine::{
    Aggregation, AnnotationPolicy, CostAnnotation, GoalTermination, MaxAggregation, SumAggregation,
};
use crate::error::Result;
use crate::ir::builder::Builders;
use crate::ir::repository::{GroupedLookup, Lookup};
use crate::ir::{Fluent, GroundAction, GroundActionData, GroundAtom, GroupIndex, Index};
use ahash::AHashSet;

/// The heuristic interface consumed by search.
pub trait Heuristic {
    /// Replace the goal condition.
    fn set_goal(&mut self, goal: Vec<GroupIndex<GroundAtom<Fluent>>>);

    /// Heuristic value of `state`; infinity on dead ends.
    fn evaluate(&mut self, task: &mut LiftedTask, state: &State) -> f64;

    /// Actions of the last relaxed plan that are applicable in the
    /// evaluated state. Empty for heuristics without plan extraction.
    fn preferred_actions(&self) -> &AHashSet<Index<GroundAction>>;
}

struct RpgRunner<A: Aggregation> {
    workspace: ProgramWorkspace,
    policy: CostAnnotation<A>,
    termination: GoalTermination,
    goal: Vec<GroupIndex<GroundAtom<Fluent>>>,
}

impl<A: Aggregation> RpgRunner<A> {
    fn new(task: &LiftedTask) -> Result<Self> {
        let workspace = ProgramWorkspace::new(
            task.rpg_program.clone(),
            &task.repository,
            &task.static_values,
            task.config.clone(),
        )?;
        Ok(RpgRunner {
            workspace,
            policy: CostAnnotation::new(),
            termination: GoalTermination::new(task.goal.iter().copied()),
            goal: task.goal.clone(),
        })
    }

    fn set_goal(&mut self, goal: Vec<GroupIndex<GroundAtom<Fluent>>>) {
        self.termination.set_goals(goal.iter().copied());
        self.goal = goal;
    }

    fn run(&mut self, task: &mut LiftedTask, state: &State) {
        let atoms: Vec<_> = state.atoms().collect();
        let values: Vec<_> = state.values().collect();
        self.workspace.prepare_run(
            &task.repository,
            &atoms,
            &values,
            &self.goal,
            &mut self.policy,
            &mut self.termination,
        );
        bottom_up::solve(
            &mut self.workspace,
            &mut task.repository,
            &mut self.policy,
            &mut self.termination,
        );
    }

    /// Aggregate the goal costs with `fold`; None on a dead end.
    fn goal_value(&self, fold: impl Fn(u32, u32) -> u32) -> Option<u32> {
        let mut acc = 0u32;
        for &goal in &self.goal {
            match self.policy.cost(goal) {
                Some(cost) => acc = fold(acc, cost),
                None => {
                    tracing::warn!(?goal, "goal atom unreached; dead end");
                    return None;
                }
            }
        }
        Some(acc)
    }
}

/// h_max: minimax cost over the goal atoms.
pub struct HMax {
    runner: RpgRunner<MaxAggregation>,
    preferred: AHashSet<Index<GroundAction>>,
}

impl HMax {
    /// Build the heuristic for `task`'s goal.
    pub fn new(task: &LiftedTask) -> Result<Self> {
        Ok(HMax {
            runner: RpgRunner::new(task)?,
            preferred: AHashSet::new(),
        })
    }
}

impl Heuristic for HMax {
    fn set_goal(&mut self, goal: Vec<GroupIndex<GroundAtom<Fluent>>>) {
        self.runner.set_goal(goal);
    }

    fn evaluate(&mut self, task: &mut LiftedTask, state: &State) -> f64 {
        if task.goal_unreachable {
            return f64::INFINITY;
        }
        self.runner.run(task, state);
        match self.runner.goal_value(u32::max) {
            Some(v) => v as f64,
            None => f64::INFINITY,
        }
    }

    fn preferred_actions(&self) -> &AHashSet<Index<GroundAction>> {
        &self.preferred
    }
}

/// h_add: summed cost over the goal atoms.
pub struct HAdd {
    runner: RpgRunner<SumAggregation>,
    preferred: AHashSet<Index<GroundAction>>,
}

impl HAdd {
    /// Build the heuristic for `task`'s goal.
    pub fn new(task: &LiftedTask) -> Result<Self> {
        Ok(HAdd {
            runner: RpgRunner::new(task)?,
            preferred: AHashSet::new(),
        })
    }
}

impl Heuristic for HAdd {
    fn set_goal(&mut self, goal: Vec<GroupIndex<GroundAtom<Fluent>>>) {
        self.runner.set_goal(goal);
    }

    fn evaluate(&mut self, task: &mut LiftedTask, state: &State) -> f64 {
        if task.goal_unreachable {
            return f64::INFINITY;
        }
        self.runner.run(task, state);
        match self.runner.goal_value(u32::saturating_add) {
            Some(v) => v as f64,
            None => f64::INFINITY,
        }
    }

    fn preferred_actions(&self) -> &AHashSet<Index<GroundAction>> {
        &self.preferred
    }
}

/// h_ff: length of a relaxed plan extracted from the witness DAG.
pub struct HFf {
    runner: RpgRunner<SumAggregation>,
    /// Static facts plus the evaluated state, for the preferred-action
    /// applicability test.
    state_facts: FactSets,
    markings: PredicateFactSet<Fluent>,
    relaxed_plan: AHashSet<Index<GroundAction>>,
    preferred: AHashSet<Index<GroundAction>>,
    builders: Builders,
}

impl HFf {
    /// Build the heuristic for `task`'s goal.
    pub fn new(task: &LiftedTask) -> Result<Self> {
        let runner = RpgRunner::<SumAggregation>::new(task)?;
        let mut state_facts = FactSets::new();
        state_facts.static_atoms = runner.workspace.facts.static_atoms.clone();
        state_facts.static_values = runner.workspace.facts.static_values.clone();
        Ok(HFf {
            runner,
            state_facts,
            markings: PredicateFactSet::new(),
            relaxed_plan: AHashSet::new(),
            preferred: AHashSet::new(),
            builders: Builders::new(),
        })
    }

    /// The ground actions of the last extracted relaxed plan.
    pub fn relaxed_plan(&self) -> &AHashSet<Index<GroundAction>> {
        &self.relaxed_plan
    }

    fn extract(&mut self, task: &mut LiftedTask, state: &State) {
        self.relaxed_plan.clear();
        self.preferred.clear();
        self.markings.clear();

        self.state_facts.clear_run();
        for atom in state.atoms() {
            self.state_facts.fluent_atoms.insert(atom);
        }
        for (index, value) in state.values() {
            self.state_facts.fluent_values.set(index, value);
        }

        let mut stack: Vec<GroupIndex<GroundAtom<Fluent>>> = self.runner.goal.clone();
        while let Some(atom) = stack.pop() {
            if !self.markings.insert(atom) {
                continue; // already marked
            }

            // Crossing a header atom records the action instance behind
            // it.
            if let Some(&position) = task.header_to_action.get(&atom.group) {
                let binding = task
                    .repository
                    .fluent_ground_atoms
                    .resolve(atom)
                    .objects
                    .clone();
                let schema = &task.actions[position as usize];
                let (action, _) =
                    task.repository.ground_actions.get_or_create(&GroundActionData {
                        action: position,
                        binding: binding.clone(),
                        cost: schema.cost,
                    });
                self.relaxed_plan.insert(action);

                let condition = task.repository.conditions.resolve(schema.precondition);
                let applicable = statically_valid(
                    condition,
                    &task.repository,
                    &binding,
                    &self.state_facts,
                    &mut self.builders,
                ) && dynamically_valid(
                    condition,
                    &task.repository,
                    &binding,
                    &self.state_facts,
                    &mut self.builders,
                )
                .is_some();
                if applicable {
                    self.preferred.insert(action);
                }
            }

            // Seed facts carry no witness; recursion stops there.
            if let Some(witness) = self.runner.policy.witness(atom) {
                stack.extend(witness.subgoals.iter().copied());
            }
        }
    }
}

impl Heuristic for HFf {
    fn set_goal(&mut self, goal: Vec<GroupIndex<GroundAtom<Fluent>>>) {
        self.runner.set_goal(goal);
    }

    fn evaluate(&mut self, task: &mut LiftedTask, state: &State) -> f64 {
        if task.goal_unreachable {
            return f64::INFINITY;
        }
        self.runner.run(task, state);
        if self.runner.goal_value(u32::saturating_add).is_none() {
            return f64::INFINITY;
        }
        self.extract(task, state);
        self.relaxed_plan.len() as f64
    }

    fn preferred_actions(&self) -> &AHashSet<Index<GroundAction>> {
        &self.preferred
    }
}
