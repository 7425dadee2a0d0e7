//! Successor generation
//!
//! Couples the successor program (axiom and header rules only) with the
//! engine: seed the fluent fact set from a state, run a plain closure, and
//! every derived header atom names an applicable ground action. Applying
//! an action evaluates its conditional effects against the state plus its
//! derived closure and produces the successor state.

use super::state::State;
use super::task::{ActionSchema, LiftedTask};
use crate::engine::applicability::{dynamically_valid, evaluate_expression, statically_valid};
use crate::engine::bottom_up;
use crate::engine::fact_sets::FactSets;
use crate::engine::workspace::ProgramWorkspace;
use crate::engine::{NoAnnotation, NoTermination};
use crate::error::Result;
use crate::ir::ground::{ground_atom, ground_fterm};
use crate::ir::repository::{GroupedLookup, Lookup};
use crate::ir::{GroundAction, GroundActionData, Index, Object, Repository};

/// Streams the applicable ground actions of a state and their successor
/// states.
pub struct SuccessorGenerator {
    workspace: ProgramWorkspace,
    policy: NoAnnotation,
    termination: NoTermination,
    builders: crate::ir::builder::Builders,
}

impl SuccessorGenerator {
    /// Build a generator for `task`.
    pub fn new(task: &LiftedTask) -> Result<Self> {
        let workspace = ProgramWorkspace::new(
            task.successor_program.clone(),
            &task.repository,
            &task.static_values,
            task.config.clone(),
        )?;
        Ok(SuccessorGenerator {
            workspace,
            policy: NoAnnotation,
            termination: NoTermination,
            builders: crate::ir::builder::Builders::new(),
        })
    }

    /// All `(action, successor)` pairs of `state`, in schema order and
    /// header numbering order within a schema.
    pub fn get_labeled_successor_nodes(
        &mut self,
        task: &mut LiftedTask,
        state: &State,
    ) -> Vec<(Index<GroundAction>, State)> {
        let atoms: Vec<_> = state.atoms().collect();
        let values: Vec<_> = state.values().collect();
        self.workspace.prepare_run(
            &task.repository,
            &atoms,
            &values,
            &[],
            &mut self.policy,
            &mut self.termination,
        );
        bottom_up::solve(
            &mut self.workspace,
            &mut task.repository,
            &mut self.policy,
            &mut self.termination,
        );

        // Headers derived by the closure are exactly the applicable
        // ground actions.
        let mut applicable: Vec<(u32, Vec<Index<Object>>)> = Vec::new();
        for (position, schema) in task.actions.iter().enumerate() {
            for (index, data) in task.repository.fluent_ground_atoms.iter_group(schema.header) {
                if self.workspace.facts.fluent_atoms.contains(index) {
                    applicable.push((position as u32, data.objects.clone()));
                }
            }
        }

        let mut out = Vec::with_capacity(applicable.len());
        for (position, binding) in applicable {
            let schema = &task.actions[position as usize];
            let (action, _) = task.repository.ground_actions.get_or_create(&GroundActionData {
                action: position,
                binding: binding.clone(),
                cost: schema.cost,
            });
            let successor = apply_action(
                schema,
                &mut task.repository,
                &self.workspace.facts,
                &binding,
                state,
                &mut self.builders,
            );
            out.push((action, successor));
        }
        out
    }
}

/// Apply `schema` under `binding` to `state`. Effect conditions are
/// evaluated against `facts`, the state's closure under the axioms.
fn apply_action(
    schema: &ActionSchema,
    repository: &mut Repository,
    facts: &FactSets,
    binding: &[Index<Object>],
    state: &State,
    builders: &mut crate::ir::builder::Builders,
) -> State {
    let mut successor = state.clone();

    for effect in &schema.effects {
        {
            let condition = repository.conditions.resolve(effect.condition);
            if !statically_valid(condition, repository, binding, facts, builders)
                || dynamically_valid(condition, repository, binding, facts, builders).is_none()
            {
                continue;
            }
        }

        // Deletes before adds, per the usual effect semantics.
        for &atom in &effect.del {
            let data = repository.fluent_atoms.resolve(atom).clone();
            let (index, _) = ground_atom(
                &data,
                &repository.variables,
                binding,
                builders.fluent_atom(),
                &mut repository.fluent_ground_atoms,
            );
            successor.set_atom(index, false);
        }
        for &atom in &effect.add {
            let data = repository.fluent_atoms.resolve(atom).clone();
            let (index, _) = ground_atom(
                &data,
                &repository.variables,
                binding,
                builders.fluent_atom(),
                &mut repository.fluent_ground_atoms,
            );
            successor.set_atom(index, true);
        }
        for numeric in &effect.numeric {
            let value = evaluate_expression(numeric.value, repository, binding, facts, builders);
            let data = repository.fluent_fterms.resolve(numeric.fterm).clone();
            let (index, _) = ground_fterm(
                &data,
                &repository.variables,
                binding,
                builders.fluent_fterm(),
                &mut repository.fluent_ground_fterms,
            );
            let updated = numeric.op.apply(state.get_value(index), value);
            // A NaN update marks the numeric effect inapplicable.
            if !updated.is_nan() {
                successor.set_value(index, updated);
            }
        }
    }

    successor
}
