//! Ground-task report
//!
//! Runs the delete-relaxed closure from the initial state and counts what
//! it reaches: ground actions (derived header atoms), fluent atoms, and
//! derived atoms. The report is the core's summary of a grounded task.

use super::task::LiftedTask;
use crate::engine::bottom_up;
use crate::engine::workspace::ProgramWorkspace;
use crate::engine::{NoAnnotation, NoTermination};
use crate::error::Result;
use crate::ir::repository::Lookup;
use serde::Serialize;

/// Reachability counts of a grounded task.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct GroundTaskReport {
    /// Objects of the task.
    pub num_objects: usize,
    /// Action schemas.
    pub num_action_schemas: usize,
    /// Axiom rules.
    pub num_axioms: usize,
    /// Reachable ground actions.
    pub num_ground_actions: usize,
    /// Reachable fluent atoms (headers and derived excluded).
    pub num_fluent_atoms: usize,
    /// Reachable derived atoms.
    pub num_derived_atoms: usize,
}

/// Ground `task` from its initial state and report the counts.
pub fn ground_task_report(task: &mut LiftedTask) -> Result<GroundTaskReport> {
    let mut workspace = ProgramWorkspace::new(
        task.rpg_program.clone(),
        &task.repository,
        &task.static_values,
        task.config.clone(),
    )?;
    let mut policy = NoAnnotation;
    let mut termination = NoTermination;

    let atoms = task.init_atoms.clone();
    let values = task.init_values.clone();
    workspace.prepare_run(
        &task.repository,
        &atoms,
        &values,
        &task.goal,
        &mut policy,
        &mut termination,
    );
    bottom_up::solve(
        &mut workspace,
        &mut task.repository,
        &mut policy,
        &mut termination,
    );

    let mut report = GroundTaskReport {
        num_objects: task.repository.objects.len(),
        num_action_schemas: task.actions.len(),
        num_axioms: task.num_axioms,
        ..Default::default()
    };
    for atom in workspace.facts.fluent_atoms.iter() {
        let group = atom.group as usize;
        if task.fluent_is_header[group] {
            report.num_ground_actions += 1;
        } else if task.fluent_is_derived[group] {
            report.num_derived_atoms += 1;
        } else {
            report.num_fluent_atoms += 1;
        }
    }

    tracing::info!(
        ground_actions = report.num_ground_actions,
        fluent_atoms = report.num_fluent_atoms,
        derived_atoms = report.num_derived_atoms,
        "grounded task"
    );
    Ok(report)
}
