//! strata-core - Lifted classical-planning grounder
//!
//! This crate computes the reachable ground facts of a first-order planning
//! task by running a stratified, semi-naive, parallel bottom-up Datalog
//! evaluation. The body-matching step of every rule is solved as a
//! k-partite k-clique enumeration problem over a dynamically maintained
//! consistency graph.
//!
//! The three subsystems that carry the engine:
//!
//! - [`ir`]: an interned, arena-backed intermediate representation for
//!   first-order formulas, ground formulas, rules, and numeric expressions,
//!   with hash-consed repositories and parent/local overlay scoping.
//! - [`engine`]: the stratified semi-naive evaluator with per-rule
//!   workspaces, a cost-bucket scheduler, annotation policies for AND/OR
//!   witnesses, and the delta-kPKC clique enumerator.
//! - [`planning`]: the lifted-task glue - successor generation and the
//!   h_max / h_add / h_ff heuristics on top of the same engine.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod bitset;
pub mod engine;
pub mod error;
pub mod ir;
pub mod planning;

pub use bitset::DynamicBitset;
pub use engine::{EngineConfig, ProgramWorkspace};
pub use error::{GroundError, Result};
pub use ir::{Index, Repository};
pub use planning::{Heuristic, LiftedTask, State, SuccessorGenerator, TaskInput};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
