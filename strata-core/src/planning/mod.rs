//! Planning glue
//!
//! Wraps the Datalog engine as a lifted planning task: the parsed-task
//! input interface, translation of action schemas and axioms to rules,
//! states, successor generation, the h_max / h_add / h_ff heuristics, the
//! ground-task report, and plan serialization.

pub mod heuristics;
pub mod input;
pub mod plan;
pub mod report;
pub mod state;
pub mod successor;
pub mod task;

pub use heuristics::{HAdd, HFf, HMax, Heuristic};
pub use input::TaskInput;
pub use plan::{format_action, write_plan};
pub use report::{ground_task_report, GroundTaskReport};
pub use state::State;
pub use successor::SuccessorGenerator;
pub use task::LiftedTask;
