//! The stratified semi-naive bottom-up Datalog engine
//!
//! Control flow: build the program IR, stratify and analyze domains, build
//! one static consistency graph per rule, construct a [`ProgramWorkspace`],
//! then run [`bottom_up::solve`]. Each iteration asks every scheduled rule
//! for the new variable bindings introduced by the latest fact layer (the
//! delta-kPKC step), verifies them against the full rule body, and merges
//! the surviving heads into the global fact set in cost-bucket order.

pub mod annotation;
pub mod applicability;
pub mod assignment_sets;
pub mod bottom_up;
pub mod consistency_graph;
pub mod cost_buckets;
pub mod fact_sets;
pub mod interval;
pub mod kpkc;
pub mod scheduler;
pub mod statistics;
pub mod termination;
pub mod workspace;

pub use annotation::{
    Aggregation, AnnotationPolicy, CostAnnotation, MaxAggregation, NoAnnotation, SumAggregation,
    Witness,
};
pub use assignment_sets::AssignmentSets;
pub use cost_buckets::CostBuckets;
pub use fact_sets::FactSets;
pub use statistics::{ProgramStatistics, RuleStatistics};
pub use termination::{GoalTermination, NoTermination, TerminationPolicy};
pub use workspace::{EngineConfig, ProgramWorkspace};
