//! Static program analysis
//!
//! Everything here runs once, before the first bottom-up iteration:
//! rule stratification, listener maps, variable-domain analysis, and the
//! per-rule variable-dependency graph.

pub mod dependency;
pub mod domains;
pub mod listeners;
pub mod stratification;

pub use dependency::VariableDependencyGraph;
pub use domains::Domains;
pub use listeners::{compute_listeners, ListenerMap};
pub use stratification::{stratify, RuleStrata};
