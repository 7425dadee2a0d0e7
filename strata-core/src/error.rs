//! Error types for the grounder

use thiserror::Error;

/// Main error type for grounding operations
#[derive(Error, Debug)]
pub enum GroundError {
    /// A fluent predicate transitively strictly-depends on itself
    #[error("Set of rules is not stratifiable.")]
    NotStratifiable,

    /// A rule references undefined predicates/functions or mismatched arities
    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    /// A predicate referenced by name does not exist
    #[error("Undefined predicate: {0}")]
    UndefinedPredicate(String),

    /// A function referenced by name does not exist
    #[error("Undefined function: {0}")]
    UndefinedFunction(String),

    /// An atom or function term has the wrong number of arguments
    #[error("Arity mismatch for {name}: expected {expected}, found {found}")]
    ArityMismatch {
        /// Predicate or function name
        name: String,
        /// Declared arity
        expected: usize,
        /// Number of arguments supplied
        found: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while reading a task or writing a plan
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed task input
    #[error("Task input error: {0}")]
    TaskInput(#[from] serde_json::Error),
}

/// Result type alias for grounding operations
pub type Result<T> = std::result::Result<T, GroundError>;
