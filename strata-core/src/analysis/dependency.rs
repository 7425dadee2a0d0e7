//! Per-rule variable-dependency graph
//!
//! An undirected k x k upper-triangular adjacency where each cell carries
//! the literal and constraint labels that co-constrain the two parameters.
//! A cell with no labels marks a pair of independent parameters; the
//! delta-kPKC enumerator represents such cells implicitly.

use crate::ir::repository::{GroupedLookup, Lookup};
use crate::ir::{
    AtomData, ConditionData, Expression, ExpressionData, FactKind, Index, Repository,
};

/// A label naming the body member that co-constrains a parameter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellLabel {
    /// Position in the condition's static-literal list.
    StaticLiteral(u32),
    /// Position in the condition's fluent-literal list.
    FluentLiteral(u32),
    /// Position in the condition's constraint list.
    Constraint(u32),
}

/// Upper-triangular parameter-pair adjacency with label lists.
#[derive(Debug, Clone, Default)]
pub struct VariableDependencyGraph {
    k: usize,
    cells: Vec<Vec<CellLabel>>,
}

impl VariableDependencyGraph {
    /// A graph where every parameter pair is co-constrained; every
    /// adjacency cell becomes explicit.
    pub fn complete(k: usize) -> Self {
        let mut graph = VariableDependencyGraph {
            k,
            cells: vec![Vec::new(); k * k],
        };
        for i in 0..k as u32 {
            for j in i + 1..k as u32 {
                graph.cells[i as usize * k + j as usize].push(CellLabel::Constraint(0));
            }
        }
        graph
    }

    /// A graph with no co-constrained pairs; every adjacency cell stays
    /// implicit.
    pub fn empty(k: usize) -> Self {
        VariableDependencyGraph {
            k,
            cells: vec![Vec::new(); k * k],
        }
    }

    /// Number of parameters.
    #[inline]
    pub fn arity(&self) -> usize {
        self.k
    }

    /// Labels of the normalized cell `(min(i,j), max(i,j))`.
    pub fn cell(&self, i: u32, j: u32) -> &[CellLabel] {
        let (i, j) = if i <= j { (i, j) } else { (j, i) };
        &self.cells[i as usize * self.k + j as usize]
    }

    /// True if no body member co-constrains parameters `i` and `j`.
    pub fn is_independent(&self, i: u32, j: u32) -> bool {
        self.cell(i, j).is_empty()
    }

    fn push(&mut self, params: &[u32], label: CellLabel) {
        for (a, &i) in params.iter().enumerate() {
            for &j in &params[a + 1..] {
                let (i, j) = if i <= j { (i, j) } else { (j, i) };
                self.cells[i as usize * self.k + j as usize].push(label);
            }
        }
    }

    /// Build the dependency graph of a rule body.
    pub fn build(condition: &ConditionData, repository: &Repository) -> Self {
        let k = condition.variables.len();
        let mut graph = VariableDependencyGraph {
            k,
            cells: vec![Vec::new(); k * k],
        };

        let mut params = Vec::new();
        for (i, literal) in condition.static_literals.iter().enumerate() {
            let atom = repository.static_atoms.resolve(literal.atom);
            atom_parameters(atom, repository, &mut params);
            graph.push(&params, CellLabel::StaticLiteral(i as u32));
        }
        for (i, literal) in condition.fluent_literals.iter().enumerate() {
            let atom = repository.fluent_atoms.resolve(literal.atom);
            atom_parameters(atom, repository, &mut params);
            graph.push(&params, CellLabel::FluentLiteral(i as u32));
        }
        for (i, constraint) in condition.constraints.iter().enumerate() {
            params.clear();
            expression_parameters(constraint.lhs, repository, &mut params);
            expression_parameters(constraint.rhs, repository, &mut params);
            params.sort_unstable();
            params.dedup();
            graph.push(&params, CellLabel::Constraint(i as u32));
        }

        graph
    }
}

/// Collect the distinct parameter positions an atom mentions, sorted.
pub fn atom_parameters<T: FactKind>(
    atom: &AtomData<T>,
    repository: &Repository,
    out: &mut Vec<u32>,
) {
    out.clear();
    for term in &atom.terms {
        if let Some(v) = term.as_variable() {
            out.push(repository.variables.resolve(v).parameter);
        }
    }
    out.sort_unstable();
    out.dedup();
}

/// Collect the parameter positions an expression mentions (unsorted,
/// possibly duplicated; callers sort and dedup).
pub fn expression_parameters(
    expression: Index<Expression>,
    repository: &Repository,
    out: &mut Vec<u32>,
) {
    match repository.expressions.resolve(expression) {
        ExpressionData::Number(_) => {}
        ExpressionData::Negate(arg) => expression_parameters(*arg, repository, out),
        ExpressionData::Binary { lhs, rhs, .. } => {
            expression_parameters(*lhs, repository, out);
            expression_parameters(*rhs, repository, out);
        }
        ExpressionData::Multi { args, .. } => {
            for &arg in args {
                expression_parameters(arg, repository, out);
            }
        }
        ExpressionData::StaticTerm(ft) => {
            for term in &repository.static_fterms.resolve(*ft).terms {
                if let Some(v) = term.as_variable() {
                    out.push(repository.variables.resolve(v).parameter);
                }
            }
        }
        ExpressionData::FluentTerm(ft) => {
            for term in &repository.fluent_fterms.resolve(*ft).terms {
                if let Some(v) = term.as_variable() {
                    out.push(repository.variables.resolve(v).parameter);
                }
            }
        }
        ExpressionData::AuxiliaryTerm(ft) => {
            for term in &repository.auxiliary_fterms.resolve(*ft).terms {
                if let Some(v) = term.as_variable() {
                    out.push(repository.variables.resolve(v).parameter);
                }
            }
        }
    }
}
