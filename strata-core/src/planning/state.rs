//! States
//!
//! A state carries the true fluent atoms and the defined fluent function
//! values. Derived atoms are never stored; they are recomputed from the
//! axioms whenever a consumer needs them. The atom space is shared with
//! the program repository, so membership is a group-indexed bitset.

use crate::engine::fact_sets::{FunctionFactSet, PredicateFactSet};
use crate::ir::{Fluent, GroundAtom, GroundFunctionTerm, GroupIndex, Index};

/// One planning state.
#[derive(Debug, Clone, Default)]
pub struct State {
    atoms: PredicateFactSet<Fluent>,
    values: FunctionFactSet<Fluent>,
}

impl State {
    /// The empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership of a fluent atom.
    #[inline]
    pub fn get_atom(&self, atom: GroupIndex<GroundAtom<Fluent>>) -> bool {
        self.atoms.contains(atom)
    }

    /// Set or clear a fluent atom.
    pub fn set_atom(&mut self, atom: GroupIndex<GroundAtom<Fluent>>, value: bool) {
        if value {
            self.atoms.insert(atom);
        } else {
            self.atoms.remove(atom);
        }
    }

    /// Value of a fluent function term; NaN if undefined.
    #[inline]
    pub fn get_value(&self, term: Index<GroundFunctionTerm<Fluent>>) -> f64 {
        self.values.get(term)
    }

    /// Assign a fluent function value.
    pub fn set_value(&mut self, term: Index<GroundFunctionTerm<Fluent>>, value: f64) {
        self.values.set(term, value);
    }

    /// Iterate over the true atoms.
    pub fn atoms(&self) -> impl Iterator<Item = GroupIndex<GroundAtom<Fluent>>> + '_ {
        self.atoms.iter()
    }

    /// Iterate over the defined function values.
    pub fn values(&self) -> impl Iterator<Item = (Index<GroundFunctionTerm<Fluent>>, f64)> + '_ {
        self.values.iter()
    }

    /// Number of true atoms.
    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.atoms().eq(other.atoms())
            && self
                .values()
                .map(|(i, v)| (i, v.to_bits()))
                .eq(other.values().map(|(i, v)| (i, v.to_bits())))
    }
}
impl Eq for State {}
