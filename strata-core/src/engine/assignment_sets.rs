//! Assignment sets
//!
//! Per-predicate summaries of the fact set: which `(position, object)`
//! singletons and `(position1, object1, position2, object2)` pairs appear
//! in some member atom. They answer "is this literal potentially
//! satisfiable under constraints involving only one or two parameters?" in
//! O(1), which is all the static consistency graph ever asks. Function
//! assignment sets store an interval bound per assignment instead of a
//! boolean.

use super::interval::Interval;
use crate::bitset::DynamicBitset;
use crate::ir::repository::Lookup;
use crate::ir::{
    FactKind, Fluent, GroundAtomData, GroundFunctionTermData, Index, Object, Repository, Static,
};
use ahash::AHashMap;
use std::marker::PhantomData;

/// Singleton and pair assignments of one predicate.
#[derive(Debug, Clone, Default)]
pub struct PredicateAssignmentSet<T> {
    arity: u32,
    num_objects: u32,
    singles: DynamicBitset,
    pairs: DynamicBitset,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FactKind> PredicateAssignmentSet<T> {
    /// Create an empty set for a predicate of `arity` over `num_objects`.
    pub fn new(arity: u32, num_objects: u32) -> Self {
        let span = (arity * num_objects) as usize;
        PredicateAssignmentSet {
            arity,
            num_objects,
            singles: DynamicBitset::new(span),
            pairs: DynamicBitset::new(span * span),
            _marker: PhantomData,
        }
    }

    #[inline]
    fn rank(&self, position: u32, object: Index<Object>) -> usize {
        debug_assert!(position < self.arity);
        debug_assert!(object.value() < self.num_objects);
        (position * self.num_objects + object.value()) as usize
    }

    /// Record every singleton and pair assignment the atom witnesses.
    pub fn insert(&mut self, atom: &GroundAtomData<T>) {
        for (i, &oi) in atom.objects.iter().enumerate() {
            self.singles.set(self.rank(i as u32, oi));
            for (j, &oj) in atom.objects.iter().enumerate().skip(i + 1) {
                let r = self.rank(i as u32, oi) * (self.arity * self.num_objects) as usize
                    + self.rank(j as u32, oj);
                self.pairs.set(r);
            }
        }
    }

    /// Does some member atom carry `object` at `position`?
    #[inline]
    pub fn contains_single(&self, position: u32, object: Index<Object>) -> bool {
        self.singles.test(self.rank(position, object))
    }

    /// Does some member atom carry both assignments? Positions need not be
    /// ordered.
    #[inline]
    pub fn contains_pair(
        &self,
        position1: u32,
        object1: Index<Object>,
        position2: u32,
        object2: Index<Object>,
    ) -> bool {
        let (p1, o1, p2, o2) = if position1 < position2 {
            (position1, object1, position2, object2)
        } else {
            (position2, object2, position1, object1)
        };
        let r = self.rank(p1, o1) * (self.arity * self.num_objects) as usize + self.rank(p2, o2);
        self.pairs.test(r)
    }

    /// Forget all assignments, keeping memory.
    pub fn clear(&mut self) {
        self.singles.clear();
        self.pairs.clear();
    }
}

/// One [`PredicateAssignmentSet`] per predicate group.
#[derive(Debug, Clone, Default)]
pub struct PredicateAssignmentSets<T> {
    sets: Vec<PredicateAssignmentSet<T>>,
}

impl<T: FactKind> PredicateAssignmentSets<T> {
    /// Create sets for `arities`, all over `num_objects`.
    pub fn new(arities: &[u32], num_objects: u32) -> Self {
        PredicateAssignmentSets {
            sets: arities
                .iter()
                .map(|&a| PredicateAssignmentSet::new(a, num_objects))
                .collect(),
        }
    }

    /// The set of one predicate group.
    #[inline]
    pub fn get(&self, group: u32) -> &PredicateAssignmentSet<T> {
        &self.sets[group as usize]
    }

    /// Record an atom of `group`.
    pub fn insert(&mut self, group: u32, atom: &GroundAtomData<T>) {
        self.sets[group as usize].insert(atom);
    }

    /// Forget all assignments.
    pub fn clear(&mut self) {
        for set in &mut self.sets {
            set.clear();
        }
    }
}

/// Interval bounds per assignment of one function.
#[derive(Debug, Clone)]
pub struct FunctionAssignmentSet<T> {
    singles: AHashMap<(u32, Index<Object>), Interval>,
    global: Interval,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FactKind> Default for FunctionAssignmentSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FactKind> FunctionAssignmentSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        FunctionAssignmentSet {
            singles: AHashMap::new(),
            global: Interval::EMPTY,
            _marker: PhantomData,
        }
    }

    /// Record a defined value of a ground term.
    pub fn insert(&mut self, fterm: &GroundFunctionTermData<T>, value: f64) {
        for (position, &object) in fterm.objects.iter().enumerate() {
            self.singles
                .entry((position as u32, object))
                .or_insert(Interval::EMPTY)
                .widen(value);
        }
        self.global.widen(value);
    }

    /// Bound on the value of a term carrying `object` at `position`;
    /// empty if no member term does.
    #[inline]
    pub fn single_bound(&self, position: u32, object: Index<Object>) -> Interval {
        self.singles
            .get(&(position, object))
            .copied()
            .unwrap_or(Interval::EMPTY)
    }

    /// Bound over all member terms; empty if the function is undefined
    /// everywhere.
    #[inline]
    pub fn global_bound(&self) -> Interval {
        self.global
    }

    /// Forget all bounds.
    pub fn clear(&mut self) {
        self.singles.clear();
        self.global = Interval::EMPTY;
    }
}

/// One [`FunctionAssignmentSet`] per function.
#[derive(Debug, Clone, Default)]
pub struct FunctionAssignmentSets<T> {
    sets: Vec<FunctionAssignmentSet<T>>,
}

impl<T: FactKind> FunctionAssignmentSets<T> {
    /// Create sets for `num_functions` functions.
    pub fn new(num_functions: usize) -> Self {
        FunctionAssignmentSets {
            sets: (0..num_functions).map(|_| FunctionAssignmentSet::new()).collect(),
        }
    }

    /// The set of one function.
    #[inline]
    pub fn get(&self, function: u32) -> &FunctionAssignmentSet<T> {
        &self.sets[function as usize]
    }

    /// Record a defined value.
    pub fn insert(&mut self, function: u32, fterm: &GroundFunctionTermData<T>, value: f64) {
        self.sets[function as usize].insert(fterm, value);
    }

    /// Forget all bounds.
    pub fn clear(&mut self) {
        for set in &mut self.sets {
            set.clear();
        }
    }
}

/// The assignment-set bundle of one run.
#[derive(Debug, Clone, Default)]
pub struct AssignmentSets {
    /// Static predicate assignments; fixed for the task.
    pub static_predicates: PredicateAssignmentSets<Static>,
    /// Fluent predicate assignments; grow with the fact set.
    pub fluent_predicates: PredicateAssignmentSets<Fluent>,
    /// Static function bounds; fixed for the task.
    pub static_functions: FunctionAssignmentSets<Static>,
    /// Fluent function bounds; fixed for the duration of one run.
    pub fluent_functions: FunctionAssignmentSets<Fluent>,
}

impl AssignmentSets {
    /// Size the bundle for `repository`'s predicates and functions.
    pub fn for_repository(repository: &Repository) -> Self {
        let num_objects = repository.objects.len() as u32;
        let static_arities: Vec<u32> = repository
            .static_predicates
            .iter()
            .map(|(_, p)| p.arity)
            .collect();
        let fluent_arities: Vec<u32> = repository
            .fluent_predicates
            .iter()
            .map(|(_, p)| p.arity)
            .collect();
        AssignmentSets {
            static_predicates: PredicateAssignmentSets::new(&static_arities, num_objects),
            fluent_predicates: PredicateAssignmentSets::new(&fluent_arities, num_objects),
            static_functions: FunctionAssignmentSets::new(repository.static_functions.len()),
            fluent_functions: FunctionAssignmentSets::new(repository.fluent_functions.len()),
        }
    }

    /// Empty the run-scoped sets, keeping the static side.
    pub fn clear_run(&mut self) {
        self.fluent_predicates.clear();
        self.fluent_functions.clear();
    }
}
