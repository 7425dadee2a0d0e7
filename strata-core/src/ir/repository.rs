//! Hash-consed arenas and overlay scoping
//!
//! An [`Interner`] maps canonicalized node data to a dense index and back.
//! A [`GroupedInterner`] keeps one interner per predicate group so every
//! group is independently densely numbered. An [`Overlay`] wraps a
//! read-only parent and a writable local interner: lookups consult the
//! parent first, inserts always go to the local side, and local indices
//! continue the parent's numbering. Overlays nest, which is how per-worker
//! scopes stack on top of the program repository.

use super::{
    Atom, AtomData, ConditionData, ExpressionData, Function, FunctionData, FunctionTerm,
    FunctionTermData, GroundAction, GroundActionData, GroundAtom, GroundAtomData,
    GroundFunctionTerm, GroundFunctionTermData, GroupIndex, Index, ObjectData, Predicate,
    PredicateData, RuleData, VariableData,
};
use super::{Auxiliary, Condition, Expression, Fluent, Object, Rule, Static, Variable};
use ahash::AHashMap;
use std::hash::Hash;
use std::marker::PhantomData;

/// Read access shared by interners and overlays, enabling nesting.
pub trait Lookup<K, D> {
    /// Structural lookup.
    fn find(&self, data: &D) -> Option<Index<K>>;
    /// Resolve an index to its data.
    fn resolve(&self, index: Index<K>) -> &D;
    /// Total number of entries visible through this view.
    fn len(&self) -> usize;
    /// True if no entry is visible.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A hash-consed arena for one IR node type.
#[derive(Debug, Clone)]
pub struct Interner<K, D: Eq + Hash + Clone> {
    map: AHashMap<D, u32>,
    items: Vec<D>,
    _marker: PhantomData<fn() -> K>,
}

impl<K, D: Eq + Hash + Clone> Default for Interner<K, D> {
    fn default() -> Self {
        Interner {
            map: AHashMap::new(),
            items: Vec::new(),
            _marker: PhantomData,
        }
    }
}

impl<K, D: Eq + Hash + Clone> Interner<K, D> {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `data`, assigning the next dense index on first sight.
    /// Returns the index and whether an insert happened. `data` must
    /// already be canonical.
    pub fn get_or_create(&mut self, data: &D) -> (Index<K>, bool) {
        if let Some(&v) = self.map.get(data) {
            return (Index::new(v), false);
        }
        let v = self.items.len() as u32;
        self.items.push(data.clone());
        self.map.insert(data.clone(), v);
        (Index::new(v), true)
    }

    /// Iterate over all entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Index<K>, &D)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, d)| (Index::new(i as u32), d))
    }

    /// Empty the arena but keep allocated memory.
    pub fn clear(&mut self) {
        self.map.clear();
        self.items.clear();
    }
}

impl<K, D: Eq + Hash + Clone> Lookup<K, D> for Interner<K, D> {
    fn find(&self, data: &D) -> Option<Index<K>> {
        self.map.get(data).map(|&v| Index::new(v))
    }

    fn resolve(&self, index: Index<K>) -> &D {
        &self.items[index.index()]
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A writable scope over a read-only parent. Indices below the parent's
/// size resolve through the parent; local inserts continue its numbering.
#[derive(Debug)]
pub struct Overlay<'p, P, K, D: Eq + Hash + Clone> {
    parent: &'p P,
    local: Interner<K, D>,
}

impl<'p, P: Lookup<K, D>, K, D: Eq + Hash + Clone> Overlay<'p, P, K, D> {
    /// Create an overlay over `parent`.
    pub fn new(parent: &'p P) -> Self {
        Overlay {
            parent,
            local: Interner::new(),
        }
    }

    /// Intern `data`; parent hits never insert, misses land locally.
    pub fn get_or_create(&mut self, data: &D) -> (Index<K>, bool) {
        if let Some(i) = self.parent.find(data) {
            return (i, false);
        }
        let offset = self.parent.len() as u32;
        let (local, inserted) = self.local.get_or_create(data);
        (Index::new(offset + local.value()), inserted)
    }

    /// The local side, with parent-relative numbering stripped.
    pub fn local(&self) -> &Interner<K, D> {
        &self.local
    }

    /// Take ownership of the local side.
    pub fn into_local(self) -> Interner<K, D> {
        self.local
    }
}

impl<P: Lookup<K, D>, K, D: Eq + Hash + Clone> Lookup<K, D> for Overlay<'_, P, K, D> {
    fn find(&self, data: &D) -> Option<Index<K>> {
        if let Some(i) = self.parent.find(data) {
            return Some(i);
        }
        self.local
            .find(data)
            .map(|i| Index::new(self.parent.len() as u32 + i.value()))
    }

    fn resolve(&self, index: Index<K>) -> &D {
        let parent_len = self.parent.len() as u32;
        if index.value() < parent_len {
            self.parent.resolve(index)
        } else {
            self.local.resolve(Index::new(index.value() - parent_len))
        }
    }

    fn len(&self) -> usize {
        self.parent.len() + self.local.len()
    }
}

/// Write access shared by interners and overlays.
pub trait Store<K, D>: Lookup<K, D> {
    /// Intern `data`, assigning the next dense index on first sight.
    fn get_or_create(&mut self, data: &D) -> (Index<K>, bool);
}

impl<K, D: Eq + Hash + Clone> Store<K, D> for Interner<K, D> {
    fn get_or_create(&mut self, data: &D) -> (Index<K>, bool) {
        Interner::get_or_create(self, data)
    }
}

impl<P: Lookup<K, D>, K, D: Eq + Hash + Clone> Store<K, D> for Overlay<'_, P, K, D> {
    fn get_or_create(&mut self, data: &D) -> (Index<K>, bool) {
        Overlay::get_or_create(self, data)
    }
}

/// Group read access shared by grouped interners and grouped overlays.
pub trait GroupedLookup<K, D> {
    /// Structural lookup within `group`.
    fn find(&self, group: u32, data: &D) -> Option<GroupIndex<K>>;
    /// Resolve a group-qualified index to its data.
    fn resolve(&self, index: GroupIndex<K>) -> &D;
    /// Number of entries visible in `group`.
    fn group_len(&self, group: u32) -> usize;
    /// Number of groups.
    fn num_groups(&self) -> usize;
}

/// One interner per predicate group; entries are densely numbered within
/// their group.
#[derive(Debug, Clone)]
pub struct GroupedInterner<K, D: Eq + Hash + Clone> {
    groups: Vec<Interner<K, D>>,
}

impl<K, D: Eq + Hash + Clone> Default for GroupedInterner<K, D> {
    fn default() -> Self {
        GroupedInterner { groups: Vec::new() }
    }
}

impl<K, D: Eq + Hash + Clone> GroupedInterner<K, D> {
    /// Create an empty grouped interner.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_group(&mut self, group: u32) {
        if self.groups.len() <= group as usize {
            self.groups.resize_with(group as usize + 1, Interner::new);
        }
    }

    /// Intern `data` in `group`.
    pub fn get_or_create(&mut self, group: u32, data: &D) -> (GroupIndex<K>, bool) {
        self.ensure_group(group);
        let (i, inserted) = self.groups[group as usize].get_or_create(data);
        (GroupIndex::new(group, i.value()), inserted)
    }

    /// Iterate over all entries of `group` in index order.
    pub fn iter_group(&self, group: u32) -> impl Iterator<Item = (GroupIndex<K>, &D)> {
        self.groups
            .get(group as usize)
            .into_iter()
            .flat_map(move |g| {
                g.iter()
                    .map(move |(i, d)| (GroupIndex::new(group, i.value()), d))
            })
    }

    /// Total entries across all groups.
    pub fn total_len(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }

    /// Empty all groups but keep allocated memory.
    pub fn clear(&mut self) {
        for g in &mut self.groups {
            g.clear();
        }
    }
}

impl<K, D: Eq + Hash + Clone> GroupedLookup<K, D> for GroupedInterner<K, D> {
    fn find(&self, group: u32, data: &D) -> Option<GroupIndex<K>> {
        self.groups
            .get(group as usize)?
            .find(data)
            .map(|i| GroupIndex::new(group, i.value()))
    }

    fn resolve(&self, index: GroupIndex<K>) -> &D {
        self.groups[index.group as usize].resolve(Index::new(index.value))
    }

    fn group_len(&self, group: u32) -> usize {
        self.groups.get(group as usize).map_or(0, |g| g.len())
    }

    fn num_groups(&self) -> usize {
        self.groups.len()
    }
}

/// A writable grouped scope over a read-only grouped parent.
#[derive(Debug)]
pub struct GroupedOverlay<'p, P, K, D: Eq + Hash + Clone> {
    parent: &'p P,
    local: GroupedInterner<K, D>,
}

impl<'p, P: GroupedLookup<K, D>, K, D: Eq + Hash + Clone> GroupedOverlay<'p, P, K, D> {
    /// Create a grouped overlay over `parent`.
    pub fn new(parent: &'p P) -> Self {
        GroupedOverlay {
            parent,
            local: GroupedInterner::new(),
        }
    }

    /// Intern `data` in `group`; parent hits never insert.
    pub fn get_or_create(&mut self, group: u32, data: &D) -> (GroupIndex<K>, bool) {
        if let Some(i) = self.parent.find(group, data) {
            return (i, false);
        }
        let offset = self.parent.group_len(group) as u32;
        let (local, inserted) = self.local.get_or_create(group, data);
        (GroupIndex::new(group, offset + local.value), inserted)
    }

    /// The local side, with parent-relative numbering stripped.
    pub fn local(&self) -> &GroupedInterner<K, D> {
        &self.local
    }

    /// Take ownership of the local side.
    pub fn into_local(self) -> GroupedInterner<K, D> {
        self.local
    }
}

impl<P: GroupedLookup<K, D>, K, D: Eq + Hash + Clone> GroupedLookup<K, D>
    for GroupedOverlay<'_, P, K, D>
{
    fn find(&self, group: u32, data: &D) -> Option<GroupIndex<K>> {
        if let Some(i) = self.parent.find(group, data) {
            return Some(i);
        }
        self.local.find(group, data).map(|i| {
            GroupIndex::new(group, self.parent.group_len(group) as u32 + i.value)
        })
    }

    fn resolve(&self, index: GroupIndex<K>) -> &D {
        let parent_len = self.parent.group_len(index.group) as u32;
        if index.value < parent_len {
            self.parent.resolve(index)
        } else {
            self.local
                .resolve(GroupIndex::new(index.group, index.value - parent_len))
        }
    }

    fn group_len(&self, group: u32) -> usize {
        self.parent.group_len(group) + self.local.group_len(group)
    }

    fn num_groups(&self) -> usize {
        self.parent.num_groups().max(self.local.num_groups())
    }
}

/// Group write access shared by grouped interners and grouped overlays.
pub trait GroupedStore<K, D>: GroupedLookup<K, D> {
    /// Intern `data` in `group`, assigning the next dense index on first sight.
    fn get_or_create(&mut self, group: u32, data: &D) -> (GroupIndex<K>, bool);
}

impl<K, D: Eq + Hash + Clone> GroupedStore<K, D> for GroupedInterner<K, D> {
    fn get_or_create(&mut self, group: u32, data: &D) -> (GroupIndex<K>, bool) {
        GroupedInterner::get_or_create(self, group, data)
    }
}

impl<P: GroupedLookup<K, D>, K, D: Eq + Hash + Clone> GroupedStore<K, D>
    for GroupedOverlay<'_, P, K, D>
{
    fn get_or_create(&mut self, group: u32, data: &D) -> (GroupIndex<K>, bool) {
        GroupedOverlay::get_or_create(self, group, data)
    }
}

/// The program repository: one arena per IR node type.
///
/// Append-only during a bottom-up run; [`Repository::clear_ground`] empties
/// the run-scoped ground tables but keeps memory.
#[derive(Debug, Clone, Default)]
pub struct Repository {
    /// Objects.
    pub objects: Interner<Object, ObjectData>,
    /// Schema variables.
    pub variables: Interner<Variable, VariableData>,
    /// Static predicates.
    pub static_predicates: Interner<Predicate<Static>, PredicateData<Static>>,
    /// Fluent predicates.
    pub fluent_predicates: Interner<Predicate<Fluent>, PredicateData<Fluent>>,
    /// Static functions.
    pub static_functions: Interner<Function<Static>, FunctionData<Static>>,
    /// Fluent functions.
    pub fluent_functions: Interner<Function<Fluent>, FunctionData<Fluent>>,
    /// Auxiliary functions.
    pub auxiliary_functions: Interner<Function<Auxiliary>, FunctionData<Auxiliary>>,
    /// Static schema atoms, grouped by predicate.
    pub static_atoms: GroupedInterner<Atom<Static>, AtomData<Static>>,
    /// Fluent schema atoms, grouped by predicate.
    pub fluent_atoms: GroupedInterner<Atom<Fluent>, AtomData<Fluent>>,
    /// Static ground atoms, grouped by predicate.
    pub static_ground_atoms: GroupedInterner<GroundAtom<Static>, GroundAtomData<Static>>,
    /// Fluent ground atoms, grouped by predicate.
    pub fluent_ground_atoms: GroupedInterner<GroundAtom<Fluent>, GroundAtomData<Fluent>>,
    /// Static schema function terms.
    pub static_fterms: Interner<FunctionTerm<Static>, FunctionTermData<Static>>,
    /// Fluent schema function terms.
    pub fluent_fterms: Interner<FunctionTerm<Fluent>, FunctionTermData<Fluent>>,
    /// Auxiliary schema function terms.
    pub auxiliary_fterms: Interner<FunctionTerm<Auxiliary>, FunctionTermData<Auxiliary>>,
    /// Static ground function terms.
    pub static_ground_fterms: Interner<GroundFunctionTerm<Static>, GroundFunctionTermData<Static>>,
    /// Fluent ground function terms.
    pub fluent_ground_fterms: Interner<GroundFunctionTerm<Fluent>, GroundFunctionTermData<Fluent>>,
    /// Numeric expressions.
    pub expressions: Interner<Expression, ExpressionData>,
    /// Conjunctive conditions.
    pub conditions: Interner<Condition, ConditionData>,
    /// Rules.
    pub rules: Interner<Rule, RuleData>,
    /// Ground actions.
    pub ground_actions: Interner<GroundAction, GroundActionData>,
}

impl Repository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the run-scoped ground tables, keeping schema tables intact.
    pub fn clear_ground(&mut self) {
        self.fluent_ground_atoms.clear();
        self.ground_actions.clear();
    }

    /// Resolve an object's name.
    pub fn object_name(&self, object: Index<Object>) -> &str {
        &self.objects.resolve(object).name
    }
}
