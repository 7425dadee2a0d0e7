//! Grounding: substituting a variable binding into schema nodes
//!
//! `ground_*_into` writes into a caller-provided scratch buffer without
//! interning, for checks that only need an equality comparison against an
//! already-interned node. `ground_*` additionally interns the result in a
//! destination store (the program repository or a worker overlay).

use super::repository::{GroupedStore, Interner, Store};
use super::{
    AtomData, FactKind, FunctionTermData, GroundAtom, GroundAtomData, GroundFunctionTerm,
    GroundFunctionTermData, GroupIndex, Index, Object, Term, Variable, VariableData,
};

/// Substitute `binding` into a term.
#[inline]
pub fn ground_term(
    term: Term,
    variables: &Interner<Variable, VariableData>,
    binding: &[Index<Object>],
) -> Index<Object> {
    match term {
        Term::Object(o) => o,
        Term::Variable(v) => {
            use super::repository::Lookup;
            binding[variables.resolve(v).parameter as usize]
        }
    }
}

/// Ground an atom into a scratch buffer without interning.
pub fn ground_atom_into<T: FactKind>(
    atom: &AtomData<T>,
    variables: &Interner<Variable, VariableData>,
    binding: &[Index<Object>],
    out: &mut GroundAtomData<T>,
) {
    out.predicate = Some(atom.predicate);
    out.objects.clear();
    out.objects
        .extend(atom.terms.iter().map(|&t| ground_term(t, variables, binding)));
}

/// Ground an atom and intern it in `dest`.
pub fn ground_atom<T, S>(
    atom: &AtomData<T>,
    variables: &Interner<Variable, VariableData>,
    binding: &[Index<Object>],
    scratch: &mut GroundAtomData<T>,
    dest: &mut S,
) -> (GroupIndex<GroundAtom<T>>, bool)
where
    T: FactKind,
    S: GroupedStore<GroundAtom<T>, GroundAtomData<T>>,
{
    ground_atom_into(atom, variables, binding, scratch);
    dest.get_or_create(atom.predicate.value(), scratch)
}

/// Ground a function term into a scratch buffer without interning.
pub fn ground_fterm_into<T: FactKind>(
    fterm: &FunctionTermData<T>,
    variables: &Interner<Variable, VariableData>,
    binding: &[Index<Object>],
    out: &mut GroundFunctionTermData<T>,
) {
    out.function = Some(fterm.function);
    out.objects.clear();
    out.objects
        .extend(fterm.terms.iter().map(|&t| ground_term(t, variables, binding)));
}

/// Ground a function term and intern it in `dest`.
pub fn ground_fterm<T, S>(
    fterm: &FunctionTermData<T>,
    variables: &Interner<Variable, VariableData>,
    binding: &[Index<Object>],
    scratch: &mut GroundFunctionTermData<T>,
    dest: &mut S,
) -> (Index<GroundFunctionTerm<T>>, bool)
where
    T: FactKind,
    S: Store<GroundFunctionTerm<T>, GroundFunctionTermData<T>>,
{
    ground_fterm_into(fterm, variables, binding, scratch);
    dest.get_or_create(scratch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::repository::{GroupedInterner, GroupedLookup, Lookup};
    use crate::ir::{Fluent, Predicate};

    fn vars() -> Interner<Variable, VariableData> {
        let mut vars = Interner::new();
        vars.get_or_create(&VariableData {
            name: "x".into(),
            parameter: 0,
        });
        vars.get_or_create(&VariableData {
            name: "y".into(),
            parameter: 1,
        });
        vars
    }

    #[test]
    fn test_ground_substitutes_by_parameter_position() {
        let vars = vars();
        let pred: Index<Predicate<Fluent>> = Index::new(0);
        let atom = AtomData {
            predicate: pred,
            terms: vec![
                Term::Variable(Index::new(1)),
                Term::Object(Index::new(9)),
                Term::Variable(Index::new(0)),
            ],
        };
        let binding = [Index::new(4), Index::new(5)];

        let mut out = GroundAtomData::default();
        ground_atom_into(&atom, &vars, &binding, &mut out);
        assert_eq!(out.predicate, Some(pred));
        assert_eq!(
            out.objects,
            vec![Index::new(5), Index::new(9), Index::new(4)]
        );
    }

    #[test]
    fn test_ground_and_intern() {
        let vars = vars();
        let atom = AtomData::<Fluent> {
            predicate: Index::new(2),
            terms: vec![Term::Variable(Index::new(0))],
        };
        let mut dest: GroupedInterner<GroundAtom<Fluent>, GroundAtomData<Fluent>> =
            GroupedInterner::new();
        let mut scratch = GroundAtomData::default();

        let (i, inserted) = ground_atom(&atom, &vars, &[Index::new(7)], &mut scratch, &mut dest);
        assert!(inserted);
        assert_eq!(i.group, 2);
        assert_eq!(i.value, 0);

        // Same binding grounds to the same interned index.
        let (j, inserted) = ground_atom(&atom, &vars, &[Index::new(7)], &mut scratch, &mut dest);
        assert!(!inserted);
        assert_eq!(i, j);

        // The buffer-only variant finds it without interning.
        ground_atom_into(&atom, &vars, &[Index::new(7)], &mut scratch);
        assert_eq!(dest.find(2, &scratch), Some(i));
    }
}
