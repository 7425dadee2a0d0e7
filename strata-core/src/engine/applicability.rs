//! Applicability checks
//!
//! The consistency graph only covers overapproximations, so every binding
//! a clique proposes is verified here against the full rule body: static
//! literals against the static fact set, fluent literals and numeric
//! constraints against the current run state. Expressions are evaluated
//! exactly; an undefined function term reads NaN, which makes its
//! enclosing constraint false.

use super::fact_sets::FactSets;
use crate::ir::builder::Builders;
use crate::ir::ground::{ground_atom_into, ground_fterm_into};
use crate::ir::repository::{GroupedLookup, Lookup};
use crate::ir::{
    ConditionData, Expression, ExpressionData, Fluent, GroundAtom, GroupIndex, Index, Object,
    Repository,
};

/// Evaluate a ground instance of `expression` under `binding`.
pub fn evaluate_expression(
    expression: Index<Expression>,
    repository: &Repository,
    binding: &[Index<Object>],
    facts: &FactSets,
    builders: &mut Builders,
) -> f64 {
    match repository.expressions.resolve(expression) {
        ExpressionData::Number(n) => n.0,
        ExpressionData::Negate(arg) => {
            -evaluate_expression(*arg, repository, binding, facts, builders)
        }
        ExpressionData::Binary { op, lhs, rhs } => {
            let l = evaluate_expression(*lhs, repository, binding, facts, builders);
            let r = evaluate_expression(*rhs, repository, binding, facts, builders);
            op.apply(l, r)
        }
        ExpressionData::Multi { op, args } => {
            let mut acc = op.identity();
            for &arg in args {
                acc = op.apply(acc, evaluate_expression(arg, repository, binding, facts, builders));
            }
            acc
        }
        ExpressionData::StaticTerm(ft) => {
            let fterm = repository.static_fterms.resolve(*ft);
            let scratch = builders.static_fterm();
            ground_fterm_into(fterm, &repository.variables, binding, scratch);
            match repository.static_ground_fterms.find(scratch) {
                Some(index) => facts.static_values.get(index),
                None => f64::NAN,
            }
        }
        ExpressionData::FluentTerm(ft) => {
            let fterm = repository.fluent_fterms.resolve(*ft);
            let scratch = builders.fluent_fterm();
            ground_fterm_into(fterm, &repository.variables, binding, scratch);
            match repository.fluent_ground_fterms.find(scratch) {
                Some(index) => facts.fluent_values.get(index),
                None => f64::NAN,
            }
        }
        // The cost accumulator contributes nothing to body evaluation.
        ExpressionData::AuxiliaryTerm(_) => 0.0,
    }
}

/// Every static literal of the body holds under `binding`. A failure here
/// is permanent: the binding can be discarded for good.
pub fn statically_valid(
    condition: &ConditionData,
    repository: &Repository,
    binding: &[Index<Object>],
    facts: &FactSets,
    builders: &mut Builders,
) -> bool {
    condition.static_literals.iter().all(|literal| {
        let atom = repository.static_atoms.resolve(literal.atom);
        let scratch = builders.static_atom();
        ground_atom_into(atom, &repository.variables, binding, scratch);
        let present = repository
            .static_ground_atoms
            .find(literal.atom.group, scratch)
            .is_some_and(|index| facts.static_atoms.contains(index));
        present == literal.polarity
    })
}

/// Every fluent literal and numeric constraint of the body holds under
/// `binding` right now. On success, returns the ground positive fluent
/// body atoms (the witness sub-goals); on failure, `None` - the binding
/// may become applicable in a later iteration.
pub fn dynamically_valid(
    condition: &ConditionData,
    repository: &Repository,
    binding: &[Index<Object>],
    facts: &FactSets,
    builders: &mut Builders,
) -> Option<Vec<GroupIndex<GroundAtom<Fluent>>>> {
    let mut subgoals = Vec::with_capacity(condition.fluent_literals.len());

    for literal in &condition.fluent_literals {
        let atom = repository.fluent_atoms.resolve(literal.atom);
        let scratch = builders.fluent_atom();
        ground_atom_into(atom, &repository.variables, binding, scratch);
        let found = repository.fluent_ground_atoms.find(literal.atom.group, scratch);
        let present = found.is_some_and(|index| facts.fluent_atoms.contains(index));
        if present != literal.polarity {
            return None;
        }
        if literal.polarity {
            // `present` guarantees the index exists.
            subgoals.push(found?);
        }
    }

    for constraint in &condition.constraints {
        let lhs = evaluate_expression(constraint.lhs, repository, binding, facts, builders);
        let rhs = evaluate_expression(constraint.rhs, repository, binding, facts, builders);
        if !constraint.op.apply(lhs, rhs) {
            return None;
        }
    }

    Some(subgoals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        ArithmeticOp, AtomData, ComparisonOp, FunctionData, FunctionTermData,
        GroundFunctionTermData, Literal, Number, NumericConstraint, ObjectData, PredicateData,
        Static, Term, VariableData,
    };

    struct Fixture {
        repo: Repository,
        condition: ConditionData,
        facts: FactSets,
    }

    /// Body: holding(x), not at(x, r2), (fuel(x) >= 2).
    fn fixture() -> Fixture {
        let mut repo = Repository::new();
        repo.objects.get_or_create(&ObjectData { name: "b1".into() });
        let r2 = repo.objects.get_or_create(&ObjectData { name: "r2".into() }).0;

        repo.fluent_predicates
            .get_or_create(&PredicateData::new("holding", 1));
        repo.fluent_predicates
            .get_or_create(&PredicateData::new("at", 2));
        repo.static_functions
            .get_or_create(&FunctionData::<Static>::new("fuel", 1));

        let x = repo
            .variables
            .get_or_create(&VariableData {
                name: "x".into(),
                parameter: 0,
            })
            .0;

        let (holding_x, _) = repo.fluent_atoms.get_or_create(
            0,
            &AtomData {
                predicate: Index::new(0),
                terms: vec![Term::Variable(x)],
            },
        );
        let (at_x_r2, _) = repo.fluent_atoms.get_or_create(
            1,
            &AtomData {
                predicate: Index::new(1),
                terms: vec![Term::Variable(x), Term::Object(r2)],
            },
        );
        let (fuel_x, _) = repo.static_fterms.get_or_create(&FunctionTermData {
            function: Index::new(0),
            terms: vec![Term::Variable(x)],
        });
        let (fuel_expr, _) = repo
            .expressions
            .get_or_create(&ExpressionData::StaticTerm(fuel_x));
        let (two, _) = repo
            .expressions
            .get_or_create(&ExpressionData::Number(Number(2.0)));

        let condition = ConditionData {
            variables: vec![x],
            fluent_literals: vec![
                Literal {
                    atom: holding_x,
                    polarity: true,
                },
                Literal {
                    atom: at_x_r2,
                    polarity: false,
                },
            ],
            constraints: vec![NumericConstraint {
                op: ComparisonOp::Ge,
                lhs: fuel_expr,
                rhs: two,
            }],
            ..Default::default()
        };

        Fixture {
            repo,
            condition,
            facts: FactSets::new(),
        }
    }

    fn add_holding(f: &mut Fixture, object: u32) -> GroupIndex<GroundAtom<Fluent>> {
        let data = crate::ir::GroundAtomData::new(Index::new(0), vec![Index::new(object)]);
        let (idx, _) = f.repo.fluent_ground_atoms.get_or_create(0, &data);
        f.facts.fluent_atoms.insert(idx);
        idx
    }

    fn set_fuel(f: &mut Fixture, object: u32, value: f64) {
        let data = GroundFunctionTermData::new(Index::new(0), vec![Index::new(object)]);
        let (idx, _) = f.repo.static_ground_fterms.get_or_create(&data);
        f.facts.static_values.set(idx, value);
    }

    #[test]
    fn test_dynamic_check_collects_subgoals() {
        let mut f = fixture();
        let holding = add_holding(&mut f, 0);
        set_fuel(&mut f, 0, 3.0);

        let mut builders = Builders::new();
        let binding = [Index::new(0)];
        let subgoals =
            dynamically_valid(&f.condition, &f.repo, &binding, &f.facts, &mut builders);
        assert_eq!(subgoals, Some(vec![holding]));
    }

    #[test]
    fn test_missing_positive_literal_fails() {
        let f = fixture();
        let mut builders = Builders::new();
        assert!(dynamically_valid(
            &f.condition,
            &f.repo,
            &[Index::new(0)],
            &f.facts,
            &mut builders
        )
        .is_none());
    }

    #[test]
    fn test_negated_literal_blocks() {
        let mut f = fixture();
        add_holding(&mut f, 0);
        set_fuel(&mut f, 0, 3.0);
        // at(b1, r2) becomes true: the negated literal now blocks.
        let data =
            crate::ir::GroundAtomData::new(Index::new(1), vec![Index::new(0), Index::new(1)]);
        let (idx, _) = f.repo.fluent_ground_atoms.get_or_create(1, &data);
        f.facts.fluent_atoms.insert(idx);

        let mut builders = Builders::new();
        assert!(dynamically_valid(
            &f.condition,
            &f.repo,
            &[Index::new(0)],
            &f.facts,
            &mut builders
        )
        .is_none());
    }

    #[test]
    fn test_undefined_function_makes_constraint_false() {
        let mut f = fixture();
        add_holding(&mut f, 0);
        // fuel(b1) is never defined: NaN propagates, the constraint fails.
        let mut builders = Builders::new();
        assert!(dynamically_valid(
            &f.condition,
            &f.repo,
            &[Index::new(0)],
            &f.facts,
            &mut builders
        )
        .is_none());
    }

    #[test]
    fn test_constraint_boundary() {
        let mut f = fixture();
        add_holding(&mut f, 0);
        set_fuel(&mut f, 0, 2.0);
        let mut builders = Builders::new();
        assert!(dynamically_valid(
            &f.condition,
            &f.repo,
            &[Index::new(0)],
            &f.facts,
            &mut builders
        )
        .is_some());

        set_fuel(&mut f, 0, 1.9);
        assert!(dynamically_valid(
            &f.condition,
            &f.repo,
            &[Index::new(0)],
            &f.facts,
            &mut builders
        )
        .is_none());
    }

    #[test]
    fn test_expression_arithmetic() {
        let mut f = fixture();
        set_fuel(&mut f, 0, 6.0);
        let (fuel_x, _) = f.repo.static_fterms.get_or_create(&FunctionTermData {
            function: Index::new(0),
            terms: vec![Term::Variable(Index::new(0))],
        });
        let (fuel_expr, _) = f
            .repo
            .expressions
            .get_or_create(&ExpressionData::StaticTerm(fuel_x));
        let (three, _) = f
            .repo
            .expressions
            .get_or_create(&ExpressionData::Number(Number(3.0)));
        let (div, _) = f.repo.expressions.get_or_create(&ExpressionData::Binary {
            op: ArithmeticOp::Div,
            lhs: fuel_expr,
            rhs: three,
        });

        let mut builders = Builders::new();
        let value =
            evaluate_expression(div, &f.repo, &[Index::new(0)], &f.facts, &mut builders);
        assert_eq!(value, 2.0);

        let (zero, _) = f
            .repo
            .expressions
            .get_or_create(&ExpressionData::Number(Number(0.0)));
        let (div_zero, _) = f.repo.expressions.get_or_create(&ExpressionData::Binary {
            op: ArithmeticOp::Div,
            lhs: fuel_expr,
            rhs: zero,
        });
        assert!(
            evaluate_expression(div_zero, &f.repo, &[Index::new(0)], &f.facts, &mut builders)
                .is_nan()
        );
    }
}
