//! Canonical normal forms for IR nodes
//!
//! Commutative children are ordered by their interned child index before a
//! node is submitted for interning, so structurally equal nodes dedupe to
//! one entry. Canonicalization is intrinsic: it rewrites only children
//! that are already interned, and it is idempotent.

use super::{ConditionData, ExpressionData, NumericConstraint};

/// Order commutative children of an expression node.
pub fn canonicalize_expression(expr: &mut ExpressionData) {
    match expr {
        ExpressionData::Binary { op, lhs, rhs } if op.is_commutative() => {
            if lhs > rhs {
                std::mem::swap(lhs, rhs);
            }
        }
        ExpressionData::Multi { args, .. } => {
            args.sort_unstable();
        }
        _ => {}
    }
}

/// Order commutative sides of a comparison.
pub fn canonicalize_constraint(constraint: &mut NumericConstraint) {
    if constraint.op.is_commutative() && constraint.lhs > constraint.rhs {
        std::mem::swap(&mut constraint.lhs, &mut constraint.rhs);
    }
}

/// Sort the literal and constraint lists of a conjunctive condition.
pub fn canonicalize_condition(condition: &mut ConditionData) {
    condition.static_literals.sort_unstable();
    condition.fluent_literals.sort_unstable();
    condition.constraints.sort_unstable();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ArithmeticOp, ComparisonOp, Index, Literal};

    #[test]
    fn test_commutative_binary_orders_children() {
        let mut e = ExpressionData::Binary {
            op: ArithmeticOp::Add,
            lhs: Index::new(7),
            rhs: Index::new(2),
        };
        canonicalize_expression(&mut e);
        assert_eq!(
            e,
            ExpressionData::Binary {
                op: ArithmeticOp::Add,
                lhs: Index::new(2),
                rhs: Index::new(7),
            }
        );
    }

    #[test]
    fn test_noncommutative_binary_is_untouched() {
        let mut e = ExpressionData::Binary {
            op: ArithmeticOp::Sub,
            lhs: Index::new(7),
            rhs: Index::new(2),
        };
        canonicalize_expression(&mut e);
        assert_eq!(
            e,
            ExpressionData::Binary {
                op: ArithmeticOp::Sub,
                lhs: Index::new(7),
                rhs: Index::new(2),
            }
        );
    }

    #[test]
    fn test_canonicalization_is_idempotent() {
        let mut e = ExpressionData::Multi {
            op: crate::ir::MultiOp::Add,
            args: vec![Index::new(3), Index::new(1), Index::new(2)],
        };
        canonicalize_expression(&mut e);
        let once = e.clone();
        canonicalize_expression(&mut e);
        assert_eq!(e, once);
    }

    #[test]
    fn test_constraint_eq_orders_sides() {
        let mut c = NumericConstraint {
            op: ComparisonOp::Eq,
            lhs: Index::new(9),
            rhs: Index::new(1),
        };
        canonicalize_constraint(&mut c);
        assert_eq!(c.lhs, Index::new(1));
        assert_eq!(c.rhs, Index::new(9));

        let mut c = NumericConstraint {
            op: ComparisonOp::Lt,
            lhs: Index::new(9),
            rhs: Index::new(1),
        };
        canonicalize_constraint(&mut c);
        assert_eq!(c.lhs, Index::new(9));
    }

    #[test]
    fn test_condition_sorts_literals() {
        let mut cond = ConditionData {
            fluent_literals: vec![
                Literal {
                    atom: crate::ir::GroupIndex::new(1, 0),
                    polarity: true,
                },
                Literal {
                    atom: crate::ir::GroupIndex::new(0, 2),
                    polarity: false,
                },
            ],
            ..Default::default()
        };
        canonicalize_condition(&mut cond);
        assert_eq!(cond.fluent_literals[0].atom, crate::ir::GroupIndex::new(0, 2));
    }
}
