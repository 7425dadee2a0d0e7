//! Property tests for interning and canonicalization

use proptest::prelude::*;
use strata_core::ir::canonical::{canonicalize_constraint, canonicalize_expression};
use strata_core::ir::repository::{Interner, Lookup, Overlay};
use strata_core::ir::{
    ComparisonOp, ExpressionData, Index, MultiOp, NumericConstraint, Object, ObjectData,
};

proptest! {
    #[test]
    fn canonicalize_expression_is_idempotent(
        raw in proptest::collection::vec(0u32..100, 0..8)
    ) {
        let mut expression = ExpressionData::Multi {
            op: MultiOp::Add,
            args: raw.iter().map(|&v| Index::new(v)).collect(),
        };
        canonicalize_expression(&mut expression);
        let once = expression.clone();
        canonicalize_expression(&mut expression);
        prop_assert_eq!(expression, once);
    }

    #[test]
    fn canonicalize_constraint_is_idempotent(lhs in 0u32..100, rhs in 0u32..100) {
        for op in [
            ComparisonOp::Eq,
            ComparisonOp::Ne,
            ComparisonOp::Lt,
            ComparisonOp::Le,
            ComparisonOp::Gt,
            ComparisonOp::Ge,
        ] {
            let mut constraint = NumericConstraint {
                op,
                lhs: Index::new(lhs),
                rhs: Index::new(rhs),
            };
            canonicalize_constraint(&mut constraint);
            let once = constraint;
            canonicalize_constraint(&mut constraint);
            prop_assert_eq!(constraint, once);
        }
    }

    #[test]
    fn intern_then_look_up(names in proptest::collection::vec("[a-z]{1,8}", 1..24)) {
        let mut table: Interner<Object, ObjectData> = Interner::new();
        for name in &names {
            let data = ObjectData { name: name.clone() };
            let (index, _) = table.get_or_create(&data);
            // get_or_create(x).0 == find(x) after insertion.
            prop_assert_eq!(table.find(&data), Some(index));
            prop_assert_eq!(&table.resolve(index).name, name);
        }
        // Indices are dense and canonical: distinct entries never share
        // identifying members.
        let distinct: std::collections::HashSet<&String> = names.iter().collect();
        prop_assert_eq!(table.len(), distinct.len());
    }

    #[test]
    fn overlay_transparency(
        parent_names in proptest::collection::vec("[a-m]{1,6}", 1..12),
        local_names in proptest::collection::vec("[n-z]{1,6}", 0..12),
    ) {
        let mut parent: Interner<Object, ObjectData> = Interner::new();
        for name in &parent_names {
            parent.get_or_create(&ObjectData { name: name.clone() });
        }
        let parent_len = parent.len();

        let mut overlay = Overlay::new(&parent);
        for name in &local_names {
            let (index, _) = overlay.get_or_create(&ObjectData { name: name.clone() });
            // Local inserts continue the parent's numbering.
            prop_assert!(index.index() >= parent_len);
        }

        // Indexing a parent-born value through the overlay yields the
        // same data as through the parent.
        for i in 0..parent_len {
            let index: Index<Object> = Index::new(i as u32);
            prop_assert_eq!(overlay.resolve(index), parent.resolve(index));
        }

        // Parent hits never insert locally.
        for name in &parent_names {
            let data = ObjectData { name: name.clone() };
            let (index, inserted) = overlay.get_or_create(&data);
            prop_assert!(!inserted);
            prop_assert!(index.index() < parent_len);
        }
    }
}
