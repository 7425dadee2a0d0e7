//! Listener analysis
//!
//! For every rule in a stratum and every positive fluent literal in its
//! body, the rule listens on the literal's predicate. The scheduler wakes a
//! rule in the next iteration iff one of its listened predicates received a
//! new atom.

use super::stratification::RuleStrata;
use crate::ir::repository::Lookup;
use crate::ir::{Index, Repository, Rule};
use ahash::AHashMap;

/// Fluent predicate group -> rules listening on it.
pub type ListenerMap = AHashMap<u32, Vec<Index<Rule>>>;

/// Compute one listener map per stratum.
pub fn compute_listeners(strata: &RuleStrata, repository: &Repository) -> Vec<ListenerMap> {
    strata
        .strata
        .iter()
        .map(|stratum| {
            let mut map = ListenerMap::new();
            for &rule in stratum {
                let rule_data = repository.rules.resolve(rule);
                let body = repository.conditions.resolve(rule_data.body);
                for literal in &body.fluent_literals {
                    if literal.polarity {
                        let listeners = map.entry(literal.atom.group).or_default();
                        if !listeners.contains(&rule) {
                            listeners.push(rule);
                        }
                    }
                }
            }
            map
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        AtomData, ConditionData, GroupIndex, Literal, PredicateData, RuleData, Term, VariableData,
    };

    #[test]
    fn test_listener_map_positive_only() {
        let mut repo = Repository::new();
        for p in 0..3 {
            repo.fluent_predicates
                .get_or_create(&PredicateData::new(format!("p{p}"), 1));
        }
        let v = repo
            .variables
            .get_or_create(&VariableData {
                name: "x".into(),
                parameter: 0,
            })
            .0;
        let mut atom = |repo: &mut Repository, pred: u32| {
            repo.fluent_atoms
                .get_or_create(
                    pred,
                    &AtomData {
                        predicate: Index::new(pred),
                        terms: vec![Term::Variable(v)],
                    },
                )
                .0
        };

        // p2(x) :- p0(x), not p1(x).
        let a0 = atom(&mut repo, 0);
        let a1 = atom(&mut repo, 1);
        let a2 = atom(&mut repo, 2);
        let (body, _) = repo.conditions.get_or_create(&ConditionData {
            variables: vec![v],
            fluent_literals: vec![
                Literal {
                    atom: a0,
                    polarity: true,
                },
                Literal {
                    atom: a1,
                    polarity: false,
                },
            ],
            ..Default::default()
        });
        let (rule, _) = repo.rules.get_or_create(&RuleData {
            body,
            head: GroupIndex::new(2, a2.value),
            cost: 0,
        });

        let strata = RuleStrata {
            strata: vec![vec![rule]],
        };
        let listeners = compute_listeners(&strata, &repo);
        assert_eq!(listeners.len(), 1);
        assert_eq!(listeners[0].get(&0), Some(&vec![rule]));
        assert!(listeners[0].get(&1).is_none());
    }
}
