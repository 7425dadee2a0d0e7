//! Rule stratification
//!
//! Two-level: predicate stratification first, then rules are assigned to
//! the stratum of their head predicate. The predicate step classifies each
//! ordered pair of fluent predicates as unconstrained, lower, or strictly
//! lower, closes the relation transitively, and rejects programs where a
//! predicate transitively strictly-depends on itself.

use crate::error::{GroundError, Result};
use crate::ir::repository::Lookup;
use crate::ir::{Index, Program, Repository, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum StratumStatus {
    Unconstrained = 0,
    Lower = 1,
    StrictlyLower = 2,
}

/// Rules partitioned into evaluation strata, bottom first.
#[derive(Debug, Clone, Default)]
pub struct RuleStrata {
    /// One rule list per stratum.
    pub strata: Vec<Vec<Index<Rule>>>,
}

impl RuleStrata {
    /// Total number of rules across all strata.
    pub fn num_rules(&self) -> usize {
        self.strata.iter().map(|s| s.len()).sum()
    }
}

fn compute_predicate_strata(program: &Program, repository: &Repository) -> Result<Vec<Vec<u32>>> {
    let n = repository.fluent_predicates.len();
    let mut relation = vec![StratumStatus::Unconstrained; n * n];

    for &rule in &program.rules {
        let rule_data = repository.rules.resolve(rule);
        let head = rule_data.head.group as usize;
        let body = repository.conditions.resolve(rule_data.body);

        for literal in &body.fluent_literals {
            let status = if literal.polarity {
                StratumStatus::Lower
            } else {
                StratumStatus::StrictlyLower
            };
            let cell = &mut relation[literal.atom.group as usize * n + head];
            *cell = (*cell).max(status);
        }
    }

    // Transitive closure: a chain of constrained pairs propagates the
    // strongest constraint along the chain.
    for p1 in 0..n {
        for p2 in 0..n {
            for p3 in 0..n {
                let left = relation[p2 * n + p1];
                let right = relation[p1 * n + p3];
                if left.min(right) > StratumStatus::Unconstrained {
                    let cell = &mut relation[p2 * n + p3];
                    *cell = (*cell).max(left).max(right);
                }
            }
        }
    }

    if (0..n).any(|p| relation[p * n + p] == StratumStatus::StrictlyLower) {
        return Err(GroundError::NotStratifiable);
    }

    // Peel strata: repeatedly extract the predicates that nothing remaining
    // is strictly below.
    let mut remaining: Vec<u32> = (0..n as u32).collect();
    let mut strata = Vec::new();
    while !remaining.is_empty() {
        let stratum: Vec<u32> = remaining
            .iter()
            .copied()
            .filter(|&p| {
                remaining
                    .iter()
                    .all(|&q| relation[q as usize * n + p as usize] != StratumStatus::StrictlyLower)
            })
            .collect();
        debug_assert!(!stratum.is_empty());
        remaining.retain(|p| !stratum.contains(p));
        strata.push(stratum);
    }

    Ok(strata)
}

/// Compute the rule stratification for the rules of `program`.
pub fn stratify(program: &Program, repository: &Repository) -> Result<RuleStrata> {
    let predicate_strata = compute_predicate_strata(program, repository)?;

    let mut remaining: Vec<Index<Rule>> = program.rules.clone();
    let mut rule_strata = RuleStrata::default();

    for predicate_stratum in &predicate_strata {
        let stratum: Vec<Index<Rule>> = remaining
            .iter()
            .copied()
            .filter(|&rule| {
                let head = repository.rules.resolve(rule).head.group;
                predicate_stratum.contains(&head)
            })
            .collect();
        remaining.retain(|rule| !stratum.contains(rule));
        if !stratum.is_empty() {
            rule_strata.strata.push(stratum);
        }
    }

    debug_assert!(remaining.is_empty());
    tracing::debug!(strata = rule_strata.strata.len(), "stratified program");

    Ok(rule_strata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        AtomData, ConditionData, GroupIndex, Literal, PredicateData, RuleData, Term,
    };

    /// Build a tiny program over unary fluent predicates. Each rule is
    /// (head_pred, [(body_pred, polarity)]).
    fn program(rules: &[(u32, &[(u32, bool)])], num_preds: u32) -> (Program, Repository) {
        let mut repo = Repository::new();
        for p in 0..num_preds {
            repo.fluent_predicates
                .get_or_create(&PredicateData::new(format!("p{p}"), 1));
        }
        let v = repo
            .variables
            .get_or_create(&crate::ir::VariableData {
                name: "x".into(),
                parameter: 0,
            })
            .0;

        let mut indices = Vec::new();
        for &(head, body) in rules {
            let mut condition = ConditionData {
                variables: vec![v],
                ..Default::default()
            };
            for &(pred, polarity) in body {
                let (atom, _) = repo.fluent_atoms.get_or_create(
                    pred,
                    &AtomData {
                        predicate: Index::new(pred),
                        terms: vec![Term::Variable(v)],
                    },
                );
                condition.fluent_literals.push(Literal { atom, polarity });
            }
            let (body_idx, _) = repo.conditions.get_or_create(&condition);
            let (head_atom, _) = repo.fluent_atoms.get_or_create(
                head,
                &AtomData {
                    predicate: Index::new(head),
                    terms: vec![Term::Variable(v)],
                },
            );
            let (rule, _) = repo.rules.get_or_create(&RuleData {
                body: body_idx,
                head: GroupIndex::new(head, head_atom.value),
                cost: 1,
            });
            indices.push(rule);
        }
        (Program::new(indices), repo)
    }

    #[test]
    fn test_positive_recursion_is_one_stratum() {
        // p(x) :- p(x). q(x) :- p(x).
        let (program, repo) = program(&[(0, &[(0, true)]), (1, &[(0, true)])], 2);
        let strata = stratify(&program, &repo).unwrap();
        assert_eq!(strata.num_rules(), 2);
    }

    #[test]
    fn test_negation_splits_strata() {
        // q(x) :- not p(x). r(x) :- q(x).
        let (program, repo) = program(&[(1, &[(0, false)]), (2, &[(1, true)])], 3);
        let strata = stratify(&program, &repo).unwrap();
        // p's stratum carries no rules; q's rule strictly after p.
        assert!(strata.strata.len() >= 1);
        let first_of_q = strata
            .strata
            .iter()
            .position(|s| {
                s.iter()
                    .any(|&r| repo.rules.resolve(r).head.group == 1)
            })
            .unwrap();
        let first_of_r = strata
            .strata
            .iter()
            .position(|s| {
                s.iter()
                    .any(|&r| repo.rules.resolve(r).head.group == 2)
            })
            .unwrap();
        assert!(first_of_q <= first_of_r);
    }

    #[test]
    fn test_self_negation_is_not_stratifiable() {
        // p(x) :- not p(x).
        let (program, repo) = program(&[(0, &[(0, false)])], 1);
        let err = stratify(&program, &repo).unwrap_err();
        assert!(matches!(err, GroundError::NotStratifiable));
        assert_eq!(err.to_string(), "Set of rules is not stratifiable.");
    }

    #[test]
    fn test_transitive_self_negation_is_not_stratifiable() {
        // q(x) :- not p(x). p(x) :- q(x).
        let (program, repo) = program(&[(1, &[(0, false)]), (0, &[(1, true)])], 2);
        assert!(matches!(
            stratify(&program, &repo),
            Err(GroundError::NotStratifiable)
        ));
    }
}
