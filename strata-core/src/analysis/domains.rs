//! Variable-domain analysis
//!
//! Computes, for every predicate position and every rule parameter, a
//! superset of the objects the position or parameter may ever take. The
//! fixed point seeds predicate position domains from the initial atoms,
//! restricts rule parameters through their positive body occurrences, and
//! widens fluent position domains with the parameter domains of every rule
//! that can write them, until nothing grows. Parameter domains bound the
//! vertex partitions of the static consistency graph.

use crate::ir::repository::{GroupedLookup, Lookup};
use crate::ir::{Expression, ExpressionData, Index, Object, Program, Repository};
use ahash::AHashSet;

type DomainSet = AHashSet<Index<Object>>;

/// The analysis result.
#[derive(Debug, Clone, Default)]
pub struct Domains {
    /// Static predicate position domains: `[predicate][position]`.
    pub static_positions: Vec<Vec<DomainSet>>,
    /// Fluent predicate position domains: `[predicate][position]`.
    pub fluent_positions: Vec<Vec<DomainSet>>,
    /// Rule parameter domains, parallel to the program's rule list:
    /// `[rule][parameter]`, each a sorted object list.
    pub rule_parameters: Vec<Vec<Vec<Index<Object>>>>,
}

/// Restriction applicable to one rule parameter: every positive occurrence
/// intersects the parameter's domain.
#[derive(Debug, Clone, Copy)]
enum Occurrence {
    Static { predicate: u32, position: u32 },
    Fluent { predicate: u32, position: u32 },
    StaticFn { function: u32, position: u32 },
}

struct RuleShape {
    /// Positive occurrences per parameter.
    occurrences: Vec<Vec<Occurrence>>,
    /// Head writes: (fluent predicate, position, parameter).
    head_writes: Vec<(u32, u32, u32)>,
    /// Head constants: (fluent predicate, position, object).
    head_constants: Vec<(u32, u32, Index<Object>)>,
    /// Body fluent writes, per the widening step of the fixed point.
    body_writes: Vec<(u32, u32, u32)>,
}

fn collect_static_fn_occurrences(
    expression: Index<Expression>,
    repository: &Repository,
    occurrences: &mut [Vec<Occurrence>],
) {
    match repository.expressions.resolve(expression) {
        ExpressionData::Number(_) => {}
        ExpressionData::Negate(arg) => {
            collect_static_fn_occurrences(*arg, repository, occurrences)
        }
        ExpressionData::Binary { lhs, rhs, .. } => {
            collect_static_fn_occurrences(*lhs, repository, occurrences);
            collect_static_fn_occurrences(*rhs, repository, occurrences);
        }
        ExpressionData::Multi { args, .. } => {
            for &arg in args {
                collect_static_fn_occurrences(arg, repository, occurrences);
            }
        }
        ExpressionData::StaticTerm(ft) => {
            let fterm = repository.static_fterms.resolve(*ft);
            for (position, term) in fterm.terms.iter().enumerate() {
                if let Some(v) = term.as_variable() {
                    let parameter = repository.variables.resolve(v).parameter as usize;
                    occurrences[parameter].push(Occurrence::StaticFn {
                        function: fterm.function.value(),
                        position: position as u32,
                    });
                }
            }
        }
        // Fluent and auxiliary values vary per run; they never restrict.
        ExpressionData::FluentTerm(_) | ExpressionData::AuxiliaryTerm(_) => {}
    }
}

fn rule_shape(rule: crate::ir::Index<crate::ir::Rule>, repository: &Repository) -> RuleShape {
    let rule_data = repository.rules.resolve(rule);
    let body = repository.conditions.resolve(rule_data.body);
    let k = body.variables.len();

    let mut shape = RuleShape {
        occurrences: vec![Vec::new(); k],
        head_writes: Vec::new(),
        head_constants: Vec::new(),
        body_writes: Vec::new(),
    };

    for literal in &body.static_literals {
        if !literal.polarity {
            continue;
        }
        let atom = repository.static_atoms.resolve(literal.atom);
        for (position, term) in atom.terms.iter().enumerate() {
            if let Some(v) = term.as_variable() {
                let parameter = repository.variables.resolve(v).parameter as usize;
                shape.occurrences[parameter].push(Occurrence::Static {
                    predicate: literal.atom.group,
                    position: position as u32,
                });
            }
        }
    }
    for literal in &body.fluent_literals {
        if !literal.polarity {
            continue;
        }
        let atom = repository.fluent_atoms.resolve(literal.atom);
        for (position, term) in atom.terms.iter().enumerate() {
            if let Some(v) = term.as_variable() {
                let parameter = repository.variables.resolve(v).parameter as usize;
                shape.occurrences[parameter].push(Occurrence::Fluent {
                    predicate: literal.atom.group,
                    position: position as u32,
                });
                shape.body_writes.push((
                    literal.atom.group,
                    position as u32,
                    parameter as u32,
                ));
            }
        }
    }
    for constraint in &body.constraints {
        collect_static_fn_occurrences(constraint.lhs, repository, &mut shape.occurrences);
        collect_static_fn_occurrences(constraint.rhs, repository, &mut shape.occurrences);
    }

    let head = repository
        .fluent_atoms
        .resolve(crate::ir::GroupIndex::new(rule_data.head.group, rule_data.head.value));
    for (position, term) in head.terms.iter().enumerate() {
        match term {
            crate::ir::Term::Variable(v) => {
                let parameter = repository.variables.resolve(*v).parameter;
                shape
                    .head_writes
                    .push((rule_data.head.group, position as u32, parameter));
            }
            crate::ir::Term::Object(o) => {
                shape
                    .head_constants
                    .push((rule_data.head.group, position as u32, *o));
            }
        }
    }

    shape
}

/// Run the fixed point over `program`.
pub fn compute_domains(program: &Program, repository: &Repository) -> Domains {
    let universe: Vec<Index<Object>> = repository
        .objects
        .iter()
        .map(|(i, _)| i)
        .collect();

    let mut domains = Domains::default();
    domains.static_positions = repository
        .static_predicates
        .iter()
        .map(|(_, p)| vec![DomainSet::new(); p.arity as usize])
        .collect();
    domains.fluent_positions = repository
        .fluent_predicates
        .iter()
        .map(|(_, p)| vec![DomainSet::new(); p.arity as usize])
        .collect();
    let mut static_fn_positions: Vec<Vec<DomainSet>> = repository
        .static_functions
        .iter()
        .map(|(_, f)| vec![DomainSet::new(); f.arity as usize])
        .collect();

    // Seed from the initial atoms and function values.
    for group in 0..repository.static_ground_atoms.num_groups() as u32 {
        for (_, atom) in repository.static_ground_atoms.iter_group(group) {
            for (position, &object) in atom.objects.iter().enumerate() {
                domains.static_positions[group as usize][position].insert(object);
            }
        }
    }
    for group in 0..repository.fluent_ground_atoms.num_groups() as u32 {
        for (_, atom) in repository.fluent_ground_atoms.iter_group(group) {
            for (position, &object) in atom.objects.iter().enumerate() {
                domains.fluent_positions[group as usize][position].insert(object);
            }
        }
    }
    for (_, fterm) in repository.static_ground_fterms.iter() {
        if let Some(function) = fterm.function {
            for (position, &object) in fterm.objects.iter().enumerate() {
                static_fn_positions[function.index()][position].insert(object);
            }
        }
    }

    let shapes: Vec<RuleShape> = program
        .rules
        .iter()
        .map(|&rule| rule_shape(rule, repository))
        .collect();

    let parameter_domains = loop {
        // Restrict parameters through their positive occurrences.
        let parameter_domains: Vec<Vec<DomainSet>> = shapes
            .iter()
            .map(|shape| {
                shape
                    .occurrences
                    .iter()
                    .map(|occurrences| {
                        let mut domain: Option<DomainSet> = None;
                        for occurrence in occurrences {
                            let positions = match *occurrence {
                                Occurrence::Static {
                                    predicate,
                                    position,
                                } => &domains.static_positions[predicate as usize]
                                    [position as usize],
                                Occurrence::Fluent {
                                    predicate,
                                    position,
                                } => &domains.fluent_positions[predicate as usize]
                                    [position as usize],
                                Occurrence::StaticFn { function, position } => {
                                    &static_fn_positions[function as usize][position as usize]
                                }
                            };
                            domain = Some(match domain {
                                None => positions.clone(),
                                Some(current) => {
                                    current.intersection(positions).copied().collect()
                                }
                            });
                        }
                        domain.unwrap_or_else(|| universe.iter().copied().collect())
                    })
                    .collect()
            })
            .collect();

        // Widen fluent position domains with the parameter domains of
        // every head and body occurrence.
        let mut grown = false;
        for (shape, parameters) in shapes.iter().zip(&parameter_domains) {
            for &(predicate, position, parameter) in
                shape.head_writes.iter().chain(&shape.body_writes)
            {
                let target = &mut domains.fluent_positions[predicate as usize][position as usize];
                for &object in &parameters[parameter as usize] {
                    grown |= target.insert(object);
                }
            }
            for &(predicate, position, object) in &shape.head_constants {
                grown |= domains.fluent_positions[predicate as usize][position as usize]
                    .insert(object);
            }
        }

        if !grown {
            break parameter_domains;
        }
    };

    domains.rule_parameters = parameter_domains
        .into_iter()
        .map(|parameters| {
            parameters
                .into_iter()
                .map(|domain| {
                    let mut objects: Vec<Index<Object>> = domain.into_iter().collect();
                    objects.sort_unstable();
                    objects
                })
                .collect()
        })
        .collect();

    domains
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        AtomData, ConditionData, GroundAtomData, GroupIndex, Literal, ObjectData, PredicateData,
        RuleData, Term, VariableData,
    };

    #[test]
    fn test_domains_separate_sorts() {
        // Objects: b1 b2 (balls), r1 r2 (rooms). Static predicate
        // ball(x); fluent at(ball, room). Rule:
        //   moved(x, y) :- ball(x), at(x, y).
        // x's domain must stay {b1, b2}; y's must stay {r1}.
        let mut repo = Repository::new();
        let b1 = repo.objects.get_or_create(&ObjectData { name: "b1".into() }).0;
        let b2 = repo.objects.get_or_create(&ObjectData { name: "b2".into() }).0;
        let r1 = repo.objects.get_or_create(&ObjectData { name: "r1".into() }).0;
        repo.objects.get_or_create(&ObjectData { name: "r2".into() });

        repo.static_predicates
            .get_or_create(&PredicateData::new("ball", 1));
        repo.fluent_predicates
            .get_or_create(&PredicateData::new("at", 2));
        repo.fluent_predicates
            .get_or_create(&PredicateData::new("moved", 2));

        // init: ball(b1), ball(b2), at(b1, r1).
        for &b in &[b1, b2] {
            repo.static_ground_atoms
                .get_or_create(0, &GroundAtomData::new(Index::new(0), vec![b]));
        }
        repo.fluent_ground_atoms
            .get_or_create(0, &GroundAtomData::new(Index::new(0), vec![b1, r1]));

        let x = repo
            .variables
            .get_or_create(&VariableData {
                name: "x".into(),
                parameter: 0,
            })
            .0;
        let y = repo
            .variables
            .get_or_create(&VariableData {
                name: "y".into(),
                parameter: 1,
            })
            .0;

        let (ball_x, _) = repo.static_atoms.get_or_create(
            0,
            &AtomData {
                predicate: Index::new(0),
                terms: vec![Term::Variable(x)],
            },
        );
        let (at_xy, _) = repo.fluent_atoms.get_or_create(
            0,
            &AtomData {
                predicate: Index::new(0),
                terms: vec![Term::Variable(x), Term::Variable(y)],
            },
        );
        let (moved_xy, _) = repo.fluent_atoms.get_or_create(
            1,
            &AtomData {
                predicate: Index::new(1),
                terms: vec![Term::Variable(x), Term::Variable(y)],
            },
        );

        let (body, _) = repo.conditions.get_or_create(&ConditionData {
            variables: vec![x, y],
            static_literals: vec![Literal {
                atom: ball_x,
                polarity: true,
            }],
            fluent_literals: vec![Literal {
                atom: at_xy,
                polarity: true,
            }],
            ..Default::default()
        });
        let (rule, _) = repo.rules.get_or_create(&RuleData {
            body,
            head: GroupIndex::new(1, moved_xy.value),
            cost: 1,
        });

        let program = Program::new(vec![rule]);
        let domains = compute_domains(&program, &repo);

        assert_eq!(domains.rule_parameters[0][0], vec![b1]);
        assert_eq!(domains.rule_parameters[0][1], vec![r1]);
        // moved inherits the parameter domains.
        assert!(domains.fluent_positions[1][0].contains(&b1));
        assert!(!domains.fluent_positions[1][0].contains(&r1));
    }
}
