//! Static consistency graph
//!
//! Per rule, a k-partite graph whose partition `i` holds one vertex per
//! object in parameter `i`'s analysis domain that satisfies every
//! unary-only constraint of the body, and whose edges connect pairs of
//! bindings that satisfy every binary constraint. Literals and constraints
//! are classified by the number of distinct parameters they mention:
//! 0 and more-than-2 go to the applicability check, 1 to vertex checks,
//! 2 to edge checks. Static members are decided once at construction;
//! fluent members are re-tested each iteration against the growing fluent
//! assignment sets, activating vertices and edges monotonically.

use crate::analysis::VariableDependencyGraph;
use crate::bitset::DynamicBitset;
use crate::engine::assignment_sets::{AssignmentSets, PredicateAssignmentSet};
use crate::engine::fact_sets::FactSets;
use crate::engine::interval::Interval;
use crate::engine::kpkc::{DeltaGraph, GraphLayout};
use crate::ir::builder::Builders;
use crate::ir::repository::{GroupedLookup, Lookup};
use crate::ir::{
    ConditionData, Expression, ExpressionData, FactKind, Index, NumericConstraint, Object,
    Repository,
};

/// One argument position of an indexed literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgInfo {
    /// The rule parameter at this position.
    Parameter(u32),
    /// A fixed object at this position.
    Constant(Index<Object>),
}

/// A body literal with its arguments resolved to parameters/constants.
#[derive(Debug, Clone)]
pub struct LiteralInfo {
    /// Predicate group.
    pub predicate: u32,
    /// Polarity.
    pub polarity: bool,
    /// True for static literals, false for fluent ones.
    pub is_static: bool,
    /// Per-position arguments.
    pub args: Vec<ArgInfo>,
    /// Distinct parameters mentioned, sorted.
    pub params: Vec<u32>,
}

/// A body constraint with its parameter footprint.
#[derive(Debug, Clone)]
pub struct ConstraintInfo {
    /// The comparison.
    pub constraint: NumericConstraint,
    /// Distinct parameters mentioned, sorted.
    pub params: Vec<u32>,
    /// True if the constraint reads no fluent function.
    pub static_only: bool,
    /// True if the constraint reads an auxiliary function; such
    /// constraints are never graph-encoded.
    pub has_auxiliary: bool,
}

/// A reference to a body member used by vertex/edge checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMember {
    /// Position in the static-literal list.
    StaticLiteral(u32),
    /// Position in the fluent-literal list.
    FluentLiteral(u32),
    /// Position in the constraint list.
    Constraint(u32),
}

/// The rule body, indexed for graph checks.
#[derive(Debug, Clone, Default)]
pub struct BodyInfo {
    /// Number of rule parameters.
    pub arity: usize,
    /// All static literals.
    pub static_literals: Vec<LiteralInfo>,
    /// All fluent literals.
    pub fluent_literals: Vec<LiteralInfo>,
    /// All constraints.
    pub constraints: Vec<ConstraintInfo>,
    /// Construction-time members per parameter.
    unary_build: Vec<Vec<BodyMember>>,
    /// Activation-time members per parameter.
    unary_dynamic: Vec<Vec<BodyMember>>,
    /// Construction-time members per normalized parameter pair (`i * k + j`).
    binary_build: Vec<Vec<BodyMember>>,
    /// Activation-time members per normalized parameter pair.
    binary_dynamic: Vec<Vec<BodyMember>>,
}

fn expression_reads(
    expression: Index<Expression>,
    repository: &Repository,
    fluent: &mut bool,
    auxiliary: &mut bool,
) {
    match repository.expressions.resolve(expression) {
        ExpressionData::Number(_) | ExpressionData::StaticTerm(_) => {}
        ExpressionData::Negate(arg) => expression_reads(*arg, repository, fluent, auxiliary),
        ExpressionData::Binary { lhs, rhs, .. } => {
            expression_reads(*lhs, repository, fluent, auxiliary);
            expression_reads(*rhs, repository, fluent, auxiliary);
        }
        ExpressionData::Multi { args, .. } => {
            for &arg in args {
                expression_reads(arg, repository, fluent, auxiliary);
            }
        }
        ExpressionData::FluentTerm(_) => *fluent = true,
        ExpressionData::AuxiliaryTerm(_) => *auxiliary = true,
    }
}

impl BodyInfo {
    /// Index a rule body for graph checks.
    pub fn compute(condition: &ConditionData, repository: &Repository) -> Self {
        let k = condition.variables.len();
        let mut body = BodyInfo {
            arity: k,
            unary_build: vec![Vec::new(); k],
            unary_dynamic: vec![Vec::new(); k],
            binary_build: vec![Vec::new(); k * k],
            binary_dynamic: vec![Vec::new(); k * k],
            ..Default::default()
        };

        let literal =
            |predicate: u32, polarity: bool, is_static: bool, terms: &[crate::ir::Term]| {
                let mut args = Vec::with_capacity(terms.len());
                let mut params = Vec::new();
                for &term in terms {
                    match term {
                        crate::ir::Term::Object(o) => args.push(ArgInfo::Constant(o)),
                        crate::ir::Term::Variable(v) => {
                            let p = repository.variables.resolve(v).parameter;
                            args.push(ArgInfo::Parameter(p));
                            params.push(p);
                        }
                    }
                }
                params.sort_unstable();
                params.dedup();
                LiteralInfo {
                    predicate,
                    polarity,
                    is_static,
                    args,
                    params,
                }
            };

        for lit in &condition.static_literals {
            let atom = repository.static_atoms.resolve(lit.atom);
            body.static_literals
                .push(literal(lit.atom.group, lit.polarity, true, &atom.terms));
        }
        for lit in &condition.fluent_literals {
            let atom = repository.fluent_atoms.resolve(lit.atom);
            body.fluent_literals
                .push(literal(lit.atom.group, lit.polarity, false, &atom.terms));
        }
        for &constraint in &condition.constraints {
            let mut params = Vec::new();
            crate::analysis::dependency::expression_parameters(
                constraint.lhs,
                repository,
                &mut params,
            );
            crate::analysis::dependency::expression_parameters(
                constraint.rhs,
                repository,
                &mut params,
            );
            params.sort_unstable();
            params.dedup();
            let mut fluent = false;
            let mut auxiliary = false;
            expression_reads(constraint.lhs, repository, &mut fluent, &mut auxiliary);
            expression_reads(constraint.rhs, repository, &mut fluent, &mut auxiliary);
            body.constraints.push(ConstraintInfo {
                constraint,
                params,
                static_only: !fluent,
                has_auxiliary: auxiliary,
            });
        }

        // Classification. A positive literal or a constraint contributes
        // its partial projection to the unary check of every parameter it
        // mentions and the binary check of every parameter pair; the
        // assignment sets answer exactly those projections. A negated
        // literal is only usable when fully determined, so it enters a
        // check iff its parameter set is exactly the checked one.
        // Members mentioning more than two parameters stay partially
        // encoded; their exact evaluation is the applicability check's.
        let k32 = k as u32;
        let classify = |params: &[u32],
                            exact_only: bool,
                            build: bool,
                            member: BodyMember,
                            body: &mut BodyInfo| {
            let (unary, binary) = if build {
                (&mut body.unary_build, &mut body.binary_build)
            } else {
                (&mut body.unary_dynamic, &mut body.binary_dynamic)
            };
            if exact_only {
                match params {
                    [p] => unary[*p as usize].push(member),
                    [p, q] => binary[*p as usize * k + *q as usize].push(member),
                    _ => {}
                }
                return;
            }
            for &p in params {
                debug_assert!(p < k32);
                unary[p as usize].push(member);
            }
            for (a, &p) in params.iter().enumerate() {
                for &q in &params[a + 1..] {
                    binary[p as usize * k + q as usize].push(member);
                }
            }
        };

        for i in 0..body.static_literals.len() {
            let params = body.static_literals[i].params.clone();
            let negated = !body.static_literals[i].polarity;
            classify(
                &params,
                negated,
                true,
                BodyMember::StaticLiteral(i as u32),
                &mut body,
            );
        }
        for i in 0..body.fluent_literals.len() {
            let params = body.fluent_literals[i].params.clone();
            let negated = !body.fluent_literals[i].polarity;
            classify(
                &params,
                negated,
                false,
                BodyMember::FluentLiteral(i as u32),
                &mut body,
            );
        }
        for i in 0..body.constraints.len() {
            if body.constraints[i].has_auxiliary {
                continue;
            }
            let params = body.constraints[i].params.clone();
            let build = body.constraints[i].static_only;
            classify(
                &params,
                false,
                build,
                BodyMember::Constraint(i as u32),
                &mut body,
            );
        }

        body
    }

    fn binary_pair(&self, pi: u32, pj: u32) -> (&[BodyMember], &[BodyMember]) {
        let (i, j) = if pi <= pj { (pi, pj) } else { (pj, pi) };
        let cell = i as usize * self.arity + j as usize;
        (&self.binary_build[cell], &self.binary_dynamic[cell])
    }
}

/// The parameter assignments a check has determined.
#[derive(Debug, Clone, Copy)]
enum Bound {
    One(u32, Index<Object>),
    Two(u32, Index<Object>, u32, Index<Object>),
}

impl Bound {
    #[inline]
    fn param(self, q: u32) -> Option<Index<Object>> {
        match self {
            Bound::One(p, o) => (p == q).then_some(o),
            Bound::Two(p1, o1, p2, o2) => {
                if q == p1 {
                    Some(o1)
                } else if q == p2 {
                    Some(o2)
                } else {
                    None
                }
            }
        }
    }

    #[inline]
    fn arg(self, arg: ArgInfo) -> Option<Index<Object>> {
        match arg {
            ArgInfo::Constant(c) => Some(c),
            ArgInfo::Parameter(q) => self.param(q),
        }
    }
}

fn positive_consistent<T: FactKind>(
    info: &LiteralInfo,
    bound: Bound,
    set: &PredicateAssignmentSet<T>,
) -> bool {
    // Per-argument singleton check, then per-pair check, both over the
    // determined arguments only; positions bound to other parameters are
    // left to coarser checks and to the applicability check.
    for (i, &arg) in info.args.iter().enumerate() {
        let Some(object) = bound.arg(arg) else {
            continue;
        };
        if !set.contains_single(i as u32, object) {
            return false;
        }
    }
    for (i, &ai) in info.args.iter().enumerate() {
        for (j, &aj) in info.args.iter().enumerate().skip(i + 1) {
            let (Some(oi), Some(oj)) = (bound.arg(ai), bound.arg(aj)) else {
                continue;
            };
            if !set.contains_pair(i as u32, oi, j as u32, oj) {
                return false;
            }
        }
    }
    true
}

fn literal_consistent(
    info: &LiteralInfo,
    bound: Bound,
    repository: &Repository,
    facts: &FactSets,
    assignment: &AssignmentSets,
    builders: &mut Builders,
) -> bool {
    if info.polarity {
        if info.is_static {
            positive_consistent(info, bound, assignment.static_predicates.get(info.predicate))
        } else {
            positive_consistent(info, bound, assignment.fluent_predicates.get(info.predicate))
        }
    } else if info.is_static {
        // Fully determined: the negated atom must be absent.
        let scratch = builders.static_atom();
        scratch.predicate = Some(Index::new(info.predicate));
        for &arg in &info.args {
            let Some(object) = bound.arg(arg) else {
                return true;
            };
            scratch.objects.push(object);
        }
        match repository.static_ground_atoms.find(info.predicate, scratch) {
            Some(index) => !facts.static_atoms.contains(index),
            None => true,
        }
    } else {
        let scratch = builders.fluent_atom();
        scratch.predicate = Some(Index::new(info.predicate));
        for &arg in &info.args {
            let Some(object) = bound.arg(arg) else {
                return true;
            };
            scratch.objects.push(object);
        }
        match repository.fluent_ground_atoms.find(info.predicate, scratch) {
            Some(index) => !facts.fluent_atoms.contains(index),
            None => true,
        }
    }
}

fn interval_eval(
    expression: Index<Expression>,
    bound: Bound,
    repository: &Repository,
    assignment: &AssignmentSets,
) -> Interval {
    match repository.expressions.resolve(expression) {
        ExpressionData::Number(n) => Interval::point(n.0),
        ExpressionData::Negate(arg) => interval_eval(*arg, bound, repository, assignment).neg(),
        ExpressionData::Binary { op, lhs, rhs } => {
            let l = interval_eval(*lhs, bound, repository, assignment);
            let r = interval_eval(*rhs, bound, repository, assignment);
            match op {
                crate::ir::ArithmeticOp::Add => l.add(r),
                crate::ir::ArithmeticOp::Sub => l.sub(r),
                crate::ir::ArithmeticOp::Mul => l.mul(r),
                crate::ir::ArithmeticOp::Div => l.div(r),
            }
        }
        ExpressionData::Multi { op, args } => {
            let mut iv = Interval::point(op.identity());
            for &arg in args {
                let a = interval_eval(arg, bound, repository, assignment);
                iv = match op {
                    crate::ir::MultiOp::Add => iv.add(a),
                    crate::ir::MultiOp::Mul => iv.mul(a),
                };
            }
            iv
        }
        ExpressionData::StaticTerm(ft) => {
            let fterm = repository.static_fterms.resolve(*ft);
            let set = assignment.static_functions.get(fterm.function.value());
            let mut iv = set.global_bound();
            for (position, &term) in fterm.terms.iter().enumerate() {
                let object = match term {
                    crate::ir::Term::Object(o) => Some(o),
                    crate::ir::Term::Variable(v) => {
                        bound.param(repository.variables.resolve(v).parameter)
                    }
                };
                if let Some(object) = object {
                    iv = iv.intersect(set.single_bound(position as u32, object));
                }
            }
            iv
        }
        ExpressionData::FluentTerm(ft) => {
            let fterm = repository.fluent_fterms.resolve(*ft);
            let set = assignment.fluent_functions.get(fterm.function.value());
            let mut iv = set.global_bound();
            for (position, &term) in fterm.terms.iter().enumerate() {
                let object = match term {
                    crate::ir::Term::Object(o) => Some(o),
                    crate::ir::Term::Variable(v) => {
                        bound.param(repository.variables.resolve(v).parameter)
                    }
                };
                if let Some(object) = object {
                    iv = iv.intersect(set.single_bound(position as u32, object));
                }
            }
            iv
        }
        ExpressionData::AuxiliaryTerm(_) => Interval::UNBOUNDED,
    }
}

fn constraint_consistent(
    info: &ConstraintInfo,
    bound: Bound,
    repository: &Repository,
    assignment: &AssignmentSets,
) -> bool {
    let lhs = interval_eval(info.constraint.lhs, bound, repository, assignment);
    let rhs = interval_eval(info.constraint.rhs, bound, repository, assignment);
    Interval::maybe(info.constraint.op, lhs, rhs)
}

fn members_consistent(
    members: &[BodyMember],
    body: &BodyInfo,
    bound: Bound,
    repository: &Repository,
    facts: &FactSets,
    assignment: &AssignmentSets,
    builders: &mut Builders,
) -> bool {
    members.iter().all(|member| match *member {
        BodyMember::StaticLiteral(i) => literal_consistent(
            &body.static_literals[i as usize],
            bound,
            repository,
            facts,
            assignment,
            builders,
        ),
        BodyMember::FluentLiteral(i) => literal_consistent(
            &body.fluent_literals[i as usize],
            bound,
            repository,
            facts,
            assignment,
            builders,
        ),
        BodyMember::Constraint(i) => {
            constraint_consistent(&body.constraints[i as usize], bound, repository, assignment)
        }
    })
}

/// A vertex: one `(parameter, object)` binding candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphVertex {
    /// Partition.
    pub parameter: u32,
    /// Bound object.
    pub object: Index<Object>,
}

/// A statically consistent edge between two partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge {
    /// Global index of the lower-partition endpoint.
    pub src: u32,
    /// Global index of the higher-partition endpoint.
    pub dst: u32,
}

/// The per-rule static graph plus its indexed body.
#[derive(Debug, Clone)]
pub struct StaticConsistencyGraph {
    /// Bit layout of the partitioned vertex space.
    pub layout: GraphLayout,
    /// Parameter-pair dependency structure; decides cell modes.
    pub dependency: VariableDependencyGraph,
    /// Vertices, contiguous by partition.
    pub vertices: Vec<GraphVertex>,
    /// Statically consistent edges between co-constrained partitions.
    pub edges: Vec<GraphEdge>,
    /// The indexed rule body.
    pub body: BodyInfo,
}

impl StaticConsistencyGraph {
    /// Build the graph for a rule body over the analysis domains.
    pub fn build(
        condition: &ConditionData,
        repository: &Repository,
        parameter_domains: &[Vec<Index<Object>>],
        facts: &FactSets,
        assignment: &AssignmentSets,
        builders: &mut Builders,
    ) -> Self {
        let body = BodyInfo::compute(condition, repository);
        let dependency = VariableDependencyGraph::build(condition, repository);
        let k = condition.variables.len();

        let mut vertices = Vec::new();
        let mut partition_sizes = Vec::with_capacity(k);
        for p in 0..k {
            let before = vertices.len();
            for &object in &parameter_domains[p] {
                let bound = Bound::One(p as u32, object);
                if members_consistent(
                    &body.unary_build[p],
                    &body,
                    bound,
                    repository,
                    facts,
                    assignment,
                    builders,
                ) {
                    vertices.push(GraphVertex {
                        parameter: p as u32,
                        object,
                    });
                }
            }
            partition_sizes.push((vertices.len() - before) as u32);
        }
        let layout = GraphLayout::new(partition_sizes);

        let mut edges = Vec::new();
        for pi in 0..k as u32 {
            for pj in pi + 1..k as u32 {
                if dependency.is_independent(pi, pj) {
                    continue;
                }
                let members = &body.binary_build[pi as usize * k + pj as usize];
                let (src_base, src_n) = (
                    layout.vertex_offset[pi as usize],
                    layout.partition_sizes[pi as usize],
                );
                let (dst_base, dst_n) = (
                    layout.vertex_offset[pj as usize],
                    layout.partition_sizes[pj as usize],
                );
                for si in 0..src_n {
                    for di in 0..dst_n {
                        let src = src_base + si;
                        let dst = dst_base + di;
                        let bound = Bound::Two(
                            pi,
                            vertices[src as usize].object,
                            pj,
                            vertices[dst as usize].object,
                        );
                        if members_consistent(
                            members,
                            &body,
                            bound,
                            repository,
                            facts,
                            assignment,
                            builders,
                        ) {
                            edges.push(GraphEdge { src, dst });
                        }
                    }
                }
            }
        }

        StaticConsistencyGraph {
            layout,
            dependency,
            vertices,
            edges,
            body,
        }
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of statically consistent edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }
}

/// Read/write masks driving monotone activation of the dynamic graph.
#[derive(Debug, Clone, Default)]
pub struct DeltaActivation {
    remaining_vertices: DynamicBitset,
    remaining_edges: DynamicBitset,
}

impl DeltaActivation {
    /// All vertices and edges pending activation.
    pub fn new(graph: &StaticConsistencyGraph) -> Self {
        let mut activation = DeltaActivation {
            remaining_vertices: DynamicBitset::new(graph.num_vertices()),
            remaining_edges: DynamicBitset::new(graph.num_edges()),
        };
        activation.reset();
        activation
    }

    /// Back to the initial all-pending state.
    pub fn reset(&mut self) {
        self.remaining_vertices.set_all();
        self.remaining_edges.set_all();
    }

    /// Activate every still-pending vertex and edge that the current
    /// fluent assignment sets admit. Newly activated elements form the
    /// iteration's delta.
    pub fn advance(
        &mut self,
        graph: &StaticConsistencyGraph,
        delta: &mut DeltaGraph,
        repository: &Repository,
        facts: &FactSets,
        assignment: &AssignmentSets,
        builders: &mut Builders,
    ) {
        delta.begin_iteration(&graph.layout);

        for v in 0..graph.vertices.len() {
            if !self.remaining_vertices.test(v) {
                continue;
            }
            let vertex = graph.vertices[v];
            let bound = Bound::One(vertex.parameter, vertex.object);
            if members_consistent(
                &graph.body.unary_dynamic[vertex.parameter as usize],
                &graph.body,
                bound,
                repository,
                facts,
                assignment,
                builders,
            ) {
                delta.activate_vertex(&graph.layout, v as u32);
                self.remaining_vertices.unset(v);
            }
        }

        // Edges activate only once both endpoints are in.
        for e in 0..graph.edges.len() {
            if !self.remaining_edges.test(e) {
                continue;
            }
            let edge = graph.edges[e];
            if !delta.affected.test(&graph.layout, edge.src)
                || !delta.affected.test(&graph.layout, edge.dst)
            {
                continue;
            }
            let pi = graph.layout.vertex_to_partition[edge.src as usize];
            let pj = graph.layout.vertex_to_partition[edge.dst as usize];
            let (_, dynamic_members) = graph.body.binary_pair(pi, pj);
            let bound = Bound::Two(
                pi,
                graph.vertices[edge.src as usize].object,
                pj,
                graph.vertices[edge.dst as usize].object,
            );
            if members_consistent(
                dynamic_members,
                &graph.body,
                bound,
                repository,
                facts,
                assignment,
                builders,
            ) {
                delta.activate_edge(&graph.layout, edge.src, edge.dst);
                self.remaining_edges.unset(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        AtomData, GroundAtomData, GroupIndex, Literal, ObjectData, PredicateData, Term,
        VariableData,
    };

    /// gripper-like fixture: static pred room/1 and ball/1, fluent pred
    /// at/2. Rule body: ball(x), room(y), at(x, y).
    struct Fixture {
        repo: Repository,
        condition: ConditionData,
        facts: FactSets,
        assignment: AssignmentSets,
        domains: Vec<Vec<Index<Object>>>,
    }

    fn fixture() -> Fixture {
        let mut repo = Repository::new();
        let b1 = repo.objects.get_or_create(&ObjectData { name: "b1".into() }).0;
        let b2 = repo.objects.get_or_create(&ObjectData { name: "b2".into() }).0;
        let r1 = repo.objects.get_or_create(&ObjectData { name: "r1".into() }).0;
        let r2 = repo.objects.get_or_create(&ObjectData { name: "r2".into() }).0;

        repo.static_predicates
            .get_or_create(&PredicateData::new("ball", 1));
        repo.static_predicates
            .get_or_create(&PredicateData::new("room", 1));
        repo.fluent_predicates
            .get_or_create(&PredicateData::new("at", 2));

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
        let (room_y, _) = repo.static_atoms.get_or_create(
            1,
            &AtomData {
                predicate: Index::new(1),
                terms: vec![Term::Variable(y)],
            },
        );
        let (at_xy, _) = repo.fluent_atoms.get_or_create(
            0,
            &AtomData {
                predicate: Index::new(0),
                terms: vec![Term::Variable(x), Term::Variable(y)],
            },
        );

        let condition = ConditionData {
            variables: vec![x, y],
            static_literals: vec![
                Literal {
                    atom: ball_x,
                    polarity: true,
                },
                Literal {
                    atom: room_y,
                    polarity: true,
                },
            ],
            fluent_literals: vec![Literal {
                atom: at_xy,
                polarity: true,
            }],
            ..Default::default()
        };

        let mut facts = FactSets::new();
        let mut assignment = AssignmentSets::for_repository(&repo);
        for (group, object) in [(0u32, b1), (0, b2), (1, r1), (1, r2)] {
            let data = GroundAtomData::new(Index::new(group), vec![object]);
            let (idx, _) = repo.static_ground_atoms.get_or_create(group, &data);
            facts.static_atoms.insert(idx);
            assignment.static_predicates.insert(group, &data);
        }

        let domains = vec![vec![b1, b2], vec![r1, r2]];
        Fixture {
            repo,
            condition,
            facts,
            assignment,
            domains,
        }
    }

    fn insert_at(fixture: &mut Fixture, ball: u32, room: u32) {
        let data = GroundAtomData::new(
            Index::new(0),
            vec![Index::new(ball), Index::new(room)],
        );
        let (idx, _) = fixture.repo.fluent_ground_atoms.get_or_create(0, &data);
        fixture.facts.fluent_atoms.insert(idx);
        fixture.assignment.fluent_predicates.insert(0, &data);
    }

    #[test]
    fn test_build_keeps_statically_consistent_vertices() {
        let f = fixture();
        let mut builders = Builders::new();
        let graph = StaticConsistencyGraph::build(
            &f.condition,
            &f.repo,
            &f.domains,
            &f.facts,
            &f.assignment,
            &mut builders,
        );
        // Partition 0: both balls; partition 1: both rooms.
        assert_eq!(graph.layout.partition_sizes, vec![2, 2]);
        // at(x, y) makes (x, y) co-constrained: all four pairs pass the
        // static side.
        assert_eq!(graph.num_edges(), 4);
    }

    #[test]
    fn test_activation_follows_fluent_assignment_sets() {
        let mut f = fixture();
        let mut builders = Builders::new();
        let graph = StaticConsistencyGraph::build(
            &f.condition,
            &f.repo,
            &f.domains,
            &f.facts,
            &f.assignment,
            &mut builders,
        );
        let mut delta = DeltaGraph::new(&graph.layout, &graph.dependency);
        let mut activation = DeltaActivation::new(&graph);

        // No `at` facts yet: nothing activates.
        activation.advance(
            &graph,
            &mut delta,
            &f.repo,
            &f.facts,
            &f.assignment,
            &mut builders,
        );
        assert!(!delta.affected.any());

        // at(b1, r1): exactly the b1 and r1 vertices and their edge.
        insert_at(&mut f, 0, 2);
        activation.advance(
            &graph,
            &mut delta,
            &f.repo,
            &f.facts,
            &f.assignment,
            &mut builders,
        );
        assert!(delta.affected.test(&graph.layout, 0)); // b1
        assert!(!delta.affected.test(&graph.layout, 1)); // b2
        assert!(delta.affected.test(&graph.layout, 2)); // r1
        assert!(!delta.affected.test(&graph.layout, 3)); // r2
        assert!(delta.matrix.test_explicit(&graph.layout, 0, 2));
        assert!(!delta.matrix.test_explicit(&graph.layout, 0, 3));

        // Next iteration without new facts: no delta.
        activation.advance(
            &graph,
            &mut delta,
            &f.repo,
            &f.facts,
            &f.assignment,
            &mut builders,
        );
        assert!(!delta.delta_vertices.any());
        assert!(!delta.delta_candidates.any());
    }
}
