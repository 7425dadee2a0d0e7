//! The lifted task
//!
//! Translates the parsed-task input into the Datalog IR. Every action
//! schema becomes an abstract header predicate plus rules: the header rule
//! derives `@action(params)` from the precondition, and one effect rule
//! per added atom derives the atom from the header and the effect
//! condition. Axioms become rules over their derived predicates. The
//! successor program carries axiom and header rules only (exact
//! applicability against a state); the relaxed-planning-graph program adds
//! the effect rules (delete-relaxed reachability).

use super::input::{
    ActionInput, AtomInput, ComparisonInput, ConditionInput, ExpressionInput, NumericEffectInput,
    NumericEffectOpInput, RoleInput, TaskInput,
};
use super::state::State;
use crate::engine::EngineConfig;
use crate::error::{GroundError, Result};
use crate::ir::canonical::{canonicalize_condition, canonicalize_constraint, canonicalize_expression};
use crate::ir::repository::{GroupedLookup, Lookup};
use crate::ir::{
    ArithmeticOp, Atom, AtomData, ComparisonOp, Condition, ConditionData, Expression,
    ExpressionData, Fluent, FunctionData, FunctionTerm, FunctionTermData, GroundAtom,
    GroundAtomData, GroundFunctionTerm, GroundFunctionTermData, GroupIndex, Index, Literal,
    MultiOp, Number, NumericConstraint, Object, ObjectData, PredicateData, Program, Repository,
    RuleData, Static, Term, VariableData,
};
use ahash::AHashMap;

/// A numeric effect operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericEffectOp {
    /// Overwrite.
    Assign,
    /// Add.
    Increase,
    /// Subtract.
    Decrease,
    /// Multiply.
    ScaleUp,
    /// Divide.
    ScaleDown,
}

impl NumericEffectOp {
    /// Combine the old value with the effect value. NaN results mark the
    /// effect inapplicable.
    pub fn apply(self, old: f64, value: f64) -> f64 {
        match self {
            NumericEffectOp::Assign => value,
            NumericEffectOp::Increase => old + value,
            NumericEffectOp::Decrease => old - value,
            NumericEffectOp::ScaleUp => old * value,
            NumericEffectOp::ScaleDown => {
                if value == 0.0 {
                    f64::NAN
                } else {
                    old / value
                }
            }
        }
    }
}

/// A translated numeric effect.
#[derive(Debug, Clone)]
pub struct NumericEffectSchema {
    /// Operation.
    pub op: NumericEffectOp,
    /// Target fluent function term.
    pub fterm: Index<FunctionTerm<Fluent>>,
    /// Value expression.
    pub value: Index<Expression>,
}

/// A translated conditional effect.
#[derive(Debug, Clone)]
pub struct EffectSchema {
    /// Effect condition; the empty condition for unconditional effects.
    pub condition: Index<Condition>,
    /// Added atoms.
    pub add: Vec<GroupIndex<Atom<Fluent>>>,
    /// Deleted atoms.
    pub del: Vec<GroupIndex<Atom<Fluent>>>,
    /// Numeric effects.
    pub numeric: Vec<NumericEffectSchema>,
}

/// A translated action schema.
#[derive(Debug, Clone)]
pub struct ActionSchema {
    /// Name.
    pub name: String,
    /// Number of parameters.
    pub arity: usize,
    /// Cost.
    pub cost: u32,
    /// Precondition.
    pub precondition: Index<Condition>,
    /// Fluent group of the action's header predicate.
    pub header: u32,
    /// Conditional effects.
    pub effects: Vec<EffectSchema>,
}

/// The lifted task: IR, translated schemas, both programs, and the run
/// seeds.
#[derive(Debug)]
pub struct LiftedTask {
    /// The shared program repository.
    pub repository: Repository,
    /// Engine configuration.
    pub config: EngineConfig,
    /// Translated action schemas, in input order.
    pub actions: Vec<ActionSchema>,
    /// Number of axiom rules.
    pub num_axioms: usize,
    /// Per fluent group: defined by axioms.
    pub fluent_is_derived: Vec<bool>,
    /// Per fluent group: an action header.
    pub fluent_is_header: Vec<bool>,
    /// Header fluent group -> action position.
    pub header_to_action: AHashMap<u32, u32>,
    /// Axiom rules + header rules.
    pub successor_program: Program,
    /// Axiom rules + header rules + effect rules.
    pub rpg_program: Program,
    /// Initial fluent atoms.
    pub init_atoms: Vec<GroupIndex<GroundAtom<Fluent>>>,
    /// Initial fluent function values.
    pub init_values: Vec<(Index<GroundFunctionTerm<Fluent>>, f64)>,
    /// Static function values.
    pub static_values: Vec<(Index<GroundFunctionTerm<Static>>, f64)>,
    /// Goal atoms (fluent or derived).
    pub goal: Vec<GroupIndex<GroundAtom<Fluent>>>,
    /// A static goal atom is false: every state is a dead end.
    pub goal_unreachable: bool,
}

#[derive(Debug, Clone, Copy)]
enum PredRef {
    Static(u32),
    Fluent(u32),
}

#[derive(Debug, Clone, Copy)]
enum FnRef {
    Static(u32),
    Fluent(u32),
    Auxiliary(u32),
}

struct Translator {
    repo: Repository,
    objects: AHashMap<String, Index<Object>>,
    predicates: AHashMap<String, PredRef>,
    functions: AHashMap<String, FnRef>,
    fluent_is_derived: Vec<bool>,
    fluent_is_header: Vec<bool>,
}

/// The parameter scope of one schema.
struct Scope {
    params: AHashMap<String, u32>,
    variables: Vec<Index<crate::ir::Variable>>,
}

impl Translator {
    fn resolve_term(&self, name: &str, scope: &Scope) -> Result<Term> {
        if let Some(&position) = scope.params.get(name) {
            return Ok(Term::Variable(scope.variables[position as usize]));
        }
        if let Some(&object) = self.objects.get(name) {
            return Ok(Term::Object(object));
        }
        Err(GroundError::InvalidProgram(format!(
            "unknown term '{name}'"
        )))
    }

    fn resolve_object(&self, name: &str) -> Result<Index<Object>> {
        self.objects.get(name).copied().ok_or_else(|| {
            GroundError::InvalidProgram(format!("unknown object '{name}'"))
        })
    }

    fn check_arity(name: &str, expected: u32, found: usize) -> Result<()> {
        if expected as usize != found {
            return Err(GroundError::ArityMismatch {
                name: name.to_string(),
                expected: expected as usize,
                found,
            });
        }
        Ok(())
    }

    fn predicate(&self, name: &str) -> Result<PredRef> {
        self.predicates
            .get(name)
            .copied()
            .ok_or_else(|| GroundError::UndefinedPredicate(name.to_string()))
    }

    fn function(&self, name: &str) -> Result<FnRef> {
        self.functions
            .get(name)
            .copied()
            .ok_or_else(|| GroundError::UndefinedFunction(name.to_string()))
    }

    fn terms(&self, args: &[String], scope: &Scope) -> Result<Vec<Term>> {
        args.iter().map(|a| self.resolve_term(a, scope)).collect()
    }

    fn expression(&mut self, input: &ExpressionInput, scope: &Scope) -> Result<Index<Expression>> {
        let mut data = match input {
            ExpressionInput::Number(v) => ExpressionData::Number(Number(*v)),
            ExpressionInput::Neg { neg } => ExpressionData::Negate(self.expression(neg, scope)?),
            ExpressionInput::Binary { op, lhs, rhs } => {
                let op = match op.as_str() {
                    "+" => ArithmeticOp::Add,
                    "-" => ArithmeticOp::Sub,
                    "*" => ArithmeticOp::Mul,
                    "/" => ArithmeticOp::Div,
                    other => {
                        return Err(GroundError::InvalidProgram(format!(
                            "unknown arithmetic operator '{other}'"
                        )))
                    }
                };
                ExpressionData::Binary {
                    op,
                    lhs: self.expression(lhs, scope)?,
                    rhs: self.expression(rhs, scope)?,
                }
            }
            ExpressionInput::Multi { op, args } => {
                let op = match op.as_str() {
                    "+" => MultiOp::Add,
                    "*" => MultiOp::Mul,
                    other => {
                        return Err(GroundError::InvalidProgram(format!(
                            "unknown variadic operator '{other}'"
                        )))
                    }
                };
                let args = args
                    .iter()
                    .map(|a| self.expression(a, scope))
                    .collect::<Result<Vec<_>>>()?;
                ExpressionData::Multi { op, args }
            }
            ExpressionInput::Fn { function, args } => {
                let terms = self.terms(args, scope)?;
                match self.function(function)? {
                    FnRef::Static(f) => {
                        Self::check_arity(
                            function,
                            self.repo.static_functions.resolve(Index::new(f)).arity,
                            terms.len(),
                        )?;
                        let (ft, _) = self.repo.static_fterms.get_or_create(&FunctionTermData {
                            function: Index::new(f),
                            terms,
                        });
                        ExpressionData::StaticTerm(ft)
                    }
                    FnRef::Fluent(f) => {
                        Self::check_arity(
                            function,
                            self.repo.fluent_functions.resolve(Index::new(f)).arity,
                            terms.len(),
                        )?;
                        let (ft, _) = self.repo.fluent_fterms.get_or_create(&FunctionTermData {
                            function: Index::new(f),
                            terms,
                        });
                        ExpressionData::FluentTerm(ft)
                    }
                    FnRef::Auxiliary(f) => {
                        Self::check_arity(
                            function,
                            self.repo.auxiliary_functions.resolve(Index::new(f)).arity,
                            terms.len(),
                        )?;
                        let (ft, _) =
                            self.repo.auxiliary_fterms.get_or_create(&FunctionTermData {
                                function: Index::new(f),
                                terms,
                            });
                        ExpressionData::AuxiliaryTerm(ft)
                    }
                }
            }
        };
        canonicalize_expression(&mut data);
        Ok(self.repo.expressions.get_or_create(&data).0)
    }

    fn fluent_atom(
        &mut self,
        group: u32,
        args: &[String],
        scope: &Scope,
        name: &str,
    ) -> Result<GroupIndex<Atom<Fluent>>> {
        Self::check_arity(
            name,
            self.repo.fluent_predicates.resolve(Index::new(group)).arity,
            args.len(),
        )?;
        let terms = self.terms(args, scope)?;
        Ok(self
            .repo
            .fluent_atoms
            .get_or_create(
                group,
                &AtomData {
                    predicate: Index::new(group),
                    terms,
                },
            )
            .0)
    }

    /// Translate a condition into interned form over `scope`.
    fn condition(&mut self, input: &ConditionInput, scope: &Scope) -> Result<ConditionData> {
        let mut condition = ConditionData {
            variables: scope.variables.clone(),
            ..Default::default()
        };

        for literal in &input.literals {
            match self.predicate(&literal.predicate)? {
                PredRef::Static(group) => {
                    Self::check_arity(
                        &literal.predicate,
                        self.repo.static_predicates.resolve(Index::new(group)).arity,
                        literal.args.len(),
                    )?;
                    let terms = self.terms(&literal.args, scope)?;
                    let (atom, _) = self.repo.static_atoms.get_or_create(
                        group,
                        &AtomData {
                            predicate: Index::new(group),
                            terms,
                        },
                    );
                    condition.static_literals.push(Literal {
                        atom,
                        polarity: literal.polarity,
                    });
                }
                PredRef::Fluent(group) => {
                    let atom =
                        self.fluent_atom(group, &literal.args, scope, &literal.predicate)?;
                    condition.fluent_literals.push(Literal {
                        atom,
                        polarity: literal.polarity,
                    });
                }
            }
        }

        for constraint in &input.constraints {
            let op = match constraint.op {
                ComparisonInput::Eq => ComparisonOp::Eq,
                ComparisonInput::Ne => ComparisonOp::Ne,
                ComparisonInput::Lt => ComparisonOp::Lt,
                ComparisonInput::Le => ComparisonOp::Le,
                ComparisonInput::Gt => ComparisonOp::Gt,
                ComparisonInput::Ge => ComparisonOp::Ge,
            };
            let mut numeric = NumericConstraint {
                op,
                lhs: self.expression(&constraint.lhs, scope)?,
                rhs: self.expression(&constraint.rhs, scope)?,
            };
            canonicalize_constraint(&mut numeric);
            condition.constraints.push(numeric);
        }

        canonicalize_condition(&mut condition);
        Ok(condition)
    }

    fn intern_condition(&mut self, condition: &ConditionData) -> Index<Condition> {
        self.repo.conditions.get_or_create(condition).0
    }

    fn scope(&mut self, parameters: &[String]) -> Result<Scope> {
        let mut params = AHashMap::new();
        let mut variables = Vec::with_capacity(parameters.len());
        for (position, name) in parameters.iter().enumerate() {
            if params.insert(name.clone(), position as u32).is_some() {
                return Err(GroundError::InvalidProgram(format!(
                    "duplicate parameter '{name}'"
                )));
            }
            let (variable, _) = self.repo.variables.get_or_create(&VariableData {
                name: name.clone(),
                parameter: position as u32,
            });
            variables.push(variable);
        }
        Ok(Scope { params, variables })
    }
}

fn constant_cost(input: &Option<ExpressionInput>) -> u32 {
    // Non-constant cost expressions fall back to unit cost; the ground
    // action still records the fold.
    match input {
        Some(ExpressionInput::Number(v)) if *v >= 0.0 => *v as u32,
        _ => 1,
    }
}

impl LiftedTask {
    /// Translate a parsed task.
    pub fn new(input: TaskInput, config: EngineConfig) -> Result<Self> {
        let mut translator = Translator {
            repo: Repository::new(),
            objects: AHashMap::new(),
            predicates: AHashMap::new(),
            functions: AHashMap::new(),
            fluent_is_derived: Vec::new(),
            fluent_is_header: Vec::new(),
        };

        for name in &input.objects {
            let (object, inserted) = translator
                .repo
                .objects
                .get_or_create(&ObjectData { name: name.clone() });
            if !inserted {
                return Err(GroundError::InvalidProgram(format!(
                    "duplicate object '{name}'"
                )));
            }
            translator.objects.insert(name.clone(), object);
        }

        for predicate in &input.domain.predicates {
            let reference = match predicate.role {
                RoleInput::Static => {
                    let (index, _) = translator
                        .repo
                        .static_predicates
                        .get_or_create(&PredicateData::new(predicate.name.clone(), predicate.arity));
                    PredRef::Static(index.value())
                }
                RoleInput::Fluent | RoleInput::Derived => {
                    let (index, _) = translator
                        .repo
                        .fluent_predicates
                        .get_or_create(&PredicateData::new(predicate.name.clone(), predicate.arity));
                    translator
                        .fluent_is_derived
                        .push(predicate.role == RoleInput::Derived);
                    translator.fluent_is_header.push(false);
                    PredRef::Fluent(index.value())
                }
                RoleInput::Auxiliary => {
                    return Err(GroundError::InvalidProgram(format!(
                        "predicate '{}' cannot be auxiliary",
                        predicate.name
                    )))
                }
            };
            if translator
                .predicates
                .insert(predicate.name.clone(), reference)
                .is_some()
            {
                return Err(GroundError::InvalidProgram(format!(
                    "duplicate predicate '{}'",
                    predicate.name
                )));
            }
        }

        for function in &input.domain.functions {
            let reference = match function.role {
                RoleInput::Static => FnRef::Static(
                    translator
                        .repo
                        .static_functions
                        .get_or_create(&FunctionData::new(function.name.clone(), function.arity))
                        .0
                        .value(),
                ),
                RoleInput::Fluent => FnRef::Fluent(
                    translator
                        .repo
                        .fluent_functions
                        .get_or_create(&FunctionData::new(function.name.clone(), function.arity))
                        .0
                        .value(),
                ),
                RoleInput::Auxiliary => FnRef::Auxiliary(
                    translator
                        .repo
                        .auxiliary_functions
                        .get_or_create(&FunctionData::new(function.name.clone(), function.arity))
                        .0
                        .value(),
                ),
                RoleInput::Derived => {
                    return Err(GroundError::InvalidProgram(format!(
                        "function '{}' cannot be derived",
                        function.name
                    )))
                }
            };
            if translator
                .functions
                .insert(function.name.clone(), reference)
                .is_some()
            {
                return Err(GroundError::InvalidProgram(format!(
                    "duplicate function '{}'",
                    function.name
                )));
            }
        }

        // Axiom rules are shared by both programs.
        let mut axiom_rules = Vec::new();
        for axiom in &input.domain.axioms {
            let scope = translator.scope(&axiom.parameters)?;
            let body = translator.condition(&axiom.body, &scope)?;
            let body = translator.intern_condition(&body);
            let head_group = match translator.predicate(&axiom.head.predicate)? {
                PredRef::Fluent(group) if translator.fluent_is_derived[group as usize] => group,
                _ => {
                    return Err(GroundError::InvalidProgram(format!(
                        "axiom head '{}' is not a derived predicate",
                        axiom.head.predicate
                    )))
                }
            };
            let head =
                translator.fluent_atom(head_group, &axiom.head.args, &scope, &axiom.head.predicate)?;
            let (rule, _) = translator.repo.rules.get_or_create(&RuleData {
                body,
                head,
                cost: 0,
            });
            axiom_rules.push(rule);
        }

        // Per action: the header predicate, the header rule, and one
        // effect rule per added atom.
        let mut actions = Vec::with_capacity(input.domain.actions.len());
        let mut header_rules = Vec::new();
        let mut effect_rules = Vec::new();
        let mut header_to_action = AHashMap::new();

        for (position, action) in input.domain.actions.iter().enumerate() {
            let schema =
                translate_action(&mut translator, action, &mut header_rules, &mut effect_rules)?;
            header_to_action.insert(schema.header, position as u32);
            actions.push(schema);
        }

        // Initial state.
        let mut init_atoms = Vec::new();
        for atom in &input.init.atoms {
            match translator.predicate(&atom.predicate)? {
                PredRef::Static(group) => {
                    Translator::check_arity(
                        &atom.predicate,
                        translator
                            .repo
                            .static_predicates
                            .resolve(Index::new(group))
                            .arity,
                        atom.args.len(),
                    )?;
                    let objects = atom
                        .args
                        .iter()
                        .map(|a| translator.resolve_object(a))
                        .collect::<Result<Vec<_>>>()?;
                    translator
                        .repo
                        .static_ground_atoms
                        .get_or_create(group, &GroundAtomData::new(Index::new(group), objects));
                }
                PredRef::Fluent(group) => {
                    if translator.fluent_is_derived[group as usize] {
                        return Err(GroundError::InvalidProgram(format!(
                            "derived predicate '{}' in the initial state",
                            atom.predicate
                        )));
                    }
                    Translator::check_arity(
                        &atom.predicate,
                        translator
                            .repo
                            .fluent_predicates
                            .resolve(Index::new(group))
                            .arity,
                        atom.args.len(),
                    )?;
                    let objects = atom
                        .args
                        .iter()
                        .map(|a| translator.resolve_object(a))
                        .collect::<Result<Vec<_>>>()?;
                    let (index, _) = translator
                        .repo
                        .fluent_ground_atoms
                        .get_or_create(group, &GroundAtomData::new(Index::new(group), objects));
                    init_atoms.push(index);
                }
            }
        }

        let mut init_values = Vec::new();
        let mut static_values = Vec::new();
        for value in &input.init.values {
            let objects = value
                .args
                .iter()
                .map(|a| translator.resolve_object(a))
                .collect::<Result<Vec<_>>>()?;
            match translator.function(&value.function)? {
                FnRef::Static(f) => {
                    let (index, _) = translator.repo.static_ground_fterms.get_or_create(
                        &GroundFunctionTermData::new(Index::new(f), objects),
                    );
                    static_values.push((index, value.value));
                }
                FnRef::Fluent(f) => {
                    let (index, _) = translator.repo.fluent_ground_fterms.get_or_create(
                        &GroundFunctionTermData::new(Index::new(f), objects),
                    );
                    init_values.push((index, value.value));
                }
                FnRef::Auxiliary(_) => {
                    return Err(GroundError::InvalidProgram(format!(
                        "auxiliary function '{}' in the initial state",
                        value.function
                    )))
                }
            }
        }

        // Goal.
        let mut goal = Vec::new();
        let mut goal_unreachable = false;
        for atom in &input.goal {
            let objects = atom
                .args
                .iter()
                .map(|a| translator.resolve_object(a))
                .collect::<Result<Vec<_>>>()?;
            match translator.predicate(&atom.predicate)? {
                PredRef::Static(group) => {
                    let data = GroundAtomData::new(Index::new(group), objects);
                    if translator.repo.static_ground_atoms.find(group, &data).is_none() {
                        goal_unreachable = true;
                    }
                }
                PredRef::Fluent(group) => {
                    let data = GroundAtomData::new(Index::new(group), objects);
                    let (index, _) = translator
                        .repo
                        .fluent_ground_atoms
                        .get_or_create(group, &data);
                    goal.push(index);
                }
            }
        }

        let successor_program = Program::new(
            axiom_rules
                .iter()
                .chain(&header_rules)
                .copied()
                .collect(),
        );
        let rpg_program = Program::new(
            axiom_rules
                .iter()
                .chain(&header_rules)
                .chain(&effect_rules)
                .copied()
                .collect(),
        );

        tracing::debug!(
            actions = actions.len(),
            axioms = axiom_rules.len(),
            rpg_rules = rpg_program.rules.len(),
            "translated lifted task"
        );

        Ok(LiftedTask {
            repository: translator.repo,
            config,
            actions,
            num_axioms: axiom_rules.len(),
            fluent_is_derived: translator.fluent_is_derived,
            fluent_is_header: translator.fluent_is_header,
            header_to_action,
            successor_program,
            rpg_program,
            init_atoms,
            init_values,
            static_values,
            goal,
            goal_unreachable,
        })
    }

    /// The initial state.
    pub fn init_state(&self) -> State {
        let mut state = State::new();
        for &atom in &self.init_atoms {
            state.set_atom(atom, true);
        }
        for &(index, value) in &self.init_values {
            state.set_value(index, value);
        }
        state
    }

    /// True when `state` satisfies the goal (derived goal atoms must have
    /// been written into the state by the caller).
    pub fn is_goal(&self, state: &State) -> bool {
        !self.goal_unreachable && self.goal.iter().all(|&atom| state.get_atom(atom))
    }

    /// The name of an action schema.
    pub fn action_name(&self, position: u32) -> &str {
        &self.actions[position as usize].name
    }
}

fn translate_action(
    translator: &mut Translator,
    action: &ActionInput,
    header_rules: &mut Vec<Index<crate::ir::Rule>>,
    effect_rules: &mut Vec<Index<crate::ir::Rule>>,
) -> Result<ActionSchema> {
    let scope = translator.scope(&action.parameters)?;

    // The abstract header predicate; derivable iff the action is
    // applicable.
    let header_name = format!("@{}", action.name);
    if translator.predicates.contains_key(&header_name) {
        return Err(GroundError::InvalidProgram(format!(
            "predicate name '{header_name}' is reserved"
        )));
    }
    let (header_pred, _) = translator.repo.fluent_predicates.get_or_create(
        &PredicateData::new(header_name.clone(), action.parameters.len() as u32),
    );
    let header_group = header_pred.value();
    translator
        .predicates
        .insert(header_name, PredRef::Fluent(header_group));
    translator.fluent_is_derived.push(false);
    translator.fluent_is_header.push(true);

    let (header_atom, _) = translator.repo.fluent_atoms.get_or_create(
        header_group,
        &AtomData {
            predicate: Index::new(header_group),
            terms: scope.variables.iter().map(|&v| Term::Variable(v)).collect(),
        },
    );

    let precondition = translator.condition(&action.precondition, &scope)?;
    let precondition = translator.intern_condition(&precondition);
    let cost = constant_cost(&action.cost);

    let (header_rule, _) = translator.repo.rules.get_or_create(&RuleData {
        body: precondition,
        head: header_atom,
        cost,
    });
    header_rules.push(header_rule);

    let mut effects = Vec::with_capacity(action.effects.len());
    for effect in &action.effects {
        let effect_condition = translator.condition(&effect.condition, &scope)?;
        let condition_index = translator.intern_condition(&effect_condition);

        let mut add = Vec::with_capacity(effect.add.len());
        for atom in &effect.add {
            add.push(translate_effect_atom(translator, atom, &scope)?);
        }
        let mut del = Vec::with_capacity(effect.del.len());
        for atom in &effect.del {
            del.push(translate_effect_atom(translator, atom, &scope)?);
        }

        let mut numeric = Vec::with_capacity(effect.numeric.len());
        for ne in &effect.numeric {
            if let Some(schema) = translate_numeric_effect(translator, ne, &scope)? {
                numeric.push(schema);
            }
        }

        // One delete-relaxed rule per added atom: header and effect
        // condition imply the atom.
        for &added in &add {
            let mut body = effect_condition.clone();
            body.fluent_literals.push(Literal {
                atom: header_atom,
                polarity: true,
            });
            canonicalize_condition(&mut body);
            let body = translator.intern_condition(&body);
            let (rule, _) = translator.repo.rules.get_or_create(&RuleData {
                body,
                head: added,
                cost: 0,
            });
            effect_rules.push(rule);
        }

        effects.push(EffectSchema {
            condition: condition_index,
            add,
            del,
            numeric,
        });
    }

    Ok(ActionSchema {
        name: action.name.clone(),
        arity: action.parameters.len(),
        cost,
        precondition,
        header: header_group,
        effects,
    })
}

fn translate_effect_atom(
    translator: &mut Translator,
    atom: &AtomInput,
    scope: &Scope,
) -> Result<GroupIndex<Atom<Fluent>>> {
    match translator.predicate(&atom.predicate)? {
        PredRef::Fluent(group) => {
            if translator.fluent_is_derived[group as usize] {
                return Err(GroundError::InvalidProgram(format!(
                    "effect on derived predicate '{}'",
                    atom.predicate
                )));
            }
            translator.fluent_atom(group, &atom.args, scope, &atom.predicate)
        }
        PredRef::Static(_) => Err(GroundError::InvalidProgram(format!(
            "effect on static predicate '{}'",
            atom.predicate
        ))),
    }
}

fn translate_numeric_effect(
    translator: &mut Translator,
    effect: &NumericEffectInput,
    scope: &Scope,
) -> Result<Option<NumericEffectSchema>> {
    let op = match effect.op {
        NumericEffectOpInput::Assign => NumericEffectOp::Assign,
        NumericEffectOpInput::Increase => NumericEffectOp::Increase,
        NumericEffectOpInput::Decrease => NumericEffectOp::Decrease,
        NumericEffectOpInput::ScaleUp => NumericEffectOp::ScaleUp,
        NumericEffectOpInput::ScaleDown => NumericEffectOp::ScaleDown,
    };
    let value = translator.expression(&effect.value, scope)?;
    match translator.function(&effect.function)? {
        FnRef::Fluent(f) => {
            let terms = translator.terms(&effect.args, scope)?;
            let (fterm, _) = translator.repo.fluent_fterms.get_or_create(&FunctionTermData {
                function: Index::new(f),
                terms,
            });
            Ok(Some(NumericEffectSchema { op, fterm, value }))
        }
        // The cost accumulator is folded into the rule cost, not applied
        // as a state change.
        FnRef::Auxiliary(_) => Ok(None),
        FnRef::Static(_) => Err(GroundError::InvalidProgram(format!(
            "numeric effect on static function '{}'",
            effect.function
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::input::{
        DomainInput, EffectInput, InitInput, LiteralInput, PredicateInput,
    };

    fn tiny_task() -> TaskInput {
        TaskInput {
            domain: DomainInput {
                name: "switch".into(),
                predicates: vec![
                    PredicateInput {
                        name: "off".into(),
                        arity: 1,
                        role: RoleInput::Fluent,
                    },
                    PredicateInput {
                        name: "on".into(),
                        arity: 1,
                        role: RoleInput::Fluent,
                    },
                ],
                functions: vec![],
                actions: vec![ActionInput {
                    name: "flip".into(),
                    parameters: vec!["s".into()],
                    precondition: ConditionInput {
                        literals: vec![LiteralInput {
                            predicate: "off".into(),
                            args: vec!["s".into()],
                            polarity: true,
                        }],
                        constraints: vec![],
                    },
                    effects: vec![EffectInput {
                        condition: ConditionInput::default(),
                        add: vec![AtomInput {
                            predicate: "on".into(),
                            args: vec!["s".into()],
                        }],
                        del: vec![AtomInput {
                            predicate: "off".into(),
                            args: vec!["s".into()],
                        }],
                        numeric: vec![],
                    }],
                    cost: None,
                }],
                axioms: vec![],
            },
            objects: vec!["s1".into(), "s2".into()],
            init: InitInput {
                atoms: vec![AtomInput {
                    predicate: "off".into(),
                    args: vec!["s1".into()],
                }],
                values: vec![],
            },
            goal: vec![AtomInput {
                predicate: "on".into(),
                args: vec!["s1".into()],
            }],
        }
    }

    #[test]
    fn test_translation_shape() {
        let task = LiftedTask::new(tiny_task(), EngineConfig::default()).unwrap();
        assert_eq!(task.actions.len(), 1);
        assert_eq!(task.actions[0].cost, 1);
        // header rule + effect rule
        assert_eq!(task.rpg_program.rules.len(), 2);
        assert_eq!(task.successor_program.rules.len(), 1);
        assert_eq!(task.init_atoms.len(), 1);
        assert_eq!(task.goal.len(), 1);
        assert!(!task.goal_unreachable);
        // The header predicate is marked.
        assert!(task.fluent_is_header[task.actions[0].header as usize]);
        assert_eq!(
            task.header_to_action.get(&task.actions[0].header),
            Some(&0)
        );
    }

    #[test]
    fn test_unknown_predicate_is_rejected() {
        let mut input = tiny_task();
        input.goal[0].predicate = "nonexistent".into();
        let err = LiftedTask::new(input, EngineConfig::default()).unwrap_err();
        assert!(matches!(err, GroundError::UndefinedPredicate(_)));
    }

    #[test]
    fn test_arity_mismatch_is_rejected() {
        let mut input = tiny_task();
        input.init.atoms[0].args.push("s2".into());
        let err = LiftedTask::new(input, EngineConfig::default()).unwrap_err();
        assert!(matches!(err, GroundError::ArityMismatch { .. }));
    }

    #[test]
    fn test_effect_on_static_is_rejected() {
        let mut input = tiny_task();
        input.domain.predicates[1].role = RoleInput::Static;
        let err = LiftedTask::new(input, EngineConfig::default()).unwrap_err();
        assert!(matches!(err, GroundError::InvalidProgram(_)));
    }

    #[test]
    fn test_is_goal() {
        let task = LiftedTask::new(tiny_task(), EngineConfig::default()).unwrap();
        let init = task.init_state();
        assert!(!task.is_goal(&init));
    }
}
