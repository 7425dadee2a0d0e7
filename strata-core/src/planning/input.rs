//! The parsed-task input interface
//!
//! The core consumes a pre-normalized task: typed-free predicates and
//! objects, conjunctive conditions only, disjunctions and quantifiers
//! already compiled away. This module is the serde image of that
//! interface; the CLI feeds it from a JSON file, tests construct it
//! directly.

use serde::{Deserialize, Serialize};

/// A whole planning task.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TaskInput {
    /// The domain description.
    pub domain: DomainInput,
    /// Object names.
    pub objects: Vec<String>,
    /// The initial state.
    #[serde(default)]
    pub init: InitInput,
    /// Conjunctive ground goal; positive atoms.
    #[serde(default)]
    pub goal: Vec<AtomInput>,
}

/// Domain: predicates, functions, action schemas, axioms.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DomainInput {
    /// Domain name.
    #[serde(default)]
    pub name: String,
    /// Predicate definitions.
    #[serde(default)]
    pub predicates: Vec<PredicateInput>,
    /// Function definitions.
    #[serde(default)]
    pub functions: Vec<FunctionInput>,
    /// Action schemas.
    #[serde(default)]
    pub actions: Vec<ActionInput>,
    /// Axioms defining derived predicates.
    #[serde(default)]
    pub axioms: Vec<AxiomInput>,
}

/// Predicate role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleInput {
    /// Never changed after the initial state.
    Static,
    /// Changed by action effects.
    #[default]
    Fluent,
    /// Defined by axioms.
    Derived,
    /// Cost accumulator (functions only).
    Auxiliary,
}

/// A predicate definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredicateInput {
    /// Name.
    pub name: String,
    /// Arity.
    pub arity: u32,
    /// Role; fluent if omitted.
    #[serde(default)]
    pub role: RoleInput,
}

/// A numeric function definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FunctionInput {
    /// Name.
    pub name: String,
    /// Arity.
    pub arity: u32,
    /// Role; fluent if omitted.
    #[serde(default)]
    pub role: RoleInput,
}

/// An atom occurrence: arguments are parameter names or object names.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AtomInput {
    /// Predicate name.
    pub predicate: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

/// A literal occurrence.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LiteralInput {
    /// Predicate name.
    pub predicate: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Polarity; positive if omitted.
    #[serde(default = "default_true")]
    pub polarity: bool,
}

fn default_true() -> bool {
    true
}

/// Comparison operator of a numeric condition.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonInput {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// A numeric expression.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ExpressionInput {
    /// Constant.
    Number(f64),
    /// Unary minus.
    Neg {
        /// Operand.
        neg: Box<ExpressionInput>,
    },
    /// Binary arithmetic: `+`, `-`, `*`, `/`.
    Binary {
        /// Operator symbol.
        op: String,
        /// Left operand.
        lhs: Box<ExpressionInput>,
        /// Right operand.
        rhs: Box<ExpressionInput>,
    },
    /// Variadic `+` or `*`.
    Multi {
        /// Operator symbol.
        op: String,
        /// Operands.
        args: Vec<ExpressionInput>,
    },
    /// A function term.
    Fn {
        /// Function name.
        function: String,
        /// Arguments.
        #[serde(default)]
        args: Vec<String>,
    },
}

/// A numeric constraint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConstraintInput {
    /// Operator.
    pub op: ComparisonInput,
    /// Left expression.
    pub lhs: ExpressionInput,
    /// Right expression.
    pub rhs: ExpressionInput,
}

/// A conjunctive condition.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConditionInput {
    /// Literals.
    #[serde(default)]
    pub literals: Vec<LiteralInput>,
    /// Numeric constraints.
    #[serde(default)]
    pub constraints: Vec<ConstraintInput>,
}

/// A numeric effect operation.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumericEffectOpInput {
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

/// A numeric effect.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NumericEffectInput {
    /// Operation.
    pub op: NumericEffectOpInput,
    /// Target function name.
    pub function: String,
    /// Target arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Value expression.
    pub value: ExpressionInput,
}

/// One conditional effect of an action.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EffectInput {
    /// Effect condition; empty means unconditional.
    #[serde(default)]
    pub condition: ConditionInput,
    /// Added atoms.
    #[serde(default)]
    pub add: Vec<AtomInput>,
    /// Deleted atoms.
    #[serde(default)]
    pub del: Vec<AtomInput>,
    /// Numeric effects.
    #[serde(default)]
    pub numeric: Vec<NumericEffectInput>,
}

/// An action schema.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionInput {
    /// Name.
    pub name: String,
    /// Parameter names; positions define the binding order.
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Precondition.
    #[serde(default)]
    pub precondition: ConditionInput,
    /// Conditional effects.
    #[serde(default)]
    pub effects: Vec<EffectInput>,
    /// Cost expression; unit cost if omitted.
    #[serde(default)]
    pub cost: Option<ExpressionInput>,
}

/// An axiom defining a derived predicate.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AxiomInput {
    /// Parameter names.
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Body condition.
    #[serde(default)]
    pub body: ConditionInput,
    /// Head atom over a derived predicate.
    pub head: AtomInput,
}

/// An initial function value.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValueInput {
    /// Function name.
    pub function: String,
    /// Ground arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// The value.
    pub value: f64,
}

/// The initial state.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InitInput {
    /// True atoms.
    #[serde(default)]
    pub atoms: Vec<AtomInput>,
    /// Defined function values.
    #[serde(default)]
    pub values: Vec<ValueInput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_untagged_forms() {
        let n: ExpressionInput = serde_json::from_str("2.5").unwrap();
        assert!(matches!(n, ExpressionInput::Number(v) if v == 2.5));

        let f: ExpressionInput =
            serde_json::from_str(r#"{"function": "fuel", "args": ["r1"]}"#).unwrap();
        assert!(matches!(f, ExpressionInput::Fn { .. }));

        let b: ExpressionInput =
            serde_json::from_str(r#"{"op": "+", "lhs": 1.0, "rhs": 2.0}"#).unwrap();
        assert!(matches!(b, ExpressionInput::Binary { .. }));

        let m: ExpressionInput =
            serde_json::from_str(r#"{"op": "*", "args": [1.0, 2.0, 3.0]}"#).unwrap();
        assert!(matches!(m, ExpressionInput::Multi { .. }));
    }

    #[test]
    fn test_task_roundtrip() {
        let json = r#"{
            "domain": {
                "name": "gripper",
                "predicates": [
                    {"name": "room", "arity": 1, "role": "static"},
                    {"name": "at-robby", "arity": 1}
                ],
                "actions": [{
                    "name": "move",
                    "parameters": ["from", "to"],
                    "precondition": {"literals": [
                        {"predicate": "room", "args": ["from"]},
                        {"predicate": "at-robby", "args": ["from"]}
                    ]},
                    "effects": [{
                        "add": [{"predicate": "at-robby", "args": ["to"]}],
                        "del": [{"predicate": "at-robby", "args": ["from"]}]
                    }]
                }]
            },
            "objects": ["rooma", "roomb"],
            "init": {"atoms": [{"predicate": "at-robby", "args": ["rooma"]}]},
            "goal": [{"predicate": "at-robby", "args": ["roomb"]}]
        }"#;
        let task: TaskInput = serde_json::from_str(json).unwrap();
        assert_eq!(task.domain.actions.len(), 1);
        assert_eq!(task.domain.predicates[0].role, RoleInput::Static);
        assert!(task.domain.actions[0].cost.is_none());
    }
}
