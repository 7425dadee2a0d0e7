//! Plan serialization
//!
//! Plans are written as newline-delimited ground actions in S-expression
//! form, one per line, followed by a cost comment line. This is the only
//! artifact the core produces for external consumers.

use super::task::LiftedTask;
use crate::error::Result;
use crate::ir::repository::Lookup;
use crate::ir::{GroundAction, Index};
use std::io::Write;

/// Render one ground action as an S-expression.
pub fn format_action(task: &LiftedTask, action: Index<GroundAction>) -> String {
    let data = task.repository.ground_actions.resolve(action);
    let mut out = format!("({}", task.action_name(data.action));
    for &object in &data.binding {
        out.push(' ');
        out.push_str(task.repository.object_name(object));
    }
    out.push(')');
    out
}

/// Write `actions` as a plan.
pub fn write_plan<W: Write>(
    writer: &mut W,
    task: &LiftedTask,
    actions: &[Index<GroundAction>],
) -> Result<()> {
    let mut total = 0u64;
    for &action in actions {
        writeln!(writer, "{}", format_action(task, action))?;
        total += u64::from(task.repository.ground_actions.resolve(action).cost);
    }
    writeln!(writer, "; cost = {total} (unit cost)")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::ir::GroundActionData;
    use crate::planning::input::{
        ActionInput, AtomInput, ConditionInput, DomainInput, InitInput, LiteralInput,
        PredicateInput, RoleInput, TaskInput,
    };

    #[test]
    fn test_plan_format() {
        let input = TaskInput {
            domain: DomainInput {
                name: "d".into(),
                predicates: vec![PredicateInput {
                    name: "p".into(),
                    arity: 1,
                    role: RoleInput::Fluent,
                }],
                functions: vec![],
                actions: vec![ActionInput {
                    name: "act".into(),
                    parameters: vec!["x".into()],
                    precondition: ConditionInput {
                        literals: vec![LiteralInput {
                            predicate: "p".into(),
                            args: vec!["x".into()],
                            polarity: true,
                        }],
                        constraints: vec![],
                    },
                    effects: vec![],
                    cost: None,
                }],
                axioms: vec![],
            },
            objects: vec!["a".into(), "b".into()],
            init: InitInput::default(),
            goal: vec![AtomInput {
                predicate: "p".into(),
                args: vec!["a".into()],
            }],
        };
        let mut task = LiftedTask::new(input, EngineConfig::default()).unwrap();

        let (a1, _) = task.repository.ground_actions.get_or_create(&GroundActionData {
            action: 0,
            binding: vec![crate::ir::Index::new(0)],
            cost: 1,
        });
        let (a2, _) = task.repository.ground_actions.get_or_create(&GroundActionData {
            action: 0,
            binding: vec![crate::ir::Index::new(1)],
            cost: 1,
        });

        let mut out = Vec::new();
        write_plan(&mut out, &task, &[a1, a2]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "(act a)\n(act b)\n; cost = 2 (unit cost)\n");
    }
}
