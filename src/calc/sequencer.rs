//! # Statement sequencing
//!
//! Walks the top-level statements of a program in order and keeps the ones that become output
//! lines: assignments to exactly one plain name and augmented assignments to a plain name.
//! Every other statement (imports, prints, definitions, tuple unpacking, chained assignment)
//! is skipped without touching the environment.
//!
//! Each accepted statement is evaluated against the environment built so far. The new binding
//! is applied only when evaluation succeeds: a failing statement produces no record and no
//! binding, and later statements referring to its target see the previous value (or nothing).
//! The substituted form of a line is rendered right after its own binding is applied, so
//! `x = x + 1` shows the new value of `x`, while later statements never change earlier lines.
use log::{debug, warn};

use crate::calc::calc_ast::{AssignTarget, Expr, Statement};
use crate::calc::evaluator::Evaluator;
use crate::calc::latex_substitute::render_substituted;
use crate::calc::value::{Environment, Value};

/// One output line: an accepted statement together with its computed value
#[derive(Clone, Debug, PartialEq)]
pub struct AssignmentRecord {
    pub name: String,
    /// right-hand side of a plain assignment, `None` for augmented assignments
    pub source: Option<Expr>,
    pub value: Value,
    /// the line shows only `name &= value`
    pub is_trivial: bool,
    /// substituted rendering of `source`, taken from the environment as it stood right after
    /// this statement was applied; absent for trivial lines
    pub substituted: Option<String>,
}

impl AssignmentRecord {
    /// symbolic and substituted forms are worth showing
    pub fn has_formula(&self) -> bool {
        !self.is_trivial && self.source.is_some()
    }
}

/// source expression and trivial flag of a statement that produces an output line,
/// `None` for statements the converter skips
fn accepted(statement: &Statement) -> Option<(&str, Option<&Expr>, bool)> {
    match statement {
        Statement::Assign { targets, value } => match targets.as_slice() {
            [AssignTarget::Name(name)] => Some((name.as_str(), Some(value), value.is_literal())),
            _ => None,
        },
        Statement::AugAssign {
            target: AssignTarget::Name(name),
            ..
        } => Some((name.as_str(), None, true)),
        _ => None,
    }
}

/// Runs `statements` in order, growing `env` and returning one record per statement that
/// was accepted and evaluated successfully.
pub fn run_statements(
    statements: &[Statement],
    evaluator: &dyn Evaluator,
    env: &mut Environment,
) -> Vec<AssignmentRecord> {
    let mut records = Vec::new();
    for (index, statement) in statements.iter().enumerate() {
        let Some((name, source, is_trivial)) = accepted(statement) else {
            debug!("statement {} skipped: {}", index + 1, statement_label(statement));
            continue;
        };
        match evaluator.evaluate(statement, env) {
            Ok((bound, value)) => {
                debug!("statement {}: {} = {}", index + 1, bound, value);
                env.insert(&bound, value.clone());
                let substituted = source
                    .filter(|_| !is_trivial)
                    .map(|expr| render_substituted(expr, env));
                records.push(AssignmentRecord {
                    name: name.to_string(),
                    source: source.cloned(),
                    value,
                    is_trivial,
                    substituted,
                });
            }
            Err(err) => {
                warn!("statement {} ({}) dropped: {}", index + 1, name, err);
            }
        }
    }
    records
}

fn statement_label(statement: &Statement) -> &str {
    match statement {
        Statement::Assign { .. } => "assignment",
        Statement::AugAssign { .. } => "augmented assignment",
        Statement::Other(label) => label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::calc_ast::BinaryOp;
    use crate::calc::evaluator::{Binding, EvalError, Interpreter};

    fn run(statements: &[Statement]) -> (Vec<AssignmentRecord>, Environment) {
        let mut env = Environment::new();
        let records = run_statements(statements, &Interpreter::new(), &mut env);
        (records, env)
    }

    #[test]
    fn test_plain_assignments_in_order() {
        let statements = vec![
            Statement::assign("x", Expr::int(5)),
            Statement::assign("y", Expr::int(10)),
            Statement::assign("z", Expr::name("x") + Expr::name("y")),
        ];
        let (records, env) = run(&statements);
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
        assert_eq!(records[2].value, Value::Int(15));
        assert!(records[0].is_trivial && records[1].is_trivial);
        assert!(!records[2].is_trivial);
        assert!(records[2].has_formula());
        assert_eq!(env.get("z"), Some(&Value::Int(15)));
        assert_eq!(records[2].substituted.as_deref(), Some("5 + 10"));
        assert_eq!(records[0].substituted, None);
    }

    #[test]
    fn test_substitution_follows_own_binding() {
        let statements = vec![
            Statement::assign("a", Expr::int(1)),
            Statement::assign("b", Expr::name("a") + Expr::int(1)),
            Statement::assign("a", Expr::name("a") * Expr::int(10)),
            Statement::assign("a", Expr::int(7)),
        ];
        let (records, _) = run(&statements);
        assert_eq!(records[1].substituted.as_deref(), Some("1 + 1"));
        // the reassigned name already holds its new value
        assert_eq!(records[2].substituted.as_deref(), Some(r"10 \cdot 10"));
        assert_eq!(records[2].value, Value::Int(10));
    }

    #[test]
    fn test_skipped_statements_leave_no_trace() {
        let statements = vec![
            Statement::Other("import".to_string()),
            Statement::assign("a", Expr::int(2)),
            Statement::Other("expression".to_string()),
            Statement::Assign {
                targets: vec![AssignTarget::Tuple(vec![
                    AssignTarget::Name("p".to_string()),
                    AssignTarget::Name("q".to_string()),
                ])],
                value: Expr::int(1),
            },
            Statement::Assign {
                targets: vec![
                    AssignTarget::Name("m".to_string()),
                    AssignTarget::Name("n".to_string()),
                ],
                value: Expr::int(1),
            },
        ];
        let (records, env) = run(&statements);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "a");
        for name in ["p", "q", "m", "n"] {
            assert!(!env.contains(name));
        }
    }

    #[test]
    fn test_failed_statement_is_discarded() {
        let statements = vec![
            Statement::assign("a", Expr::int(1)),
            Statement::assign("b", Expr::name("undefined") + Expr::int(1)),
            Statement::assign("c", Expr::name("b") * Expr::int(2)),
            Statement::assign("d", Expr::name("a") / Expr::int(0)),
            Statement::assign("a", Expr::name("a") + Expr::int(1)),
        ];
        let (records, env) = run(&statements);
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "a"]);
        assert!(!env.contains("b"));
        assert!(!env.contains("d"));
        assert_eq!(env.get("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_augmented_assignment_is_trivial() {
        let statements = vec![
            Statement::assign("total", Expr::int(1)),
            Statement::aug_assign("total", BinaryOp::Mult, Expr::int(3)),
        ];
        let (records, env) = run(&statements);
        assert_eq!(records.len(), 2);
        assert!(records[1].is_trivial);
        assert_eq!(records[1].source, None);
        assert!(!records[1].has_formula());
        assert_eq!(env.get("total"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_negative_literal_is_not_trivial() {
        let statements = vec![Statement::assign("k", -Expr::int(3))];
        let (records, _) = run(&statements);
        assert!(!records[0].is_trivial);
        assert_eq!(records[0].value, Value::Int(-3));
    }

    /// evaluator that refuses everything, to check the sequencer never binds on failure
    struct Refusing;

    impl Evaluator for Refusing {
        fn evaluate(&self, _statement: &Statement, _env: &Environment) -> Result<Binding, EvalError> {
            Err(EvalError::NotAnAssignment)
        }
    }

    #[test]
    fn test_custom_evaluator() {
        let statements = vec![Statement::assign("x", Expr::int(1))];
        let mut env = Environment::new();
        let records = run_statements(&statements, &Refusing, &mut env);
        assert!(records.is_empty());
        assert!(!env.contains("x"));
    }
}
