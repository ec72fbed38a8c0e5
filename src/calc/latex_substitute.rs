//! Substituted LaTeX rendering: the formula with every bound variable replaced by its value.
//!
//! For `z = x + y` with `x = 5`, `y = 10` this gives `5 + 10`. Operators and brackets follow the
//! symbolic renderer exactly; functions use a smaller template set; any node kind that is not
//! handled here is rendered symbolically instead.
use crate::calc::calc_ast::{Expr, MAX_DEPTH};
use crate::calc::identifier::render_identifier;
use crate::calc::latex_symbolic::{
    FALLBACK, binop_latex, generic_call_latex, render_symbolic, unary_latex,
};
use crate::calc::value::{Environment, Value};
use crate::calc::value_format::{format_literal, format_value};

/// LaTeX of `node` with identifiers replaced by their current values from `env`.
/// Names that are not bound (or bound to a builtin) keep their symbolic form.
pub fn render_substituted(node: &Expr, env: &Environment) -> String {
    substituted_at(node, env, 0)
}

fn substituted_at(node: &Expr, env: &Environment, depth: usize) -> String {
    if depth > MAX_DEPTH {
        return FALLBACK.to_string();
    }
    let depth = depth + 1;
    match node {
        Expr::Literal(literal) => format_literal(literal),
        Expr::Name(name) => match env.get(name) {
            Some(value) if !matches!(value, Value::Builtin(_)) => format_value(value),
            _ => render_identifier(name),
        },
        Expr::BinOp(op, lhs, rhs) => {
            let left = substituted_at(lhs, env, depth);
            let right = substituted_at(rhs, env, depth);
            binop_latex(*op, lhs, rhs, left, right)
        }
        Expr::UnaryOp(op, operand) => unary_latex(*op, substituted_at(operand, env, depth)),
        Expr::Call(callee, args) => {
            let args: Vec<String> = args
                .iter()
                .map(|arg| substituted_at(arg, env, depth))
                .collect();
            let name = callee.name();
            match (name, args.as_slice()) {
                ("sqrt", [a0, ..]) => format!(r"\sqrt{{{}}}", a0),
                ("abs", [a0, ..]) => format!(r"\left|{}\right|", a0),
                ("sin" | "cos" | "tan" | "log" | "exp", [a0, ..]) => {
                    format!(r"\{}\left({}\right)", name, a0)
                }
                _ => generic_call_latex(name, &args),
            }
        }
        other => render_symbolic(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::calc_ast::{BinaryOp, CompareOp, SequenceKind};
    use num_complex::Complex64;

    fn env() -> Environment {
        let mut env = Environment::new();
        env.insert("x", Value::Int(5));
        env.insert("y", Value::Int(10));
        env.insert("r", Value::Real(0.25));
        env.insert("flag", Value::Bool(true));
        env.insert("z", Value::Complex(Complex64::new(3.0, 1.0)));
        env
    }

    #[test]
    fn test_names_replaced_by_values() {
        let env = env();
        let expr = Expr::name("x") + Expr::name("y");
        assert_eq!(render_substituted(&expr, &env), "5 + 10");
        assert_eq!(render_substituted(&Expr::name("r"), &env), "0.25");
        assert_eq!(render_substituted(&Expr::name("flag"), &env), r"\text{True}");
        assert_eq!(render_substituted(&Expr::name("z"), &env), "3 + j");
        assert_eq!(render_substituted(&Expr::name("pi"), &env), "3.14159");
    }

    #[test]
    fn test_unbound_names_stay_symbolic() {
        let env = env();
        assert_eq!(render_substituted(&Expr::name("omega"), &env), r"\omega");
        // builtins are values in the environment but are not numbers
        assert_eq!(render_substituted(&Expr::name("sqrt"), &env), "sqrt");
    }

    #[test]
    fn test_brackets_match_symbolic_rules() {
        let env = env();
        let expr = (Expr::name("x") + Expr::name("y")) * Expr::int(2);
        assert_eq!(render_substituted(&expr, &env), r"\left(5 + 10\right) \cdot 2");
        let expr = Expr::name("x") / (Expr::name("y") - Expr::int(1));
        assert_eq!(render_substituted(&expr, &env), r"\frac{5}{10 - 1}");
        let expr = Expr::binop(BinaryOp::Pow, Expr::name("x"), Expr::int(2));
        assert_eq!(render_substituted(&expr, &env), "5^{2}");
    }

    #[test]
    fn test_reduced_function_templates() {
        let env = env();
        let x = || Expr::name("x");
        assert_eq!(render_substituted(&Expr::call("sqrt", vec![x()]), &env), r"\sqrt{5}");
        assert_eq!(render_substituted(&Expr::call("abs", vec![x()]), &env), r"\left|5\right|");
        assert_eq!(
            render_substituted(&Expr::call("cos", vec![x()]), &env),
            r"\cos\left(5\right)"
        );
        assert_eq!(
            render_substituted(&Expr::call("log", vec![x()]), &env),
            r"\log\left(5\right)"
        );
        assert_eq!(
            render_substituted(&Expr::call("exp", vec![x()]), &env),
            r"\exp\left(5\right)"
        );
        assert_eq!(
            render_substituted(&Expr::call("atan", vec![x()]), &env),
            r"\text{atan}\left(5\right)"
        );
        assert_eq!(
            render_substituted(&Expr::call("max", vec![x(), Expr::name("y")]), &env),
            r"\text{max}\left(5, 10\right)"
        );
    }

    #[test]
    fn test_unhandled_kinds_delegate_to_symbolic() {
        let env = env();
        let expr = Expr::Compare(Expr::name("x").boxed(), vec![(CompareOp::Lt, Expr::name("y"))]);
        assert_eq!(render_substituted(&expr, &env), "x < y");
        let expr = Expr::Sequence(SequenceKind::Tuple, vec![Expr::name("x"), Expr::int(1)]);
        assert_eq!(render_substituted(&expr, &env), r"\left[x, 1\right]");
    }

    #[test]
    fn test_literal_expression_matches_symbolic() {
        let env = env();
        for expr in [Expr::int(4), Expr::float(2.5), Expr::float(0.125)] {
            assert_eq!(render_substituted(&expr, &env), render_symbolic(&expr));
        }
    }
}
