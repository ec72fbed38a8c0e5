//! # Symbolic LaTeX rendering
//!
//! Turns an expression tree into LaTeX that uses variable names, not their values:
//! `(a + b) * c` becomes `\left(a + b\right) \cdot c`, `sqrt(x)/2` becomes `\frac{\sqrt{x}}{2}`.
//!
//! Brackets are only added where the tree needs them and LaTeX does not already delimit the
//! operand: an additive subtree under `*`, `/` or `**` is wrapped in `\left(...\right)`, except
//! the denominator of a division, because a fraction bar already groups it.
//!
//! Node kinds without a template (attribute access, `and`/`or`) render as [`FALLBACK`], so a
//! block always assembles even for code outside the supported subset.
use itertools::Itertools;

use crate::calc::calc_ast::{BinaryOp, CompareOp, Expr, Literal, MAX_DEPTH, UnaryOp};
use crate::calc::identifier::render_identifier;
use crate::calc::value::repr_real;
use crate::calc::value_format::format_literal;

/// Marker emitted for node kinds that have no LaTeX form
pub const FALLBACK: &str = r"\text{?}";

/// Symbolic LaTeX of an expression tree
pub fn render_symbolic(node: &Expr) -> String {
    symbolic_at(node, 0)
}

fn symbolic_at(node: &Expr, depth: usize) -> String {
    if depth > MAX_DEPTH {
        return FALLBACK.to_string();
    }
    let depth = depth + 1;
    match node {
        Expr::Literal(literal) => format_literal(literal),
        Expr::Name(name) => render_identifier(name),
        Expr::BinOp(op, lhs, rhs) => {
            let left = symbolic_at(lhs, depth);
            let right = symbolic_at(rhs, depth);
            binop_latex(*op, lhs, rhs, left, right)
        }
        Expr::UnaryOp(op, operand) => unary_latex(*op, symbolic_at(operand, depth)),
        Expr::Call(callee, args) => {
            let args: Vec<String> = args.iter().map(|arg| symbolic_at(arg, depth)).collect();
            call_latex(callee.name(), &args)
        }
        Expr::Compare(left, pairs) => {
            let mut result = symbolic_at(left, depth);
            for (op, comparator) in pairs {
                let right = symbolic_at(comparator, depth);
                result.push_str(&compare_latex(*op, &right));
            }
            result
        }
        Expr::IfExp(test, body, orelse) => format!(
            r"\begin{{cases}} {} & \text{{if }} {} \\ {} & \text{{otherwise}} \end{{cases}}",
            symbolic_at(body, depth),
            symbolic_at(test, depth),
            symbolic_at(orelse, depth)
        ),
        Expr::Subscript(value, index) => {
            let index = match index.as_ref() {
                Expr::Literal(literal) => literal_index(literal),
                other => symbolic_at(other, depth),
            };
            format!("{}_{{{}}}", symbolic_at(value, depth), index)
        }
        Expr::Sequence(_, elements) => format!(
            r"\left[{}\right]",
            elements.iter().map(|e| symbolic_at(e, depth)).join(", ")
        ),
        Expr::Attribute(..) | Expr::BoolOp(..) => FALLBACK.to_string(),
    }
}

/// a literal used as an index is written the way the constant itself prints
fn literal_index(literal: &Literal) -> String {
    match literal {
        Literal::Float(x) => repr_real(*x),
        other => format_literal(other),
    }
}

/// true when `operand` is an additive operation sitting under a stronger `outer` operator
pub(crate) fn needs_brackets(outer: BinaryOp, operand: &Expr) -> bool {
    match operand {
        Expr::BinOp(inner, _, _) => inner.is_additive() && outer.binds_over_additive(),
        _ => false,
    }
}

/// Applies bracket rules to already rendered operands and joins them with the operator template
pub(crate) fn binop_latex(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    left: String,
    right: String,
) -> String {
    let left = if needs_brackets(op, lhs) {
        format!(r"\left({}\right)", left)
    } else {
        left
    };
    // a denominator is grouped by the fraction bar
    let right = if needs_brackets(op, rhs) && op != BinaryOp::Div {
        format!(r"\left({}\right)", right)
    } else {
        right
    };
    match op {
        BinaryOp::Add => format!("{} + {}", left, right),
        BinaryOp::Sub => format!("{} - {}", left, right),
        BinaryOp::Mult => format!(r"{} \cdot {}", left, right),
        BinaryOp::Div => format!(r"\frac{{{}}}{{{}}}", left, right),
        BinaryOp::FloorDiv => format!(
            r"\left\lfloor\frac{{{}}}{{{}}}\right\rfloor",
            left, right
        ),
        BinaryOp::Pow => format!("{}^{{{}}}", left, right),
        BinaryOp::Mod => format!(r"{} \mod {}", left, right),
        BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::LShift
        | BinaryOp::RShift => format!(r"{} \text{{op}} {}", left, right),
    }
}

pub(crate) fn unary_latex(op: UnaryOp, operand: String) -> String {
    match op {
        UnaryOp::Neg => format!("-{}", operand),
        UnaryOp::Pos => format!("+{}", operand),
        UnaryOp::Not => format!(r"\neg {}", operand),
        UnaryOp::Invert => operand,
    }
}

/// ` = b`, ` \leq b`, ...; membership and identity tests have no template and add nothing
pub(crate) fn compare_latex(op: CompareOp, right: &str) -> String {
    match op {
        CompareOp::Eq => format!(" = {}", right),
        CompareOp::NotEq => format!(r" \neq {}", right),
        CompareOp::Lt => format!(" < {}", right),
        CompareOp::Gt => format!(" > {}", right),
        CompareOp::LtE => format!(r" \leq {}", right),
        CompareOp::GtE => format!(r" \geq {}", right),
        CompareOp::In | CompareOp::NotIn | CompareOp::Is | CompareOp::IsNot => String::new(),
    }
}

/// `\text{name}\left(a, b\right)`
pub(crate) fn generic_call_latex(name: &str, args: &[String]) -> String {
    format!(r"\text{{{}}}\left({}\right)", name, args.iter().join(", "))
}

/// LaTeX template of a library function applied to rendered arguments.
/// Calls that do not fit a template (unknown name, missing arguments) use the generic form.
fn call_latex(name: &str, args: &[String]) -> String {
    match (name, args) {
        ("sqrt", [a0, ..]) => format!(r"\sqrt{{{}}}", a0),
        ("abs", [a0, ..]) => format!(r"\left|{}\right|", a0),
        (
            "sin" | "cos" | "tan" | "cot" | "sec" | "csc" | "sinh" | "cosh" | "tanh",
            [a0, ..],
        ) => format!(r"\{}\left({}\right)", name, a0),
        ("asin" | "arcsin", [a0, ..]) => format!(r"\arcsin\left({}\right)", a0),
        ("acos" | "arccos", [a0, ..]) => format!(r"\arccos\left({}\right)", a0),
        ("atan" | "arctan", [a0, ..]) => format!(r"\arctan\left({}\right)", a0),
        ("atan2", [a0, a1, ..]) => format!(r"\arctan\left(\frac{{{}}}{{{}}}\right)", a0, a1),
        ("log" | "ln", [a0]) => format!(r"\ln\left({}\right)", a0),
        ("log", [a0, a1, ..]) => format!(r"\log_{{{}}}\left({}\right)", a1, a0),
        ("ln", [a0, ..]) => format!(r"\ln\left({}\right)", a0),
        ("log10", [a0, ..]) => format!(r"\log_{{10}}\left({}\right)", a0),
        ("log2", [a0, ..]) => format!(r"\log_{{2}}\left({}\right)", a0),
        ("exp", [a0, ..]) => format!("e^{{{}}}", a0),
        ("pow", [a0, a1, ..]) => format!("{}^{{{}}}", a0, a1),
        ("max" | "min", _) => format!(r"\{}\left({}\right)", name, args.iter().join(", ")),
        ("sum", [a0, ..]) => format!(r"\sum {}", a0),
        // rounding does not change how the formula reads
        ("round", [a0, ..]) => a0.clone(),
        _ => generic_call_latex(name, args),
    }
}
