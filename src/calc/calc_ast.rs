//! # Calculation syntax tree
//!
//! Expression and statement nodes for the calculation language: the restricted subset of
//! imperative code made of assignments whose right-hand sides are built from arithmetic,
//! comparisons, conditionals, indexing and calls to a fixed library of math functions.
//!
//! The tree is produced by [`crate::calc::parse_calc`] (or by any other front end that builds
//! these nodes directly), consumed read-only by the LaTeX renderers and walked by the
//! [`crate::calc::evaluator`]. Nodes own their children through `Box`, so a tree never has
//! cycles and is dropped together with the statement holding it.
#![allow(non_camel_case_types)]

use strum_macros::{Display, EnumIter};

/// Deepest expression nesting the parser, the evaluator and the renderers accept
pub const MAX_DEPTH: usize = 200;

/// Literal constant appearing in source code
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    /// imaginary literal such as `2j`, stores the coefficient
    Imaginary(f64),
    Bool(bool),
    Str(String),
    None,
}

/// Binary arithmetic/bitwise operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum BinaryOp {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
}

impl BinaryOp {
    /// `+` and `-`: the operators whose subtrees need brackets under a stronger operator
    pub fn is_additive(&self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub)
    }
    /// `*`, `/` and `**`: operators that bind stronger than an additive operand
    pub fn binds_over_additive(&self) -> bool {
        matches!(self, BinaryOp::Mult | BinaryOp::Div | BinaryOp::Pow)
    }
    /// source spelling, also used for augmented assignment (`x += 1`)
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mult => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::LShift => "<<",
            BinaryOp::RShift => ">>",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Pos,
    /// `not x`
    Not,
    /// `~x`
    Invert,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtE,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum BoolOperator {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum SequenceKind {
    List,
    Tuple,
}

/// What is being called: `sqrt(x)`, `math.sqrt(x)` or something else (`f(x)(y)`)
#[derive(Clone, Debug, PartialEq)]
pub enum Callee {
    Name(String),
    /// attribute access, only the attribute name is kept
    Attribute(String),
    Other,
}

impl Callee {
    /// name used to pick the LaTeX template and the builtin
    pub fn name(&self) -> &str {
        match self {
            Callee::Name(name) | Callee::Attribute(name) => name,
            Callee::Other => "func",
        }
    }
}

/// Expression node
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Name(String),
    BinOp(BinaryOp, Box<Expr>, Box<Expr>),
    UnaryOp(UnaryOp, Box<Expr>),
    Call(Callee, Vec<Expr>),
    /// `a < b <= c`: left operand and ordered (operator, comparator) pairs
    Compare(Box<Expr>, Vec<(CompareOp, Expr)>),
    /// `body if test else orelse`, fields in the order test, body, orelse
    IfExp(Box<Expr>, Box<Expr>, Box<Expr>),
    /// `value[index]`
    Subscript(Box<Expr>, Box<Expr>),
    Sequence(SequenceKind, Vec<Expr>),
    /// `value.name` outside a call position
    Attribute(Box<Expr>, String),
    BoolOp(BoolOperator, Vec<Expr>),
}

impl Expr {
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }
    pub fn name(name: &str) -> Expr {
        Expr::Name(name.to_string())
    }
    pub fn int(val: i64) -> Expr {
        Expr::Literal(Literal::Int(val))
    }
    pub fn float(val: f64) -> Expr {
        Expr::Literal(Literal::Float(val))
    }
    pub fn binop(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::BinOp(op, lhs.boxed(), rhs.boxed())
    }
    pub fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::Call(Callee::Name(name.to_string()), args)
    }
    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::binop(BinaryOp::Add, self, rhs)
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::binop(BinaryOp::Sub, self, rhs)
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::binop(BinaryOp::Mult, self, rhs)
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::binop(BinaryOp::Div, self, rhs)
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::UnaryOp(UnaryOp::Neg, self.boxed())
    }
}

/// Left-hand side of an assignment
#[derive(Clone, Debug, PartialEq)]
pub enum AssignTarget {
    Name(String),
    /// `a, b = ...`
    Tuple(Vec<AssignTarget>),
    /// `obj.attr = ...`
    Attribute(Expr, String),
    /// `items[0] = ...`
    Subscript(Expr, Expr),
}

/// Top-level statement
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// `t1 = t2 = value`; only single plain-name targets are converted
    Assign {
        targets: Vec<AssignTarget>,
        value: Expr,
    },
    /// `target op= value`
    AugAssign {
        target: AssignTarget,
        op: BinaryOp,
        value: Expr,
    },
    /// anything else (imports, prints, definitions, control flow); the label is for logs only
    Other(String),
}

impl Statement {
    pub fn assign(name: &str, value: Expr) -> Statement {
        Statement::Assign {
            targets: vec![AssignTarget::Name(name.to_string())],
            value,
        }
    }
    pub fn aug_assign(name: &str, op: BinaryOp, value: Expr) -> Statement {
        Statement::AugAssign {
            target: AssignTarget::Name(name.to_string()),
            op,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_operator_overloading_builds_tree() {
        let expr = (Expr::name("a") + Expr::name("b")) * Expr::name("c");
        let expected = Expr::BinOp(
            BinaryOp::Mult,
            Box::new(Expr::BinOp(
                BinaryOp::Add,
                Box::new(Expr::Name("a".to_string())),
                Box::new(Expr::Name("b".to_string())),
            )),
            Box::new(Expr::Name("c".to_string())),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_neg() {
        let expr = -Expr::name("x");
        assert_eq!(
            expr,
            Expr::UnaryOp(UnaryOp::Neg, Box::new(Expr::name("x")))
        );
    }

    #[test]
    fn test_precedence_classes() {
        let additive: Vec<BinaryOp> = BinaryOp::iter().filter(|op| op.is_additive()).collect();
        assert_eq!(additive, vec![BinaryOp::Add, BinaryOp::Sub]);
        let strong: Vec<BinaryOp> = BinaryOp::iter()
            .filter(|op| op.binds_over_additive())
            .collect();
        assert_eq!(strong, vec![BinaryOp::Mult, BinaryOp::Div, BinaryOp::Pow]);
    }

    #[test]
    fn test_callee_name() {
        assert_eq!(Callee::Name("sqrt".to_string()).name(), "sqrt");
        assert_eq!(Callee::Attribute("cos".to_string()).name(), "cos");
        assert_eq!(Callee::Other.name(), "func");
    }
}
