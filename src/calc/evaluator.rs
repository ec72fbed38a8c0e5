//! # Statement evaluation
//!
//! The sequencer does not know how values are computed: it hands each accepted statement and
//! the current [`Environment`] to an [`Evaluator`] and gets back either the new binding for the
//! target name or an error. The environment is only borrowed, so a failed statement leaves no
//! trace; the caller applies the binding after success.
//!
//! [`Interpreter`] is the default evaluator. It folds an expression tree to a [`Value`] with
//! the usual numeric tower of calculation scripts:
//! - `int` arithmetic stays integral (`7 // 2 == 3`, `2 ** 10 == 1024`) and falls back to
//!   floating point on overflow
//! - `/` always produces a float, `//` and `%` round toward negative infinity
//! - a negative base with a fractional exponent produces a complex number
//! - `bool` takes part in arithmetic as 0 / 1
//!
//! The builtin library ([`BUILTIN_FUNCTIONS`]) covers the math functions the LaTeX renderer has
//! templates for plus a few general helpers (`max`, `min`, `round`, `sum`, `len`, ...).
//! Real-valued math functions reject complex arguments and report domain errors
//! (`sqrt(-1)`, `log(0)`) instead of producing NaN.
use log::trace;
use num_complex::Complex64;
use std::cmp::Ordering;
use thiserror::Error;

use crate::calc::calc_ast::{
    AssignTarget, BinaryOp, BoolOperator, Callee, CompareOp, Expr, Literal, MAX_DEPTH,
    SequenceKind, Statement, UnaryOp,
};
use crate::calc::value::{Environment, Value};

/// Functions callable from calculation code, bound by name in every new environment
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "sqrt", "abs", "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "sinh", "cosh", "tanh",
    "log", "log10", "log2", "exp", "max", "min", "round", "pow", "sum", "int", "float", "len",
];

/// Longest string (in bytes) or list a repetition may build
pub const MAX_SEQUENCE_LEN: usize = 1 << 24;

/// Why a statement could not be evaluated
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("name '{0}' is not defined")]
    UndefinedName(String),
    #[error("type error: {0}")]
    TypeMismatch(String),
    #[error("division by zero")]
    ZeroDivision,
    #[error("math domain error: {0}")]
    Domain(String),
    #[error("index error: {0}")]
    Index(String),
    #[error("{name}() expects {expected}")]
    Arity { name: String, expected: String },
    #[error("'{0}' is not callable")]
    NotCallable(String),
    #[error("assignment target is not a single plain name")]
    UnsupportedTarget,
    #[error("statement is not an assignment")]
    NotAnAssignment,
    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
    #[error("result too large: {0}")]
    Overflow(String),
}

/// New value for the assigned name
pub type Binding = (String, Value);

/// Computes the effect of one statement on the environment
pub trait Evaluator {
    /// Value assigned by `statement` given the bindings in `env`. Must not assume that the
    /// returned binding will be applied: the caller decides.
    fn evaluate(&self, statement: &Statement, env: &Environment) -> Result<Binding, EvalError>;
}

/// Default evaluator: interprets the expression tree directly
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter;

impl Evaluator for Interpreter {
    fn evaluate(&self, statement: &Statement, env: &Environment) -> Result<Binding, EvalError> {
        match statement {
            Statement::Assign { targets, value } => match targets.as_slice() {
                [AssignTarget::Name(name)] => {
                    let value = self.eval_expr(value, env)?;
                    Ok((name.clone(), value))
                }
                _ => Err(EvalError::UnsupportedTarget),
            },
            Statement::AugAssign {
                target: AssignTarget::Name(name),
                op,
                value,
            } => {
                let current = env
                    .get(name)
                    .ok_or_else(|| EvalError::UndefinedName(name.clone()))?;
                let rhs = self.eval_expr(value, env)?;
                let updated = binary(*op, current, &rhs)?;
                Ok((name.clone(), updated))
            }
            Statement::AugAssign { .. } => Err(EvalError::UnsupportedTarget),
            Statement::Other(_) => Err(EvalError::NotAnAssignment),
        }
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter
    }

    /// Value of a single expression
    pub fn eval_expr(&self, expr: &Expr, env: &Environment) -> Result<Value, EvalError> {
        self.eval_at(expr, env, 0)
    }

    fn eval_at(&self, expr: &Expr, env: &Environment, depth: usize) -> Result<Value, EvalError> {
        if depth > MAX_DEPTH {
            return Err(EvalError::TooDeep(MAX_DEPTH));
        }
        let depth = depth + 1;
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),
            Expr::Name(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedName(name.clone())),
            Expr::BinOp(op, lhs, rhs) => {
                let left = self.eval_at(lhs, env, depth)?;
                let right = self.eval_at(rhs, env, depth)?;
                binary(*op, &left, &right)
            }
            Expr::UnaryOp(op, operand) => {
                let operand = self.eval_at(operand, env, depth)?;
                unary(*op, &operand)
            }
            Expr::Call(callee, args) => {
                let function = match callee {
                    Callee::Name(name) => match env.get(name) {
                        Some(Value::Builtin(function)) => function.clone(),
                        Some(other) => return Err(EvalError::NotCallable(other.type_name().to_string())),
                        None => return Err(EvalError::UndefinedName(name.clone())),
                    },
                    // `math.sqrt(x)`: resolve the attribute against the builtin library
                    Callee::Attribute(name) if BUILTIN_FUNCTIONS.contains(&name.as_str()) => {
                        name.clone()
                    }
                    Callee::Attribute(name) => return Err(EvalError::UndefinedName(name.clone())),
                    Callee::Other => return Err(EvalError::NotCallable("expression".to_string())),
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval_at(arg, env, depth))
                    .collect::<Result<Vec<Value>, EvalError>>()?;
                trace!("calling builtin {} with {} argument(s)", function, args.len());
                call_builtin(&function, &args)
            }
            Expr::Compare(left, pairs) => {
                let mut current = self.eval_at(left, env, depth)?;
                for (op, comparator) in pairs {
                    let next = self.eval_at(comparator, env, depth)?;
                    if !compare(*op, &current, &next)? {
                        return Ok(Value::Bool(false));
                    }
                    current = next;
                }
                Ok(Value::Bool(true))
            }
            Expr::IfExp(test, body, orelse) => {
                if self.eval_at(test, env, depth)?.is_truthy() {
                    self.eval_at(body, env, depth)
                } else {
                    self.eval_at(orelse, env, depth)
                }
            }
            Expr::Subscript(value, index) => {
                let container = self.eval_at(value, env, depth)?;
                let index = self.eval_at(index, env, depth)?;
                subscript(&container, &index)
            }
            Expr::Sequence(kind, elements) => {
                let items = elements
                    .iter()
                    .map(|e| self.eval_at(e, env, depth))
                    .collect::<Result<Vec<Value>, EvalError>>()?;
                Ok(match kind {
                    SequenceKind::List => Value::List(items),
                    SequenceKind::Tuple => Value::Tuple(items),
                })
            }
            Expr::Attribute(value, name) => {
                let value = self.eval_at(value, env, depth)?;
                attribute(&value, name)
            }
            Expr::BoolOp(op, operands) => {
                let mut last = Value::None;
                for operand in operands {
                    last = self.eval_at(operand, env, depth)?;
                    let decided = match op {
                        BoolOperator::And => !last.is_truthy(),
                        BoolOperator::Or => last.is_truthy(),
                    };
                    if decided {
                        break;
                    }
                }
                Ok(last)
            }
        }
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(x) => Value::Real(*x),
        Literal::Imaginary(im) => Value::Complex(Complex64::new(0.0, *im)),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Str(s) => Value::Str(s.clone()),
        Literal::None => Value::None,
    }
}

fn unsupported(op: impl std::fmt::Display, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeMismatch(format!(
        "unsupported operand types for {}: '{}' and '{}'",
        op,
        left.type_name(),
        right.type_name()
    ))
}

//___________________________________ARITHMETIC____________________________________

/// `left op right`
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        if let (Value::Bool(a), Value::Bool(b)) = (left, right) {
            match op {
                BinaryOp::BitAnd => return Ok(Value::Bool(*a & *b)),
                BinaryOp::BitOr => return Ok(Value::Bool(*a | *b)),
                BinaryOp::BitXor => return Ok(Value::Bool(*a ^ *b)),
                _ => {}
            }
        }
        return int_binary(op, a, b);
    }
    if matches!(left, Value::Complex(_)) || matches!(right, Value::Complex(_)) {
        return match (left.as_complex(), right.as_complex()) {
            (Some(a), Some(b)) => complex_binary(op, a, b)
                .ok_or_else(|| unsupported(op.symbol(), left, right))?,
            _ => Err(unsupported(op.symbol(), left, right)),
        };
    }
    if let (Some(a), Some(b)) = (left.as_real(), right.as_real()) {
        return real_binary(op, a, b).ok_or_else(|| unsupported(op.symbol(), left, right))?;
    }
    sequence_binary(op, left, right)
}

fn int_binary(op: BinaryOp, a: i64, b: i64) -> Result<Value, EvalError> {
    let promoted = |x: f64| -> Result<Value, EvalError> { Ok(Value::Real(x)) };
    match op {
        BinaryOp::Add => a.checked_add(b).map_or(promoted(a as f64 + b as f64), |v| Ok(Value::Int(v))),
        BinaryOp::Sub => a.checked_sub(b).map_or(promoted(a as f64 - b as f64), |v| Ok(Value::Int(v))),
        BinaryOp::Mult => a.checked_mul(b).map_or(promoted(a as f64 * b as f64), |v| Ok(Value::Int(v))),
        BinaryOp::Div => {
            if b == 0 {
                Err(EvalError::ZeroDivision)
            } else {
                Ok(Value::Real(a as f64 / b as f64))
            }
        }
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(EvalError::ZeroDivision);
            }
            match (a.checked_div(b), a.checked_rem(b)) {
                (Some(q), Some(r)) => {
                    let q = if r != 0 && ((r < 0) != (b < 0)) { q - 1 } else { q };
                    Ok(Value::Int(q))
                }
                _ => promoted((a as f64 / b as f64).floor()),
            }
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(EvalError::ZeroDivision);
            }
            let r = a.checked_rem(b).unwrap_or(0);
            Ok(Value::Int(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }))
        }
        BinaryOp::Pow => {
            if b >= 0 {
                let exact = u32::try_from(b).ok().and_then(|e| a.checked_pow(e));
                match exact {
                    Some(v) => Ok(Value::Int(v)),
                    None => real_pow(a as f64, b as f64),
                }
            } else if a == 0 {
                Err(EvalError::ZeroDivision)
            } else {
                real_pow(a as f64, b as f64)
            }
        }
        BinaryOp::BitAnd => Ok(Value::Int(a & b)),
        BinaryOp::BitOr => Ok(Value::Int(a | b)),
        BinaryOp::BitXor => Ok(Value::Int(a ^ b)),
        BinaryOp::LShift => {
            if b < 0 {
                return Err(EvalError::Domain("negative shift count".to_string()));
            }
            let shifted = u32::try_from(b)
                .ok()
                .and_then(|s| 2i64.checked_pow(s))
                .and_then(|factor| a.checked_mul(factor));
            match shifted {
                Some(v) => Ok(Value::Int(v)),
                None => promoted(a as f64 * 2f64.powf(b as f64)),
            }
        }
        BinaryOp::RShift => {
            if b < 0 {
                return Err(EvalError::Domain("negative shift count".to_string()));
            }
            Ok(Value::Int(if b >= 64 {
                if a < 0 { -1 } else { 0 }
            } else {
                a >> b
            }))
        }
    }
}

/// float arithmetic; `None` for operators that do not apply to floats
fn real_binary(op: BinaryOp, a: f64, b: f64) -> Option<Result<Value, EvalError>> {
    let result = match op {
        BinaryOp::Add => Ok(Value::Real(a + b)),
        BinaryOp::Sub => Ok(Value::Real(a - b)),
        BinaryOp::Mult => Ok(Value::Real(a * b)),
        BinaryOp::Div if b == 0.0 => Err(EvalError::ZeroDivision),
        BinaryOp::Div => Ok(Value::Real(a / b)),
        BinaryOp::FloorDiv if b == 0.0 => Err(EvalError::ZeroDivision),
        BinaryOp::FloorDiv => Ok(Value::Real((a / b).floor())),
        BinaryOp::Mod if b == 0.0 => Err(EvalError::ZeroDivision),
        BinaryOp::Mod => {
            let r = a % b;
            Ok(Value::Real(if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r }))
        }
        BinaryOp::Pow => real_pow(a, b),
        _ => return None,
    };
    Some(result)
}

fn real_pow(base: f64, exponent: f64) -> Result<Value, EvalError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(EvalError::ZeroDivision);
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Ok(Value::Complex(Complex64::new(base, 0.0).powf(exponent)));
    }
    let result = base.powf(exponent);
    if result.is_infinite() && base.is_finite() && exponent.is_finite() {
        return Err(EvalError::Domain("numerical result out of range".to_string()));
    }
    Ok(Value::Real(result))
}

/// exact integer powers by repeated squaring, so `j ** 2` is `-1 + 0j`
fn complex_powi(base: Complex64, exponent: i64) -> Result<Complex64, EvalError> {
    if exponent < 0 && base == Complex64::new(0.0, 0.0) {
        return Err(EvalError::ZeroDivision);
    }
    let mut result = Complex64::new(1.0, 0.0);
    let mut factor = base;
    let mut n = exponent.unsigned_abs();
    while n > 0 {
        if n & 1 == 1 {
            result *= factor;
        }
        factor *= factor;
        n >>= 1;
    }
    Ok(if exponent < 0 {
        Complex64::new(1.0, 0.0) / result
    } else {
        result
    })
}

/// complex arithmetic; `None` for operators that do not apply to complex numbers
fn complex_binary(op: BinaryOp, a: Complex64, b: Complex64) -> Option<Result<Value, EvalError>> {
    let zero = Complex64::new(0.0, 0.0);
    let result = match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mult => Ok(a * b),
        BinaryOp::Div if b == zero => Err(EvalError::ZeroDivision),
        BinaryOp::Div => Ok(a / b),
        BinaryOp::Pow if b.im == 0.0 && b.re.fract() == 0.0 && b.re.abs() <= 1e6 => {
            complex_powi(a, b.re as i64)
        }
        BinaryOp::Pow if a == zero => {
            if b.re < 0.0 || b.im != 0.0 {
                Err(EvalError::ZeroDivision)
            } else {
                Ok(zero)
            }
        }
        BinaryOp::Pow => Ok(a.powc(b)),
        _ => return None,
    };
    Some(result.map(Value::Complex))
}

/// `+` and `*` on strings, lists and tuples
fn sequence_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::Tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinaryOp::Mult, seq, count) | (BinaryOp::Mult, count, seq)
            if count.as_int().is_some() =>
        {
            let times = count.as_int().unwrap_or(0);
            match seq {
                Value::Str(s) => Ok(Value::Str(s.repeat(repeat_count(s.len(), times)?))),
                Value::List(items) => Ok(Value::List(repeat_items(items, times)?)),
                Value::Tuple(items) => Ok(Value::Tuple(repeat_items(items, times)?)),
                _ => Err(unsupported(op.symbol(), left, right)),
            }
        }
        _ => Err(unsupported(op.symbol(), left, right)),
    }
}

/// Number of copies for `sequence * times`, zero for an empty sequence or a non-positive count.
/// Results longer than `MAX_SEQUENCE_LEN` elements are refused.
fn repeat_count(len: usize, times: i64) -> Result<usize, EvalError> {
    if len == 0 || times <= 0 {
        return Ok(0);
    }
    let times = usize::try_from(times).map_err(|_| EvalError::Overflow("repeat count".to_string()))?;
    match len.checked_mul(times) {
        Some(total) if total <= MAX_SEQUENCE_LEN => Ok(times),
        _ => Err(EvalError::Overflow(format!(
            "sequence of {} repeated {} times",
            len, times
        ))),
    }
}

fn repeat_items(items: &[Value], times: i64) -> Result<Vec<Value>, EvalError> {
    let times = repeat_count(items.len(), times)?;
    let mut repeated = Vec::with_capacity(items.len() * times);
    for _ in 0..times {
        repeated.extend(items.iter().cloned());
    }
    Ok(repeated)
}

/// `op operand`
pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, EvalError> {
    let bad_operand = || {
        EvalError::TypeMismatch(format!(
            "bad operand type for unary {}: '{}'",
            op,
            operand.type_name()
        ))
    };
    match (op, operand) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Neg, Value::Int(i)) => Ok(i.checked_neg().map_or(Value::Real(-(*i as f64)), Value::Int)),
        (UnaryOp::Neg, Value::Bool(b)) => Ok(Value::Int(-(*b as i64))),
        (UnaryOp::Neg, Value::Real(x)) => Ok(Value::Real(-x)),
        (UnaryOp::Neg, Value::Complex(c)) => Ok(Value::Complex(-c)),
        (UnaryOp::Pos, Value::Bool(b)) => Ok(Value::Int(*b as i64)),
        (UnaryOp::Pos, value) if value.is_numeric() => Ok(value.clone()),
        (UnaryOp::Invert, value) => value.as_int().map(|i| Value::Int(!i)).ok_or_else(bad_operand),
        _ => Err(bad_operand()),
    }
}

//___________________________________COMPARISONS____________________________________

/// equality across numeric types (`1 == 1.0 == True`), structural otherwise
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if a.is_numeric() && b.is_numeric() {
        return a.as_complex() == b.as_complex();
    }
    match (a, b) {
        (Value::List(x), Value::List(y)) | (Value::Tuple(x), Value::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| values_equal(p, q))
        }
        _ => a == b,
    }
}

fn ordering(a: &Value, b: &Value) -> Result<Ordering, EvalError> {
    let unorderable = || {
        EvalError::TypeMismatch(format!(
            "'<' not supported between '{}' and '{}'",
            a.type_name(),
            b.type_name()
        ))
    };
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        _ => match (a.as_real(), b.as_real()) {
            // NaN compares false every way, reported here as "not less, not greater"
            (Some(x), Some(y)) => Ok(x.partial_cmp(&y).unwrap_or(Ordering::Equal)),
            _ => Err(unorderable()),
        },
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, EvalError> {
    match (container, item) {
        (Value::List(items), _) | (Value::Tuple(items), _) => {
            Ok(items.iter().any(|candidate| values_equal(candidate, item)))
        }
        (Value::Str(text), Value::Str(part)) => Ok(text.contains(part.as_str())),
        _ => Err(EvalError::TypeMismatch(format!(
            "argument of type '{}' is not iterable",
            container.type_name()
        ))),
    }
}

/// one link of a comparison chain
pub fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let nan_involved = matches!(left.as_real(), Some(x) if x.is_nan())
        || matches!(right.as_real(), Some(y) if y.is_nan());
    match op {
        CompareOp::Eq => Ok(values_equal(left, right)),
        CompareOp::NotEq => Ok(!values_equal(left, right)),
        CompareOp::Lt => Ok(!nan_involved && ordering(left, right)? == Ordering::Less),
        CompareOp::Gt => Ok(!nan_involved && ordering(left, right)? == Ordering::Greater),
        CompareOp::LtE => Ok(!nan_involved && ordering(left, right)? != Ordering::Greater),
        CompareOp::GtE => Ok(!nan_involved && ordering(left, right)? != Ordering::Less),
        CompareOp::In => contains(right, left),
        CompareOp::NotIn => contains(right, left).map(|found| !found),
        CompareOp::Is => Ok(std::mem::discriminant(left) == std::mem::discriminant(right)
            && values_equal(left, right)),
        CompareOp::IsNot => Ok(!(std::mem::discriminant(left) == std::mem::discriminant(right)
            && values_equal(left, right))),
    }
}

//___________________________________CONTAINERS____________________________________

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let position = if index < 0 { index + len } else { index };
    (0..len).contains(&position).then_some(position as usize)
}

fn subscript(container: &Value, index: &Value) -> Result<Value, EvalError> {
    let position = index.as_int().ok_or_else(|| {
        EvalError::TypeMismatch(format!("indices must be integers, not {}", index.type_name()))
    })?;
    let out_of_range = || EvalError::Index(format!("index {} out of range", position));
    match container {
        Value::List(items) | Value::Tuple(items) => normalize_index(position, items.len())
            .map(|i| items[i].clone())
            .ok_or_else(out_of_range),
        Value::Str(text) => {
            let chars: Vec<char> = text.chars().collect();
            normalize_index(position, chars.len())
                .map(|i| Value::Str(chars[i].to_string()))
                .ok_or_else(out_of_range)
        }
        other => Err(EvalError::TypeMismatch(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// `.real` / `.imag` of numbers
fn attribute(value: &Value, name: &str) -> Result<Value, EvalError> {
    match (value, name) {
        (Value::Complex(c), "real") => Ok(Value::Real(c.re)),
        (Value::Complex(c), "imag") => Ok(Value::Real(c.im)),
        (Value::Real(_), "real") => Ok(value.clone()),
        (Value::Real(_), "imag") => Ok(Value::Real(0.0)),
        (Value::Int(_) | Value::Bool(_), "real") => Ok(Value::Int(value.as_int().unwrap_or(0))),
        (Value::Int(_) | Value::Bool(_), "imag") => Ok(Value::Int(0)),
        _ => Err(EvalError::TypeMismatch(format!(
            "'{}' object has no attribute '{}'",
            value.type_name(),
            name
        ))),
    }
}

//___________________________________BUILTINS____________________________________

fn arity(name: &str, expected: &str) -> EvalError {
    EvalError::Arity {
        name: name.to_string(),
        expected: expected.to_string(),
    }
}

/// real argument of a math function; complex numbers and non-numbers are rejected
fn real_arg(name: &str, value: &Value) -> Result<f64, EvalError> {
    value.as_real().ok_or_else(|| {
        EvalError::TypeMismatch(format!(
            "{}() needs a real number, got '{}'",
            name,
            value.type_name()
        ))
    })
}

fn domain(name: &str) -> EvalError {
    EvalError::Domain(format!("{}() argument out of domain", name))
}

/// single-argument real function with a domain check
fn unary_math(
    name: &str,
    args: &[Value],
    in_domain: impl Fn(f64) -> bool,
    f: impl Fn(f64) -> f64,
) -> Result<Value, EvalError> {
    let [arg] = args else {
        return Err(arity(name, "exactly one argument"));
    };
    let x = real_arg(name, arg)?;
    if !in_domain(x) {
        return Err(domain(name));
    }
    let result = f(x);
    if result.is_infinite() && x.is_finite() {
        return Err(EvalError::Domain(format!("{}() result out of range", name)));
    }
    Ok(Value::Real(result))
}

/// items of `max`/`min`/`sum`: either one iterable argument or the arguments themselves
fn iterable_items<'a>(name: &str, args: &'a [Value]) -> Result<&'a [Value], EvalError> {
    match args {
        [Value::List(items)] | [Value::Tuple(items)] => Ok(items),
        [single] => Err(EvalError::TypeMismatch(format!(
            "'{}' object is not iterable",
            single.type_name()
        ))),
        [] => Err(arity(name, "at least one argument")),
        many => Ok(many),
    }
}

fn extremum(name: &str, args: &[Value], wanted: Ordering) -> Result<Value, EvalError> {
    let items = iterable_items(name, args)?;
    let mut best = items
        .first()
        .ok_or_else(|| EvalError::Domain(format!("{}() arg is an empty sequence", name)))?;
    for candidate in &items[1..] {
        if ordering(candidate, best)? == wanted {
            best = candidate;
        }
    }
    Ok(best.clone())
}

fn round_value(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [value] => match value {
            Value::Int(_) | Value::Bool(_) => Ok(Value::Int(value.as_int().unwrap_or(0))),
            Value::Real(x) if x.is_finite() => {
                let rounded = x.round_ties_even();
                if rounded.abs() < 9.2e18 {
                    Ok(Value::Int(rounded as i64))
                } else {
                    Ok(Value::Real(rounded))
                }
            }
            Value::Real(_) => Err(EvalError::Domain("cannot round a non-finite float".to_string())),
            other => Err(EvalError::TypeMismatch(format!(
                "type {} doesn't define __round__",
                other.type_name()
            ))),
        },
        [value, digits] => {
            let digits = digits.as_int().ok_or_else(|| {
                EvalError::TypeMismatch("round() digits must be an integer".to_string())
            })?;
            let digits = digits.clamp(-308, 308) as i32;
            match value {
                Value::Int(_) | Value::Bool(_) => {
                    let i = value.as_int().unwrap_or(0);
                    if digits >= 0 {
                        Ok(Value::Int(i))
                    } else {
                        let scale = 10f64.powi(-digits);
                        Ok(Value::Int(((i as f64 / scale).round_ties_even() * scale) as i64))
                    }
                }
                Value::Real(x) => {
                    let scale = 10f64.powi(digits);
                    let scaled = x * scale;
                    if scaled.is_finite() {
                        Ok(Value::Real(scaled.round_ties_even() / scale))
                    } else {
                        Ok(Value::Real(*x))
                    }
                }
                other => Err(EvalError::TypeMismatch(format!(
                    "type {} doesn't define __round__",
                    other.type_name()
                ))),
            }
        }
        _ => Err(arity("round", "one or two arguments")),
    }
}

fn modular_pow(base: i64, exponent: i64, modulus: i64) -> Result<Value, EvalError> {
    if modulus == 0 {
        return Err(EvalError::Domain("pow() 3rd argument cannot be 0".to_string()));
    }
    if exponent < 0 {
        return Err(EvalError::Domain("pow() negative exponent with modulus".to_string()));
    }
    let m = modulus as i128;
    let mut result: i128 = 1;
    let mut factor = (base as i128).rem_euclid(m);
    let mut n = exponent;
    while n > 0 {
        if n & 1 == 1 {
            result = result * factor % m;
        }
        factor = factor * factor % m;
        n >>= 1;
    }
    // result takes the sign of the modulus
    let result = result.rem_euclid(m.abs());
    let result = if m < 0 && result != 0 { result + m } else { result };
    Ok(Value::Int(result as i64))
}

/// Calls a builtin by name on already evaluated arguments
pub fn call_builtin(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    match name {
        "sqrt" => unary_math(name, args, |x| x >= 0.0, f64::sqrt),
        "sin" => unary_math(name, args, f64::is_finite, f64::sin),
        "cos" => unary_math(name, args, f64::is_finite, f64::cos),
        "tan" => unary_math(name, args, f64::is_finite, f64::tan),
        "asin" => unary_math(name, args, |x| (-1.0..=1.0).contains(&x), f64::asin),
        "acos" => unary_math(name, args, |x| (-1.0..=1.0).contains(&x), f64::acos),
        "atan" => unary_math(name, args, |_| true, f64::atan),
        "sinh" => unary_math(name, args, |_| true, f64::sinh),
        "cosh" => unary_math(name, args, |_| true, f64::cosh),
        "tanh" => unary_math(name, args, |_| true, f64::tanh),
        "exp" => unary_math(name, args, |_| true, f64::exp),
        "log10" => unary_math(name, args, |x| x > 0.0, f64::log10),
        "log2" => unary_math(name, args, |x| x > 0.0, f64::log2),
        "log" => match args {
            [_] => unary_math(name, args, |x| x > 0.0, f64::ln),
            [x, base] => {
                let x = real_arg(name, x)?;
                let base = real_arg(name, base)?;
                if x <= 0.0 || base <= 0.0 {
                    return Err(domain(name));
                }
                if base == 1.0 {
                    return Err(EvalError::ZeroDivision);
                }
                Ok(Value::Real(x.ln() / base.ln()))
            }
            _ => Err(arity(name, "one or two arguments")),
        },
        "atan2" => match args {
            [y, x] => Ok(Value::Real(real_arg(name, y)?.atan2(real_arg(name, x)?))),
            _ => Err(arity(name, "exactly two arguments")),
        },
        "abs" => match args {
            [Value::Int(i)] => Ok(i.checked_abs().map_or(Value::Real((*i as f64).abs()), Value::Int)),
            [Value::Bool(b)] => Ok(Value::Int(*b as i64)),
            [Value::Real(x)] => Ok(Value::Real(x.abs())),
            [Value::Complex(c)] => Ok(Value::Real(c.norm())),
            [other] => Err(EvalError::TypeMismatch(format!(
                "bad operand type for abs(): '{}'",
                other.type_name()
            ))),
            _ => Err(arity(name, "exactly one argument")),
        },
        "max" => extremum(name, args, Ordering::Greater),
        "min" => extremum(name, args, Ordering::Less),
        "round" => round_value(args),
        "pow" => match args {
            [base, exponent] => binary(BinaryOp::Pow, base, exponent),
            [base, exponent, modulus] => match (base.as_int(), exponent.as_int(), modulus.as_int()) {
                (Some(b), Some(e), Some(m)) => modular_pow(b, e, m),
                _ => Err(EvalError::TypeMismatch(
                    "pow() 3-argument form requires integers".to_string(),
                )),
            },
            _ => Err(arity(name, "two or three arguments")),
        },
        "sum" => {
            let (items, start) = match args {
                [iterable] => (iterable, Value::Int(0)),
                [iterable, start] => (iterable, start.clone()),
                _ => return Err(arity(name, "one or two arguments")),
            };
            let items = iterable_items(name, std::slice::from_ref(items))?;
            items
                .iter()
                .try_fold(start, |total, item| binary(BinaryOp::Add, &total, item))
        }
        "int" => match args {
            [Value::Int(i)] => Ok(Value::Int(*i)),
            [Value::Bool(b)] => Ok(Value::Int(*b as i64)),
            [Value::Real(x)] if x.is_finite() && x.abs() < 9.2e18 => Ok(Value::Int(x.trunc() as i64)),
            [Value::Real(_)] => Err(EvalError::Domain("cannot convert float to integer".to_string())),
            [Value::Str(s)] => s
                .trim()
                .replace('_', "")
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| EvalError::Domain(format!("invalid literal for int(): '{}'", s))),
            [other] => Err(EvalError::TypeMismatch(format!(
                "int() argument must be a string or a real number, not '{}'",
                other.type_name()
            ))),
            _ => Err(arity(name, "exactly one argument")),
        },
        "float" => match args {
            [] => Ok(Value::Real(0.0)),
            [Value::Str(s)] => {
                let text = s.trim().to_ascii_lowercase();
                let parsed = match text.as_str() {
                    "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
                    "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
                    "nan" => Some(f64::NAN),
                    other => other.parse::<f64>().ok(),
                };
                parsed
                    .map(Value::Real)
                    .ok_or_else(|| EvalError::Domain(format!("could not convert string to float: '{}'", s)))
            }
            [value] => real_arg(name, value).map(Value::Real),
            _ => Err(arity(name, "at most one argument")),
        },
        "len" => match args {
            [Value::Str(s)] => Ok(Value::Int(s.chars().count() as i64)),
            [Value::List(items)] | [Value::Tuple(items)] => Ok(Value::Int(items.len() as i64)),
            [other] => Err(EvalError::TypeMismatch(format!(
                "object of type '{}' has no len()",
                other.type_name()
            ))),
            _ => Err(arity(name, "exactly one argument")),
        },
        other => Err(EvalError::UndefinedName(other.to_string())),
    }
}
