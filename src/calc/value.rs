//! Runtime values and the environment they live in.
//!
//! `Value` is what the evaluator produces for every accepted assignment; the renderers only
//! read it. `Environment` is the name -> value mapping threaded through one conversion run:
//! it starts with the named constants (`pi`, `e`, `j`) and the builtin functions, and grows
//! by one binding per accepted statement.
use num_complex::Complex64;
use std::collections::HashMap;
use std::f64::consts::{E, PI};
use std::fmt;

use crate::calc::evaluator::BUILTIN_FUNCTIONS;

/// Scalar (and small container) values produced by evaluation
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Real(f64),
    Complex(Complex64),
    Bool(bool),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    None,
    /// a callable from the builtin library, referenced by name
    Builtin(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Real(_) => "float",
            Value::Complex(_) => "complex",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::None => "NoneType",
            Value::Builtin(_) => "builtin_function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(i) => *i != 0,
            Value::Real(x) => *x != 0.0,
            Value::Complex(c) => c.re != 0.0 || c.im != 0.0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) | Value::Tuple(items) => !items.is_empty(),
            Value::None => false,
            Value::Builtin(_) => true,
        }
    }

    /// numeric view of int/bool/float, `None` for anything else
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Real(x) => Some(*x),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// integer view of int/bool, `None` for anything else
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// numeric view including complex numbers
    pub fn as_complex(&self) -> Option<Complex64> {
        match self {
            Value::Complex(c) => Some(*c),
            other => other.as_real().map(|re| Complex64::new(re, 0.0)),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Int(_) | Value::Real(_) | Value::Complex(_) | Value::Bool(_)
        )
    }

    /// quoted representation used for elements inside containers
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            other => other.to_string(),
        }
    }
}

/// Shortest round-trip text for a float, laid out the way a Python `repr` does it:
/// positional for decimal exponents in `-4..16`, otherwise `d.ddde+XX`.
pub fn repr_real(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    // `{:e}` yields the shortest digits that round-trip, e.g. "1.2345e2"
    let sci = format!("{:e}", x.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let sign = if x.is_sign_negative() { "-" } else { "" };

    if (-4..16).contains(&exponent) {
        let body = if exponent >= 0 {
            let int_len = exponent as usize + 1;
            if digits.len() <= int_len {
                format!("{}{}.0", digits, "0".repeat(int_len - digits.len()))
            } else {
                format!("{}.{}", &digits[..int_len], &digits[int_len..])
            }
        } else {
            format!("0.{}{}", "0".repeat((-exponent - 1) as usize), digits)
        };
        format!("{}{}", sign, body)
    } else {
        let mantissa = if digits.len() > 1 {
            format!("{}.{}", &digits[..1], &digits[1..])
        } else {
            digits
        };
        format!("{}{}e{}{:02}", sign, mantissa, if exponent < 0 { '-' } else { '+' }, exponent.abs())
    }
}

/// component of a complex number: like `repr_real` but without a trailing `.0`
fn repr_complex_part(x: f64) -> String {
    let text = repr_real(x);
    match text.strip_suffix(".0") {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

fn join_repr(items: &[Value]) -> String {
    items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Real(x) => write!(f, "{}", repr_real(*x)),
            Value::Complex(c) => {
                if c.re == 0.0 && c.re.is_sign_positive() {
                    write!(f, "{}j", repr_complex_part(c.im))
                } else {
                    let sign = if c.im.is_sign_negative() && !c.im.is_nan() { "-" } else { "+" };
                    write!(
                        f,
                        "({}{}{}j)",
                        repr_complex_part(c.re),
                        sign,
                        repr_complex_part(c.im.abs())
                    )
                }
            }
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => write!(f, "[{}]", join_repr(items)),
            Value::Tuple(items) if items.len() == 1 => write!(f, "({},)", items[0].repr()),
            Value::Tuple(items) => write!(f, "({})", join_repr(items)),
            Value::None => write!(f, "None"),
            Value::Builtin(name) => write!(f, "<built-in function {}>", name),
        }
    }
}

/// Accumulating name -> value mapping for one conversion run
#[derive(Clone, Debug, PartialEq)]
pub struct Environment {
    bindings: HashMap<String, Value>,
    /// names bound by statements, in order of first assignment
    assigned: Vec<String>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// environment pre-seeded with `pi`, `e`, the imaginary unit `j` and the builtin library
    pub fn new() -> Self {
        let mut bindings = HashMap::new();
        for name in BUILTIN_FUNCTIONS {
            bindings.insert(name.to_string(), Value::Builtin(name.to_string()));
        }
        bindings.insert("pi".to_string(), Value::Real(PI));
        bindings.insert("e".to_string(), Value::Real(E));
        bindings.insert("j".to_string(), Value::Complex(Complex64::new(0.0, 1.0)));
        Environment {
            bindings,
            assigned: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn insert(&mut self, name: &str, value: Value) {
        if !self.assigned.iter().any(|n| n == name) {
            self.assigned.push(name.to_string());
        }
        self.bindings.insert(name.to_string(), value);
    }

    /// bindings created by statements (not the pre-seeded ones), in assignment order
    pub fn assigned(&self) -> Vec<(&str, &Value)> {
        self.assigned
            .iter()
            .filter_map(|name| self.bindings.get(name).map(|v| (name.as_str(), v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_real() {
        assert_eq!(repr_real(3.0), "3.0");
        assert_eq!(repr_real(2.5), "2.5");
        assert_eq!(repr_real(-0.125), "-0.125");
        assert_eq!(repr_real(0.0001), "0.0001");
        assert_eq!(repr_real(1.5e-7), "1.5e-07");
        assert_eq!(repr_real(1e20), "1e+20");
        assert_eq!(repr_real(123456.0), "123456.0");
        assert_eq!(repr_real(f64::INFINITY), "inf");
    }

    #[test]
    fn test_display_containers() {
        let list = Value::List(vec![Value::Int(1), Value::Real(2.5), Value::Str("a".to_string())]);
        assert_eq!(list.to_string(), "[1, 2.5, 'a']");
        assert_eq!(Value::Tuple(vec![Value::Int(1)]).to_string(), "(1,)");
        assert_eq!(Value::Tuple(vec![Value::Int(1), Value::Int(2)]).to_string(), "(1, 2)");
    }

    #[test]
    fn test_display_complex() {
        assert_eq!(Value::Complex(Complex64::new(3.0, 1.0)).to_string(), "(3+1j)");
        assert_eq!(Value::Complex(Complex64::new(0.0, 2.0)).to_string(), "2j");
        assert_eq!(Value::Complex(Complex64::new(1.5, -2.0)).to_string(), "(1.5-2j)");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Real(0.5).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::None.is_truthy());
        assert!(Value::List(vec![Value::None]).is_truthy());
    }

    #[test]
    fn test_environment_seeding() {
        let env = Environment::new();
        assert_eq!(env.get("pi"), Some(&Value::Real(PI)));
        assert_eq!(env.get("j"), Some(&Value::Complex(Complex64::new(0.0, 1.0))));
        assert_eq!(env.get("sqrt"), Some(&Value::Builtin("sqrt".to_string())));
        assert!(env.assigned().is_empty());
    }

    #[test]
    fn test_environment_assignment_order() {
        let mut env = Environment::new();
        env.insert("b", Value::Int(1));
        env.insert("a", Value::Int(2));
        env.insert("b", Value::Int(3));
        let assigned = env.assigned();
        assert_eq!(assigned, vec![("b", &Value::Int(3)), ("a", &Value::Int(2))]);
    }
}
