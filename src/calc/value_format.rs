//! Display strings for computed values and literal constants.
//!
//! `format_value` is the canonical text for a value on the right of `&=`: results that are
//! integers up to floating noise are shown as integers, other reals get 6 significant figures,
//! complex numbers use the engineering `j`, booleans become text-mode literals.
use crate::calc::calc_ast::Literal;
use crate::calc::value::Value;

/// Values closer than this to an integer are displayed as that integer
pub const INTEGER_SNAP_TOLERANCE: f64 = 1e-10;
/// Significant figures of the general numeric notation
pub const SIGNIFICANT_FIGURES: usize = 6;

/// General numeric notation with `precision` significant figures:
/// positional when the decimal exponent lies in `-4..precision`, scientific (`1.5e+06`)
/// otherwise; trailing zeros and a dangling decimal point are removed in both cases.
pub fn format_general(x: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    // rounding to `precision` digits first decides the exponent (9.999995 -> 1e+01)
    let sci = format!("{:.*e}", precision - 1, x);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let mantissa = strip_fraction_zeros(mantissa);
        format!(
            "{}e{}{:02}",
            mantissa,
            if exponent < 0 { '-' } else { '+' },
            exponent.abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        strip_fraction_zeros(&format!("{:.*}", decimals, x))
    }
}

fn strip_fraction_zeros(text: &str) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text.to_string()
    }
}

/// `format_general` with the default 6 significant figures
pub fn general(x: f64) -> String {
    format_general(x, SIGNIFICANT_FIGURES)
}

/// Real result: integer when within `INTEGER_SNAP_TOLERANCE` of one, general notation otherwise
pub fn format_real(x: f64) -> String {
    if x.is_infinite() {
        return if x > 0.0 { r"\infty" } else { r"-\infty" }.to_string();
    }
    let nearest = x.round();
    if (x - nearest).abs() < INTEGER_SNAP_TOLERANCE {
        if nearest == 0.0 {
            "0".to_string()
        } else {
            format!("{:.0}", nearest)
        }
    } else {
        general(x)
    }
}

/// `re + imj` with the real part omitted when it is exactly zero and a bare `j` for unit
/// imaginary parts: `3 + j`, `-2j`, `-1 -j`
pub fn format_complex(re: f64, im: f64) -> String {
    let real = if re != 0.0 { general(re) } else { String::new() };
    let imag = if im == 1.0 {
        "j".to_string()
    } else if im == -1.0 {
        "-j".to_string()
    } else {
        format!("{}j", general(im))
    };
    if !real.is_empty() && im >= 0.0 {
        format!("{} + {}", real, imag)
    } else if !real.is_empty() {
        format!("{} {}", real, imag)
    } else {
        imag
    }
}

/// Canonical display string of a computed value
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Complex(c) => format_complex(c.re, c.im),
        Value::Real(x) => format_real(*x),
        Value::Bool(true) => r"\text{True}".to_string(),
        Value::Bool(false) => r"\text{False}".to_string(),
        other => other.to_string(),
    }
}

/// Text of a literal constant as written in a formula
pub fn format_literal(literal: &Literal) -> String {
    match literal {
        Literal::Int(i) => i.to_string(),
        Literal::Float(x) if x.is_infinite() => {
            if *x > 0.0 { r"\infty" } else { r"-\infty" }.to_string()
        }
        Literal::Float(x) => general(*x),
        Literal::Imaginary(im) => {
            Value::Complex(num_complex::Complex64::new(0.0, *im)).to_string()
        }
        Literal::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        Literal::Str(s) => s.clone(),
        Literal::None => "None".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_format_general() {
        assert_eq!(general(2.5), "2.5");
        assert_eq!(general(3.0), "3");
        assert_eq!(general(3.14159265), "3.14159");
        assert_eq!(general(0.0001), "0.0001");
        assert_eq!(general(0.00001), "1e-05");
        assert_eq!(general(100000.0), "100000");
        assert_eq!(general(1000000.0), "1e+06");
        assert_eq!(general(123456789.0), "1.23457e+08");
        assert_eq!(general(-2.0), "-2");
        assert_eq!(general(9.9999996), "10");
        assert_eq!(format_general(1.0 / 3.0, 3), "0.333");
    }

    #[test]
    fn test_integer_snap() {
        assert_eq!(format_value(&Value::Real(15.0)), "15");
        assert_eq!(format_value(&Value::Real(0.1 + 0.2 - 0.3)), "0");
        assert_eq!(format_value(&Value::Real(2.00000000001)), "2");
        assert_eq!(format_value(&Value::Real(-7.0 + 1e-12)), "-7");
        assert_eq!(format_value(&Value::Real(1e20)), "100000000000000000000");
        assert_eq!(format_value(&Value::Real(-0.0)), "0");
    }

    #[test]
    fn test_real_general() {
        assert_eq!(format_value(&Value::Real(2.5)), "2.5");
        assert_eq!(format_value(&Value::Real(1.0 / 3.0)), "0.333333");
        assert_eq!(format_value(&Value::Real(2.0000001)), "2");
        assert_eq!(format_value(&Value::Real(0.000012345)), "1.2345e-05");
    }

    #[test]
    fn test_complex_format() {
        assert_eq!(format_value(&Value::Complex(Complex64::new(3.0, 1.0))), "3 + j");
        assert_eq!(format_value(&Value::Complex(Complex64::new(0.0, -2.0))), "-2j");
        assert_eq!(format_value(&Value::Complex(Complex64::new(-1.0, -1.0))), "-1 -j");
        assert_eq!(format_value(&Value::Complex(Complex64::new(0.0, 1.0))), "j");
        assert_eq!(format_value(&Value::Complex(Complex64::new(1.5, 2.25))), "1.5 + 2.25j");
        assert_eq!(format_value(&Value::Complex(Complex64::new(2.0, 0.0))), "2 + 0j");
    }

    #[test]
    fn test_bool_and_other() {
        assert_eq!(format_value(&Value::Bool(true)), r"\text{True}");
        assert_eq!(format_value(&Value::Bool(false)), r"\text{False}");
        assert_eq!(format_value(&Value::Int(42)), "42");
        assert_eq!(format_value(&Value::Str("abc".to_string())), "abc");
        assert_eq!(
            format_value(&Value::List(vec![Value::Int(1), Value::Int(2)])),
            "[1, 2]"
        );
    }

    #[test]
    fn test_format_literal() {
        assert_eq!(format_literal(&Literal::Int(7)), "7");
        assert_eq!(format_literal(&Literal::Float(0.5)), "0.5");
        assert_eq!(format_literal(&Literal::Float(f64::INFINITY)), r"\infty");
        assert_eq!(format_literal(&Literal::Float(f64::NEG_INFINITY)), r"-\infty");
        assert_eq!(format_literal(&Literal::Imaginary(2.0)), "2j");
        assert_eq!(format_literal(&Literal::Bool(true)), "True");
    }
}
