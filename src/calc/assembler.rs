//! Line assembly: assignment records to one LaTeX `aligned` block.
//!
//! Trivial records ("given values") become `name &= value`; the others show the enabled parts
//! of the derivation `name &= symbolic = substituted = result`. Rows are separated by `\\`,
//! except that a wider `\\[10pt]` break marks each transition from a given value to a
//! derived one.
use itertools::Itertools;

use crate::calc::identifier::render_identifier;
use crate::calc::latex_symbolic::render_symbolic;
use crate::calc::sequencer::AssignmentRecord;
use crate::calc::value_format::format_value;

pub const ROW_BREAK: &str = r"\\";
/// break with extra vertical space between given values and derived calculations
pub const WIDE_ROW_BREAK: &str = r"\\[10pt]";

/// Which parts of a non-trivial line are shown
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    pub include_symbolic: bool,
    pub include_substitution: bool,
    pub include_result: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            include_symbolic: true,
            include_substitution: true,
            include_result: true,
        }
    }
}

impl RenderConfig {
    pub fn new(include_symbolic: bool, include_substitution: bool, include_result: bool) -> Self {
        RenderConfig {
            include_symbolic,
            include_substitution,
            include_result,
        }
    }
}

/// `name &= ...` for one record
pub fn render_line(record: &AssignmentRecord, config: &RenderConfig) -> String {
    let target = render_identifier(&record.name);
    let value = format_value(&record.value);
    let Some(source) = record.source.as_ref().filter(|_| record.has_formula()) else {
        return format!("{} &= {}", target, value);
    };

    let mut parts: Vec<String> = Vec::with_capacity(3);
    let symbolic = render_symbolic(source);
    if config.include_symbolic {
        parts.push(symbolic.clone());
    }
    if config.include_substitution {
        if let Some(substituted) = &record.substituted {
            if !config.include_symbolic || *substituted != symbolic {
                parts.push(substituted.clone());
            }
        }
    }
    if config.include_result {
        parts.push(value);
    }
    format!("{} &= {}", target, parts.join(" = "))
}

/// Complete `aligned` block, or an empty string when there is nothing to show
pub fn assemble(records: &[AssignmentRecord], config: &RenderConfig) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };
    let mut rows = vec![render_line(first, config)];
    for (previous, current) in records.iter().tuple_windows() {
        let separator = if previous.is_trivial && !current.is_trivial {
            WIDE_ROW_BREAK
        } else {
            ROW_BREAK
        };
        rows.push(separator.to_string());
        rows.push(render_line(current, config));
    }
    format!("\\begin{{aligned}}\n{}\n\\end{{aligned}}", rows.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::calc_ast::Expr;
    use crate::calc::value::Value;

    fn given(name: &str, value: Value) -> AssignmentRecord {
        AssignmentRecord {
            name: name.to_string(),
            source: None,
            value,
            is_trivial: true,
            substituted: None,
        }
    }

    fn derived(name: &str, source: Expr, substituted: &str, value: Value) -> AssignmentRecord {
        AssignmentRecord {
            name: name.to_string(),
            source: Some(source),
            value,
            is_trivial: false,
            substituted: Some(substituted.to_string()),
        }
    }

    fn sum_record() -> AssignmentRecord {
        derived("z", Expr::name("x") + Expr::name("y"), "5 + 10", Value::Int(15))
    }

    #[test]
    fn test_empty_records() {
        assert_eq!(assemble(&[], &RenderConfig::default()), "");
    }

    #[test]
    fn test_trivial_line() {
        let record = given("alpha_0", Value::Real(0.5));
        assert_eq!(render_line(&record, &RenderConfig::default()), r"\alpha_{0} &= 0.5");
    }

    #[test]
    fn test_full_derivation() {
        let line = render_line(&sum_record(), &RenderConfig::default());
        assert_eq!(line, "z &= x + y = 5 + 10 = 15");
    }

    #[test]
    fn test_substitution_hidden_when_equal_to_symbolic() {
        let record = derived("w", Expr::int(2) * Expr::int(3), r"2 \cdot 3", Value::Int(6));
        let line = render_line(&record, &RenderConfig::default());
        assert_eq!(line, r"w &= 2 \cdot 3 = 6");
        // without the symbolic part the substituted one is always shown
        let line = render_line(&record, &RenderConfig::new(false, true, true));
        assert_eq!(line, r"w &= 2 \cdot 3 = 6");
    }

    #[test]
    fn test_config_toggles() {
        let record = sum_record();
        let cases = [
            (RenderConfig::new(true, false, true), "z &= x + y = 15"),
            (RenderConfig::new(false, true, true), "z &= 5 + 10 = 15"),
            (RenderConfig::new(true, true, false), "z &= x + y = 5 + 10"),
            (RenderConfig::new(false, false, true), "z &= 15"),
            (RenderConfig::new(false, false, false), "z &= "),
        ];
        for (config, expected) in cases {
            assert_eq!(render_line(&record, &config), expected, "{:?}", config);
        }
    }

    #[test]
    fn test_wide_break_only_on_transition() {
        let records = vec![
            given("x", Value::Int(5)),
            given("y", Value::Int(10)),
            sum_record(),
            sum_record(),
            given("k", Value::Int(1)),
            sum_record(),
        ];
        let block = assemble(&records, &RenderConfig::default());
        let separators: Vec<&str> = block
            .lines()
            .filter(|line| line.starts_with(r"\\"))
            .collect();
        assert_eq!(
            separators,
            vec![ROW_BREAK, WIDE_ROW_BREAK, ROW_BREAK, ROW_BREAK, WIDE_ROW_BREAK]
        );
        assert!(block.starts_with("\\begin{aligned}\nx &= 5\n"));
        assert!(block.ends_with("\n\\end{aligned}"));
    }

    #[test]
    fn test_single_record_block() {
        let block = assemble(&[given("x", Value::Int(5))], &RenderConfig::default());
        assert_eq!(block, "\\begin{aligned}\nx &= 5\n\\end{aligned}");
    }
}
