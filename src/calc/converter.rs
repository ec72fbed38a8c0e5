//! # Conversion entry points
//!
//! `python_to_latex` is the whole pipeline: parse the calculation code, run the accepted
//! statements through the [`Interpreter`] against a fresh [`Environment`], render every
//! resulting line and assemble the `aligned` block.
//!
//! Parsing is the only step that can fail. Statements that fail to evaluate are dropped (and
//! logged), unknown expression kinds render as a fallback token, so any well-formed program
//! produces a block.
//!
//! # Example
//! ```
//! use CalcBlocks::calc::assembler::RenderConfig;
//! use CalcBlocks::calc::converter::python_to_latex;
//!
//! let conversion = python_to_latex("x = 5\ny = 10\nz = x + y", &RenderConfig::default()).unwrap();
//! assert!(conversion.latex.contains("z &= x + y = 5 + 10 = 15"));
//! ```
use log::info;
use tabled::{builder::Builder, settings::Style};

use crate::calc::assembler::{RenderConfig, assemble};
use crate::calc::calc_ast::Statement;
use crate::calc::evaluator::{Evaluator, Interpreter};
use crate::calc::parse_calc::{ParseError, parse_program};
use crate::calc::sequencer::{AssignmentRecord, run_statements};
use crate::calc::value::Environment;

/// Result of one conversion run
#[derive(Clone, Debug, PartialEq)]
pub struct Conversion {
    /// `aligned` block, empty when no assignment produced a line
    pub latex: String,
    /// final bindings, including the pre-seeded constants and builtins
    pub environment: Environment,
    /// one record per output line, in source order
    pub records: Vec<AssignmentRecord>,
}

/// Converts already parsed statements with a caller supplied evaluator
pub fn convert_statements(
    statements: &[Statement],
    config: &RenderConfig,
    evaluator: &dyn Evaluator,
) -> Conversion {
    let mut environment = Environment::new();
    let records = run_statements(statements, evaluator, &mut environment);
    let latex = assemble(&records, config);
    info!(
        "converted {} of {} statement(s), {} given value(s), {} calculation(s)",
        records.len(),
        statements.len(),
        records.iter().filter(|r| r.is_trivial).count(),
        records.iter().filter(|r| !r.is_trivial).count()
    );
    Conversion {
        latex,
        environment,
        records,
    }
}

impl Conversion {
    /// plain text table of the bindings created by the program, in assignment order
    pub fn bindings_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(["variable", "value"]);
        for (name, value) in self.environment.assigned() {
            builder.push_record([name.to_string(), value.to_string()]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }
}

/// Converts calculation source code to a LaTeX `aligned` block
pub fn python_to_latex(code: &str, config: &RenderConfig) -> Result<Conversion, ParseError> {
    let statements = parse_program(code)?;
    Ok(convert_statements(&statements, config, &Interpreter::new()))
}
