#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns calculation code (plain assignments, arithmetic, math library calls) into a
/// LaTeX `aligned` block showing every calculation as formula = substituted values = result
///
///# Example
/// ```
/// use CalcBlocks::calc::assembler::RenderConfig;
/// use CalcBlocks::calc::converter::python_to_latex;
/// let code = "V_in = 12\nR_1 = 1000\nR_2 = 2000\nV_out = V_in * R_2 / (R_1 + R_2)";
/// let conversion = python_to_latex(code, &RenderConfig::default()).unwrap();
/// println!("{}", conversion.latex);
/// // only the formula and the result
/// let short = python_to_latex(code, &RenderConfig::new(true, false, true)).unwrap();
/// println!("{}", short.latex);
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod converter;
///____________________________________________________________________________________________________________________________
/// # Syntax tree
/// statements and expressions of calculation code, with builders used by the tests
/// ___________________________________________________________________________________________________________________________
pub mod calc_ast;
/// logical lines, tokens and the precedence parser producing `calc_ast` statements
pub mod parse_calc;
///________________________________________________________________________________________________________________________________________________
/// # Evaluation
/// runtime values, the variable environment and the interpreter implementing the `Evaluator` seam
/// ```
/// use CalcBlocks::calc::evaluator::Interpreter;
/// use CalcBlocks::calc::parse_calc::parse_expression;
/// use CalcBlocks::calc::value::{Environment, Value};
/// let expr = parse_expression("sqrt(16) + 2**3").unwrap();
/// let value = Interpreter::new().eval_expr(&expr, &Environment::new()).unwrap();
/// assert_eq!(value, Value::Real(12.0));
/// ```
pub mod evaluator;
pub mod value;
///________________________________________________________________________________________________________________________________________________
/// # Rendering
/// identifiers, numbers, symbolic and substituted formulas, lines and the final block
/// ```
/// use CalcBlocks::calc::identifier::render_identifier;
/// use CalcBlocks::calc::latex_symbolic::render_symbolic;
/// use CalcBlocks::calc::parse_calc::parse_expression;
/// assert_eq!(render_identifier("theta_1"), r"\theta_{1}");
/// let expr = parse_expression("(a + b) * c").unwrap();
/// assert_eq!(render_symbolic(&expr), r"\left(a + b\right) \cdot c");
/// ```
pub mod assembler;
pub mod identifier;
pub mod latex_substitute;
pub mod latex_symbolic;
pub mod value_format;
/// runs statements in order, binding only what evaluates successfully
pub mod sequencer;
