//! # Calculation source parser
//!
//! Turns calculation code into top-level [`Statement`]s in three passes:
//! 1. [`logical_lines`] splits the source into logical lines. `#` comments are dropped, brackets
//!    and a trailing backslash continue a line, `;` separates statements on one line. Unbalanced
//!    brackets and unterminated strings are reported here.
//! 2. [`tokenize`] cuts one logical line into tokens with nom combinators.
//! 3. A recursive descent parser builds the expression tree with the usual precedence ladder
//!    (conditional, `or`, `and`, `not`, comparisons, `|`, `^`, `&`, shifts, `+ -`,
//!    `* / // %`, unary signs, `**`, calls/indexing/attributes, atoms). Like in the source
//!    language `-x**2` is `-(x**2)` and `**` is right associative.
//!
//! Lines that cannot produce an output line (imports, definitions, block headers and their
//! indented bodies, annotated assignments, decorators) become [`Statement::Other`]. Valid
//! syntax outside the supported subset (lambdas, comprehensions, slices, keyword arguments,
//! dict literals) is skipped the same way with a warning, so ordinary scripts convert without
//! errors. Anything that is malformed gives a [`ParseError`] for the whole program.
use log::{debug, warn};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{alpha1, alphanumeric1, char, digit1, one_of},
    combinator::{opt, recognize},
    error::{Error as NomError, ErrorKind},
    multi::many0,
    sequence::pair,
};
use std::fmt;
use std::num::IntErrorKind;
use thiserror::Error;

use crate::calc::calc_ast::{
    AssignTarget, BinaryOp, BoolOperator, Callee, CompareOp, Expr, Literal, MAX_DEPTH,
    SequenceKind, Statement, UnaryOp,
};

/// Deepest bracket/unary nesting the parser follows
pub const MAX_NESTING: usize = 100;

/// Source that is not a well-formed program
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based line where the offending logical line starts
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        ParseError {
            line,
            message: message.into(),
        }
    }
}

//___________________________________LOGICAL LINES____________________________________

/// One statement worth of source text
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLine {
    /// physical line the statement starts on
    pub number: usize,
    pub text: String,
    /// part of an indented block (or of the body of a one-line compound statement)
    pub indented: bool,
}

/// keywords opening a compound statement; `;`-separated statements after one of them on the
/// same line belong to its body
const BLOCK_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "for", "while", "with", "def", "class", "try", "except", "finally",
    "async",
];

fn first_word(text: &str) -> &str {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or("")
}

fn flush(lines: &mut Vec<LogicalLine>, text: &mut String, number: usize, indented: bool) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        lines.push(LogicalLine {
            number,
            text: trimmed.to_string(),
            indented,
        });
    }
    text.clear();
}

fn closing_bracket(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Splits source code into logical lines
pub fn logical_lines(source: &str) -> Result<Vec<LogicalLine>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let mut lines = Vec::new();
    let mut text = String::new();
    let mut line_no = 1;
    // start line and indentation of the logical line being collected
    let mut start = 1;
    let mut indented = false;
    // indentation of the current physical line
    let mut line_indented = false;
    let mut fresh_line = true;
    let mut header_body = false;
    // the logical line being collected follows a `;` on the same physical line
    let mut after_semicolon = false;
    let mut brackets: Vec<(char, usize)> = Vec::new();
    let mut quote: Option<(&'static str, usize)> = None;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if fresh_line {
            line_indented = c == ' ' || c == '\t';
            fresh_line = false;
        }
        if let Some((delimiter, opened)) = quote {
            if c == '\\' && i + 1 < chars.len() {
                text.push(c);
                text.push(chars[i + 1]);
                if chars[i + 1] == '\n' {
                    line_no += 1;
                    fresh_line = true;
                }
                i += 2;
                continue;
            }
            let closes = delimiter
                .chars()
                .enumerate()
                .all(|(k, d)| chars.get(i + k) == Some(&d));
            if closes {
                text.push_str(delimiter);
                i += delimiter.len();
                quote = None;
                continue;
            }
            if c == '\n' {
                if delimiter.len() == 1 {
                    return Err(ParseError::new(opened, "unterminated string literal"));
                }
                line_no += 1;
                fresh_line = true;
            }
            text.push(c);
            i += 1;
            continue;
        }

        match c {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '\\' if chars.get(i + 1) == Some(&'\n') => {
                text.push(' ');
                line_no += 1;
                fresh_line = true;
                i += 2;
                continue;
            }
            '\\' if chars.get(i + 1) == Some(&'\r') && chars.get(i + 2) == Some(&'\n') => {
                text.push(' ');
                line_no += 1;
                fresh_line = true;
                i += 3;
                continue;
            }
            '\n' => {
                line_no += 1;
                fresh_line = true;
                if brackets.is_empty() {
                    flush(&mut lines, &mut text, start, indented);
                    header_body = false;
                    after_semicolon = false;
                } else {
                    text.push(' ');
                }
                i += 1;
                continue;
            }
            '\r' => {
                i += 1;
                continue;
            }
            ';' if brackets.is_empty() => {
                if BLOCK_KEYWORDS.contains(&first_word(text.trim())) {
                    header_body = true;
                }
                flush(&mut lines, &mut text, start, indented);
                after_semicolon = true;
                i += 1;
                continue;
            }
            '(' | '[' | '{' => brackets.push((c, line_no)),
            ')' | ']' | '}' => match brackets.pop() {
                Some((open, _)) if closing_bracket(open) == c => {}
                Some((open, opened)) => {
                    return Err(ParseError::new(
                        line_no,
                        format!(
                            "closing '{}' does not match '{}' opened on line {}",
                            c, open, opened
                        ),
                    ));
                }
                None => return Err(ParseError::new(line_no, format!("unmatched '{}'", c))),
            },
            _ => {}
        }

        if text.trim().is_empty() && !c.is_whitespace() {
            start = line_no;
            indented = if after_semicolon {
                indented || header_body
            } else {
                line_indented
            };
        }
        if c == '\'' || c == '"' {
            let triple = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
            let delimiter = match (c, triple) {
                ('"', true) => "\"\"\"",
                ('"', false) => "\"",
                (_, true) => "'''",
                (_, false) => "'",
            };
            text.push_str(delimiter);
            quote = Some((delimiter, line_no));
            i += delimiter.len();
            continue;
        }
        text.push(c);
        i += 1;
    }

    if let Some((_, opened)) = quote {
        return Err(ParseError::new(opened, "unterminated string literal"));
    }
    if let Some((open, opened)) = brackets.pop() {
        return Err(ParseError::new(opened, format!("'{}' was never closed", open)));
    }
    flush(&mut lines, &mut text, start, indented);
    Ok(lines)
}

//___________________________________TOKENS____________________________________

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    /// integer literal that does not fit in 64 bits, kept as written
    WideInt(String),
    Float(f64),
    /// `2.5j`
    Imaginary(f64),
    Str(String),
    /// identifiers and keywords
    Name(String),
    Op(&'static str),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Int(i) => write!(f, "{}", i),
            Token::WideInt(digits) => write!(f, "{}", digits),
            Token::Float(x) => write!(f, "{}", x),
            Token::Imaginary(x) => write!(f, "{}j", x),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Name(name) => write!(f, "{}", name),
            Token::Op(op) => write!(f, "{}", op),
        }
    }
}

/// operators and delimiters, longest first
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "**", "//", "==", "!=", "<=", ">=", "<<", ">>", "+=",
    "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", ":=", "->", "+", "-", "*", "/", "%", "&",
    "|", "^", "~", "<", ">", "=", "(", ")", "[", "]", "{", "}", ",", ".", ":", "@", ";",
];

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// statements starting with one of these never assign a plain name
const STATEMENT_KEYWORDS: &[&str] = &[
    "import", "from", "def", "class", "if", "elif", "else", "for", "while", "try", "except",
    "finally", "with", "return", "pass", "break", "continue", "raise", "assert", "del", "global",
    "nonlocal", "async", "await", "yield",
];

/// valid syntax the converter does not model
const UNSUPPORTED_OPS: &[&str] = &[":=", "@", "@=", "...", "{", "->"];
const UNSUPPORTED_KEYWORDS: &[&str] = &["lambda", "for", "yield", "await"];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn digits(input: &str) -> IResult<&str, &str> {
    recognize(pair(digit1, many0(alt((digit1, tag("_")))))).parse(input)
}

/// `0x1F`, `0o17`, `0b101`
fn radix_number(input: &str) -> IResult<&str, Token> {
    let mut parser = pair(
        alt((tag_no_case("0x"), tag_no_case("0o"), tag_no_case("0b"))),
        take_while1(|c: char| c.is_ascii_hexdigit() || c == '_'),
    );
    let (rest, (prefix, body)) = parser.parse(input)?;
    let radix = match prefix.to_ascii_lowercase().as_str() {
        "0x" => 16,
        "0o" => 8,
        _ => 2,
    };
    match i64::from_str_radix(&body.replace('_', ""), radix) {
        Ok(value) => Ok((rest, Token::Int(value))),
        Err(err) if *err.kind() == IntErrorKind::PosOverflow => {
            Ok((rest, Token::WideInt(format!("{}{}", prefix, body))))
        }
        Err(_) => Err(nom::Err::Failure(NomError::new(input, ErrorKind::Digit))),
    }
}

/// `12`, `1_000`, `2.5`, `.5`, `3.`, `1e-3`, `2j`
fn decimal_number(input: &str) -> IResult<&str, Token> {
    let mantissa = alt((
        recognize(pair(digits, opt(pair(char('.'), opt(digits))))),
        recognize(pair(char('.'), digits)),
    ));
    let exponent = (one_of("eE"), opt(one_of("+-")), digits);
    let (rest, text) = recognize(pair(mantissa, opt(exponent))).parse(input)?;
    let (rest, imaginary) = opt(one_of("jJ")).parse(rest)?;

    let text = text.replace('_', "");
    let token = if imaginary.is_some() {
        text.parse::<f64>().ok().map(Token::Imaginary)
    } else if text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        text.parse::<f64>().ok().map(Token::Float)
    } else {
        match text.parse::<i64>() {
            Ok(value) => Some(Token::Int(value)),
            Err(err) if *err.kind() == IntErrorKind::PosOverflow => Some(Token::WideInt(text)),
            Err(_) => None,
        }
    };
    token
        .map(|token| (rest, token))
        .ok_or(nom::Err::Failure(NomError::new(input, ErrorKind::Float)))
}

/// quoted string with optional `r`/`b`/`u`/`f` prefixes, single or triple quoted
fn string_literal(input: &str) -> IResult<&str, Token> {
    let (rest, prefix) = take_while(|c: char| "rRbBuUfF".contains(c)).parse(input)?;
    if prefix.len() > 2 {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::Tag)));
    }
    let (body, delimiter) = alt((tag("\"\"\""), tag("'''"), tag("\""), tag("'"))).parse(rest)?;
    let raw = prefix.to_ascii_lowercase().contains('r');

    let mut text = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        if body[i..].starts_with(delimiter) {
            return Ok((&body[i + delimiter.len()..], Token::Str(text)));
        }
        if c != '\\' {
            text.push(c);
            continue;
        }
        let Some((_, escaped)) = chars.next() else {
            break;
        };
        match escaped {
            _ if raw => {
                text.push('\\');
                text.push(escaped);
            }
            'n' => text.push('\n'),
            't' => text.push('\t'),
            'r' => text.push('\r'),
            '0' => text.push('\0'),
            '\\' | '\'' | '"' => text.push(escaped),
            '\n' => {}
            other => {
                text.push('\\');
                text.push(other);
            }
        }
    }
    Err(nom::Err::Failure(NomError::new(input, ErrorKind::Char)))
}

fn name(input: &str) -> IResult<&str, Token> {
    let mut parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    let (input, word) = parser.parse(input)?;
    Ok((input, Token::Name(word.to_string())))
}

fn operator(input: &str) -> IResult<&str, Token> {
    for &op in OPERATORS {
        if let Some(rest) = input.strip_prefix(op) {
            return Ok((rest, Token::Op(op)));
        }
    }
    Err(nom::Err::Error(NomError::new(input, ErrorKind::Tag)))
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((radix_number, decimal_number, string_literal, name, operator)).parse(input)
}

/// Tokens of one logical line; `line` is only used for error reporting
pub fn tokenize(text: &str, line: usize) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        match token(rest) {
            Ok((remaining, token)) => {
                tokens.push(token);
                rest = remaining.trim_start();
            }
            Err(nom::Err::Failure(_)) => {
                return Err(ParseError::new(line, format!("malformed literal at '{}'", rest)));
            }
            Err(_) => {
                let found = rest.chars().next().unwrap_or(' ');
                return Err(ParseError::new(line, format!("invalid character '{}'", found)));
            }
        }
    }
    Ok(tokens)
}

//___________________________________EXPRESSIONS____________________________________

/// Why a token sequence was rejected
#[derive(Debug)]
struct Issue {
    message: String,
    /// well-formed but outside the modelled subset
    unsupported: bool,
}

impl Issue {
    fn syntax(message: impl Into<String>) -> Self {
        Issue {
            message: message.into(),
            unsupported: false,
        }
    }
    fn unsupported(what: impl Into<String>) -> Self {
        Issue {
            message: what.into(),
            unsupported: true,
        }
    }
}

type Parsed<T> = Result<T, Issue>;

const BIT_OR: &[(&str, BinaryOp)] = &[("|", BinaryOp::BitOr)];
const BIT_XOR: &[(&str, BinaryOp)] = &[("^", BinaryOp::BitXor)];
const BIT_AND: &[(&str, BinaryOp)] = &[("&", BinaryOp::BitAnd)];
const SHIFT: &[(&str, BinaryOp)] = &[("<<", BinaryOp::LShift), (">>", BinaryOp::RShift)];
const ARITH: &[(&str, BinaryOp)] = &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)];
const TERM: &[(&str, BinaryOp)] = &[
    ("*", BinaryOp::Mult),
    ("/", BinaryOp::Div),
    ("//", BinaryOp::FloorDiv),
    ("%", BinaryOp::Mod),
];

fn augmented_op(symbol: &str) -> Option<BinaryOp> {
    let op = match symbol {
        "+=" => BinaryOp::Add,
        "-=" => BinaryOp::Sub,
        "*=" => BinaryOp::Mult,
        "/=" => BinaryOp::Div,
        "//=" => BinaryOp::FloorDiv,
        "%=" => BinaryOp::Mod,
        "**=" => BinaryOp::Pow,
        "&=" => BinaryOp::BitAnd,
        "|=" => BinaryOp::BitOr,
        "^=" => BinaryOp::BitXor,
        "<<=" => BinaryOp::LShift,
        ">>=" => BinaryOp::RShift,
        _ => return None,
    };
    Some(op)
}

struct TokenParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    nesting: usize,
}

impl<'a> TokenParser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        TokenParser {
            tokens,
            pos: 0,
            nesting: 0,
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn is_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Token::Op(o)) if *o == op)
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(w)) if w == word)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let found = self.is_op(op);
        if found {
            self.pos += 1;
        }
        found
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        let found = self.is_keyword(word);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_op(&mut self, op: &str) -> Parsed<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", op)))
        }
    }

    /// error for the current token; constructs outside the modelled subset are reported as such
    fn unexpected(&self, expected: &str) -> Issue {
        match self.peek() {
            Some(Token::Op(op)) if UNSUPPORTED_OPS.contains(op) => {
                Issue::unsupported(format!("'{}' syntax", op))
            }
            Some(Token::Name(word)) if UNSUPPORTED_KEYWORDS.contains(&word.as_str()) => {
                Issue::unsupported(format!("'{}' expressions", word))
            }
            Some(token) => Issue::syntax(format!("expected {}, found '{}'", expected, token)),
            None => Issue::syntax(format!("expected {}, found end of line", expected)),
        }
    }

    fn finish(&self) -> Parsed<()> {
        if self.pos >= self.tokens.len() {
            Ok(())
        } else {
            Err(self.unexpected("end of statement"))
        }
    }

    fn enter(&mut self) -> Parsed<()> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            Err(Issue::unsupported(format!("nesting deeper than {} levels", MAX_NESTING)))
        } else {
            Ok(())
        }
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    /// `a`, or a bare tuple `a, b, c`
    fn expression_list(&mut self) -> Parsed<Expr> {
        let first = self.test()?;
        if !self.is_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.pos >= self.tokens.len() {
                break;
            }
            items.push(self.test()?);
        }
        Ok(Expr::Sequence(SequenceKind::Tuple, items))
    }

    fn test(&mut self) -> Parsed<Expr> {
        self.enter()?;
        let result = self.conditional();
        self.leave();
        result
    }

    fn conditional(&mut self) -> Parsed<Expr> {
        let body = self.or_test()?;
        if !self.eat_keyword("if") {
            return Ok(body);
        }
        let test = self.or_test()?;
        if !self.eat_keyword("else") {
            return Err(self.unexpected("'else'"));
        }
        let orelse = self.test()?;
        Ok(Expr::IfExp(test.boxed(), body.boxed(), orelse.boxed()))
    }

    fn bool_chain(
        &mut self,
        word: &str,
        op: BoolOperator,
        next: fn(&mut Self) -> Parsed<Expr>,
    ) -> Parsed<Expr> {
        let first = next(self)?;
        if !self.is_keyword(word) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.eat_keyword(word) {
            operands.push(next(self)?);
        }
        Ok(Expr::BoolOp(op, operands))
    }

    fn or_test(&mut self) -> Parsed<Expr> {
        self.bool_chain("or", BoolOperator::Or, Self::and_test)
    }

    fn and_test(&mut self) -> Parsed<Expr> {
        self.bool_chain("and", BoolOperator::And, Self::not_test)
    }

    fn not_test(&mut self) -> Parsed<Expr> {
        if !self.eat_keyword("not") {
            return self.comparison();
        }
        self.enter()?;
        let operand = self.not_test();
        self.leave();
        Ok(Expr::UnaryOp(UnaryOp::Not, operand?.boxed()))
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        let op = match self.peek()? {
            Token::Op("==") => CompareOp::Eq,
            Token::Op("!=") => CompareOp::NotEq,
            Token::Op("<") => CompareOp::Lt,
            Token::Op(">") => CompareOp::Gt,
            Token::Op("<=") => CompareOp::LtE,
            Token::Op(">=") => CompareOp::GtE,
            Token::Name(word) if word == "in" => CompareOp::In,
            Token::Name(word) if word == "is" => {
                if matches!(self.peek_at(1), Some(Token::Name(next)) if next == "not") {
                    self.pos += 1;
                    CompareOp::IsNot
                } else {
                    CompareOp::Is
                }
            }
            Token::Name(word)
                if word == "not"
                    && matches!(self.peek_at(1), Some(Token::Name(next)) if next == "in") =>
            {
                self.pos += 1;
                CompareOp::NotIn
            }
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn comparison(&mut self) -> Parsed<Expr> {
        let left = self.bit_or()?;
        let mut pairs = Vec::new();
        while let Some(op) = self.compare_op() {
            pairs.push((op, self.bit_or()?));
        }
        if pairs.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare(left.boxed(), pairs))
        }
    }

    fn binary_op(&mut self, ops: &[(&str, BinaryOp)]) -> Option<BinaryOp> {
        let Some(Token::Op(symbol)) = self.peek() else {
            return None;
        };
        let op = ops
            .iter()
            .find(|(candidate, _)| *candidate == *symbol)
            .map(|(_, op)| *op)?;
        self.pos += 1;
        Some(op)
    }

    /// left-associative level of the precedence ladder
    fn binary_level(
        &mut self,
        ops: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Parsed<Expr>,
    ) -> Parsed<Expr> {
        let mut left = next(self)?;
        let mut chain = 0;
        while let Some(op) = self.binary_op(ops) {
            chain += 1;
            if chain > MAX_DEPTH {
                return Err(Issue::unsupported(format!(
                    "operator chains longer than {} operators",
                    MAX_DEPTH
                )));
            }
            let right = next(self)?;
            left = Expr::binop(op, left, right);
        }
        Ok(left)
    }

    fn bit_or(&mut self) -> Parsed<Expr> {
        self.binary_level(BIT_OR, Self::bit_xor)
    }

    fn bit_xor(&mut self) -> Parsed<Expr> {
        self.binary_level(BIT_XOR, Self::bit_and)
    }

    fn bit_and(&mut self) -> Parsed<Expr> {
        self.binary_level(BIT_AND, Self::shift)
    }

    fn shift(&mut self) -> Parsed<Expr> {
        self.binary_level(SHIFT, Self::arith)
    }

    fn arith(&mut self) -> Parsed<Expr> {
        self.binary_level(ARITH, Self::term)
    }

    fn term(&mut self) -> Parsed<Expr> {
        self.binary_level(TERM, Self::factor)
    }

    /// unary signs and `~`, binding weaker than `**`
    fn factor(&mut self) -> Parsed<Expr> {
        self.enter()?;
        let result = self.signed();
        self.leave();
        result
    }

    fn signed(&mut self) -> Parsed<Expr> {
        let op = if self.eat_op("-") {
            UnaryOp::Neg
        } else if self.eat_op("+") {
            UnaryOp::Pos
        } else if self.eat_op("~") {
            UnaryOp::Invert
        } else {
            return self.power();
        };
        Ok(Expr::UnaryOp(op, self.factor()?.boxed()))
    }

    fn power(&mut self) -> Parsed<Expr> {
        let base = self.primary()?;
        if self.eat_op("**") {
            let exponent = self.factor()?;
            Ok(Expr::binop(BinaryOp::Pow, base, exponent))
        } else {
            Ok(base)
        }
    }

    /// atom followed by calls, indexing and attribute access
    fn primary(&mut self) -> Parsed<Expr> {
        let mut expr = self.atom()?;
        let mut chain = 0;
        loop {
            if self.eat_op("(") {
                let args = self.call_args()?;
                let callee = match &expr {
                    Expr::Name(name) => Callee::Name(name.clone()),
                    Expr::Attribute(_, attr) => Callee::Attribute(attr.clone()),
                    _ => Callee::Other,
                };
                expr = Expr::Call(callee, args);
            } else if self.eat_op("[") {
                let index = self.subscript_index()?;
                self.expect_op("]")?;
                expr = Expr::Subscript(expr.boxed(), index.boxed());
            } else if self.eat_op(".") {
                match self.peek() {
                    Some(Token::Name(attr)) if !is_keyword(attr) => {
                        self.pos += 1;
                        expr = Expr::Attribute(expr.boxed(), attr.clone());
                    }
                    _ => return Err(self.unexpected("an attribute name")),
                }
            } else {
                return Ok(expr);
            }
            chain += 1;
            if chain > MAX_NESTING {
                return Err(Issue::unsupported(format!("nesting deeper than {} levels", MAX_NESTING)));
            }
        }
    }

    fn call_args(&mut self) -> Parsed<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.is_op(")") {
            if self.is_op("*") || self.is_op("**") {
                return Err(Issue::unsupported("argument unpacking"));
            }
            if matches!(self.peek(), Some(Token::Name(_)))
                && matches!(self.peek_at(1), Some(Token::Op("=")))
            {
                return Err(Issue::unsupported("keyword arguments"));
            }
            args.push(self.test()?);
            if self.is_keyword("for") {
                return Err(Issue::unsupported("comprehensions"));
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok(args)
    }

    fn subscript_index(&mut self) -> Parsed<Expr> {
        if self.is_op(":") {
            return Err(Issue::unsupported("slices"));
        }
        let first = self.test()?;
        if self.is_op(":") {
            return Err(Issue::unsupported("slices"));
        }
        if !self.is_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.is_op("]") {
                break;
            }
            items.push(self.test()?);
        }
        Ok(Expr::Sequence(SequenceKind::Tuple, items))
    }

    /// elements up to `close`; a comprehension is rejected as unsupported
    fn elements(&mut self, close: &str) -> Parsed<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.is_op(close) {
            items.push(self.test()?);
            if self.is_keyword("for") {
                return Err(Issue::unsupported("comprehensions"));
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(close)?;
        Ok(items)
    }

    fn parenthesized(&mut self) -> Parsed<Expr> {
        if self.eat_op(")") {
            return Ok(Expr::Sequence(SequenceKind::Tuple, Vec::new()));
        }
        let first = self.test()?;
        if self.is_keyword("for") {
            return Err(Issue::unsupported("generator expressions"));
        }
        if self.eat_op(")") {
            return Ok(first);
        }
        if !self.eat_op(",") {
            return Err(self.unexpected("')'"));
        }
        let mut items = vec![first];
        items.extend(self.elements(")")?);
        Ok(Expr::Sequence(SequenceKind::Tuple, items))
    }

    fn atom(&mut self) -> Parsed<Expr> {
        let Some(token) = self.peek() else {
            return Err(self.unexpected("an expression"));
        };
        let expr = match token {
            Token::Int(i) => Expr::Literal(Literal::Int(*i)),
            Token::WideInt(_) => return Err(Issue::unsupported("integers wider than 64 bits")),
            Token::Float(x) => Expr::Literal(Literal::Float(*x)),
            Token::Imaginary(x) => Expr::Literal(Literal::Imaginary(*x)),
            Token::Str(_) => {
                // adjacent literals concatenate
                let mut text = String::new();
                while let Some(Token::Str(part)) = self.peek() {
                    text.push_str(part);
                    self.pos += 1;
                }
                return Ok(Expr::Literal(Literal::Str(text)));
            }
            Token::Name(word) => match word.as_str() {
                "True" => Expr::Literal(Literal::Bool(true)),
                "False" => Expr::Literal(Literal::Bool(false)),
                "None" => Expr::Literal(Literal::None),
                w if is_keyword(w) => return Err(self.unexpected("an expression")),
                _ => Expr::Name(word.clone()),
            },
            Token::Op("(") => {
                self.pos += 1;
                return self.parenthesized();
            }
            Token::Op("[") => {
                self.pos += 1;
                return Ok(Expr::Sequence(SequenceKind::List, self.elements("]")?));
            }
            Token::Op("*") => return Err(Issue::unsupported("starred expressions")),
            _ => return Err(self.unexpected("an expression")),
        };
        self.pos += 1;
        Ok(expr)
    }
}

fn parse_tokens(tokens: &[Token]) -> Parsed<Expr> {
    if tokens.is_empty() {
        return Err(Issue::syntax("missing expression"));
    }
    let mut parser = TokenParser::new(tokens);
    let expr = parser.expression_list()?;
    parser.finish()?;
    Ok(expr)
}

fn to_target(expr: Expr) -> Parsed<AssignTarget> {
    match expr {
        Expr::Name(name) => Ok(AssignTarget::Name(name)),
        Expr::Sequence(_, items) => Ok(AssignTarget::Tuple(
            items.into_iter().map(to_target).collect::<Parsed<Vec<_>>>()?,
        )),
        Expr::Attribute(value, name) => Ok(AssignTarget::Attribute(*value, name)),
        Expr::Subscript(value, index) => Ok(AssignTarget::Subscript(*value, *index)),
        Expr::Literal(_) => Err(Issue::syntax("cannot assign to a literal")),
        Expr::Call(..) => Err(Issue::syntax("cannot assign to a function call")),
        _ => Err(Issue::syntax("cannot assign to an expression")),
    }
}

fn parse_target(tokens: &[Token]) -> Parsed<AssignTarget> {
    to_target(parse_tokens(tokens)?)
}

/// assignment, augmented assignment or a plain expression statement
fn classify(tokens: &[Token]) -> Parsed<Statement> {
    if tokens
        .iter()
        .any(|t| matches!(t, Token::Name(word) if word == "lambda"))
    {
        return Err(Issue::unsupported("'lambda' expressions"));
    }
    let mut depth = 0usize;
    let mut equals = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Op("(" | "[" | "{") => depth += 1,
            Token::Op(")" | "]" | "}") => depth = depth.saturating_sub(1),
            Token::Op(":") if depth == 0 => {
                return Ok(Statement::Other("annotated assignment".to_string()));
            }
            Token::Op("=") if depth == 0 => equals.push(i),
            Token::Op(symbol) if depth == 0 => {
                if let Some(op) = augmented_op(symbol) {
                    let target = parse_target(&tokens[..i])?;
                    let value = parse_tokens(&tokens[i + 1..])?;
                    return Ok(Statement::AugAssign { target, op, value });
                }
            }
            _ => {}
        }
    }

    let Some(&last) = equals.last() else {
        parse_tokens(tokens)?;
        return Ok(Statement::Other("expression".to_string()));
    };
    let value = parse_tokens(&tokens[last + 1..])?;
    let mut targets = Vec::with_capacity(equals.len());
    let mut start = 0;
    for &end in &equals {
        targets.push(parse_target(&tokens[start..end])?);
        start = end + 1;
    }
    Ok(Statement::Assign { targets, value })
}

/// Statement of one logical line
pub fn parse_statement(line: &LogicalLine) -> Result<Statement, ParseError> {
    if line.indented {
        return Ok(Statement::Other("block body".to_string()));
    }
    let tokens = tokenize(&line.text, line.number)?;
    match tokens.first() {
        Some(Token::Name(word)) if STATEMENT_KEYWORDS.contains(&word.as_str()) => {
            return Ok(Statement::Other(word.clone()));
        }
        Some(Token::Op("@")) => return Ok(Statement::Other("decorator".to_string())),
        _ => {}
    }
    match classify(&tokens) {
        Ok(statement) => Ok(statement),
        Err(issue) if issue.unsupported => {
            warn!(
                "line {}: {} not supported, statement skipped",
                line.number, issue.message
            );
            Ok(Statement::Other("unsupported".to_string()))
        }
        Err(issue) => Err(ParseError::new(line.number, issue.message)),
    }
}

/// All top-level statements of `source`, in order
pub fn parse_program(source: &str) -> Result<Vec<Statement>, ParseError> {
    let lines = logical_lines(source)?;
    let statements = lines
        .iter()
        .map(parse_statement)
        .collect::<Result<Vec<Statement>, ParseError>>()?;
    debug!(
        "parsed {} statement(s) from {} line(s) of source",
        statements.len(),
        source.lines().count()
    );
    Ok(statements)
}

/// Single expression such as `a*(b+c)`
pub fn parse_expression(text: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(text.trim(), 1)?;
    parse_tokens(&tokens).map_err(|issue| ParseError::new(1, issue.message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(text: &str) -> Expr {
        parse_expression(text).unwrap()
    }

    fn n(name: &str) -> Expr {
        Expr::name(name)
    }

    #[test]
    fn test_tokenize_numbers() {
        let tokens = tokenize("12 1_000 2.5 .5 3. 1e-3 2j 0x1F 0b101", 1).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Int(12),
                Token::Int(1000),
                Token::Float(2.5),
                Token::Float(0.5),
                Token::Float(3.0),
                Token::Float(0.001),
                Token::Imaginary(2.0),
                Token::Int(31),
                Token::Int(5),
            ]
        );
    }

    #[test]
    fn test_wide_integers_are_skipped() {
        let tokens = tokenize("99_999_999_999_999_999_999 0xFFFFFFFFFFFFFFFFF", 1).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::WideInt("99999999999999999999999".to_string()),
                Token::WideInt("0xFFFFFFFFFFFFFFFFF".to_string()),
            ]
        );
        let statements = parse_program("n = 99999999999999999999\nm = 1.5e20").unwrap();
        assert_eq!(statements[0], Statement::Other("unsupported".to_string()));
        assert_eq!(statements[1], Statement::assign("m", Expr::float(1.5e20)));
    }

    #[test]
    fn test_tokenize_strings_and_operators() {
        let tokens = tokenize(r#"x **= 'a\n' + r"b\n" // y"#, 1).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Name("x".to_string()),
                Token::Op("**="),
                Token::Str("a\n".to_string()),
                Token::Op("+"),
                Token::Str(r"b\n".to_string()),
                Token::Op("//"),
                Token::Name("y".to_string()),
            ]
        );
        let tokens = tokenize("rate = f'{x}'", 1).unwrap();
        assert_eq!(tokens[0], Token::Name("rate".to_string()));
        assert_eq!(tokens[2], Token::Str("{x}".to_string()));
    }

    #[test]
    fn test_tokenize_invalid_character() {
        let err = tokenize("x = 3 $ 4", 7).unwrap_err();
        assert_eq!(err.line, 7);
        assert!(err.message.contains('$'));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(expr("a + b * c"), n("a") + n("b") * n("c"));
        assert_eq!(expr("(a + b) * c"), (n("a") + n("b")) * n("c"));
        assert_eq!(expr("a - b - c"), (n("a") - n("b")) - n("c"));
        assert_eq!(
            expr("-x**2"),
            -Expr::binop(BinaryOp::Pow, n("x"), Expr::int(2))
        );
        assert_eq!(
            expr("2**3**2"),
            Expr::binop(
                BinaryOp::Pow,
                Expr::int(2),
                Expr::binop(BinaryOp::Pow, Expr::int(3), Expr::int(2))
            )
        );
        assert_eq!(
            expr("a // b % c"),
            Expr::binop(
                BinaryOp::Mod,
                Expr::binop(BinaryOp::FloorDiv, n("a"), n("b")),
                n("c")
            )
        );
        assert_eq!(expr("a / (b + c)"), n("a") / (n("b") + n("c")));
    }

    #[test]
    fn test_calls_attributes_and_indexing() {
        assert_eq!(expr("sqrt(x)"), Expr::call("sqrt", vec![n("x")]));
        assert_eq!(
            expr("math.log(x, 2)"),
            Expr::Call(Callee::Attribute("log".to_string()), vec![n("x"), Expr::int(2)])
        );
        assert_eq!(
            expr("v[0]"),
            Expr::Subscript(n("v").boxed(), Expr::int(0).boxed())
        );
        assert_eq!(
            expr("z.real"),
            Expr::Attribute(n("z").boxed(), "real".to_string())
        );
        assert_eq!(expr("max(a, b,)"), Expr::call("max", vec![n("a"), n("b")]));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(
            expr("0 < x <= 1"),
            Expr::Compare(
                Expr::int(0).boxed(),
                vec![(CompareOp::Lt, n("x")), (CompareOp::LtE, Expr::int(1))]
            )
        );
        assert_eq!(
            expr("a not in b"),
            Expr::Compare(n("a").boxed(), vec![(CompareOp::NotIn, n("b"))])
        );
        assert_eq!(
            expr("a is not None"),
            Expr::Compare(n("a").boxed(), vec![(CompareOp::IsNot, Expr::Literal(Literal::None))])
        );
        assert_eq!(
            expr("not a and b or c"),
            Expr::BoolOp(
                BoolOperator::Or,
                vec![
                    Expr::BoolOp(
                        BoolOperator::And,
                        vec![Expr::UnaryOp(UnaryOp::Not, n("a").boxed()), n("b")]
                    ),
                    n("c"),
                ]
            )
        );
        assert_eq!(
            expr("a if c else b"),
            Expr::IfExp(n("c").boxed(), n("a").boxed(), n("b").boxed())
        );
    }

    #[test]
    fn test_sequences() {
        assert_eq!(
            expr("[1, 2.5]"),
            Expr::Sequence(SequenceKind::List, vec![Expr::int(1), Expr::float(2.5)])
        );
        assert_eq!(
            expr("(1,)"),
            Expr::Sequence(SequenceKind::Tuple, vec![Expr::int(1)])
        );
        assert_eq!(expr("()"), Expr::Sequence(SequenceKind::Tuple, vec![]));
        assert_eq!(expr("(x)"), n("x"));
        assert_eq!(
            expr("1, 2"),
            Expr::Sequence(SequenceKind::Tuple, vec![Expr::int(1), Expr::int(2)])
        );
        assert_eq!(
            expr("'a' 'b'"),
            Expr::Literal(Literal::Str("ab".to_string()))
        );
    }

    #[test]
    fn test_expression_errors() {
        assert!(parse_expression("3 +").is_err());
        assert!(parse_expression("a if b").is_err());
        assert!(parse_expression("f(x").is_err());
        assert!(parse_expression("1 2").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_NESTING + 10), ")".repeat(MAX_NESTING + 10));
        let err = parse_expression(&deep).unwrap_err();
        assert!(err.message.contains("nesting deeper than"));
        let long = vec!["1"; MAX_DEPTH + 10].join(" + ");
        assert!(parse_expression(&long).is_err());
        let longest = vec!["1"; MAX_DEPTH + 1].join(" + ");
        assert!(parse_expression(&longest).is_ok());
    }

    #[test]
    fn test_oversized_statement_is_skipped() {
        let long = vec!["1"; MAX_DEPTH + 2].join(" + ");
        let deep = format!("{}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        let source = format!("a = 1\nx = {}\ny = {}\nb = a + 1", long, deep);
        let statements = parse_program(&source).unwrap();
        assert_eq!(statements.len(), 4);
        assert_eq!(statements[1], Statement::Other("unsupported".to_string()));
        assert_eq!(statements[2], Statement::Other("unsupported".to_string()));
        assert_eq!(
            statements[3],
            Statement::assign("b", Expr::name("a") + Expr::int(1))
        );
    }

    #[test]
    fn test_logical_lines() {
        let source = "x = 1  # one\n\ny = (2 +\n     3)\nz = 4 + \\\n    5; w = 6\n";
        let lines = logical_lines(source).unwrap();
        let texts: Vec<(usize, &str)> = lines.iter().map(|l| (l.number, l.text.as_str())).collect();
        assert_eq!(
            texts,
            vec![
                (1, "x = 1"),
                (3, "y = (2 +      3)"),
                (5, "z = 4 +      5"),
                (6, "w = 6"),
            ]
        );
        assert!(lines.iter().all(|l| !l.indented));
    }

    #[test]
    fn test_logical_lines_strings() {
        let source = "s = 'a # not a comment; still the string'\nd = \"\"\"doc\nstring\"\"\"\nt = 1";
        let lines = logical_lines(source).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "s = 'a # not a comment; still the string'");
        assert_eq!(lines[2].number, 4);
    }

    #[test]
    fn test_logical_lines_blocks() {
        let source = "if x > 0:\n    y = 1\nelse: y = 2; z = 3\nw = 4";
        let lines = logical_lines(source).unwrap();
        let flags: Vec<(&str, bool)> = lines.iter().map(|l| (l.text.as_str(), l.indented)).collect();
        assert_eq!(
            flags,
            vec![
                ("if x > 0:", false),
                ("y = 1", true),
                ("else: y = 2", false),
                ("z = 3", true),
                ("w = 4", false),
            ]
        );
    }

    #[test]
    fn test_logical_line_errors() {
        assert_eq!(logical_lines("x = (1 +\n2").unwrap_err().line, 1);
        assert_eq!(logical_lines("a = 1\nb = 2)").unwrap_err().line, 2);
        assert!(logical_lines("x = [1, 2)").is_err());
        assert_eq!(logical_lines("a = 1\ns = 'abc\nb = 2").unwrap_err().line, 2);
    }

    #[test]
    fn test_statements() {
        let program = parse_program(
            "import math\nx = 5\ny += x\na = b = 1\np, q = 1, 2\nprint(x)\ndef f(t):\n    return t\nk: int = 3\n",
        )
        .unwrap();
        assert_eq!(program[0], Statement::Other("import".to_string()));
        assert_eq!(program[1], Statement::assign("x", Expr::int(5)));
        assert_eq!(program[2], Statement::aug_assign("y", BinaryOp::Add, n("x")));
        assert_eq!(
            program[3],
            Statement::Assign {
                targets: vec![
                    AssignTarget::Name("a".to_string()),
                    AssignTarget::Name("b".to_string())
                ],
                value: Expr::int(1),
            }
        );
        assert_eq!(
            program[4],
            Statement::Assign {
                targets: vec![AssignTarget::Tuple(vec![
                    AssignTarget::Name("p".to_string()),
                    AssignTarget::Name("q".to_string())
                ])],
                value: Expr::Sequence(SequenceKind::Tuple, vec![Expr::int(1), Expr::int(2)]),
            }
        );
        assert_eq!(program[5], Statement::Other("expression".to_string()));
        assert_eq!(program[6], Statement::Other("def".to_string()));
        assert_eq!(program[7], Statement::Other("block body".to_string()));
        assert_eq!(program[8], Statement::Other("annotated assignment".to_string()));
        assert_eq!(program.len(), 9);
    }

    #[test]
    fn test_unsupported_syntax_is_skipped() {
        let program = parse_program(
            "f = lambda t: 2*t\nsq = [i*i for i in range(3)]\nh = v[1:3]\nd = {'a': 1}\nprint(x, end='')\nx = 1",
        )
        .unwrap();
        let skipped = program
            .iter()
            .filter(|s| **s == Statement::Other("unsupported".to_string()))
            .count();
        assert_eq!(skipped, 5);
        assert_eq!(program[5], Statement::assign("x", Expr::int(1)));
    }

    #[test]
    fn test_program_errors() {
        let err = parse_program("x = 1\ny = 3 +\nz = 2").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(parse_program("1 = x").is_err());
        assert!(parse_program("f(x) = 2").is_err());
        let err = parse_program("a = 1\nb = 2 2").unwrap_err();
        assert_eq!(err.to_string(), "line 2: expected end of statement, found '2'");
    }
}
