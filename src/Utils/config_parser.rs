//! parse settings document with structure like " title1 key1: value1, value2 key2: value2 title2 key3: value3" which has
//! titles and pairs key-list of values, then read the known sections into `CalcSettings`.
//!
//! ```text
//! // what a calculation line shows
//! render
//!   symbolic: true
//!   substitution: false
//!   result: true
//! logging
//!   loglevel: debug
//!   logfile: calc.log
//! ```
//! Lines starting with //, #, % or ; are comments. Missing sections and keys keep their defaults.
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, recognize},
    multi::{many0, many1, separated_list1},
    sequence::{delimited, pair, separated_pair, terminated},
};
use simplelog::LevelFilter;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::Utils::logger::parse_level;
use crate::calc::assembler::RenderConfig;

type DocumentMap = HashMap<String, SectionMap>;
type SectionMap = HashMap<String, Vec<ConfigValue>>;

/// one value of a settings document
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl ConfigValue {
    pub fn as_boolean(&self) -> Option<bool> {
        if let ConfigValue::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }
}

impl Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValue::String(s) => write!(f, "{}", s),
            ConfigValue::Float(val) => write!(f, "{}", val),
            ConfigValue::Integer(val) => write!(f, "{}", val),
            ConfigValue::Boolean(val) => write!(f, "{}", val),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings syntax error: {0}")]
    Syntax(String),
    #[error("unknown settings section '{0}'")]
    UnknownSection(String),
    #[error("unknown key '{key}' in section '{section}'")]
    UnknownKey { section: String, key: String },
    #[error("invalid value '{value}' for {section}.{key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),
}

/// Parses a title or a key (word characters without spaces)
fn parse_word(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    let mut parser = map(parser, String::from);
    parser.parse(input)
}

fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, title) = parse_word(input)?;
    Ok((input.trim_start(), title))
}

fn parse_value(input: &str) -> IResult<&str, ConfigValue> {
    // a single value stops at commas, whitespace, newlines and semicolons
    let value_parser = take_while1(|c: char| !matches!(c, ',' | ' ' | '\t' | '\r' | '\n' | ';'));
    let mut value_parser = map(value_parser, |s: &str| {
        if let Ok(val) = s.parse::<i64>() {
            ConfigValue::Integer(val)
        } else if let Ok(val) = s.parse::<f64>() {
            ConfigValue::Float(val)
        } else if let Ok(val) = s.parse::<bool>() {
            ConfigValue::Boolean(val)
        } else {
            ConfigValue::String(s.to_string())
        }
    });
    value_parser.parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<ConfigValue>> {
    let separator_coma = delimited(space0, tag(","), space0);
    let mut value_parser = separated_list1(separator_coma, parse_value);
    value_parser.parse(input)
}

fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<ConfigValue>)> {
    let colon_separator = delimited(space0, tag(":"), space0);
    let mut parser = separated_pair(parse_word, colon_separator, parse_value_list);
    let (input, result) = parser.parse(input)?;
    Ok((input.trim_start(), result))
}

fn parse_section(input: &str) -> IResult<&str, (String, SectionMap)> {
    let (input, _) = space0(input)?;
    let (input, title) = parse_title(input)?;
    let mut parser = many1(terminated(parse_key_value_pair, space0));
    let (input, pairs) = parser.parse(input)?;
    Ok((input, (title, pairs.into_iter().collect())))
}

/// Drops comment lines (starting with //, #, %, or ;) and blank lines
fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("//")
                && !trimmed.starts_with('#')
                && !trimmed.starts_with('%')
                && !trimmed.starts_with(';')
                && !trimmed.is_empty()
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Parses the whole document into title -> key -> values. A section that appears twice is merged.
pub fn parse_document(input: &str) -> Result<DocumentMap, ConfigError> {
    let filtered = filter_comments(input);
    if filtered.trim().is_empty() {
        return Ok(HashMap::new());
    }
    let mut parser = many1(delimited(multispace0, parse_section, multispace0));
    let (remaining, sections) = parser
        .parse(filtered.as_str())
        .map_err(|e| ConfigError::Syntax(format!("{:?}", e)))?;
    if !remaining.trim().is_empty() {
        return Err(ConfigError::Syntax(format!(
            "failed to parse entire document, remaining: '{}'",
            remaining
        )));
    }
    let mut document: DocumentMap = HashMap::new();
    for (title, section) in sections {
        document.entry(title).or_default().extend(section);
    }
    Ok(document)
}

/// Everything the command line tool can be configured with
#[derive(Debug, Clone, PartialEq)]
pub struct CalcSettings {
    pub render: RenderConfig,
    pub loglevel: LevelFilter,
    pub logfile: Option<PathBuf>,
}

impl Default for CalcSettings {
    fn default() -> Self {
        CalcSettings {
            render: RenderConfig::default(),
            loglevel: LevelFilter::Warn,
            logfile: None,
        }
    }
}

fn single<'a>(
    section: &str,
    key: &str,
    values: &'a [ConfigValue],
) -> Result<&'a ConfigValue, ConfigError> {
    match values {
        [value] => Ok(value),
        _ => Err(ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

fn flag(section: &str, key: &str, values: &[ConfigValue]) -> Result<bool, ConfigError> {
    let value = single(section, key, values)?;
    value.as_boolean().ok_or_else(|| ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl CalcSettings {
    /// Settings from a document; sections and keys that are not present keep their defaults
    pub fn from_document(input: &str) -> Result<Self, ConfigError> {
        let document = parse_document(input)?;
        let mut settings = CalcSettings::default();
        for (title, section) in &document {
            for (key, values) in section {
                match (title.as_str(), key.as_str()) {
                    ("render", "symbolic") => {
                        settings.render.include_symbolic = flag(title, key, values)?
                    }
                    ("render", "substitution") => {
                        settings.render.include_substitution = flag(title, key, values)?
                    }
                    ("render", "result") => {
                        settings.render.include_result = flag(title, key, values)?
                    }
                    ("logging", "loglevel") => {
                        let value = single(title, key, values)?.to_string();
                        settings.loglevel =
                            parse_level(&value).ok_or_else(|| ConfigError::InvalidValue {
                                section: title.clone(),
                                key: key.clone(),
                                value,
                            })?;
                    }
                    ("logging", "logfile") => {
                        settings.logfile = Some(PathBuf::from(single(title, key, values)?.to_string()))
                    }
                    ("render" | "logging", _) => {
                        return Err(ConfigError::UnknownKey {
                            section: title.clone(),
                            key: key.clone(),
                        });
                    }
                    _ => return Err(ConfigError::UnknownSection(title.clone())),
                }
            }
        }
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_document(&content)
    }
}

/////////////////////////////TESTS////////////////////////////////////////////////////
/*
word, value and pair parsers
whole documents with comments and repeated sections
settings defaults, overrides and rejected input
*/
