//! Sitewright Parser Library
//!
//! Parsers for the markup dialects a site is authored in, plus the
//! well-formedness check applied before structured markup is parsed.

pub mod markdown;
pub mod sink;
pub mod validator;
pub mod xdoc;

use std::collections::BTreeMap;

pub use markdown::MarkdownParser;
pub use sink::Sink;
use sitewright_core::ContentType;
use thiserror::Error;
pub use validator::{ValidationError, Validator, XmlValidator};
pub use xdoc::XdocParser;

/// Options applied to a single parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep source comments in the rendered output.
    pub emit_comments: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            emit_comments: true,
        }
    }
}

/// A document that could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", describe(.line, .message))]
pub struct ParseError {
    /// 1-based source line, when known.
    pub line: Option<usize>,

    /// What went wrong.
    pub message: String,
}

fn describe(line: &Option<usize>, message: &str) -> String {
    match line {
        Some(line) => format!("line {line}: {message}"),
        None => message.to_string(),
    }
}

impl ParseError {
    /// Create a parse error without position information.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            line: None,
            message: message.into(),
        }
    }

    /// Create a parse error at a byte offset into `text`.
    pub fn at_offset(text: &str, offset: usize, message: impl Into<String>) -> Self {
        Self {
            line: Some(line_at(text, offset)),
            message: message.into(),
        }
    }
}

impl From<ValidationError> for ParseError {
    fn from(err: ValidationError) -> Self {
        Self {
            line: err.line,
            message: format!("validation failed: {}", err.message),
        }
    }
}

/// 1-based line number of a byte offset.
pub(crate) fn line_at(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}

/// Parser errors.
#[derive(Debug, Error)]
pub enum ParserError {
    /// No parser is registered under the requested id.
    #[error("no parser registered for dialect '{0}'")]
    NotFound(String),
}

/// Result type for parser lookups.
pub type Result<T> = std::result::Result<T, ParserError>;

/// A markup dialect parser.
pub trait Parser: Send + Sync + std::fmt::Debug {
    /// How source text for this dialect is decoded.
    fn content_type(&self) -> ContentType;

    /// Parse a whole document into a fresh sink.
    fn parse(&self, text: &str, options: &ParseOptions) -> std::result::Result<Sink, ParseError>;
}

/// Parsers keyed by dialect id.
#[derive(Debug)]
pub struct ParserRegistry {
    parsers: BTreeMap<String, Box<dyn Parser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    /// Create a registry with the built-in `markdown` and `xdoc` parsers.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("markdown", MarkdownParser::new());
        registry.register("xdoc", XdocParser::new());
        registry
    }

    /// Create a registry with no parsers.
    pub fn empty() -> Self {
        Self {
            parsers: BTreeMap::new(),
        }
    }

    /// Register a parser, replacing any previous parser with the same id.
    pub fn register(&mut self, id: impl Into<String>, parser: impl Parser + 'static) {
        self.parsers.insert(id.into(), Box::new(parser));
    }

    /// Look up the parser for a dialect id.
    pub fn get_parser(&self, id: &str) -> Result<&dyn Parser> {
        self.parsers
            .get(id)
            .map(|p| p.as_ref())
            .ok_or_else(|| ParserError::NotFound(id.to_string()))
    }

    /// Registered dialect ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(String::as_str)
    }
}
