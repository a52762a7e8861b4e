//! Well-formedness validation for structured markup.

use quick_xml::{Reader, events::Event};
use thiserror::Error;

/// A document that failed validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid document{}: {message}", at_line(.line))]
pub struct ValidationError {
    /// 1-based line of the failure, when known.
    pub line: Option<usize>,

    /// Description of the failure.
    pub message: String,
}

fn at_line(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

/// Checks a document before it is handed to its parser.
pub trait Validator: Send + Sync + std::fmt::Debug {
    /// Validate the decoded document text.
    fn validate(&self, content: &str) -> Result<(), ValidationError>;
}

/// Validator requiring a well-formed XML document with a single root element.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlValidator;

impl XmlValidator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self
    }
}

impl Validator for XmlValidator {
    fn validate(&self, content: &str) -> Result<(), ValidationError> {
        let mut reader = Reader::from_str(content);
        let mut depth = 0usize;
        let mut roots = 0usize;

        loop {
            let position = reader.buffer_position() as usize;
            let event = reader.read_event().map_err(|e| ValidationError {
                line: Some(crate::line_at(content, reader.error_position() as usize)),
                message: e.to_string(),
            })?;
            let fail = |message: &str| ValidationError {
                line: Some(crate::line_at(content, position)),
                message: message.to_string(),
            };

            match event {
                Event::Eof => break,
                Event::Start(_) | Event::Empty(_) if depth == 0 => {
                    roots += 1;
                    if roots > 1 {
                        return Err(fail("content after the root element"));
                    }
                    if matches!(event, Event::Start(_)) {
                        depth += 1;
                    }
                }
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Text(t) if depth == 0 => {
                    if t.iter().any(|b| !b.is_ascii_whitespace()) {
                        return Err(fail("text outside the root element"));
                    }
                }
                _ => {}
            }
        }

        if depth > 0 {
            return Err(ValidationError {
                line: Some(crate::line_at(content, content.len())),
                message: "unclosed element at end of document".to_string(),
            });
        }
        if roots == 0 {
            return Err(ValidationError {
                line: None,
                message: "no root element".to_string(),
            });
        }
        Ok(())
    }
}
