//! Dialect modules and the registry the locator consults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a dialect's source text is read before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    /// Self-describing markup (XML family); encoding comes from the document.
    StructuredMarkup,
    /// Plain text markup read with the configured input encoding.
    PlainText,
    /// Anything else, treated like plain text.
    Unknown,
}

/// A registered dialect: its parser id, source sub-directory and extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserModule {
    /// Identifier of the parser handling this dialect.
    pub parser_id: String,

    /// Sub-directory of a site root holding documents of this dialect.
    pub source_dir: String,

    /// File extensions (without the leading dot).
    pub extensions: Vec<String>,
}

impl ParserModule {
    /// Create a new module.
    pub fn new(
        parser_id: impl Into<String>,
        source_dir: impl Into<String>,
        extensions: &[&str],
    ) -> Self {
        Self {
            parser_id: parser_id.into(),
            source_dir: source_dir.into(),
            extensions: extensions.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

/// Lookup failure for a dialect id.
#[derive(Debug, Error)]
#[error("no module registered for dialect '{0}'")]
pub struct ModuleNotFound(pub String);

/// Ordered set of dialect modules.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<ParserModule>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `markdown` and `xdoc` dialects.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ParserModule::new("markdown", "markdown", &["md", "markdown"]));
        registry.register(ParserModule::new("xdoc", "xdoc", &["xml"]));
        registry
    }

    /// Register a module, replacing any module with the same parser id in place.
    pub fn register(&mut self, module: ParserModule) {
        match self
            .modules
            .iter_mut()
            .find(|m| m.parser_id == module.parser_id)
        {
            Some(existing) => *existing = module,
            None => self.modules.push(module),
        }
    }

    /// Look up a module by dialect id.
    pub fn get_module(&self, parser_id: &str) -> Result<&ParserModule, ModuleNotFound> {
        self.modules
            .iter()
            .find(|m| m.parser_id == parser_id)
            .ok_or_else(|| ModuleNotFound(parser_id.to_string()))
    }

    /// All modules in registration order.
    #[must_use]
    pub fn modules(&self) -> &[ParserModule] {
        &self.modules
    }
}
