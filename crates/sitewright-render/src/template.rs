//! Site template loading and merging.
//!
//! Provides a lightweight template system using string interpolation rather than
//! heavy template engines like Tera or Handlebars. Placeholders are written
//! `{{ name }}` (required) or `{{ name? }}` (optional) and may address nested
//! values with dots, e.g. `{{ decoration.name }}`.

use std::{
    collections::BTreeMap,
    fs,
    io::{self, Read, Write},
    path::Path,
};

use serde_json::Value;
use sitewright_core::TemplateSource;
use thiserror::Error;
use tracing::debug;

use crate::resources::BUILTIN_RESOURCES;

/// Template errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Missing required variable.
    #[error("missing required variable: {0}")]
    MissingVariable(String),

    /// Template not found.
    #[error("template not found: {name} in {location}")]
    NotFound { name: String, location: String },

    /// Invalid template syntax.
    #[error("invalid template syntax: {0}")]
    InvalidSyntax(String),

    /// Template file is not valid UTF-8.
    #[error("template {0} is not valid UTF-8")]
    Encoding(String),

    /// Reading the template or writing the merge result failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Skin archive could not be read.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Template context with variables for interpolation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateContext {
    variables: BTreeMap<String, Value>,
}

impl TemplateContext {
    /// Create a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable into the context, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Create context with initial variables.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get a top-level variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    /// Check if a variable exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    /// Resolve a possibly dotted path.
    ///
    /// An exact top-level key wins over a nested lookup, so user properties
    /// named `project.version` stay addressable.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.variables.get(path) {
            return Some(value);
        }

        let mut parts = path.split('.');
        let mut current = self.variables.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Iterate over top-level variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of top-level variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// A simple template that supports variable interpolation.
///
/// Variables are specified as `{{ variable_name }}` in the template string.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    content: String,
}

impl Template {
    /// Create a new template with the given name and content.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Get the template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the template with the given context.
    ///
    /// Replaces all `{{ variable }}` placeholders with values from context.
    /// Substituted values are never re-scanned for placeholders.
    pub fn render(&self, context: &TemplateContext) -> Result<String> {
        let mut result = String::with_capacity(self.content.len());
        let mut rest = self.content.as_str();

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| {
                TemplateError::InvalidSyntax(format!("unclosed {{{{ delimiter in {}", self.name))
            })?;

            let var_name = after[..end].trim();

            // Check for optional variable syntax: {{ variable? }}
            let (var_name, optional) = match var_name.strip_suffix('?') {
                Some(stripped) => (stripped.trim_end(), true),
                None => (var_name, false),
            };
            if var_name.is_empty() {
                return Err(TemplateError::InvalidSyntax(format!(
                    "empty placeholder in {}",
                    self.name
                )));
            }

            match context.lookup(var_name) {
                Some(value) => result.push_str(&display_value(value)),
                None if optional => {}
                None => return Err(TemplateError::MissingVariable(var_name.to_string())),
            }

            rest = &after[end + 2..];
        }
        result.push_str(rest);

        Ok(result)
    }
}

/// Text a value renders as inside a template.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Loads and merges site templates.
pub trait TemplateEngine: Send + Sync + std::fmt::Debug {
    /// Load the template `name` from `source`.
    fn get_template(&self, name: &str, source: &TemplateSource) -> Result<Template>;

    /// Merge `template` with `context`, writing the result to `writer`.
    fn merge(
        &self,
        template: &Template,
        context: &TemplateContext,
        writer: &mut dyn Write,
    ) -> Result<()>;
}

/// The built-in `{{ placeholder }}` engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpolationEngine;

impl InterpolationEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self
    }
}

impl TemplateEngine for InterpolationEngine {
    fn get_template(&self, name: &str, source: &TemplateSource) -> Result<Template> {
        let not_found = |location: String| TemplateError::NotFound {
            name: name.to_string(),
            location,
        };

        let content = match source {
            TemplateSource::Builtin => BUILTIN_RESOURCES
                .get_file(name)
                .ok_or_else(|| not_found("built-in resources".to_string()))?
                .contents_utf8()
                .ok_or_else(|| TemplateError::Encoding(name.to_string()))?
                .to_string(),
            TemplateSource::Archive(archive) => read_archive_entry(archive, name)?
                .ok_or_else(|| not_found(archive.display().to_string()))?,
            TemplateSource::Directory(dir) => {
                let path = dir.join(name);
                match fs::read(&path) {
                    Ok(bytes) => String::from_utf8(bytes)
                        .map_err(|_| TemplateError::Encoding(path.display().to_string()))?,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        return Err(not_found(dir.display().to_string()));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        debug!(template = name, source = ?source, "loaded template");
        Ok(Template::new(name, content))
    }

    fn merge(
        &self,
        template: &Template,
        context: &TemplateContext,
        writer: &mut dyn Write,
    ) -> Result<()> {
        let rendered = template.render(context)?;
        writer.write_all(rendered.as_bytes())?;
        Ok(())
    }
}

/// Read a UTF-8 entry from a zip archive; `None` when the entry is absent.
fn read_archive_entry(archive: &Path, name: &str) -> Result<Option<String>> {
    let file = fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut entry = match zip.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|_| TemplateError::Encoding(format!("{}!{name}", archive.display())))?;
    Ok(Some(content))
}
