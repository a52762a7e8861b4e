//! Rendering of a single document: read, optionally pre-process, validate,
//! parse, and merge into the site template.

use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use sitewright_core::{
    ContentType, DocumentEntry, RenderingContext, SiteRenderingContext, encoding,
};
use sitewright_parser::{
    ParseError, ParseOptions, Parser, ParserError, ParserRegistry, Sink, Validator, XmlValidator,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    context::ContextBuilder,
    template::{InterpolationEngine, Template, TemplateEngine, TemplateError},
};

/// Document rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No parser is registered for the document's dialect.
    #[error("cannot render {path}: {source}")]
    ParserLookup {
        path: PathBuf,
        #[source]
        source: ParserError,
    },

    /// The document could not be parsed or failed validation.
    #[error("error parsing {path}{}: {message}", line_suffix(.line))]
    Parse {
        path: PathBuf,
        line: Option<usize>,
        message: String,
    },

    /// Reading the source or writing the result failed.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The site template does not exist in its source.
    #[error("{0}")]
    TemplateNotFound(String),

    /// Merging the document into the template failed.
    #[error("cannot merge {path} into the site template: {source}")]
    Merge {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    /// Source or output encoding problem.
    #[error("encoding error for {path}: {message}")]
    Encoding { path: PathBuf, message: String },
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

/// Result type for rendering.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Renders documents with a fixed set of collaborators.
#[derive(Debug)]
pub struct DocumentRenderer {
    parsers: ParserRegistry,
    engine: Box<dyn TemplateEngine>,
    validator: Box<dyn Validator>,
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::new(
            ParserRegistry::new(),
            Box::new(InterpolationEngine::new()),
            Box::new(XmlValidator::new()),
        )
    }
}

impl DocumentRenderer {
    /// Create a renderer from its collaborators.
    pub fn new(
        parsers: ParserRegistry,
        engine: Box<dyn TemplateEngine>,
        validator: Box<dyn Validator>,
    ) -> Self {
        Self {
            parsers,
            engine,
            validator,
        }
    }

    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    /// Render one document into `out`, computing site facts on the spot.
    pub fn render_document(
        &self,
        entry: &DocumentEntry,
        site: &SiteRenderingContext,
        out: &mut dyn Write,
    ) -> Result<()> {
        self.render_with(entry, site, &ContextBuilder::new(site), out)
    }

    /// Render one document into `out` with precomputed site facts.
    pub fn render_with(
        &self,
        entry: &DocumentEntry,
        site: &SiteRenderingContext,
        contexts: &ContextBuilder,
        out: &mut dyn Write,
    ) -> Result<()> {
        let rendering = &entry.context;
        let sink = self.parse_document(rendering, site, contexts)?;
        let path = rendering.source_path();

        let page = contexts.page_context(&sink, rendering);
        let template = self
            .engine
            .get_template(&site.template_name, &site.template_source)
            .map_err(|e| match e {
                TemplateError::NotFound { .. } => RenderError::TemplateNotFound(e.to_string()),
                other => RenderError::Merge {
                    path: path.clone(),
                    source: other,
                },
            })?;

        let mut merged = Vec::new();
        self.engine
            .merge(&template, &page, &mut merged)
            .map_err(|source| RenderError::Merge {
                path: path.clone(),
                source,
            })?;

        let text = String::from_utf8_lossy(&merged);
        let bytes = encoding::encode_output(&text, &site.output_encoding).map_err(|e| {
            RenderError::Encoding {
                path: path.clone(),
                message: e.to_string(),
            }
        })?;
        out.write_all(&bytes)
            .map_err(|source| RenderError::Io { path, source })?;

        debug!(output = %entry.output_name, "rendered document");
        Ok(())
    }

    /// Read, pre-process, validate and parse one document.
    pub fn parse_document(
        &self,
        rendering: &RenderingContext,
        site: &SiteRenderingContext,
        contexts: &ContextBuilder,
    ) -> Result<Sink> {
        let path = rendering.source_path();
        let parser = self
            .parsers
            .get_parser(rendering.parser_id())
            .map_err(|source| RenderError::ParserLookup {
                path: path.clone(),
                source,
            })?;
        let content_type = parser.content_type();

        let bytes = fs::read(&path).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
        // Pre-pass sources are template text, read with the input encoding.
        let pre_pass = rendering.flags().needs_template_pre_pass;
        let decode_as = if pre_pass {
            ContentType::PlainText
        } else {
            content_type
        };
        let raw = encoding::decode_source(&bytes, decode_as, &site.input_encoding).map_err(
            |e| RenderError::Encoding {
                path: path.clone(),
                message: e.to_string(),
            },
        )?;

        let text = if pre_pass {
            match self.pre_pass(&raw, rendering, contexts) {
                Ok(processed) => {
                    self.persist_processed(&processed, rendering, site);
                    processed
                }
                Err(e) => {
                    warn!(
                        document = %path.display(),
                        error = %e,
                        "template pre-pass failed, parsing the raw document"
                    );
                    raw
                }
            }
        } else {
            raw
        };

        if content_type == ContentType::StructuredMarkup && site.validate {
            self.validator
                .validate(&text)
                .map_err(|e| parse_error(&path, e.into()))?;
        }

        parse(parser, &text).map_err(|e| parse_error(&path, e))
    }

    /// Merge the raw document through the template engine.
    fn pre_pass(
        &self,
        raw: &str,
        rendering: &RenderingContext,
        contexts: &ContextBuilder,
    ) -> std::result::Result<String, TemplateError> {
        let template = Template::new(rendering.input_name(), raw);
        let context = contexts.document_context(rendering);

        let mut processed = Vec::new();
        self.engine.merge(&template, &context, &mut processed)?;
        String::from_utf8(processed)
            .map_err(|_| TemplateError::Encoding(rendering.input_name().to_string()))
    }

    /// Keep a copy of pre-processed markup for inspection, when configured.
    fn persist_processed(&self, processed: &str, rendering: &RenderingContext, site: &SiteRenderingContext) {
        let Some(dir) = &site.processed_markup_dir else {
            return;
        };
        let target = dir.join(rendering.processed_name());

        let written = encoding::encode_output(processed, &site.input_encoding)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
            .and_then(|bytes| {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&target, bytes)
            });

        match written {
            Ok(()) => debug!(path = %target.display(), "wrote processed markup"),
            Err(e) => warn!(path = %target.display(), error = %e, "could not write processed markup"),
        }
    }
}

fn parse(parser: &dyn Parser, text: &str) -> std::result::Result<Sink, ParseError> {
    parser.parse(
        text,
        &ParseOptions {
            emit_comments: false,
        },
    )
}

fn parse_error(path: &std::path::Path, err: ParseError) -> RenderError {
    RenderError::Parse {
        path: path.to_path_buf(),
        line: err.line,
        message: err.message,
    }
}
