//! Rendering contexts: what one document render and one site build need.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};

use crate::{decoration::Decoration, skin::SkinDescriptor};

/// Extension of every rendered document.
pub const OUTPUT_EXTENSION: &str = "html";

/// Suffix marking a document that is merged through the template engine
/// before it is parsed (`index.md.vm`).
pub const PRE_PASS_SUFFIX: &str = ".vm";

/// Name of the built-in site template.
pub const DEFAULT_TEMPLATE: &str = "default-site.html";

/// Case-insensitive (ASCII) suffix test.
pub fn ends_with_ignore_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Per-document flags set during discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentFlags {
    /// The raw text is a template and must be merged before parsing.
    pub needs_template_pre_pass: bool,
}

/// Everything needed to render one source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderingContext {
    basedir: PathBuf,
    input_name: String,
    parser_id: String,
    extension: String,
    flags: DocumentFlags,
    output_name: String,
    relative_path: String,
}

impl RenderingContext {
    /// Create a context for `input_name` (relative to `basedir`) written in
    /// the dialect `parser_id` with the matched `extension`.
    ///
    /// The pre-pass flag is derived from the file name.
    pub fn new(
        basedir: impl Into<PathBuf>,
        input_name: impl Into<String>,
        parser_id: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        let input_name = input_name.into().replace('\\', "/");
        let extension = extension.into();
        let flags = DocumentFlags {
            needs_template_pre_pass: ends_with_ignore_case(&input_name, PRE_PASS_SUFFIX),
        };

        let output_name = output_name_for(&input_name, &extension);
        let relative_path = relative_path_for(&input_name);

        Self {
            basedir: basedir.into(),
            input_name,
            parser_id: parser_id.into(),
            extension,
            flags,
            output_name,
            relative_path,
        }
    }

    /// Module base directory the input name is relative to.
    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    /// Input path relative to the base directory, with `/` separators.
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Dialect of this document.
    pub fn parser_id(&self) -> &str {
        &self.parser_id
    }

    /// Dialect extension the document was matched on.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn flags(&self) -> DocumentFlags {
        self.flags
    }

    /// Output path relative to the output directory, e.g. `guide/intro.html`.
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Path from the document's directory back to the site root (`.`, `..`, `../..`).
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Absolute (or basedir-relative) path of the source file.
    pub fn source_path(&self) -> PathBuf {
        self.basedir.join(&self.input_name)
    }

    /// Input name without the pre-pass suffix.
    pub fn processed_name(&self) -> &str {
        if self.flags.needs_template_pre_pass {
            &self.input_name[..self.input_name.len() - PRE_PASS_SUFFIX.len()]
        } else {
            &self.input_name
        }
    }
}

fn output_name_for(input_name: &str, extension: &str) -> String {
    let mut document = input_name;
    if ends_with_ignore_case(document, PRE_PASS_SUFFIX) {
        document = &document[..document.len() - PRE_PASS_SUFFIX.len()];
    }

    let dialect_suffix = format!(".{extension}");
    if ends_with_ignore_case(document, &dialect_suffix) {
        document = &document[..document.len() - dialect_suffix.len()];
    }

    format!("{document}.{OUTPUT_EXTENSION}")
}

fn relative_path_for(input_name: &str) -> String {
    let depth = input_name.matches('/').count();
    if depth == 0 {
        ".".to_string()
    } else {
        vec![".."; depth].join("/")
    }
}

/// One discovered document, keyed by its output name in the locator result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    pub context: RenderingContext,
    pub output_name: String,
    /// Render even when the output looks up to date.
    pub overwrite: bool,
    /// Output is produced by someone else; the writer loop skips it.
    pub is_external: bool,
}

impl DocumentEntry {
    /// Entry for a source document.
    pub fn new(context: RenderingContext) -> Self {
        Self {
            output_name: context.output_name().to_string(),
            context,
            overwrite: false,
            is_external: false,
        }
    }

    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn external(mut self) -> Self {
        self.is_external = true;
        self
    }
}

/// Where the site template is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// The template bundle compiled into the renderer.
    Builtin,
    /// An entry inside a skin archive.
    Archive(PathBuf),
    /// A loose template file in a directory.
    Directory(PathBuf),
}

/// A dialect directory outside the `<root>/<module>` layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraModule {
    pub parser_id: String,
    pub basedir: PathBuf,
}

/// Site-wide descriptor shared by every document of one build.
///
/// Built once (usually by the skin resolver plus the `with_*` methods) and
/// only read afterwards.
#[derive(Debug, Clone)]
pub struct SiteRenderingContext {
    /// Content roots, in priority order.
    pub site_roots: Vec<PathBuf>,

    /// Flat-layout module directories.
    pub extra_modules: Vec<ExtraModule>,

    /// Comma-separated exclude globs per dialect id.
    pub module_excludes: BTreeMap<String, String>,

    pub decoration: Decoration,

    /// Title prefix used when the decoration has no name.
    pub default_window_title: Option<String>,

    pub locale: String,

    pub site_locales: Vec<String>,

    /// Name of the site template within `template_source`.
    pub template_name: String,

    pub template_source: TemplateSource,

    /// Skin archive whose assets are copied into the output.
    pub skin_archive: Option<PathBuf>,

    /// Descriptor of the resolved skin, when it ships one.
    pub skin: Option<SkinDescriptor>,

    /// The built-in template is in use, so built-in assets are copied.
    pub using_default_template: bool,

    pub input_encoding: String,

    pub output_encoding: String,

    /// Validate structured-markup documents before parsing.
    pub validate: bool,

    /// Where pre-pass results are persisted, if anywhere.
    pub processed_markup_dir: Option<PathBuf>,

    /// User template properties, layered last over built-in keys.
    pub template_properties: BTreeMap<String, serde_json::Value>,

    /// Fixed publish date; the build time is used when unset.
    pub publish_date: Option<DateTime<Utc>>,
}

impl Default for SiteRenderingContext {
    fn default() -> Self {
        Self {
            site_roots: Vec::new(),
            extra_modules: Vec::new(),
            module_excludes: BTreeMap::new(),
            decoration: Decoration::default(),
            default_window_title: None,
            locale: "en".to_string(),
            site_locales: Vec::new(),
            template_name: DEFAULT_TEMPLATE.to_string(),
            template_source: TemplateSource::Builtin,
            skin_archive: None,
            skin: None,
            using_default_template: true,
            input_encoding: "UTF-8".to_string(),
            output_encoding: "UTF-8".to_string(),
            validate: false,
            processed_markup_dir: None,
            template_properties: BTreeMap::new(),
            publish_date: None,
        }
    }
}

impl SiteRenderingContext {
    /// Context carrying the caller's attributes, decoration, title and locale.
    pub fn new(
        template_properties: BTreeMap<String, serde_json::Value>,
        decoration: Decoration,
        default_window_title: Option<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            template_properties,
            decoration,
            default_window_title,
            locale: locale.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_site_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.site_roots.push(root.into());
        self
    }

    #[must_use]
    pub fn with_extra_module(
        mut self,
        parser_id: impl Into<String>,
        basedir: impl Into<PathBuf>,
    ) -> Self {
        self.extra_modules.push(ExtraModule {
            parser_id: parser_id.into(),
            basedir: basedir.into(),
        });
        self
    }

    #[must_use]
    pub fn with_module_exclude(
        mut self,
        parser_id: impl Into<String>,
        excludes: impl Into<String>,
    ) -> Self {
        self.module_excludes.insert(parser_id.into(), excludes.into());
        self
    }

    #[must_use]
    pub fn with_site_locales(mut self, locales: Vec<String>) -> Self {
        self.site_locales = locales;
        self
    }

    #[must_use]
    pub fn with_encodings(
        mut self,
        input_encoding: impl Into<String>,
        output_encoding: impl Into<String>,
    ) -> Self {
        self.input_encoding = input_encoding.into();
        self.output_encoding = output_encoding.into();
        self
    }

    #[must_use]
    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    #[must_use]
    pub fn with_processed_markup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.processed_markup_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_publish_date(mut self, date: DateTime<Utc>) -> Self {
        self.publish_date = Some(date);
        self
    }

    /// Locales the site is published in; falls back to the main locale.
    pub fn supported_locales(&self) -> Vec<String> {
        if self.site_locales.is_empty() {
            vec![self.locale.clone()]
        } else {
            self.site_locales.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name_simple() {
        let ctx = RenderingContext::new("/site/markdown", "index.md", "markdown", "md");
        assert_eq!(ctx.output_name(), "index.html");
        assert_eq!(ctx.relative_path(), ".");
        assert!(!ctx.flags().needs_template_pre_pass);
    }

    #[test]
    fn test_output_name_nested_with_backslashes() {
        let ctx = RenderingContext::new("/site/xdoc", "guide\\deep\\intro.xml", "xdoc", "xml");
        assert_eq!(ctx.input_name(), "guide/deep/intro.xml");
        assert_eq!(ctx.output_name(), "guide/deep/intro.html");
        assert_eq!(ctx.relative_path(), "../..");
    }

    #[test]
    fn test_output_name_pre_pass() {
        let ctx = RenderingContext::new("/site/markdown", "download.md.vm", "markdown", "md");
        assert!(ctx.flags().needs_template_pre_pass);
        assert_eq!(ctx.output_name(), "download.html");
        assert_eq!(ctx.processed_name(), "download.md");
    }

    #[test]
    fn test_output_name_case_insensitive_extension() {
        let ctx = RenderingContext::new("/site/markdown", "README.MD", "markdown", "md");
        assert_eq!(ctx.output_name(), "README.html");
    }

    #[test]
    fn test_ends_with_ignore_case() {
        assert!(ends_with_ignore_case("a.XML.Vm", ".vm"));
        assert!(!ends_with_ignore_case("vm", ".vm"));
        assert!(!ends_with_ignore_case("é", ".vm"));
    }

    #[test]
    fn test_document_entry_defaults() {
        let ctx = RenderingContext::new("/site/markdown", "a/b.md", "markdown", "md");
        let entry = DocumentEntry::new(ctx);
        assert_eq!(entry.output_name, "a/b.html");
        assert!(!entry.overwrite);
        assert!(!entry.is_external);
        assert!(entry.with_overwrite(true).overwrite);
    }

    #[test]
    fn test_supported_locales_fallback() {
        let site = SiteRenderingContext::new(BTreeMap::new(), Decoration::default(), None, "fr");
        assert_eq!(site.supported_locales(), vec!["fr"]);

        let site = site.with_site_locales(vec!["en".into(), "fr".into()]);
        assert_eq!(site.supported_locales(), vec!["en", "fr"]);
    }
}
