//! Build orchestration.
//!
//! Coordinates the full site build process: locate documents, decide which
//! ones are stale, render them and copy the site resources.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use rayon::prelude::*;
use sitewright_core::{Config, CoreError, Decoration, DocumentEntry, ModuleRegistry, SiteRenderingContext};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    context::ContextBuilder,
    gate,
    locator::{CasePolicy, DocumentLocator, LocatorError},
    renderer::{DocumentRenderer, RenderError},
    resources::{self, CopyStats, ResourceError},
    skin::{SkinError, SkinResolver},
};

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// IO error.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document discovery failed.
    #[error("locator error: {0}")]
    Locator(#[from] LocatorError),

    /// Resource copying failed.
    #[error("resource error: {0}")]
    Resources(#[from] ResourceError),

    /// The skin could not be used.
    #[error("skin error: {0}")]
    Skin(#[from] SkinError),

    /// Configuration error.
    #[error("config error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// A document that could not be rendered.
#[derive(Debug)]
pub struct DocumentFailure {
    /// Output the document would have been written to.
    pub output_name: String,

    pub error: RenderError,
}

/// Build statistics.
#[derive(Debug, Default)]
pub struct BuildStats {
    /// Number of documents located.
    pub documents: usize,

    /// Number of pages rendered.
    pub rendered: usize,

    /// Number of pages left alone because they were up to date.
    pub skipped: usize,

    /// Number of external documents, rendered elsewhere.
    pub external: usize,

    /// Documents that failed to render.
    pub failures: Vec<DocumentFailure>,

    /// Resource copy counts.
    pub resources: CopyStats,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

impl BuildStats {
    /// Whether every document rendered.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Outcome {
    Rendered,
    Skipped,
    Failed(DocumentFailure),
}

/// Site builder that orchestrates the build process.
#[derive(Debug)]
pub struct SiteBuilder {
    modules: ModuleRegistry,
    renderer: DocumentRenderer,
    case_policy: CasePolicy,
    parallel: bool,
    overwrite: bool,
}

impl Default for SiteBuilder {
    fn default() -> Self {
        Self::new(ModuleRegistry::with_defaults(), DocumentRenderer::default())
    }
}

impl SiteBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new(modules: ModuleRegistry, renderer: DocumentRenderer) -> Self {
        Self {
            modules,
            renderer,
            case_policy: CasePolicy::host(),
            parallel: false,
            overwrite: false,
        }
    }

    #[must_use]
    pub fn with_case_policy(mut self, case_policy: CasePolicy) -> Self {
        self.case_policy = case_policy;
        self
    }

    /// Render documents on the rayon thread pool.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Render every document regardless of timestamps.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn renderer(&self) -> &DocumentRenderer {
        &self.renderer
    }

    /// Locator configured like this builder.
    pub fn locator(&self) -> DocumentLocator<'_> {
        DocumentLocator::new(&self.modules).with_case_policy(self.case_policy)
    }

    /// Execute the full build process.
    pub fn build(&self, site: &SiteRenderingContext, output_dir: &Path) -> Result<BuildStats> {
        let start = Instant::now();
        let mut stats = BuildStats::default();

        info!(output = %output_dir.display(), "starting build");

        let documents = self.locator().locate(site)?;
        stats.documents = documents.len();

        fs::create_dir_all(output_dir).map_err(|source| BuildError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let contexts = ContextBuilder::new(site);
        let (external, local): (Vec<&DocumentEntry>, Vec<&DocumentEntry>) =
            documents.values().partition(|e| e.is_external);
        stats.external = external.len();

        let outcomes: Vec<Outcome> = if self.parallel {
            local
                .par_iter()
                .map(|entry| self.build_entry(entry, site, &contexts, output_dir))
                .collect()
        } else {
            local
                .iter()
                .map(|entry| self.build_entry(entry, site, &contexts, output_dir))
                .collect()
        };

        for outcome in outcomes {
            match outcome {
                Outcome::Rendered => stats.rendered += 1,
                Outcome::Skipped => stats.skipped += 1,
                Outcome::Failed(failure) => stats.failures.push(failure),
            }
        }

        stats.resources = resources::copy_resources(site, output_dir)?;
        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            documents = stats.documents,
            rendered = stats.rendered,
            skipped = stats.skipped,
            failed = stats.failures.len(),
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    fn build_entry(
        &self,
        entry: &DocumentEntry,
        site: &SiteRenderingContext,
        contexts: &ContextBuilder,
        output_dir: &Path,
    ) -> Outcome {
        let output_file = output_dir.join(&entry.output_name);
        if !self.overwrite && !gate::should_render(entry, site, &output_file) {
            debug!(output = %entry.output_name, "up to date");
            return Outcome::Skipped;
        }

        match self.render_to_file(entry, site, contexts, &output_file) {
            Ok(()) => Outcome::Rendered,
            Err(error) => {
                warn!(output = %entry.output_name, error = %error, "document failed to render");
                Outcome::Failed(DocumentFailure {
                    output_name: entry.output_name.clone(),
                    error,
                })
            }
        }
    }

    /// Render into memory, then write the file; a failed render leaves any
    /// previous output untouched.
    fn render_to_file(
        &self,
        entry: &DocumentEntry,
        site: &SiteRenderingContext,
        contexts: &ContextBuilder,
        output_file: &Path,
    ) -> std::result::Result<(), RenderError> {
        let mut buffer = Vec::new();
        self.renderer.render_with(entry, site, contexts, &mut buffer)?;

        let io_error = |source| RenderError::Io {
            path: output_file.to_path_buf(),
            source,
        };
        if let Some(parent) = output_file.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(output_file, buffer).map_err(io_error)?;

        debug!(path = %output_file.display(), "wrote page");
        Ok(())
    }
}

/// Build the site rendering context described by a configuration.
///
/// Binds the skin archive, the loose template file or the built-in template,
/// then applies roots, modules, encodings and the remaining site settings.
pub fn site_context_from_config(config: &Config, resolver: &SkinResolver) -> Result<SiteRenderingContext> {
    let decoration = match &config.site.decoration {
        Some(path) => Decoration::load(&config.resolve(path))?,
        None => Decoration::default(),
    };
    let attributes = config.properties.clone();
    let title = config.site.default_window_title.clone();
    let locale = config.site.locale.as_str();

    let mut site = match (&config.skin.archive, &config.skin.template) {
        (Some(archive), _) => {
            resolver.resolve_skin(&config.resolve(archive), attributes, decoration, title, locale)?
        }
        (None, Some(template)) => {
            resolver.context_for_template(&config.resolve(template), attributes, decoration, title, locale)
        }
        (None, None) => resolver.default_context(attributes, decoration, title, locale),
    };

    for root in config.site_roots() {
        site = site.with_site_root(root);
    }
    for extra in &config.modules.extra {
        site = site.with_extra_module(&extra.dialect, config.resolve(&extra.dir));
    }
    for (dialect, excludes) in &config.modules.excludes {
        site = site.with_module_exclude(dialect, excludes);
    }

    site = site
        .with_site_locales(config.site.locales.clone())
        .with_encodings(&config.site.input_encoding, &config.site.output_encoding)
        .with_validate(config.site.validate);
    if let Some(dir) = &config.site.processed_markup_dir {
        site = site.with_processed_markup_dir(config.resolve(dir));
    }
    if let Some(date) = config.publish_date()? {
        site = site.with_publish_date(date);
    }

    Ok(site)
}
