//! Skin resolution.
//!
//! A skin is a zip archive carrying the site template at
//! `META-INF/skin/site.html`, an optional descriptor at
//! `META-INF/skin/skin.xml` and any number of assets. Resolving a skin binds
//! the template for the build and checks the renderer version the skin
//! requires:
//!
//! ```xml
//! <skin>
//!   <prerequisites>
//!     <renderer>[1.0,2.0)</renderer>
//!   </prerequisites>
//! </skin>
//! ```

use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

pub use sitewright_core::SkinDescriptor;
use sitewright_core::{
    Decoration, SiteRenderingContext, TemplateSource, context::DEFAULT_TEMPLATE,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::version::{ArtifactVersion, VersionRange, VersionRangeError};

/// Archive entry holding the skin's site template.
pub const SKIN_TEMPLATE: &str = "META-INF/skin/site.html";

/// Archive entry holding the skin descriptor.
pub const SKIN_DESCRIPTOR: &str = "META-INF/skin/skin.xml";

/// Skin errors.
#[derive(Debug, Error)]
pub enum SkinError {
    /// The archive could not be opened or read.
    #[error("cannot read skin archive {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not a readable zip archive.
    #[error("invalid skin archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// `META-INF/skin/skin.xml` is malformed.
    #[error("cannot parse skin descriptor in {path}: {message}")]
    Descriptor { path: PathBuf, message: String },

    /// The skin requires a renderer version this build does not satisfy.
    #[error("Cannot use skin: has {range} prerequisite, but current is {current}")]
    Incompatible { range: String, current: String },

    /// The prerequisite is not a valid version range.
    #[error(transparent)]
    InvalidRange(#[from] VersionRangeError),
}

/// Result type for skin operations.
pub type Result<T> = std::result::Result<T, SkinError>;

/// Builds site rendering contexts bound to a skin, a template file or the
/// built-in template.
#[derive(Debug, Clone)]
pub struct SkinResolver {
    current_version: Option<String>,
}

impl Default for SkinResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SkinResolver {
    /// Resolver checking prerequisites against this renderer's version.
    pub fn new() -> Self {
        Self {
            current_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }
    }

    /// Resolver with an explicit renderer version; `None` skips the check.
    #[must_use]
    pub fn with_current_version(mut self, version: Option<impl Into<String>>) -> Self {
        self.current_version = version.map(Into::into);
        self
    }

    /// The renderer version prerequisites are checked against.
    pub fn current_version(&self) -> Option<&str> {
        self.current_version.as_deref()
    }

    /// Bind a skin archive.
    ///
    /// Uses the skin's own template when it has one and the built-in template
    /// otherwise. Fails when the skin's renderer prerequisite is not met.
    pub fn resolve_skin(
        &self,
        archive: &Path,
        attributes: BTreeMap<String, serde_json::Value>,
        decoration: Decoration,
        default_window_title: Option<String>,
        locale: &str,
    ) -> Result<SiteRenderingContext> {
        let file = File::open(archive).map_err(|source| SkinError::Io {
            path: archive.to_path_buf(),
            source,
        })?;
        let mut zip = zip::ZipArchive::new(file).map_err(|source| SkinError::Archive {
            path: archive.to_path_buf(),
            source,
        })?;

        let mut context =
            SiteRenderingContext::new(attributes, decoration, default_window_title, locale);
        context.skin_archive = Some(archive.to_path_buf());

        if zip.index_for_name(SKIN_TEMPLATE).is_some() {
            debug!(archive = %archive.display(), "using skin template");
            context.template_name = SKIN_TEMPLATE.to_string();
            context.template_source = TemplateSource::Archive(archive.to_path_buf());
            context.using_default_template = false;
        } else {
            info!(archive = %archive.display(), "skin has no template, using the default one");
            context.template_name = DEFAULT_TEMPLATE.to_string();
            context.template_source = TemplateSource::Builtin;
            context.using_default_template = true;
        }

        if let Some(descriptor) = read_descriptor(&mut zip, archive)? {
            self.check_prerequisites(&descriptor)?;
            context.skin = Some(descriptor);
        }

        Ok(context)
    }

    /// Bind a loose template file; no skin assets are copied.
    pub fn context_for_template(
        &self,
        template_file: &Path,
        attributes: BTreeMap<String, serde_json::Value>,
        decoration: Decoration,
        default_window_title: Option<String>,
        locale: &str,
    ) -> SiteRenderingContext {
        let mut context =
            SiteRenderingContext::new(attributes, decoration, default_window_title, locale);

        let parent = template_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        context.template_name = template_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        context.template_source = TemplateSource::Directory(parent);
        context.using_default_template = false;
        context
    }

    /// Bind the built-in template; built-in assets are copied.
    pub fn default_context(
        &self,
        attributes: BTreeMap<String, serde_json::Value>,
        decoration: Decoration,
        default_window_title: Option<String>,
        locale: &str,
    ) -> SiteRenderingContext {
        SiteRenderingContext::new(attributes, decoration, default_window_title, locale)
    }

    /// Check a descriptor's renderer range against the current version.
    pub fn check_prerequisites(&self, descriptor: &SkinDescriptor) -> Result<()> {
        let Some(spec) = descriptor.renderer_range() else {
            return Ok(());
        };
        let range = VersionRange::parse(spec)?;

        let Some(current) = self.current_version.as_deref() else {
            warn!(range = %range, "renderer version unknown, skipping skin prerequisite check");
            return Ok(());
        };

        if range.matches(&ArtifactVersion::new(current)) {
            debug!(range = %range, current, "skin prerequisite satisfied");
            Ok(())
        } else {
            Err(SkinError::Incompatible {
                range: range.to_string(),
                current: current.to_string(),
            })
        }
    }
}

fn read_descriptor(
    zip: &mut zip::ZipArchive<File>,
    archive: &Path,
) -> Result<Option<SkinDescriptor>> {
    let mut entry = match zip.by_name(SKIN_DESCRIPTOR) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(source) => {
            return Err(SkinError::Archive {
                path: archive.to_path_buf(),
                source,
            });
        }
    };

    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|source| SkinError::Io {
            path: archive.to_path_buf(),
            source,
        })?;

    SkinDescriptor::parse(&xml)
        .map(Some)
        .map_err(|e| SkinError::Descriptor {
            path: archive.to_path_buf(),
            message: e.to_string(),
        })
}
