//! Resource copying.
//!
//! Populates the output directory with each site root's `resources/`
//! directory, the skin assets and the built-in assets of the default
//! template, in that order. Files already present in the output are never
//! replaced, so a site's own asset shadows the skin's and user output
//! survives repeated builds.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use include_dir::{Dir, include_dir};
use sitewright_core::SiteRenderingContext;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::locator::is_default_excluded;

/// Assets and the default template compiled into the renderer.
pub static BUILTIN_RESOURCES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/resources");

/// Manifest of built-in assets copied with the default template.
pub const RESOURCE_MANIFEST: &str = "resources.txt";

/// Stylesheet every site is guaranteed to have.
pub const SITE_CSS: &str = "css/site.css";

const SITE_CSS_PLACEHOLDER: &str = "/* You can override this file with your own styles */";

/// Resource copy errors.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// IO error.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The skin archive could not be read.
    #[error("cannot read skin archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// A site resource directory could not be walked.
    #[error("cannot read {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// The manifest lists an asset the bundle does not contain.
    #[error("built-in resource not found: {0}")]
    MissingBuiltin(String),
}

/// Result type for resource operations.
pub type Result<T> = std::result::Result<T, ResourceError>;

/// What a copy pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Files written.
    pub copied: usize,
    /// Files left alone because the destination existed.
    pub skipped: usize,
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ResourceError + '_ {
    move |source| ResourceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Create `dest` with `write` unless it already exists.
fn copy_new(
    dest: &Path,
    stats: &mut CopyStats,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let mut file = match File::create_new(dest) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            stats.skipped += 1;
            return Ok(());
        }
        Err(e) => return Err(io_error(dest)(e)),
    };
    write(&mut file).map_err(io_error(dest))?;
    stats.copied += 1;
    Ok(())
}

/// Copy every resource the site needs into `output_dir`.
pub fn copy_resources(site: &SiteRenderingContext, output_dir: &Path) -> Result<CopyStats> {
    let mut stats = CopyStats::default();

    // First writer wins: site resources, then the skin, then the bundle.
    for root in &site.site_roots {
        let resources = root.join("resources");
        if resources.is_dir() {
            copy_tree(&resources, output_dir, &mut stats)?;
        }
    }

    if let Some(archive) = &site.skin_archive {
        copy_skin(archive, output_dir, &mut stats)?;
    }

    if site.using_default_template {
        copy_bundle(&BUILTIN_RESOURCES, output_dir, &mut stats)?;
    }

    ensure_site_css(output_dir, &mut stats)?;

    info!(
        copied = stats.copied,
        skipped = stats.skipped,
        "resources copied"
    );
    Ok(stats)
}

/// Copy all skin entries outside `META-INF/`.
fn copy_skin(archive: &Path, output_dir: &Path, stats: &mut CopyStats) -> Result<()> {
    let zip_error = |source| ResourceError::Archive {
        path: archive.to_path_buf(),
        source,
    };

    let file = File::open(archive).map_err(io_error(archive))?;
    let mut zip = zip::ZipArchive::new(file).map_err(zip_error)?;
    debug!(archive = %archive.display(), entries = zip.len(), "copying skin resources");

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(zip_error)?;
        if entry.name().starts_with("META-INF/") {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping skin entry with unsafe path");
            continue;
        };

        let dest = output_dir.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&dest).map_err(io_error(&dest))?;
        } else {
            copy_new(&dest, stats, |out| io::copy(&mut entry, out).map(|_| ()))?;
        }
    }
    Ok(())
}

/// Copy the assets listed in a bundle's manifest.
fn copy_bundle(bundle: &Dir<'_>, output_dir: &Path, stats: &mut CopyStats) -> Result<()> {
    let manifest = bundle
        .get_file(RESOURCE_MANIFEST)
        .and_then(|f| f.contents_utf8())
        .ok_or_else(|| ResourceError::MissingBuiltin(RESOURCE_MANIFEST.to_string()))?;

    for line in manifest.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let asset = bundle
            .get_file(line)
            .ok_or_else(|| ResourceError::MissingBuiltin(line.to_string()))?;
        copy_new(&output_dir.join(line), stats, |out| out.write_all(asset.contents()))?;
    }
    Ok(())
}

/// Recursively copy a directory, skipping VCS and editor files.
fn copy_tree(source_dir: &Path, output_dir: &Path, stats: &mut CopyStats) -> Result<()> {
    debug!(source = %source_dir.display(), "copying site resources");

    let walker = WalkDir::new(source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_default_excluded(&e.file_name().to_string_lossy()));

    for entry in walker {
        let entry = entry.map_err(|source| ResourceError::Walk {
            path: source_dir.to_path_buf(),
            source,
        })?;
        let Ok(relative) = entry.path().strip_prefix(source_dir) else {
            continue;
        };
        let dest = output_dir.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(io_error(&dest))?;
        } else if entry.file_type().is_file() {
            let mut input = File::open(entry.path()).map_err(io_error(entry.path()))?;
            copy_new(&dest, stats, |out| io::copy(&mut input, out).map(|_| ()))?;
        }
    }
    Ok(())
}

fn ensure_site_css(output_dir: &Path, stats: &mut CopyStats) -> Result<()> {
    let site_css = output_dir.join(SITE_CSS);
    if site_css.exists() {
        return Ok(());
    }
    copy_new(&site_css, stats, |out| out.write_all(SITE_CSS_PLACEHOLDER.as_bytes()))
}
