//! Incremental build decision.
//!
//! Purely timestamp based: a clock that runs backwards between builds can
//! cause a stale page to be kept.

use std::{fs, path::Path, time::SystemTime};

use sitewright_core::{DocumentEntry, SiteRenderingContext};
use tracing::trace;

/// Whether `entry` must be rendered to `output_file`.
///
/// True when the entry is forced, the output is missing or unreadable, or the
/// source or the decoration changed after the output was written.
pub fn should_render(entry: &DocumentEntry, site: &SiteRenderingContext, output_file: &Path) -> bool {
    if entry.overwrite {
        return true;
    }

    let Some(output_time) = modified(output_file) else {
        trace!(output = %output_file.display(), "output missing");
        return true;
    };

    let source = entry.context.source_path();
    match modified(&source) {
        Some(source_time) if source_time > output_time => {
            trace!(source = %source.display(), "source newer than output");
            return true;
        }
        Some(_) => {}
        None => return true,
    }

    if site
        .decoration
        .last_modified
        .is_some_and(|decoration_time| decoration_time > output_time)
    {
        trace!(output = %output_file.display(), "decoration newer than output");
        return true;
    }

    false
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
