//! Document discovery.
//!
//! Walks every site root and every registered dialect module, binding each
//! source document to its output name. The result is ordered by discovery
//! (root, then module, then file name) and that order is the render order.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use glob::{MatchOptions, Pattern};
use indexmap::IndexMap;
use sitewright_core::{
    DocumentEntry, ModuleNotFound, ModuleRegistry, ParserModule, RenderingContext,
    SiteRenderingContext,
    context::{PRE_PASS_SUFFIX, ends_with_ignore_case},
};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Locator errors.
#[derive(Debug, Error)]
pub enum LocatorError {
    /// A module directory could not be walked.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Two documents would be written to the same output file.
    #[error("files '{}' and '{}' clash on output '{output_name}'", .first.display(), .second.display())]
    Conflict {
        output_name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// An extra module names a dialect nobody registered.
    #[error(transparent)]
    ModuleLookup(#[from] ModuleNotFound),

    /// A module exclude is not a valid glob.
    #[error("invalid exclude pattern '{pattern}': {message}")]
    InvalidExclude { pattern: String, message: String },
}

/// Result type for locator operations.
pub type Result<T> = std::result::Result<T, LocatorError>;

/// How output names differing only in case are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasePolicy {
    /// Distinct files; a warning is logged.
    Sensitive,
    /// The same file; the clash is an error.
    Insensitive,
}

impl CasePolicy {
    /// Policy of the host operating system family.
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::Insensitive
        } else {
            Self::Sensitive
        }
    }
}

impl Default for CasePolicy {
    fn default() -> Self {
        Self::host()
    }
}

/// Located documents keyed by output name, in render order.
#[derive(Debug, Clone, Default)]
pub struct DocumentMap {
    entries: IndexMap<String, DocumentEntry>,
}

impl DocumentMap {
    pub fn get(&self, output_name: &str) -> Option<&DocumentEntry> {
        self.entries.get(output_name)
    }

    pub fn contains(&self, output_name: &str) -> bool {
        self.entries.contains_key(output_name)
    }

    /// Output names in render order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in render order.
    pub fn values(&self) -> impl Iterator<Item = &DocumentEntry> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DocumentEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Version-control and editor files never treated as content or resources.
pub fn is_default_excluded(file_name: &str) -> bool {
    const NAMES: &[&str] = &[
        ".git",
        ".gitignore",
        ".gitattributes",
        ".gitmodules",
        ".svn",
        ".hg",
        ".hgignore",
        ".bzr",
        ".bzrignore",
        "CVS",
        ".cvsignore",
        "SCCS",
        "RCS",
        "_darcs",
        ".arch-ids",
        "{arch}",
        "vssver.scc",
        ".DS_Store",
    ];

    NAMES.contains(&file_name)
        || file_name.ends_with('~')
        || file_name.starts_with(".#")
        || file_name.starts_with("._")
        || (file_name.len() > 1 && file_name.starts_with('#') && file_name.ends_with('#'))
        || (file_name.len() > 1 && file_name.starts_with('%') && file_name.ends_with('%'))
}

/// Binds source documents to output names.
#[derive(Debug)]
pub struct DocumentLocator<'a> {
    modules: &'a ModuleRegistry,
    case_policy: CasePolicy,
}

impl<'a> DocumentLocator<'a> {
    /// Locator over `modules` using the host case policy.
    pub fn new(modules: &'a ModuleRegistry) -> Self {
        Self {
            modules,
            case_policy: CasePolicy::host(),
        }
    }

    #[must_use]
    pub fn with_case_policy(mut self, case_policy: CasePolicy) -> Self {
        self.case_policy = case_policy;
        self
    }

    /// Locate every document of the site.
    pub fn locate(&self, site: &SiteRenderingContext) -> Result<DocumentMap> {
        let mut state = LocateState::default();

        for root in &site.site_roots {
            if !root.is_dir() {
                debug!(root = %root.display(), "site root missing, skipping");
                continue;
            }

            for module in self.modules.modules() {
                let basedir = root.join(&module.source_dir);
                if module.extensions.is_empty() || !basedir.is_dir() {
                    continue;
                }
                self.add_module_files(&mut state, module, &basedir, site)?;
            }
        }

        for extra in &site.extra_modules {
            let module = self.modules.get_module(&extra.parser_id)?;
            if extra.basedir.is_dir() && !module.extensions.is_empty() {
                self.add_module_files(&mut state, module, &extra.basedir, site)?;
            }
        }

        info!(count = state.entries.len(), "located documents");
        Ok(DocumentMap {
            entries: state.entries,
        })
    }

    fn add_module_files(
        &self,
        state: &mut LocateState,
        module: &ParserModule,
        basedir: &Path,
        site: &SiteRenderingContext,
    ) -> Result<()> {
        let excludes = parse_excludes(site.module_excludes.get(&module.parser_id))?;
        let names = enumerate(basedir, &excludes)?;
        debug!(
            module = %module.parser_id,
            dir = %basedir.display(),
            files = names.len(),
            "scanning module"
        );

        for extension in &module.extensions {
            let plain = format!(".{extension}");
            let pre_pass = format!("{plain}{PRE_PASS_SUFFIX}");

            for name in names.iter().filter(|n| ends_with_ignore_case(n, &plain)) {
                self.add(state, RenderingContext::new(basedir, name.as_str(), &module.parser_id, extension))?;
            }
            for name in names.iter().filter(|n| ends_with_ignore_case(n, &pre_pass)) {
                self.add(state, RenderingContext::new(basedir, name.as_str(), &module.parser_id, extension))?;
            }
        }
        Ok(())
    }

    fn add(&self, state: &mut LocateState, context: RenderingContext) -> Result<()> {
        let key = context.output_name().to_string();

        if let Some(existing) = state.entries.get(&key) {
            return Err(LocatorError::Conflict {
                output_name: key,
                first: existing.context.source_path(),
                second: context.source_path(),
            });
        }

        let folded = key.to_lowercase();
        match state.folded.get(&folded) {
            Some(other) => {
                let first = state
                    .entries
                    .get(other)
                    .map(|e| e.context.source_path())
                    .unwrap_or_default();
                match self.case_policy {
                    CasePolicy::Insensitive => {
                        return Err(LocatorError::Conflict {
                            output_name: key,
                            first,
                            second: context.source_path(),
                        });
                    }
                    CasePolicy::Sensitive => warn!(
                        first = %first.display(),
                        second = %context.source_path().display(),
                        "output names differ only by case; they collide on case-insensitive file systems"
                    ),
                }
            }
            None => {
                state.folded.insert(folded, key.clone());
            }
        }

        state.entries.insert(key, DocumentEntry::new(context));
        Ok(())
    }
}

#[derive(Default)]
struct LocateState {
    entries: IndexMap<String, DocumentEntry>,
    folded: HashMap<String, String>,
}

fn parse_excludes(excludes: Option<&String>) -> Result<Vec<Pattern>> {
    excludes
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| {
                    Pattern::new(p).map_err(|e| LocatorError::InvalidExclude {
                        pattern: p.to_string(),
                        message: e.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_else(|| Ok(Vec::new()))
}

/// Relative names (with `/`) of all files under `basedir` whose file name
/// contains a dot, sorted by name, minus default and module excludes.
fn enumerate(basedir: &Path, excludes: &[Pattern]) -> Result<Vec<String>> {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut names = Vec::new();
    let walker = WalkDir::new(basedir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_default_excluded(&e.file_name().to_string_lossy()));

    for entry in walker {
        let entry = entry.map_err(|source| LocatorError::Io {
            path: basedir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() || !entry.file_name().to_string_lossy().contains('.') {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(basedir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if excludes.iter().any(|p| p.matches_with(&name, options)) {
            debug!(file = %name, "excluded");
            continue;
        }
        names.push(name);
    }
    Ok(names)
}
