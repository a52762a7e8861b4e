//! Site configuration management.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    encoding,
    error::{CoreError, Result},
};

/// Main configuration structure, read from `sitewright.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Content and rendering settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Skin or template selection.
    #[serde(default)]
    pub skin: SkinConfig,

    /// Dialect module tuning.
    #[serde(default)]
    pub modules: ModulesConfig,

    /// Template properties exposed verbatim to every template.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,

    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

/// Content and rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Content roots, highest priority first.
    #[serde(default = "default_roots")]
    pub roots: Vec<PathBuf>,

    /// Main locale.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Every locale the site is published in.
    #[serde(default)]
    pub locales: Vec<String>,

    #[serde(default = "default_encoding")]
    pub input_encoding: String,

    #[serde(default = "default_encoding")]
    pub output_encoding: String,

    /// Validate XML documents before parsing them.
    #[serde(default)]
    pub validate: bool,

    /// Decoration metadata file (TOML).
    #[serde(default)]
    pub decoration: Option<PathBuf>,

    /// Title prefix used when the decoration has no name.
    #[serde(default)]
    pub default_window_title: Option<String>,

    /// Where template pre-pass results are written for inspection.
    #[serde(default)]
    pub processed_markup_dir: Option<PathBuf>,

    /// Fixed publish date (RFC 3339) for reproducible output.
    #[serde(default)]
    pub publish_date: Option<String>,
}

/// Skin or loose template selection. At most one may be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkinConfig {
    /// Packaged skin archive.
    #[serde(default)]
    pub archive: Option<PathBuf>,

    /// Loose template file.
    #[serde(default)]
    pub template: Option<PathBuf>,
}

/// Dialect module tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModulesConfig {
    /// Comma-separated exclude globs per dialect id.
    #[serde(default)]
    pub excludes: BTreeMap<String, String>,

    /// Flat-layout directories bound to a dialect.
    #[serde(default)]
    pub extra: Vec<ExtraModuleConfig>,
}

/// A directory of documents in one dialect, outside `<root>/<dialect>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraModuleConfig {
    pub dialect: String,
    pub dir: PathBuf,
}

/// Build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Output directory for the generated site.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Render every document even if its output is up to date.
    #[serde(default)]
    pub overwrite: bool,

    /// Render documents in parallel.
    #[serde(default)]
    pub parallel: bool,
}

// Default value functions
fn default_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("src/site")]
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("target/site")
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            locale: default_locale(),
            locales: Vec::new(),
            input_encoding: default_encoding(),
            output_encoding: default_encoding(),
            validate: false,
            decoration: None,
            default_window_title: None,
            processed_markup_dir: None,
            publish_date: None,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            overwrite: false,
            parallel: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            skin: SkinConfig::default(),
            modules: ModulesConfig::default(),
            properties: BTreeMap::new(),
            build: BuildConfig::default(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.base_dir = base_dir_of(path);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, letting `SITEWRIGHT__SECTION__KEY` variables override the file.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("SITEWRIGHT").separator("__"))
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.base_dir = base_dir_of(path);
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.site.roots.is_empty() {
            return Err(CoreError::config("site.roots cannot be empty"));
        }

        if self.site.locale.trim().is_empty() {
            return Err(CoreError::config("site.locale cannot be empty"));
        }

        for label in [&self.site.input_encoding, &self.site.output_encoding] {
            encoding::lookup(label).map_err(|e| CoreError::config_with_source(
                format!("unknown encoding '{label}'"),
                e,
            ))?;
        }

        if self.skin.archive.is_some() && self.skin.template.is_some() {
            return Err(CoreError::config(
                "skin.archive and skin.template are mutually exclusive",
            ));
        }

        self.publish_date()?;

        if self.build.output_dir.as_os_str().is_empty() {
            tracing::warn!("build.output_dir is empty, rendering into the config directory");
        }

        Ok(())
    }

    /// Resolve a configured path against the config file's directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Configured site roots, resolved.
    pub fn site_roots(&self) -> Vec<PathBuf> {
        self.site.roots.iter().map(|r| self.resolve(r)).collect()
    }

    /// Fixed publish date, if configured.
    pub fn publish_date(&self) -> Result<Option<DateTime<Utc>>> {
        self.site
            .publish_date
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|e| {
                        CoreError::config_with_source(
                            format!("site.publish_date is not RFC 3339: {raw}"),
                            e,
                        )
                    })
            })
            .transpose()
    }
}

fn base_dir_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
