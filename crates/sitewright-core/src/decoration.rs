//! Site decoration metadata.
//!
//! The decoration describes the site as a whole (project name, where the
//! publish date and version are shown, how dates are formatted). It is
//! supplied by the caller, usually from a `site.toml` next to the content,
//! and exposed to templates verbatim under the `decoration` key.

use std::{collections::BTreeMap, path::Path, time::SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Site-wide decoration metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Decoration {
    /// Project or site name, prepended to every page title.
    #[serde(default)]
    pub name: Option<String>,

    /// Publish date policy.
    #[serde(default)]
    pub publish_date: PublishDate,

    /// Where the project version is shown.
    #[serde(default)]
    pub version: VersionDisplay,

    /// Everything else (banners, links, menus) passed through to templates.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,

    /// Modification time of the file the decoration was read from.
    #[serde(skip)]
    pub last_modified: Option<SystemTime>,
}

/// Where and how the publish date is rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishDate {
    /// Position in the page chrome (`left`, `right`, `none`, ...).
    #[serde(default = "default_position")]
    pub position: String,

    /// Custom `strftime` pattern; the locale default applies when absent.
    #[serde(default)]
    pub format: Option<String>,
}

/// Where the project version is rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionDisplay {
    #[serde(default = "default_position")]
    pub position: String,
}

fn default_position() -> String {
    "left".to_string()
}

impl Default for PublishDate {
    fn default() -> Self {
        Self {
            position: default_position(),
            format: None,
        }
    }
}

impl Default for VersionDisplay {
    fn default() -> Self {
        Self {
            position: default_position(),
        }
    }
}

impl Decoration {
    /// Decoration with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Load decoration metadata from a TOML file, recording its mtime.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut decoration: Decoration = toml::from_str(&content)
            .map_err(|e| CoreError::decoration(path, e.to_string()))?;
        decoration.last_modified = std::fs::metadata(path)?.modified().ok();
        Ok(decoration)
    }

    /// The custom date pattern, if one is configured and non-blank.
    #[must_use]
    pub fn date_format(&self) -> Option<&str> {
        self.publish_date
            .format
            .as_deref()
            .filter(|f| !f.trim().is_empty())
    }
}
