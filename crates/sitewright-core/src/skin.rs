//! Skin descriptor (`META-INF/skin/skin.xml`).

use serde::{Deserialize, Serialize};

/// Parsed `skin.xml`, kept on the site context once a skin is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinDescriptor {
    #[serde(default)]
    pub prerequisites: Prerequisites,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisites {
    /// Version range of the renderer the skin works with.
    #[serde(default)]
    pub renderer: Option<String>,
}

impl SkinDescriptor {
    /// Parse a descriptor document.
    pub fn parse(xml: &str) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_str(xml)
    }

    /// The renderer range, if present and not blank.
    pub fn renderer_range(&self) -> Option<&str> {
        self.prerequisites
            .renderer
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}
