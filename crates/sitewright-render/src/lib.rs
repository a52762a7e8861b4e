//! Sitewright Render Library
//!
//! Site rendering engine: turns the documents of a site into HTML pages
//! merged into a skin template.
//!
//! # Modules
//!
//! - [`locator`] - Document discovery and output naming
//! - [`gate`] - Incremental build decision
//! - [`renderer`] - Per-document parse and template merge
//! - [`context`] - Template variables for site, document and page
//! - [`template`] - Template loading and variable interpolation
//! - [`skin`] - Skin archive binding and prerequisite checks
//! - [`version`] - Version ordering and version ranges
//! - [`resources`] - Skin, built-in and site resource copying
//! - [`build`] - Build orchestration

pub mod build;
pub mod context;
pub mod gate;
pub mod locator;
pub mod renderer;
pub mod resources;
pub mod skin;
pub mod template;
pub mod version;

pub use build::{BuildError, BuildStats, DocumentFailure, SiteBuilder, site_context_from_config};
pub use context::ContextBuilder;
pub use locator::{CasePolicy, DocumentLocator, DocumentMap, LocatorError};
pub use renderer::{DocumentRenderer, RenderError};
pub use resources::{CopyStats, ResourceError, copy_resources};
pub use skin::{SkinDescriptor, SkinError, SkinResolver};
pub use template::{InterpolationEngine, Template, TemplateContext, TemplateEngine, TemplateError};
pub use version::{ArtifactVersion, VersionRange, VersionRangeError};
