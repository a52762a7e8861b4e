//! sitewright core library
//!
//! Configuration, error handling, decoration metadata, the dialect module
//! registry, the skin descriptor and the rendering contexts shared by the parser and renderer
//! crates.

pub mod config;
pub mod context;
pub mod decoration;
pub mod encoding;
pub mod error;
pub mod module;
pub mod skin;

pub use config::Config;
pub use context::{
    DocumentEntry, DocumentFlags, ExtraModule, RenderingContext, SiteRenderingContext,
    TemplateSource,
};
pub use decoration::Decoration;
pub use error::{CoreError, Result};
pub use module::{ContentType, ModuleNotFound, ModuleRegistry, ParserModule};
pub use skin::SkinDescriptor;
