//! Sitewright CLI Library
//!
//! This library provides the command implementations for the sitewright
//! binary. It is used by the binary entry point while also exposing public
//! APIs for documentation and integration purposes.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, check, locate)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use sitewright::cmd;
//!
//! // Render the site described by sitewright.toml
//! cmd::build::run(Path::new("sitewright.toml"), None, false).unwrap();
//! ```

pub mod cmd;

// Re-export core types for convenience
pub use sitewright_core::Config;
pub use sitewright_render::{BuildStats, SiteBuilder, SkinResolver};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
///
/// # Example
///
/// ```no_run
/// sitewright::init_tracing(2); // Enable DEBUG level logging
/// ```
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
