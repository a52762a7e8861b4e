//! Locate command - list documents and their outputs

use std::{io::Write, path::Path};

use color_eyre::eyre::{Result, WrapErr};
use sitewright_core::Config;
use sitewright_render::{DocumentMap, SiteBuilder, SkinResolver, site_context_from_config};

/// Run the locate command.
///
/// Prints every document in render order as `output <- source`.
pub fn run(config_path: &Path) -> Result<()> {
    let config = Config::load_with_env(config_path).wrap_err("Failed to load configuration")?;
    let site = site_context_from_config(&config, &SkinResolver::new())
        .wrap_err("Failed to prepare the site")?;

    let documents = SiteBuilder::default()
        .locator()
        .locate(&site)
        .wrap_err("Document discovery failed")?;
    tracing::info!(count = documents.len(), "Located documents");

    let stdout = std::io::stdout();
    print_documents(&documents, &mut stdout.lock())?;
    Ok(())
}

/// Write one `output <- source` line per document.
pub fn print_documents(documents: &DocumentMap, out: &mut impl Write) -> std::io::Result<()> {
    let width = documents.keys().map(str::len).max().unwrap_or(0);
    for (output_name, entry) in documents.iter() {
        let marker = if entry.context.flags().needs_template_pre_pass {
            " (pre-pass)"
        } else {
            ""
        };
        writeln!(
            out,
            "{output_name:<width$} <- {}{marker}",
            entry.context.source_path().display()
        )?;
    }
    Ok(())
}
