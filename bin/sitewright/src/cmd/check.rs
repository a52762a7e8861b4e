//! Check command - validate configuration, skin and documents

use std::{collections::HashMap, path::Path};

use color_eyre::eyre::{Result, bail};
use sitewright_core::{Config, SiteRenderingContext};
use sitewright_render::{ContextBuilder, DocumentMap, SiteBuilder, SkinResolver, site_context_from_config};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Run the check command.
///
/// Validates the configuration, the skin and every document of the site.
pub fn run(config_path: &Path, strict: bool) -> Result<()> {
    tracing::info!(?config_path, strict, "Checking configuration and documents");

    let result = check_site(config_path);

    // Print summary
    println!();
    println!("Summary:");
    println!("  Errors:   {}", result.errors.len());
    println!("  Warnings: {}", result.warnings.len());

    if result.has_errors() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  ✗ {err}");
        }
    }

    if result.has_warnings() {
        println!();
        println!("Warnings:");
        for warn in &result.warnings {
            println!("  ⚠ {warn}");
        }
    }

    // Determine exit status
    if result.has_errors() {
        bail!("Validation failed with {} error(s)", result.errors.len());
    }

    if strict && result.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            result.warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

/// Run every check without printing the summary.
pub fn check_site(config_path: &Path) -> ValidationResult {
    let mut result = ValidationResult::default();

    println!("Checking configuration...");
    let config = match Config::load_with_env(config_path) {
        Ok(c) => {
            println!("  ✓ Configuration valid");
            c
        }
        Err(e) => {
            result.add_error(format!("Configuration error: {e}"));
            println!("  ✗ Configuration invalid: {e}");
            return result;
        }
    };

    println!("\nChecking site roots...");
    check_roots(&config, &mut result);

    println!("\nChecking skin...");
    let site = match site_context_from_config(&config, &SkinResolver::new()) {
        Ok(site) => {
            println!("  ✓ Skin usable");
            site
        }
        Err(e) => {
            result.add_error(format!("Skin error: {e}"));
            println!("  ✗ Skin unusable: {e}");
            return result;
        }
    };

    println!("\nChecking documents...");
    let builder = SiteBuilder::default();
    match builder.locator().locate(&site) {
        Ok(documents) => {
            check_case_clashes(&documents, &mut result);
            check_documents(&builder, &documents, &site, &mut result);
        }
        Err(e) => {
            result.add_error(format!("Document discovery failed: {e}"));
            println!("  ✗ Document discovery failed");
        }
    }

    let output = config.resolve(&config.build.output_dir);
    if output.exists() && !output.is_dir() {
        result.add_error(format!(
            "Output path exists but is not a directory: {}",
            output.display()
        ));
    }

    result
}

/// Check that the configured site roots exist.
fn check_roots(config: &Config, result: &mut ValidationResult) {
    for root in config.site_roots() {
        if root.is_dir() {
            println!("  ✓ {} exists", root.display());
        } else {
            result.add_warning(format!("Site root missing: {}", root.display()));
            println!("  ⚠ {} missing", root.display());
        }
    }
}

/// Report output names that only differ in case.
fn check_case_clashes(documents: &DocumentMap, result: &mut ValidationResult) {
    let mut folded: HashMap<String, &str> = HashMap::new();
    for name in documents.keys() {
        if let Some(other) = folded.insert(name.to_lowercase(), name) {
            result.add_warning(format!(
                "Outputs '{other}' and '{name}' differ only in case"
            ));
        }
    }
}

/// Parse every document, reporting failures.
fn check_documents(
    builder: &SiteBuilder,
    documents: &DocumentMap,
    site: &SiteRenderingContext,
    result: &mut ValidationResult,
) {
    let contexts = ContextBuilder::new(site);
    let mut failed = 0;

    for entry in documents.values() {
        if let Err(e) = builder
            .renderer()
            .parse_document(&entry.context, site, &contexts)
        {
            result.add_error(e.to_string());
            failed += 1;
        }
    }

    if failed == 0 {
        println!("  ✓ All {} documents valid", documents.len());
    } else {
        println!("  ✗ {failed}/{} documents have errors", documents.len());
    }
}
