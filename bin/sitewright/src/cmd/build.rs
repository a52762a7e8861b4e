//! Build command - renders the site

use std::{path::Path, time::Instant};

use color_eyre::eyre::{Result, WrapErr, bail};
use sitewright_core::Config;
use sitewright_render::{SiteBuilder, SkinResolver, site_context_from_config};

/// Run the build command.
///
/// Renders every stale document of the site into the output directory and
/// copies the site resources next to them.
pub fn run(config_path: &Path, output: Option<&Path>, overwrite: bool) -> Result<()> {
    let start = Instant::now();
    tracing::info!(?config_path, ?output, overwrite, "Starting build");

    let config = Config::load_with_env(config_path).wrap_err("Failed to load configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    let output_dir = match output {
        Some(dir) => dir.to_path_buf(),
        None => config.resolve(&config.build.output_dir),
    };

    let site = site_context_from_config(&config, &SkinResolver::new())
        .wrap_err("Failed to prepare the site")?;

    let builder = SiteBuilder::default()
        .with_parallel(config.build.parallel)
        .with_overwrite(overwrite || config.build.overwrite);
    let stats = builder.build(&site, &output_dir).wrap_err("Build failed")?;

    let duration = start.elapsed();

    // Print build statistics
    println!();
    println!("  Documents:  {}", stats.documents);
    println!("  Rendered:   {}", stats.rendered);
    println!("  Up to date: {}", stats.skipped);
    if stats.external > 0 {
        println!("  External:   {}", stats.external);
    }
    println!(
        "  Resources:  {} copied, {} kept",
        stats.resources.copied, stats.resources.skipped
    );
    println!();
    println!("  Duration:   {:.2}s", duration.as_secs_f64());
    println!("  Output:     {}", output_dir.display());
    println!();

    if !stats.is_success() {
        println!("  Failed documents:");
        for failure in &stats.failures {
            println!("  ✗ {}: {}", failure.output_name, failure.error);
        }
        println!();
        bail!("{} document(s) failed to render", stats.failures.len());
    }

    println!("  Build completed successfully!");
    tracing::info!(?duration, "Build completed successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_build_command_renders_site() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("sitewright.toml");
        fs::write(&config, "[site]\nroots = [\"src/site\"]\n").unwrap();
        fs::create_dir_all(temp.path().join("src/site/markdown")).unwrap();
        fs::write(temp.path().join("src/site/markdown/index.md"), "# Home").unwrap();

        run(&config, None, false).unwrap();

        let index = temp.path().join("target/site/index.html");
        assert!(index.is_file());
        assert!(fs::read_to_string(index).unwrap().contains("<title>Home</title>"));
    }

    #[test]
    fn test_build_command_fails_on_broken_document() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("sitewright.toml");
        fs::write(&config, "[site]\nroots = [\".\"]\n").unwrap();
        fs::create_dir_all(temp.path().join("xdoc")).unwrap();
        fs::write(temp.path().join("xdoc/bad.xml"), "<document><p></b></document>").unwrap();

        let out = temp.path().join("out");
        let err = run(&config, Some(&out), true).unwrap_err();
        assert!(err.to_string().contains("1 document(s) failed"));
    }
}
