//! Sitewright CLI
//!
//! Renders documentation sites from markup sources and a skin.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for sitewright.
#[derive(Parser)]
#[command(
    name = "sitewright",
    version,
    about = "Render a documentation site from markup sources and a skin"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sitewright.toml")]
    config: std::path::PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Render the site
    Build {
        /// Output directory (defaults to build.output_dir)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
        /// Render every document, even when its output is up to date
        #[arg(long)]
        overwrite: bool,
    },
    /// Validate configuration, skin and documents
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
    /// List documents and their output files
    Locate,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    sitewright::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { output, overwrite } => {
            sitewright::cmd::build::run(&cli.config, output.as_deref(), overwrite)?;
        }
        Commands::Check { strict } => {
            sitewright::cmd::check::run(&cli.config, strict)?;
        }
        Commands::Locate => {
            sitewright::cmd::locate::run(&cli.config)?;
        }
    }

    Ok(())
}
