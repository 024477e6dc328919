//! inkpress CLI - directive-driven markdown publishing.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

use commands::settings::Settings;

#[derive(Parser)]
#[command(name = "inkpress")]
#[command(about = "Directive-driven markdown publishing with static snapshots")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to inkpress.toml settings file
    #[arg(short, long, default_value = "inkpress.toml")]
    settings: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the directive file and print the configurations as JSON
    Check,

    /// Run one generation pass for every configuration
    Build {
        /// Regenerate even if sources are unchanged
        #[arg(short, long)]
        force: bool,
    },

    /// Render a single document to stdout
    Render {
        /// Request path of the document (e.g. /blog/first_post.md)
        path: String,
    },

    /// Generate every configuration, then keep regenerating until Ctrl-C
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load(&cli.settings)?;

    match cli.command {
        Commands::Check => {
            commands::check::run(&settings)?;
        }
        Commands::Build { force } => {
            commands::build::run(&settings, force).await?;
        }
        Commands::Render { path } => {
            commands::render::run(&settings, &path)?;
        }
        Commands::Run => {
            commands::run::run(&settings).await?;
        }
    }

    Ok(())
}
