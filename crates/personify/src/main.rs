//! Personify CLI - Build chat-bot personas from a photo.
//!
//! Personify runs an image through object detection and visual question
//! answering, fuses the extracted concepts into scored terms, matches them
//! against a persona catalog in sentence-embedding space, and selects a
//! diverse, mutually consistent set of persona sentences.
//!
//! # Usage
//!
//! ```bash
//! # Build personas from a photo
//! personify caption photo.jpg
//!
//! # Sample personas without a photo
//! personify caption --random
//!
//! # View configuration
//! personify config show
//!
//! # Manage models
//! personify models download
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Personify - Build chat-bot personas from a photo.
#[derive(Parser, Debug)]
#[command(name = "personify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a persona list from an image (or sample randomly)
    Caption(cli::caption::CaptionArgs),

    /// Manage models and data artifacts (download, list, etc.)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match personify_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `personify config path`."
            );
            personify_core::Config::default()
        }
    };
    logging::init(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Personify v{}", personify_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Caption(args) => cli::caption::execute(args).await,
        Commands::Models(args) => cli::models::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
