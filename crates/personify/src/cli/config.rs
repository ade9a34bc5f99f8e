//! The `personify config` command.

use clap::{Args, Subcommand};
use personify_core::Config;
use std::path::Path;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the configuration and the artifact paths it resolves to
    Show,

    /// Show config file path
    Path,

    /// Write a default config file and create the model and data directories
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            println!("{}", config.to_toml()?);
            // The paths the pipeline will actually read, after ~ expansion.
            println!("# Resolved artifact paths:");
            println!("#   catalog:   {}", config.catalog_path().display());
            println!("#   questions: {}", config.questions_path().display());
            println!("#   synonyms:  {}", config.synonyms_dir().display());
            println!("#   models:    {}", config.model_dir().display());
        }

        ConfigCommand::Path => {
            println!("{}", Config::default_path().display());
        }

        ConfigCommand::Init { force } => {
            let path = Config::default_path();
            if path.exists() && !force {
                anyhow::bail!(
                    "Refusing to overwrite {} (pass --force to replace it)",
                    path.display()
                );
            }

            let config = Config::default();
            write_config(&path, &config)?;
            bootstrap_dirs(&config)?;

            println!("Wrote {}", path.display());
            println!(
                "Created {} and {}",
                config.model_dir().display(),
                config.data_dir().display()
            );
            println!("Next: `personify models download` to fetch models and data artifacts.");
        }
    }

    Ok(())
}

/// Write the config as TOML, creating parent directories as needed.
fn write_config(path: &Path, config: &Config) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, config.to_toml()?)?;
    Ok(())
}

/// Create the model and data directories so `models download` and the
/// synonym index have a place to land.
fn bootstrap_dirs(config: &Config) -> anyhow::Result<()> {
    std::fs::create_dir_all(config.model_dir())?;
    std::fs::create_dir_all(config.data_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_config_creates_parents_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.selection.output_count = 3;
        write_config(&path, &config).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.selection.output_count, 3);
    }

    #[test]
    fn test_bootstrap_dirs_creates_model_and_data_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.model_dir = dir.path().join("models");
        config.general.data_dir = dir.path().join("data");

        bootstrap_dirs(&config).unwrap();

        assert!(config.model_dir().is_dir());
        assert!(config.data_dir().is_dir());
    }
}
