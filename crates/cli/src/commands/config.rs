//! Configuration file commands

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use pagectl_runner::SuiteConfig;

use crate::output::{print_json, print_success, print_yaml, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,
}

pub fn execute(cmd: ConfigCommands, path: &Path, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            SuiteConfig::default()
                .save(path)
                .with_context(|| format!("writing {}", path.display()))?;
            print_success(&format!("Configuration written to {}", path.display()));
        }

        ConfigCommands::Show => {
            let config = SuiteConfig::load(path)?;
            match format {
                OutputFormat::Json => print_json(&config),
                OutputFormat::Yaml => print_yaml(&config),
                OutputFormat::Table | OutputFormat::Plain => {
                    print!("{}", toml::to_string_pretty(&config)?);
                }
            }
        }
    }

    Ok(())
}
