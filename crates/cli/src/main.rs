//! pagectl - Main Entry Point
//!
//! Runs the CMS page administration scenarios in a real browser and reports
//! the results.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use pagectl_cli::commands::{self, config::ConfigCommands, run::RunArgs, Selection};
use pagectl_cli::output::{self, print_error};
use pagectl_runner::{E2eError, SuiteConfig};

/// Exit status when the configuration or the environment is unusable
const EXIT_SETUP: u8 = 2;

/// pagectl - CMS page administration scenarios
#[derive(Parser)]
#[command(name = "pagectl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, env = "PAGECTL_CONFIG", default_value = "pagectl.toml", global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the suite against the configured CMS
    Run(RunArgs),

    /// List scenarios
    List {
        /// Directory of additional YAML scenarios
        #[arg(long)]
        specs: Option<PathBuf>,

        /// Only scenarios with this tag
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Show the steps of a scenario
    Show {
        /// Scenario name
        name: String,

        /// Directory of additional YAML scenarios
        #[arg(long)]
        specs: Option<PathBuf>,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match dispatch(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            match e.downcast_ref::<E2eError>().and_then(E2eError::kind) {
                Some(kind) => print_error(&format!("{}: {:#}", kind, e)),
                None => print_error(&format!("{:#}", e)),
            }
            ExitCode::from(EXIT_SETUP)
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run(args) => {
            let mut config = SuiteConfig::load(&cli.config)?;
            args.apply(&mut config)?;
            commands::run::execute(args, config, cli.format).await
        }
        Commands::List { specs, tag } => {
            let config = SuiteConfig::load(&cli.config)?;
            let selection = Selection { specs, tag, include_disabled: false };
            commands::scenarios::list(&config, &selection, cli.format)?;
            Ok(true)
        }
        Commands::Show { name, specs } => {
            let config = SuiteConfig::load(&cli.config)?;
            let selection = Selection { specs, ..Default::default() };
            commands::scenarios::show(&config, &selection, &name, cli.format)?;
            Ok(true)
        }
        Commands::Config(cmd) => {
            commands::config::execute(cmd, &cli.config, cli.format)?;
            Ok(true)
        }
    }
}
