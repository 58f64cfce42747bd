//! docpack CLI entry point.
//!
//! Commands:
//! - `select`   Score and select facts into a budgeted document
//! - `allocate` Show how a budget splits across categories
//! - `count`    Estimate the tokens in a file
//! - `compress` Shrink a file to a token ceiling
//! - `config`   Show, locate or validate configuration

use clap::{Parser, Subcommand};
use docpack_config::SelectionStrategy;
use docpack_core::ContentKind;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "docpack",
    about = "Fit extracted project facts into a token budget",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.docpack/config.toml)
    #[arg(short, long, global = true, env = "DOCPACK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Select content from an extractor facts file
    Select {
        /// Facts JSON produced by the structural extractor
        #[arg(short, long)]
        facts: PathBuf,

        /// Override the total token budget
        #[arg(short, long)]
        budget: Option<usize>,

        /// Selection strategy: efficiency_ranked or whole_module
        #[arg(short, long)]
        strategy: Option<SelectionStrategy>,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stamp the document with the current time
        #[arg(long)]
        timestamp: bool,

        /// Drop items that do not fit instead of compressing them
        #[arg(long)]
        no_compression: bool,
    },

    /// Show the category split of a budget
    Allocate {
        /// Override the total token budget
        #[arg(short, long)]
        budget: Option<usize>,
    },

    /// Estimate the tokens in a file
    Count {
        file: PathBuf,

        /// code, documentation, structured or text
        #[arg(short, long, default_value = "text")]
        kind: ContentKind,
    },

    /// Compress a file to a token ceiling
    Compress {
        file: PathBuf,

        #[arg(short, long)]
        max_tokens: usize,

        /// code, documentation, structured or text
        #[arg(short, long, default_value = "text")]
        kind: ContentKind,
    },

    /// Configuration commands (prints the default TOML without a subcommand)
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Validate the configuration and the budget split
    Validate,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Select {
            facts,
            budget,
            strategy,
            output,
            timestamp,
            no_compression,
        } => commands::select::run(
            config,
            commands::select::SelectArgs {
                facts,
                budget,
                strategy,
                output,
                timestamp,
                no_compression,
            },
        )?,
        Commands::Allocate { budget } => commands::allocate::run(config, budget)?,
        Commands::Count { file, kind } => commands::text::count(config, &file, kind)?,
        Commands::Compress {
            file,
            max_tokens,
            kind,
        } => commands::text::compress(config, &file, max_tokens, kind)?,
        Commands::Config { action } => match action {
            None => commands::config_cmd::default_toml()?,
            Some(ConfigAction::Show) => commands::config_cmd::show(config)?,
            Some(ConfigAction::Path) => commands::config_cmd::path(config)?,
            Some(ConfigAction::Validate) => commands::config_cmd::validate(config)?,
        },
    }

    Ok(())
}
