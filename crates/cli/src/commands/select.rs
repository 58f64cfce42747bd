//! `docpack select`: run the full pipeline over a facts file.

use super::{load_config, read_input};
use docpack_config::SelectionStrategy;
use docpack_core::ProjectFacts;
use docpack_engine::Pipeline;
use std::path::{Path, PathBuf};

pub struct SelectArgs {
    pub facts: PathBuf,
    pub budget: Option<usize>,
    pub strategy: Option<SelectionStrategy>,
    pub output: Option<PathBuf>,
    pub timestamp: bool,
    pub no_compression: bool,
}

pub fn run(
    config_path: Option<&Path>,
    args: SelectArgs,
) -> docpack_core::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(budget) = args.budget {
        config.total_budget = budget;
    }
    if let Some(strategy) = args.strategy {
        config.selection.strategy = strategy;
    }
    if args.no_compression {
        config.selection.compression = false;
    }

    let raw = read_input(&args.facts)?;
    let facts = ProjectFacts::from_json(&raw)?;
    tracing::debug!(facts = %args.facts.display(), "Loaded project facts");

    let pipeline = Pipeline::from_config(&config);
    let stamp = args.timestamp.then(chrono::Utc::now);
    let document = pipeline.run_document(&facts, stamp)?;
    let json = document.to_json()?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))?;
            println!("📦 Selection written to {}", path.display());
            println!("   Selected: {}", document.selected.len());
            println!("   Dropped:  {}", document.dropped.len());
            println!(
                "   Tokens:   {} / {}",
                document.total_used(),
                document.budget.total_budget
            );
            for warning in &document.warnings {
                println!("   ⚠️  {warning}");
            }
        }
        None => println!("{json}"),
    }

    Ok(())
}
