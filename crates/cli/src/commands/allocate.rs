//! `docpack allocate`: show how a total budget splits across categories.

use super::load_config;
use docpack_core::Category;
use docpack_engine::allocate;
use std::path::Path;

pub fn run(
    config_path: Option<&Path>,
    budget: Option<usize>,
) -> docpack_core::Result<()> {
    let config = load_config(config_path)?;
    let total = budget.unwrap_or(config.total_budget);
    let split = allocate(total, &config.allocation)?;

    println!("💰 Budget allocation ({total} tokens)");
    println!("─────────────────────────────────────");
    for category in Category::ALL {
        println!(
            "  {:<20} {:>6.2}%  {:>10}",
            category.as_str(),
            config.allocation.fraction(category) * 100.0,
            split.sub_budget(category)
        );
    }
    println!(
        "  {:<20} {:>6.2}%  {:>10}",
        "buffer",
        config.allocation.buffer * 100.0,
        split.buffer()
    );
    Ok(())
}
