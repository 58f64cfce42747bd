//! `docpack config`: Configuration management commands.

use super::load_config;
use docpack_config::AppConfig;
use docpack_core::Category;
use docpack_engine::allocate;
use std::path::Path;

pub fn default_toml() -> docpack_core::Result<()> {
    print!("{}", AppConfig::default_toml());
    Ok(())
}

pub fn show(config_path: Option<&Path>) -> docpack_core::Result<()> {
    let config = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config).map_err(|e| docpack_core::Error::Config {
        message: e.to_string(),
    })?;
    println!("{toml_str}");
    Ok(())
}

pub fn path(config_path: Option<&Path>) -> docpack_core::Result<()> {
    match config_path {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", AppConfig::config_dir().join("config.toml").display()),
    }
    Ok(())
}

pub fn validate(config_path: Option<&Path>) -> docpack_core::Result<()> {
    println!("🔍 Validating configuration...");

    let config = match load_config(config_path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");
            config
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };

    match allocate(config.total_budget, &config.allocation) {
        Ok(budget) => {
            println!("   ✅ Budget percentages sum to 1.0");
            println!();
            println!("   Total budget: {}", budget.total_budget());
            for category in Category::ALL {
                println!("   {:<18} {}", category.as_str(), budget.sub_budget(category));
            }
            println!("   {:<18} {}", "buffer", budget.buffer());
        }
        Err(e) => {
            println!("   ❌ {e}");
            return Err(e.into());
        }
    }

    println!("   Strategy:     {}", config.selection.strategy);
    println!(
        "   Compression:  {}",
        if config.selection.compression { "on" } else { "off" }
    );
    match &config.tokenizer.path {
        Some(path) => println!("   Tokenizer:    {}", path.display()),
        None => println!("   Tokenizer:    heuristic"),
    }
    Ok(())
}
