//! `docpack count` and `docpack compress`: token tools for single files.

use super::{load_config, read_input};
use docpack_core::ContentKind;
use docpack_engine::Pipeline;
use std::path::Path;

pub fn count(
    config_path: Option<&Path>,
    file: &Path,
    kind: ContentKind,
) -> docpack_core::Result<()> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config);
    let content = read_input(file)?;
    let tokens = pipeline.counter().count(&content, kind);
    println!("{tokens}");
    Ok(())
}

pub fn compress(
    config_path: Option<&Path>,
    file: &Path,
    max_tokens: usize,
    kind: ContentKind,
) -> docpack_core::Result<()> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config);
    let content = read_input(file)?;

    let before = pipeline.counter().count(&content, kind);
    let compressed = pipeline.compressor().compress(&content, max_tokens, kind);
    let after = pipeline.counter().count(&compressed, kind);
    tracing::info!(%kind, before, after, max_tokens, "Compressed");

    println!("{compressed}");
    Ok(())
}
