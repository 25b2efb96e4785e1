//! Non-interactive auto-labeling

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::export::save_csv;

use super::{load_config, open_store};

/// Apply keyword rules and write the result. Returns the number labeled.
pub fn cmd_auto(config_path: Option<&Path>, input: &Path, output: &Path) -> Result<usize> {
    let config = load_config(config_path)?;
    let engine = config.rule_engine().context("Invalid keyword rule")?;
    let mut store = open_store(input)?;

    println!("📂 Loaded {} transactions from {}", store.len(), input.display());

    let labeled = engine.apply(&mut store)?;
    let remaining = store.len() - store.categorized_count();
    println!(
        "🏷️  Auto-labeled {} transactions ({} rules), {} uncategorized",
        labeled,
        engine.len(),
        remaining
    );

    save_csv(output, &store)?;
    println!("✅ Wrote {}", output.display());

    Ok(labeled)
}
