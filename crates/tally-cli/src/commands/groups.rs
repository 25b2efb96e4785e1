//! Group listing command

use std::path::Path;

use anyhow::{Context, Result};

use super::{load_config, open_store, truncate};

pub fn cmd_groups(config_path: Option<&Path>, input: &Path, all: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = config.rule_engine().context("Invalid keyword rule")?;
    let mut store = open_store(input)?;
    engine.apply(&mut store)?;

    let min_size = if all {
        1
    } else {
        config.grouping.min_group_size.max(1)
    };
    let groups = config.grouping.grouper().group(&store);
    let shown: Vec<_> = groups.iter().filter(|g| g.len() >= min_size).collect();

    if shown.is_empty() {
        println!("No uncategorized groups. Everything matched a rule.");
        return Ok(());
    }

    println!();
    println!("🧺 Uncategorized Groups");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:>4} │ {:>5} │ {:25} │ {}", "#", "Count", "Key", "Example");
    println!("   ─────┼───────┼───────────────────────────┼─────────────────");

    for (i, group) in shown.iter().enumerate() {
        let example = group
            .members
            .first()
            .and_then(|&id| store.get(id))
            .map(|r| r.description.as_str())
            .unwrap_or("");
        println!(
            "   {:>4} │ {:>5} │ {:25} │ {}",
            i + 1,
            group.len(),
            truncate(&group.key, 25),
            truncate(example, 30)
        );
    }

    let hidden = groups.len() - shown.len();
    println!();
    println!(
        "   {} groups, {} transactions",
        shown.len(),
        shown.iter().map(|g| g.len()).sum::<usize>()
    );
    if hidden > 0 {
        println!(
            "   {} smaller groups hidden (min_group_size = {}, use --all)",
            hidden, min_size
        );
    }

    Ok(())
}
