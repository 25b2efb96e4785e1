//! Keyword rule management commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_core::config::{writable_config_path, LegacyDatabase};
use tally_core::models::{KeywordRule, MatchType};
use tally_core::rules::RuleEngine;

use super::{load_config, truncate};

/// Path rules are saved to, or an error when there is nowhere to write
pub fn config_target(config_path: Option<&Path>) -> Result<PathBuf> {
    writable_config_path(config_path)
        .context("No config location available on this platform; pass --config <path>")
}

pub fn cmd_rules_list(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    if config.rules.is_empty() {
        println!("No rules defined. Add one with:");
        println!("  tally rules add <pattern> <business_type> <retailer> [--type contains|regex|exact]");
        return Ok(());
    }

    println!();
    println!("📋 Keyword Rules");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:>4} │ {:8} │ {:28} │ {:15} │ {}",
        "#", "Match", "Pattern", "Business Type", "Retailer"
    );
    println!("   ─────┼──────────┼──────────────────────────────┼─────────────────┼──────────────");

    for (i, rule) in config.rules.iter().enumerate() {
        println!(
            "   {:>4} │ {:8} │ {:28} │ {:15} │ {}",
            i + 1,
            rule.match_type.as_str(),
            truncate(&rule.pattern, 28),
            truncate(&rule.business_type, 15),
            truncate(&rule.retailer, 20)
        );
    }

    Ok(())
}

/// Print every rule matching the description. Returns how many matched.
pub fn cmd_rules_test(config_path: Option<&Path>, description: &str) -> Result<usize> {
    let config = load_config(config_path)?;
    let engine = config.rule_engine().context("Invalid keyword rule")?;
    let matches = engine.matching_rules(description);

    println!("🔍 Testing: {}", description);
    if matches.is_empty() {
        println!("   No rules match.");
        return Ok(0);
    }

    for (i, rule) in matches.iter().enumerate() {
        let marker = if i == 0 { "→" } else { " " };
        println!(
            "   {} {} / {}  ({} '{}')",
            marker,
            rule.business_type,
            rule.retailer,
            rule.match_type.as_str(),
            rule.pattern
        );
    }
    if matches.len() > 1 {
        println!("   First match wins; {} others are shadowed.", matches.len() - 1);
    }

    Ok(matches.len())
}

pub fn cmd_rules_add(
    config_path: Option<&Path>,
    pattern: &str,
    business_type: &str,
    retailer: &str,
    match_type_str: &str,
) -> Result<()> {
    let match_type: MatchType = match_type_str
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{} (valid types: contains, regex, exact)", e))?;

    if pattern.trim().is_empty() || business_type.trim().is_empty() || retailer.trim().is_empty() {
        anyhow::bail!("Pattern, business type and retailer must all be non-empty");
    }

    let rule = KeywordRule::new(pattern.trim(), business_type.trim(), retailer.trim())
        .with_match_type(match_type);
    // Reject bad regexes before they reach the config file
    RuleEngine::new([rule.clone()]).context("Invalid rule pattern")?;

    let target = config_target(config_path)?;
    let mut config = load_config(config_path)?;
    if config.add_rules([rule]) == 0 {
        println!("Rule '{}' already exists, nothing changed", pattern);
        return Ok(());
    }
    config.save(&target)?;

    println!(
        "✅ Added rule #{}: {} → {} / {} ({})",
        config.rules.len(),
        pattern,
        business_type,
        retailer,
        match_type.as_str()
    );
    Ok(())
}

/// Import a legacy category database. Returns the number of rules added.
pub fn cmd_rules_import_legacy(config_path: Option<&Path>, file: &Path) -> Result<usize> {
    let db = LegacyDatabase::load(file)
        .with_context(|| format!("Failed to read category database {}", file.display()))?;
    let entries = db.descriptions.len();
    let rules = db.into_rules()?;

    let target = config_target(config_path)?;
    let mut config = load_config(config_path)?;
    let added = config.add_rules(rules);
    if added > 0 {
        config.save(&target)?;
    }

    println!(
        "📥 Imported {} of {} entries from {} into {}",
        added,
        entries,
        file.display(),
        target.display()
    );
    Ok(added)
}
