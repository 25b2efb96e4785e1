//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `run` - Full interactive pipeline (auto-label, review, summary, write)
//! - `auto` - Non-interactive auto-labeling
//! - `groups` - Group listing for uncategorized transactions
//! - `summary` - Summary tables and charts
//! - `rules` - Keyword rule management
//! - `config` - Config location and contents

pub mod auto;
pub mod config;
pub mod groups;
pub mod rules;
pub mod run;
pub mod summary;

// Re-export command functions for main.rs
pub use auto::*;
pub use config::*;
pub use groups::*;
pub use rules::*;
pub use run::*;
pub use summary::*;

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{import::load_csv_path, store::RecordStore, Config};

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Load the transaction CSV or fail with its path in the message
pub fn open_store(path: &Path) -> Result<RecordStore> {
    load_csv_path(path).with_context(|| format!("Failed to load {}", path.display()))
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).context("Failed to load config")
}
