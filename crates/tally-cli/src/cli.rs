//! CLI argument definitions using clap
//!
//! Command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Categorize bank transactions by business type and retailer
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Label bank transaction CSVs with keyword rules and grouped review", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file with settings and keyword rules
    ///
    /// Defaults to the user config in the platform data directory, falling
    /// back to the built-in rules when that file does not exist.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Auto-label, review remaining groups interactively, then write the result
    Run {
        /// Transaction CSV to categorize
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the labeled CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Skip keyword rules and review every transaction
        #[arg(long)]
        no_auto: bool,

        /// Don't save manual labels as new rules
        #[arg(long)]
        no_learn: bool,
    },

    /// Apply keyword rules only and write the result
    Auto {
        /// Transaction CSV to categorize
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the labeled CSV
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List groups of transactions that rules leave uncategorized
    Groups {
        /// Transaction CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Include groups below the configured minimum size
        #[arg(long)]
        all: bool,
    },

    /// Summarize a labeled CSV by business type
    Summary {
        /// Labeled transaction CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Also break down by retailer
        #[arg(long)]
        retailers: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage keyword rules
    Rules {
        #[command(subcommand)]
        action: Option<RulesAction>,
    },

    /// Show configuration location and contents
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// List rules in evaluation order
    List,

    /// Show which rules match a description
    Test {
        /// Transaction description to test
        description: String,
    },

    /// Add a rule at the end of the list
    Add {
        /// Pattern to match against transaction descriptions
        pattern: String,
        /// Business type to assign
        business_type: String,
        /// Retailer to assign
        retailer: String,
        /// Match type: contains, regex, exact (default: contains)
        #[arg(long = "type", default_value = "contains")]
        match_type: String,
    },

    /// Import rules from a legacy JSON category database
    ImportLegacy {
        /// JSON file with descriptions, business_labels and retailer_labels
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print the active configuration
    Show,
}
