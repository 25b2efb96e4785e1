//! Tally CLI - Bank transaction categorizer
//!
//! Usage:
//!   tally run -i in.csv -o out.csv   Auto-label, review groups, write
//!   tally auto -i in.csv -o out.csv  Apply keyword rules only
//!   tally summary -i out.csv         Summarize by business type
//!   tally rules list                 Show keyword rules

mod cli;
mod commands;
mod reviewer;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            input,
            output,
            no_auto,
            no_learn,
        } => commands::cmd_run(config, &input, &output, no_auto, no_learn),
        Commands::Auto { input, output } => {
            commands::cmd_auto(config, &input, &output).map(|_| ())
        }
        Commands::Groups { input, all } => commands::cmd_groups(config, &input, all),
        Commands::Summary {
            input,
            retailers,
            json,
        } => commands::cmd_summary(&input, retailers, json),
        Commands::Rules { action } => match action {
            None | Some(RulesAction::List) => commands::cmd_rules_list(config),
            Some(RulesAction::Test { description }) => {
                commands::cmd_rules_test(config, &description).map(|_| ())
            }
            Some(RulesAction::Add {
                pattern,
                business_type,
                retailer,
                match_type,
            }) => commands::cmd_rules_add(config, &pattern, &business_type, &retailer, &match_type),
            Some(RulesAction::ImportLegacy { file }) => {
                commands::cmd_rules_import_legacy(config, &file).map(|_| ())
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Path => commands::cmd_config_path(config),
            ConfigAction::Show => commands::cmd_config_show(config),
        },
    }
}
