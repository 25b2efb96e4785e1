//! Full interactive pipeline: load, auto-label, review, summarize, write

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_core::export::save_csv;
use tally_core::session::{known_labels, LabelingSession, SessionOutcome};
use tally_core::Error;
use tracing::warn;

use super::summary::print_summary;
use super::{config_target, load_config, open_store};
use crate::reviewer::TerminalReviewer;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub no_auto: bool,
    pub no_learn: bool,
}

/// What a run did, for callers and tests
#[derive(Debug)]
pub struct RunReport {
    pub auto_labeled: usize,
    pub outcome: SessionOutcome,
    /// None when the review was quit or the user gave up on writing
    pub written: Option<PathBuf>,
    pub learned: usize,
}

pub fn cmd_run(
    config_path: Option<&Path>,
    input: &Path,
    output: &Path,
    no_auto: bool,
    no_learn: bool,
) -> Result<()> {
    let stdin = io::stdin();
    run_interactive(
        config_path,
        input,
        output,
        RunOptions { no_auto, no_learn },
        stdin.lock(),
        io::stdout(),
    )
    .map(|_| ())
}

pub fn run_interactive<R: BufRead, W: Write>(
    config_path: Option<&Path>,
    input: &Path,
    output: &Path,
    options: RunOptions,
    reader: R,
    writer: W,
) -> Result<RunReport> {
    let mut config = load_config(config_path)?;
    let engine = config.rule_engine().context("Invalid keyword rule")?;
    let mut store = open_store(input)?;
    println!("📂 Loaded {} transactions from {}", store.len(), input.display());

    let auto_labeled = if options.no_auto {
        0
    } else {
        let n = engine.apply(&mut store)?;
        println!("🏷️  Auto-labeled {} transactions", n);
        n
    };

    let groups = config.grouping.grouper().group(&store);
    let mut known = known_labels(&store, &engine);
    let mut session = LabelingSession::new(groups);
    println!(
        "🧺 {} uncategorized transactions in {} groups",
        store.len() - store.categorized_count(),
        session.groups().len()
    );

    let learn = config.session.learn_rules && !options.no_learn;
    let mut reviewer = TerminalReviewer::new(reader, writer).with_key_phrase(learn);
    let outcome = session.run(
        &mut store,
        &mut reviewer,
        &mut known,
        config.grouping.min_group_size,
    )?;

    if !outcome.completed {
        println!("⏹️  Review stopped. Nothing was written.");
        return Ok(RunReport {
            auto_labeled,
            outcome,
            written: None,
            learned: 0,
        });
    }

    print_summary(&tally_core::report::summarize(&store), false);

    let mut target = output.to_path_buf();
    let written = loop {
        match save_csv(&target, &store) {
            Ok(()) => {
                println!("✅ Wrote {}", target.display());
                break Some(target);
            }
            Err(e @ Error::Write { .. }) => {
                warn!("{}", e);
                match reviewer.prompt("Enter another output path (blank to cancel): ")? {
                    Some(path) if !path.is_empty() => target = PathBuf::from(path),
                    _ => {
                        println!("Output not written.");
                        break None;
                    }
                }
            }
            Err(e) => return Err(e.into()),
        }
    };

    let mut learned = 0;
    if learn {
        learned = config.add_rules(session.learned_rules(&store));
        if learned > 0 {
            let path = config_target(config_path)?;
            config.save(&path)?;
            println!("🧠 Learned {} new rules → {}", learned, path.display());
        }
    }

    Ok(RunReport {
        auto_labeled,
        outcome,
        written,
        learned,
    })
}
