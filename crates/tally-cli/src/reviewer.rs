//! Terminal reviewer for the labeling session
//!
//! Shows each group with a few sample transactions and asks for a business type
//! and retailer. Known labels can be picked by number; anything else is taken as
//! a new label. `s` skips the group, `q` stops the review.

use std::collections::BTreeSet;
use std::io::{BufRead, Write};

use tally_core::models::TransactionRecord;
use tally_core::session::{GroupReviewer, ReviewDecision, ReviewRequest};
use tally_core::Result;

use crate::commands::truncate;

/// Sample rows shown per group
const SAMPLE_ROWS: usize = 5;

enum Answer {
    Label(String),
    Skip,
    Quit,
}

pub struct TerminalReviewer<R, W> {
    input: R,
    output: W,
    ask_key_phrase: bool,
}

impl<R: BufRead, W: Write> TerminalReviewer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            ask_key_phrase: false,
        }
    }

    /// Also ask for the phrase future rules should match on
    pub fn with_key_phrase(mut self, ask: bool) -> Self {
        self.ask_key_phrase = ask;
        self
    }

    /// Print a prompt and read one trimmed line; None at end of input
    pub fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn show_group(&mut self, request: &ReviewRequest<'_>) -> Result<()> {
        writeln!(self.output)?;
        writeln!(
            self.output,
            "[{}/{}] {} ({} transactions)",
            request.position,
            request.total,
            request.group.key,
            request.group.len()
        )?;
        for record in request.records.iter().take(SAMPLE_ROWS) {
            writeln!(
                self.output,
                "   {:10}  {:40}  {}",
                record.date,
                truncate(&record.description, 40),
                amount_cell(record)
            )?;
        }
        if request.records.len() > SAMPLE_ROWS {
            writeln!(
                self.output,
                "   ... and {} more",
                request.records.len() - SAMPLE_ROWS
            )?;
        }
        Ok(())
    }

    fn ask_label(&mut self, what: &str, known: &BTreeSet<String>) -> Result<Answer> {
        let options: Vec<&String> = known.iter().collect();
        if !options.is_empty() {
            let listing: Vec<String> = options
                .iter()
                .enumerate()
                .map(|(i, label)| format!("{}) {}", i + 1, label))
                .collect();
            writeln!(self.output, "   {}", listing.join("  "))?;
        }

        loop {
            let Some(answer) = self.prompt(&format!("{} (number or new, s=skip, q=quit): ", what))?
            else {
                return Ok(Answer::Quit);
            };

            match answer.as_str() {
                "" => continue,
                "s" | "S" => return Ok(Answer::Skip),
                "q" | "Q" => return Ok(Answer::Quit),
                _ => {}
            }

            if let Ok(n) = answer.parse::<usize>() {
                match n.checked_sub(1).and_then(|i| options.get(i)) {
                    Some(label) => return Ok(Answer::Label(label.to_string())),
                    None => {
                        writeln!(self.output, "   No option {}", n)?;
                        continue;
                    }
                }
            }
            return Ok(Answer::Label(answer));
        }
    }
}

impl<R: BufRead, W: Write> GroupReviewer for TerminalReviewer<R, W> {
    fn review(&mut self, request: &ReviewRequest<'_>) -> Result<ReviewDecision> {
        self.show_group(request)?;

        let business_type = match self.ask_label("Business type", &request.known.business_types)? {
            Answer::Label(label) => label,
            Answer::Skip => return Ok(ReviewDecision::Skip),
            Answer::Quit => return Ok(ReviewDecision::Quit),
        };
        let retailer = match self.ask_label("Retailer", &request.known.retailers)? {
            Answer::Label(label) => label,
            Answer::Skip => return Ok(ReviewDecision::Skip),
            Answer::Quit => return Ok(ReviewDecision::Quit),
        };

        let key_phrase = if self.ask_key_phrase {
            self.prompt("Key phrase for future matching (blank for default): ")?
                .filter(|p| !p.is_empty())
        } else {
            None
        };

        Ok(ReviewDecision::Assign {
            business_type,
            retailer,
            key_phrase,
        })
    }
}

fn amount_cell(record: &TransactionRecord) -> String {
    match (&record.debit, &record.credit) {
        (Some(d), None) => format!("-{}", d),
        (None, Some(c)) => format!("+{}", c),
        (Some(d), Some(c)) => format!("-{} / +{}", d, c),
        (None, None) => String::new(),
    }
}
