//! Summary command and table rendering

use std::path::Path;

use anyhow::Result;
use tally_core::report::{summarize, Bucket, Summary};

use super::{open_store, truncate};

/// Width of the share bar at 100%
const BAR_WIDTH: usize = 20;

pub fn cmd_summary(input: &Path, retailers: bool, json: bool) -> Result<()> {
    let store = open_store(input)?;
    let summary = summarize(&store);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_summary(&summary, retailers);
    Ok(())
}

pub fn print_summary(summary: &Summary, retailers: bool) {
    println!();
    println!("📊 Summary");
    if let Some(span) = &summary.date_span {
        println!("   Period: {} to {}", span.start, span.end);
    }
    println!("   ─────────────────────────────────────────────────────────────");

    if summary.total == 0 {
        println!("   No transactions.");
        return;
    }

    println!(
        "   {} transactions, {} categorized ({:.1}%), {} uncategorized",
        summary.total, summary.categorized, summary.categorized_pct, summary.uncategorized
    );
    println!(
        "   Debits: ${:.2}   Credits: ${:.2}",
        summary.debit_total, summary.credit_total
    );
    if !summary.labeled_by.is_empty() {
        let sources: Vec<String> = summary
            .labeled_by
            .iter()
            .map(|(source, n)| format!("{} {}", source, n))
            .collect();
        println!("   Labeled by: {}", sources.join(", "));
    }

    print_buckets("Business Type", &summary.by_business_type);
    if retailers {
        print_buckets("Retailer", &summary.by_retailer);
    }
}

fn print_buckets(title: &str, buckets: &[Bucket]) {
    println!();
    println!(
        "   {:20} │ {:>5} │ {:>10} │ {:>10} │ {:>6} │",
        title, "Count", "Debits", "Credits", "%"
    );
    println!("   ─────────────────────┼───────┼────────────┼────────────┼────────┼──────────────────────");

    for bucket in buckets {
        println!(
            "   {:20} │ {:>5} │ {:>10.2} │ {:>10.2} │ {:>5.1}% │ {}",
            truncate(bucket.name(), 20),
            bucket.count,
            bucket.debit_total,
            bucket.credit_total,
            bucket.share_pct,
            bar(bucket.share_pct)
        );
    }
}

/// Horizontal bar for a 0-100 share
pub fn bar(pct: f64) -> String {
    let filled = ((pct.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(filled)
}
