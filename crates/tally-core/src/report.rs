//! Summary reporting over labeled transactions

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{TransactionRecord, UNCATEGORIZED};
use crate::store::RecordStore;

/// Date formats seen in bank exports, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%m/%d/%y", "%d-%b-%Y", "%b %d, %Y"];

/// Aggregates for one label value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    /// None for records without labels
    pub label: Option<String>,
    pub count: usize,
    pub debit_count: usize,
    pub debit_total: f64,
    pub credit_count: usize,
    pub credit_total: f64,
    /// Share of all transactions, 0-100
    pub share_pct: f64,
}

impl Bucket {
    fn new(label: Option<&str>) -> Self {
        Self {
            label: label.map(str::to_string),
            count: 0,
            debit_count: 0,
            debit_total: 0.0,
            credit_count: 0,
            credit_total: 0.0,
            share_pct: 0.0,
        }
    }

    /// Display name; unlabeled records show as "Uncategorized"
    pub fn name(&self) -> &str {
        self.label.as_deref().unwrap_or(UNCATEGORIZED)
    }

    pub fn is_uncategorized(&self) -> bool {
        self.label.is_none()
    }

    fn add(&mut self, record: &TransactionRecord) {
        self.count += 1;
        if let Some(debit) = &record.debit {
            self.debit_count += 1;
            self.debit_total += debit.value;
        }
        if let Some(credit) = &record.credit {
            self.credit_count += 1;
            self.credit_total += credit.value;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub categorized: usize,
    pub uncategorized: usize,
    pub categorized_pct: f64,
    pub debit_total: f64,
    pub credit_total: f64,
    pub by_business_type: Vec<Bucket>,
    pub by_retailer: Vec<Bucket>,
    /// Labeled records per label source ("imported", "rule", "manual")
    pub labeled_by: BTreeMap<String, usize>,
    /// None when no record has a parseable date
    pub date_span: Option<DateSpan>,
}

/// Aggregate the store by business type and by retailer.
///
/// Records without labels land in an unlabeled bucket, which is always listed
/// last. A label that happens to read "Uncategorized" is an ordinary bucket. Other buckets are ordered by count, largest first, then by label.
pub fn summarize(store: &RecordStore) -> Summary {
    let total = store.len();
    let categorized = store.categorized_count();

    let by_business_type = aggregate(store, |r| r.business_type.as_deref());
    let by_retailer = aggregate(store, |r| r.retailer.as_deref());

    let debit_total = store.records().iter().map(TransactionRecord::debit_value).sum();
    let credit_total = store.records().iter().map(TransactionRecord::credit_value).sum();

    let mut labeled_by = BTreeMap::new();
    for source in store.records().iter().filter_map(|r| r.label_source) {
        *labeled_by.entry(source.as_str().to_string()).or_insert(0) += 1;
    }

    let date_span = store
        .records()
        .iter()
        .filter_map(|r| parse_date(&r.date))
        .fold(None, |span: Option<DateSpan>, d| {
            Some(match span {
                Some(s) => DateSpan {
                    start: s.start.min(d),
                    end: s.end.max(d),
                },
                None => DateSpan { start: d, end: d },
            })
        });

    Summary {
        total,
        categorized,
        uncategorized: total - categorized,
        categorized_pct: percent(categorized, total),
        debit_total,
        credit_total,
        by_business_type,
        by_retailer,
        labeled_by,
        date_span,
    }
}

/// Parse a transaction date in any of the supported formats
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn aggregate<F>(store: &RecordStore, label: F) -> Vec<Bucket>
where
    F: Fn(&TransactionRecord) -> Option<&str>,
{
    let mut buckets: HashMap<Option<&str>, Bucket> = HashMap::new();
    for record in store.records() {
        let key = label(record);
        buckets
            .entry(key)
            .or_insert_with(|| Bucket::new(key))
            .add(record);
    }

    let total = store.len();
    let mut buckets: Vec<Bucket> = buckets
        .into_values()
        .map(|mut b| {
            b.share_pct = percent(b.count, total);
            b
        })
        .collect();

    buckets.sort_by(|a, b| {
        a.is_uncategorized()
            .cmp(&b.is_uncategorized())
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.label.cmp(&b.label))
    });
    buckets
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
