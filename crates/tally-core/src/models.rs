//! Data models for Tally

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Required input columns, in canonical order
pub const COL_STATUS: &str = "Status";
pub const COL_DATE: &str = "Date";
pub const COL_DESCRIPTION: &str = "Description";
pub const COL_DEBIT: &str = "Debit";
pub const COL_CREDIT: &str = "Credit";
pub const COL_MEMBER_NAME: &str = "Member Name";

/// Derived columns appended on output
pub const COL_BUSINESS_TYPE: &str = "Business Type";
pub const COL_RETAILER: &str = "Retailer";

pub const REQUIRED_COLUMNS: [&str; 6] = [
    COL_STATUS,
    COL_DATE,
    COL_DESCRIPTION,
    COL_DEBIT,
    COL_CREDIT,
    COL_MEMBER_NAME,
];

/// Reporting bucket for records without labels
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Index of a record in the [`RecordStore`](crate::store::RecordStore)
pub type RecordId = usize;

/// A monetary amount as it appeared in the CSV
///
/// The raw text is kept so output reproduces the input exactly; `value`
/// is only used for aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Amount {
    pub raw: String,
    pub value: f64,
}

impl Amount {
    /// Parse a CSV cell. Empty cells are `None`.
    pub fn parse(s: &str) -> Result<Option<Self>> {
        if s.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            raw: s.to_string(),
            value: parse_amount(s)?,
        }))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse an amount string, handling currency symbols and commas
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::Load(format!("Unable to parse amount: {}", s)))
}

/// Which amount columns a record populates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Debit,
    Credit,
    /// Both columns populated (preserved as-is)
    Both,
    /// Neither column populated (preserved as-is)
    Neither,
}

/// Where a record's labels came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelSource {
    /// Already present in the input CSV
    Imported,
    /// Keyword rule engine
    Rule,
    /// Manual labeling session
    Manual,
}

impl LabelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imported => "imported",
            Self::Rule => "rule",
            Self::Manual => "manual",
        }
    }
}

/// One row of the input CSV plus its derived labels
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub status: String,
    pub date: String,
    pub description: String,
    pub debit: Option<Amount>,
    pub credit: Option<Amount>,
    pub member_name: String,
    pub business_type: Option<String>,
    pub retailer: Option<String>,
    pub label_source: Option<LabelSource>,
    /// Business Type and Retailer cells of a half-labeled input row, written back
    /// unchanged while the record has no labels
    pub imported_raw: Option<(String, String)>,
    /// Values of non-required input columns, aligned with
    /// [`RecordStore::extra_columns`](crate::store::RecordStore::extra_columns)
    pub extra: Vec<String>,
}

impl TransactionRecord {
    pub fn new(
        status: impl Into<String>,
        date: impl Into<String>,
        description: impl Into<String>,
        debit: Option<Amount>,
        credit: Option<Amount>,
        member_name: impl Into<String>,
    ) -> Self {
        Self {
            status: status.into(),
            date: date.into(),
            description: description.into(),
            debit,
            credit,
            member_name: member_name.into(),
            business_type: None,
            retailer: None,
            label_source: None,
            imported_raw: None,
            extra: Vec::new(),
        }
    }

    pub fn direction(&self) -> Direction {
        match (&self.debit, &self.credit) {
            (Some(_), None) => Direction::Debit,
            (None, Some(_)) => Direction::Credit,
            (Some(_), Some(_)) => Direction::Both,
            (None, None) => Direction::Neither,
        }
    }

    pub fn is_categorized(&self) -> bool {
        self.business_type.is_some()
    }

    pub fn debit_value(&self) -> f64 {
        self.debit.as_ref().map(|a| a.value).unwrap_or(0.0)
    }

    pub fn credit_value(&self) -> f64 {
        self.credit.as_ref().map(|a| a.value).unwrap_or(0.0)
    }
}

/// How a keyword rule pattern is compared against descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Case- and space-insensitive substring match (supports | for OR)
    #[default]
    Contains,
    /// Case-insensitive regular expression match
    Regex,
    /// Exact string match (case-insensitive, trimmed)
    Exact,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Regex => "regex",
            Self::Exact => "exact",
        }
    }
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" => Ok(Self::Contains),
            "regex" => Ok(Self::Regex),
            "exact" => Ok(Self::Exact),
            _ => Err(format!("Unknown match type: {}", s)),
        }
    }
}

/// Pattern-to-label mapping used for automatic categorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub pattern: String,
    pub business_type: String,
    pub retailer: String,
    #[serde(default, rename = "match", skip_serializing_if = "is_default_match")]
    pub match_type: MatchType,
}

fn is_default_match(m: &MatchType) -> bool {
    *m == MatchType::Contains
}

impl KeywordRule {
    pub fn new(
        pattern: impl Into<String>,
        business_type: impl Into<String>,
        retailer: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            business_type: business_type.into(),
            retailer: retailer.into(),
            match_type: MatchType::Contains,
        }
    }

    pub fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }
}

/// Uncategorized records sharing a normalized description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionGroup {
    pub key: String,
    pub members: Vec<RecordId>,
}

impl TransactionGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A label the user submitted for a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelAssignment {
    pub group_key: String,
    pub business_type: String,
    pub retailer: String,
    pub applied: bool,
}
