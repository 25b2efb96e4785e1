//! Tally Core Library
//!
//! Categorizes bank transaction exports:
//! - CSV load and augmented CSV write
//! - Keyword rule engine for automatic labeling
//! - Similarity grouping of uncategorized transactions
//! - Manual labeling session with a pluggable reviewer
//! - Summary reporting by business type and retailer
//! - TOML configuration with learned rules

pub mod config;
pub mod error;
pub mod export;
pub mod grouping;
pub mod import;
pub mod models;
pub mod report;
pub mod rules;
pub mod session;
pub mod store;

pub use config::{Config, GroupingConfig, LegacyDatabase, SessionConfig};
pub use error::{Error, Result};
pub use export::{save_csv, write_csv};
pub use grouping::{normalize_description, Grouper};
pub use import::{load_csv, load_csv_path};
pub use models::{
    Amount, Direction, KeywordRule, LabelAssignment, LabelSource, MatchType, RecordId,
    TransactionGroup, TransactionRecord, UNCATEGORIZED,
};
pub use report::{summarize, Bucket, DateSpan, Summary};
pub use rules::RuleEngine;
pub use session::{
    known_labels, GroupReviewer, KnownLabels, LabelingSession, ReviewDecision, ReviewRequest,
    SessionOutcome, SessionProgress,
};
pub use store::RecordStore;
