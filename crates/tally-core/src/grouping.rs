//! Similarity grouping of uncategorized transactions
//!
//! Descriptions are reduced to a grouping key so that one decision can label
//! every charge from the same merchant:
//!
//! - case-fold
//! - `*` and `#` become spaces (`AMAZON.COM*AB12`, `WALMART #1234`)
//! - trailing whitespace tokens containing a digit are dropped (store numbers,
//!   reference codes), always keeping the first token
//! - whitespace is collapsed
//!
//! Digits inside the merchant name survive: `7-ELEVEN #1234` and `76 GAS 1001`
//! reduce to `7-eleven` and `76 gas`.
//!
//! Groups come out in order of the first occurrence of their key and members keep
//! input order. Every uncategorized record lands in exactly one group.

use std::collections::HashMap;

use tracing::debug;

use crate::models::{RecordId, TransactionGroup};
use crate::store::RecordStore;

/// Reduce a description to its grouping key
pub fn normalize_description(description: &str) -> String {
    let folded = description.to_lowercase().replace(['*', '#'], " ");
    let mut tokens: Vec<&str> = folded.split_whitespace().collect();

    while tokens.len() > 1
        && tokens
            .last()
            .is_some_and(|t| t.chars().any(|c| c.is_ascii_digit()))
    {
        tokens.pop();
    }
    tokens.join(" ")
}

/// Similarity of two strings in [0, 1]: 2 * LCS / (len_a + len_b)
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    // Longest common subsequence, single-row DP
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (2 * prev[b.len()]) as f64 / total as f64
}

/// Partitions uncategorized records into groups
#[derive(Debug, Clone, Copy)]
pub struct Grouper {
    threshold: f64,
}

impl Default for Grouper {
    fn default() -> Self {
        Self { threshold: 1.0 }
    }
}

impl Grouper {
    /// Exact normalized-key grouping
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge keys whose similarity ratio is at least `threshold`.
    ///
    /// `1.0` or more means exact keys only.
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn group(&self, store: &RecordStore) -> Vec<TransactionGroup> {
        let mut groups: Vec<TransactionGroup> = Vec::new();
        // key -> position in `groups` (includes keys merged into another group)
        let mut index: HashMap<String, usize> = HashMap::new();

        for id in store.uncategorized_ids() {
            let Some(record) = store.get(id) else {
                continue;
            };
            let key = normalize_description(&record.description);

            if let Some(&pos) = index.get(&key) {
                groups[pos].members.push(id);
                continue;
            }

            let pos = self
                .find_similar(&groups, &key)
                .unwrap_or_else(|| {
                    groups.push(TransactionGroup {
                        key: key.clone(),
                        members: Vec::new(),
                    });
                    groups.len() - 1
                });
            groups[pos].members.push(id);
            index.insert(key, pos);
        }

        debug!(
            "Grouped {} uncategorized transactions into {} groups",
            groups.iter().map(TransactionGroup::len).sum::<usize>(),
            groups.len()
        );
        groups
    }

    fn find_similar(&self, groups: &[TransactionGroup], key: &str) -> Option<usize> {
        if self.threshold >= 1.0 {
            return None;
        }
        groups
            .iter()
            .position(|g| similarity_ratio(&g.key, key) >= self.threshold)
    }
}

/// Exact normalized-key grouping over a store
pub fn group(store: &RecordStore) -> Vec<TransactionGroup> {
    Grouper::new().group(store)
}

/// Ids of every member across groups, for partition checks
pub fn member_ids(groups: &[TransactionGroup]) -> Vec<RecordId> {
    groups.iter().flat_map(|g| g.members.iter().copied()).collect()
}
