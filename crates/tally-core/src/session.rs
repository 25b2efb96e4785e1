//! Manual labeling session
//!
//! Holds the review state for one run: which groups have been labeled, which
//! were skipped, and the label chosen for each. The UI is plugged in through
//! [`GroupReviewer`], which is asked for a decision one group at a time.
//!
//! A group can only be labeled once. Labeling it again requires either
//! [`LabelingSession::reopen`] or [`LabelingSession::assign_with_override`];
//! a plain [`LabelingSession::assign`] fails with [`Error::DuplicateLabel`].

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{
    KeywordRule, LabelAssignment, LabelSource, TransactionGroup, TransactionRecord,
};
use crate::rules::RuleEngine;
use crate::store::{validate_labels, RecordStore};

/// Label vocabulary offered to the reviewer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownLabels {
    pub business_types: BTreeSet<String>,
    pub retailers: BTreeSet<String>,
}

impl KnownLabels {
    /// Distinct labels from the rules and the already-labeled records
    pub fn collect(store: &RecordStore, rules: &RuleEngine) -> Self {
        let mut known = Self::default();
        for rule in rules.rules() {
            known.insert(&rule.business_type, &rule.retailer);
        }
        for record in store.records() {
            if let (Some(b), Some(r)) = (&record.business_type, &record.retailer) {
                known.insert(b, r);
            }
        }
        known
    }

    pub fn insert(&mut self, business_type: &str, retailer: &str) {
        self.business_types.insert(business_type.to_string());
        self.retailers.insert(retailer.to_string());
    }
}

/// Label vocabulary from the rules and the already-labeled records
pub fn known_labels(store: &RecordStore, rules: &RuleEngine) -> KnownLabels {
    KnownLabels::collect(store, rules)
}

/// Everything a reviewer needs to decide on one group
#[derive(Debug)]
pub struct ReviewRequest<'a> {
    pub group: &'a TransactionGroup,
    pub records: Vec<&'a TransactionRecord>,
    /// 1-based position among the groups offered in this run
    pub position: usize,
    pub total: usize,
    pub known: &'a KnownLabels,
}

/// The reviewer's answer for a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Assign {
        business_type: String,
        retailer: String,
        /// Phrase to match future transactions; derived from the group if absent
        key_phrase: Option<String>,
    },
    Skip,
    /// Stop reviewing; the caller decides whether to write anything
    Quit,
}

/// UI boundary for manual labeling
pub trait GroupReviewer {
    fn review(&mut self, request: &ReviewRequest<'_>) -> Result<ReviewDecision>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionProgress {
    pub total: usize,
    pub assigned: usize,
    pub skipped: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    /// False when the reviewer quit early
    pub completed: bool,
    /// Groups offered to the reviewer during this run
    pub offered: usize,
    pub progress: SessionProgress,
}

#[derive(Debug, Default)]
pub struct LabelingSession {
    groups: Vec<TransactionGroup>,
    index: HashMap<String, usize>,
    assignments: HashMap<String, LabelAssignment>,
    skipped: HashSet<String>,
    key_phrases: HashMap<String, String>,
}

impl LabelingSession {
    pub fn new(groups: Vec<TransactionGroup>) -> Self {
        let index = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.key.clone(), i))
            .collect();
        Self {
            groups,
            index,
            ..Default::default()
        }
    }

    pub fn groups(&self) -> &[TransactionGroup] {
        &self.groups
    }

    pub fn group(&self, key: &str) -> Option<&TransactionGroup> {
        self.index.get(key).map(|&i| &self.groups[i])
    }

    /// Assignments in group order
    pub fn assignments(&self) -> impl Iterator<Item = &LabelAssignment> {
        self.groups
            .iter()
            .filter_map(|g| self.assignments.get(&g.key))
    }

    pub fn is_applied(&self, key: &str) -> bool {
        self.assignments.get(key).is_some_and(|a| a.applied)
    }

    pub fn is_skipped(&self, key: &str) -> bool {
        self.skipped.contains(key)
    }

    pub fn is_reviewed(&self, key: &str) -> bool {
        self.is_applied(key) || self.is_skipped(key)
    }

    /// Groups still waiting for a decision, in group order
    pub fn pending(&self) -> impl Iterator<Item = &TransactionGroup> {
        self.groups.iter().filter(|g| !self.is_reviewed(&g.key))
    }

    pub fn next_pending(&self) -> Option<&TransactionGroup> {
        self.pending().next()
    }

    pub fn progress(&self) -> SessionProgress {
        let total = self.groups.len();
        let assigned = self.groups.iter().filter(|g| self.is_applied(&g.key)).count();
        let skipped = self.groups.iter().filter(|g| self.is_skipped(&g.key)).count();
        SessionProgress {
            total,
            assigned,
            skipped,
            remaining: total - assigned - skipped,
        }
    }

    /// Label every member of a group.
    ///
    /// Fails with [`Error::DuplicateLabel`] if the group is already labeled.
    pub fn assign(
        &mut self,
        store: &mut RecordStore,
        key: &str,
        business_type: &str,
        retailer: &str,
    ) -> Result<&LabelAssignment> {
        self.require_group(key)?;
        if self.is_applied(key) {
            return Err(Error::DuplicateLabel(key.to_string()));
        }
        self.apply(store, key, business_type, retailer)
    }

    /// Label a group, replacing any labels it received earlier in this session
    pub fn assign_with_override(
        &mut self,
        store: &mut RecordStore,
        key: &str,
        business_type: &str,
        retailer: &str,
    ) -> Result<&LabelAssignment> {
        self.require_group(key)?;
        self.apply(store, key, business_type, retailer)
    }

    /// Return a reviewed group to the pending set.
    ///
    /// Member labels stay in place until the group is assigned again.
    pub fn reopen(&mut self, key: &str) -> Result<()> {
        self.require_group(key)?;
        if let Some(assignment) = self.assignments.get_mut(key) {
            assignment.applied = false;
        }
        self.skipped.remove(key);
        debug!("Re-opened group '{}'", key);
        Ok(())
    }

    /// Mark a group as reviewed without labeling it.
    ///
    /// A re-opened group loses the labels it was given earlier in the session.
    pub fn skip(&mut self, store: &mut RecordStore, key: &str) -> Result<()> {
        self.require_group(key)?;
        if self.is_applied(key) {
            return Err(Error::DuplicateLabel(key.to_string()));
        }
        if self.assignments.remove(key).is_some() {
            let members = self
                .group(key)
                .map(|g| g.members.clone())
                .unwrap_or_default();
            for id in members {
                store.clear_labels(id)?;
            }
            self.key_phrases.remove(key);
            debug!("Cleared labels of re-opened group '{}'", key);
        }
        self.skipped.insert(key.to_string());
        debug!("Skipped group '{}'", key);
        Ok(())
    }

    /// Offer every pending group of at least `min_group_size` members to the reviewer
    pub fn run(
        &mut self,
        store: &mut RecordStore,
        reviewer: &mut dyn GroupReviewer,
        known: &mut KnownLabels,
        min_group_size: usize,
    ) -> Result<SessionOutcome> {
        let keys: Vec<String> = self
            .pending()
            .filter(|g| g.len() >= min_group_size.max(1))
            .map(|g| g.key.clone())
            .collect();
        let total = keys.len();
        let mut offered = 0;

        for (i, key) in keys.iter().enumerate() {
            let decision = {
                let Some(group) = self.group(key) else {
                    continue;
                };
                let records = group.members.iter().filter_map(|&id| store.get(id)).collect();
                let request = ReviewRequest {
                    group,
                    records,
                    position: i + 1,
                    total,
                    known,
                };
                reviewer.review(&request)?
            };
            offered += 1;

            match decision {
                ReviewDecision::Assign {
                    business_type,
                    retailer,
                    key_phrase,
                } => match self.assign(store, key, &business_type, &retailer) {
                    Ok(_) => {
                        known.insert(&business_type, &retailer);
                        if let Some(phrase) = key_phrase.filter(|p| !p.trim().is_empty()) {
                            self.key_phrases.insert(key.clone(), phrase.trim().to_string());
                        }
                    }
                    Err(Error::DuplicateLabel(k)) => {
                        warn!("Group '{}' is already labeled; leaving it unchanged", k);
                    }
                    Err(Error::InvalidData(msg)) => {
                        warn!("Group '{}' left pending: {}", key, msg);
                    }
                    Err(e) => return Err(e),
                },
                ReviewDecision::Skip => self.skip(store, key)?,
                ReviewDecision::Quit => {
                    info!("Review stopped after {} of {} groups", offered, total);
                    return Ok(SessionOutcome {
                        completed: false,
                        offered,
                        progress: self.progress(),
                    });
                }
            }
        }

        Ok(SessionOutcome {
            completed: true,
            offered,
            progress: self.progress(),
        })
    }

    /// One keyword rule per applied assignment, for reuse in later runs.
    ///
    /// Uses the reviewer's key phrase, or else the group key, which matches every
    /// charge that normalizes the same way.
    pub fn learned_rules(&self, store: &RecordStore) -> Vec<KeywordRule> {
        self.groups
            .iter()
            .filter_map(|g| {
                let assignment = self.assignments.get(&g.key).filter(|a| a.applied)?;
                let phrase = match self.key_phrases.get(&g.key) {
                    Some(p) => p.clone(),
                    None => default_key_phrase(store, g)?,
                };
                Some(KeywordRule::new(
                    phrase,
                    assignment.business_type.clone(),
                    assignment.retailer.clone(),
                ))
            })
            .collect()
    }

    fn require_group(&self, key: &str) -> Result<()> {
        if self.index.contains_key(key) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Group '{}'", key)))
        }
    }

    fn apply(
        &mut self,
        store: &mut RecordStore,
        key: &str,
        business_type: &str,
        retailer: &str,
    ) -> Result<&LabelAssignment> {
        let business_type = business_type.trim();
        let retailer = retailer.trim();
        validate_labels(business_type, retailer)?;

        let members = self
            .group(key)
            .map(|g| g.members.clone())
            .unwrap_or_default();
        for &id in &members {
            store.overwrite_labels(id, business_type, retailer, LabelSource::Manual)?;
        }

        self.skipped.remove(key);
        debug!(
            "Labeled group '{}' ({} transactions): {} / {}",
            key,
            members.len(),
            business_type,
            retailer
        );

        let assignment = LabelAssignment {
            group_key: key.to_string(),
            business_type: business_type.to_string(),
            retailer: retailer.to_string(),
            applied: true,
        };
        self.assignments.insert(key.to_string(), assignment);
        self.assignments
            .get(key)
            .ok_or_else(|| Error::NotFound(format!("Group '{}'", key)))
    }
}

fn default_key_phrase(store: &RecordStore, group: &TransactionGroup) -> Option<String> {
    if !group.key.trim().is_empty() {
        return Some(group.key.trim().to_string());
    }
    // Empty key: first two words of the first description
    let first = group.members.first().and_then(|&id| store.get(id))?;
    let phrase = first
        .description
        .to_lowercase()
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ");
    (!phrase.is_empty()).then_some(phrase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::group;

    fn store_with(descriptions: &[&str]) -> RecordStore {
        RecordStore::from_records(
            descriptions
                .iter()
                .map(|d| TransactionRecord::new("Posted", "2023-01-01", *d, None, None, "Test"))
                .collect(),
        )
    }

    /// Replays a fixed list of decisions
    struct ScriptedReviewer {
        decisions: Vec<ReviewDecision>,
        seen: Vec<(String, usize, usize)>,
    }

    impl ScriptedReviewer {
        fn new(decisions: Vec<ReviewDecision>) -> Self {
            Self {
                decisions: decisions.into_iter().rev().collect(),
                seen: Vec::new(),
            }
        }
    }

    impl GroupReviewer for ScriptedReviewer {
        fn review(&mut self, request: &ReviewRequest<'_>) -> Result<ReviewDecision> {
            self.seen
                .push((request.group.key.clone(), request.position, request.total));
            Ok(self.decisions.pop().unwrap_or(ReviewDecision::Quit))
        }
    }

    fn assign(b: &str, r: &str) -> ReviewDecision {
        ReviewDecision::Assign {
            business_type: b.to_string(),
            retailer: r.to_string(),
            key_phrase: None,
        }
    }

    #[test]
    fn test_assign_labels_every_member() {
        let mut store = store_with(&["WALMART #1234", "CHEVRON", "WALMART #5678"]);
        let mut session = LabelingSession::new(group(&store));

        let assignment = session
            .assign(&mut store, "walmart", "Shopping", "Walmart")
            .unwrap();
        assert!(assignment.applied);
        assert_eq!(assignment.group_key, "walmart");

        for id in [0, 2] {
            let record = store.get(id).unwrap();
            assert_eq!(record.business_type.as_deref(), Some("Shopping"));
            assert_eq!(record.retailer.as_deref(), Some("Walmart"));
            assert_eq!(record.label_source, Some(LabelSource::Manual));
        }
        assert!(!store.get(1).unwrap().is_categorized());
    }

    #[test]
    fn test_second_assign_is_duplicate_label() {
        let mut store = store_with(&["WALMART #1234"]);
        let mut session = LabelingSession::new(group(&store));

        session
            .assign(&mut store, "walmart", "Shopping", "Walmart")
            .unwrap();
        let err = session
            .assign(&mut store, "walmart", "Groceries", "Walmart")
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateLabel(ref k) if k == "walmart"));
        assert_eq!(store.get(0).unwrap().business_type.as_deref(), Some("Shopping"));
    }

    #[test]
    fn test_override_and_reopen() {
        let mut store = store_with(&["WALMART #1234", "WALMART #9"]);
        let mut session = LabelingSession::new(group(&store));

        session
            .assign(&mut store, "walmart", "Shopping", "Walmart")
            .unwrap();
        session
            .assign_with_override(&mut store, "walmart", "Groceries", "Walmart")
            .unwrap();
        assert_eq!(store.get(1).unwrap().business_type.as_deref(), Some("Groceries"));

        session.reopen("walmart").unwrap();
        assert!(!session.is_reviewed("walmart"));
        // Labels stay until re-assigned
        assert_eq!(store.get(0).unwrap().business_type.as_deref(), Some("Groceries"));

        session
            .assign(&mut store, "walmart", "Household", "Walmart")
            .unwrap();
        assert_eq!(store.get(0).unwrap().business_type.as_deref(), Some("Household"));

        let assignments: Vec<&LabelAssignment> = session.assignments().collect();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].business_type, "Household");
    }

    #[test]
    fn test_skip_after_reopen_clears_labels() {
        let mut store = store_with(&["WALMART #1234", "WALMART #5678", "CHEVRON"]);
        let mut session = LabelingSession::new(group(&store));

        session
            .assign(&mut store, "walmart", "Shopping", "Walmart")
            .unwrap();
        session.reopen("walmart").unwrap();
        session.skip(&mut store, "walmart").unwrap();

        assert!(session.is_skipped("walmart"));
        assert!(!session.is_applied("walmart"));
        for id in [0, 1] {
            let record = store.get(id).unwrap();
            assert!(record.business_type.is_none());
            assert!(record.retailer.is_none());
            assert!(record.label_source.is_none());
        }
        assert_eq!(session.assignments().count(), 0);
        assert!(session.learned_rules(&store).is_empty());

        // Assigning a skipped group is still allowed
        session
            .assign(&mut store, "walmart", "Groceries", "Walmart")
            .unwrap();
        assert_eq!(store.get(1).unwrap().business_type.as_deref(), Some("Groceries"));
        assert!(!session.is_skipped("walmart"));
    }

    #[test]
    fn test_default_key_phrase_matches_sibling_charges() {
        let mut store = store_with(&["AMAZON.COM*AB12", "AMAZON.COM*CD99"]);
        let mut session = LabelingSession::new(group(&store));
        session
            .assign(&mut store, "amazon.com", "Shopping", "Amazon")
            .unwrap();

        let rules = session.learned_rules(&store);
        assert_eq!(rules, vec![KeywordRule::new("amazon.com", "Shopping", "Amazon")]);

        let engine = RuleEngine::new(rules).unwrap();
        assert!(engine.classify("AMAZON.COM*ZZ31").is_some());
    }

    #[test]
    fn test_skip_excludes_from_pending() {
        let mut store = store_with(&["A SHOP", "B SHOP"]);
        let mut session = LabelingSession::new(group(&store));

        session.skip(&mut store, "a shop").unwrap();
        assert!(session.is_skipped("a shop"));
        assert!(!store.get(0).unwrap().is_categorized());

        let pending: Vec<&str> = session.pending().map(|g| g.key.as_str()).collect();
        assert_eq!(pending, vec!["b shop"]);
        assert_eq!(
            session.progress(),
            SessionProgress {
                total: 2,
                assigned: 0,
                skipped: 1,
                remaining: 1
            }
        );

        session.assign(&mut store, "b shop", "X", "Y").unwrap();
        assert!(session.next_pending().is_none());
        assert!(matches!(
            session.skip(&mut store, "b shop"),
            Err(Error::DuplicateLabel(_))
        ));
    }

    #[test]
    fn test_unknown_group_and_empty_labels() {
        let mut store = store_with(&["A SHOP"]);
        let mut session = LabelingSession::new(group(&store));

        assert!(matches!(
            session.assign(&mut store, "nope", "X", "Y"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            session.assign(&mut store, "a shop", "X", "  "),
            Err(Error::InvalidData(_))
        ));
        assert!(!session.is_applied("a shop"));
    }

    #[test]
    fn test_run_with_reviewer() {
        let mut store = store_with(&["WALMART #1", "CHEVRON", "WALMART #2", "TARGET"]);
        let mut session = LabelingSession::new(group(&store));
        let mut known = KnownLabels::default();
        let mut reviewer = ScriptedReviewer::new(vec![
            assign("Shopping", "Walmart"),
            ReviewDecision::Skip,
            assign("Shopping", "Target"),
        ]);

        let outcome = session
            .run(&mut store, &mut reviewer, &mut known, 1)
            .unwrap();
        assert!(outcome.completed);
        assert_eq!(outcome.offered, 3);
        assert_eq!(outcome.progress.assigned, 2);
        assert_eq!(outcome.progress.skipped, 1);

        assert_eq!(
            reviewer.seen,
            vec![
                ("walmart".to_string(), 1, 3),
                ("chevron".to_string(), 2, 3),
                ("target".to_string(), 3, 3),
            ]
        );
        assert!(known.retailers.contains("Target"));
        assert!(!store.get(1).unwrap().is_categorized());
    }

    #[test]
    fn test_run_quit_and_min_group_size() {
        let mut store = store_with(&["WALMART #1", "CHEVRON", "WALMART #2"]);
        let mut session = LabelingSession::new(group(&store));
        let mut known = KnownLabels::default();

        // Only the walmart group has two members
        let mut reviewer = ScriptedReviewer::new(vec![ReviewDecision::Quit]);
        let outcome = session
            .run(&mut store, &mut reviewer, &mut known, 2)
            .unwrap();
        assert!(!outcome.completed);
        assert_eq!(reviewer.seen, vec![("walmart".to_string(), 1, 1)]);
        assert_eq!(outcome.progress.remaining, 2);
    }

    #[test]
    fn test_learned_rules() {
        let mut store = store_with(&["Blue Bottle Coffee #12", "MYSTERY 1", "TARGET T-100"]);
        let mut session = LabelingSession::new(group(&store));
        let mut known = KnownLabels::default();
        let mut reviewer = ScriptedReviewer::new(vec![
            assign("Food", "Blue Bottle"),
            ReviewDecision::Skip,
            ReviewDecision::Assign {
                business_type: "Shopping".into(),
                retailer: "Target".into(),
                key_phrase: Some(" target ".into()),
            },
        ]);
        session
            .run(&mut store, &mut reviewer, &mut known, 1)
            .unwrap();

        let rules = session.learned_rules(&store);
        assert_eq!(
            rules,
            vec![
                KeywordRule::new("blue bottle coffee", "Food", "Blue Bottle"),
                KeywordRule::new("target", "Shopping", "Target"),
            ]
        );
    }

    #[test]
    fn test_known_labels_collect() {
        let mut store = store_with(&["A", "B"]);
        store.set_labels(0, "Food", "Cafe", LabelSource::Imported).unwrap();
        let rules = RuleEngine::new([KeywordRule::new("costco", "Groceries", "Costco")]).unwrap();

        let known = known_labels(&store, &rules);
        let types: Vec<&str> = known.business_types.iter().map(String::as_str).collect();
        assert_eq!(types, vec!["Food", "Groceries"]);
        assert_eq!(known.retailers.len(), 2);
    }
}
