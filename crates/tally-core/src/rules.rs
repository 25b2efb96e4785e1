//! Keyword rule engine for automatic categorization
//!
//! Rules are checked in declaration order and the first match wins. Only records
//! without a business type are considered, so running the engine twice is a no-op
//! the second time.

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::error::Result;
use crate::models::{KeywordRule, LabelSource, MatchType};
use crate::store::RecordStore;

/// A rule with its pattern prepared for matching
#[derive(Debug)]
struct CompiledRule {
    rule: KeywordRule,
    matcher: Matcher,
}

#[derive(Debug)]
enum Matcher {
    /// Lowercased, space-stripped alternatives
    Contains(Vec<String>),
    Regex(Regex),
    /// Lowercased, trimmed pattern
    Exact(String),
}

impl Matcher {
    fn compile(rule: &KeywordRule) -> Result<Self> {
        Ok(match rule.match_type {
            MatchType::Contains => Self::Contains(
                rule.pattern
                    .split('|')
                    .map(squash)
                    .filter(|p| !p.is_empty())
                    .collect(),
            ),
            MatchType::Regex => Self::Regex(
                RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()?,
            ),
            MatchType::Exact => Self::Exact(rule.pattern.trim().to_lowercase()),
        })
    }

    fn is_match(&self, description: &str) -> bool {
        match self {
            Self::Contains(alternatives) => {
                let desc = squash(description);
                alternatives.iter().any(|p| desc.contains(p.as_str()))
            }
            Self::Regex(re) => re.is_match(description),
            Self::Exact(p) => description.trim().to_lowercase() == *p,
        }
    }
}

/// Lowercase and drop all whitespace, so "San Ramon" matches "SANRAMON"
fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Ordered keyword rules
#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    /// Compile rules in declaration order
    pub fn new(rules: impl IntoIterator<Item = KeywordRule>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let matcher = Matcher::compile(&rule)?;
                Ok(CompiledRule { rule, matcher })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &KeywordRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    /// Append a rule after all existing ones
    pub fn push(&mut self, rule: KeywordRule) -> Result<()> {
        let matcher = Matcher::compile(&rule)?;
        self.rules.push(CompiledRule { rule, matcher });
        Ok(())
    }

    /// First rule matching the description
    pub fn classify(&self, description: &str) -> Option<&KeywordRule> {
        self.rules
            .iter()
            .find(|c| c.matcher.is_match(description))
            .map(|c| &c.rule)
    }

    /// Every rule matching the description, in evaluation order
    pub fn matching_rules(&self, description: &str) -> Vec<&KeywordRule> {
        self.rules
            .iter()
            .filter(|c| c.matcher.is_match(description))
            .map(|c| &c.rule)
            .collect()
    }

    /// Label every uncategorized record that matches a rule.
    ///
    /// Returns the number of records labeled by this call.
    pub fn apply(&self, store: &mut RecordStore) -> Result<usize> {
        if self.rules.is_empty() {
            return Ok(0);
        }

        let mut labeled = 0;
        for id in store.uncategorized_ids() {
            let Some(description) = store.get(id).map(|r| r.description.clone()) else {
                continue;
            };

            if let Some(rule) = self.classify(&description) {
                if store.set_labels(id, &rule.business_type, &rule.retailer, LabelSource::Rule)? {
                    debug!(
                        "Rule '{}' matched '{}': {} / {}",
                        rule.pattern, description, rule.business_type, rule.retailer
                    );
                    labeled += 1;
                }
            }
        }

        debug!("Rule engine labeled {} transactions", labeled);
        Ok(labeled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionRecord;

    fn store_with(descriptions: &[&str]) -> RecordStore {
        RecordStore::from_records(
            descriptions
                .iter()
                .map(|d| TransactionRecord::new("Posted", "2024-01-01", *d, None, None, "Test"))
                .collect(),
        )
    }

    #[test]
    fn test_starbucks_rule() {
        let mut store = store_with(&["STARBUCKS #123"]);
        let engine = RuleEngine::new([KeywordRule::new("STARBUCKS", "Food", "Starbucks")]).unwrap();

        assert_eq!(engine.apply(&mut store).unwrap(), 1);
        let record = store.get(0).unwrap();
        assert_eq!(record.business_type.as_deref(), Some("Food"));
        assert_eq!(record.retailer.as_deref(), Some("Starbucks"));
        assert_eq!(record.label_source, Some(LabelSource::Rule));
    }

    #[test]
    fn test_first_match_wins() {
        let mut store = store_with(&["AMAZON PRIME VIDEO"]);
        let engine = RuleEngine::new([
            KeywordRule::new("prime video", "Entertainment", "Prime Video"),
            KeywordRule::new("amazon", "Shopping", "Amazon"),
        ])
        .unwrap();

        engine.apply(&mut store).unwrap();
        assert_eq!(
            store.get(0).unwrap().business_type.as_deref(),
            Some("Entertainment")
        );

        let reversed = RuleEngine::new([
            KeywordRule::new("amazon", "Shopping", "Amazon"),
            KeywordRule::new("prime video", "Entertainment", "Prime Video"),
        ])
        .unwrap();
        let mut store = store_with(&["AMAZON PRIME VIDEO"]);
        reversed.apply(&mut store).unwrap();
        assert_eq!(store.get(0).unwrap().business_type.as_deref(), Some("Shopping"));
    }

    #[test]
    fn test_space_insensitive_contains() {
        let engine = RuleEngine::new([KeywordRule::new("san ramon", "Personal", "Local")]).unwrap();
        assert!(engine.classify("WALMART SAN RAMON CA").is_some());
        assert!(engine.classify("WALMART SANRAMON CA").is_some());
        assert!(engine.classify("WALMART DUBLIN CA").is_none());
    }

    #[test]
    fn test_pipe_alternatives() {
        let engine =
            RuleEngine::new([KeywordRule::new("shell|chevron", "Transport", "Gas")]).unwrap();
        assert!(engine.classify("CHEVRON 0042").is_some());
        assert!(engine.classify("SHELL OIL").is_some());
        assert!(engine.classify("ARCO").is_none());
    }

    #[test]
    fn test_regex_and_exact() {
        let engine = RuleEngine::new([
            KeywordRule::new(r"^uber\s+(trip|eats)", "Transport", "Uber")
                .with_match_type(MatchType::Regex),
            KeywordRule::new("rent", "Housing", "Landlord").with_match_type(MatchType::Exact),
        ])
        .unwrap();

        assert_eq!(engine.classify("UBER TRIP 123").unwrap().retailer, "Uber");
        assert_eq!(engine.classify(" RENT ").unwrap().retailer, "Landlord");
        assert!(engine.classify("RENTAL CAR").is_none());
    }

    #[test]
    fn test_invalid_regex() {
        let result = RuleEngine::new([
            KeywordRule::new("(unclosed", "X", "Y").with_match_type(MatchType::Regex)
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut store = store_with(&["COSTCO WHOLESALE #123", "UNKNOWN SHOP", "COSTCO GAS"]);
        let engine = RuleEngine::new([KeywordRule::new("costco", "Groceries", "Costco")]).unwrap();

        assert_eq!(engine.apply(&mut store).unwrap(), 2);
        let snapshot = store.clone();
        assert_eq!(engine.apply(&mut store).unwrap(), 0);
        assert_eq!(store, snapshot);
    }

    #[test]
    fn test_does_not_overwrite_existing_labels() {
        let mut store = store_with(&["COSTCO WHOLESALE"]);
        store
            .set_labels(0, "Business", "Costco", LabelSource::Manual)
            .unwrap();

        let engine = RuleEngine::new([KeywordRule::new("costco", "Groceries", "Costco")]).unwrap();
        assert_eq!(engine.apply(&mut store).unwrap(), 0);
        assert_eq!(store.get(0).unwrap().business_type.as_deref(), Some("Business"));
    }

    #[test]
    fn test_empty_rule_set() {
        let mut store = store_with(&["ANYTHING"]);
        let engine = RuleEngine::default();
        assert_eq!(engine.apply(&mut store).unwrap(), 0);
        assert!(!store.get(0).unwrap().is_categorized());
    }

    #[test]
    fn test_matching_rules_lists_all() {
        let engine = RuleEngine::new([
            KeywordRule::new("amazon", "Shopping", "Amazon"),
            KeywordRule::new("costco", "Groceries", "Costco"),
            KeywordRule::new("prime", "Entertainment", "Prime Video"),
        ])
        .unwrap();

        let matches = engine.matching_rules("Amazon Prime Subscription");
        let patterns: Vec<&str> = matches.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["amazon", "prime"]);
    }
}
