//! Settings and keyword rules
//!
//! Loaded from the first of:
//! 1. an explicit path (`--config`)
//! 2. the user override at `<data_local_dir>/tally/config.toml`
//! 3. the default compiled into the binary
//!
//! An explicit path that does not exist yet falls through to the built-in default.
//!
//! Learned and added rules are written back to the explicit path, or to the user
//! override location when none was given.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::grouping::Grouper;
use crate::models::KeywordRule;
use crate::rules::RuleEngine;
use crate::store::validate_labels;

/// Embedded default configuration
pub const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Groups smaller than this are not offered for review
    pub min_group_size: usize,
    /// 1.0 groups by exact normalized key; lower values merge near keys
    pub similarity_threshold: f64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            min_group_size: 1,
            similarity_threshold: 1.0,
        }
    }
}

impl GroupingConfig {
    pub fn grouper(&self) -> Grouper {
        Grouper::with_threshold(self.similarity_threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Save manual labels as keyword rules after a run
    pub learn_rules: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { learn_rules: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grouping: GroupingConfig,
    pub session: SessionConfig,
    pub rules: Vec<KeywordRule>,
}

/// User override location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config.toml"))
}

/// Where rules are saved: the explicit path, else the user override
pub fn writable_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(default_config_path)
}

impl Config {
    /// Load configuration (explicit path, then user override, then embedded default)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let candidate = writable_config_path(explicit);

        match candidate {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                let content = fs::read_to_string(&path).map_err(|e| {
                    Error::InvalidData(format!("Failed to read config {}: {}", path.display(), e))
                })?;
                Self::parse(&content)
            }
            _ => {
                debug!("Using built-in default config");
                Self::parse(DEFAULT_CONFIG)
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        for rule in &config.rules {
            if rule.pattern.trim().is_empty() {
                return Err(Error::InvalidData("Rule with empty pattern".into()));
            }
            validate_labels(&rule.business_type, &rule.retailer).map_err(|_| {
                Error::InvalidData(format!(
                    "Rule '{}' needs both business_type and retailer",
                    rule.pattern
                ))
            })?;
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the config atomically, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml_string()?;
        let write_err = |source: std::io::Error| Error::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
        temp.write_all(content.as_bytes()).map_err(write_err)?;
        temp.flush().map_err(write_err)?;
        temp.persist(path).map_err(|e| write_err(e.error))?;

        info!("Saved {} rules to {}", self.rules.len(), path.display());
        Ok(())
    }

    pub fn rule_engine(&self) -> Result<RuleEngine> {
        RuleEngine::new(self.rules.iter().cloned())
    }

    /// Append rules whose pattern is not already present (case-insensitive).
    ///
    /// Returns how many were added.
    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = KeywordRule>) -> usize {
        let mut added = 0;
        for rule in rules {
            let pattern = rule.pattern.trim().to_lowercase();
            let exists = self
                .rules
                .iter()
                .any(|r| r.pattern.trim().to_lowercase() == pattern);
            if exists {
                debug!("Rule '{}' already present, skipping", rule.pattern);
                continue;
            }
            self.rules.push(rule);
            added += 1;
        }
        added
    }
}

/// Category database written by earlier versions of the tool
///
/// Three parallel lists: each description maps to the labels at the same index.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyDatabase {
    #[serde(default)]
    pub descriptions: Vec<String>,
    #[serde(default)]
    pub business_labels: Vec<String>,
    #[serde(default)]
    pub retailer_labels: Vec<String>,
}

impl LegacyDatabase {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Convert entries to contains rules, skipping ones without both labels
    pub fn into_rules(self) -> Result<Vec<KeywordRule>> {
        let n = self.descriptions.len();
        if self.business_labels.len() != n || self.retailer_labels.len() != n {
            return Err(Error::InvalidData(format!(
                "Category database lists differ in length: {} descriptions, {} business labels, {} retailer labels",
                n,
                self.business_labels.len(),
                self.retailer_labels.len()
            )));
        }

        let rules = self
            .descriptions
            .into_iter()
            .zip(self.business_labels)
            .zip(self.retailer_labels)
            .filter_map(|((desc, business), retailer)| {
                let (desc, business, retailer) = (desc.trim(), business.trim(), retailer.trim());
                if desc.is_empty() || business.is_empty() || retailer.is_empty() {
                    warn!("Skipping incomplete category entry '{}'", desc);
                    return None;
                }
                Some(KeywordRule::new(desc.to_lowercase(), business, retailer))
            })
            .collect();
        Ok(rules)
    }
}
