//! Rule store: the immutable rule table consulted by the decision engine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;
use crate::models::{Interest, Rule, Stream, MAX_GPA};

/// Rule set compiled into the binary, used when no rule file is configured.
const BUNDLED_RULES: &str = include_str!("default_rules.json");

/// A loaded, validated rule table.
///
/// Construction goes through [`RuleSet::load`], which refuses empty or
/// malformed sources, so a `RuleSet` always has at least one rule. There are
/// no mutating methods; share it behind an `Arc`.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSet {
    version: String,
    rules: Vec<Rule>,
}

#[derive(Deserialize)]
struct RuleDocument {
    #[serde(default)]
    version: Option<String>,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Parse and validate a rule document.
    pub fn load(source: &str) -> Result<Self, AdvisorError> {
        let doc: RuleDocument = serde_json::from_str(source)
            .map_err(|e| AdvisorError::Config(format!("Malformed rule source: {e}")))?;

        if doc.rules.is_empty() {
            return Err(AdvisorError::Config("Rule source contains no rules".into()));
        }

        for (index, rule) in doc.rules.iter().enumerate() {
            if !rule.min_gpa.is_finite() || !(0.0..=MAX_GPA).contains(&rule.min_gpa) {
                return Err(AdvisorError::Config(format!(
                    "Rule #{index}: min_gpa {} is outside 0.0..={MAX_GPA:.1}",
                    rule.min_gpa
                )));
            }
            if rule.recommendation.trim().is_empty() {
                return Err(AdvisorError::Config(format!(
                    "Rule #{index}: recommendation is empty"
                )));
            }
        }

        Ok(Self {
            version: doc.version.unwrap_or_else(|| "unversioned".to_string()),
            rules: doc.rules,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, AdvisorError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            AdvisorError::Config(format!("Failed to read rule file {}: {e}", path.display()))
        })?;
        Self::load(&source)
    }

    pub fn bundled() -> Result<Self, AdvisorError> {
        Self::load(BUNDLED_RULES)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Find the winning rule for a profile.
    ///
    /// Candidates are rules whose stream and interest predicates match and
    /// whose `min_gpa` does not exceed `gpa`. The winner has the lowest
    /// priority; ties go to the highest `min_gpa`, then to declaration order.
    pub fn find_match(&self, stream: Stream, interest: Interest, gpa: f64) -> Option<&Rule> {
        self.rules
            .iter()
            .filter(|rule| rule.applies_to(stream, interest, gpa))
            // `min_by` keeps the first of equal elements, which gives declaration order.
            .min_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| b.min_gpa.total_cmp(&a.min_gpa))
            })
    }
}
