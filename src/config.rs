//! Runtime configuration, loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::engine::{FallbackPolicy, DEFAULT_RECOMMENDATION};

const DEFAULT_EVAL_TIMEOUT_MS: u64 = 2000;

#[derive(Clone, Debug)]
pub struct AdvisorConfig {
    /// SQLite file (from ADVISOR_DB_PATH). `None` uses the platform data dir.
    pub db_path: Option<PathBuf>,
    /// Rule file (from ADVISOR_RULES_PATH). `None` uses the bundled rules.
    pub rules_path: Option<PathBuf>,
    /// Fallback text when no rule matches (from ADVISOR_DEFAULT_RECOMMENDATION).
    pub default_recommendation: String,
    /// Upper bound on one rule evaluation (from ADVISOR_EVAL_TIMEOUT_MS).
    pub evaluation_timeout: Duration,
    /// Serve the default, flagged as degraded, when evaluation fails
    /// (from ADVISOR_DEGRADE_ON_FAILURE).
    pub degrade_on_failure: bool,
}

impl AdvisorConfig {
    pub fn from_env() -> Self {
        let db_path = std::env::var("ADVISOR_DB_PATH").ok().map(PathBuf::from);
        let rules_path = std::env::var("ADVISOR_RULES_PATH").ok().map(PathBuf::from);

        let default_recommendation = std::env::var("ADVISOR_DEFAULT_RECOMMENDATION")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string());

        let evaluation_timeout = std::env::var("ADVISOR_EVAL_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_EVAL_TIMEOUT_MS));

        let degrade_on_failure = std::env::var("ADVISOR_DEGRADE_ON_FAILURE")
            .ok()
            .map(|s| parse_flag(&s))
            .unwrap_or(false);

        Self {
            db_path,
            rules_path,
            default_recommendation,
            evaluation_timeout,
            degrade_on_failure,
        }
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        FallbackPolicy {
            default_recommendation: self.default_recommendation.clone(),
            degrade_on_failure: self.degrade_on_failure,
        }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            rules_path: None,
            default_recommendation: DEFAULT_RECOMMENDATION.to_string(),
            evaluation_timeout: Duration::from_millis(DEFAULT_EVAL_TIMEOUT_MS),
            degrade_on_failure: false,
        }
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
