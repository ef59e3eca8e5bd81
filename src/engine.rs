//! Decision engine: turns a student profile into a recommendation.
//!
//! The engine is pure with respect to external state. Persisting the result
//! is a separate step owned by [`crate::advisor::Advisor`].

use std::sync::Arc;

use crate::error::AdvisorError;
use crate::models::{AcademicProfile, ProfileSubmission, RecommendationResult, Vocabulary};
use crate::rules::RuleSet;

/// Fallback text when no rule fires.
pub const DEFAULT_RECOMMENDATION: &str = "General Studies / Design & Multimedia";

/// Something that can evaluate a profile against a rule base.
///
/// `Ok(None)` means no rule matched, which is a normal outcome. `Err` is
/// reserved for evaluation failures and must be an
/// [`AdvisorError::Computation`].
pub trait RuleEvaluator: Send + Sync {
    fn evaluate(&self, profile: &AcademicProfile) -> Result<Option<String>, AdvisorError>;
}

impl RuleEvaluator for RuleSet {
    fn evaluate(&self, profile: &AcademicProfile) -> Result<Option<String>, AdvisorError> {
        Ok(self
            .find_match(profile.stream, profile.interest, profile.gpa)
            .map(|rule| rule.recommendation.clone()))
    }
}

/// What to return when no rule matches or evaluation fails.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    pub default_recommendation: String,
    /// Substitute the default on evaluation failure instead of erroring.
    pub degrade_on_failure: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            default_recommendation: DEFAULT_RECOMMENDATION.to_string(),
            degrade_on_failure: false,
        }
    }
}

pub struct DecisionEngine {
    evaluator: Arc<dyn RuleEvaluator>,
    policy: FallbackPolicy,
}

impl DecisionEngine {
    pub fn new(evaluator: Arc<dyn RuleEvaluator>, policy: FallbackPolicy) -> Self {
        Self { evaluator, policy }
    }

    /// Validate a submission and evaluate it.
    pub fn recommend(
        &self,
        submission: &ProfileSubmission,
    ) -> Result<RecommendationResult, AdvisorError> {
        let profile = submission.validate()?;
        self.evaluate(profile)
    }

    /// Evaluate an already validated profile.
    pub fn evaluate(&self, profile: AcademicProfile) -> Result<RecommendationResult, AdvisorError> {
        match self.evaluator.evaluate(&profile) {
            Ok(Some(recommendation)) => {
                tracing::debug!(
                    stream = profile.stream.as_str(),
                    interest = profile.interest.as_str(),
                    gpa = profile.gpa,
                    %recommendation,
                    "Rule matched"
                );
                Ok(RecommendationResult {
                    recommendation,
                    matched_by_rule: true,
                    degraded: false,
                    profile,
                })
            }
            Ok(None) => {
                tracing::debug!(
                    stream = profile.stream.as_str(),
                    interest = profile.interest.as_str(),
                    gpa = profile.gpa,
                    "No rule matched, using default recommendation"
                );
                Ok(RecommendationResult {
                    recommendation: self.policy.default_recommendation.clone(),
                    matched_by_rule: false,
                    degraded: false,
                    profile,
                })
            }
            Err(e) => self.degrade(profile, e),
        }
    }

    /// Apply the failure policy: either the flagged default or the error.
    pub fn degrade(
        &self,
        profile: AcademicProfile,
        error: AdvisorError,
    ) -> Result<RecommendationResult, AdvisorError> {
        if !self.policy.degrade_on_failure {
            return Err(error);
        }

        tracing::warn!("Rule evaluation failed, serving default in degraded mode: {}", error);
        Ok(RecommendationResult {
            recommendation: self.policy.default_recommendation.clone(),
            matched_by_rule: false,
            degraded: true,
            profile,
        })
    }
}
