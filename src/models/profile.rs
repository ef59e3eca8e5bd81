use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Interest, Stream, Vocabulary};
use crate::error::AdvisorError;

/// Number of subject/result slots on a profile.
pub const SUBJECT_SLOTS: usize = 3;

/// Highest GPA on the scale.
pub const MAX_GPA: f64 = 4.0;

/// Academic data as submitted by a caller, before validation.
///
/// Stream and interest arrive as free strings and are only accepted if they
/// belong to their closed vocabularies. A missing GPA is read as `0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSubmission {
    pub stream: String,
    pub interest: String,
    #[serde(default)]
    pub subjects: [String; SUBJECT_SLOTS],
    #[serde(default)]
    pub results: [String; SUBJECT_SLOTS],
    pub gpa: Option<f64>,
}

impl ProfileSubmission {
    /// Check the submission against the vocabularies and the GPA scale.
    pub fn validate(&self) -> Result<AcademicProfile, AdvisorError> {
        let stream = parse_vocabulary::<Stream>(&self.stream)?;
        let interest = parse_vocabulary::<Interest>(&self.interest)?;

        let gpa = self.gpa.unwrap_or(0.0);
        if !gpa.is_finite() || !(0.0..=MAX_GPA).contains(&gpa) {
            return Err(AdvisorError::Validation(format!(
                "GPA must be between 0.0 and {MAX_GPA:.1}, got {gpa}"
            )));
        }

        Ok(AcademicProfile {
            stream,
            interest,
            subjects: self.subjects.clone().map(|s| s.trim().to_string()),
            results: self.results.clone().map(|r| r.trim().to_string()),
            gpa,
        })
    }
}

fn parse_vocabulary<V: Vocabulary>(value: &str) -> Result<V, AdvisorError> {
    V::from_str(value.trim()).ok_or_else(|| {
        AdvisorError::Validation(format!("Unknown {} '{}'", V::KIND, value))
    })
}

/// A validated student profile: the input to rule evaluation.
///
/// `subjects` and `results` are positionally aligned; empty strings mark
/// unused slots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcademicProfile {
    pub stream: Stream,
    pub interest: Interest,
    pub subjects: [String; SUBJECT_SLOTS],
    pub results: [String; SUBJECT_SLOTS],
    pub gpa: f64,
}

/// The one persisted profile for a student.
///
/// There is at most one row per `student_id`; resubmitting replaces the
/// academic fields and the recommendation in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProfile {
    pub student_id: Uuid,
    #[serde(flatten)]
    pub profile: AcademicProfile,
    /// Last computed recommendation. `None` until the first evaluation.
    pub recommendation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One roster line for the advisor view.
///
/// Users who have not submitted a profile yet appear with empty academic
/// fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSummary {
    pub student_id: Uuid,
    pub username: String,
    pub stream: Option<Stream>,
    pub interest: Option<Interest>,
    pub recommendation: Option<String>,
    pub gpa: Option<f64>,
}

/// Outcome of running the decision engine over a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub recommendation: String,
    /// `true` if a rule fired, `false` if the default was used.
    pub matched_by_rule: bool,
    /// `true` when rule evaluation failed and the default was substituted.
    #[serde(default)]
    pub degraded: bool,
    pub profile: AcademicProfile,
}

/// What callers of `evaluate_and_store` get back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub recommendation: String,
    pub matched_by_rule: bool,
    #[serde(default)]
    pub degraded: bool,
}

impl From<RecommendationResult> for Evaluation {
    fn from(result: RecommendationResult) -> Self {
        Self {
            recommendation: result.recommendation,
            matched_by_rule: result.matched_by_rule,
            degraded: result.degraded,
        }
    }
}
