//! The advisor facade consumed by request layers (HTTP, CLI).
//!
//! It composes the decision engine and the database into the operations
//! callers actually need. `evaluate_and_store` is one unit of work: a
//! computed recommendation is either persisted or the failure is returned.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::config::AdvisorConfig;
use crate::db::Database;
use crate::engine::{DecisionEngine, RuleEvaluator};
use crate::error::AdvisorError;
use crate::models::*;
use crate::rules::RuleSet;

#[derive(Clone)]
pub struct Advisor {
    db: Database,
    rules: Arc<RuleSet>,
    engine: Arc<DecisionEngine>,
    evaluation_timeout: Duration,
}

impl Advisor {
    /// Build an advisor that evaluates profiles against `rules` in process.
    pub fn new(db: Database, rules: Arc<RuleSet>, config: &AdvisorConfig) -> Self {
        let evaluator: Arc<dyn RuleEvaluator> = rules.clone();
        Self::with_evaluator(db, rules, evaluator, config)
    }

    /// Build an advisor with a custom evaluator. `rules` is still what the
    /// advisor reports as its loaded rule set.
    pub fn with_evaluator(
        db: Database,
        rules: Arc<RuleSet>,
        evaluator: Arc<dyn RuleEvaluator>,
        config: &AdvisorConfig,
    ) -> Self {
        Self {
            db,
            rules,
            engine: Arc::new(DecisionEngine::new(evaluator, config.fallback_policy())),
            evaluation_timeout: config.evaluation_timeout,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    // ============================================================
    // Users
    // ============================================================

    pub fn register_user(&self, input: CreateUserInput) -> Result<User, AdvisorError> {
        if input.username.trim().is_empty() {
            return Err(AdvisorError::Validation("Username must not be empty".into()));
        }

        let user = self
            .db
            .create_user(input)
            .map_err(AdvisorError::Persistence)?
            .ok_or_else(|| AdvisorError::Validation("Username already exists".into()))?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "Registered user {}", user.username);
        Ok(user)
    }

    pub fn get_user(&self, id: Uuid) -> Result<User, AdvisorError> {
        self.db
            .get_user(id)
            .map_err(AdvisorError::Persistence)?
            .ok_or_else(|| AdvisorError::NotFound(format!("User {id} not found")))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<User, AdvisorError> {
        self.db
            .get_user_by_username(username)
            .map_err(AdvisorError::Persistence)?
            .ok_or_else(|| AdvisorError::NotFound(format!("User '{username}' not found")))
    }

    // ============================================================
    // Recommendations
    // ============================================================

    /// Run the decision engine without persisting anything.
    pub async fn preview(
        &self,
        submission: &ProfileSubmission,
    ) -> Result<RecommendationResult, AdvisorError> {
        let profile = submission.validate()?;
        self.decide(profile).await
    }

    /// Evaluate a submission and store it as the student's current profile.
    ///
    /// Fails with `Validation` for bad input, `Computation` when evaluation
    /// fails outside degraded mode, `NotFound` when the student does not
    /// exist (checked after the decision), and `Persistence` on storage
    /// failure.
    pub async fn evaluate_and_store(
        &self,
        student_id: Uuid,
        submission: &ProfileSubmission,
    ) -> Result<Evaluation, AdvisorError> {
        let profile = submission.validate()?;
        let result = self.decide(profile).await?;

        let stored = self
            .db
            .upsert_profile(student_id, &result.profile, Some(&result.recommendation))
            .map_err(AdvisorError::Persistence)?
            .ok_or_else(|| AdvisorError::student_not_found(student_id))?;

        tracing::info!(
            %student_id,
            matched_by_rule = result.matched_by_rule,
            degraded = result.degraded,
            updated_at = %stored.updated_at,
            "Stored recommendation: {}",
            result.recommendation
        );

        Ok(result.into())
    }

    /// Evaluate on a blocking task, bounded by the configured timeout.
    async fn decide(&self, profile: AcademicProfile) -> Result<RecommendationResult, AdvisorError> {
        let engine = self.engine.clone();
        let task = tokio::task::spawn_blocking({
            let profile = profile.clone();
            move || engine.evaluate(profile)
        });

        match tokio::time::timeout(self.evaluation_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => self.engine.degrade(
                profile,
                AdvisorError::Computation(format!("Rule evaluation task failed: {join_error}")),
            ),
            Err(_) => self.engine.degrade(
                profile,
                AdvisorError::Computation(format!(
                    "Rule evaluation timed out after {} ms",
                    self.evaluation_timeout.as_millis()
                )),
            ),
        }
    }

    pub fn get_profile(&self, student_id: Uuid) -> Result<StoredProfile, AdvisorError> {
        self.db
            .get_profile(student_id)
            .map_err(AdvisorError::Persistence)?
            .ok_or_else(|| AdvisorError::NotFound(format!("No profile for student {student_id}")))
    }

    pub fn list_profiles(&self, role: Option<Role>) -> Result<Vec<StoredProfile>, AdvisorError> {
        self.db.list_profiles(role).map_err(AdvisorError::Persistence)
    }

    /// Roster for the advisor view.
    pub fn list_students(&self, role: Option<Role>) -> Result<Vec<StudentSummary>, AdvisorError> {
        self.db.list_students(role).map_err(AdvisorError::Persistence)
    }

    // ============================================================
    // Feedback
    // ============================================================

    pub fn record_feedback(
        &self,
        student_id: Uuid,
        advisor_id: &str,
        text: &str,
    ) -> Result<FeedbackEntry, AdvisorError> {
        if advisor_id.trim().is_empty() {
            return Err(AdvisorError::Validation("Advisor id must not be empty".into()));
        }
        if text.trim().is_empty() {
            return Err(AdvisorError::Validation("Feedback text must not be empty".into()));
        }

        let entry = self
            .db
            .append_feedback(
                student_id,
                CreateFeedbackInput {
                    advisor_id: advisor_id.trim().to_string(),
                    text: text.to_string(),
                },
            )
            .map_err(AdvisorError::Persistence)?
            .ok_or_else(|| AdvisorError::student_not_found(student_id))?;

        tracing::info!(%student_id, advisor_id = %entry.advisor_id, "Recorded feedback");
        Ok(entry)
    }

    /// Text of the most recent feedback, or an empty string if there is none.
    pub fn latest_feedback(&self, student_id: Uuid) -> Result<String, AdvisorError> {
        Ok(self
            .db
            .latest_feedback(student_id)
            .map_err(AdvisorError::Persistence)?
            .map(|entry| entry.text)
            .unwrap_or_default())
    }

    pub fn feedback_history(&self, student_id: Uuid) -> Result<Vec<FeedbackEntry>, AdvisorError> {
        let user = self
            .db
            .get_user(student_id)
            .map_err(AdvisorError::Persistence)?;
        if !user.is_some_and(|u| u.role == Role::Student) {
            return Err(AdvisorError::student_not_found(student_id));
        }
        self.db
            .feedback_history(student_id)
            .map_err(AdvisorError::Persistence)
    }
}
