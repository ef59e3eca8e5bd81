use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An append-only note left by an advisor on a student's recommendation.
///
/// Entries are never edited or removed. The most recent entry per student
/// is what the student sees as "current feedback".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: Uuid,
    pub student_id: Uuid,
    /// Who left the feedback (advisor username or id).
    pub advisor_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Input for appending feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeedbackInput {
    pub advisor_id: String,
    pub text: String,
}

/// Latest-feedback lookup result. `feedback` is empty when none exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestFeedback {
    pub feedback: String,
}
