use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::advisor::Advisor;
use crate::error::AdvisorError;
use crate::models::*;
use crate::rules::RuleSet;

// ============================================================
// Error Handling
// ============================================================

/// Map an advisor error to a status and body.
///
/// Caller mistakes are returned as-is. Storage failures are logged in full
/// and the client only sees a generic message.
fn error_response(e: AdvisorError) -> (StatusCode, String) {
    match e {
        AdvisorError::Validation(msg) => {
            tracing::warn!("Validation error: {}", msg);
            (StatusCode::BAD_REQUEST, msg)
        }
        AdvisorError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        e @ (AdvisorError::Computation(_) | AdvisorError::Config(_)) => {
            tracing::error!("{}", e);
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        e @ AdvisorError::Persistence(_) => {
            tracing::error!("Internal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

fn parse_role(role: Option<&str>) -> Result<Option<Role>, (StatusCode, String)> {
    role.map(|r| {
        Role::from_str(r).ok_or_else(|| (StatusCode::BAD_REQUEST, format!("Unknown role '{r}'")))
    })
    .transpose()
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Users
// ============================================================

pub async fn register_user(
    State(advisor): State<Advisor>,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), (StatusCode, String)> {
    advisor
        .register_user(input)
        .map(|u| (StatusCode::CREATED, Json(u)))
        .map_err(error_response)
}

pub async fn get_user_by_username(
    State(advisor): State<Advisor>,
    Path(username): Path<String>,
) -> Result<Json<User>, (StatusCode, String)> {
    advisor
        .get_user_by_username(&username)
        .map(Json)
        .map_err(error_response)
}

// ============================================================
// Students
// ============================================================

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    pub role: Option<String>,
}

pub async fn list_students(
    State(advisor): State<Advisor>,
    Query(query): Query<RoleQuery>,
) -> Result<Json<Vec<StudentSummary>>, (StatusCode, String)> {
    let role = parse_role(query.role.as_deref())?;
    advisor.list_students(role).map(Json).map_err(error_response)
}

pub async fn list_profiles(
    State(advisor): State<Advisor>,
    Query(query): Query<RoleQuery>,
) -> Result<Json<Vec<StoredProfile>>, (StatusCode, String)> {
    let role = parse_role(query.role.as_deref())?;
    advisor.list_profiles(role).map(Json).map_err(error_response)
}

pub async fn get_profile(
    State(advisor): State<Advisor>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoredProfile>, (StatusCode, String)> {
    advisor.get_profile(id).map(Json).map_err(error_response)
}

// ============================================================
// Recommendations
// ============================================================

pub async fn evaluate_and_store(
    State(advisor): State<Advisor>,
    Path(id): Path<Uuid>,
    Json(submission): Json<ProfileSubmission>,
) -> Result<Json<Evaluation>, (StatusCode, String)> {
    advisor
        .evaluate_and_store(id, &submission)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn preview_recommendation(
    State(advisor): State<Advisor>,
    Json(submission): Json<ProfileSubmission>,
) -> Result<Json<RecommendationResult>, (StatusCode, String)> {
    advisor
        .preview(&submission)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn list_rules(State(advisor): State<Advisor>) -> Json<RuleSet> {
    Json(advisor.rules().clone())
}

// ============================================================
// Feedback
// ============================================================

pub async fn record_feedback(
    State(advisor): State<Advisor>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateFeedbackInput>,
) -> Result<(StatusCode, Json<FeedbackEntry>), (StatusCode, String)> {
    advisor
        .record_feedback(id, &input.advisor_id, &input.text)
        .map(|f| (StatusCode::CREATED, Json(f)))
        .map_err(error_response)
}

pub async fn latest_feedback(
    State(advisor): State<Advisor>,
    Path(id): Path<Uuid>,
) -> Result<Json<LatestFeedback>, (StatusCode, String)> {
    advisor
        .latest_feedback(id)
        .map(|feedback| Json(LatestFeedback { feedback }))
        .map_err(error_response)
}

pub async fn feedback_history(
    State(advisor): State<Advisor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<FeedbackEntry>>, (StatusCode, String)> {
    advisor
        .feedback_history(id)
        .map(Json)
        .map_err(error_response)
}
