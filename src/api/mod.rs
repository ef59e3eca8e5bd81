mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::advisor::Advisor;

pub fn create_router(advisor: Advisor) -> Router {
    let api = Router::new()
        // Users
        .route("/users", post(handlers::register_user))
        .route("/users/by-name/{username}", get(handlers::get_user_by_username))
        // Students
        .route("/students", get(handlers::list_students))
        .route("/students/{id}/profile", get(handlers::get_profile))
        .route("/students/{id}/recommendation", post(handlers::evaluate_and_store))
        .route("/students/{id}/feedback", get(handlers::feedback_history))
        .route("/students/{id}/feedback", post(handlers::record_feedback))
        .route("/students/{id}/feedback/latest", get(handlers::latest_feedback))
        // Recommendations
        .route("/recommendations/preview", post(handlers::preview_recommendation))
        .route("/profiles", get(handlers::list_profiles))
        // Rules
        .route("/rules", get(handlers::list_rules))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(advisor)
}
