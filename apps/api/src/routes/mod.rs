pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::attempts::handlers as attempts;
use crate::practice::handlers as practice;
use crate::profile::handlers as profile;
use crate::progress::handlers as progress;
use crate::scoring::handlers as scoring;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Submissions
        .route(
            "/api/v1/writing/attempts",
            post(scoring::handle_submit_writing),
        )
        .route(
            "/api/v1/speaking/attempts",
            post(scoring::handle_submit_speaking),
        )
        // History & progress
        .route("/api/v1/attempts", get(attempts::handle_list_attempts))
        .route("/api/v1/attempts/:id", get(attempts::handle_get_attempt))
        .route("/api/v1/progress", get(progress::handle_get_progress))
        // Practice
        .route(
            "/api/v1/drafts",
            get(practice::handle_get_draft).put(practice::handle_save_draft),
        )
        .route("/api/v1/questions", get(practice::handle_list_questions))
        .route(
            "/api/v1/questions/:id",
            get(practice::handle_get_question),
        )
        // Profile
        .route("/api/v1/profile", get(profile::handle_get_profile))
        .route(
            "/api/v1/profile/redeem",
            post(profile::handle_redeem_invite),
        )
        .route("/api/v1/profile/upgrade", post(profile::handle_upgrade))
        .with_state(state)
}
