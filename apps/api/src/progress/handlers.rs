use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::category::Skill;
use crate::progress::aggregator::{summarize, ProgressSummary};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ProgressQuery {
    pub user_id: Uuid,
    pub skill: Skill,
}

/// GET /api/v1/progress
///
/// `null` when the user has no attempts for the skill.
pub async fn handle_get_progress(
    State(state): State<AppState>,
    Query(params): Query<ProgressQuery>,
) -> Result<Json<Option<ProgressSummary>>, AppError> {
    let attempts = state.repo.list_attempts(params.user_id, params.skill).await?;
    Ok(Json(summarize(params.skill, &attempts)))
}
