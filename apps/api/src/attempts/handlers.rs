use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::attempt::Attempt;
use crate::models::category::Skill;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub user_id: Uuid,
    pub skill: Skill,
}

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// GET /api/v1/attempts
///
/// Newest first.
pub async fn handle_list_attempts(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<Attempt>>, AppError> {
    let attempts = state.repo.list_attempts(params.user_id, params.skill).await?;
    Ok(Json(attempts))
}

/// GET /api/v1/attempts/:id
pub async fn handle_get_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Attempt>, AppError> {
    // Another user's attempt is indistinguishable from a missing one.
    let attempt = state
        .repo
        .get_attempt(params.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attempt {id} not found")))?;
    Ok(Json(attempt))
}
