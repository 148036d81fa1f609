use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::category::Skill;
use crate::models::question::{Draft, Question};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct QuestionsQuery {
    pub skill: Option<Skill>,
}

#[derive(Deserialize)]
pub struct DraftQuery {
    pub user_id: Uuid,
    pub question_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveDraftRequest {
    pub user_id: Uuid,
    pub question_id: String,
    pub text: String,
}

/// GET /api/v1/questions
pub async fn handle_list_questions(
    State(state): State<AppState>,
    Query(params): Query<QuestionsQuery>,
) -> Result<Json<Vec<Question>>, AppError> {
    let questions = state.repo.list_questions(params.skill).await?;
    Ok(Json(questions))
}

/// GET /api/v1/questions/:id
pub async fn handle_get_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Question>, AppError> {
    let question = state
        .repo
        .get_question(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Question {id} not found")))?;
    Ok(Json(question))
}

/// PUT /api/v1/drafts
///
/// Last write wins; an empty text is stored like any other.
pub async fn handle_save_draft(
    State(state): State<AppState>,
    Json(req): Json<SaveDraftRequest>,
) -> Result<StatusCode, AppError> {
    if req.question_id.trim().is_empty() {
        return Err(AppError::Validation("question_id is required".to_string()));
    }

    let draft = Draft {
        user_id: req.user_id,
        question_id: req.question_id,
        text: req.text,
        updated_at: Utc::now(),
    };
    state.repo.save_draft(&draft).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/drafts
pub async fn handle_get_draft(
    State(state): State<AppState>,
    Query(params): Query<DraftQuery>,
) -> Result<Json<Draft>, AppError> {
    let draft = state
        .repo
        .get_draft(params.user_id, &params.question_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No draft for question {}", params.question_id))
        })?;
    Ok(Json(draft))
}
