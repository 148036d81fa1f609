//! Axum route handlers for the submission API.

use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::scoring::service::{
    submit_speaking, submit_writing, SpeakingSubmitRequest, SubmissionResponse,
    WritingSubmitRequest,
};
use crate::state::AppState;

/// POST /api/v1/writing/attempts
///
/// Scores an essay and records it as a writing attempt.
pub async fn handle_submit_writing(
    State(state): State<AppState>,
    Json(request): Json<WritingSubmitRequest>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let response = submit_writing(
        state.repo.as_ref(),
        &state.llm,
        state.config.force_pro_model,
        request,
    )
    .await?;
    Ok(Json(response))
}

/// POST /api/v1/speaking/attempts
///
/// Scores a spoken-answer transcript. Transcripts failing the speech guard
/// are recorded with a fixed low score and never reach the scoring engine.
pub async fn handle_submit_speaking(
    State(state): State<AppState>,
    Json(request): Json<SpeakingSubmitRequest>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let response = submit_speaking(
        state.repo.as_ref(),
        &state.llm,
        state.config.force_pro_model,
        request,
    )
    .await?;
    Ok(Json(response))
}
