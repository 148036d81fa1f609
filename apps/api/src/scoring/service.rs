//! Submit flows: resolve the canonical task, pick the model tier, score,
//! and persist the attempt.
//!
//! Flow (writing):  validate → resolve task → profile → tier → build request →
//!                  LLM → parse → persist → respond.
//! Flow (speaking): validate → resolve task → speech guard → (same as writing).
//!
//! Scoring either fully succeeds or fails. A persistence failure after a
//! successful score is logged and the score is still returned, without an id.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::attempt::NewAttempt;
use crate::models::category::{Category, Skill, SpeakingPart, WritingModule, WritingTask};
use crate::models::score::ScoreRecord;
use crate::scoring::word_count_u32;
use crate::scoring::guard::{check_transcript, rejection_record};
use crate::scoring::parser::{parse_speaking_score, parse_writing_score};
use crate::scoring::request::{
    build_speaking_request, build_writing_request, ScoringRequest, SpeakingInput, WritingInput,
};
use crate::scoring::tier::{select_tier, ModelTier};
use crate::store::Repository;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct WritingSubmitRequest {
    pub user_id: Uuid,
    pub question_id: String,
    /// Only consulted when the question is not in the question bank.
    pub module: Option<WritingModule>,
    pub task: Option<WritingTask>,
    pub prompt_text: Option<String>,
    pub essay: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeakingSubmitRequest {
    pub user_id: Uuid,
    pub question_id: String,
    pub part: Option<SpeakingPart>,
    pub prompt_text: Option<String>,
    pub transcript: String,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    /// `None` when the score could not be saved.
    pub attempt_id: Option<Uuid>,
    pub tier: Option<ModelTier>,
    pub model: Option<String>,
    pub word_count: u32,
    pub overall: Option<f64>,
    pub computed_overall: Option<f64>,
    pub rejected: bool,
    pub score: ScoreRecord,
}

/// The task as scored: stored question data when the question id resolves,
/// otherwise the client-supplied fields.
#[derive(Debug)]
struct ResolvedTask {
    prompt_text: String,
    min_words: u32,
    category: Category,
}

// ────────────────────────────────────────────────────────────────────────────
// Flows
// ────────────────────────────────────────────────────────────────────────────

pub async fn submit_writing(
    repo: &dyn Repository,
    llm: &LlmClient,
    force_pro: bool,
    request: WritingSubmitRequest,
) -> Result<SubmissionResponse, AppError> {
    let essay = request.essay.trim();
    if essay.is_empty() {
        return Err(AppError::Validation("essay cannot be empty".to_string()));
    }

    let client_category = match (request.module, request.task) {
        (Some(module), Some(task)) => Some(Category::Writing { module, task }),
        _ => None,
    };
    let resolved = resolve_task(
        repo,
        Skill::Writing,
        &request.question_id,
        client_category,
        request.prompt_text.as_deref(),
    )
    .await?;
    let Category::Writing { module, task } = resolved.category else {
        return Err(AppError::Internal(anyhow::anyhow!(
            "question {} resolved to a non-writing category",
            request.question_id
        )));
    };

    let word_count = word_count_u32(essay);
    let tier = resolve_tier(repo, request.user_id, force_pro).await?;
    let scoring_request = build_writing_request(
        tier,
        &WritingInput {
            module,
            task,
            prompt_text: &resolved.prompt_text,
            min_words: resolved.min_words,
            essay,
            word_count,
        },
    );

    info!(
        "Scoring {} essay for user {} with {} ({word_count} words)",
        resolved.category.label(),
        request.user_id,
        scoring_request.model
    );
    let text = call_engine(llm, &scoring_request).await?;
    let score = parse_writing_score(&text)
        .map_err(|e| AppError::Llm(format!("Unusable writing score: {e}")))?;

    let attempt_id = persist(
        repo,
        NewAttempt {
            user_id: request.user_id,
            question_id: request.question_id,
            body: essay.to_string(),
            word_count,
            category: resolved.category,
            score: Some(score.clone()),
            model: Some(scoring_request.model.to_string()),
        },
    )
    .await;

    Ok(respond(attempt_id, Some(tier), word_count, score))
}

pub async fn submit_speaking(
    repo: &dyn Repository,
    llm: &LlmClient,
    force_pro: bool,
    request: SpeakingSubmitRequest,
) -> Result<SubmissionResponse, AppError> {
    let transcript = request.transcript.trim();
    if transcript.is_empty() {
        return Err(AppError::Validation("transcript cannot be empty".to_string()));
    }

    let resolved = resolve_task(
        repo,
        Skill::Speaking,
        &request.question_id,
        request.part.map(|part| Category::Speaking { part }),
        request.prompt_text.as_deref(),
    )
    .await?;
    let Category::Speaking { part } = resolved.category else {
        return Err(AppError::Internal(anyhow::anyhow!(
            "question {} resolved to a non-speaking category",
            request.question_id
        )));
    };

    let word_count = word_count_u32(transcript);
    let mut attempt = NewAttempt {
        user_id: request.user_id,
        question_id: request.question_id,
        body: transcript.to_string(),
        word_count,
        category: resolved.category,
        score: None,
        model: None,
    };

    if let Some(reason) = check_transcript(transcript) {
        info!(
            "Speech guard rejected transcript for user {} ({reason:?}, {word_count} words)",
            request.user_id
        );
        let score = rejection_record(reason);
        attempt.score = Some(score.clone());
        let attempt_id = persist(repo, attempt).await;
        return Ok(respond(attempt_id, None, word_count, score));
    }

    let tier = resolve_tier(repo, request.user_id, force_pro).await?;
    let scoring_request = build_speaking_request(
        tier,
        &SpeakingInput {
            part,
            prompt_text: &resolved.prompt_text,
            transcript,
            word_count,
        },
    );

    info!(
        "Scoring {} transcript for user {} with {} ({word_count} words)",
        resolved.category.label(),
        request.user_id,
        scoring_request.model
    );
    let text = call_engine(llm, &scoring_request).await?;
    let score = parse_speaking_score(&text)
        .map_err(|e| AppError::Llm(format!("Unusable speaking score: {e}")))?;

    attempt.score = Some(score.clone());
    attempt.model = Some(scoring_request.model.to_string());
    let attempt_id = persist(repo, attempt).await;

    Ok(respond(attempt_id, Some(tier), word_count, score))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn resolve_task(
    repo: &dyn Repository,
    skill: Skill,
    question_id: &str,
    client_category: Option<Category>,
    client_prompt: Option<&str>,
) -> Result<ResolvedTask, AppError> {
    if question_id.trim().is_empty() {
        return Err(AppError::Validation("question_id cannot be empty".to_string()));
    }

    if let Some(question) = repo.get_question(question_id).await? {
        if question.category.skill() != skill {
            return Err(AppError::Validation(format!(
                "question {question_id} is not a {skill} question"
            )));
        }
        return Ok(ResolvedTask {
            prompt_text: question.prompt_text,
            min_words: question.min_words,
            category: question.category,
        });
    }

    let prompt_text = client_prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            AppError::Validation(format!(
                "question {question_id} is not in the question bank and no prompt_text was supplied"
            ))
        })?;
    let category = client_category
        .filter(|c| c.skill() == skill)
        .ok_or_else(|| {
            AppError::Validation(match skill {
                Skill::Writing => "module and task are required for unlisted questions".to_string(),
                Skill::Speaking => "part is required for unlisted questions".to_string(),
            })
        })?;
    let min_words = match category {
        Category::Writing { task, .. } => task.default_min_words(),
        Category::Speaking { .. } => 0,
    };

    Ok(ResolvedTask {
        prompt_text: prompt_text.to_string(),
        min_words,
        category,
    })
}

async fn resolve_tier(
    repo: &dyn Repository,
    user_id: Uuid,
    force_pro: bool,
) -> Result<ModelTier, AppError> {
    let profile = repo.get_or_create_profile(user_id).await?;
    Ok(select_tier(force_pro, profile.is_pro(Utc::now())))
}

async fn call_engine(llm: &LlmClient, request: &ScoringRequest) -> Result<String, AppError> {
    llm.complete(
        request.model,
        &request.system,
        &request.prompt,
        request.max_tokens,
    )
    .await
    .map_err(|e| AppError::Llm(format!("Scoring call to {} failed: {e}", request.model)))
}

async fn persist(repo: &dyn Repository, attempt: NewAttempt) -> Option<Uuid> {
    let user_id = attempt.user_id;
    match repo.insert_attempt(attempt).await {
        Ok(saved) => Some(saved.id),
        Err(e) => {
            error!("Scored attempt for user {user_id} could not be saved: {e}");
            None
        }
    }
}

fn respond(
    attempt_id: Option<Uuid>,
    tier: Option<ModelTier>,
    word_count: u32,
    score: ScoreRecord,
) -> SubmissionResponse {
    SubmissionResponse {
        attempt_id,
        tier,
        model: tier.map(|t| t.model_id().to_string()),
        word_count,
        overall: score.overall(),
        computed_overall: score.computed_overall(),
        rejected: score.rejected_reason.is_some(),
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::{Plan, Profile};
    use crate::models::question::Question;
    use crate::store::memory::MemoryRepository;
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENGINE_WRITING_TEXT: &str = "```json\n{\"task_response\": 6.5, \
        \"coherence_cohesion\": 7, \
        \"lexical_resource\": 6.5, \"grammatical_range_accuracy\": 6, \"overall\": 6.5, \
        \"feedback\": {\"task_response\": \"a\", \"coherence_cohesion\": \"b\", \
        \"lexical_resource\": \"c\", \"grammatical_range_accuracy\": \"d\", \
        \"strengths\": \"e\", \"improvements\": \"f\"}, \"weaknesses\": [\"article use\"]}\n```";

    const ESSAY: &str = "Many people believe that cars should be banned from city centres. \
        I partly agree, because traffic causes pollution, \
        but a complete ban would hurt businesses.";

    fn engine_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": text}],
            "usage": {"input_tokens": 500, "output_tokens": 200}
        }))
    }

    fn bank() -> Vec<Question> {
        vec![Question {
            id: "w2-cars".to_string(),
            prompt_text: "Cars should be banned from city centres. Discuss.".to_string(),
            min_words: 250,
            category: Category::Writing {
                module: WritingModule::Academic,
                task: WritingTask::Task2,
            },
        }]
    }

    fn writing_request(user_id: Uuid, question_id: &str) -> WritingSubmitRequest {
        WritingSubmitRequest {
            user_id,
            question_id: question_id.to_string(),
            module: None,
            task: None,
            prompt_text: Some("client supplied prompt".to_string()),
            essay: ESSAY.to_string(),
        }
    }

    async fn llm_for(server: &MockServer) -> LlmClient {
        LlmClient::new("test-key".to_string(), server.uri()).unwrap()
    }

    #[tokio::test]
    async fn test_writing_uses_stored_prompt_and_persists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_string_contains("Cars should be banned from city centres. Discuss."))
            .and(body_partial_json(serde_json::json!({"model": "claude-haiku-4-5"})))
            .respond_with(engine_reply(ENGINE_WRITING_TEXT))
            .expect(1)
            .mount(&server)
            .await;

        let repo = MemoryRepository::with_questions(bank());
        let user_id = Uuid::new_v4();
        let resp = submit_writing(
            &repo,
            &llm_for(&server).await,
            false,
            writing_request(user_id, "w2-cars"),
        )
        .await
        .unwrap();

        assert!(resp.attempt_id.is_some());
        assert_eq!(resp.overall, Some(6.5));
        assert_eq!(resp.tier, Some(ModelTier::Free));
        assert!(!resp.rejected);

        let saved = repo.list_attempts(user_id, Skill::Writing).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].score.as_ref().unwrap().weaknesses, vec!["article use"]);
        assert_eq!(saved[0].model.as_deref(), Some("claude-haiku-4-5"));
    }

    #[tokio::test]
    async fn test_pro_profile_selects_pro_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(serde_json::json!({"model": "claude-sonnet-4-5"})))
            .respond_with(engine_reply(ENGINE_WRITING_TEXT))
            .expect(1)
            .mount(&server)
            .await;

        let repo = MemoryRepository::with_questions(bank());
        let user_id = Uuid::new_v4();
        let mut profile = Profile::new(user_id, Utc::now());
        profile.plan = Plan::Pro;
        repo.put_profile(profile);

        let resp = submit_writing(
            &repo,
            &llm_for(&server).await,
            false,
            writing_request(user_id, "w2-cars"),
        )
        .await
        .unwrap();
        assert_eq!(resp.tier, Some(ModelTier::Pro));
    }

    #[tokio::test]
    async fn test_operator_override_selects_pro_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(serde_json::json!({"model": "claude-sonnet-4-5"})))
            .respond_with(engine_reply(ENGINE_WRITING_TEXT))
            .expect(1)
            .mount(&server)
            .await;

        let repo = MemoryRepository::with_questions(bank());
        let resp = submit_writing(
            &repo,
            &llm_for(&server).await,
            true,
            writing_request(Uuid::new_v4(), "w2-cars"),
        )
        .await
        .unwrap();
        assert_eq!(resp.model.as_deref(), Some("claude-sonnet-4-5"));
    }

    #[tokio::test]
    async fn test_unlisted_question_needs_module_and_task() {
        let server = MockServer::start().await;
        let repo = MemoryRepository::default();
        let err = submit_writing(
            &repo,
            &llm_for(&server).await,
            false,
            writing_request(Uuid::new_v4(), "custom-1"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unlisted_question_uses_client_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_string_contains("client supplied prompt"))
            .and(body_string_contains("MINIMUM WORDS: 150"))
            .respond_with(engine_reply(ENGINE_WRITING_TEXT))
            .expect(1)
            .mount(&server)
            .await;

        let repo = MemoryRepository::default();
        let mut request = writing_request(Uuid::new_v4(), "custom-1");
        request.module = Some(WritingModule::General);
        request.task = Some(WritingTask::Task1);
        let resp = submit_writing(&repo, &llm_for(&server).await, false, request)
            .await
            .unwrap();
        assert!(resp.attempt_id.is_some());
    }

    #[tokio::test]
    async fn test_malformed_engine_output_is_llm_error_and_not_saved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(engine_reply("Overall I would give this essay a 6.5."))
            .mount(&server)
            .await;

        let repo = MemoryRepository::with_questions(bank());
        let err = submit_writing(
            &repo,
            &llm_for(&server).await,
            false,
            writing_request(Uuid::new_v4(), "w2-cars"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
        assert_eq!(repo.attempt_count(), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_still_returns_score() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(engine_reply(ENGINE_WRITING_TEXT))
            .mount(&server)
            .await;

        let repo = MemoryRepository::with_questions(bank()).failing_inserts();
        let resp = submit_writing(
            &repo,
            &llm_for(&server).await,
            false,
            writing_request(Uuid::new_v4(), "w2-cars"),
        )
        .await
        .unwrap();
        assert_eq!(resp.attempt_id, None);
        assert_eq!(resp.overall, Some(6.5));
    }

    #[tokio::test]
    async fn test_short_transcript_never_reaches_engine() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(engine_reply("{}"))
            .expect(0)
            .mount(&server)
            .await;

        let repo = MemoryRepository::default();
        let user_id = Uuid::new_v4();
        let resp = submit_speaking(
            &repo,
            &llm_for(&server).await,
            false,
            SpeakingSubmitRequest {
                user_id,
                question_id: "s1-home".to_string(),
                part: Some(SpeakingPart::Part1),
                prompt_text: Some("Tell me about your home town.".to_string()),
                transcript: "I like my home town".to_string(),
            },
        )
        .await
        .unwrap();

        assert!(resp.rejected);
        assert_eq!(resp.overall, Some(1.0));
        assert_eq!(resp.model, None);
        assert!(resp.attempt_id.is_some());
        let saved = repo.list_attempts(user_id, Skill::Speaking).await.unwrap();
        assert!(saved[0].score.as_ref().unwrap().rejected_reason.is_some());
    }

    #[tokio::test]
    async fn test_empty_essay_is_validation_error() {
        let server = MockServer::start().await;
        let repo = MemoryRepository::with_questions(bank());
        let mut request = writing_request(Uuid::new_v4(), "w2-cars");
        request.essay = "   ".to_string();
        let err = submit_writing(&repo, &llm_for(&server).await, false, request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_writing_question_rejected_for_speaking() {
        let server = MockServer::start().await;
        let repo = MemoryRepository::with_questions(bank());
        let err = submit_speaking(
            &repo,
            &llm_for(&server).await,
            false,
            SpeakingSubmitRequest {
                user_id: Uuid::new_v4(),
                question_id: "w2-cars".to_string(),
                part: None,
                prompt_text: None,
                transcript: "some words".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
