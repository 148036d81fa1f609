//! Scoring-request builder: turns task metadata and candidate text into the
//! model id, system prompt and user prompt sent to the scoring engine.
//!
//! Pure text assembly, no I/O.

use crate::llm_client::prompts::{HALF_BAND_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::models::category::{SpeakingPart, WritingModule, WritingTask};
use crate::scoring::prompts::{
    SPEAKING_PROMPT_TEMPLATE, SPEAKING_SYSTEM, WRITING_PROMPT_TEMPLATE, WRITING_SYSTEM,
};
use crate::scoring::tier::ModelTier;

/// Output-length budgets, in tokens.
pub const WRITING_MAX_TOKENS: u32 = 1200;
pub const SPEAKING_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRequest {
    pub model: &'static str,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
}

pub struct WritingInput<'a> {
    pub module: WritingModule,
    pub task: WritingTask,
    /// Canonical task prompt (stored question text when available).
    pub prompt_text: &'a str,
    pub min_words: u32,
    pub essay: &'a str,
    pub word_count: u32,
}

pub struct SpeakingInput<'a> {
    pub part: SpeakingPart,
    pub prompt_text: &'a str,
    pub transcript: &'a str,
    pub word_count: u32,
}

pub fn build_writing_request(tier: ModelTier, input: &WritingInput<'_>) -> ScoringRequest {
    let task_type = format!(
        "{} Writing {}",
        match input.module {
            WritingModule::Academic => "Academic",
            WritingModule::General => "General Training",
        },
        match input.task {
            WritingTask::Task1 => "Task 1",
            WritingTask::Task2 => "Task 2",
        }
    );

    // Candidate text goes in last so its content is never re-substituted.
    let prompt = WRITING_PROMPT_TEMPLATE
        .replace("{half_band}", HALF_BAND_INSTRUCTION)
        .replace("{task_type}", &task_type)
        .replace("{min_words}", &input.min_words.to_string())
        .replace("{word_count}", &input.word_count.to_string())
        .replace("{prompt_text}", input.prompt_text.trim())
        .replace("{candidate_text}", input.essay.trim());

    ScoringRequest {
        model: tier.model_id(),
        system: format!("{WRITING_SYSTEM} {JSON_ONLY_SYSTEM}"),
        prompt,
        max_tokens: WRITING_MAX_TOKENS,
    }
}

pub fn build_speaking_request(tier: ModelTier, input: &SpeakingInput<'_>) -> ScoringRequest {
    let prompt = SPEAKING_PROMPT_TEMPLATE
        .replace("{half_band}", HALF_BAND_INSTRUCTION)
        .replace("{task_type}", &format!("Part {}", input.part.number()))
        .replace("{word_count}", &input.word_count.to_string())
        .replace("{prompt_text}", input.prompt_text.trim())
        .replace("{candidate_text}", input.transcript.trim());

    ScoringRequest {
        model: tier.model_id(),
        system: format!("{SPEAKING_SYSTEM} {JSON_ONLY_SYSTEM}"),
        prompt,
        max_tokens: SPEAKING_MAX_TOKENS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn essay_input<'a>(essay: &'a str) -> WritingInput<'a> {
        WritingInput {
            module: WritingModule::Academic,
            task: WritingTask::Task2,
            prompt_text: "  Some people think cities should ban cars.  ",
            min_words: 250,
            essay,
            word_count: 4,
        }
    }

    #[test]
    fn test_writing_prompt_contains_task_metadata() {
        let req = build_writing_request(ModelTier::Free, &essay_input("Cars are a problem."));
        assert_eq!(req.model, "claude-haiku-4-5");
        assert_eq!(req.max_tokens, WRITING_MAX_TOKENS);
        assert!(req.prompt.contains("TASK TYPE: Academic Writing Task 2"));
        assert!(req.prompt.contains("MINIMUM WORDS: 250"));
        assert!(req.prompt.contains("CANDIDATE WORD COUNT: 4"));
        assert!(req
            .prompt
            .contains("TASK PROMPT:\nSome people think cities should ban cars.\n"));
        assert!(req.prompt.contains("Cars are a problem."));
        assert!(req.system.contains("JSON only"));
    }

    #[test]
    fn test_writing_prompt_has_no_unfilled_placeholders() {
        let req = build_writing_request(ModelTier::Pro, &essay_input("text"));
        for placeholder in [
            "{task_type}",
            "{min_words}",
            "{word_count}",
            "{prompt_text}",
            "{candidate_text}",
            "{half_band}",
        ] {
            assert!(!req.prompt.contains(placeholder), "left {placeholder}");
        }
        assert_eq!(req.model, "claude-sonnet-4-5");
    }

    #[test]
    fn test_candidate_text_is_not_substituted() {
        let req = build_writing_request(ModelTier::Free, &essay_input("I wrote {word_count}"));
        assert!(req.prompt.contains("I wrote {word_count}"));
    }

    #[test]
    fn test_speaking_prompt_names_part_and_schema() {
        let req = build_speaking_request(
            ModelTier::Free,
            &SpeakingInput {
                part: SpeakingPart::Part3,
                prompt_text: "Why do people travel?",
                transcript: "Well, I think people travel for many reasons.",
                word_count: 8,
            },
        );
        assert_eq!(req.max_tokens, SPEAKING_MAX_TOKENS);
        assert!(req.prompt.contains("PART: Part 3"));
        assert!(req.prompt.contains("\"pronunciation\": number"));
        assert!(req.prompt.contains("Why do people travel?"));
    }
}
