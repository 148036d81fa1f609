// Band scoring: request building, model tier selection, response parsing,
// the speech guard, and the submit flows that tie them to persistence.
// All LLM calls go through llm_client; no direct API calls here.

pub mod band;
pub mod guard;
pub mod handlers;
pub mod parser;
pub mod prompts;
pub mod request;
pub mod service;
pub mod tier;

/// Whitespace-delimited word count, as shown to candidates.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// `count_words` narrowed to the width stored on attempts, saturating.
pub fn word_count_u32(text: &str) -> u32 {
    u32::try_from(count_words(text)).unwrap_or(u32::MAX)
}
