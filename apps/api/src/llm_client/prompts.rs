// Shared prompt constants.
// Each feature that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction appended to every band-scoring prompt.
pub const HALF_BAND_INSTRUCTION: &str = "\
    Every band value MUST be a number between 0 and 9 in steps of 0.5 \
    (for example 5.5, 6.0, 6.5). Never use quotes around numbers.";
