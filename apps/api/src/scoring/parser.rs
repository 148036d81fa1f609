//! Scoring-response parser: strips incidental code fences from the engine's
//! text and decodes the single JSON object into a `ScoreRecord`.
//!
//! Fail-fast: any decode problem is an error. There is no partial result.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::models::score::{Criterion, CriterionBand, ScoreRecord};
use crate::scoring::band::{in_band_range, round_half};

const FENCE: &str = "```";

#[derive(Debug, Error)]
pub enum ScoreParseError {
    #[error("opening code fence is not followed by a line break")]
    UnterminatedFence,

    #[error("invalid score JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} band {value} is outside 0-9")]
    BandOutOfRange { field: &'static str, value: f64 },
}

/// Removes a leading markdown fence. Input that does not start with a fence
/// is only trimmed.
///
/// With a fence, the payload is the text between the first line break after
/// the opening fence and the last fence in the input. A missing closing fence
/// leaves the rest of the text in place for the JSON decoder to judge.
pub fn strip_code_fences(text: &str) -> Result<&str, ScoreParseError> {
    let text = text.trim();
    if !text.starts_with(FENCE) {
        return Ok(text);
    }
    let newline = text.find('\n').ok_or(ScoreParseError::UnterminatedFence)?;
    let body = &text[newline + 1..];
    let body = match body.rfind(FENCE) {
        Some(end) => &body[..end],
        None => body,
    };
    Ok(body.trim())
}

#[derive(Debug, Deserialize)]
struct WritingOutput {
    task_response: f64,
    coherence_cohesion: f64,
    lexical_resource: f64,
    grammatical_range_accuracy: f64,
    #[serde(alias = "overall_band")]
    overall: f64,
    feedback: WritingFeedback,
    #[serde(default)]
    weaknesses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WritingFeedback {
    task_response: String,
    coherence_cohesion: String,
    lexical_resource: String,
    grammatical_range_accuracy: String,
    strengths: String,
    improvements: String,
}

#[derive(Debug, Deserialize)]
struct SpeakingOutput {
    fluency_coherence: f64,
    lexical_resource: f64,
    grammatical_range_accuracy: f64,
    pronunciation: f64,
    #[serde(alias = "overall_band")]
    overall: f64,
    feedback: SpeakingFeedback,
    #[serde(default)]
    weaknesses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SpeakingFeedback {
    fluency_coherence: String,
    lexical_resource: String,
    grammatical_range_accuracy: String,
    pronunciation: String,
    strengths: String,
    improvements: String,
}

pub fn parse_writing_score(text: &str) -> Result<ScoreRecord, ScoreParseError> {
    let out: WritingOutput = decode(text)?;
    let bands = checked_bands(&[
        (Criterion::TaskResponse, out.task_response),
        (Criterion::CoherenceCohesion, out.coherence_cohesion),
        (Criterion::LexicalResource, out.lexical_resource),
        (Criterion::GrammaticalRangeAccuracy, out.grammatical_range_accuracy),
    ])?;
    let fb = out.feedback;
    let feedback = feedback_map([
        ("task_response", fb.task_response),
        ("coherence_cohesion", fb.coherence_cohesion),
        ("lexical_resource", fb.lexical_resource),
        ("grammatical_range_accuracy", fb.grammatical_range_accuracy),
        ("strengths", fb.strengths),
        ("improvements", fb.improvements),
    ]);
    Ok(ScoreRecord {
        bands,
        reported_overall: Some(checked_band("overall", out.overall)?),
        feedback,
        weaknesses: clean_weaknesses(out.weaknesses),
        rejected_reason: None,
    })
}

pub fn parse_speaking_score(text: &str) -> Result<ScoreRecord, ScoreParseError> {
    let out: SpeakingOutput = decode(text)?;
    let bands = checked_bands(&[
        (Criterion::FluencyCoherence, out.fluency_coherence),
        (Criterion::LexicalResource, out.lexical_resource),
        (Criterion::GrammaticalRangeAccuracy, out.grammatical_range_accuracy),
        (Criterion::Pronunciation, out.pronunciation),
    ])?;
    let fb = out.feedback;
    let feedback = feedback_map([
        ("fluency_coherence", fb.fluency_coherence),
        ("lexical_resource", fb.lexical_resource),
        ("grammatical_range_accuracy", fb.grammatical_range_accuracy),
        ("pronunciation", fb.pronunciation),
        ("strengths", fb.strengths),
        ("improvements", fb.improvements),
    ]);
    Ok(ScoreRecord {
        bands,
        reported_overall: Some(checked_band("overall", out.overall)?),
        feedback,
        weaknesses: clean_weaknesses(out.weaknesses),
        rejected_reason: None,
    })
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ScoreParseError> {
    let json = strip_code_fences(text)?;
    Ok(serde_json::from_str(json)?)
}

/// Rejects out-of-range bands; snaps in-range values to the nearest 0.5.
fn checked_band(field: &'static str, value: f64) -> Result<f64, ScoreParseError> {
    if !in_band_range(value) {
        return Err(ScoreParseError::BandOutOfRange { field, value });
    }
    Ok(round_half(value))
}

fn checked_bands(raw: &[(Criterion, f64)]) -> Result<Vec<CriterionBand>, ScoreParseError> {
    raw.iter()
        .map(|&(criterion, value)| {
            Ok(CriterionBand {
                criterion,
                band: checked_band(criterion.key(), value)?,
            })
        })
        .collect()
}

fn feedback_map<const N: usize>(entries: [(&str, String); N]) -> BTreeMap<String, String> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn clean_weaknesses(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect()
}
