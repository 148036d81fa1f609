//! Speech guard: cheap checks that keep obviously unscorable transcripts away
//! from the scoring engine. A rejected transcript gets a fixed band-1 record.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::models::category::Skill;
use crate::models::score::{CriterionBand, ScoreRecord};
use crate::scoring::count_words;

pub const MIN_WORDS: usize = 12;
/// Mic-test phrases only count as a rejection below this length.
pub const MIC_TEST_MAX_WORDS: usize = 70;
pub const MIN_UNIQUE_RATIO: f64 = 0.35;
pub const REJECTED_BAND: f64 = 1.0;

const MIC_TEST_PHRASES: &[&str] = &[
    "testing testing",
    "test test",
    "mic test",
    "microphone test",
    "testing one two",
    "one two three",
    "can you hear me",
    "is this working",
    "check check",
    "sound check",
];

const URL_SUFFIXES: &[&str] = &[".com", ".net", ".org", ".io"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    TooShort,
    ContainsUrl,
    MicrophoneTest,
    Repetitive,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            RejectReason::TooShort => {
                "Your answer is too short to score. Speak for longer and try again."
            }
            RejectReason::ContainsUrl => {
                "Your answer contains a web address. Answer the question in your own words."
            }
            RejectReason::MicrophoneTest => {
                "This sounds like a microphone test. Record a real answer to be scored."
            }
            RejectReason::Repetitive => {
                "Your answer repeats the same few words. Give a fuller answer to be scored."
            }
        };
        f.write_str(msg)
    }
}

/// Returns the first rule the transcript fails, or `None` if it may be scored.
pub fn check_transcript(transcript: &str) -> Option<RejectReason> {
    let word_count = count_words(transcript);
    if word_count < MIN_WORDS {
        return Some(RejectReason::TooShort);
    }

    if transcript.split_whitespace().any(looks_like_url) {
        return Some(RejectReason::ContainsUrl);
    }

    let tokens = tokens(transcript);
    if word_count < MIC_TEST_MAX_WORDS {
        if MIC_TEST_PHRASES.iter().any(|p| contains_phrase(&tokens, p)) {
            return Some(RejectReason::MicrophoneTest);
        }
    }

    if tokens.len() >= MIN_WORDS {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        if (unique.len() as f64 / tokens.len() as f64) < MIN_UNIQUE_RATIO {
            return Some(RejectReason::Repetitive);
        }
    }

    None
}

/// The fixed record stored and returned for a rejected transcript.
pub fn rejection_record(reason: RejectReason) -> ScoreRecord {
    let message = reason.to_string();
    ScoreRecord {
        bands: Skill::Speaking
            .criteria()
            .iter()
            .map(|c| CriterionBand {
                criterion: *c,
                band: REJECTED_BAND,
            })
            .collect(),
        reported_overall: Some(REJECTED_BAND),
        feedback: BTreeMap::from([
            ("strengths".to_string(), String::new()),
            ("improvements".to_string(), message.clone()),
        ]),
        weaknesses: Vec::new(),
        rejected_reason: Some(message),
    }
}

/// Lowercased words with surrounding punctuation removed.
fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Whole-word match: "latest test" does not contain "test test".
fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    tokens
        .windows(words.len())
        .any(|window| window.iter().zip(&words).all(|(t, w)| t == w))
}

fn looks_like_url(word: &str) -> bool {
    let w = word
        .trim_matches(|c: char| matches!(c, ',' | '.' | '!' | '?' | ';' | ':' | '(' | ')' | '"'))
        .to_lowercase();
    if w.starts_with("http://") || w.starts_with("https://") || w.starts_with("www.") {
        return true;
    }
    URL_SUFFIXES.iter().any(|suffix| {
        // "example.com", "example.com/path", "site.io:8080", but not a bare ".com"
        w.match_indices(suffix).any(|(at, _)| {
            at > 0 && {
                let rest = &w[at + suffix.len()..];
                rest.is_empty() || rest.starts_with(['/', '?', '#', ':'])
            }
        })
    })
}
