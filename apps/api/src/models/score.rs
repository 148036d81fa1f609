use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::models::category::Skill;
use crate::scoring::band::overall_from_bands;

/// An IELTS band criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    TaskResponse,
    CoherenceCohesion,
    FluencyCoherence,
    LexicalResource,
    GrammaticalRangeAccuracy,
    Pronunciation,
}

pub const WRITING_CRITERIA: [Criterion; 4] = [
    Criterion::TaskResponse,
    Criterion::CoherenceCohesion,
    Criterion::LexicalResource,
    Criterion::GrammaticalRangeAccuracy,
];

pub const SPEAKING_CRITERIA: [Criterion; 4] = [
    Criterion::FluencyCoherence,
    Criterion::LexicalResource,
    Criterion::GrammaticalRangeAccuracy,
    Criterion::Pronunciation,
];

impl Criterion {
    /// Canonical JSON key.
    pub fn key(&self) -> &'static str {
        match self {
            Criterion::TaskResponse => "task_response",
            Criterion::CoherenceCohesion => "coherence_cohesion",
            Criterion::FluencyCoherence => "fluency_coherence",
            Criterion::LexicalResource => "lexical_resource",
            Criterion::GrammaticalRangeAccuracy => "grammatical_range_accuracy",
            Criterion::Pronunciation => "pronunciation",
        }
    }

    /// Older key spellings still present in stored rows.
    fn legacy_keys(&self) -> &'static [&'static str] {
        match self {
            Criterion::TaskResponse => &["task_achievement"],
            Criterion::CoherenceCohesion => &["coherence_and_cohesion"],
            Criterion::FluencyCoherence => &["fluency", "fluency_and_coherence"],
            Criterion::LexicalResource => &["vocabulary"],
            Criterion::GrammaticalRangeAccuracy => &["grammar", "grammatical_range"],
            Criterion::Pronunciation => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionBand {
    pub criterion: Criterion,
    pub band: f64,
}

/// A scored attempt's band record.
///
/// Two overalls are kept apart: `reported_overall` is what the scoring engine
/// returned (or what an older row stored), `computed_overall()` is the rounded
/// mean of the criteria. `overall()` prefers the reported value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreRecord {
    pub bands: Vec<CriterionBand>,
    pub reported_overall: Option<f64>,
    pub feedback: BTreeMap<String, String>,
    pub weaknesses: Vec<String>,
    /// Set when the speech guard rejected the transcript without scoring it.
    pub rejected_reason: Option<String>,
}

impl ScoreRecord {
    pub fn band(&self, criterion: Criterion) -> Option<f64> {
        self.bands
            .iter()
            .find(|b| b.criterion == criterion)
            .map(|b| b.band)
    }

    pub fn computed_overall(&self) -> Option<f64> {
        let bands: Vec<f64> = self.bands.iter().map(|b| b.band).collect();
        overall_from_bands(&bands)
    }

    pub fn overall(&self) -> Option<f64> {
        self.reported_overall.or_else(|| self.computed_overall())
    }

    /// Canonical storage shape: criteria as top-level keys plus `overall`,
    /// `feedback`, `weaknesses` and `rejected_reason`.
    pub fn to_stored(&self) -> Value {
        let mut map = Map::new();
        for b in &self.bands {
            map.insert(b.criterion.key().to_string(), Value::from(b.band));
        }
        map.insert(
            "overall".to_string(),
            self.reported_overall.map(Value::from).unwrap_or(Value::Null),
        );
        map.insert(
            "feedback".to_string(),
            Value::Object(
                self.feedback
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                    .collect(),
            ),
        );
        map.insert(
            "weaknesses".to_string(),
            Value::from(self.weaknesses.clone()),
        );
        if let Some(reason) = &self.rejected_reason {
            map.insert("rejected_reason".to_string(), Value::from(reason.as_str()));
        }
        Value::Object(map)
    }

    /// Normalizes a stored score document of any historical shape.
    ///
    /// Accepts a record nested under `score` or stored directly, `overall` or
    /// `overall_band`, legacy criterion keys, and `feedback` or `comments`.
    /// Criteria that are not numbers are dropped, never imputed. Returns
    /// `None` for anything that is not a JSON object.
    pub fn from_stored(skill: Skill, value: &Value) -> Option<Self> {
        let root = value
            .get("score")
            .filter(|inner| inner.is_object())
            .unwrap_or(value);
        let obj = root.as_object()?;

        let bands = skill
            .criteria()
            .iter()
            .filter_map(|criterion| {
                std::iter::once(criterion.key())
                    .chain(criterion.legacy_keys().iter().copied())
                    .find_map(|key| obj.get(key).and_then(Value::as_f64))
                    .map(|band| CriterionBand {
                        criterion: *criterion,
                        band,
                    })
            })
            .collect();

        let reported_overall = ["overall", "overall_band"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_f64));

        let feedback = ["feedback", "comments"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_object))
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let weaknesses = obj
            .get("weaknesses")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let rejected_reason = obj
            .get("rejected_reason")
            .and_then(Value::as_str)
            .map(String::from);

        Some(ScoreRecord {
            bands,
            reported_overall,
            feedback,
            weaknesses,
            rejected_reason,
        })
    }
}

/// API shape: the canonical stored document plus `computed_overall`.
impl Serialize for ScoreRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = self.to_stored();
        if let Value::Object(map) = &mut doc {
            map.insert(
                "computed_overall".to_string(),
                self.computed_overall().map(Value::from).unwrap_or(Value::Null),
            );
        }
        doc.serialize(serializer)
    }
}
