use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::category::{Category, Skill};
use crate::models::score::ScoreRecord;

/// Raw `attempts` row. The score document is kept as loosely-typed JSON here
/// and normalized exactly once, in `TryFrom<AttemptRow> for Attempt`.
#[derive(Debug, Clone, FromRow)]
pub struct AttemptRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub skill: String,
    pub question_id: String,
    pub body: String,
    pub word_count: i32,
    pub module: Option<String>,
    pub task: Option<String>,
    pub part: Option<i16>,
    pub score_json: Option<Value>,
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An essay or speaking attempt. Append-only: never updated after insert.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question_id: String,
    /// Essay text or speech transcript.
    pub body: String,
    pub word_count: u32,
    #[serde(flatten)]
    pub category: Category,
    pub score: Option<ScoreRecord>,
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Attempt {
    pub fn skill(&self) -> Skill {
        self.category.skill()
    }

    pub fn overall(&self) -> Option<f64> {
        self.score.as_ref().and_then(ScoreRecord::overall)
    }
}

impl TryFrom<AttemptRow> for Attempt {
    type Error = anyhow::Error;

    fn try_from(row: AttemptRow) -> Result<Self> {
        let skill = Skill::parse(&row.skill)
            .ok_or_else(|| anyhow!("attempt {} has unknown skill '{}'", row.id, row.skill))?;
        let category = Category::from_columns(
            skill,
            row.module.as_deref(),
            row.task.as_deref(),
            row.part,
        )?;
        let score = row
            .score_json
            .as_ref()
            .and_then(|doc| ScoreRecord::from_stored(skill, doc));

        Ok(Attempt {
            id: row.id,
            user_id: row.user_id,
            question_id: row.question_id,
            body: row.body,
            word_count: u32::try_from(row.word_count).unwrap_or(0),
            category,
            score,
            model: row.model,
            created_at: row.created_at,
        })
    }
}

/// Everything needed to insert a new attempt. Id and timestamp are assigned
/// by the repository.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: Uuid,
    pub question_id: String,
    pub body: String,
    pub word_count: u32,
    pub category: Category,
    pub score: Option<ScoreRecord>,
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(skill: &str, score_json: Option<Value>) -> AttemptRow {
        AttemptRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            skill: skill.to_string(),
            question_id: "w2-001".to_string(),
            body: "essay".to_string(),
            word_count: 260,
            module: Some("academic".to_string()),
            task: Some("task2".to_string()),
            part: None,
            score_json,
            model: Some("claude-haiku-4-5".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_normalizes_legacy_score_on_read() {
        let attempt = Attempt::try_from(row(
            "writing",
            Some(json!({"score": {"overall_band": 7.0}})),
        ))
        .unwrap();
        assert_eq!(attempt.overall(), Some(7.0));
        assert_eq!(attempt.skill(), Skill::Writing);
    }

    #[test]
    fn test_row_without_score_is_unscored() {
        let attempt = Attempt::try_from(row("writing", None)).unwrap();
        assert!(attempt.score.is_none());
        assert_eq!(attempt.overall(), None);
    }

    #[test]
    fn test_row_with_unknown_skill_fails() {
        assert!(Attempt::try_from(row("reading", None)).is_err());
    }

    #[test]
    fn test_attempt_serializes_category_flat() {
        let attempt = Attempt::try_from(row("writing", None)).unwrap();
        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["skill"], "writing");
        assert_eq!(json["module"], "academic");
        assert_eq!(json["task"], "task2");
        assert!(json["score"].is_null());
    }
}
