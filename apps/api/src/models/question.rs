use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::category::{Category, Skill};

#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: String,
    pub skill: String,
    pub prompt_text: String,
    pub min_words: i32,
    pub module: Option<String>,
    pub task: Option<String>,
    pub part: Option<i16>,
}

/// Read-only practice question. The stored prompt is the canonical one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub id: String,
    pub prompt_text: String,
    pub min_words: u32,
    #[serde(flatten)]
    pub category: Category,
}

impl TryFrom<QuestionRow> for Question {
    type Error = anyhow::Error;

    fn try_from(row: QuestionRow) -> Result<Self> {
        let skill = Skill::parse(&row.skill)
            .ok_or_else(|| anyhow!("question {} has unknown skill '{}'", row.id, row.skill))?;
        let category = Category::from_columns(
            skill,
            row.module.as_deref(),
            row.task.as_deref(),
            row.part,
        )?;
        Ok(Question {
            id: row.id,
            prompt_text: row.prompt_text,
            min_words: u32::try_from(row.min_words).unwrap_or(0),
            category,
        })
    }
}

/// Unsubmitted work on a question. One per (user, question); saving overwrites.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Draft {
    pub user_id: uuid::Uuid,
    pub question_id: String,
    pub text: String,
    pub updated_at: DateTime<Utc>,
}
