use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::attempt::{Attempt, AttemptRow, NewAttempt};
use crate::models::category::Skill;
use crate::models::profile::{Profile, ProfileRow};
use crate::models::question::{Draft, Question, QuestionRow};
use crate::store::Repository;

/// Invite codes are random; a collision just means trying another one.
const MAX_INVITE_CODE_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<Attempt, AppError> {
        let (module, task, part) = attempt.category.columns();
        let score_json = attempt.score.as_ref().map(|s| s.to_stored());

        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            INSERT INTO attempts
                (id, user_id, skill, question_id, body, word_count,
                 module, task, part, score_json, model)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(attempt.user_id)
        .bind(attempt.category.skill().as_str())
        .bind(&attempt.question_id)
        .bind(&attempt.body)
        .bind(word_count_column(attempt.word_count))
        .bind(module)
        .bind(task)
        .bind(part)
        .bind(score_json)
        .bind(&attempt.model)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "Inserted {} attempt {} for user {}",
            row.skill, row.id, row.user_id
        );
        Ok(Attempt::try_from(row)?)
    }

    async fn list_attempts(&self, user_id: Uuid, skill: Skill) -> Result<Vec<Attempt>, AppError> {
        let rows = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT * FROM attempts
            WHERE user_id = $1 AND skill = $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(skill.as_str())
        .fetch_all(&self.pool)
        .await?;

        // A row that fails to normalize is skipped rather than failing the whole history.
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                Attempt::try_from(row)
                    .map_err(|e| warn!("Skipping attempt {id}: {e}"))
                    .ok()
            })
            .collect())
    }

    async fn get_attempt(
        &self,
        user_id: Uuid,
        attempt_id: Uuid,
    ) -> Result<Option<Attempt>, AppError> {
        let row = sqlx::query_as::<_, AttemptRow>(
            "SELECT * FROM attempts WHERE id = $1 AND user_id = $2",
        )
        .bind(attempt_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Attempt::try_from).transpose()?)
    }

    async fn get_question(&self, question_id: &str) -> Result<Option<Question>, AppError> {
        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, skill, prompt_text, min_words, module, task, part
            FROM questions
            WHERE id = $1
            "#,
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Question::try_from).transpose()?)
    }

    async fn list_questions(&self, skill: Option<Skill>) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, skill, prompt_text, min_words, module, task, part
            FROM questions
            WHERE ($1::text IS NULL OR skill = $1)
            ORDER BY id
            "#,
        )
        .bind(skill.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(Question::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }

    async fn get_or_create_profile(&self, user_id: Uuid) -> Result<Profile, AppError> {
        if let Some(profile) = self.fetch_profile(user_id).await? {
            return Ok(profile);
        }

        for _ in 0..MAX_INVITE_CODE_ATTEMPTS {
            let fresh = Profile::new(user_id, Utc::now());
            // Conflicts on either user_id (a concurrent create) or invite_code are swallowed here.
            sqlx::query(
                r#"
                INSERT INTO profiles (user_id, plan, invite_code, referral_count)
                VALUES ($1, $2, $3, 0)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(fresh.plan.as_str())
            .bind(&fresh.invite_code)
            .execute(&self.pool)
            .await?;

            if let Some(profile) = self.fetch_profile(user_id).await? {
                info!("Created profile for user {user_id}");
                return Ok(profile);
            }
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "could not allocate a unique invite code for user {user_id}"
        )))
    }

    async fn find_profile_by_invite_code(&self, code: &str) -> Result<Option<Profile>, AppError> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE invite_code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Profile::try_from).transpose()?)
    }

    async fn update_profile(&self, profile: &Profile) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE profiles
            SET plan = $2, pro_expires_at = $3, updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(profile.user_id)
        .bind(profile.plan.as_str())
        .bind(profile.pro_expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_referral(
        &self,
        redeemer: &Profile,
        referrer_id: Uuid,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            r#"
            UPDATE profiles
            SET plan = $2, pro_expires_at = $3, redeemed_code = $4, updated_at = now()
            WHERE user_id = $1 AND redeemed_code IS NULL
            "#,
        )
        .bind(redeemer.user_id)
        .bind(redeemer.plan.as_str())
        .bind(redeemer.pro_expires_at)
        .bind(&redeemer.redeemed_code)
        .execute(&mut *tx)
        .await?;

        // A concurrent redemption already claimed this account; dropping the
        // transaction rolls it back.
        if claimed.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE profiles
            SET referral_count = referral_count + 1, updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(referrer_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn save_draft(&self, draft: &Draft) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO drafts (user_id, question_id, text, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, question_id)
            DO UPDATE SET text = EXCLUDED.text, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(draft.user_id)
        .bind(&draft.question_id)
        .bind(&draft.text)
        .bind(draft.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_draft(&self, user_id: Uuid, question_id: &str) -> Result<Option<Draft>, AppError> {
        Ok(sqlx::query_as::<_, Draft>(
            r#"
            SELECT user_id, question_id, text, updated_at
            FROM drafts
            WHERE user_id = $1 AND question_id = $2
            "#,
        )
        .bind(user_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}

impl PgRepository {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Profile::try_from).transpose()?)
    }
}

/// `attempts.word_count` is an INTEGER column; saturate instead of wrapping.
fn word_count_column(count: u32) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_column_saturates() {
        assert_eq!(word_count_column(260), 260);
        assert_eq!(word_count_column(u32::MAX), i32::MAX);
    }
}
