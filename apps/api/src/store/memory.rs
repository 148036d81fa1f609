//! In-memory `Repository` for handler and service tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::attempt::{Attempt, NewAttempt};
use crate::models::category::Skill;
use crate::models::profile::Profile;
use crate::models::question::{Draft, Question};
use crate::store::Repository;

#[derive(Default)]
pub struct MemoryRepository {
    attempts: Mutex<Vec<Attempt>>,
    questions: Vec<Question>,
    profiles: Mutex<Vec<Profile>>,
    drafts: Mutex<Vec<Draft>>,
    /// When set, every attempt insert fails as if the database were down.
    fail_inserts: bool,
}

impl MemoryRepository {
    pub fn with_questions(questions: Vec<Question>) -> Self {
        Self {
            questions,
            ..Default::default()
        }
    }

    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn put_profile(&self, profile: Profile) {
        let mut profiles = self.profiles.lock().unwrap();
        profiles.retain(|p| p.user_id != profile.user_id);
        profiles.push(profile);
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<Attempt, AppError> {
        if self.fail_inserts {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let stored = Attempt {
            id: Uuid::new_v4(),
            user_id: attempt.user_id,
            question_id: attempt.question_id,
            body: attempt.body,
            word_count: attempt.word_count,
            category: attempt.category,
            score: attempt.score,
            model: attempt.model,
            created_at: Utc::now(),
        };
        self.attempts.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn list_attempts(&self, user_id: Uuid, skill: Skill) -> Result<Vec<Attempt>, AppError> {
        // Insertion order stands in for created_at; reverse for newest first.
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id && a.skill() == skill)
            .cloned()
            .collect())
    }

    async fn get_attempt(
        &self,
        user_id: Uuid,
        attempt_id: Uuid,
    ) -> Result<Option<Attempt>, AppError> {
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == attempt_id && a.user_id == user_id)
            .cloned())
    }

    async fn get_question(&self, question_id: &str) -> Result<Option<Question>, AppError> {
        Ok(self.questions.iter().find(|q| q.id == question_id).cloned())
    }

    async fn list_questions(&self, skill: Option<Skill>) -> Result<Vec<Question>, AppError> {
        Ok(self
            .questions
            .iter()
            .filter(|q| skill.map_or(true, |s| q.category.skill() == s))
            .cloned()
            .collect())
    }

    async fn get_or_create_profile(&self, user_id: Uuid) -> Result<Profile, AppError> {
        let mut profiles = self.profiles.lock().unwrap();
        if let Some(existing) = profiles.iter().find(|p| p.user_id == user_id) {
            return Ok(existing.clone());
        }
        let profile = Profile::new(user_id, Utc::now());
        profiles.push(profile.clone());
        Ok(profile)
    }

    async fn find_profile_by_invite_code(&self, code: &str) -> Result<Option<Profile>, AppError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.invite_code == code)
            .cloned())
    }

    async fn update_profile(&self, profile: &Profile) -> Result<(), AppError> {
        let mut profiles = self.profiles.lock().unwrap();
        if let Some(stored) = profiles.iter_mut().find(|p| p.user_id == profile.user_id) {
            stored.plan = profile.plan;
            stored.pro_expires_at = profile.pro_expires_at;
        }
        Ok(())
    }

    async fn save_referral(
        &self,
        redeemer: &Profile,
        referrer_id: Uuid,
    ) -> Result<bool, AppError> {
        let mut profiles = self.profiles.lock().unwrap();
        let Some(stored) = profiles.iter_mut().find(|p| p.user_id == redeemer.user_id) else {
            return Ok(false);
        };
        if stored.redeemed_code.is_some() {
            return Ok(false);
        }
        stored.plan = redeemer.plan;
        stored.pro_expires_at = redeemer.pro_expires_at;
        stored.redeemed_code = redeemer.redeemed_code.clone();
        if let Some(referrer) = profiles.iter_mut().find(|p| p.user_id == referrer_id) {
            referrer.referral_count += 1;
        }
        Ok(true)
    }

    async fn save_draft(&self, draft: &Draft) -> Result<(), AppError> {
        let mut drafts = self.drafts.lock().unwrap();
        drafts.retain(|d| !(d.user_id == draft.user_id && d.question_id == draft.question_id));
        drafts.push(draft.clone());
        Ok(())
    }

    async fn get_draft(&self, user_id: Uuid, question_id: &str) -> Result<Option<Draft>, AppError> {
        Ok(self
            .drafts
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.user_id == user_id && d.question_id == question_id)
            .cloned())
    }
}
