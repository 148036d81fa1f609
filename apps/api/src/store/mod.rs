//! Persistence collaborator.
//!
//! Handlers and services talk to `Repository`, never to SQL directly.
//! `AppState` carries an `Arc<dyn Repository>`; production wires in
//! `PgRepository`, tests an in-memory store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::attempt::{Attempt, NewAttempt};
use crate::models::category::Skill;
use crate::models::profile::Profile;
use crate::models::question::{Draft, Question};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgRepository;

#[async_trait]
pub trait Repository: Send + Sync {
    /// Append-only insert. Assigns id and timestamp.
    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<Attempt, AppError>;

    /// A user's attempts for one skill, newest first.
    async fn list_attempts(&self, user_id: Uuid, skill: Skill) -> Result<Vec<Attempt>, AppError>;

    async fn get_attempt(&self, user_id: Uuid, attempt_id: Uuid)
        -> Result<Option<Attempt>, AppError>;

    async fn get_question(&self, question_id: &str) -> Result<Option<Question>, AppError>;

    async fn list_questions(&self, skill: Option<Skill>) -> Result<Vec<Question>, AppError>;

    /// Returns the user's profile, creating a free one on first access.
    async fn get_or_create_profile(&self, user_id: Uuid) -> Result<Profile, AppError>;

    async fn find_profile_by_invite_code(&self, code: &str)
        -> Result<Option<Profile>, AppError>;

    async fn update_profile(&self, profile: &Profile) -> Result<(), AppError>;

    /// Records an invite redemption atomically: the redeemer's plan and
    /// redeemed code are written only if no code has been redeemed on that
    /// account yet, and the referrer's count is incremented in place.
    /// Returns `false` when the redeemer had already redeemed a code.
    async fn save_referral(&self, redeemer: &Profile, referrer_id: Uuid)
        -> Result<bool, AppError>;

    async fn save_draft(&self, draft: &Draft) -> Result<(), AppError>;

    async fn get_draft(&self, user_id: Uuid, question_id: &str)
        -> Result<Option<Draft>, AppError>;
}
