use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::Profile;
use crate::profile::invite::{apply_invite, apply_upgrade, normalize_code, InviteError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub user_id: Uuid,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    pub user_id: Uuid,
    pub days: i64,
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Profile>, AppError> {
    let profile = state.repo.get_or_create_profile(params.user_id).await?;
    Ok(Json(profile))
}

/// POST /api/v1/profile/redeem
pub async fn handle_redeem_invite(
    State(state): State<AppState>,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<Profile>, AppError> {
    let code = normalize_code(&req.code);
    if code.is_empty() {
        return Err(AppError::Validation("code is required".to_string()));
    }

    let mut referrer = state
        .repo
        .find_profile_by_invite_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Invite code {code} not found")))?;
    let mut redeemer = state.repo.get_or_create_profile(req.user_id).await?;

    apply_invite(&mut redeemer, &mut referrer, Utc::now())
        .map_err(|e| AppError::Validation(e.to_string()))?;
    // The profiles above may be stale under concurrent redemptions; the store
    // re-checks the one-redemption rule and bumps the count in place.
    if !state.repo.save_referral(&redeemer, referrer.user_id).await? {
        return Err(AppError::Validation(InviteError::AlreadyRedeemed.to_string()));
    }

    info!(
        "User {} redeemed invite {code} from {}",
        redeemer.user_id, referrer.user_id
    );
    Ok(Json(redeemer))
}

/// POST /api/v1/profile/upgrade
pub async fn handle_upgrade(
    State(state): State<AppState>,
    Json(req): Json<UpgradeRequest>,
) -> Result<Json<Profile>, AppError> {
    let mut profile = state.repo.get_or_create_profile(req.user_id).await?;
    apply_upgrade(&mut profile, req.days, Utc::now())
        .map_err(|e| AppError::Validation(e.to_string()))?;
    state.repo.update_profile(&profile).await?;

    info!("User {} upgraded for {} days", profile.user_id, req.days);
    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryRepository;
    use crate::store::Repository;

    /// Loads both profiles and applies the redemption, as a request would,
    /// without saving yet.
    async fn prepare(repo: &MemoryRepository, redeemer_id: Uuid, code: &str) -> (Profile, Uuid) {
        let mut referrer = repo.find_profile_by_invite_code(code).await.unwrap().unwrap();
        let mut redeemer = repo.get_or_create_profile(redeemer_id).await.unwrap();
        apply_invite(&mut redeemer, &mut referrer, Utc::now()).unwrap();
        (redeemer, referrer.user_id)
    }

    #[tokio::test]
    async fn test_interleaved_redemptions_of_one_code_both_count() {
        let repo = MemoryRepository::default();
        let referrer = repo.get_or_create_profile(Uuid::new_v4()).await.unwrap();

        let (a, referrer_id) = prepare(&repo, Uuid::new_v4(), &referrer.invite_code).await;
        let (b, _) = prepare(&repo, Uuid::new_v4(), &referrer.invite_code).await;
        assert!(repo.save_referral(&a, referrer_id).await.unwrap());
        assert!(repo.save_referral(&b, referrer_id).await.unwrap());

        let referrer = repo.get_or_create_profile(referrer_id).await.unwrap();
        assert_eq!(referrer.referral_count, 2);
    }

    #[tokio::test]
    async fn test_interleaved_redemptions_by_one_user_credit_once() {
        let repo = MemoryRepository::default();
        let first = repo.get_or_create_profile(Uuid::new_v4()).await.unwrap();
        let second = repo.get_or_create_profile(Uuid::new_v4()).await.unwrap();
        let redeemer_id = Uuid::new_v4();

        let (via_first, first_id) = prepare(&repo, redeemer_id, &first.invite_code).await;
        let (via_second, second_id) = prepare(&repo, redeemer_id, &second.invite_code).await;
        assert!(repo.save_referral(&via_first, first_id).await.unwrap());
        assert!(!repo.save_referral(&via_second, second_id).await.unwrap());

        let redeemer = repo.get_or_create_profile(redeemer_id).await.unwrap();
        assert_eq!(redeemer.redeemed_code.as_deref(), Some(first.invite_code.as_str()));
        let first = repo.get_or_create_profile(first_id).await.unwrap();
        let second = repo.get_or_create_profile(second_id).await.unwrap();
        assert_eq!(first.referral_count, 1);
        assert_eq!(second.referral_count, 0);
    }
}
