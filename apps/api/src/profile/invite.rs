//! Plan changes: invite redemption and manual upgrades.
//!
//! Pure functions over `Profile`; the handlers load and save.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::models::profile::{Plan, Profile};

pub const INVITE_BONUS_DAYS: i64 = 7;
pub const MAX_UPGRADE_DAYS: i64 = 366;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InviteError {
    #[error("You cannot redeem your own invite code")]
    OwnCode,
    #[error("An invite code has already been redeemed on this account")]
    AlreadyRedeemed,
    #[error("Upgrade length must be between 1 and {MAX_UPGRADE_DAYS} days")]
    InvalidDays,
}

/// Normalizes user-typed codes before lookup.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Grants `days` of pro, stacking on top of any unexpired time. A pro plan
/// without an expiry stays open-ended.
pub fn extend_pro(profile: &mut Profile, days: i64, now: DateTime<Utc>) {
    if profile.plan == Plan::Pro && profile.pro_expires_at.is_none() {
        return;
    }
    let base = match profile.pro_expires_at {
        Some(at) if profile.plan == Plan::Pro && at > now => at,
        _ => now,
    };
    profile.plan = Plan::Pro;
    profile.pro_expires_at = Some(base + Duration::days(days));
    profile.updated_at = now;
}

/// Applies a redemption of `referrer`'s code by `redeemer`, updating both.
pub fn apply_invite(
    redeemer: &mut Profile,
    referrer: &mut Profile,
    now: DateTime<Utc>,
) -> Result<(), InviteError> {
    if redeemer.user_id == referrer.user_id {
        return Err(InviteError::OwnCode);
    }
    if redeemer.redeemed_code.is_some() {
        return Err(InviteError::AlreadyRedeemed);
    }

    extend_pro(redeemer, INVITE_BONUS_DAYS, now);
    redeemer.redeemed_code = Some(referrer.invite_code.clone());
    referrer.referral_count += 1;
    referrer.updated_at = now;
    Ok(())
}

pub fn apply_upgrade(
    profile: &mut Profile,
    days: i64,
    now: DateTime<Utc>,
) -> Result<(), InviteError> {
    if !(1..=MAX_UPGRADE_DAYS).contains(&days) {
        return Err(InviteError::InvalidDays);
    }
    extend_pro(profile, days, now);
    Ok(())
}
