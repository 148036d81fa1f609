use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Plan::Free),
            "pro" => Some(Plan::Pro),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub plan: String,
    pub invite_code: String,
    pub referral_count: i32,
    pub pro_expires_at: Option<DateTime<Utc>>,
    pub redeemed_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's plan and referral state. Created lazily, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub plan: Plan,
    pub invite_code: String,
    pub referral_count: i32,
    pub pro_expires_at: Option<DateTime<Utc>>,
    /// Invite code this user redeemed, if any. One redemption per user.
    pub redeemed_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Fresh free-plan profile with a newly generated invite code.
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Profile {
            user_id,
            plan: Plan::Free,
            invite_code: generate_invite_code(),
            referral_count: 0,
            pro_expires_at: None,
            redeemed_code: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pro plan with no expiry, or an expiry still in the future.
    pub fn is_pro(&self, now: DateTime<Utc>) -> bool {
        self.plan == Plan::Pro && self.pro_expires_at.map_or(true, |at| at > now)
    }
}

impl TryFrom<ProfileRow> for Profile {
    type Error = anyhow::Error;

    fn try_from(row: ProfileRow) -> Result<Self> {
        let plan = Plan::parse(&row.plan)
            .ok_or_else(|| anyhow!("profile {} has unknown plan '{}'", row.user_id, row.plan))?;
        Ok(Profile {
            user_id: row.user_id,
            plan,
            invite_code: row.invite_code,
            referral_count: row.referral_count,
            pro_expires_at: row.pro_expires_at,
            redeemed_code: row.redeemed_code,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Eight uppercase alphanumerics.
pub fn generate_invite_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}
