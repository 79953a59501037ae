use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const FREE_PLAN_ID: &str = "free";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct UserPlan {
    pub user_id: Uuid,
    pub plan_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl UserPlan {
    pub fn is_free(&self) -> bool {
        self.plan_id.eq_ignore_ascii_case(FREE_PLAN_ID)
    }

    /// Expiry of a paid plan that is still running at `now`.
    pub fn paid_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.is_free() {
            return None;
        }
        self.expires_at.filter(|expiry| *expiry > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ReferralReward {
    pub id: i64,
    pub user_id: Uuid,
    pub plan_id: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ReferralReward {
    pub fn active_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.status == "active" && self.expires_at > now {
            Some(self.expires_at)
        } else {
            None
        }
    }
}
