use sqlx::PgPool;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::models::plan::{ReferralReward, UserPlan};

#[derive(Debug, Clone)]
pub struct PlanRepository {
    pool: PgPool,
}

impl PlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_user_plan(&self, user_id: Uuid) -> Result<Option<UserPlan>> {
        sqlx::query_as::<_, UserPlan>(
            "SELECT user_id, plan_id, expires_at, updated_at FROM user_plans WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user plan")
    }

    /// The active referral reward that runs the longest, if any.
    pub async fn get_active_referral_reward(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ReferralReward>> {
        sqlx::query_as::<_, ReferralReward>(
            r#"
            SELECT id, user_id, plan_id, status, expires_at, created_at
            FROM referral_rewards
            WHERE user_id = $1 AND status = 'active' AND expires_at > $2
            ORDER BY expires_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch referral reward")
    }
}
