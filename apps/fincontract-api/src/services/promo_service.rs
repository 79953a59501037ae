use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use fincontract_db::models::plan::{ReferralReward, UserPlan};
use fincontract_db::models::promo::{NewRedemption, PromoCode, PromoCodeRedemption};
use fincontract_db::repositories::plan_repo::PlanRepository;
use fincontract_db::repositories::promo_repo::PromoRepository;
use fincontract_shared::promo::RedemptionView;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;

/// Why a redemption was refused. Checked in declaration order; the first failure wins.
#[derive(Debug, thiserror::Error)]
pub enum RedeemError {
    #[error("Code is required")]
    CodeRequired,
    #[error("Invalid promo code")]
    InvalidCode,
    #[error("This promo code has expired")]
    Expired,
    #[error("This promo code is inactive")]
    Inactive,
    #[error("This promo code has reached its usage limit")]
    UsageLimitReached,
    #[error("You have already redeemed this promo code")]
    AlreadyRedeemed,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<RedeemError> for ApiError {
    fn from(e: RedeemError) -> Self {
        match e {
            RedeemError::CodeRequired
            | RedeemError::Expired
            | RedeemError::Inactive
            | RedeemError::UsageLimitReached => ApiError::BadRequest(e.to_string()),
            RedeemError::InvalidCode => ApiError::NotFound(e.to_string()),
            RedeemError::AlreadyRedeemed => ApiError::Conflict(e.to_string()),
            RedeemError::Internal(inner) => ApiError::Internal(inner),
        }
    }
}

/// Storage the redemption flow needs.
#[async_trait]
pub trait RedemptionStore: Send + Sync {
    /// Case-insensitive lookup.
    async fn find_code(&self, code: &str) -> Result<Option<PromoCode>>;
    async fn has_redemption(&self, promo_code_id: i64, user_id: Uuid) -> Result<bool>;
    async fn user_plan(&self, user_id: Uuid) -> Result<Option<UserPlan>>;
    async fn active_referral_reward(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ReferralReward>>;
    /// `Ok(None)` when a row for the (code, user) pair already exists.
    async fn insert_redemption(&self, new: &NewRedemption) -> Result<Option<PromoCodeRedemption>>;
    /// Guarded increment; `Ok(false)` when the counter is already at the limit.
    async fn increment_usage(&self, promo_code_id: i64) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct PgRedemptionStore {
    promos: PromoRepository,
    plans: PlanRepository,
}

impl PgRedemptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            promos: PromoRepository::new(pool.clone()),
            plans: PlanRepository::new(pool),
        }
    }
}

#[async_trait]
impl RedemptionStore for PgRedemptionStore {
    async fn find_code(&self, code: &str) -> Result<Option<PromoCode>> {
        self.promos.find_by_code(code).await
    }

    async fn has_redemption(&self, promo_code_id: i64, user_id: Uuid) -> Result<bool> {
        self.promos.has_redemption(promo_code_id, user_id).await
    }

    async fn user_plan(&self, user_id: Uuid) -> Result<Option<UserPlan>> {
        self.plans.get_user_plan(user_id).await
    }

    async fn active_referral_reward(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ReferralReward>> {
        self.plans.get_active_referral_reward(user_id, now).await
    }

    async fn insert_redemption(&self, new: &NewRedemption) -> Result<Option<PromoCodeRedemption>> {
        self.promos.insert_redemption(new).await
    }

    async fn increment_usage(&self, promo_code_id: i64) -> Result<bool> {
        self.promos.increment_usage(promo_code_id).await
    }
}

/// Code-level checks: expiry, then status, then usage.
pub fn check_redeemable(promo: &PromoCode, now: DateTime<Utc>) -> Result<(), RedeemError> {
    if promo.is_expired_at(now) {
        return Err(RedeemError::Expired);
    }
    if !promo.is_active() {
        return Err(RedeemError::Inactive);
    }
    if !promo.has_remaining_uses() {
        return Err(RedeemError::UsageLimitReached);
    }
    Ok(())
}

/// Benefits stack back to back: the code starts once the running paid plan and
/// any active referral reward have both ended.
pub fn redemption_window(
    now: DateTime<Utc>,
    plan: Option<&UserPlan>,
    reward: Option<&ReferralReward>,
    validity_duration_days: i32,
) -> Result<(DateTime<Utc>, DateTime<Utc>), RedeemError> {
    let mut starts_at = now;
    if let Some(plan_expiry) = plan.and_then(|p| p.paid_until(now)) {
        starts_at = starts_at.max(plan_expiry);
    }
    if let Some(reward_expiry) = reward.and_then(|r| r.active_until(now)) {
        starts_at = starts_at.max(reward_expiry);
    }
    let expires_at = Duration::try_days(i64::from(validity_duration_days))
        .and_then(|validity| starts_at.checked_add_signed(validity))
        .ok_or_else(|| {
            RedeemError::Internal(anyhow::anyhow!(
                "redemption window out of range: {} days from {}",
                validity_duration_days,
                starts_at
            ))
        })?;
    Ok((starts_at, expires_at))
}

pub fn to_view(redemption: &PromoCodeRedemption) -> RedemptionView {
    RedemptionView {
        starts_at: redemption.starts_at,
        expires_at: redemption.expires_at,
        plan_id: redemption.plan_id.clone(),
        validity_duration_days: redemption.validity_duration_days,
        code: redemption.code.clone(),
    }
}

#[derive(Clone)]
pub struct PromoService {
    store: Arc<dyn RedemptionStore>,
}

impl PromoService {
    pub fn new(store: Arc<dyn RedemptionStore>) -> Self {
        Self { store }
    }

    pub async fn redeem(
        &self,
        user_id: Uuid,
        code: Option<&str>,
    ) -> Result<PromoCodeRedemption, RedeemError> {
        self.redeem_at(user_id, code, Utc::now()).await
    }

    pub async fn redeem_at(
        &self,
        user_id: Uuid,
        code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PromoCodeRedemption, RedeemError> {
        let code = code.map(str::trim).unwrap_or_default();
        if code.is_empty() {
            return Err(RedeemError::CodeRequired);
        }

        let promo = self
            .store
            .find_code(code)
            .await?
            .ok_or(RedeemError::InvalidCode)?;

        check_redeemable(&promo, now)?;

        if self.store.has_redemption(promo.id, user_id).await? {
            return Err(RedeemError::AlreadyRedeemed);
        }

        let plan = self.store.user_plan(user_id).await?;
        let reward = self.store.active_referral_reward(user_id, now).await?;
        let (starts_at, expires_at) = redemption_window(
            now,
            plan.as_ref(),
            reward.as_ref(),
            promo.validity_duration_days,
        )?;

        let new = NewRedemption {
            promo_code_id: promo.id,
            user_id,
            code: promo.code.clone(),
            plan_id: promo.plan_id.clone(),
            validity_duration_days: promo.validity_duration_days,
            starts_at,
            expires_at,
        };

        let redemption = self
            .store
            .insert_redemption(&new)
            .await?
            .ok_or(RedeemError::AlreadyRedeemed)?;

        // The redemption stands even if the counter cannot be bumped.
        match self.store.increment_usage(promo.id).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                "Promo {} redeemed by {} but usage counter is already at its limit",
                promo.code,
                user_id
            ),
            Err(e) => tracing::warn!(
                "Promo {} redeemed by {} but usage update failed: {:#}",
                promo.code,
                user_id,
                e
            ),
        }

        tracing::info!(
            "User {} redeemed promo {} for plan {} ({} -> {})",
            user_id,
            promo.code,
            promo.plan_id,
            starts_at,
            expires_at
        );
        Ok(redemption)
    }
}
