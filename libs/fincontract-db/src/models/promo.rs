use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Upper bound on `validity_duration_days`, matching the `promo_codes_validity_cap` constraint.
pub const MAX_VALIDITY_DAYS: i32 = 36_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromoStatus {
    Active,
    Inactive,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown promo status '{0}'")]
pub struct UnknownPromoStatus(pub String);

impl FromStr for PromoStatus {
    type Err = UnknownPromoStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(PromoStatus::Active),
            "inactive" => Ok(PromoStatus::Inactive),
            other => Err(UnknownPromoStatus(other.to_string())),
        }
    }
}

impl fmt::Display for PromoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromoStatus::Active => f.write_str("active"),
            PromoStatus::Inactive => f.write_str("inactive"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromoCode {
    pub id: i64,
    pub code: String,
    pub plan_id: String,
    pub validity_duration_days: i32,
    pub expiry_date: DateTime<Utc>,
    pub status: String,
    pub max_usage: i32,
    pub current_usage: i32,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    /// Anything other than a literal `active` row counts as inactive.
    pub fn is_active(&self) -> bool {
        matches!(self.status.parse(), Ok(PromoStatus::Active))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date < now
    }

    pub fn has_remaining_uses(&self) -> bool {
        self.current_usage < self.max_usage
    }

    pub fn usage_pct(&self) -> f32 {
        if self.max_usage == 0 {
            return 0.0;
        }
        (self.current_usage as f32 / self.max_usage as f32) * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PromoCodeRedemption {
    pub id: i64,
    pub promo_code_id: i64,
    pub user_id: Uuid,
    pub code: String,
    pub plan_id: String,
    pub validity_duration_days: i32,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub redeemed_at: DateTime<Utc>,
}

/// Row values for a redemption that has passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRedemption {
    pub promo_code_id: i64,
    pub user_id: Uuid,
    pub code: String,
    pub plan_id: String,
    pub validity_duration_days: i32,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPromoCode {
    pub code: String,
    pub plan_id: String,
    pub validity_duration_days: i32,
    pub expiry_date: DateTime<Utc>,
    pub max_usage: i32,
}
