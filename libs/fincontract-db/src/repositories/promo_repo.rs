use sqlx::PgPool;
use anyhow::{Context, Result};
use uuid::Uuid;
use crate::models::promo::{NewPromoCode, NewRedemption, PromoCode, PromoCodeRedemption, PromoStatus};

const PROMO_COLUMNS: &str = "id, code, plan_id, validity_duration_days, expiry_date, status, max_usage, current_usage, created_at";

#[derive(Debug, Clone)]
pub struct PromoRepository {
    pool: PgPool,
}

impl PromoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>> {
        sqlx::query_as::<_, PromoCode>(&format!(
            "SELECT {PROMO_COLUMNS} FROM promo_codes WHERE LOWER(code) = LOWER($1)"
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch promo code")
    }

    pub async fn has_redemption(&self, promo_code_id: i64, user_id: Uuid) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM promo_code_redemptions WHERE promo_code_id = $1 AND user_id = $2)",
        )
        .bind(promo_code_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to check existing redemption")
    }

    /// Returns `None` when the (code, user) pair already has a row.
    pub async fn insert_redemption(&self, new: &NewRedemption) -> Result<Option<PromoCodeRedemption>> {
        let inserted = sqlx::query_as::<_, PromoCodeRedemption>(
            r#"
            INSERT INTO promo_code_redemptions
                (promo_code_id, user_id, code, plan_id, validity_duration_days, starts_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, promo_code_id, user_id, code, plan_id, validity_duration_days, starts_at, expires_at, redeemed_at
            "#,
        )
        .bind(new.promo_code_id)
        .bind(new.user_id)
        .bind(&new.code)
        .bind(&new.plan_id)
        .bind(new.validity_duration_days)
        .bind(new.starts_at)
        .bind(new.expires_at)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => Ok(Some(row)),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                tracing::debug!(
                    "Redemption for promo {} by {} lost the unique race",
                    new.promo_code_id,
                    new.user_id
                );
                Ok(None)
            }
            Err(e) => Err(e).context("Failed to insert redemption"),
        }
    }

    /// Bumps the usage counter unless it is already at the limit.
    /// Returns whether a row was updated.
    pub async fn increment_usage(&self, promo_code_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE promo_codes SET current_usage = current_usage + 1 WHERE id = $1 AND current_usage < max_usage",
        )
        .bind(promo_code_id)
        .execute(&self.pool)
        .await
        .context("Failed to increment promo usage")?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn create(&self, new: &NewPromoCode) -> Result<PromoCode> {
        sqlx::query_as::<_, PromoCode>(&format!(
            r#"
            INSERT INTO promo_codes (code, plan_id, validity_duration_days, expiry_date, max_usage)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PROMO_COLUMNS}
            "#
        ))
        .bind(new.code.trim().to_uppercase())
        .bind(&new.plan_id)
        .bind(new.validity_duration_days)
        .bind(new.expiry_date)
        .bind(new.max_usage)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create promo code. It might already exist.")
    }

    pub async fn list(&self) -> Result<Vec<PromoCode>> {
        sqlx::query_as::<_, PromoCode>(&format!(
            "SELECT {PROMO_COLUMNS} FROM promo_codes ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list promo codes")
    }

    pub async fn set_status(&self, code: &str, status: PromoStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE promo_codes SET status = $1 WHERE LOWER(code) = LOWER($2)")
            .bind(status.to_string())
            .bind(code.trim())
            .execute(&self.pool)
            .await
            .context("Failed to update promo status")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_redemptions(&self, promo_code_id: i64) -> Result<Vec<PromoCodeRedemption>> {
        sqlx::query_as::<_, PromoCodeRedemption>(
            "SELECT id, promo_code_id, user_id, code, plan_id, validity_duration_days, starts_at, expires_at, redeemed_at FROM promo_code_redemptions WHERE promo_code_id = $1 ORDER BY redeemed_at DESC",
        )
        .bind(promo_code_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch promo redemptions")
    }
}
