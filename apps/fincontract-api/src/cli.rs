use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use fincontract_db::models::promo::{MAX_VALIDITY_DAYS, NewPromoCode, PromoStatus};
use fincontract_db::repositories::promo_repo::PromoRepository;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::utils::current_version;

/// `YYYY-MM-DD`, valid through the end of that day (UTC).
pub fn parse_expiry(date: &str) -> Result<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid expiry date '{}', expected YYYY-MM-DD", date))?;
    let end = day
        .and_hms_opt(23, 59, 59)
        .context("Invalid expiry time")?;
    Ok(end.and_utc())
}

pub fn validate_new_promo(code: &str, days: i32, max_usage: i32) -> Result<()> {
    if code.trim().is_empty() {
        anyhow::bail!("Code must not be empty");
    }
    if !(1..=MAX_VALIDITY_DAYS).contains(&days) {
        anyhow::bail!("Validity must be between 1 and {} days", MAX_VALIDITY_DAYS);
    }
    if max_usage <= 0 {
        anyhow::bail!("Max usage must be at least 1");
    }
    Ok(())
}

pub async fn create_promo(
    pool: &PgPool,
    code: &str,
    plan_id: &str,
    days: i32,
    max_usage: i32,
    expires: &str,
) -> Result<()> {
    validate_new_promo(code, days, max_usage)?;

    let repo = PromoRepository::new(pool.clone());
    let promo = repo
        .create(&NewPromoCode {
            code: code.to_string(),
            plan_id: plan_id.trim().to_lowercase(),
            validity_duration_days: days,
            expiry_date: parse_expiry(expires)?,
            max_usage,
        })
        .await?;

    println!(
        "Promo code '{}' created: {} for {} days, {} uses, valid until {}",
        promo.code, promo.plan_id, promo.validity_duration_days, promo.max_usage, promo.expiry_date
    );
    Ok(())
}

pub async fn list_promos(pool: &PgPool) -> Result<()> {
    let promos = PromoRepository::new(pool.clone()).list().await?;
    if promos.is_empty() {
        println!("No promo codes.");
        return Ok(());
    }

    let now = Utc::now();
    println!(
        "{:<16} {:<10} {:>5} {:>11} {:<9} {}",
        "CODE", "PLAN", "DAYS", "USAGE", "STATUS", "EXPIRES"
    );
    for p in promos {
        let status = if p.is_expired_at(now) { "expired" } else { p.status.as_str() };
        println!(
            "{:<16} {:<10} {:>5} {:>5}/{:<5} {:<9} {}",
            p.code,
            p.plan_id,
            p.validity_duration_days,
            p.current_usage,
            p.max_usage,
            status,
            p.expiry_date.format("%Y-%m-%d")
        );
    }
    Ok(())
}

pub async fn set_promo_status(pool: &PgPool, code: &str, status: PromoStatus) -> Result<()> {
    let updated = PromoRepository::new(pool.clone())
        .set_status(code, status)
        .await?;
    if !updated {
        anyhow::bail!("Promo code '{}' not found", code);
    }
    println!("Promo code '{}' is now {}.", code.trim().to_uppercase(), status);
    Ok(())
}

pub async fn list_redemptions(pool: &PgPool, code: &str) -> Result<()> {
    let repo = PromoRepository::new(pool.clone());
    let promo = repo
        .find_by_code(code)
        .await?
        .with_context(|| format!("Promo code '{}' not found", code))?;

    let redemptions = repo.list_redemptions(promo.id).await?;
    println!(
        "{}: {} redemption(s), usage {}/{} ({:.0}%)",
        promo.code,
        redemptions.len(),
        promo.current_usage,
        promo.max_usage,
        promo.usage_pct()
    );
    for r in redemptions {
        println!(
            "  {}  {} -> {}  (redeemed {})",
            r.user_id,
            r.starts_at.format("%Y-%m-%d"),
            r.expires_at.format("%Y-%m-%d"),
            r.redeemed_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub fn print_info(config: &AppConfig) {
    println!("\n=== FINCONTRACT API ===");
    println!("Version:     {}", current_version());
    println!("Port:        {}", config.listen_port);
    println!("Analysis:    {}", if config.demo_mode { "demo" } else { config.analysis.base_url.as_str() });
    println!("Audit log:   {}", if config.redis_url.is_some() { "redis" } else { "in-memory" });
    let plans: Vec<&str> = config.checkout.products.keys().map(String::as_str).collect();
    println!("Paid plans:  {}", if plans.is_empty() { "-".to_string() } else { plans.join(", ") });
    println!("=======================\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn expiry_covers_the_whole_day() {
        let expiry = parse_expiry("2026-12-31").unwrap();
        assert_eq!((expiry.year(), expiry.month(), expiry.day()), (2026, 12, 31));
        assert_eq!((expiry.hour(), expiry.minute(), expiry.second()), (23, 59, 59));
    }

    #[test]
    fn validity_is_capped() {
        assert!(validate_new_promo("SPRING", 30, 10).is_ok());
        assert!(validate_new_promo("SPRING", MAX_VALIDITY_DAYS, 10).is_ok());
        assert!(validate_new_promo("SPRING", MAX_VALIDITY_DAYS + 1, 10).is_err());
        assert!(validate_new_promo("SPRING", i32::MAX, 10).is_err());
        assert!(validate_new_promo("SPRING", 0, 10).is_err());
        assert!(validate_new_promo("  ", 30, 10).is_err());
        assert!(validate_new_promo("SPRING", 30, 0).is_err());
    }

    #[test]
    fn malformed_expiry_is_rejected() {
        assert!(parse_expiry("31/12/2026").is_err());
        assert!(parse_expiry("2026-02-30").is_err());
    }
}
