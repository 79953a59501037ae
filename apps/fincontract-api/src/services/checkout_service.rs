use std::collections::BTreeMap;

use fincontract_db::models::plan::FREE_PLAN_ID;
use fincontract_shared::billing::PlanOffer;
use url::Url;
use uuid::Uuid;

use crate::error::ApiError;

/// Builds Gumroad checkout links for paid plans.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    products: BTreeMap<String, String>,
}

impl CheckoutService {
    pub fn new(products: BTreeMap<String, String>) -> Self {
        Self { products }
    }

    pub fn plans(&self) -> Vec<PlanOffer> {
        self.products
            .iter()
            .filter(|(plan, _)| plan.as_str() != FREE_PLAN_ID)
            .map(|(plan, url)| PlanOffer {
                plan_id: plan.clone(),
                checkout_base: url.clone(),
            })
            .collect()
    }

    pub fn checkout_url(
        &self,
        plan_id: &str,
        user_id: Uuid,
        email: Option<&str>,
    ) -> Result<String, ApiError> {
        let plan_id = plan_id.trim().to_lowercase();
        if plan_id.is_empty() {
            return Err(ApiError::BadRequest("plan_id is required".to_string()));
        }
        if plan_id == FREE_PLAN_ID {
            return Err(ApiError::BadRequest("The free plan has no checkout".to_string()));
        }

        let base = self
            .products
            .get(&plan_id)
            .ok_or_else(|| ApiError::BadRequest("Unknown plan".to_string()))?;

        let mut url = Url::parse(base).map_err(|e| {
            ApiError::Internal(anyhow::anyhow!("Invalid checkout URL for {}: {}", plan_id, e))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("wanted", "true");
            query.append_pair("user_id", &user_id.to_string());
            query.append_pair("plan_id", &plan_id);
            if let Some(email) = email.filter(|e| !e.is_empty()) {
                query.append_pair("email", email);
            }
        }
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn service() -> CheckoutService {
        CheckoutService::new(test_config().checkout.products)
    }

    #[test]
    fn url_carries_encoded_parameters() {
        let user = Uuid::from_u128(7);
        let url = service()
            .checkout_url("Premium", user, Some("a+b@example.com"))
            .unwrap();

        assert!(url.starts_with("https://fincontract.gumroad.com/l/premium?wanted=true"));
        assert!(url.contains(&format!("user_id={}", user)));
        assert!(url.contains("plan_id=premium"));
        assert!(url.contains("email=a%2Bb%40example.com"));
    }

    #[test]
    fn email_is_optional() {
        let url = service().checkout_url("pro", Uuid::nil(), None).unwrap();
        assert!(!url.contains("email="));
    }

    #[test]
    fn free_and_unknown_plans_are_rejected() {
        let svc = service();
        assert!(matches!(
            svc.checkout_url("free", Uuid::nil(), None),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            svc.checkout_url("enterprise", Uuid::nil(), None),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn plans_list_configured_products() {
        let plans = service().plans();
        let ids: Vec<&str> = plans.iter().map(|p| p.plan_id.as_str()).collect();
        assert_eq!(ids, vec!["premium", "pro"]);
    }
}
