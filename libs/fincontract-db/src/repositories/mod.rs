pub mod contract_repo;
pub mod plan_repo;
pub mod promo_repo;
