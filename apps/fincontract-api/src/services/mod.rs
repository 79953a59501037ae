pub mod analysis_service;
pub mod audit_service;
pub mod checkout_service;
pub mod contract_service;
pub mod promo_service;
