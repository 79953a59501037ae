pub mod contract;
pub mod plan;
pub mod promo;
