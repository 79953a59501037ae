pub mod audit;
pub mod billing;
pub mod contracts;
pub mod format;
pub mod health;
pub mod promo;
