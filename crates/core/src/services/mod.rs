pub mod backfill_service;
pub mod currency_service;
pub mod evolution_service;
pub mod position_service;
pub mod price_service;
pub mod summary_service;
