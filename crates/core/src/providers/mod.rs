pub mod registry;
pub mod traits;

// Upstream sources
pub mod exchange_rate_api;
pub mod fixed_rate;
pub mod quote_rate;
pub mod yahoo_finance;
