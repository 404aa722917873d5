use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::catalog::AssetClass;
use crate::errors::CoreError;

/// USD per 1 EUR used when the configured constant is unusable.
pub const DEFAULT_FALLBACK_EUR_USD: f64 = 1.08;

/// Upper bound for the day windows (historical search, price lookups).
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// Upper bound for the current-rate refresh window, one year.
pub const MAX_REFRESH_WINDOW_HOURS: i64 = 8760;

/// A market-quote ticker for the EUR/USD pair.
///
/// `inverted` is set when the ticker quotes USD→EUR (EUR per 1 USD), in
/// which case the close is inverted to get USD per 1 EUR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerAlias {
    pub ticker: String,
    pub inverted: bool,
}

impl TickerAlias {
    pub fn direct(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            inverted: false,
        }
    }

    pub fn inverted(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            inverted: true,
        }
    }
}

/// Tunables for the valuation engine. Every field has a default, so a
/// partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How long a current EUR/USD rate stays valid.
    pub refresh_window_hours: i64,

    /// USD per 1 EUR used when no upstream answers.
    pub fallback_eur_usd: f64,

    /// Fixed rates for other currencies, in EUR per 1 unit.
    pub fixed_rates_to_eur: BTreeMap<String, f64>,

    /// Quote tickers tried in order for EUR/USD.
    pub ticker_aliases: Vec<TickerAlias>,

    /// Half-width of the window searched around a historical date.
    pub historical_window_days: i64,

    /// Base URL of the secondary REST rate source.
    pub secondary_rate_url: String,

    pub request_timeout_secs: u64,

    /// Trailing window for price lookups when no exact point exists.
    pub price_window_days: i64,

    /// Per-asset-class override of `price_window_days`.
    pub price_window_overrides: BTreeMap<AssetClass, i64>,

    /// Delay between products during a price backfill.
    pub backfill_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let fixed_rates_to_eur = [("GBP", 1.15), ("CHF", 0.95), ("CAD", 0.65), ("JPY", 0.0067)]
            .into_iter()
            .map(|(c, r)| (c.to_string(), r))
            .collect();

        Self {
            refresh_window_hours: 6,
            fallback_eur_usd: DEFAULT_FALLBACK_EUR_USD,
            fixed_rates_to_eur,
            ticker_aliases: vec![
                TickerAlias::direct("EURUSD=X"),
                TickerAlias::inverted("EUR=X"),
                TickerAlias::inverted("USDEUR=X"),
            ],
            historical_window_days: 7,
            secondary_rate_url: "https://api.exchangerate-api.com/v4".to_string(),
            request_timeout_secs: 10,
            price_window_days: 7,
            price_window_overrides: BTreeMap::new(),
            backfill_delay_ms: 1000,
        }
    }
}

impl Settings {
    /// Parse settings from JSON and validate them.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize settings: {e}")))
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.fallback_eur_usd.is_finite() || self.fallback_eur_usd <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Fallback EUR/USD rate must be positive, got {}",
                self.fallback_eur_usd
            )));
        }
        if !(0..=MAX_REFRESH_WINDOW_HOURS).contains(&self.refresh_window_hours) {
            return Err(CoreError::ValidationError(format!(
                "Refresh window must be between 0 and {MAX_REFRESH_WINDOW_HOURS} hours, got {}",
                self.refresh_window_hours
            )));
        }
        for (field, days) in [
            ("Historical window", self.historical_window_days),
            ("Price window", self.price_window_days),
        ] {
            if !(0..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(CoreError::ValidationError(format!(
                    "{field} must be between 0 and {MAX_WINDOW_DAYS} days, got {days}"
                )));
            }
        }
        if let Some((class, days)) = self
            .price_window_overrides
            .iter()
            .find(|(_, d)| !(0..=MAX_WINDOW_DAYS).contains(*d))
        {
            return Err(CoreError::ValidationError(format!(
                "Price window for {class} must be between 0 and {MAX_WINDOW_DAYS} days, got {days}"
            )));
        }
        for (currency, rate) in &self.fixed_rates_to_eur {
            if !rate.is_finite() || *rate <= 0.0 {
                return Err(CoreError::ValidationError(format!(
                    "Fixed rate for {currency} must be positive, got {rate}"
                )));
            }
        }
        Ok(())
    }

    /// EUR per 1 unit of `currency`, for the fixed-rate currencies.
    /// Non-positive rates count as absent.
    pub fn fixed_rate(&self, currency: &str) -> Option<f64> {
        self.fixed_rates_to_eur
            .get(&currency.to_uppercase())
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
    }

    /// The configured fallback EUR/USD, or the built-in one if it is unusable.
    pub fn fallback_rate(&self) -> f64 {
        if self.fallback_eur_usd.is_finite() && self.fallback_eur_usd > 0.0 {
            self.fallback_eur_usd
        } else {
            DEFAULT_FALLBACK_EUR_USD
        }
    }

    pub fn price_window_for(&self, asset_class: AssetClass) -> i64 {
        self.price_window_overrides
            .get(&asset_class)
            .copied()
            .unwrap_or(self.price_window_days)
            .clamp(0, MAX_WINDOW_DAYS)
    }

    pub fn refresh_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.refresh_window_hours.clamp(0, MAX_REFRESH_WINDOW_HOURS))
    }
}
