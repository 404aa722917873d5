use std::time::Duration;

use crate::models::settings::Settings;

use super::exchange_rate_api::ExchangeRateApiProvider;
use super::fixed_rate::FixedRateStrategy;
use super::quote_rate::QuoteRateStrategy;
use super::traits::RateStrategy;
use super::yahoo_finance::YahooFinanceProvider;

/// Ordered chain of EUR/USD rate strategies.
///
/// Callers walk the chain front to back and stop at the first strategy that
/// yields a rate. New sources can be added without touching the callers.
pub struct RateSourceChain {
    strategies: Vec<Box<dyn RateStrategy>>,
}

impl RateSourceChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Create a chain with the default sources, in priority order.
    pub fn new_with_defaults(settings: &Settings) -> Self {
        let mut chain = Self::new();

        // Yahoo Finance FX tickers, no API key needed (primary)
        if let Ok(yahoo) = YahooFinanceProvider::new() {
            chain.register(Box::new(QuoteRateStrategy::new(
                Box::new(yahoo),
                settings.ticker_aliases.clone(),
                settings.historical_window_days,
            )));
        }

        // ExchangeRate-API, latest rates only
        chain.register(Box::new(ExchangeRateApiProvider::new(
            settings.secondary_rate_url.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )));

        // Hardcoded constant, always answers
        chain.register(Box::new(FixedRateStrategy::new(settings.fallback_rate())));

        chain
    }

    /// Append a strategy at the lowest priority.
    pub fn register(&mut self, strategy: Box<dyn RateStrategy>) {
        self.strategies.push(strategy);
    }

    /// All strategies in priority order.
    pub fn strategies(&self) -> impl Iterator<Item = &dyn RateStrategy> {
        self.strategies.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for RateSourceChain {
    fn default() -> Self {
        Self::new()
    }
}
