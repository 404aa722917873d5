use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};

use crate::models::rate::{
    Conversion, DegradedReason, ExchangeRate, FxQuote, PriceEquivalents, RateCache,
    RateResolution, REFERENCE_CURRENCY,
};
use crate::models::settings::Settings;
use crate::providers::registry::RateSourceChain;

const USD: &str = "USD";
const TABLE_SOURCE: &str = "Historical rate table";
const FALLBACK_SOURCE: &str = "Fallback constant";

/// EUR/USD rates and conversions between the supported currencies.
///
/// Supported currencies are EUR, USD and the fixed-rate set from `Settings`
/// (GBP, CHF, CAD, JPY by default). Every conversion goes through EUR:
/// - EUR ↔ USD uses the live rate, or the historical rate when a date is given
/// - fixed currencies use their EUR rate
/// - anything else is passed through unchanged and flagged as degraded
///
/// Nothing here returns an error. The worst case is the fallback constant
/// with `DegradedReason::FallbackConstant`.
pub struct CurrencyService {
    chain: RateSourceChain,
    settings: Settings,
}

impl CurrencyService {
    pub fn new(chain: RateSourceChain, settings: Settings) -> Self {
        Self { chain, settings }
    }

    /// Service backed by the default upstream chain for these settings.
    pub fn with_defaults(settings: Settings) -> Self {
        let chain = RateSourceChain::new_with_defaults(&settings);
        Self::new(chain, settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_supported(&self, currency: &str) -> bool {
        let currency = currency.to_uppercase();
        currency == REFERENCE_CURRENCY
            || currency == USD
            || self.settings.fixed_rate(&currency).is_some()
    }

    /// Current USD per 1 EUR.
    ///
    /// Served from the cache while it is younger than the refresh window;
    /// otherwise the chain is walked and the winner is cached with a fresh
    /// timestamp, fallback constant included.
    pub async fn get_current_rate(&self, cache: &mut RateCache) -> FxQuote {
        let now = Utc::now();
        if let Some(quote) = cache.fresh_current(now, self.settings.refresh_window()) {
            debug!(rate = quote.rate, source = %quote.source, "Current EUR/USD from cache");
            return quote.clone();
        }

        let quote = self.resolve_current().await;
        cache.set_current(quote.clone(), now);
        quote
    }

    async fn resolve_current(&self) -> FxQuote {
        for strategy in self.chain.strategies() {
            debug!(source = strategy.name(), "Trying current EUR/USD");
            match strategy.current_rate().await {
                RateResolution::Resolved(rate) if is_valid_rate(rate) => {
                    debug!(rate, source = strategy.name(), "Current EUR/USD resolved");
                    return FxQuote {
                        rate,
                        source: strategy.name().to_string(),
                        degraded: None,
                    };
                }
                RateResolution::Degraded { rate, reason } if is_valid_rate(rate) => {
                    warn!(rate, source = strategy.name(), %reason, "Degraded EUR/USD rate");
                    return FxQuote {
                        rate,
                        source: strategy.name().to_string(),
                        degraded: Some(reason),
                    };
                }
                RateResolution::Unavailable => {
                    debug!(source = strategy.name(), "No current EUR/USD");
                }
                other => {
                    warn!(source = strategy.name(), ?other, "Discarding invalid EUR/USD rate");
                }
            }
        }

        let rate = self.settings.fallback_rate();
        warn!(rate, "No EUR/USD source answered, using fallback constant");
        FxQuote {
            rate,
            source: FALLBACK_SOURCE.to_string(),
            degraded: Some(DegradedReason::FallbackConstant),
        }
    }

    /// USD per 1 EUR on `date`.
    ///
    /// Cached days are answered without touching any upstream. A day no
    /// upstream could resolve is remembered for the refresh window and
    /// answered with the current rate, so repeated lookups return the same
    /// value.
    pub async fn get_historical_rate(&self, cache: &mut RateCache, date: NaiveDate) -> FxQuote {
        if let Some(rate) = cache.get_rate(REFERENCE_CURRENCY, USD, date) {
            debug!(%date, rate, "Historical EUR/USD from cache");
            return FxQuote {
                rate,
                source: TABLE_SOURCE.to_string(),
                degraded: None,
            };
        }

        let now = Utc::now();
        let window = self.settings.refresh_window();
        if !cache.is_recent_miss(date, now, window) {
            if let Some(rate) = self.resolve_historical(date).await {
                cache.upsert(ExchangeRate {
                    from_currency: REFERENCE_CURRENCY.to_string(),
                    to_currency: USD.to_string(),
                    date,
                    rate,
                });
                return FxQuote {
                    rate,
                    source: TABLE_SOURCE.to_string(),
                    degraded: None,
                };
            }
            warn!(%date, "No historical EUR/USD, falling back to current rate");
            cache.record_miss(date, now);
        } else {
            debug!(%date, "Historical EUR/USD recently unavailable");
        }

        let current = self.get_current_rate(cache).await;
        let degraded = match current.degraded {
            Some(DegradedReason::FallbackConstant) => DegradedReason::FallbackConstant,
            _ => DegradedReason::HistoricalUnavailable { date },
        };
        FxQuote {
            rate: current.rate,
            source: current.source,
            degraded: Some(degraded),
        }
    }

    async fn resolve_historical(&self, date: NaiveDate) -> Option<f64> {
        for strategy in self.chain.strategies() {
            match strategy.historical_rate(date).await {
                RateResolution::Resolved(rate) if is_valid_rate(rate) => {
                    debug!(%date, rate, source = strategy.name(), "Historical EUR/USD resolved");
                    return Some(rate);
                }
                RateResolution::Unavailable => {}
                other => {
                    debug!(%date, source = strategy.name(), ?other, "Skipping historical answer");
                }
            }
        }
        None
    }

    /// EUR/USD for a conversion: historical when dated, current otherwise.
    async fn eur_usd(&self, cache: &mut RateCache, as_of: Option<NaiveDate>) -> FxQuote {
        match as_of {
            Some(date) => self.get_historical_rate(cache, date).await,
            None => self.get_current_rate(cache).await,
        }
    }

    /// Convert `amount` from one currency to another, composing through EUR.
    ///
    /// With `as_of`, EUR↔USD legs use that day's rate; fixed rates ignore
    /// the date. An unsupported currency returns the amount unchanged.
    pub async fn convert(
        &self,
        cache: &mut RateCache,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
        as_of: Option<NaiveDate>,
    ) -> Conversion {
        let from = from_currency.to_uppercase();
        let to = to_currency.to_uppercase();

        if from == to {
            return Conversion::exact(amount);
        }

        if let Some(unsupported) = [&from, &to].into_iter().find(|c| !self.is_supported(c)) {
            warn!(currency = %unsupported, %from, %to, "Unsupported currency, amount not converted");
            return Conversion {
                amount,
                degraded: Some(DegradedReason::UnsupportedCurrency {
                    currency: unsupported.clone(),
                }),
            };
        }

        let mut degraded = None;

        // Step 1: source → EUR
        let amount_eur = match from.as_str() {
            REFERENCE_CURRENCY => amount,
            USD => {
                let quote = self.eur_usd(cache, as_of).await;
                degraded = quote.degraded;
                amount / quote.rate
            }
            fixed => amount * self.fixed_rate(fixed),
        };

        // Step 2: EUR → target
        let converted = match to.as_str() {
            REFERENCE_CURRENCY => amount_eur,
            USD => {
                let quote = self.eur_usd(cache, as_of).await;
                degraded = quote.degraded;
                amount_eur * quote.rate
            }
            fixed => amount_eur / self.fixed_rate(fixed),
        };

        Conversion {
            amount: converted,
            degraded,
        }
    }

    /// EUR and USD equivalents of a native price at the current rate.
    pub async fn convert_price_to_both(
        &self,
        cache: &mut RateCache,
        price: f64,
        currency: &str,
    ) -> PriceEquivalents {
        let eur = self
            .convert(cache, price, currency, REFERENCE_CURRENCY, None)
            .await;
        let usd = self.convert(cache, price, currency, USD, None).await;
        PriceEquivalents {
            eur: eur.amount,
            usd: usd.amount,
            degraded: eur.degraded.or(usd.degraded),
        }
    }

    // Only called for currencies that passed `is_supported`.
    fn fixed_rate(&self, currency: &str) -> f64 {
        self.settings.fixed_rate(currency).unwrap_or(1.0)
    }
}

impl Default for CurrencyService {
    fn default() -> Self {
        Self::with_defaults(Settings::default())
    }
}

fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}
