use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::rate::RateResolution;

/// A market-quote upstream serving daily close series by ticker.
///
/// Used both for FX tickers (e.g. `EURUSD=X`) and for product price
/// backfills. Implementations report failures as `CoreError`; callers decide
/// whether to fall back.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Human-readable name of this source (for logs/errors).
    fn name(&self) -> &str;

    /// Daily closes for `ticker` with `from <= date <= to`, sorted by date.
    /// Only `date` and `close` are filled in.
    async fn daily_closes(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError>;
}

/// One link of the EUR/USD fallback chain.
///
/// Strategies never fail: an upstream error becomes
/// `RateResolution::Unavailable` and the chain moves on to the next one.
/// All rates are USD per 1 EUR.
#[async_trait]
pub trait RateStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn current_rate(&self) -> RateResolution;

    /// Rate for a past date. Strategies without history opt out.
    async fn historical_rate(&self, _date: NaiveDate) -> RateResolution {
        RateResolution::Unavailable
    }
}
