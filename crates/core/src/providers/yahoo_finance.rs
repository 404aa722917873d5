use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use super::traits::QuoteSource;
use crate::errors::CoreError;
use crate::models::price::PricePoint;

const PROVIDER: &str = "Yahoo Finance";

/// Yahoo Finance quote source.
///
/// - **Free**: No API key required.
/// - **Coverage**: equities, ETFs, funds, crypto pairs and FX tickers
///   (`EURUSD=X`, `EUR=X`, ...).
///
/// Closes are returned in the ticker's native currency; conversion is the
/// caller's job.
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Midnight UTC of `date` as a `time::OffsetDateTime`.
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let invalid = |e: String| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid date {date}: {e}"),
        };
        let month = time::Month::try_from(date.month() as u8).map_err(|e| invalid(e.to_string()))?;
        let odt = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| invalid(e.to_string()))?
            .midnight()
            .assume_utc();
        Ok(odt)
    }

    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }

    /// Sort by date and keep one point per day, the last one received.
    /// Intraday rows come before the settled close upstream.
    pub fn daily_points(mut points: Vec<PricePoint>) -> Vec<PricePoint> {
        points.sort_by_key(|p| p.date);
        points.reverse();
        points.dedup_by_key(|p| p.date);
        points.reverse();
        points
    }
}

#[async_trait]
impl QuoteSource for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    #[instrument(name = "YahooDailyCloses", skip(self), fields(ticker = %ticker))]
    async fn daily_closes(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let start = Self::to_offset_datetime(from)?;
        // end is exclusive upstream
        let end = Self::to_offset_datetime(to + Duration::days(1))?;

        let resp = self
            .connector
            .get_quote_history(ticker, start, end)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch history for {ticker}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse quotes for {ticker}: {e}"),
        })?;
        debug!(count = quotes.len(), "Received quotes");

        let points: Vec<PricePoint> = quotes
            .iter()
            .filter(|q| q.close.is_finite())
            .filter_map(|q| {
                let date = Self::timestamp_to_naive_date(q.timestamp as i64)?;
                (date >= from && date <= to).then(|| PricePoint::new(date, q.close))
            })
            .collect();
        let points = Self::daily_points(points);

        if points.is_empty() {
            return Err(CoreError::NoQuoteData {
                ticker: ticker.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(points)
    }
}
