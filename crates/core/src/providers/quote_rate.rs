use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use tracing::{debug, warn};

use super::traits::{QuoteSource, RateStrategy};
use crate::models::price::PricePoint;
use crate::models::rate::RateResolution;
use crate::models::settings::{TickerAlias, MAX_WINDOW_DAYS};

/// Days of recent history fetched for the current rate, enough to span a
/// weekend or a holiday.
const RECENT_WINDOW_DAYS: i64 = 5;

/// EUR/USD from a market-quote source, trying each ticker alias in order.
pub struct QuoteRateStrategy {
    source: Box<dyn QuoteSource>,
    aliases: Vec<TickerAlias>,
    historical_window_days: i64,
    name: String,
}

impl QuoteRateStrategy {
    pub fn new(
        source: Box<dyn QuoteSource>,
        aliases: Vec<TickerAlias>,
        historical_window_days: i64,
    ) -> Self {
        let name = format!("{} quotes", source.name());
        Self {
            source,
            aliases,
            historical_window_days: historical_window_days.clamp(0, MAX_WINDOW_DAYS),
            name,
        }
    }

    /// USD per 1 EUR from a close quoted under `alias`.
    fn normalize(alias: &TickerAlias, close: f64) -> Option<f64> {
        if !close.is_finite() || close <= 0.0 {
            return None;
        }
        let rate = if alias.inverted { 1.0 / close } else { close };
        rate.is_finite().then_some(rate)
    }

    /// Point closest to `target`; on equal distance the earlier day wins.
    fn closest(points: &[PricePoint], target: NaiveDate) -> Option<&PricePoint> {
        points
            .iter()
            .min_by_key(|p| (p.date - target).num_days().abs())
    }
}

#[async_trait]
impl RateStrategy for QuoteRateStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn current_rate(&self) -> RateResolution {
        let today = Utc::now().date_naive();
        let from = today - Duration::days(RECENT_WINDOW_DAYS);

        for alias in &self.aliases {
            debug!(ticker = %alias.ticker, "Trying current EUR/USD quote");
            match self.source.daily_closes(&alias.ticker, from, today).await {
                Ok(points) => {
                    if let Some(rate) = points.last().and_then(|p| Self::normalize(alias, p.close)) {
                        return RateResolution::Resolved(rate);
                    }
                    debug!(ticker = %alias.ticker, "No usable close");
                }
                Err(e) => {
                    warn!(ticker = %alias.ticker, error = %e, "Quote fetch failed");
                }
            }
        }
        RateResolution::Unavailable
    }

    async fn historical_rate(&self, date: NaiveDate) -> RateResolution {
        let window = Duration::days(self.historical_window_days);
        let from = date.checked_sub_signed(window).unwrap_or(NaiveDate::MIN);
        let to = date.checked_add_signed(window).unwrap_or(NaiveDate::MAX);

        for alias in &self.aliases {
            debug!(ticker = %alias.ticker, %date, "Trying historical EUR/USD quote");
            match self.source.daily_closes(&alias.ticker, from, to).await {
                Ok(points) => {
                    let usable: Vec<PricePoint> = points
                        .into_iter()
                        .filter(|p| p.date >= from && p.date <= to)
                        .filter(|p| Self::normalize(alias, p.close).is_some())
                        .collect();
                    if let Some(point) = Self::closest(&usable, date) {
                        if let Some(rate) = Self::normalize(alias, point.close) {
                            debug!(ticker = %alias.ticker, day = %point.date, rate, "Historical rate found");
                            return RateResolution::Resolved(rate);
                        }
                    }
                }
                Err(e) => {
                    warn!(ticker = %alias.ticker, %date, error = %e, "Historical quote fetch failed");
                }
            }
        }
        RateResolution::Unavailable
    }
}
