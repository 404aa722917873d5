// ═══════════════════════════════════════════════════════════════════
// Shared test doubles — mock quote sources and rate strategies
// ═══════════════════════════════════════════════════════════════════

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use portfolio_valuation_core::errors::CoreError;
use portfolio_valuation_core::models::price::PricePoint;
use portfolio_valuation_core::models::rate::RateResolution;
use portfolio_valuation_core::models::settings::Settings;
use portfolio_valuation_core::providers::registry::RateSourceChain;
use portfolio_valuation_core::providers::traits::{QuoteSource, RateStrategy};
use portfolio_valuation_core::services::currency_service::CurrencyService;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn at(y: i32, m: u32, day: u32, h: u32) -> NaiveDateTime {
    d(y, m, day).and_hms_opt(h, 0, 0).unwrap()
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── Quote source ────────────────────────────────────────────────────

/// Serves canned close series by ticker; unknown tickers fail.
pub struct MockQuoteSource {
    series: HashMap<String, Vec<PricePoint>>,
    calls: Arc<AtomicUsize>,
}

impl MockQuoteSource {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_series(mut self, ticker: &str, closes: &[(NaiveDate, f64)]) -> Self {
        let mut points: Vec<PricePoint> = closes
            .iter()
            .map(|(date, close)| PricePoint::new(*date, *close))
            .collect();
        points.sort_by_key(|p| p.date);
        self.series.insert(ticker.to_string(), points);
        self
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn daily_closes(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let points: Vec<PricePoint> = self
            .series
            .get(ticker)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= from && p.date <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
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

// ── Rate strategy ───────────────────────────────────────────────────

/// Canned EUR/USD answers; counts every call.
pub struct MockRateStrategy {
    name: String,
    current: RateResolution,
    historical: HashMap<NaiveDate, f64>,
    historical_default: Option<f64>,
    calls: Arc<AtomicUsize>,
}

impl MockRateStrategy {
    /// Answers `rate` for the current rate and for every historical date.
    pub fn resolved(rate: f64) -> Self {
        Self {
            name: "MockRates".into(),
            current: RateResolution::Resolved(rate),
            historical: HashMap::new(),
            historical_default: Some(rate),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Never answers.
    pub fn unavailable() -> Self {
        Self {
            name: "MockDown".into(),
            current: RateResolution::Unavailable,
            historical: HashMap::new(),
            historical_default: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Current rate only; no history.
    pub fn current_only(rate: f64) -> Self {
        Self {
            historical_default: None,
            ..Self::resolved(rate)
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_historical(mut self, date: NaiveDate, rate: f64) -> Self {
        self.historical.insert(date, rate);
        self
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl RateStrategy for MockRateStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn current_rate(&self) -> RateResolution {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.current.clone()
    }

    async fn historical_rate(&self, date: NaiveDate) -> RateResolution {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.historical
            .get(&date)
            .copied()
            .or(self.historical_default)
            .map(RateResolution::Resolved)
            .unwrap_or(RateResolution::Unavailable)
    }
}

// ── Service builders ────────────────────────────────────────────────

pub fn chain_of(strategies: Vec<Box<dyn RateStrategy>>) -> RateSourceChain {
    let mut chain = RateSourceChain::new();
    for strategy in strategies {
        chain.register(strategy);
    }
    chain
}

/// Currency service whose EUR/USD is always `rate`.
pub fn currency_service_at(rate: f64) -> CurrencyService {
    CurrencyService::new(
        chain_of(vec![Box::new(MockRateStrategy::resolved(rate))]),
        Settings::default(),
    )
}

/// Currency service with no working upstream at all.
pub fn offline_currency_service() -> CurrencyService {
    CurrencyService::new(
        chain_of(vec![Box::new(MockRateStrategy::unavailable())]),
        Settings::default(),
    )
}
