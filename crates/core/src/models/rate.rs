use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Currency every valuation is aggregated in.
pub const REFERENCE_CURRENCY: &str = "EUR";

/// Why a returned rate or amount should not be taken as authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DegradedReason {
    /// No upstream answered; the configured constant was used.
    FallbackConstant,
    /// No historical quote for `date`; the current rate was used instead.
    HistoricalUnavailable { date: NaiveDate },
    /// Currency outside the supported set; the amount was passed through.
    UnsupportedCurrency { currency: String },
}

impl std::fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradedReason::FallbackConstant => write!(f, "fallback constant rate in use"),
            DegradedReason::HistoricalUnavailable { date } => {
                write!(f, "no historical rate for {date}, current rate used")
            }
            DegradedReason::UnsupportedCurrency { currency } => {
                write!(f, "unsupported currency {currency}, amount not converted")
            }
        }
    }
}

/// Outcome of a single rate strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum RateResolution {
    Resolved(f64),
    Degraded { rate: f64, reason: DegradedReason },
    Unavailable,
}

impl RateResolution {
    pub fn rate(&self) -> Option<f64> {
        match self {
            RateResolution::Resolved(rate) | RateResolution::Degraded { rate, .. } => Some(*rate),
            RateResolution::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, RateResolution::Unavailable)
    }
}

/// A EUR/USD rate (USD per 1 EUR) together with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxQuote {
    pub rate: f64,
    pub source: String,
    pub degraded: Option<DegradedReason>,
}

impl FxQuote {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Result of converting an amount between currencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub amount: f64,
    pub degraded: Option<DegradedReason>,
}

impl Conversion {
    pub fn exact(amount: f64) -> Self {
        Self {
            amount,
            degraded: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// One row of the exchange-rate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub date: NaiveDate,
    pub rate: f64,
}

/// The current EUR/USD rate and when it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentRate {
    pub quote: FxQuote,
    pub fetched_at: DateTime<Utc>,
}

type RateKey = (String, String, NaiveDate);

/// Rate cache owned by the caller and lent to `CurrencyService`.
///
/// - `current`: last current-rate result; fresh for the refresh window.
/// - `rates`: historical exchange-rate table, one rate per (from, to, date).
/// - `misses`: dates no upstream could resolve, remembered for the refresh
///   window so repeated lookups do not hammer the upstreams. Not persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateCache {
    current: Option<CurrentRate>,
    rates: BTreeMap<RateKey, f64>,
    #[serde(skip)]
    misses: HashMap<NaiveDate, DateTime<Utc>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&CurrentRate> {
        self.current.as_ref()
    }

    pub fn set_current(&mut self, quote: FxQuote, fetched_at: DateTime<Utc>) {
        self.current = Some(CurrentRate { quote, fetched_at });
    }

    /// The current rate if it was fetched less than `window` before `now`.
    pub fn fresh_current(&self, now: DateTime<Utc>, window: Duration) -> Option<&FxQuote> {
        self.current
            .as_ref()
            .filter(|c| now - c.fetched_at < window)
            .map(|c| &c.quote)
    }

    /// Forget the current rate so the next lookup goes upstream.
    pub fn invalidate_current(&mut self) {
        self.current = None;
    }

    pub fn get_rate(&self, from: &str, to: &str, date: NaiveDate) -> Option<f64> {
        self.rates
            .get(&(from.to_uppercase(), to.to_uppercase(), date))
            .copied()
    }

    /// Insert or overwrite the rate for (from, to, date).
    pub fn upsert(&mut self, rate: ExchangeRate) {
        self.misses.remove(&rate.date);
        self.rates.insert(
            (
                rate.from_currency.to_uppercase(),
                rate.to_currency.to_uppercase(),
                rate.date,
            ),
            rate.rate,
        );
    }

    /// All stored rates, ordered by (from, to, date).
    pub fn exchange_rates(&self) -> Vec<ExchangeRate> {
        self.rates
            .iter()
            .map(|((from, to, date), rate)| ExchangeRate {
                from_currency: from.clone(),
                to_currency: to.clone(),
                date: *date,
                rate: *rate,
            })
            .collect()
    }

    pub fn record_miss(&mut self, date: NaiveDate, at: DateTime<Utc>) {
        self.misses.insert(date, at);
    }

    pub fn is_recent_miss(&self, date: NaiveDate, now: DateTime<Utc>, window: Duration) -> bool {
        self.misses.get(&date).is_some_and(|at| now - *at < window)
    }

    pub fn clear_misses(&mut self) {
        self.misses.clear();
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// A native price expressed in both EUR and USD at the current rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEquivalents {
    pub eur: f64,
    pub usd: f64,
    pub degraded: Option<DegradedReason>,
}
