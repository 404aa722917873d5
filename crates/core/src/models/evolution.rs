use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use super::catalog::{AccountId, AssetClass};

/// Attribute used to split a sample's total into subtotals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreakdownDimension {
    Account,
    Platform,
    AssetClass,
    Product,
    Currency,
}

/// A breakdown bucket. The variant always matches the active dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Account(String),
    Platform(String),
    AssetClass(AssetClass),
    Product(String),
    Currency(String),
}

impl Category {
    pub fn dimension(&self) -> BreakdownDimension {
        match self {
            Category::Account(_) => BreakdownDimension::Account,
            Category::Platform(_) => BreakdownDimension::Platform,
            Category::AssetClass(_) => BreakdownDimension::AssetClass,
            Category::Product(_) => BreakdownDimension::Product,
            Category::Currency(_) => BreakdownDimension::Currency,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Account(name)
            | Category::Platform(name)
            | Category::Product(name)
            | Category::Currency(name) => write!(f, "{name}"),
            Category::AssetClass(class) => write!(f, "{class}"),
        }
    }
}

/// Subtotals per category for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub dimension: BreakdownDimension,
    #[serde(serialize_with = "serialize_by_label")]
    pub subtotals: BTreeMap<Category, f64>,
}

fn serialize_by_label<S: Serializer>(
    subtotals: &BTreeMap<Category, f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(subtotals.iter().map(|(c, v)| (c.to_string(), v)))
}

impl Breakdown {
    pub fn new(dimension: BreakdownDimension) -> Self {
        Self {
            dimension,
            subtotals: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, category: Category, value: f64) {
        debug_assert_eq!(category.dimension(), self.dimension);
        *self.subtotals.entry(category).or_insert(0.0) += value;
    }

    pub fn get(&self, category: &Category) -> Option<f64> {
        self.subtotals.get(category).copied()
    }

    pub fn total(&self) -> f64 {
        self.subtotals.values().sum()
    }
}

/// Valuation of the portfolio on one sample date, in EUR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionSample {
    pub date: NaiveDate,
    pub total_value: f64,
    pub total_invested: f64,
    pub gain_loss: f64,
    pub breakdown: Breakdown,
    /// Held symbols that could not be priced on this date.
    pub unpriced: Vec<String>,
    /// Set when a price was missing or a rate was not authoritative.
    pub degraded: bool,
}

/// How far apart sample dates are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingFrequency {
    Daily,
    EveryTwoDays,
    Weekly,
}

impl SamplingFrequency {
    /// ≤ 7 days → daily, ≤ 30 → every 2 days, else weekly.
    pub fn for_span(span_days: i64) -> Self {
        if span_days <= 7 {
            SamplingFrequency::Daily
        } else if span_days <= 30 {
            SamplingFrequency::EveryTwoDays
        } else {
            SamplingFrequency::Weekly
        }
    }

    pub fn step(&self) -> Duration {
        match self {
            SamplingFrequency::Daily => Duration::days(1),
            SamplingFrequency::EveryTwoDays => Duration::days(2),
            SamplingFrequency::Weekly => Duration::days(7),
        }
    }

    /// Sample dates from `start` stepping forward; `end` is always the last
    /// date even when the step does not land on it.
    pub fn sample_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        if start > end {
            return dates;
        }
        let step = self.step();
        let mut current = start;
        while current <= end {
            dates.push(current);
            current = match current.checked_add_signed(step) {
                Some(next) => next,
                None => break,
            };
        }
        if dates.last() != Some(&end) {
            dates.push(end);
        }
        dates
    }
}

/// Restricts which transactions are replayed. Empty lists mean "all".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionFilter {
    #[serde(default)]
    pub accounts: Vec<AccountId>,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub asset_classes: Vec<AssetClass>,
}

impl EvolutionFilter {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.symbols.is_empty() && self.asset_classes.is_empty()
    }
}

/// Parameters of an evolution series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub dimension: BreakdownDimension,
    #[serde(default)]
    pub filter: EvolutionFilter,
}

impl EvolutionRequest {
    pub fn new(start: NaiveDate, end: NaiveDate, dimension: BreakdownDimension) -> Self {
        Self {
            start,
            end,
            dimension,
            filter: EvolutionFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: EvolutionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn frequency(&self) -> SamplingFrequency {
        SamplingFrequency::for_span(self.span_days())
    }
}
