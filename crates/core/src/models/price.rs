use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A daily close for a product.
///
/// `close` is in the product's native currency. The EUR/USD equivalents are
/// computed by the ingestion side when the point is stored and may be absent
/// for points imported without conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
    #[serde(default)]
    pub close_eur: Option<f64>,
    #[serde(default)]
    pub close_usd: Option<f64>,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            close_eur: None,
            close_usd: None,
        }
    }

    pub fn with_equivalents(mut self, close_eur: f64, close_usd: f64) -> Self {
        self.close_eur = Some(close_eur);
        self.close_usd = Some(close_usd);
        self
    }
}

/// Read access to stored price history, keyed by (symbol, date).
pub trait PriceHistorySource: Send + Sync {
    /// Points for `symbol` with `from <= date <= to`, sorted by date.
    fn price_points(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Vec<PricePoint>;
}

/// In-memory price history: symbol → points sorted by date.
///
/// One point per (symbol, date); writing an existing date replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceHistory {
    entries: HashMap<String, Vec<PricePoint>>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact point for (symbol, date). Binary search, O(log n).
    pub fn get(&self, symbol: &str, date: NaiveDate) -> Option<&PricePoint> {
        let points = self.entries.get(&symbol.to_uppercase())?;
        points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| &points[idx])
    }

    /// Insert or replace the point for its date, keeping date order.
    pub fn upsert(&mut self, symbol: &str, point: PricePoint) {
        let points = self.entries.entry(symbol.to_uppercase()).or_default();
        match points.binary_search_by_key(&point.date, |p| p.date) {
            Ok(idx) => points[idx] = point,
            Err(idx) => points.insert(idx, point),
        }
    }

    pub fn upsert_many(&mut self, symbol: &str, points: impl IntoIterator<Item = PricePoint>) {
        for point in points {
            self.upsert(symbol, point);
        }
    }

    /// Drop all points for a symbol. Returns how many were removed.
    pub fn clear_symbol(&mut self, symbol: &str) -> usize {
        self.entries
            .remove(&symbol.to_uppercase())
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// Most recent point for a symbol, if any.
    pub fn latest(&self, symbol: &str) -> Option<&PricePoint> {
        self.entries.get(&symbol.to_uppercase())?.last()
    }

    pub fn total_entries(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }

    pub fn symbol_count(&self) -> usize {
        self.entries.len()
    }
}

impl PriceHistorySource for PriceHistory {
    fn price_points(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Vec<PricePoint> {
        if from > to {
            return Vec::new();
        }
        self.entries
            .get(&symbol.to_uppercase())
            .map(|points| {
                let start = points.partition_point(|p| p.date < from);
                let end = points.partition_point(|p| p.date <= to);
                points[start..end].to_vec()
            })
            .unwrap_or_default()
    }
}
