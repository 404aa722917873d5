use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::catalog::{AssetClass, Product};
use crate::models::price::{PriceHistorySource, PricePoint};
use crate::models::rate::{DegradedReason, RateCache, REFERENCE_CURRENCY};
use crate::models::settings::{Settings, MAX_WINDOW_DAYS};
use crate::services::currency_service::CurrencyService;

/// Where a resolved price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceSource {
    /// A point on the requested date
    Exact,
    /// The latest point inside the trailing window
    Trailing { date: NaiveDate },
    /// The product's last known price
    LastKnown,
}

/// A unit price in EUR for one (symbol, date).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPrice {
    pub price_eur: f64,
    pub source: PriceSource,
    /// Set when the EUR figure came from a non-authoritative conversion.
    pub degraded: Option<DegradedReason>,
}

/// Resolves the best available EUR price for a product on a date.
///
/// Resolution order:
/// 1. the point on that exact date
/// 2. the latest point at or before the date within the trailing window
/// 3. the product's last known price
///
/// Points without a stored EUR equivalent are converted from their native
/// close at the current rate. Non-positive prices count as missing.
pub struct PriceService {
    window_days: i64,
    window_overrides: BTreeMap<AssetClass, i64>,
}

impl PriceService {
    pub fn new(settings: &Settings) -> Self {
        Self {
            window_days: settings.price_window_days,
            window_overrides: settings.price_window_overrides.clone(),
        }
    }

    /// Trailing window for a product's asset class.
    pub fn window_for(&self, asset_class: Option<AssetClass>) -> i64 {
        asset_class
            .and_then(|class| self.window_overrides.get(&class).copied())
            .unwrap_or(self.window_days)
            .clamp(0, MAX_WINDOW_DAYS)
    }

    /// Best EUR price for `symbol` on `date`, or `None` if nothing usable
    /// exists. `product` supplies the native currency, the asset class and
    /// the last known price; without it closes are taken as EUR.
    pub async fn resolve_price(
        &self,
        history: &dyn PriceHistorySource,
        currency_service: &CurrencyService,
        cache: &mut RateCache,
        symbol: &str,
        product: Option<&Product>,
        date: NaiveDate,
    ) -> Option<ResolvedPrice> {
        let native = product
            .map(|p| p.currency.as_str())
            .unwrap_or(REFERENCE_CURRENCY);
        let window = self.window_for(product.map(|p| p.asset_class));
        let from = date
            .checked_sub_signed(Duration::days(window))
            .unwrap_or(NaiveDate::MIN);

        // Latest first; the first positive price wins.
        let points = history.price_points(symbol, from, date);
        for point in points.iter().rev() {
            if let Some((price_eur, degraded)) =
                Self::point_in_eur(point, native, currency_service, cache).await
            {
                let source = if point.date == date {
                    PriceSource::Exact
                } else {
                    PriceSource::Trailing { date: point.date }
                };
                return Some(ResolvedPrice {
                    price_eur,
                    source,
                    degraded,
                });
            }
        }

        let product = product?;
        if let Some(price_eur) = product.last_price_eur.filter(|p| is_usable(*p)) {
            debug!(symbol, %date, "Using stored last known EUR price");
            return Some(ResolvedPrice {
                price_eur,
                source: PriceSource::LastKnown,
                degraded: None,
            });
        }

        let last = product.last_price.filter(|p| is_usable(*p))?;
        let conversion = currency_service
            .convert(cache, last, native, REFERENCE_CURRENCY, None)
            .await;
        if !is_usable(conversion.amount) {
            return None;
        }
        debug!(symbol, %date, "Using converted last known price");
        Some(ResolvedPrice {
            price_eur: conversion.amount,
            source: PriceSource::LastKnown,
            degraded: conversion.degraded,
        })
    }

    async fn point_in_eur(
        point: &PricePoint,
        native: &str,
        currency_service: &CurrencyService,
        cache: &mut RateCache,
    ) -> Option<(f64, Option<DegradedReason>)> {
        if let Some(eur) = point.close_eur.filter(|p| is_usable(*p)) {
            return Some((eur, None));
        }
        if !is_usable(point.close) {
            return None;
        }
        let conversion = currency_service
            .convert(cache, point.close, native, REFERENCE_CURRENCY, None)
            .await;
        is_usable(conversion.amount).then_some((conversion.amount, conversion.degraded))
    }
}

impl Default for PriceService {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

fn is_usable(price: f64) -> bool {
    price.is_finite() && price > 0.0
}
