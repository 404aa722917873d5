use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use crate::errors::CoreError;
use crate::models::catalog::Catalog;
use crate::models::price::{PriceHistory, PricePoint};
use crate::models::rate::RateCache;
use crate::providers::traits::QuoteSource;
use crate::services::currency_service::CurrencyService;

/// What to do with points already stored for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BackfillMode {
    /// Upsert fetched points, keeping older ones
    #[default]
    Merge,
    /// Drop the product's history before storing the fetched points
    Replace,
}

/// Outcome of a backfill run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackfillReport {
    /// Symbol → number of points stored
    pub updated: BTreeMap<String, usize>,
    /// Symbol → error message
    pub failed: BTreeMap<String, String>,
    /// Some stored equivalents used a non-authoritative rate
    pub degraded: bool,
}

impl BackfillReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Bulk price-history backfill from a quote source.
///
/// Products are fetched one after another with a fixed pause between them
/// to stay under upstream rate limits. A failing product is recorded in the
/// report and the run moves on.
pub struct BackfillService {
    source: Box<dyn QuoteSource>,
    delay: std::time::Duration,
}

impl BackfillService {
    pub fn new(source: Box<dyn QuoteSource>, delay: std::time::Duration) -> Self {
        Self { source, delay }
    }

    /// Fetch `[today - days, today]` for each symbol and store the closes
    /// with EUR/USD equivalents at the current rate. Each product's last
    /// known price is set to its latest close.
    #[instrument(skip_all, fields(source = self.source.name(), products = symbols.len(), days = days))]
    #[allow(clippy::too_many_arguments)]
    pub async fn backfill(
        &self,
        catalog: &mut Catalog,
        history: &mut PriceHistory,
        currency_service: &CurrencyService,
        cache: &mut RateCache,
        symbols: &[String],
        days: i64,
        mode: BackfillMode,
    ) -> BackfillReport {
        let mut report = BackfillReport::default();
        let today = Utc::now().date_naive();
        let from = Duration::try_days(days.max(0))
            .and_then(|span| today.checked_sub_signed(span))
            .unwrap_or(NaiveDate::MIN);

        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let symbol = symbol.to_uppercase();
            let result = self
                .backfill_one(catalog, history, currency_service, cache, &symbol, (from, today), mode)
                .await;
            match result {
                Ok((stored, degraded)) => {
                    debug!(%symbol, stored, "Price history updated");
                    report.degraded |= degraded;
                    report.updated.insert(symbol, stored);
                }
                Err(e) => {
                    warn!(%symbol, error = %e, "Price backfill failed");
                    report.failed.insert(symbol, e.to_string());
                }
            }
        }

        info!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "Price backfill finished"
        );
        report
    }

    #[allow(clippy::too_many_arguments)]
    async fn backfill_one(
        &self,
        catalog: &mut Catalog,
        history: &mut PriceHistory,
        currency_service: &CurrencyService,
        cache: &mut RateCache,
        symbol: &str,
        (from, to): (NaiveDate, NaiveDate),
        mode: BackfillMode,
    ) -> Result<(usize, bool), CoreError> {
        let currency = catalog
            .product(symbol)
            .map(|p| p.currency.clone())
            .ok_or_else(|| {
                CoreError::ValidationError(format!("Product {symbol} is not in the catalog"))
            })?;

        let closes = self.source.daily_closes(symbol, from, to).await?;

        let mut degraded = false;
        let mut points = Vec::with_capacity(closes.len());
        for close in closes {
            let both = currency_service
                .convert_price_to_both(cache, close.close, &currency)
                .await;
            degraded |= both.degraded.is_some();
            points.push(PricePoint::new(close.date, close.close).with_equivalents(both.eur, both.usd));
        }

        let latest = points.last().cloned().ok_or_else(|| CoreError::NoQuoteData {
            ticker: symbol.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        })?;

        if mode == BackfillMode::Replace {
            history.clear_symbol(symbol);
        }
        let stored = points.len();
        history.upsert_many(symbol, points);

        if let Some(product) = catalog.product_mut(symbol) {
            product.last_price = Some(latest.close);
            product.last_price_eur = latest.close_eur;
        }
        Ok((stored, degraded))
    }
}
