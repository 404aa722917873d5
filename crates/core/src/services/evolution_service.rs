use tracing::{debug, instrument, warn};

use crate::errors::CoreError;
use crate::models::catalog::{AssetClass, Catalog};
use crate::models::evolution::{
    Breakdown, BreakdownDimension, Category, EvolutionFilter, EvolutionRequest, EvolutionSample,
};
use crate::models::price::PriceHistorySource;
use crate::models::rate::{RateCache, REFERENCE_CURRENCY};
use crate::models::transaction::{Transaction, TransactionLog};
use crate::services::currency_service::CurrencyService;
use crate::services::position_service::{Position, PositionService};
use crate::services::price_service::PriceService;

/// Longest range a single series may cover, about ten years.
pub const MAX_SPAN_DAYS: i64 = 3650;

/// Builds the portfolio valuation time series.
///
/// For each sample date:
/// 1. Replay the (filtered) log up to the end of that day
/// 2. Price every open position
/// 3. Add its value to the total and to its breakdown category
///
/// Transactions are converted to EUR once per series; only the fold runs
/// per sample.
pub struct EvolutionService {
    position_service: PositionService,
    price_service: PriceService,
}

impl EvolutionService {
    pub fn new(price_service: PriceService) -> Self {
        Self {
            position_service: PositionService::new(),
            price_service,
        }
    }

    /// Valuation series for `request`, one sample per sampling date.
    ///
    /// Fails only on an invalid range; missing prices and rates degrade the
    /// affected samples instead.
    #[instrument(
        skip_all,
        fields(start = %request.start, end = %request.end, dimension = ?request.dimension)
    )]
    pub async fn generate(
        &self,
        request: &EvolutionRequest,
        log: &TransactionLog,
        catalog: &Catalog,
        history: &dyn PriceHistorySource,
        currency_service: &CurrencyService,
        cache: &mut RateCache,
    ) -> Result<Vec<EvolutionSample>, CoreError> {
        Self::validate(request)?;

        let last_cutoff = PositionService::end_of_day(request.end);
        let selected: Vec<&Transaction> = log
            .until(last_cutoff)
            .filter(|tx| Self::matches(&request.filter, catalog, tx))
            .collect();
        let priced = self
            .position_service
            .price_transactions(selected, currency_service, cache)
            .await;

        let dates = request.frequency().sample_dates(request.start, request.end);
        debug!(samples = dates.len(), transactions = priced.len(), "Generating evolution");

        let mut samples = Vec::with_capacity(dates.len());
        for date in dates {
            let snapshot = self
                .position_service
                .fold_positions(&priced, PositionService::end_of_day(date));

            let mut breakdown = Breakdown::new(request.dimension);
            let mut total_value = 0.0;
            let mut unpriced = Vec::new();
            let mut degraded = snapshot.degraded;

            for position in snapshot.positions.values() {
                let product = catalog.product(&position.symbol);
                let resolved = self
                    .price_service
                    .resolve_price(history, currency_service, cache, &position.symbol, product, date)
                    .await;

                match resolved {
                    Some(price) => {
                        let value = position.quantity * price.price_eur;
                        total_value += value;
                        breakdown.add(Self::category(request.dimension, catalog, position), value);
                        degraded |= price.degraded.is_some();
                    }
                    None => {
                        unpriced.push(position.symbol.clone());
                        degraded = true;
                    }
                }
            }

            if !unpriced.is_empty() {
                warn!(%date, symbols = ?unpriced, "No price for held products");
            }

            let total_invested = snapshot.total_invested();
            samples.push(EvolutionSample {
                date,
                total_value,
                total_invested,
                gain_loss: total_value - total_invested,
                breakdown,
                unpriced,
                degraded,
            });
        }

        Ok(samples)
    }

    fn validate(request: &EvolutionRequest) -> Result<(), CoreError> {
        if request.start > request.end {
            return Err(CoreError::ValidationError(format!(
                "Start date {} is after end date {}",
                request.start, request.end
            )));
        }
        if request.span_days() > MAX_SPAN_DAYS {
            return Err(CoreError::ValidationError(format!(
                "Range of {} days exceeds the maximum of {MAX_SPAN_DAYS}",
                request.span_days()
            )));
        }
        Ok(())
    }

    fn matches(filter: &EvolutionFilter, catalog: &Catalog, tx: &Transaction) -> bool {
        if filter.is_empty() {
            return true;
        }
        if !filter.accounts.is_empty() && !filter.accounts.contains(&tx.account_id) {
            return false;
        }
        if !filter.symbols.is_empty()
            && !filter
                .symbols
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&tx.symbol))
        {
            return false;
        }
        if !filter.asset_classes.is_empty() {
            let class = catalog.product(&tx.symbol).map(|p| p.asset_class);
            if !class.is_some_and(|c| filter.asset_classes.contains(&c)) {
                return false;
            }
        }
        true
    }

    /// Bucket for a position under `dimension`, labelled from the catalog.
    fn category(dimension: BreakdownDimension, catalog: &Catalog, position: &Position) -> Category {
        let product = catalog.product(&position.symbol);
        match dimension {
            BreakdownDimension::Account => Category::Account(
                catalog
                    .account(position.account_id)
                    .map(|a| a.name.clone())
                    .unwrap_or_else(|| format!("Account {}", position.account_id)),
            ),
            BreakdownDimension::Platform => Category::Platform(
                catalog
                    .platform_of(position.account_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| "Unknown platform".to_string()),
            ),
            // Products missing from the catalog count as stocks
            BreakdownDimension::AssetClass => {
                Category::AssetClass(product.map(|p| p.asset_class).unwrap_or(AssetClass::Stock))
            }
            BreakdownDimension::Product => Category::Product(position.symbol.clone()),
            BreakdownDimension::Currency => Category::Currency(
                product
                    .map(|p| p.currency.clone())
                    .unwrap_or_else(|| REFERENCE_CURRENCY.to_string()),
            ),
        }
    }
}

impl Default for EvolutionService {
    fn default() -> Self {
        Self::new(PriceService::default())
    }
}
