use chrono::NaiveDate;
use tracing::{instrument, warn};

use crate::models::catalog::Catalog;
use crate::models::price::PriceHistorySource;
use crate::models::rate::{RateCache, REFERENCE_CURRENCY};
use crate::models::summary::{HoldingSummary, PortfolioSummary};
use crate::models::transaction::TransactionLog;
use crate::services::currency_service::CurrencyService;
use crate::services::position_service::PositionService;
use crate::services::price_service::PriceService;

/// Computes the point-in-time portfolio summary: value, cost basis,
/// gain/loss, returns and allocation per holding.
///
/// Cost basis follows the average-cost replay of `PositionService`; prices
/// follow the same resolution as the evolution series, so the summary for a
/// date matches that date's sample.
pub struct SummaryService {
    position_service: PositionService,
    price_service: PriceService,
}

impl SummaryService {
    pub fn new(price_service: PriceService) -> Self {
        Self {
            position_service: PositionService::new(),
            price_service,
        }
    }

    /// Summary of all holdings at the end of `as_of`, in EUR.
    #[instrument(skip_all, fields(as_of = %as_of))]
    pub async fn summarize(
        &self,
        log: &TransactionLog,
        catalog: &Catalog,
        history: &dyn PriceHistorySource,
        currency_service: &CurrencyService,
        cache: &mut RateCache,
        as_of: NaiveDate,
    ) -> PortfolioSummary {
        let snapshot = self
            .position_service
            .reconstruct(
                log,
                currency_service,
                cache,
                PositionService::end_of_day(as_of),
            )
            .await;

        // 1. Value each holding
        let mut holdings = Vec::with_capacity(snapshot.positions.len());
        let mut degraded = snapshot.degraded;

        for position in snapshot.positions.values() {
            let product = catalog.product(&position.symbol);
            let resolved = self
                .price_service
                .resolve_price(history, currency_service, cache, &position.symbol, product, as_of)
                .await;

            let price = match resolved {
                Some(resolved) => {
                    degraded |= resolved.degraded.is_some();
                    Some(resolved.price_eur)
                }
                None => {
                    warn!(symbol = %position.symbol, %as_of, "No price for holding");
                    degraded = true;
                    None
                }
            };

            let current_value = price.map(|p| position.quantity * p).unwrap_or(0.0);
            // Unpriced holdings report no gain rather than a full loss
            let gain_loss = if price.is_some() {
                current_value - position.invested_amount
            } else {
                0.0
            };

            holdings.push(HoldingSummary {
                symbol: position.symbol.clone(),
                name: product
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| position.symbol.clone()),
                asset_class: product.map(|p| p.asset_class),
                account: catalog.account(position.account_id).map(|a| a.name.clone()),
                platform: catalog
                    .platform_of(position.account_id)
                    .map(|p| p.name.clone()),
                quantity: position.quantity,
                invested: position.invested_amount,
                average_cost: position.invested_amount / position.quantity,
                price,
                current_value,
                gain_loss,
                return_pct: percentage(gain_loss, position.invested_amount),
                allocation_pct: 0.0, // filled below
            });
        }

        // 2. Totals and allocation
        let total_value: f64 = holdings.iter().map(|h| h.current_value).sum();
        let total_invested = snapshot.total_invested();
        for holding in &mut holdings {
            holding.allocation_pct = percentage(holding.current_value, total_value);
        }

        // Largest value first
        holdings.sort_by(|a, b| {
            b.current_value
                .partial_cmp(&a.current_value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total_gain_loss = total_value - total_invested;
        PortfolioSummary {
            as_of_date: as_of,
            currency: REFERENCE_CURRENCY.to_string(),
            total_value,
            total_invested,
            total_gain_loss,
            total_return_pct: percentage(total_gain_loss, total_invested),
            holdings,
            oversold_transactions: snapshot.oversold,
            degraded,
        }
    }
}

impl Default for SummaryService {
    fn default() -> Self {
        Self::new(PriceService::default())
    }
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
