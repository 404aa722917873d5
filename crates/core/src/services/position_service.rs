use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::catalog::AccountId;
use crate::models::rate::{RateCache, REFERENCE_CURRENCY};
use crate::models::transaction::{Transaction, TransactionKind, TransactionLog};
use crate::services::currency_service::CurrencyService;

/// Quantities below this are treated as zero.
const QUANTITY_EPSILON: f64 = 1e-9;

/// Holding of one product at a point in time, cost basis in EUR.
///
/// Positions are keyed by symbol only. A product bought in several accounts
/// is one position, attributed to the account that opened it; account
/// breakdowns therefore report the whole holding under that account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub symbol: String,
    /// Account of the transaction that opened the position
    pub account_id: AccountId,
    pub quantity: f64,
    pub invested_amount: f64,
}

/// A transaction with its EUR amounts resolved once, at its own date.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedTransaction {
    pub id: Uuid,
    pub account_id: AccountId,
    pub symbol: String,
    pub kind: TransactionKind,
    pub quantity: f64,
    pub timestamp: NaiveDateTime,
    /// `quantity * price_eur + fees_eur` for buys, 0 for sells
    pub cost_eur: f64,
    /// A conversion behind `cost_eur` was not authoritative
    pub degraded: bool,
}

/// Positions after replaying the log up to a cutoff.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PositionSnapshot {
    /// Open positions by symbol; closed ones are left out
    pub positions: BTreeMap<String, Position>,
    /// Sells that took a position below zero, in replay order
    pub oversold: Vec<Uuid>,
    pub degraded: bool,
}

impl PositionSnapshot {
    pub fn total_invested(&self) -> f64 {
        self.positions.values().map(|p| p.invested_amount).sum()
    }
}

/// Rebuilds holdings and average-cost basis from the transaction log.
///
/// Two steps: `price_transactions` converts each transaction into EUR at
/// its own date (async, touches the rate cache), and `fold_positions`
/// replays the priced slice up to a cutoff (pure, no I/O).
pub struct PositionService;

impl PositionService {
    pub fn new() -> Self {
        Self
    }

    /// Last instant of `date`, the cutoff used for a sample day.
    pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
        date.and_hms_nano_opt(23, 59, 59, 999_999_999)
            .unwrap_or_else(|| date.and_time(NaiveTime::default()))
    }

    /// EUR amounts for each transaction, keeping the input order.
    ///
    /// Buy prices and fees use the historical rate of the transaction's own
    /// date. Sells are not converted: the average-cost reduction only needs
    /// their quantity, so sell prices and fees never touch the basis.
    pub async fn price_transactions<'a>(
        &self,
        transactions: impl IntoIterator<Item = &'a Transaction>,
        currency_service: &CurrencyService,
        cache: &mut RateCache,
    ) -> Vec<PricedTransaction> {
        let mut priced = Vec::new();
        for tx in transactions {
            let (cost_eur, degraded) = match tx.kind {
                TransactionKind::Buy => {
                    let date = Some(tx.date());
                    let price = currency_service
                        .convert(cache, tx.unit_price, &tx.price_currency, REFERENCE_CURRENCY, date)
                        .await;
                    let fees = if tx.fees == 0.0 {
                        0.0
                    } else {
                        let fees = currency_service
                            .convert(cache, tx.fees, &tx.fees_currency, REFERENCE_CURRENCY, date)
                            .await;
                        if fees.is_degraded() {
                            debug!(id = %tx.id, "Fees converted with a degraded rate");
                        }
                        fees.amount
                    };
                    (tx.quantity * price.amount + fees, price.is_degraded())
                }
                TransactionKind::Sell => (0.0, false),
            };

            priced.push(PricedTransaction {
                id: tx.id,
                account_id: tx.account_id,
                symbol: tx.symbol.clone(),
                kind: tx.kind,
                quantity: tx.quantity,
                timestamp: tx.timestamp,
                cost_eur,
                degraded,
            });
        }
        priced
    }

    /// Replay `priced` (oldest first) up to and including `cutoff`.
    ///
    /// - BUY adds its quantity and `cost_eur` to the basis.
    /// - SELL shrinks the basis by the sold fraction of the held quantity.
    /// - A sell below zero clamps the position to zero and is reported in
    ///   `oversold`.
    pub fn fold_positions(
        &self,
        priced: &[PricedTransaction],
        cutoff: NaiveDateTime,
    ) -> PositionSnapshot {
        let mut positions: BTreeMap<String, Position> = BTreeMap::new();
        let mut oversold = Vec::new();
        let mut degraded = false;

        for tx in priced.iter().take_while(|t| t.timestamp <= cutoff) {
            let position = positions
                .entry(tx.symbol.clone())
                .or_insert_with(|| Position {
                    symbol: tx.symbol.clone(),
                    account_id: tx.account_id,
                    quantity: 0.0,
                    invested_amount: 0.0,
                });

            match tx.kind {
                TransactionKind::Buy => {
                    if position.quantity <= QUANTITY_EPSILON {
                        position.account_id = tx.account_id;
                    }
                    position.quantity += tx.quantity;
                    position.invested_amount += tx.cost_eur;
                    degraded |= tx.degraded;
                }
                TransactionKind::Sell => {
                    let held = position.quantity;
                    let ratio = if held > 0.0 { tx.quantity / held } else { 0.0 };
                    position.invested_amount *= 1.0 - ratio;
                    position.quantity -= tx.quantity;

                    if position.quantity < -QUANTITY_EPSILON {
                        warn!(
                            id = %tx.id,
                            symbol = %tx.symbol,
                            held,
                            sold = tx.quantity,
                            "Sell exceeds holding, position clamped to zero"
                        );
                        oversold.push(tx.id);
                    }
                    if position.quantity <= QUANTITY_EPSILON {
                        position.quantity = 0.0;
                        position.invested_amount = 0.0;
                    }
                }
            }
        }

        positions.retain(|_, p| p.quantity > QUANTITY_EPSILON);
        PositionSnapshot {
            positions,
            oversold,
            degraded,
        }
    }

    /// Positions as of `cutoff`, pricing only the transactions it needs.
    pub async fn reconstruct(
        &self,
        log: &TransactionLog,
        currency_service: &CurrencyService,
        cache: &mut RateCache,
        cutoff: NaiveDateTime,
    ) -> PositionSnapshot {
        let priced = self
            .price_transactions(log.until(cutoff), currency_service, cache)
            .await;
        self.fold_positions(&priced, cutoff)
    }
}

impl Default for PositionService {
    fn default() -> Self {
        Self::new()
    }
}
