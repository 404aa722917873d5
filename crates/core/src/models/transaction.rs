use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::AccountId;
use crate::errors::CoreError;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Buy,
    Sell,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Buy => write!(f, "BUY"),
            TransactionKind::Sell => write!(f, "SELL"),
        }
    }
}

/// A single buy or sell of a product on an account.
///
/// Prices are stored in the currency they were paid in. Conversion to the
/// reference currency happens at replay time using the rate of the
/// transaction's own date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,

    pub account_id: AccountId,

    /// Product symbol, uppercased
    pub symbol: String,

    pub kind: TransactionKind,

    /// Number of units (always positive)
    pub quantity: f64,

    /// Price per unit in `price_currency`
    pub unit_price: f64,

    pub price_currency: String,

    pub timestamp: NaiveDateTime,

    /// Fees paid, in `fees_currency`
    #[serde(default)]
    pub fees: f64,

    #[serde(default = "default_fees_currency")]
    pub fees_currency: String,
}

fn default_fees_currency() -> String {
    "EUR".to_string()
}

impl Transaction {
    pub fn new(
        account_id: AccountId,
        symbol: impl Into<String>,
        kind: TransactionKind,
        quantity: f64,
        unit_price: f64,
        price_currency: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            symbol: symbol.into().to_uppercase(),
            kind,
            quantity,
            unit_price,
            price_currency: price_currency.into().to_uppercase(),
            timestamp,
            fees: 0.0,
            fees_currency: default_fees_currency(),
        }
    }

    pub fn with_fees(mut self, fees: f64, currency: impl Into<String>) -> Self {
        self.fees = fees;
        self.fees_currency = currency.into().to_uppercase();
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Quantity must be positive; price and fees non-negative; all finite.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Transaction quantity must be positive, got {}",
                self.quantity
            )));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Transaction unit price must be non-negative, got {}",
                self.unit_price
            )));
        }
        if !self.fees.is_finite() || self.fees < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Transaction fees must be non-negative, got {}",
                self.fees
            )));
        }
        if self.symbol.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "Transaction symbol must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Append-only store of transactions with a chronological index.
///
/// `entries` keeps insertion order; `order` holds indices into `entries`
/// sorted by timestamp, equal timestamps staying in insertion order.
#[derive(Debug, Clone, Default)]
pub struct TransactionLog {
    entries: Vec<Transaction>,
    order: Vec<usize>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from ledger records, in the order the ledger returned them.
    pub fn from_transactions(transactions: Vec<Transaction>) -> Result<Self, CoreError> {
        let mut log = Self::new();
        for tx in transactions {
            log.append(tx)?;
        }
        Ok(log)
    }

    pub fn append(&mut self, transaction: Transaction) -> Result<Uuid, CoreError> {
        transaction.validate()?;
        let id = transaction.id;
        let idx = self.entries.len();
        // after every entry with an equal timestamp
        let pos = self
            .order
            .partition_point(|&i| self.entries[i].timestamp <= transaction.timestamp);
        self.entries.push(transaction);
        self.order.insert(pos, idx);
        Ok(id)
    }

    /// Replace the transaction with `id`, keeping its identity and its
    /// original insertion rank.
    pub fn edit(&mut self, id: Uuid, mut replacement: Transaction) -> Result<(), CoreError> {
        replacement.id = id;
        replacement.validate()?;
        let idx = self.index_of(id)?;
        self.entries[idx] = replacement;
        self.reindex();
        Ok(())
    }

    pub fn remove(&mut self, id: Uuid) -> Result<Transaction, CoreError> {
        let idx = self.index_of(id)?;
        let removed = self.entries.remove(idx);
        self.reindex();
        Ok(removed)
    }

    pub fn get(&self, id: Uuid) -> Option<&Transaction> {
        self.entries.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All transactions, oldest first.
    pub fn chronological(&self) -> impl Iterator<Item = &Transaction> {
        self.order.iter().map(move |&i| &self.entries[i])
    }

    /// Transactions with `timestamp <= cutoff`, oldest first.
    pub fn until(&self, cutoff: NaiveDateTime) -> impl Iterator<Item = &Transaction> {
        self.chronological().take_while(move |t| t.timestamp <= cutoff)
    }

    pub fn earliest(&self) -> Option<&Transaction> {
        self.order.first().map(|&i| &self.entries[i])
    }

    pub fn latest(&self) -> Option<&Transaction> {
        self.order.last().map(|&i| &self.entries[i])
    }

    fn index_of(&self, id: Uuid) -> Result<usize, CoreError> {
        self.entries
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))
    }

    fn reindex(&mut self) {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        // stable: ties keep insertion order
        order.sort_by_key(|&i| self.entries[i].timestamp);
        self.order = order;
    }
}
