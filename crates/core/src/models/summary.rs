use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::catalog::AssetClass;

/// Point-in-time summary of the portfolio, all amounts in EUR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Date this summary was computed for
    pub as_of_date: NaiveDate,

    /// Currency used for all monetary values
    pub currency: String,

    /// Sum of the priced holdings' values
    pub total_value: f64,

    /// Sum of the holdings' cost basis
    pub total_invested: f64,

    /// total_value - total_invested
    pub total_gain_loss: f64,

    /// (total_gain_loss / total_invested) * 100, or 0 with nothing invested
    pub total_return_pct: f64,

    /// Per-holding breakdown, largest value first
    pub holdings: Vec<HoldingSummary>,

    /// Ledger entries that sold more than was held
    pub oversold_transactions: Vec<uuid::Uuid>,

    /// True when a holding had no price or a rate was not authoritative
    pub degraded: bool,
}

/// Summary of a single held product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingSummary {
    pub symbol: String,

    /// Product name, or the symbol when the product is not in the catalog
    pub name: String,

    pub asset_class: Option<AssetClass>,

    pub account: Option<String>,

    pub platform: Option<String>,

    pub quantity: f64,

    /// Cost basis under the average-cost method
    pub invested: f64,

    /// invested / quantity
    pub average_cost: f64,

    /// Unit price used for valuation, if one resolved
    pub price: Option<f64>,

    /// quantity × price, 0 when unpriced
    pub current_value: f64,

    pub gain_loss: f64,

    pub return_pct: f64,

    /// This holding's value / total value × 100
    pub allocation_pct: f64,
}
