pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::NaiveDate;
use models::{
    catalog::Catalog,
    evolution::{EvolutionFilter, EvolutionRequest, EvolutionSample},
    price::PriceHistory,
    rate::{Conversion, FxQuote, RateCache},
    settings::Settings,
    summary::PortfolioSummary,
    transaction::{Transaction, TransactionLog},
};
use providers::{registry::RateSourceChain, traits::QuoteSource, yahoo_finance::YahooFinanceProvider};
use services::{
    backfill_service::{BackfillMode, BackfillReport, BackfillService},
    currency_service::CurrencyService,
    evolution_service::EvolutionService,
    position_service::{PositionService, PositionSnapshot},
    price_service::PriceService,
    summary_service::SummaryService,
};
use std::path::Path;
use storage::manager::StorageManager;
use uuid::Uuid;

use errors::CoreError;

/// Main entry point for the valuation core.
/// Holds the ledger, the catalog, price history, the rate cache and all
/// services needed to value the portfolio.
#[must_use]
pub struct PortfolioTracker {
    ledger: TransactionLog,
    catalog: Catalog,
    price_history: PriceHistory,
    rate_cache: RateCache,
    currency_service: CurrencyService,
    position_service: PositionService,
    evolution_service: EvolutionService,
    summary_service: SummaryService,
    backfill_service: Option<BackfillService>,
    /// Tracks whether the rate cache changed since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for PortfolioTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioTracker")
            .field("transactions", &self.ledger.len())
            .field("products", &self.catalog.products().count())
            .field("price_points", &self.price_history.total_entries())
            .field("cached_rates", &self.rate_cache.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl PortfolioTracker {
    /// Tracker wired to the default upstreams (Yahoo Finance, then
    /// ExchangeRate-API, then the fallback constant).
    ///
    /// Fails with `ValidationError` when the settings are out of range.
    pub fn new(settings: Settings) -> Result<Self, CoreError> {
        let chain = RateSourceChain::new_with_defaults(&settings);
        let quotes: Option<Box<dyn QuoteSource>> = YahooFinanceProvider::new()
            .ok()
            .map(|yahoo| Box::new(yahoo) as Box<dyn QuoteSource>);
        Self::with_sources(settings, chain, quotes)
    }

    /// Tracker from a JSON settings document.
    pub fn from_settings_json(json: &str) -> Result<Self, CoreError> {
        Self::new(Settings::from_json(json)?)
    }

    /// Tracker with explicit upstreams. Without a quote source, backfills
    /// are rejected.
    pub fn with_sources(
        settings: Settings,
        chain: RateSourceChain,
        quotes: Option<Box<dyn QuoteSource>>,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        let backfill_service = quotes.map(|source| {
            BackfillService::new(
                source,
                std::time::Duration::from_millis(settings.backfill_delay_ms),
            )
        });

        Ok(Self {
            ledger: TransactionLog::new(),
            catalog: Catalog::new(),
            price_history: PriceHistory::new(),
            rate_cache: RateCache::new(),
            evolution_service: EvolutionService::new(PriceService::new(&settings)),
            summary_service: SummaryService::new(PriceService::new(&settings)),
            position_service: PositionService::new(),
            currency_service: CurrencyService::new(chain, settings),
            backfill_service,
            dirty: false,
        })
    }

    // ── Reference Data ──────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        self.currency_service.settings()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Mutable catalog, for the CRUD layer to keep in sync.
    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn price_history(&self) -> &PriceHistory {
        &self.price_history
    }

    pub fn price_history_mut(&mut self) -> &mut PriceHistory {
        &mut self.price_history
    }

    // ── Transactions ────────────────────────────────────────────────

    pub fn transactions(&self) -> &TransactionLog {
        &self.ledger
    }

    /// Append a validated transaction to the ledger.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<Uuid, CoreError> {
        self.ledger.append(transaction)
    }

    /// Append several transactions. Stops at the first invalid one; the ones
    /// before it stay in the ledger.
    pub fn add_transactions(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Uuid>, CoreError> {
        transactions
            .into_iter()
            .map(|tx| self.ledger.append(tx))
            .collect()
    }

    pub fn edit_transaction(&mut self, id: Uuid, replacement: Transaction) -> Result<(), CoreError> {
        self.ledger.edit(id, replacement)
    }

    pub fn remove_transaction(&mut self, id: Uuid) -> Result<Transaction, CoreError> {
        self.ledger.remove(id)
    }

    #[must_use]
    pub fn get_transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.ledger.get(id)
    }

    // ── Valuation ───────────────────────────────────────────────────

    /// Positions and cost basis at the end of `date`.
    pub async fn positions_at(&mut self, date: NaiveDate) -> PositionSnapshot {
        self.dirty = true;
        self.position_service
            .reconstruct(
                &self.ledger,
                &self.currency_service,
                &mut self.rate_cache,
                PositionService::end_of_day(date),
            )
            .await
    }

    /// Valuation time series with a breakdown.
    pub async fn evolution(
        &mut self,
        request: &EvolutionRequest,
    ) -> Result<Vec<EvolutionSample>, CoreError> {
        self.dirty = true;
        self.evolution_service
            .generate(
                request,
                &self.ledger,
                &self.catalog,
                &self.price_history,
                &self.currency_service,
                &mut self.rate_cache,
            )
            .await
    }

    /// Point-in-time summary of all holdings.
    pub async fn summary(&mut self, as_of: NaiveDate) -> PortfolioSummary {
        self.dirty = true;
        self.summary_service
            .summarize(
                &self.ledger,
                &self.catalog,
                &self.price_history,
                &self.currency_service,
                &mut self.rate_cache,
                as_of,
            )
            .await
    }

    /// Every account, product and asset class that can be filtered on.
    #[must_use]
    pub fn available_filters(&self) -> EvolutionFilter {
        EvolutionFilter {
            accounts: self.catalog.accounts().map(|a| a.id).collect(),
            symbols: self.catalog.products().map(|p| p.symbol.clone()).collect(),
            asset_classes: self.catalog.asset_classes(),
        }
    }

    // ── Currency ────────────────────────────────────────────────────

    pub async fn current_rate(&mut self) -> FxQuote {
        self.dirty = true;
        self.currency_service
            .get_current_rate(&mut self.rate_cache)
            .await
    }

    /// Drop the cached current rate and fetch a new one.
    pub async fn refresh_rate(&mut self) -> FxQuote {
        self.rate_cache.invalidate_current();
        self.current_rate().await
    }

    pub async fn historical_rate(&mut self, date: NaiveDate) -> FxQuote {
        self.dirty = true;
        self.currency_service
            .get_historical_rate(&mut self.rate_cache, date)
            .await
    }

    pub async fn convert(
        &mut self,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
        as_of: Option<NaiveDate>,
    ) -> Conversion {
        self.dirty = true;
        self.currency_service
            .convert(&mut self.rate_cache, amount, from_currency, to_currency, as_of)
            .await
    }

    // ── Price History ───────────────────────────────────────────────

    /// Backfill `days` of closes for every product in the catalog.
    pub async fn backfill_prices(
        &mut self,
        days: i64,
        mode: BackfillMode,
    ) -> Result<BackfillReport, CoreError> {
        let symbols: Vec<String> = self.catalog.products().map(|p| p.symbol.clone()).collect();
        self.backfill_symbols(&symbols, days, mode).await
    }

    /// Backfill `days` of closes for the given products.
    pub async fn backfill_symbols(
        &mut self,
        symbols: &[String],
        days: i64,
        mode: BackfillMode,
    ) -> Result<BackfillReport, CoreError> {
        let service = self.backfill_service.as_ref().ok_or_else(|| {
            CoreError::ValidationError("No quote source configured for backfill".into())
        })?;
        self.dirty = true;
        Ok(service
            .backfill(
                &mut self.catalog,
                &mut self.price_history,
                &self.currency_service,
                &mut self.rate_cache,
                symbols,
                days,
                mode,
            )
            .await)
    }

    // ── Rate Cache Persistence ──────────────────────────────────────

    pub fn rate_cache(&self) -> &RateCache {
        &self.rate_cache
    }

    /// Replace the in-memory rate cache with a previously saved one.
    pub fn load_rate_cache_from_bytes(&mut self, data: &[u8]) -> Result<(), CoreError> {
        self.rate_cache = StorageManager::load_from_bytes(data)?;
        self.dirty = false;
        Ok(())
    }

    /// Serialize the rate cache. Clears the unsaved-changes flag on success.
    pub fn save_rate_cache_to_bytes(&mut self) -> Result<Vec<u8>, CoreError> {
        let bytes = StorageManager::save_to_bytes(&self.rate_cache)?;
        self.dirty = false;
        Ok(bytes)
    }

    pub fn load_rate_cache_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        self.rate_cache = StorageManager::load_from_file(path)?;
        self.dirty = false;
        Ok(())
    }

    pub fn save_rate_cache_to_file(&mut self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        StorageManager::save_to_file(&self.rate_cache, path)?;
        self.dirty = false;
        Ok(())
    }

    /// Returns `true` if the rate cache may have changed since the last
    /// save or load.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }
}
