use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type PlatformId = i64;
pub type AccountId = i64;

/// Asset class of a financial product. Used as a breakdown dimension and to
/// pick the trailing price window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetClass {
    /// Single equities
    Stock,
    /// Exchange-traded funds and trackers
    Etf,
    /// Mutual funds
    Fund,
    /// Bonds
    Bond,
    /// Cryptocurrencies
    Crypto,
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetClass::Stock => write!(f, "Stock"),
            AssetClass::Etf => write!(f, "ETF"),
            AssetClass::Fund => write!(f, "Fund"),
            AssetClass::Bond => write!(f, "Bond"),
            AssetClass::Crypto => write!(f, "Crypto"),
        }
    }
}

impl AssetClass {
    /// Map a Yahoo `quoteType` string onto an asset class.
    /// Unknown types are treated as stocks.
    pub fn from_quote_type(quote_type: &str) -> Self {
        match quote_type.to_uppercase().as_str() {
            "ETF" => AssetClass::Etf,
            "MUTUALFUND" => AssetClass::Fund,
            "BOND" => AssetClass::Bond,
            "CRYPTOCURRENCY" => AssetClass::Crypto,
            _ => AssetClass::Stock,
        }
    }
}

/// Quote currency implied by a Yahoo-style ticker.
///
/// Crypto pairs carry it as a suffix (`BTC-EUR`); exchange suffixes map to
/// their market's currency (`.PA` → EUR, `.L` → GBP). Anything else is
/// assumed to trade in USD.
pub fn currency_from_symbol(symbol: &str) -> &'static str {
    const PAIR_SUFFIXES: [(&str, &str); 6] = [
        ("-EUR", "EUR"),
        ("-USD", "USD"),
        ("-GBP", "GBP"),
        ("-CAD", "CAD"),
        ("-CHF", "CHF"),
        ("-JPY", "JPY"),
    ];
    const EXCHANGE_SUFFIXES: [(&str, &str); 17] = [
        (".PA", "EUR"),
        (".AS", "EUR"),
        (".MI", "EUR"),
        (".MC", "EUR"),
        (".F", "EUR"),
        (".BE", "EUR"),
        (".VI", "EUR"),
        (".BR", "EUR"),
        (".LS", "EUR"),
        (".HE", "EUR"),
        (".AT", "EUR"),
        (".L", "GBP"),
        (".SW", "CHF"),
        (".TO", "CAD"),
        (".V", "CAD"),
        (".T", "JPY"),
        (".DE", "EUR"),
    ];

    let symbol = symbol.to_uppercase();
    if let Some((_, currency)) = PAIR_SUFFIXES.iter().find(|(s, _)| symbol.contains(s)) {
        return *currency;
    }
    if let Some((_, currency)) = EXCHANGE_SUFFIXES.iter().find(|(s, _)| symbol.ends_with(s)) {
        return *currency;
    }
    "USD"
}

/// A broker or bank holding one or more accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub id: PlatformId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// An account on a platform (e.g. a brokerage or savings account).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub platform_id: PlatformId,
    pub name: String,
    pub account_type: String,
}

/// A tradeable product, keyed by its ticker symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Ticker symbol, uppercased (e.g. "AAPL", "CW8.PA", "BTC-EUR")
    pub symbol: String,

    pub name: String,

    pub asset_class: AssetClass,

    /// Native quote currency, uppercased
    pub currency: String,

    /// Last known close in the native currency
    #[serde(default)]
    pub last_price: Option<f64>,

    /// Last known close converted to EUR when it was stored
    #[serde(default)]
    pub last_price_eur: Option<f64>,
}

impl Product {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        asset_class: AssetClass,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            name: name.into(),
            asset_class,
            currency: currency.into().to_uppercase(),
            last_price: None,
            last_price_eur: None,
        }
    }

    pub fn with_last_price(mut self, price: f64, price_eur: Option<f64>) -> Self {
        self.last_price = Some(price);
        self.last_price_eur = price_eur;
        self
    }
}

/// Read-only view of platforms, accounts and products, as maintained by the
/// CRUD layer. The valuation services only look things up here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    platforms: BTreeMap<PlatformId, Platform>,
    accounts: BTreeMap<AccountId, Account>,
    products: BTreeMap<String, Product>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_platform(&mut self, platform: Platform) {
        self.platforms.insert(platform.id, platform);
    }

    pub fn upsert_account(&mut self, account: Account) {
        self.accounts.insert(account.id, account);
    }

    pub fn upsert_product(&mut self, product: Product) {
        self.products.insert(product.symbol.clone(), product);
    }

    pub fn platform(&self, id: PlatformId) -> Option<&Platform> {
        self.platforms.get(&id)
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// Platform owning the given account, if both are known.
    pub fn platform_of(&self, account_id: AccountId) -> Option<&Platform> {
        self.account(account_id)
            .and_then(|a| self.platforms.get(&a.platform_id))
    }

    /// Case-insensitive product lookup.
    pub fn product(&self, symbol: &str) -> Option<&Product> {
        self.products.get(&symbol.to_uppercase())
    }

    pub fn product_mut(&mut self, symbol: &str) -> Option<&mut Product> {
        self.products.get_mut(&symbol.to_uppercase())
    }

    /// Products in symbol order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Distinct asset classes present in the catalog, sorted.
    pub fn asset_classes(&self) -> Vec<AssetClass> {
        let mut classes: Vec<AssetClass> = self.products.values().map(|p| p.asset_class).collect();
        classes.sort();
        classes.dedup();
        classes
    }
}
