// ═══════════════════════════════════════════════════════════════════
// Model Tests — Transaction, TransactionLog, Catalog, PriceHistory,
// RateCache, Settings, evolution sampling and breakdowns
// ═══════════════════════════════════════════════════════════════════

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use portfolio_valuation_core::errors::CoreError;
use portfolio_valuation_core::models::catalog::{
    currency_from_symbol, Account, AssetClass, Catalog, Platform, Product,
};
use portfolio_valuation_core::models::evolution::{
    Breakdown, BreakdownDimension, Category, EvolutionFilter, EvolutionRequest, SamplingFrequency,
};
use portfolio_valuation_core::models::price::{PriceHistory, PriceHistorySource, PricePoint};
use portfolio_valuation_core::models::rate::{
    Conversion, DegradedReason, ExchangeRate, FxQuote, RateCache, RateResolution,
};
use portfolio_valuation_core::models::settings::{Settings, TickerAlias};
use portfolio_valuation_core::models::transaction::{Transaction, TransactionKind, TransactionLog};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn at(y: i32, m: u32, day: u32, h: u32) -> NaiveDateTime {
    d(y, m, day).and_hms_opt(h, 0, 0).unwrap()
}

fn buy(symbol: &str, qty: f64, price: f64, ts: NaiveDateTime) -> Transaction {
    Transaction::new(1, symbol, TransactionKind::Buy, qty, price, "EUR", ts)
}

fn quote(rate: f64) -> FxQuote {
    FxQuote {
        rate,
        source: "test".into(),
        degraded: None,
    }
}

// ═══════════════════════════════════════════════════════════════════
// Transaction
// ═══════════════════════════════════════════════════════════════════

mod transaction {
    use super::*;

    #[test]
    fn new_uppercases_symbol_and_currency() {
        let tx = Transaction::new(1, "aapl", TransactionKind::Buy, 1.0, 10.0, "usd", at(2025, 1, 2, 10));
        assert_eq!(tx.symbol, "AAPL");
        assert_eq!(tx.price_currency, "USD");
        assert_eq!(tx.fees, 0.0);
        assert_eq!(tx.fees_currency, "EUR");
    }

    #[test]
    fn with_fees_sets_amount_and_currency() {
        let tx = buy("AAPL", 1.0, 10.0, at(2025, 1, 2, 10)).with_fees(2.5, "usd");
        assert_eq!(tx.fees, 2.5);
        assert_eq!(tx.fees_currency, "USD");
    }

    #[test]
    fn unique_ids() {
        let a = buy("AAPL", 1.0, 10.0, at(2025, 1, 2, 10));
        let b = buy("AAPL", 1.0, 10.0, at(2025, 1, 2, 10));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn date_strips_time() {
        assert_eq!(buy("X", 1.0, 1.0, at(2025, 3, 4, 15)).date(), d(2025, 3, 4));
    }

    #[test]
    fn zero_quantity_rejected() {
        let tx = buy("AAPL", 0.0, 10.0, at(2025, 1, 2, 10));
        assert!(matches!(tx.validate(), Err(CoreError::ValidationError(_))));
    }

    #[test]
    fn negative_quantity_rejected() {
        assert!(buy("AAPL", -1.0, 10.0, at(2025, 1, 2, 10)).validate().is_err());
    }

    #[test]
    fn nan_quantity_rejected() {
        assert!(buy("AAPL", f64::NAN, 10.0, at(2025, 1, 2, 10)).validate().is_err());
    }

    #[test]
    fn negative_price_rejected() {
        assert!(buy("AAPL", 1.0, -10.0, at(2025, 1, 2, 10)).validate().is_err());
    }

    #[test]
    fn zero_price_allowed() {
        assert!(buy("AAPL", 1.0, 0.0, at(2025, 1, 2, 10)).validate().is_ok());
    }

    #[test]
    fn negative_fees_rejected() {
        let tx = buy("AAPL", 1.0, 10.0, at(2025, 1, 2, 10)).with_fees(-1.0, "EUR");
        assert!(tx.validate().is_err());
    }

    #[test]
    fn empty_symbol_rejected() {
        assert!(buy("  ", 1.0, 10.0, at(2025, 1, 2, 10)).validate().is_err());
    }

    #[test]
    fn kind_display() {
        assert_eq!(TransactionKind::Buy.to_string(), "BUY");
        assert_eq!(TransactionKind::Sell.to_string(), "SELL");
    }

    #[test]
    fn serde_defaults_fees() {
        let json = format!(
            r#"{{"id":"{}","account_id":1,"symbol":"AAPL","kind":"Buy","quantity":2.0,
               "unit_price":10.0,"price_currency":"USD","timestamp":"2025-01-02T10:00:00"}}"#,
            Uuid::new_v4()
        );
        let tx: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx.fees, 0.0);
        assert_eq!(tx.fees_currency, "EUR");
    }
}

// ═══════════════════════════════════════════════════════════════════
// TransactionLog
// ═══════════════════════════════════════════════════════════════════

mod transaction_log {
    use super::*;

    #[test]
    fn chronological_order_regardless_of_insertion() {
        let mut log = TransactionLog::new();
        log.append(buy("C", 1.0, 1.0, at(2025, 1, 3, 9))).unwrap();
        log.append(buy("A", 1.0, 1.0, at(2025, 1, 1, 9))).unwrap();
        log.append(buy("B", 1.0, 1.0, at(2025, 1, 2, 9))).unwrap();

        let symbols: Vec<&str> = log.chronological().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["A", "B", "C"]);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let ts = at(2025, 1, 1, 9);
        let mut log = TransactionLog::new();
        log.append(buy("FIRST", 1.0, 1.0, ts)).unwrap();
        log.append(buy("SECOND", 1.0, 1.0, ts)).unwrap();
        log.append(buy("THIRD", 1.0, 1.0, ts)).unwrap();

        let symbols: Vec<&str> = log.chronological().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["FIRST", "SECOND", "THIRD"]);
    }

    #[test]
    fn append_rejects_invalid() {
        let mut log = TransactionLog::new();
        let err = log.append(buy("A", 0.0, 1.0, at(2025, 1, 1, 9))).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
        assert!(log.is_empty());
    }

    #[test]
    fn until_is_inclusive() {
        let mut log = TransactionLog::new();
        log.append(buy("A", 1.0, 1.0, at(2025, 1, 1, 9))).unwrap();
        log.append(buy("B", 1.0, 1.0, at(2025, 1, 2, 9))).unwrap();
        log.append(buy("C", 1.0, 1.0, at(2025, 1, 3, 9))).unwrap();

        let symbols: Vec<&str> = log.until(at(2025, 1, 2, 9)).map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["A", "B"]);
    }

    #[test]
    fn edit_keeps_id_and_reorders() {
        let mut log = TransactionLog::new();
        let a = log.append(buy("A", 1.0, 1.0, at(2025, 1, 1, 9))).unwrap();
        log.append(buy("B", 1.0, 1.0, at(2025, 1, 2, 9))).unwrap();

        log.edit(a, buy("A", 5.0, 1.0, at(2025, 1, 3, 9))).unwrap();

        let edited = log.get(a).unwrap();
        assert_eq!(edited.id, a);
        assert_eq!(edited.quantity, 5.0);
        let symbols: Vec<&str> = log.chronological().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["B", "A"]);
    }

    #[test]
    fn edit_rejects_invalid_and_keeps_original() {
        let mut log = TransactionLog::new();
        let a = log.append(buy("A", 1.0, 1.0, at(2025, 1, 1, 9))).unwrap();
        assert!(log.edit(a, buy("A", -1.0, 1.0, at(2025, 1, 1, 9))).is_err());
        assert_eq!(log.get(a).unwrap().quantity, 1.0);
    }

    #[test]
    fn edit_unknown_id() {
        let mut log = TransactionLog::new();
        let err = log
            .edit(Uuid::new_v4(), buy("A", 1.0, 1.0, at(2025, 1, 1, 9)))
            .unwrap_err();
        assert!(matches!(err, CoreError::TransactionNotFound(_)));
    }

    #[test]
    fn remove_returns_transaction() {
        let mut log = TransactionLog::new();
        let a = log.append(buy("A", 1.0, 1.0, at(2025, 1, 1, 9))).unwrap();
        let b = log.append(buy("B", 1.0, 1.0, at(2025, 1, 2, 9))).unwrap();

        let removed = log.remove(a).unwrap();
        assert_eq!(removed.symbol, "A");
        assert_eq!(log.len(), 1);
        assert!(log.get(a).is_none());
        assert_eq!(log.chronological().next().unwrap().id, b);
    }

    #[test]
    fn remove_unknown_id() {
        let mut log = TransactionLog::new();
        assert!(matches!(
            log.remove(Uuid::new_v4()),
            Err(CoreError::TransactionNotFound(_))
        ));
    }

    #[test]
    fn earliest_and_latest() {
        let mut log = TransactionLog::new();
        assert!(log.earliest().is_none());
        log.append(buy("B", 1.0, 1.0, at(2025, 2, 1, 9))).unwrap();
        log.append(buy("A", 1.0, 1.0, at(2025, 1, 1, 9))).unwrap();
        assert_eq!(log.earliest().unwrap().symbol, "A");
        assert_eq!(log.latest().unwrap().symbol, "B");
    }

    #[test]
    fn from_transactions_validates() {
        let ok = TransactionLog::from_transactions(vec![
            buy("A", 1.0, 1.0, at(2025, 1, 1, 9)),
            buy("B", 1.0, 1.0, at(2025, 1, 2, 9)),
        ]);
        assert_eq!(ok.unwrap().len(), 2);

        let bad = TransactionLog::from_transactions(vec![buy("A", 0.0, 1.0, at(2025, 1, 1, 9))]);
        assert!(bad.is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Catalog
// ═══════════════════════════════════════════════════════════════════

mod catalog {
    use super::*;

    fn sample() -> Catalog {
        let mut c = Catalog::new();
        c.upsert_platform(Platform {
            id: 1,
            name: "Boursorama".into(),
            description: None,
        });
        c.upsert_account(Account {
            id: 10,
            platform_id: 1,
            name: "PEA".into(),
            account_type: "PEA".into(),
        });
        c.upsert_product(Product::new("cw8.pa", "Amundi MSCI World", AssetClass::Etf, "eur"));
        c.upsert_product(Product::new("BTC-USD", "Bitcoin", AssetClass::Crypto, "USD"));
        c
    }

    #[test]
    fn product_lookup_is_case_insensitive() {
        let c = sample();
        let p = c.product("Cw8.Pa").unwrap();
        assert_eq!(p.symbol, "CW8.PA");
        assert_eq!(p.currency, "EUR");
    }

    #[test]
    fn platform_of_account() {
        let c = sample();
        assert_eq!(c.platform_of(10).unwrap().name, "Boursorama");
        assert!(c.platform_of(99).is_none());
    }

    #[test]
    fn asset_classes_sorted_and_distinct() {
        let mut c = sample();
        c.upsert_product(Product::new("IWDA.AS", "iShares World", AssetClass::Etf, "EUR"));
        assert_eq!(c.asset_classes(), vec![AssetClass::Etf, AssetClass::Crypto]);
    }

    #[test]
    fn product_mut_updates_in_place() {
        let mut c = sample();
        c.product_mut("btc-usd").unwrap().last_price = Some(60000.0);
        assert_eq!(c.product("BTC-USD").unwrap().last_price, Some(60000.0));
    }

    #[test]
    fn with_last_price() {
        let p = Product::new("AAPL", "Apple", AssetClass::Stock, "USD").with_last_price(200.0, Some(185.0));
        assert_eq!(p.last_price, Some(200.0));
        assert_eq!(p.last_price_eur, Some(185.0));
    }

    #[test]
    fn asset_class_display() {
        assert_eq!(AssetClass::Etf.to_string(), "ETF");
        assert_eq!(AssetClass::Crypto.to_string(), "Crypto");
    }

    #[test]
    fn asset_class_from_quote_type() {
        assert_eq!(AssetClass::from_quote_type("ETF"), AssetClass::Etf);
        assert_eq!(AssetClass::from_quote_type("mutualfund"), AssetClass::Fund);
        assert_eq!(AssetClass::from_quote_type("CRYPTOCURRENCY"), AssetClass::Crypto);
        assert_eq!(AssetClass::from_quote_type("EQUITY"), AssetClass::Stock);
    }

    #[test]
    fn currency_from_symbol_suffixes() {
        assert_eq!(currency_from_symbol("BTC-EUR"), "EUR");
        assert_eq!(currency_from_symbol("eth-usd"), "USD");
        assert_eq!(currency_from_symbol("CW8.PA"), "EUR");
        assert_eq!(currency_from_symbol("VOD.L"), "GBP");
        assert_eq!(currency_from_symbol("NESN.SW"), "CHF");
        assert_eq!(currency_from_symbol("SHOP.TO"), "CAD");
        assert_eq!(currency_from_symbol("7203.T"), "JPY");
        assert_eq!(currency_from_symbol("AAPL"), "USD");
    }
}

// ═══════════════════════════════════════════════════════════════════
// PriceHistory
// ═══════════════════════════════════════════════════════════════════

mod price_history {
    use super::*;

    #[test]
    fn upsert_keeps_date_order_and_replaces() {
        let mut h = PriceHistory::new();
        h.upsert("AAPL", PricePoint::new(d(2025, 1, 3), 3.0));
        h.upsert("AAPL", PricePoint::new(d(2025, 1, 1), 1.0));
        h.upsert("aapl", PricePoint::new(d(2025, 1, 3), 30.0));

        let points = h.price_points("AAPL", d(2025, 1, 1), d(2025, 1, 31));
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, d(2025, 1, 1));
        assert_eq!(points[1].close, 30.0);
    }

    #[test]
    fn range_is_inclusive() {
        let mut h = PriceHistory::new();
        h.upsert_many(
            "X",
            (1..=5).map(|day| PricePoint::new(d(2025, 1, day), day as f64)),
        );
        let points = h.price_points("X", d(2025, 1, 2), d(2025, 1, 4));
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn inverted_range_is_empty() {
        let mut h = PriceHistory::new();
        h.upsert("X", PricePoint::new(d(2025, 1, 2), 1.0));
        assert!(h.price_points("X", d(2025, 1, 3), d(2025, 1, 1)).is_empty());
    }

    #[test]
    fn unknown_symbol_is_empty() {
        let h = PriceHistory::new();
        assert!(h.price_points("NOPE", d(2025, 1, 1), d(2025, 1, 31)).is_empty());
        assert!(h.latest("NOPE").is_none());
    }

    #[test]
    fn get_latest_and_counts() {
        let mut h = PriceHistory::new();
        h.upsert("A", PricePoint::new(d(2025, 1, 1), 1.0));
        h.upsert("A", PricePoint::new(d(2025, 1, 2), 2.0));
        h.upsert("B", PricePoint::new(d(2025, 1, 1), 5.0).with_equivalents(4.6, 5.0));

        assert_eq!(h.get("A", d(2025, 1, 2)).unwrap().close, 2.0);
        assert!(h.get("A", d(2025, 1, 3)).is_none());
        assert_eq!(h.latest("A").unwrap().date, d(2025, 1, 2));
        assert_eq!(h.get("B", d(2025, 1, 1)).unwrap().close_eur, Some(4.6));
        assert_eq!(h.total_entries(), 3);
        assert_eq!(h.symbol_count(), 2);
    }

    #[test]
    fn clear_symbol_returns_count() {
        let mut h = PriceHistory::new();
        h.upsert("A", PricePoint::new(d(2025, 1, 1), 1.0));
        h.upsert("A", PricePoint::new(d(2025, 1, 2), 2.0));
        assert_eq!(h.clear_symbol("a"), 2);
        assert_eq!(h.clear_symbol("a"), 0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Rates
// ═══════════════════════════════════════════════════════════════════

mod rates {
    use super::*;

    #[test]
    fn resolution_rate() {
        assert_eq!(RateResolution::Resolved(1.1).rate(), Some(1.1));
        let degraded = RateResolution::Degraded {
            rate: 1.08,
            reason: DegradedReason::FallbackConstant,
        };
        assert_eq!(degraded.rate(), Some(1.08));
        assert!(degraded.is_available());
        assert_eq!(RateResolution::Unavailable.rate(), None);
        assert!(!RateResolution::Unavailable.is_available());
    }

    #[test]
    fn degraded_reason_display() {
        assert_eq!(
            DegradedReason::FallbackConstant.to_string(),
            "fallback constant rate in use"
        );
        assert!(DegradedReason::HistoricalUnavailable { date: d(2025, 1, 2) }
            .to_string()
            .contains("2025-01-02"));
        assert!(DegradedReason::UnsupportedCurrency {
            currency: "XYZ".into()
        }
        .to_string()
        .contains("XYZ"));
    }

    #[test]
    fn conversion_exact_is_not_degraded() {
        let c = Conversion::exact(42.0);
        assert_eq!(c.amount, 42.0);
        assert!(!c.is_degraded());
    }

    #[test]
    fn cache_current_freshness() {
        let mut cache = RateCache::new();
        let now = Utc::now();
        cache.set_current(quote(1.1), now - Duration::hours(5));
        assert!(cache.fresh_current(now, Duration::hours(6)).is_some());
        assert!(cache.fresh_current(now, Duration::hours(4)).is_none());

        cache.invalidate_current();
        assert!(cache.current().is_none());
    }

    #[test]
    fn cache_upsert_is_idempotent_per_key() {
        let mut cache = RateCache::new();
        let rate = |r| ExchangeRate {
            from_currency: "eur".into(),
            to_currency: "usd".into(),
            date: d(2025, 1, 2),
            rate: r,
        };
        cache.upsert(rate(1.10));
        cache.upsert(rate(1.12));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_rate("EUR", "USD", d(2025, 1, 2)), Some(1.12));
        assert_eq!(cache.exchange_rates()[0].from_currency, "EUR");
    }

    #[test]
    fn cache_misses_expire_and_clear_on_upsert() {
        let mut cache = RateCache::new();
        let now = Utc::now();
        let day = d(2025, 1, 2);

        cache.record_miss(day, now - Duration::hours(7));
        assert!(!cache.is_recent_miss(day, now, Duration::hours(6)));

        cache.record_miss(day, now);
        assert!(cache.is_recent_miss(day, now, Duration::hours(6)));

        cache.upsert(ExchangeRate {
            from_currency: "EUR".into(),
            to_currency: "USD".into(),
            date: day,
            rate: 1.1,
        });
        assert!(!cache.is_recent_miss(day, now, Duration::hours(6)));
    }

    #[test]
    fn fx_quote_degraded_flag() {
        let mut q = quote(1.08);
        assert!(!q.is_degraded());
        q.degraded = Some(DegradedReason::FallbackConstant);
        assert!(q.is_degraded());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Settings
// ═══════════════════════════════════════════════════════════════════

mod settings {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.refresh_window_hours, 6);
        assert_eq!(s.fallback_eur_usd, 1.08);
        assert_eq!(s.fixed_rate("gbp"), Some(1.15));
        assert_eq!(s.fixed_rate("CHF"), Some(0.95));
        assert_eq!(s.fixed_rate("CAD"), Some(0.65));
        assert_eq!(s.fixed_rate("JPY"), Some(0.0067));
        assert_eq!(s.fixed_rate("USD"), None);
        assert_eq!(s.historical_window_days, 7);
        assert_eq!(s.request_timeout_secs, 10);
        assert_eq!(s.backfill_delay_ms, 1000);
        assert_eq!(
            s.ticker_aliases,
            vec![
                TickerAlias::direct("EURUSD=X"),
                TickerAlias::inverted("EUR=X"),
                TickerAlias::inverted("USDEUR=X"),
            ]
        );
        assert_eq!(s.refresh_window(), Duration::hours(6));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s = Settings::from_json(r#"{"fallback_eur_usd": 1.1, "price_window_days": 3}"#).unwrap();
        assert_eq!(s.fallback_eur_usd, 1.1);
        assert_eq!(s.price_window_days, 3);
        assert_eq!(s.refresh_window_hours, 6);
    }

    #[test]
    fn price_window_override_per_class() {
        let s = Settings::from_json(r#"{"price_window_overrides": {"Crypto": 1}}"#).unwrap();
        assert_eq!(s.price_window_for(AssetClass::Crypto), 1);
        assert_eq!(s.price_window_for(AssetClass::Stock), 7);
    }

    #[test]
    fn invalid_fallback_rejected() {
        let err = Settings::from_json(r#"{"fallback_eur_usd": 0.0}"#).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn negative_window_rejected() {
        assert!(Settings::from_json(r#"{"price_window_days": -1}"#).is_err());
        assert!(Settings::from_json(r#"{"price_window_overrides": {"Crypto": -2}}"#).is_err());
    }

    #[test]
    fn oversized_windows_rejected() {
        for json in [
            r#"{"refresh_window_hours": 9000000000000000}"#,
            r#"{"refresh_window_hours": 8761}"#,
            r#"{"price_window_days": 9000000000000000}"#,
            r#"{"historical_window_days": 3651}"#,
            r#"{"price_window_overrides": {"Crypto": 100000}}"#,
        ] {
            assert!(
                matches!(Settings::from_json(json), Err(CoreError::ValidationError(_))),
                "{json} should be rejected"
            );
        }
        let longest = Settings::from_json(
            r#"{"refresh_window_hours": 8760, "price_window_days": 3650, "historical_window_days": 3650}"#,
        )
        .unwrap();
        assert_eq!(longest.refresh_window(), Duration::hours(8760));
    }

    #[test]
    fn unvalidated_windows_are_clamped() {
        let s = Settings {
            refresh_window_hours: i64::MAX,
            price_window_days: i64::MAX,
            ..Settings::default()
        };
        assert_eq!(s.refresh_window(), Duration::hours(8760));
        assert_eq!(s.price_window_for(AssetClass::Etf), 3650);
    }

    #[test]
    fn unusable_fallback_uses_builtin_rate() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let s = Settings {
                fallback_eur_usd: bad,
                ..Settings::default()
            };
            assert_eq!(s.fallback_rate(), 1.08);
        }
        let custom = Settings {
            fallback_eur_usd: 1.2,
            ..Settings::default()
        };
        assert_eq!(custom.fallback_rate(), 1.2);
    }

    #[test]
    fn non_positive_fixed_rate_is_absent() {
        let mut s = Settings::default();
        s.fixed_rates_to_eur.insert("GBP".into(), 0.0);
        assert_eq!(s.fixed_rate("GBP"), None);
    }

    #[test]
    fn malformed_json_is_deserialization_error() {
        assert!(matches!(
            Settings::from_json("{"),
            Err(CoreError::Deserialization(_))
        ));
    }

    #[test]
    fn json_round_trip() {
        let s = Settings::default();
        let back = Settings::from_json(&s.to_json().unwrap()).unwrap();
        assert_eq!(s, back);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Evolution models
// ═══════════════════════════════════════════════════════════════════

mod evolution {
    use super::*;

    #[test]
    fn frequency_by_span() {
        assert_eq!(SamplingFrequency::for_span(0), SamplingFrequency::Daily);
        assert_eq!(SamplingFrequency::for_span(7), SamplingFrequency::Daily);
        assert_eq!(SamplingFrequency::for_span(8), SamplingFrequency::EveryTwoDays);
        assert_eq!(SamplingFrequency::for_span(30), SamplingFrequency::EveryTwoDays);
        assert_eq!(SamplingFrequency::for_span(31), SamplingFrequency::Weekly);
    }

    #[test]
    fn daily_dates_cover_span() {
        let dates = SamplingFrequency::Daily.sample_dates(d(2025, 1, 1), d(2025, 1, 5));
        assert_eq!(dates.len(), 5);
        assert_eq!(dates.first(), Some(&d(2025, 1, 1)));
        assert_eq!(dates.last(), Some(&d(2025, 1, 5)));
    }

    #[test]
    fn end_appended_when_step_misses_it() {
        let dates = SamplingFrequency::EveryTwoDays.sample_dates(d(2025, 1, 1), d(2025, 1, 10));
        assert_eq!(
            dates,
            vec![
                d(2025, 1, 1),
                d(2025, 1, 3),
                d(2025, 1, 5),
                d(2025, 1, 7),
                d(2025, 1, 9),
                d(2025, 1, 10),
            ]
        );
    }

    #[test]
    fn weekly_dates_strictly_increasing() {
        let dates = SamplingFrequency::Weekly.sample_dates(d(2024, 1, 1), d(2024, 12, 31));
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(dates.last(), Some(&d(2024, 12, 31)));
    }

    #[test]
    fn single_day_and_inverted_ranges() {
        let day = d(2025, 1, 1);
        assert_eq!(SamplingFrequency::Daily.sample_dates(day, day), vec![day]);
        assert!(SamplingFrequency::Daily
            .sample_dates(d(2025, 1, 2), d(2025, 1, 1))
            .is_empty());
    }

    #[test]
    fn request_span_and_frequency() {
        let r = EvolutionRequest::new(d(2025, 1, 1), d(2025, 1, 21), BreakdownDimension::Product);
        assert_eq!(r.span_days(), 20);
        assert_eq!(r.frequency(), SamplingFrequency::EveryTwoDays);
        assert!(r.filter.is_empty());

        let filtered = r.with_filter(EvolutionFilter {
            accounts: vec![1],
            ..Default::default()
        });
        assert!(!filtered.filter.is_empty());
    }

    #[test]
    fn breakdown_accumulates_per_category() {
        let mut b = Breakdown::new(BreakdownDimension::AssetClass);
        b.add(Category::AssetClass(AssetClass::Etf), 100.0);
        b.add(Category::AssetClass(AssetClass::Etf), 50.0);
        b.add(Category::AssetClass(AssetClass::Crypto), 25.0);

        assert_eq!(b.get(&Category::AssetClass(AssetClass::Etf)), Some(150.0));
        assert_eq!(b.total(), 175.0);
    }

    #[test]
    fn category_dimension_and_label() {
        let c = Category::Platform("Degiro".into());
        assert_eq!(c.dimension(), BreakdownDimension::Platform);
        assert_eq!(c.to_string(), "Degiro");
        assert_eq!(Category::AssetClass(AssetClass::Etf).to_string(), "ETF");
    }

    #[test]
    fn breakdown_serializes_labels_as_keys() {
        let mut b = Breakdown::new(BreakdownDimension::Currency);
        b.add(Category::Currency("USD".into()), 10.0);
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["dimension"], "Currency");
        assert_eq!(json["subtotals"]["USD"], 10.0);
    }
}
