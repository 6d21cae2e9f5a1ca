//! Currency-switch semantics: idempotence, round-trip stability, partial
//! failure, and Nisab re-pricing.

#![cfg(feature = "async")]

use rust_decimal_macros::dec;
use zakat_engine::prelude::*;

fn eur() -> Currency {
    Currency::new("EUR").unwrap()
}

fn rates() -> StaticRateSource {
    StaticRateSource::new(RateTable::new(vec![RateQuote::new(
        Currency::usd(),
        eur(),
        dec!(0.92),
    )]))
}

fn populated_store() -> AssetValueStore {
    let mut store = AssetValueStore::new(Currency::usd());
    store.set_value(AmountField::CashOnHand, 600).unwrap();
    store.set_value(AmountField::CashSavings, 2500).unwrap();
    store.set_value(AmountField::OwedToUser, 1000).unwrap();
    store.set_value(AmountField::GoldInvestmentGrams, 90).unwrap();
    store
        .add_crypto_holding(CryptoHolding::new("BTC", dec!(0.1), 64000, Currency::usd()).unwrap())
        .unwrap();
    store
}

#[tokio::test]
async fn test_convert_twice_equals_convert_once() {
    let mut store = populated_store();
    let mut coordinator = CurrencyCoordinator::new();
    let metals = StaticMetalSource::new(dec!(86.46), dec!(0.94), eur());

    coordinator
        .convert(&mut store, &Currency::usd(), &eur(), &rates(), &metals)
        .await
        .unwrap();
    let cash_after_one = store.amount(AmountField::CashOnHand);
    let savings_after_one = store.amount(AmountField::CashSavings);
    let btc_after_one = store.crypto().holdings[0].unit_price;

    // The same user action firing again must not compound the conversion.
    let outcome = coordinator
        .convert(&mut store, &Currency::usd(), &eur(), &rates(), &metals)
        .await
        .unwrap();

    assert!(outcome.no_op);
    assert_eq!(store.amount(AmountField::CashOnHand), cash_after_one);
    assert_eq!(store.amount(AmountField::CashSavings), savings_after_one);
    assert_eq!(store.crypto().holdings[0].unit_price, btc_after_one);
}

#[tokio::test]
async fn test_usd_eur_usd_round_trip_within_tolerance() {
    let mut store = populated_store();
    let mut coordinator = CurrencyCoordinator::new();
    let eur_metals = StaticMetalSource::new(dec!(86.46), dec!(0.94), eur());
    let usd_metals = StaticMetalSource::new(dec!(93.98), dec!(1.02), Currency::usd());

    coordinator
        .convert(&mut store, &Currency::usd(), &eur(), &rates(), &eur_metals)
        .await
        .unwrap();
    coordinator
        .convert(&mut store, &eur(), &Currency::usd(), &rates(), &usd_metals)
        .await
        .unwrap();

    let tolerance = dec!(0.01);
    assert!((store.amount(AmountField::CashOnHand) - dec!(600)).abs() <= tolerance);
    assert!((store.amount(AmountField::CashSavings) - dec!(2500)).abs() <= tolerance);
    assert!((store.amount(AmountField::OwedToUser) - dec!(1000)).abs() <= tolerance);
    assert!((store.crypto().holdings[0].unit_price - dec!(64000)).abs() <= tolerance);
    // Gram weights never moved at all.
    assert_eq!(store.amount(AmountField::GoldInvestmentGrams), dec!(90));
}

#[tokio::test]
async fn test_base_currency_written_before_values() {
    // A subscriber sees the BaseCurrencyChanged event before any
    // ValueChanged could possibly be observed in the new denomination:
    // the marker flips first, so no reader can catch a half-converted
    // store under the old label.
    let mut store = populated_store();
    store.subscribe(Box::new(|event| {
        if let StoreEvent::BaseCurrencyChanged { to, .. } = event {
            assert_eq!(to.as_str(), "EUR");
        }
    }));

    let mut coordinator = CurrencyCoordinator::new();
    let metals = StaticMetalSource::new(dec!(86.46), dec!(0.94), eur());
    coordinator
        .convert(&mut store, &Currency::usd(), &eur(), &rates(), &metals)
        .await
        .unwrap();

    assert_eq!(store.base_currency(), &eur());
}

#[tokio::test]
async fn test_partial_failure_keeps_unconvertible_fields() {
    let pkr = Currency::new("PKR").unwrap();
    let mut store = populated_store();
    // No PKR rate exists in the table.
    store
        .add_foreign_cash(ForeignCashEntry::new(50000, pkr.clone()).unwrap())
        .unwrap();

    let mut coordinator = CurrencyCoordinator::new();
    let metals = StaticMetalSource::new(dec!(86.46), dec!(0.94), eur());
    let outcome = coordinator
        .convert(&mut store, &Currency::usd(), &eur(), &rates(), &metals)
        .await
        .unwrap();

    // Everything convertible converted; the PKR entry stayed whole.
    assert_eq!(store.amount(AmountField::CashOnHand), dec!(552.00));
    assert_eq!(store.cash().foreign_entries[0].amount, dec!(50000));
    assert_eq!(store.cash().foreign_entries[0].currency, pkr);
    assert!(outcome.degraded);
    assert_eq!(outcome.skipped, vec!["foreign_cash:PKR".to_string()]);
}

#[tokio::test]
async fn test_nisab_repriced_in_target_currency() {
    let mut store = populated_store();
    let mut coordinator = CurrencyCoordinator::new();
    let metals = StaticMetalSource::new(dec!(86.46), dec!(0.94), eur());

    let outcome = coordinator
        .convert(&mut store, &Currency::usd(), &eur(), &rates(), &metals)
        .await
        .unwrap();

    let nisab = outcome.repriced_nisab.expect("nisab repriced");
    assert_eq!(nisab.currency, eur());
    // Priced from the EUR feed: 0.94 * 595 = 559.30. A USD threshold
    // multiplied by 0.92 would read 558.35 instead - conversion is not
    // a substitute for re-pricing.
    assert_eq!(nisab.binding_value(), dec!(559.30));
}

#[tokio::test]
async fn test_metal_feed_down_degrades_but_converts() {
    struct DownFeed;

    #[async_trait::async_trait]
    impl MetalPriceSource for DownFeed {
        async fn metal_prices(&self, _currency: &Currency) -> Result<MetalSnapshot, EngineError> {
            Err(EngineError::UpstreamUnavailable {
                source: "metals-api".to_string(),
                detail: "timeout".to_string(),
            })
        }
    }

    let mut store = populated_store();
    let mut coordinator = CurrencyCoordinator::new();
    let outcome = coordinator
        .convert(&mut store, &Currency::usd(), &eur(), &rates(), &DownFeed)
        .await
        .unwrap();

    // Monetary values converted fine; only the threshold is missing, and
    // the caller is told so instead of receiving a silent stale figure.
    assert_eq!(store.amount(AmountField::CashOnHand), dec!(552.00));
    assert!(outcome.repriced_nisab.is_none());
    assert!(outcome.degraded);
}

#[tokio::test]
async fn test_assessment_after_conversion_uses_new_denomination() {
    let mut store = AssetValueStore::new(Currency::usd());
    store.set_value(AmountField::CashOnHand, 10000).unwrap();

    let mut coordinator = CurrencyCoordinator::new();
    let metals = StaticMetalSource::new(dec!(86.46), dec!(0.94), eur());
    let outcome = coordinator
        .convert(&mut store, &Currency::usd(), &eur(), &rates(), &metals)
        .await
        .unwrap();
    let nisab = outcome.repriced_nisab.unwrap();

    let spot = SpotPrices {
        gold_per_gram: dec!(86.46),
        silver_per_gram: dec!(0.94),
        currency: eur(),
    };
    let assessment = assess(
        &store,
        &spot,
        &RateTable::default(),
        &HawlTracker::new(),
        &nisab,
    )
    .unwrap();

    // 10000 USD -> 9200 EUR, all zakatable, above the 559.30 EUR floor.
    assert_eq!(assessment.zakatable, dec!(9200.00));
    assert!(assessment.meets_nisab);
    assert_eq!(assessment.zakat_due, dec!(9200.00) * dec!(0.025));
}
