use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use zakat_engine::prelude::*;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn metal_snapshot(gold: Decimal, silver: Decimal) -> MetalSnapshot {
    MetalSnapshot {
        gold_per_gram: gold,
        silver_per_gram: silver,
        meta: SnapshotMeta::new(Currency::usd(), now() - Duration::minutes(5), "metals-api"),
    }
}

#[test]
fn test_end_to_end_eligibility() {
    // Scenario:
    // Cash on hand: 600 USD.
    // Investment gold: 90g at 93.98 USD/g = 8,458.20.
    // Silver at 1.02 USD/g -> nisab = 595 * 1.02 = 606.90 (silver binds).
    //
    // Combined zakatable = 600 + 8,458.20 = 9,058.20 >= 606.90.
    // Zakat due = 9,058.20 * 0.025 = 226.455.

    let mut store = AssetValueStore::new(Currency::usd());
    store.set_value(AmountField::CashOnHand, 600).unwrap();
    store.set_value(AmountField::GoldInvestmentGrams, 90).unwrap();

    let snapshot = metal_snapshot(dec!(93.98), dec!(1.02));
    let verdict = validate_metal(&snapshot, &ValidationOptions::for_metals(), now());
    assert!(verdict.is_valid());

    let nisab = NisabEvaluator::default()
        .evaluate_snapshot(&snapshot, now())
        .unwrap();
    assert_eq!(nisab.binding_metal, BindingMetal::Silver);
    assert_eq!(nisab.binding_value(), dec!(606.90));

    let assessment = assess(
        &store,
        &SpotPrices::from(&snapshot),
        &RateTable::default(),
        &HawlTracker::new(),
        &nisab,
    )
    .unwrap();

    assert_eq!(assessment.zakatable, dec!(9058.20));
    assert!(assessment.meets_nisab);
    assert_eq!(assessment.zakat_due, dec!(226.455));
}

#[test]
fn test_combined_breakdown_invariants_hold_per_category() {
    let eur = Currency::new("EUR").unwrap();
    let mut store = AssetValueStore::new(Currency::usd());
    store.set_value(AmountField::CashChecking, 1200).unwrap();
    store.set_value(AmountField::GoldRegularGrams, 40).unwrap();
    store.set_value(AmountField::GoldOccasionalGrams, 15).unwrap();
    store.set_value(AmountField::PrimaryResidenceValue, 350000).unwrap();
    store.set_value(AmountField::OwedToUser, 900).unwrap();
    store
        .add_stock_holding(
            StockHolding::new("FUND", 20, 50, Currency::usd())
                .unwrap()
                .with_style(HoldingStyle::Passive(PassiveValuation::QuickRatio)),
        )
        .unwrap();
    store
        .add_foreign_cash(ForeignCashEntry::new(200, eur.clone()).unwrap())
        .unwrap();

    let snapshot = metal_snapshot(dec!(93.98), dec!(1.02));
    let nisab = NisabEvaluator::default()
        .evaluate_snapshot(&snapshot, now())
        .unwrap();
    let rates = RateTable::new(vec![RateQuote::new(eur, Currency::usd(), dec!(1.10))]);

    let assessment = assess(
        &store,
        &SpotPrices::from(&snapshot),
        &rates,
        &HawlTracker::new(),
        &nisab,
    )
    .unwrap();

    let tolerance = dec!(0.01);
    for (category, breakdown) in &assessment.per_category {
        let item_values: Decimal = breakdown.items.values().map(|i| i.value).sum();
        let item_zakatable: Decimal = breakdown
            .items
            .values()
            .filter(|i| i.is_zakatable)
            .map(|i| i.zakatable)
            .sum();

        assert!(
            (breakdown.total - item_values).abs() <= tolerance,
            "total invariant violated for {category}"
        );
        assert!(
            (breakdown.zakatable - item_zakatable).abs() <= tolerance,
            "zakatable invariant violated for {category}"
        );
        assert!(
            (breakdown.zakat_due - breakdown.zakatable * dec!(0.025)).abs() <= tolerance,
            "rate invariant violated for {category}"
        );
    }
}

#[test]
fn test_daily_jewelry_never_taxed_investment_always() {
    // 40g daily-worn gold is exempt no matter what; the 15g occasional and
    // 90g investment weights always count.
    let mut store = AssetValueStore::new(Currency::usd());
    store.set_value(AmountField::GoldRegularGrams, 40).unwrap();
    store.set_value(AmountField::GoldOccasionalGrams, 15).unwrap();
    store.set_value(AmountField::GoldInvestmentGrams, 90).unwrap();

    let snapshot = metal_snapshot(dec!(100), dec!(1));
    let nisab = NisabEvaluator::default()
        .evaluate_snapshot(&snapshot, now())
        .unwrap();
    let assessment = assess(
        &store,
        &SpotPrices::from(&snapshot),
        &RateTable::default(),
        &HawlTracker::new(),
        &nisab,
    )
    .unwrap();

    let metals = &assessment.per_category[&AssetCategory::PreciousMetals];
    // (15 + 90) * 100; the 40g regular weight is absent from zakatable.
    assert_eq!(metals.zakatable, dec!(10500));
    assert_eq!(metals.total, dec!(14500));
    assert!(metals.items["gold_regular"].is_exempt);
}

#[test]
fn test_primary_residence_magnitude_is_irrelevant() {
    let mut store = AssetValueStore::new(Currency::usd());
    store
        .set_value(AmountField::PrimaryResidenceValue, 10_000_000)
        .unwrap();
    store.set_value(AmountField::RentalIncome, 24000).unwrap();
    store.set_value(AmountField::RentalExpenses, 9000).unwrap();

    let snapshot = metal_snapshot(dec!(93.98), dec!(1.02));
    let nisab = NisabEvaluator::default()
        .evaluate_snapshot(&snapshot, now())
        .unwrap();
    let assessment = assess(
        &store,
        &SpotPrices::from(&snapshot),
        &RateTable::default(),
        &HawlTracker::new(),
        &nisab,
    )
    .unwrap();

    // Only the 15,000 net rental income is zakatable; 2.5% of it is due.
    assert_eq!(assessment.zakatable, dec!(15000));
    assert_eq!(assessment.zakat_due, dec!(375.000));
}

#[test]
fn test_rental_income_gated_by_hawl() {
    let mut store = AssetValueStore::new(Currency::usd());
    store.set_value(AmountField::RentalIncome, 24000).unwrap();
    store.set_value(AmountField::RentalExpenses, 9000).unwrap();

    let mut hawl = HawlTracker::new();
    hawl.set(AssetCategory::RealEstate, false);

    let snapshot = metal_snapshot(dec!(93.98), dec!(1.02));
    let nisab = NisabEvaluator::default()
        .evaluate_snapshot(&snapshot, now())
        .unwrap();
    let assessment = assess(
        &store,
        &SpotPrices::from(&snapshot),
        &RateTable::default(),
        &hawl,
        &nisab,
    )
    .unwrap();

    assert_eq!(assessment.zakatable, Decimal::ZERO);
    assert_eq!(assessment.zakat_due, Decimal::ZERO);
}

#[test]
fn test_rejected_nisab_falls_back_to_cached_threshold() {
    // A session saved a good threshold; the next fetch returns a zero
    // silver price. The engine must keep comparing against the cached
    // floor, never against zero.
    let evaluator = NisabEvaluator::default();
    let cached = evaluator
        .evaluate_snapshot(&metal_snapshot(dec!(93.98), dec!(1.02)), now())
        .unwrap();

    let corrupt = metal_snapshot(dec!(93.98), Decimal::ZERO);
    let fresh = evaluator.evaluate_snapshot(&corrupt, now());
    assert!(fresh.is_err());

    let (resolved, degraded) = evaluator.resolve_with_fallback(fresh, Some(&cached), now());
    assert!(degraded);
    assert_eq!(resolved.binding_value(), dec!(606.90));
}

#[test]
fn test_hydrated_session_resumes_assessment() {
    // Persist a populated session, hydrate a new store from the blob, and
    // verify the assessment is identical.
    let mut store = AssetValueStore::new(Currency::usd());
    store.set_value(AmountField::CashOnHand, 600).unwrap();
    store.set_value(AmountField::GoldInvestmentGrams, 90).unwrap();

    let snapshot = metal_snapshot(dec!(93.98), dec!(1.02));
    let nisab = NisabEvaluator::default()
        .evaluate_snapshot(&snapshot, now())
        .unwrap();

    let blob = PersistedState::capture(
        &store,
        &HawlTracker::new(),
        Some(snapshot.clone()),
        Some(nisab.clone()),
    )
    .to_json()
    .unwrap();

    let state = PersistedState::from_json(&blob).unwrap();
    let saved_nisab = state.last_nisab.clone().expect("saved threshold");
    let mut restored = AssetValueStore::pending_hydration(Currency::usd());
    let hawl = restored.hydrate(state, HydrationIntent::Restore);

    let assessment = assess(
        &restored,
        &SpotPrices::from(&snapshot),
        &RateTable::default(),
        &hawl,
        &saved_nisab,
    )
    .unwrap();

    assert_eq!(assessment.zakatable, dec!(9058.20));
    assert_eq!(assessment.zakat_due, dec!(226.455));
}
