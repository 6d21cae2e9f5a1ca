//! Per-category valuation and the combined eligibility assessment.
//!
//! Every function here is a pure derivation over a category record, the
//! current spot prices, and the exchange-rate table - nothing is stored.
//! The category rules:
//!
//! - **Metals**: regular (daily-worn) jewelry exempt; occasional and
//!   investment weights zakatable at weight x spot price.
//! - **Cash**: everything zakatable; foreign entries convert to base first.
//! - **Stocks**: active trading 100% at market value; passive holdings by
//!   the 30% quick ratio or by prorated company financials, per holding.
//! - **Crypto**: 100% at market value.
//! - **Real estate**: primary residence exempt; rental asset exempt but net
//!   rental income zakatable; property held for sale at full market value.
//! - **Retirement**: the accessible balance; inaccessible balances net of
//!   penalty and tax, or deferred entirely.
//! - **Receivables**: collectible debt zakatable; the user's own debts
//!   deduct from the combined total (short-term in full, long-term up to
//!   twelve installments).

use crate::assets::{
    CashRecord, CryptoRecord, HoldingStyle, MetalsRecord, PassiveValuation, RealEstateRecord,
    ReceivablesRecord, RetirementRecord, StocksRecord,
};
use crate::cache::MetalSnapshot;
use crate::currency::{Currency, RateTable};
use crate::hawl::HawlTracker;
use crate::nisab::{BindingMetal, NisabThreshold};
use crate::store::AssetValueStore;
use crate::types::{zakat_rate, AssetCategory, Breakdown, BreakdownItem, EngineError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// Zakatable share of market value under the passive quick method.
fn quick_ratio() -> Decimal {
    dec!(0.30)
}

/// Validated spot prices in the currency the store is denominated in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotPrices {
    pub gold_per_gram: Decimal,
    pub silver_per_gram: Decimal,
    pub currency: Currency,
}

impl From<&MetalSnapshot> for SpotPrices {
    fn from(snapshot: &MetalSnapshot) -> Self {
        SpotPrices {
            gold_per_gram: snapshot.gold_per_gram,
            silver_per_gram: snapshot.silver_per_gram,
            currency: snapshot.meta.currency.clone(),
        }
    }
}

pub fn breakdown_metals(
    record: &MetalsRecord,
    spot: &SpotPrices,
) -> Result<Breakdown, EngineError> {
    let mut items = BTreeMap::new();
    let weighted = [
        ("gold_regular", record.gold_regular_grams, spot.gold_per_gram, true),
        ("gold_occasional", record.gold_occasional_grams, spot.gold_per_gram, false),
        ("gold_investment", record.gold_investment_grams, spot.gold_per_gram, false),
        ("silver_regular", record.silver_regular_grams, spot.silver_per_gram, true),
        ("silver_occasional", record.silver_occasional_grams, spot.silver_per_gram, false),
        ("silver_investment", record.silver_investment_grams, spot.silver_per_gram, false),
    ];
    for (key, grams, price, exempt) in weighted {
        let value = grams
            .checked_mul(price)
            .ok_or_else(|| EngineError::overflow(format!("metal value of {key}")))?;
        let item = if exempt {
            BreakdownItem::exempt(value)
        } else {
            BreakdownItem::fully_zakatable(value)
        };
        items.insert(key.to_string(), item);
    }
    Ok(Breakdown::from_items(items))
}

pub fn breakdown_cash(
    record: &CashRecord,
    base: &Currency,
    rates: &RateTable,
) -> Result<Breakdown, EngineError> {
    let mut items = BTreeMap::new();
    items.insert("on_hand".to_string(), BreakdownItem::fully_zakatable(record.on_hand));
    items.insert("checking".to_string(), BreakdownItem::fully_zakatable(record.checking));
    items.insert("savings".to_string(), BreakdownItem::fully_zakatable(record.savings));
    items.insert(
        "digital_wallets".to_string(),
        BreakdownItem::fully_zakatable(record.digital_wallets),
    );
    for (idx, entry) in record.foreign_entries.iter().enumerate() {
        let converted = rates.convert(entry.amount, &entry.currency, base)?;
        items.insert(
            format!("foreign-{}-{}", entry.currency.as_str().to_lowercase(), idx),
            BreakdownItem::fully_zakatable(converted),
        );
    }
    Ok(Breakdown::from_items(items))
}

pub fn breakdown_stocks(
    record: &StocksRecord,
    base: &Currency,
    rates: &RateTable,
) -> Result<Breakdown, EngineError> {
    let mut items = BTreeMap::new();
    for (idx, holding) in record.holdings.iter().enumerate() {
        let market_value = rates.convert(holding.market_value()?, &holding.currency, base)?;
        let zakatable = match &holding.style {
            HoldingStyle::ActiveTrading => market_value,
            HoldingStyle::Passive(PassiveValuation::QuickRatio) => market_value * quick_ratio(),
            HoldingStyle::Passive(PassiveValuation::CompanyFinancials {
                cash,
                receivables,
                inventory,
                shares_outstanding,
            }) => {
                if *shares_outstanding <= Decimal::ZERO {
                    return Err(EngineError::invalid_input(
                        format!("stock.{}.shares_outstanding", holding.symbol),
                        "must be positive for the company-financials method",
                    ));
                }
                let current_assets = cash + receivables + inventory;
                let owned_share = current_assets
                    .checked_mul(holding.quantity)
                    .and_then(|v| v.checked_div(*shares_outstanding))
                    .ok_or_else(|| {
                        EngineError::overflow(format!("financials share of {}", holding.symbol))
                    })?;
                rates.convert(owned_share, &holding.currency, base)?
            }
        };
        let key = if items.contains_key(&holding.symbol) {
            format!("{}-{}", holding.symbol, idx)
        } else {
            holding.symbol.clone()
        };
        items.insert(key, BreakdownItem::partially_zakatable(market_value, zakatable));
    }
    Ok(Breakdown::from_items(items))
}

pub fn breakdown_crypto(
    record: &CryptoRecord,
    base: &Currency,
    rates: &RateTable,
) -> Result<Breakdown, EngineError> {
    let mut items = BTreeMap::new();
    for (idx, holding) in record.holdings.iter().enumerate() {
        let market_value = rates.convert(holding.market_value()?, &holding.currency, base)?;
        let key = if items.contains_key(&holding.symbol) {
            format!("{}-{}", holding.symbol, idx)
        } else {
            holding.symbol.clone()
        };
        items.insert(key, BreakdownItem::fully_zakatable(market_value));
    }
    Ok(Breakdown::from_items(items))
}

pub fn breakdown_real_estate(record: &RealEstateRecord) -> Breakdown {
    let mut items = BTreeMap::new();
    items.insert(
        "primary_residence".to_string(),
        BreakdownItem::exempt(record.primary_residence_value),
    );
    items.insert(
        "rental_property".to_string(),
        BreakdownItem::exempt(record.rental_property_value),
    );
    // Income net of directly attributable expenses; a loss contributes
    // nothing rather than deducting elsewhere.
    let net_income = (record.rental_income - record.rental_expenses).max(Decimal::ZERO);
    items.insert(
        "net_rental_income".to_string(),
        BreakdownItem::fully_zakatable(net_income),
    );
    items.insert(
        "listed_for_sale".to_string(),
        BreakdownItem::fully_zakatable(record.listed_for_sale_value),
    );
    Breakdown::from_items(items)
}

pub fn breakdown_retirement(record: &RetirementRecord) -> Breakdown {
    let zakatable = if record.fully_accessible {
        record.balance
    } else if record.defer_inaccessible {
        Decimal::ZERO
    } else {
        (record.balance - record.withdrawal_penalty - record.withdrawal_tax).max(Decimal::ZERO)
    };
    let mut items = BTreeMap::new();
    items.insert(
        "retirement_balance".to_string(),
        BreakdownItem::partially_zakatable(record.balance, zakatable),
    );
    Breakdown::from_items(items)
}

pub fn breakdown_receivables(record: &ReceivablesRecord) -> Breakdown {
    // Only the collectible side appears here; the user's own debts are a
    // combined-level deduction, not a negative item.
    let mut items = BTreeMap::new();
    items.insert(
        "owed_to_user".to_string(),
        BreakdownItem::fully_zakatable(record.owed_to_user),
    );
    Breakdown::from_items(items)
}

/// Dispatches to the category-specific breakdown.
pub fn breakdown_category(
    store: &AssetValueStore,
    category: AssetCategory,
    spot: &SpotPrices,
    rates: &RateTable,
) -> Result<Breakdown, EngineError> {
    let base = store.base_currency();
    match category {
        AssetCategory::Cash => breakdown_cash(store.cash(), base, rates),
        AssetCategory::PreciousMetals => breakdown_metals(store.metals(), spot),
        AssetCategory::Stocks => breakdown_stocks(store.stocks(), base, rates),
        AssetCategory::Crypto => breakdown_crypto(store.crypto(), base, rates),
        AssetCategory::RealEstate => Ok(breakdown_real_estate(store.real_estate())),
        AssetCategory::Retirement => Ok(breakdown_retirement(store.retirement())),
        AssetCategory::Receivables => Ok(breakdown_receivables(store.receivables())),
    }
}

/// The combined eligibility result the UI renders.
///
/// Per-category breakdowns keep their raw (ungated) figures; the combined
/// `zakatable` and `zakat_due` count a category only when its Hawl flag is
/// satisfied, and the user's deductible debts reduce the total before the
/// Nisab comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZakatAssessment {
    pub per_category: BTreeMap<AssetCategory, Breakdown>,
    pub total: Decimal,
    pub zakatable: Decimal,
    pub liabilities_deducted: Decimal,
    pub net_zakatable: Decimal,
    pub nisab_floor: Decimal,
    pub binding_metal: BindingMetal,
    pub meets_nisab: bool,
    pub zakat_due: Decimal,
}

/// Computes the full assessment across every category.
///
/// `spot` and `nisab` must be denominated in the store's base currency -
/// a mismatch means a conversion is mid-flight or the caller skipped the
/// re-pricing step, and silently mixing currencies would corrupt every
/// figure downstream.
pub fn assess(
    store: &AssetValueStore,
    spot: &SpotPrices,
    rates: &RateTable,
    hawl: &HawlTracker,
    nisab: &NisabThreshold,
) -> Result<ZakatAssessment, EngineError> {
    let base = store.base_currency();
    if &spot.currency != base {
        return Err(EngineError::invalid_input(
            "spot_prices",
            format!("priced in {} but store is {}", spot.currency, base),
        ));
    }
    if &nisab.currency != base {
        return Err(EngineError::invalid_input(
            "nisab",
            format!("priced in {} but store is {}", nisab.currency, base),
        ));
    }

    let mut per_category = BTreeMap::new();
    let mut total = Decimal::ZERO;
    let mut gated_zakatable = Decimal::ZERO;
    for category in AssetCategory::iter() {
        let breakdown = breakdown_category(store, category, spot, rates)?;
        total += breakdown.total;
        if hawl.is_satisfied(category) {
            gated_zakatable += breakdown.zakatable;
        }
        per_category.insert(category, breakdown);
    }

    let liabilities = store.receivables().deductible_liabilities();
    let net_zakatable = (gated_zakatable - liabilities).max(Decimal::ZERO);
    let nisab_floor = nisab.binding_value();
    let meets_nisab = net_zakatable >= nisab_floor && net_zakatable > Decimal::ZERO;
    let zakat_due = if meets_nisab {
        net_zakatable * zakat_rate()
    } else {
        Decimal::ZERO
    };

    Ok(ZakatAssessment {
        per_category,
        total,
        zakatable: gated_zakatable,
        liabilities_deducted: liabilities.min(gated_zakatable),
        net_zakatable,
        nisab_floor,
        binding_metal: nisab.binding_metal,
        meets_nisab,
        zakat_due,
    })
}
