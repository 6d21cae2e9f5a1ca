use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter};

/// The standard Zakat rate applied to qualifying net wealth (2.5%).
pub fn zakat_rate() -> Decimal {
    dec!(0.025)
}

/// Grams of gold defining the gold-based Nisab threshold.
pub fn nisab_gold_grams() -> Decimal {
    dec!(85)
}

/// Grams of silver defining the silver-based Nisab threshold.
pub fn nisab_silver_grams() -> Decimal {
    dec!(595)
}

/// Asset categories tracked by the engine.
///
/// Each category owns a typed record in [`crate::store::AssetValueStore`];
/// the set is closed so resets, persistence, and conversion can iterate the
/// declared schema instead of walking untyped maps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter, Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AssetCategory {
    Cash,
    PreciousMetals,
    Stocks,
    Crypto,
    RealEstate,
    Retirement,
    Receivables,
}

/// Unified error type for every fallible engine operation.
///
/// Mirrors the failure taxonomy the engine exposes to callers: invalid user
/// entry, rejected price data, missing conversion rates, and upstream feed
/// failures. No engine routine panics past its own boundary; everything
/// surfaces through this enum or through an advisory verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineError {
    /// Non-numeric, negative, or otherwise malformed user entry.
    /// Rejected at the store boundary; nothing is mutated.
    InvalidInput { field: String, reason: String },

    /// A price snapshot is older than the TTL for its asset class.
    StalePrice { source: String, detail: String },

    /// A price snapshot is timestamped in the future (clock skew or
    /// corrupted cache).
    FuturePrice { source: String, detail: String },

    /// A quoted value is non-positive or outside the plausibility band.
    OutOfRangePrice { source: String, detail: String },

    /// No exchange rate could be resolved for the pair. The affected field
    /// is left unconverted; this is a recoverable warning, not a fatal stop.
    ConversionRateUnavailable { from: String, to: String },

    /// A price or rate collaborator failed entirely. Callers degrade to the
    /// last-known-good value or a static fallback.
    UpstreamUnavailable { source: String, detail: String },

    /// Decimal arithmetic overflowed.
    Overflow { operation: String },

    /// A required configuration value is absent.
    MissingConfig { field: String },
}

// NOTE: `Display`/`Error` are implemented by hand rather than via
// `thiserror::Error` because several variants carry a field literally named
// `source`, which thiserror unconditionally treats as the error-chain source
// (requiring `String: std::error::Error`). The strings below reproduce the
// original `#[error(...)]` attributes verbatim; `source()` returns `None`
// since `source` here is a data-source label, not an underlying error.
impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidInput { field, reason } => {
                write!(f, "invalid input for '{field}': {reason}")
            }
            EngineError::StalePrice { source, detail } => {
                write!(f, "stale price from '{source}': {detail}")
            }
            EngineError::FuturePrice { source, detail } => {
                write!(f, "future-dated price from '{source}': {detail}")
            }
            EngineError::OutOfRangePrice { source, detail } => {
                write!(f, "out-of-range price from '{source}': {detail}")
            }
            EngineError::ConversionRateUnavailable { from, to } => {
                write!(f, "no exchange rate available for {from}/{to}")
            }
            EngineError::UpstreamUnavailable { source, detail } => {
                write!(f, "upstream source '{source}' unavailable: {detail}")
            }
            EngineError::Overflow { operation } => {
                write!(f, "arithmetic overflow during '{operation}'")
            }
            EngineError::MissingConfig { field } => {
                write!(f, "missing configuration: '{field}' is required")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn overflow(operation: impl Into<String>) -> Self {
        EngineError::Overflow {
            operation: operation.into(),
        }
    }

    /// True when the error came from the price-validation layer
    /// (stale, future-dated, or out-of-range data).
    pub fn is_price_rejection(&self) -> bool {
        matches!(
            self,
            EngineError::StalePrice { .. }
                | EngineError::FuturePrice { .. }
                | EngineError::OutOfRangePrice { .. }
        )
    }
}

/// One line of a category breakdown: a single holding or sub-field with its
/// full value and the portion of that value subject to Zakat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownItem {
    /// Full market value of the item in the base currency.
    pub value: Decimal,
    /// Whether any portion of this item counts toward the zakatable total.
    pub is_zakatable: bool,
    /// Whether the item is explicitly exempt (primary residence,
    /// daily-worn jewelry). Distinct from merely having a zero value.
    pub is_exempt: bool,
    /// Portion of `value` subject to the Zakat rate.
    pub zakatable: Decimal,
    /// `zakatable` x 2.5%.
    pub zakat_due: Decimal,
}

impl BreakdownItem {
    /// An item zakatable at its full value.
    pub fn fully_zakatable(value: Decimal) -> Self {
        Self::partially_zakatable(value, value)
    }

    /// An item where only `zakatable` of `value` qualifies.
    pub fn partially_zakatable(value: Decimal, zakatable: Decimal) -> Self {
        BreakdownItem {
            value,
            is_zakatable: zakatable > Decimal::ZERO,
            is_exempt: false,
            zakatable,
            zakat_due: zakatable * zakat_rate(),
        }
    }

    /// An explicitly exempt item. Its value still appears in the category
    /// total but contributes nothing to the zakatable sum.
    pub fn exempt(value: Decimal) -> Self {
        BreakdownItem {
            value,
            is_zakatable: false,
            is_exempt: true,
            zakatable: Decimal::ZERO,
            zakat_due: Decimal::ZERO,
        }
    }
}

/// Derived per-category valuation. Never stored; recomputed from the store
/// and the current price snapshots.
///
/// Invariants (held by construction in [`Breakdown::from_items`]):
/// - `zakatable == sum(items[*].zakatable where is_zakatable)`
/// - `zakat_due == zakatable * 0.025`
/// - `total == sum(items[*].value)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub total: Decimal,
    pub zakatable: Decimal,
    pub zakat_due: Decimal,
    pub items: BTreeMap<String, BreakdownItem>,
}

impl Breakdown {
    /// Builds a breakdown from its items, deriving the totals so the
    /// invariants hold by construction.
    pub fn from_items(items: BTreeMap<String, BreakdownItem>) -> Self {
        let total = items.values().map(|i| i.value).sum();
        let zakatable = items
            .values()
            .filter(|i| i.is_zakatable)
            .map(|i| i.zakatable)
            .sum::<Decimal>();
        Breakdown {
            total,
            zakatable,
            zakat_due: zakatable * zakat_rate(),
            items,
        }
    }

    pub fn empty() -> Self {
        Breakdown::from_items(BTreeMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_invariants() {
        let mut items = BTreeMap::new();
        items.insert("a".to_string(), BreakdownItem::fully_zakatable(dec!(100)));
        items.insert("b".to_string(), BreakdownItem::exempt(dec!(50)));
        items.insert(
            "c".to_string(),
            BreakdownItem::partially_zakatable(dec!(200), dec!(60)),
        );

        let b = Breakdown::from_items(items);
        assert_eq!(b.total, dec!(350));
        assert_eq!(b.zakatable, dec!(160));
        assert_eq!(b.zakat_due, dec!(160) * zakat_rate());
    }

    #[test]
    fn test_exempt_item_contributes_value_only() {
        let item = BreakdownItem::exempt(dec!(500000));
        assert!(!item.is_zakatable);
        assert!(item.is_exempt);
        assert_eq!(item.zakatable, Decimal::ZERO);
        assert_eq!(item.zakat_due, Decimal::ZERO);
    }

    #[test]
    fn test_zero_valued_item_is_not_exempt() {
        // A zero entry is merely empty, not an exemption ruling.
        let item = BreakdownItem::fully_zakatable(Decimal::ZERO);
        assert!(!item.is_exempt);
        assert!(!item.is_zakatable);
    }
}
