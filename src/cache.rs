//! Price-cache validation.
//!
//! External price feeds occasionally return zero, null, clock-skewed, or
//! plainly wrong values (stale cache payloads especially). Accepting them
//! would silently corrupt the Nisab comparison and the final Zakat amount,
//! so every externally-sourced snapshot passes through here before the
//! engine will read it. Validation is advisory: it returns a verdict and
//! never errors, and callers that receive a rejection fall back to the last
//! good snapshot or a static default.

use crate::currency::Currency;
use crate::types::EngineError;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provenance shared by every snapshot: which feed produced it, when, in
/// what currency, and whether it came from the feed's own cache layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub currency: Currency,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub is_cache: bool,
}

impl SnapshotMeta {
    pub fn new(currency: Currency, timestamp: DateTime<Utc>, source: impl Into<String>) -> Self {
        SnapshotMeta {
            currency,
            timestamp,
            source: source.into(),
            is_cache: false,
        }
    }

    pub fn cached(mut self) -> Self {
        self.is_cache = true;
        self
    }
}

/// Gold and silver spot prices per gram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalSnapshot {
    pub gold_per_gram: Decimal,
    pub silver_per_gram: Decimal,
    pub meta: SnapshotMeta,
}

/// A single stock or crypto quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub price: Decimal,
    pub meta: SnapshotMeta,
}

/// Why a snapshot was rejected. The `Display` text is what callers surface
/// next to the "using fallback data" indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum RejectReason {
    #[error("timestamp is in the future by {skew_minutes} minute(s)")]
    FutureDated { skew_minutes: i64 },

    #[error("snapshot is {age_minutes} minute(s) old, max allowed {max_minutes}")]
    Stale { age_minutes: i64, max_minutes: i64 },

    #[error("'{field}' is not a positive number: {value}")]
    NonPositive { field: String, value: Decimal },

    #[error("'{field}' value {value} outside plausible range {low}..{high} {currency}")]
    OutOfRange {
        field: String,
        value: Decimal,
        low: Decimal,
        high: Decimal,
        currency: Currency,
    },
}

impl RejectReason {
    /// Lifts the advisory rejection into the engine error taxonomy, for the
    /// few call sites (Nisab evaluation) that must fail hard on bad input.
    pub fn into_error(self, source: &str) -> EngineError {
        let detail = self.to_string();
        match self {
            RejectReason::Stale { .. } => EngineError::StalePrice {
                source: source.to_string(),
                detail,
            },
            RejectReason::FutureDated { .. } => EngineError::FuturePrice {
                source: source.to_string(),
                detail,
            },
            RejectReason::NonPositive { .. } | RejectReason::OutOfRange { .. } => {
                EngineError::OutOfRangePrice {
                    source: source.to_string(),
                    detail,
                }
            }
        }
    }
}

/// Outcome of validating one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotVerdict {
    Valid,
    Rejected(RejectReason),
}

impl SnapshotVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, SnapshotVerdict::Valid)
    }

    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            SnapshotVerdict::Valid => None,
            SnapshotVerdict::Rejected(r) => Some(r),
        }
    }
}

/// Per-asset-class validation policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOptions {
    /// Maximum acceptable snapshot age.
    pub max_age: Duration,
    /// Accept future-dated timestamps (some feeds run a skewed clock).
    pub allow_future_dates: bool,
    /// Apply the plausibility band to metal prices.
    pub strict_range: bool,
}

impl ValidationOptions {
    /// Metal spot prices move slowly; 30 minutes is fresh enough.
    pub fn for_metals() -> Self {
        ValidationOptions {
            max_age: Duration::minutes(30),
            allow_future_dates: false,
            strict_range: false,
        }
    }

    /// Stock and crypto quotes go stale quickly.
    pub fn for_quotes() -> Self {
        ValidationOptions {
            max_age: Duration::minutes(5),
            allow_future_dates: false,
            strict_range: false,
        }
    }

    /// The Nisab threshold tolerates an hour-old metal snapshot.
    pub fn for_nisab() -> Self {
        ValidationOptions {
            max_age: Duration::hours(1),
            allow_future_dates: false,
            strict_range: false,
        }
    }

    pub fn with_strict_range(mut self, strict: bool) -> Self {
        self.strict_range = strict;
        self
    }

    pub fn allowing_future_dates(mut self) -> Self {
        self.allow_future_dates = true;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

// Plausibility bands in USD per gram. Feeds that return a per-ounce or
// per-kilogram figure by mistake land far outside these.
fn gold_band_usd() -> (Decimal, Decimal) {
    (dec!(50), dec!(120))
}

fn silver_band_usd() -> (Decimal, Decimal) {
    (dec!(0.5), dec!(3))
}

/// Rough USD->X rates used only to translate the plausibility band for
/// non-USD feeds. Precision does not matter here; the band is widened by
/// +/-50% before use.
static EXPECTED_USD_RATES: Lazy<HashMap<&'static str, Decimal>> = Lazy::new(|| {
    HashMap::from([
        ("USD", dec!(1)),
        ("EUR", dec!(0.92)),
        ("GBP", dec!(0.79)),
        ("CAD", dec!(1.36)),
        ("AUD", dec!(1.52)),
        ("SAR", dec!(3.75)),
        ("AED", dec!(3.67)),
        ("MYR", dec!(4.45)),
        ("IDR", dec!(15800)),
        ("PKR", dec!(278)),
        ("INR", dec!(84)),
        ("TRY", dec!(34)),
        ("EGP", dec!(49)),
    ])
});

/// Validates a metal-price snapshot against freshness and range policy.
pub fn validate_metal(
    snapshot: &MetalSnapshot,
    options: &ValidationOptions,
    now: DateTime<Utc>,
) -> SnapshotVerdict {
    if let Some(reason) = check_timestamp(&snapshot.meta, options, now) {
        return SnapshotVerdict::Rejected(reason);
    }
    for (field, value) in [
        ("gold_per_gram", snapshot.gold_per_gram),
        ("silver_per_gram", snapshot.silver_per_gram),
    ] {
        if value <= Decimal::ZERO {
            return SnapshotVerdict::Rejected(RejectReason::NonPositive {
                field: field.to_string(),
                value,
            });
        }
    }
    if options.strict_range {
        if let Some(reason) = check_band(
            "gold_per_gram",
            snapshot.gold_per_gram,
            gold_band_usd(),
            &snapshot.meta.currency,
        ) {
            return SnapshotVerdict::Rejected(reason);
        }
        if let Some(reason) = check_band(
            "silver_per_gram",
            snapshot.silver_per_gram,
            silver_band_usd(),
            &snapshot.meta.currency,
        ) {
            return SnapshotVerdict::Rejected(reason);
        }
    }
    SnapshotVerdict::Valid
}

/// Validates a stock/crypto quote. Range policy does not apply: equity and
/// crypto prices have no universal plausibility band.
pub fn validate_quote(
    snapshot: &QuoteSnapshot,
    options: &ValidationOptions,
    now: DateTime<Utc>,
) -> SnapshotVerdict {
    if let Some(reason) = check_timestamp(&snapshot.meta, options, now) {
        return SnapshotVerdict::Rejected(reason);
    }
    if snapshot.price <= Decimal::ZERO {
        return SnapshotVerdict::Rejected(RejectReason::NonPositive {
            field: "price".to_string(),
            value: snapshot.price,
        });
    }
    SnapshotVerdict::Valid
}

fn check_timestamp(
    meta: &SnapshotMeta,
    options: &ValidationOptions,
    now: DateTime<Utc>,
) -> Option<RejectReason> {
    if meta.timestamp > now && !options.allow_future_dates {
        return Some(RejectReason::FutureDated {
            skew_minutes: (meta.timestamp - now).num_minutes().max(1),
        });
    }
    let age = now - meta.timestamp;
    if age > options.max_age {
        return Some(RejectReason::Stale {
            age_minutes: age.num_minutes(),
            max_minutes: options.max_age.num_minutes(),
        });
    }
    None
}

fn check_band(
    field: &str,
    value: Decimal,
    usd_band: (Decimal, Decimal),
    currency: &Currency,
) -> Option<RejectReason> {
    let Some(rate) = EXPECTED_USD_RATES.get(currency.as_str()) else {
        // Unknown currency: no basis to judge the magnitude, let it pass.
        tracing::debug!("no expected rate for {currency}, skipping range check");
        return None;
    };
    // +/-50% margin absorbs both market drift and the roughness of the
    // expected-rate table.
    let low = usd_band.0 * rate * dec!(0.5);
    let high = usd_band.1 * rate * dec!(1.5);
    if value < low || value > high {
        return Some(RejectReason::OutOfRange {
            field: field.to_string(),
            value,
            low,
            high,
            currency: currency.clone(),
        });
    }
    None
}
