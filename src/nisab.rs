//! Nisab threshold evaluation.
//!
//! The Nisab is the minimum-wealth floor below which no Zakat is due. It is
//! priced from gold and silver spot prices against fixed scale weights
//! (85 g gold, 595 g silver), and the *lower* of the two thresholds governs
//! so that more wealth qualifies for Zakat, not less.
//!
//! A zero threshold would make all wealth appear zakatable, so evaluation
//! refuses rejected price data outright; callers degrade through the last
//! valid threshold and finally a static fallback.

use crate::cache::{validate_metal, MetalSnapshot, SnapshotMeta, ValidationOptions};
use crate::currency::Currency;
use crate::types::{nisab_gold_grams, nisab_silver_grams, EngineError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Which metal's threshold is the binding (lower) one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingMetal {
    Gold,
    Silver,
}

/// A priced Nisab threshold in a specific currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NisabThreshold {
    pub gold_value: Decimal,
    pub silver_value: Decimal,
    pub currency: Currency,
    pub timestamp: DateTime<Utc>,
    pub binding_metal: BindingMetal,
    /// Feed that priced the underlying snapshot ("fallback" for the static
    /// default).
    pub source: String,
}

impl NisabThreshold {
    /// The single comparison floor: the lower of the two metal thresholds.
    pub fn binding_value(&self) -> Decimal {
        match self.binding_metal {
            BindingMetal::Gold => self.gold_value,
            BindingMetal::Silver => self.silver_value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == "fallback"
    }
}

/// Hardcoded last-resort threshold, used only when no live snapshot and no
/// previously cached threshold exist. Defined for USD only; other currencies
/// must come from a real snapshot. 85 USD/g gold and 1 USD/g silver sit in
/// the middle of the validator's plausibility bands.
pub fn static_fallback_threshold(now: DateTime<Utc>) -> NisabThreshold {
    let gold_value = dec!(85) * nisab_gold_grams();
    let silver_value = dec!(1) * nisab_silver_grams();
    NisabThreshold {
        gold_value,
        silver_value,
        currency: Currency::usd(),
        timestamp: now,
        binding_metal: BindingMetal::Silver,
        source: "fallback".to_string(),
    }
}

/// Computes Nisab thresholds from validated metal snapshots.
#[derive(Debug, Clone)]
pub struct NisabEvaluator {
    options: ValidationOptions,
}

impl Default for NisabEvaluator {
    fn default() -> Self {
        NisabEvaluator {
            options: ValidationOptions::for_nisab(),
        }
    }
}

impl NisabEvaluator {
    pub fn new(options: ValidationOptions) -> Self {
        NisabEvaluator { options }
    }

    /// Evaluates both thresholds and selects the binding one.
    ///
    /// The gold price is read from `gold`, the silver price from `silver`;
    /// passing the same snapshot twice is the common single-feed case. Fails
    /// with a price-rejection error if either snapshot fails validation -
    /// the caller must then fall back to a cached threshold, never to zero.
    pub fn evaluate(
        &self,
        gold: &MetalSnapshot,
        silver: &MetalSnapshot,
        now: DateTime<Utc>,
    ) -> Result<NisabThreshold, EngineError> {
        if gold.meta.currency != silver.meta.currency {
            return Err(EngineError::invalid_input(
                "nisab",
                format!(
                    "metal snapshots disagree on currency: {} vs {}",
                    gold.meta.currency, silver.meta.currency
                ),
            ));
        }
        for snapshot in [gold, silver] {
            if let Some(reason) = validate_metal(snapshot, &self.options, now).reason() {
                return Err(reason.clone().into_error(&snapshot.meta.source));
            }
        }

        let gold_value = gold
            .gold_per_gram
            .checked_mul(nisab_gold_grams())
            .ok_or_else(|| EngineError::overflow("gold nisab"))?;
        let silver_value = silver
            .silver_per_gram
            .checked_mul(nisab_silver_grams())
            .ok_or_else(|| EngineError::overflow("silver nisab"))?;

        Ok(NisabThreshold {
            gold_value,
            silver_value,
            currency: gold.meta.currency.clone(),
            timestamp: gold.meta.timestamp.min(silver.meta.timestamp),
            binding_metal: if silver_value <= gold_value {
                BindingMetal::Silver
            } else {
                BindingMetal::Gold
            },
            source: gold.meta.source.clone(),
        })
    }

    /// Single-feed convenience: both metals priced by one snapshot.
    pub fn evaluate_snapshot(
        &self,
        snapshot: &MetalSnapshot,
        now: DateTime<Utc>,
    ) -> Result<NisabThreshold, EngineError> {
        self.evaluate(snapshot, snapshot, now)
    }

    /// Fallback chain for a failed evaluation: last valid threshold first,
    /// the static default last. Returns the chosen threshold and whether the
    /// result is degraded (i.e. not freshly priced).
    pub fn resolve_with_fallback(
        &self,
        fresh: Result<NisabThreshold, EngineError>,
        last_good: Option<&NisabThreshold>,
        now: DateTime<Utc>,
    ) -> (NisabThreshold, bool) {
        match fresh {
            Ok(threshold) => (threshold, false),
            Err(e) => {
                tracing::warn!("nisab evaluation failed ({}), degrading", e);
                match last_good {
                    Some(cached) => (cached.clone(), true),
                    None => (static_fallback_threshold(now), true),
                }
            }
        }
    }
}
