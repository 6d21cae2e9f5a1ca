//! The currency-conversion coordinator.
//!
//! Switching the display currency must rewrite every stored monetary value
//! exactly once, in an order that never lets a reader observe a
//! half-converted store:
//!
//! 1. the base-currency marker changes *first*, so dependent reads see the
//!    new denomination instead of re-triggering a conversion;
//! 2. every scalar monetary field converts through one rate resolved once
//!    for the (from, to) pair - never re-derived per field, which would
//!    compound rounding;
//! 3. structured sub-entries convert from their *own* currency tag, never
//!    blindly from the old base;
//! 4. the Nisab threshold is re-*priced* from fresh spot prices in the new
//!    currency, never re-*converted* - metal spot prices are not a linear
//!    function of a stale exchange rate;
//! 5. a `ConversionRecord` is written so a repeat request for the same pair
//!    is a no-op rather than a double conversion.
//!
//! A failed rate lookup leaves the affected field in the old currency and
//! surfaces as a warning in the outcome; partial success preserves more
//! user data than a rollback would.

use crate::currency::Currency;
use crate::nisab::{NisabEvaluator, NisabThreshold};
use crate::store::{AmountField, AssetValueStore};
use crate::types::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

#[cfg(feature = "async")]
use crate::pricing::{ExchangeRateSource, MetalPriceSource};

/// Proof that a conversion for a pair already ran in this action window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub from: Currency,
    pub to: Currency,
    pub timestamp: DateTime<Utc>,
}

/// What a conversion actually did.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutcome {
    pub from: Currency,
    pub to: Currency,
    /// True when the idempotence guard short-circuited the request.
    pub no_op: bool,
    /// Fields and sub-entries left in their previous currency because no
    /// rate could be resolved for them.
    pub skipped: Vec<String>,
    /// Freshly priced threshold in the target currency, when the metal
    /// feed cooperated.
    pub repriced_nisab: Option<NisabThreshold>,
    /// True when anything was skipped or the Nisab re-pricing failed.
    pub degraded: bool,
}

impl ConversionOutcome {
    fn no_op(from: Currency, to: Currency) -> Self {
        ConversionOutcome {
            from,
            to,
            no_op: true,
            skipped: Vec::new(),
            repriced_nisab: None,
            degraded: false,
        }
    }
}

/// Serializes display-currency switches over the store.
///
/// Holding `&mut AssetValueStore` for the whole operation is what keeps two
/// conversions from interleaving - there is no lock because there is no
/// second logical thread. The `ConversionRecord` guard handles the other
/// hazard: the same user action requesting the same pair twice.
#[derive(Debug, Default)]
pub struct CurrencyCoordinator {
    last: Option<ConversionRecord>,
    evaluator: NisabEvaluator,
}

impl CurrencyCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_record(&self) -> Option<&ConversionRecord> {
        self.last.as_ref()
    }

    /// Re-expresses the whole store in `to`.
    ///
    /// Preconditions: `from != to` and `from` is the store's current base.
    /// A repeat request for the most recently converted pair is a no-op.
    #[cfg(feature = "async")]
    pub async fn convert(
        &mut self,
        store: &mut AssetValueStore,
        from: &Currency,
        to: &Currency,
        rates: &dyn ExchangeRateSource,
        metals: &dyn MetalPriceSource,
    ) -> Result<ConversionOutcome, EngineError> {
        if from == to {
            return Err(EngineError::invalid_input(
                "conversion",
                "source and target currency are identical",
            ));
        }
        if let Some(record) = &self.last {
            if &record.from == from && &record.to == to {
                tracing::debug!("conversion {}->{} already applied, skipping", from, to);
                return Ok(ConversionOutcome::no_op(from.clone(), to.clone()));
            }
        }
        if store.base_currency() != from {
            return Err(EngineError::invalid_input(
                "conversion",
                format!(
                    "store is denominated in {}, not {}",
                    store.base_currency(),
                    from
                ),
            ));
        }

        // Step 1: commit the new denomination before touching any value.
        store.set_base_currency(to.clone());

        let mut skipped: Vec<String> = Vec::new();

        // Step 2: one rate for the pair, applied to every scalar field.
        match rates.rate(from, to).await {
            Ok(pair_rate) => {
                for field in AmountField::iter().filter(|f| f.is_monetary()) {
                    let current = store.amount(field);
                    match current.checked_mul(pair_rate) {
                        Some(converted) => *store.amount_mut(field) = converted,
                        None => {
                            tracing::warn!("overflow converting {}, field left as-is", field);
                            skipped.push(field.to_string());
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "rate {}->{} unavailable ({}), scalar fields left unconverted",
                    from,
                    to,
                    e
                );
                skipped.extend(
                    AmountField::iter()
                        .filter(|f| f.is_monetary())
                        .map(|f| f.to_string()),
                );
            }
        }

        // Step 3: sub-entries convert from their own tag. An entry quoted in
        // a third currency uses its own rate to the target, never the pair
        // rate of the base switch.
        let tags: Vec<Currency> = store
            .stocks
            .holdings
            .iter()
            .map(|h| h.currency.clone())
            .chain(store.crypto.holdings.iter().map(|h| h.currency.clone()))
            .chain(store.cash.foreign_entries.iter().map(|e| e.currency.clone()))
            .filter(|c| c != to)
            .collect();
        let entry_rates = match rates.table_for(to, &tags).await {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!("rate table for {} unavailable: {}", to, e);
                crate::currency::RateTable::default()
            }
        };

        for holding in &mut store.stocks.holdings {
            if &holding.currency == to {
                continue;
            }
            match entry_rates.convert(holding.unit_price, &holding.currency, to) {
                Ok(price) => {
                    holding.unit_price = price;
                    holding.currency = to.clone();
                }
                Err(_) => skipped.push(format!("stock:{}", holding.symbol)),
            }
        }
        for holding in &mut store.crypto.holdings {
            if &holding.currency == to {
                continue;
            }
            match entry_rates.convert(holding.unit_price, &holding.currency, to) {
                Ok(price) => {
                    holding.unit_price = price;
                    holding.currency = to.clone();
                }
                Err(_) => skipped.push(format!("crypto:{}", holding.symbol)),
            }
        }
        for entry in &mut store.cash.foreign_entries {
            if &entry.currency == to {
                continue;
            }
            match entry_rates.convert(entry.amount, &entry.currency, to) {
                Ok(amount) => {
                    entry.amount = amount;
                    entry.currency = to.clone();
                }
                Err(_) => skipped.push(format!("foreign_cash:{}", entry.currency)),
            }
        }

        // Step 4: the Nisab is re-priced from fresh spot data, not converted.
        let now = Utc::now();
        let repriced_nisab = match metals.metal_prices(to).await {
            Ok(snapshot) => match self.evaluator.evaluate_snapshot(&snapshot, now) {
                Ok(threshold) => Some(threshold),
                Err(e) => {
                    tracing::warn!("re-priced nisab rejected: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("metal feed unavailable for {}: {}", to, e);
                None
            }
        };

        // Step 5: record the action so a repeat is a no-op.
        self.last = Some(ConversionRecord {
            from: from.clone(),
            to: to.clone(),
            timestamp: now,
        });

        if !skipped.is_empty() {
            tracing::warn!(
                "conversion {}->{} left {} field(s) unconverted",
                from,
                to,
                skipped.len()
            );
        }

        let degraded = !skipped.is_empty() || repriced_nisab.is_none();
        Ok(ConversionOutcome {
            from: from.clone(),
            to: to.clone(),
            no_op: false,
            skipped,
            repriced_nisab,
            degraded,
        })
    }
}
