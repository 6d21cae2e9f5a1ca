//! Persisted-state shape and hydration.
//!
//! The storage engine itself is a collaborator; this module only owns the
//! versioned blob layout: per-category records, Hawl flags, the last
//! accepted metal snapshot, the last Nisab threshold, and the base
//! currency. Every field carries a serde default so blobs written by older
//! versions hydrate cleanly with missing fields backfilled.

use crate::assets::{
    CashRecord, CryptoRecord, MetalsRecord, RealEstateRecord, ReceivablesRecord, RetirementRecord,
    StocksRecord,
};
use crate::cache::MetalSnapshot;
use crate::currency::Currency;
use crate::hawl::HawlTracker;
use crate::nisab::NisabThreshold;
use crate::store::{AssetValueStore, HydrationIntent, StoreState};
use crate::types::{AssetCategory, EngineError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current blob layout version.
pub const STATE_VERSION: u32 = 2;

fn latest_version() -> u32 {
    STATE_VERSION
}

fn default_currency() -> Currency {
    Currency::usd()
}

/// Everything the calculator persists between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default = "latest_version")]
    pub version: u32,
    #[serde(default)]
    pub cash: CashRecord,
    #[serde(default)]
    pub metals: MetalsRecord,
    #[serde(default)]
    pub stocks: StocksRecord,
    #[serde(default)]
    pub crypto: CryptoRecord,
    #[serde(default)]
    pub real_estate: RealEstateRecord,
    #[serde(default)]
    pub retirement: RetirementRecord,
    #[serde(default)]
    pub receivables: ReceivablesRecord,
    #[serde(default = "default_currency")]
    pub base_currency: Currency,
    #[serde(default)]
    pub hawl_flags: BTreeMap<AssetCategory, bool>,
    #[serde(default)]
    pub last_metal_snapshot: Option<MetalSnapshot>,
    #[serde(default)]
    pub last_nisab: Option<NisabThreshold>,
    #[serde(default)]
    pub reset_epoch: u64,
}

impl Default for PersistedState {
    fn default() -> Self {
        PersistedState {
            version: STATE_VERSION,
            cash: CashRecord::default(),
            metals: MetalsRecord::default(),
            stocks: StocksRecord::default(),
            crypto: CryptoRecord::default(),
            real_estate: RealEstateRecord::default(),
            retirement: RetirementRecord::default(),
            receivables: ReceivablesRecord::default(),
            base_currency: default_currency(),
            hawl_flags: BTreeMap::new(),
            last_metal_snapshot: None,
            last_nisab: None,
            reset_epoch: 0,
        }
    }
}

impl PersistedState {
    /// Captures the current engine state for persistence.
    pub fn capture(
        store: &AssetValueStore,
        hawl: &HawlTracker,
        last_metal_snapshot: Option<MetalSnapshot>,
        last_nisab: Option<NisabThreshold>,
    ) -> Self {
        PersistedState {
            version: STATE_VERSION,
            cash: store.cash().clone(),
            metals: store.metals().clone(),
            stocks: store.stocks().clone(),
            crypto: store.crypto().clone(),
            real_estate: store.real_estate().clone(),
            retirement: store.retirement().clone(),
            receivables: store.receivables().clone(),
            base_currency: store.base_currency().clone(),
            hawl_flags: hawl.flags().clone(),
            last_metal_snapshot,
            last_nisab,
            reset_epoch: store.reset_epoch(),
        }
    }

    /// Parses a persisted blob, backfilling fields older layouts lack.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let mut state: PersistedState = serde_json::from_str(json).map_err(|e| {
            EngineError::invalid_input("persisted_state", format!("unparseable blob: {}", e))
        })?;
        if state.version < STATE_VERSION {
            tracing::debug!(
                "migrating persisted state v{} -> v{}",
                state.version,
                STATE_VERSION
            );
            state.version = STATE_VERSION;
        }
        Ok(state)
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string(self).map_err(|e| {
            EngineError::invalid_input("persisted_state", format!("serialization failed: {}", e))
        })
    }
}

impl AssetValueStore {
    /// Applies persisted state and marks the store `Ready`.
    ///
    /// The intent is always supplied by the caller: `Restore` loads the
    /// saved values, `StartFresh` keeps only the base currency and starts a
    /// new reset epoch. The engine never infers intent from focus state or
    /// from saved values happening to be zero.
    ///
    /// Returns the Hawl tracker belonging to the restored session.
    pub fn hydrate(&mut self, state: PersistedState, intent: HydrationIntent) -> HawlTracker {
        self.base_currency = state.base_currency;
        match intent {
            HydrationIntent::Restore => {
                self.cash = state.cash;
                self.metals = state.metals;
                self.stocks = state.stocks;
                self.crypto = state.crypto;
                self.real_estate = state.real_estate;
                self.retirement = state.retirement;
                self.receivables = state.receivables;
                self.reset_epoch = state.reset_epoch;
                self.mark_ready();
                HawlTracker::restore(state.hawl_flags)
            }
            HydrationIntent::StartFresh => {
                self.reset_epoch = state.reset_epoch + 1;
                self.mark_ready();
                HawlTracker::new()
            }
        }
    }

    /// Whether the store still awaits hydration.
    pub fn needs_hydration(&self) -> bool {
        self.state == StoreState::Hydrating
    }
}
