//! Valuation and eligibility engine for Zakat calculators.
//!
//! The engine turns raw asset holdings (cash, precious metals, equities,
//! crypto, real estate, retirement accounts, receivables) into a
//! per-category zakatable/exempt breakdown, prices the Nisab eligibility
//! floor from live gold/silver data, and keeps every stored monetary value
//! consistent when the display currency changes. Externally sourced prices
//! pass a freshness/plausibility validator before the engine will read
//! them; everything degrades to last-known-good data rather than failing
//! the caller.
//!
//! UI layers, routing, report generation, and the raw network clients for
//! the price feeds live outside this crate; the engine consumes their
//! `value + timestamp + source-currency` contract through the traits in
//! [`pricing`].

pub mod assets;
pub mod breakdown;
pub mod cache;
pub mod convert;
pub mod currency;
pub mod hawl;
pub mod inputs;
pub mod nisab;
pub mod persist;
pub mod prelude;
pub mod pricing;
pub mod store;
pub mod types;

pub use breakdown::{assess, SpotPrices, ZakatAssessment};
pub use cache::{MetalSnapshot, QuoteSnapshot, SnapshotVerdict, ValidationOptions};
pub use convert::{ConversionOutcome, ConversionRecord, CurrencyCoordinator};
pub use currency::{Currency, RateQuote, RateTable};
pub use hawl::HawlTracker;
pub use nisab::{BindingMetal, NisabEvaluator, NisabThreshold};
pub use persist::PersistedState;
pub use store::{AmountField, AssetValueStore, HydrationIntent, StoreEvent, StoreState};
pub use types::{AssetCategory, Breakdown, BreakdownItem, EngineError};
