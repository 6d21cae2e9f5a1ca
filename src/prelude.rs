//! Prelude module for the Zakat engine.
//!
//! Re-exports the types most callers need so the common path is a single
//! import.
//!
//! # Usage
//!
//! ```rust
//! use zakat_engine::prelude::*;
//! ```

// Core exports
pub use crate::breakdown::{assess, SpotPrices, ZakatAssessment};
pub use crate::currency::{Currency, RateQuote, RateTable};
pub use crate::hawl::HawlTracker;
pub use crate::store::{AmountField, AssetValueStore, HydrationIntent, StoreEvent};
pub use crate::types::{AssetCategory, Breakdown, BreakdownItem, EngineError};

// Pricing, validation, and conversion
pub use crate::cache::{
    validate_metal, validate_quote, MetalSnapshot, QuoteSnapshot, SnapshotMeta, SnapshotVerdict,
    ValidationOptions,
};
pub use crate::convert::{ConversionOutcome, CurrencyCoordinator};
pub use crate::nisab::{BindingMetal, NisabEvaluator, NisabThreshold};
pub use crate::persist::PersistedState;

// Asset records and sub-entries
pub use crate::assets::{
    CryptoHolding, ForeignCashEntry, HoldingStyle, PassiveValuation, StockHolding,
};
pub use crate::inputs::IntoAmount;

#[cfg(feature = "async")]
pub use crate::pricing::{
    CachedMetalSource, ExchangeRateSource, MetalPriceSource, QuoteSource, StaticMetalSource,
    StaticRateSource,
};
