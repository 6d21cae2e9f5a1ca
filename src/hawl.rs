//! Hawl (lunar-year holding requirement) tracking.
//!
//! Wealth must be held for one full lunar year (~354 days) before Zakat
//! becomes obligatory on it. The engine models this as a per-category
//! boolean gate, settable by the user and defaulting to satisfied, with an
//! optional acquisition-date helper for callers that track dates.

use crate::types::AssetCategory;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Length of the lunar (Hijri) year in days.
pub const LUNAR_YEAR_DAYS: i64 = 354;

/// Per-category Hawl flags. Categories without an explicit entry default to
/// satisfied, matching the common case of wealth held year over year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HawlTracker {
    flags: BTreeMap<AssetCategory, bool>,
}

impl HawlTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the holding-period requirement is met for a category.
    pub fn is_satisfied(&self, category: AssetCategory) -> bool {
        self.flags.get(&category).copied().unwrap_or(true)
    }

    pub fn set(&mut self, category: AssetCategory, satisfied: bool) {
        self.flags.insert(category, satisfied);
    }

    /// Derives the flag from an acquisition date: satisfied once a full
    /// lunar year has elapsed by `as_of`.
    pub fn set_from_acquisition(
        &mut self,
        category: AssetCategory,
        acquired: NaiveDate,
        as_of: NaiveDate,
    ) {
        let satisfied = (as_of - acquired).num_days() >= LUNAR_YEAR_DAYS;
        self.set(category, satisfied);
    }

    /// Snapshot of explicitly-set flags, for persistence.
    pub fn flags(&self) -> &BTreeMap<AssetCategory, bool> {
        &self.flags
    }

    pub fn restore(flags: BTreeMap<AssetCategory, bool>) -> Self {
        HawlTracker { flags }
    }
}
