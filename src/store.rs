//! The single mutable source of truth for raw asset values.
//!
//! `AssetValueStore` exclusively owns every category record. All other
//! components are pure readers; the currency-conversion coordinator is the
//! one writer allowed to rewrite monetary fields in place (via the
//! crate-private mutators at the bottom of this file).
//!
//! Consumers hold the store by reference and observe it through the typed
//! `subscribe` API and the explicit `Ready` lifecycle state - there is no
//! ambient event bus, and readers that care about initialization order
//! check `is_ready()` instead of racing hydration.

use crate::assets::{
    CashRecord, CategoryRecord, CryptoHolding, CryptoRecord, ForeignCashEntry, MetalsRecord,
    RealEstateRecord, ReceivablesRecord, RetirementRecord, StockHolding, StocksRecord,
};
use crate::currency::Currency;
use crate::inputs::IntoAmount;
use crate::types::{AssetCategory, EngineError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use uuid::Uuid;

/// Every scalar amount field the store holds, across all categories.
///
/// This is the declared schema: resets, persistence, and the conversion
/// coordinator iterate this enum rather than reflecting over records, so a
/// new field only exists once it is wired here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AmountField {
    // Cash
    CashOnHand,
    CashChecking,
    CashSavings,
    CashDigitalWallets,
    // Precious metals (grams, not money)
    GoldRegularGrams,
    GoldOccasionalGrams,
    GoldInvestmentGrams,
    SilverRegularGrams,
    SilverOccasionalGrams,
    SilverInvestmentGrams,
    // Real estate
    PrimaryResidenceValue,
    RentalPropertyValue,
    RentalIncome,
    RentalExpenses,
    ListedForSaleValue,
    // Retirement
    RetirementBalance,
    WithdrawalPenalty,
    WithdrawalTax,
    // Receivables / liabilities
    OwedToUser,
    ShortTermDebt,
    LongTermMonthlyInstallment,
}

impl AmountField {
    pub fn category(self) -> AssetCategory {
        use AmountField::*;
        match self {
            CashOnHand | CashChecking | CashSavings | CashDigitalWallets => AssetCategory::Cash,
            GoldRegularGrams | GoldOccasionalGrams | GoldInvestmentGrams | SilverRegularGrams
            | SilverOccasionalGrams | SilverInvestmentGrams => AssetCategory::PreciousMetals,
            PrimaryResidenceValue | RentalPropertyValue | RentalIncome | RentalExpenses
            | ListedForSaleValue => AssetCategory::RealEstate,
            RetirementBalance | WithdrawalPenalty | WithdrawalTax => AssetCategory::Retirement,
            OwedToUser | ShortTermDebt | LongTermMonthlyInstallment => AssetCategory::Receivables,
        }
    }

    /// Whether the field holds money in the base currency (and therefore
    /// participates in currency conversion). Metal weights are physical
    /// quantities and never convert.
    pub fn is_monetary(self) -> bool {
        self.category() != AssetCategory::PreciousMetals
    }
}

/// Store lifecycle. Consumers must not read values before `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreState {
    /// Persisted state is being loaded; reads would observe defaults.
    Hydrating,
    Ready,
}

/// Caller intent supplied to hydration: restore saved values, or start a
/// fresh session and discard them. Always explicit - the engine never
/// guesses from focus state or from values happening to be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationIntent {
    Restore,
    StartFresh,
}

/// Typed store notifications, delivered synchronously to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Ready,
    ValueChanged { field: AmountField },
    EntryAdded { category: AssetCategory },
    EntryRemoved { category: AssetCategory },
    CategoryReset { category: AssetCategory },
    StoreReset,
    BaseCurrencyChanged { from: Currency, to: Currency },
}

pub type Subscriber = Box<dyn Fn(&StoreEvent) + Send + Sync>;

/// Owner of all raw category records and the current base currency.
pub struct AssetValueStore {
    pub(crate) cash: CashRecord,
    pub(crate) metals: MetalsRecord,
    pub(crate) stocks: StocksRecord,
    pub(crate) crypto: CryptoRecord,
    pub(crate) real_estate: RealEstateRecord,
    pub(crate) retirement: RetirementRecord,
    pub(crate) receivables: ReceivablesRecord,
    pub(crate) base_currency: Currency,
    pub(crate) state: StoreState,
    /// Bumped on every reset. Distinguishes "user reset the calculator"
    /// from "every field genuinely is zero", which are indistinguishable
    /// by value inspection.
    pub(crate) reset_epoch: u64,
    subscribers: Vec<Subscriber>,
}

impl AssetValueStore {
    /// An empty, ready store with the given base currency.
    pub fn new(base_currency: Currency) -> Self {
        AssetValueStore {
            cash: CashRecord::default(),
            metals: MetalsRecord::default(),
            stocks: StocksRecord::default(),
            crypto: CryptoRecord::default(),
            real_estate: RealEstateRecord::default(),
            retirement: RetirementRecord::default(),
            receivables: ReceivablesRecord::default(),
            base_currency,
            state: StoreState::Ready,
            reset_epoch: 0,
            subscribers: Vec::new(),
        }
    }

    /// An empty store awaiting hydration; writes are rejected until
    /// [`crate::persist::PersistedState`] has been applied.
    pub fn pending_hydration(base_currency: Currency) -> Self {
        let mut store = Self::new(base_currency);
        store.state = StoreState::Hydrating;
        store
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == StoreState::Ready
    }

    pub fn base_currency(&self) -> &Currency {
        &self.base_currency
    }

    pub fn reset_epoch(&self) -> u64 {
        self.reset_epoch
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    pub(crate) fn notify(&self, event: StoreEvent) {
        for subscriber in &self.subscribers {
            subscriber(&event);
        }
    }

    fn ensure_ready(&self) -> Result<(), EngineError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(EngineError::invalid_input(
                "store",
                "store is still hydrating; apply persisted state first",
            ))
        }
    }

    /// Sets a scalar amount field. The value must be finite and
    /// non-negative; anything else is rejected without mutating the store.
    pub fn set_value(
        &mut self,
        field: AmountField,
        value: impl IntoAmount,
    ) -> Result<(), EngineError> {
        self.ensure_ready()?;
        let value = value
            .into_amount()
            .map_err(|_| EngineError::invalid_input(field.to_string(), "not a finite number"))?;
        if value < Decimal::ZERO {
            return Err(EngineError::invalid_input(
                field.to_string(),
                "value must be non-negative",
            ));
        }
        *self.amount_mut(field) = value;
        self.notify(StoreEvent::ValueChanged { field });
        Ok(())
    }

    /// Reads a scalar amount field.
    pub fn amount(&self, field: AmountField) -> Decimal {
        use AmountField::*;
        match field {
            CashOnHand => self.cash.on_hand,
            CashChecking => self.cash.checking,
            CashSavings => self.cash.savings,
            CashDigitalWallets => self.cash.digital_wallets,
            GoldRegularGrams => self.metals.gold_regular_grams,
            GoldOccasionalGrams => self.metals.gold_occasional_grams,
            GoldInvestmentGrams => self.metals.gold_investment_grams,
            SilverRegularGrams => self.metals.silver_regular_grams,
            SilverOccasionalGrams => self.metals.silver_occasional_grams,
            SilverInvestmentGrams => self.metals.silver_investment_grams,
            PrimaryResidenceValue => self.real_estate.primary_residence_value,
            RentalPropertyValue => self.real_estate.rental_property_value,
            RentalIncome => self.real_estate.rental_income,
            RentalExpenses => self.real_estate.rental_expenses,
            ListedForSaleValue => self.real_estate.listed_for_sale_value,
            RetirementBalance => self.retirement.balance,
            WithdrawalPenalty => self.retirement.withdrawal_penalty,
            WithdrawalTax => self.retirement.withdrawal_tax,
            OwedToUser => self.receivables.owed_to_user,
            ShortTermDebt => self.receivables.short_term_debt,
            LongTermMonthlyInstallment => self.receivables.long_term_monthly_installment,
        }
    }

    pub(crate) fn amount_mut(&mut self, field: AmountField) -> &mut Decimal {
        use AmountField::*;
        match field {
            CashOnHand => &mut self.cash.on_hand,
            CashChecking => &mut self.cash.checking,
            CashSavings => &mut self.cash.savings,
            CashDigitalWallets => &mut self.cash.digital_wallets,
            GoldRegularGrams => &mut self.metals.gold_regular_grams,
            GoldOccasionalGrams => &mut self.metals.gold_occasional_grams,
            GoldInvestmentGrams => &mut self.metals.gold_investment_grams,
            SilverRegularGrams => &mut self.metals.silver_regular_grams,
            SilverOccasionalGrams => &mut self.metals.silver_occasional_grams,
            SilverInvestmentGrams => &mut self.metals.silver_investment_grams,
            PrimaryResidenceValue => &mut self.real_estate.primary_residence_value,
            RentalPropertyValue => &mut self.real_estate.rental_property_value,
            RentalIncome => &mut self.real_estate.rental_income,
            RentalExpenses => &mut self.real_estate.rental_expenses,
            ListedForSaleValue => &mut self.real_estate.listed_for_sale_value,
            RetirementBalance => &mut self.retirement.balance,
            WithdrawalPenalty => &mut self.retirement.withdrawal_penalty,
            WithdrawalTax => &mut self.retirement.withdrawal_tax,
            OwedToUser => &mut self.receivables.owed_to_user,
            ShortTermDebt => &mut self.receivables.short_term_debt,
            LongTermMonthlyInstallment => &mut self.receivables.long_term_monthly_installment,
        }
    }

    // Typed read access per category.

    pub fn cash(&self) -> &CashRecord {
        &self.cash
    }

    pub fn metals(&self) -> &MetalsRecord {
        &self.metals
    }

    pub fn stocks(&self) -> &StocksRecord {
        &self.stocks
    }

    pub fn crypto(&self) -> &CryptoRecord {
        &self.crypto
    }

    pub fn real_estate(&self) -> &RealEstateRecord {
        &self.real_estate
    }

    pub fn retirement(&self) -> &RetirementRecord {
        &self.retirement
    }

    pub fn receivables(&self) -> &ReceivablesRecord {
        &self.receivables
    }

    /// Uniform category access, cloning the record into a tagged union.
    pub fn category(&self, category: AssetCategory) -> CategoryRecord {
        match category {
            AssetCategory::Cash => CategoryRecord::Cash(self.cash.clone()),
            AssetCategory::PreciousMetals => CategoryRecord::PreciousMetals(self.metals.clone()),
            AssetCategory::Stocks => CategoryRecord::Stocks(self.stocks.clone()),
            AssetCategory::Crypto => CategoryRecord::Crypto(self.crypto.clone()),
            AssetCategory::RealEstate => CategoryRecord::RealEstate(self.real_estate.clone()),
            AssetCategory::Retirement => CategoryRecord::Retirement(self.retirement.clone()),
            AssetCategory::Receivables => CategoryRecord::Receivables(self.receivables.clone()),
        }
    }

    // Structured sub-entry operations. Entries validate on construction, so
    // these only attach them to the store.

    pub fn add_foreign_cash(&mut self, entry: ForeignCashEntry) -> Result<Uuid, EngineError> {
        self.ensure_ready()?;
        let id = entry.id;
        self.cash.foreign_entries.push(entry);
        self.notify(StoreEvent::EntryAdded {
            category: AssetCategory::Cash,
        });
        Ok(id)
    }

    pub fn remove_foreign_cash(&mut self, id: Uuid) -> bool {
        let before = self.cash.foreign_entries.len();
        self.cash.foreign_entries.retain(|e| e.id != id);
        let removed = self.cash.foreign_entries.len() < before;
        if removed {
            self.notify(StoreEvent::EntryRemoved {
                category: AssetCategory::Cash,
            });
        }
        removed
    }

    pub fn add_stock_holding(&mut self, holding: StockHolding) -> Result<Uuid, EngineError> {
        self.ensure_ready()?;
        let id = holding.id;
        self.stocks.holdings.push(holding);
        self.notify(StoreEvent::EntryAdded {
            category: AssetCategory::Stocks,
        });
        Ok(id)
    }

    pub fn remove_stock_holding(&mut self, id: Uuid) -> bool {
        let before = self.stocks.holdings.len();
        self.stocks.holdings.retain(|h| h.id != id);
        let removed = self.stocks.holdings.len() < before;
        if removed {
            self.notify(StoreEvent::EntryRemoved {
                category: AssetCategory::Stocks,
            });
        }
        removed
    }

    pub fn add_crypto_holding(&mut self, holding: CryptoHolding) -> Result<Uuid, EngineError> {
        self.ensure_ready()?;
        let id = holding.id;
        self.crypto.holdings.push(holding);
        self.notify(StoreEvent::EntryAdded {
            category: AssetCategory::Crypto,
        });
        Ok(id)
    }

    pub fn remove_crypto_holding(&mut self, id: Uuid) -> bool {
        let before = self.crypto.holdings.len();
        self.crypto.holdings.retain(|h| h.id != id);
        let removed = self.crypto.holdings.len() < before;
        if removed {
            self.notify(StoreEvent::EntryRemoved {
                category: AssetCategory::Crypto,
            });
        }
        removed
    }

    /// Zeroes every numeric field of a category and empties its sub-entry
    /// lists. The structural shape survives: arrays become empty, flags
    /// return to their defaults, nothing becomes "missing".
    pub fn reset_category(&mut self, category: AssetCategory) {
        match category {
            AssetCategory::Cash => self.cash = CashRecord::default(),
            AssetCategory::PreciousMetals => self.metals = MetalsRecord::default(),
            AssetCategory::Stocks => self.stocks = StocksRecord::default(),
            AssetCategory::Crypto => self.crypto = CryptoRecord::default(),
            AssetCategory::RealEstate => self.real_estate = RealEstateRecord::default(),
            AssetCategory::Retirement => self.retirement = RetirementRecord::default(),
            AssetCategory::Receivables => self.receivables = ReceivablesRecord::default(),
        }
        self.reset_epoch += 1;
        self.notify(StoreEvent::CategoryReset { category });
    }

    /// Resets every category in the declared order.
    pub fn reset_all(&mut self) {
        use strum::IntoEnumIterator;
        for category in AssetCategory::iter() {
            match category {
                AssetCategory::Cash => self.cash = CashRecord::default(),
                AssetCategory::PreciousMetals => self.metals = MetalsRecord::default(),
                AssetCategory::Stocks => self.stocks = StocksRecord::default(),
                AssetCategory::Crypto => self.crypto = CryptoRecord::default(),
                AssetCategory::RealEstate => self.real_estate = RealEstateRecord::default(),
                AssetCategory::Retirement => self.retirement = RetirementRecord::default(),
                AssetCategory::Receivables => self.receivables = ReceivablesRecord::default(),
            }
        }
        self.reset_epoch += 1;
        self.notify(StoreEvent::StoreReset);
    }

    /// Rewrites the base currency marker. Conversion-coordinator use only:
    /// the marker must change *before* any monetary field does, so readers
    /// mid-conversion see the new currency rather than re-triggering one.
    pub(crate) fn set_base_currency(&mut self, to: Currency) {
        let from = std::mem::replace(&mut self.base_currency, to.clone());
        self.notify(StoreEvent::BaseCurrencyChanged { from, to });
    }

    pub(crate) fn mark_ready(&mut self) {
        self.state = StoreState::Ready;
        self.notify(StoreEvent::Ready);
    }
}
