//! Typed per-category asset records.
//!
//! Every category the engine tracks owns one record type with an exhaustive
//! field list - no untyped maps, so resets, persistence, and currency
//! conversion iterate a declared schema rather than whatever keys happen to
//! be present. Scalar amounts live in the store's base currency; structured
//! sub-entries (holdings, foreign cash) carry their own currency tag.

use crate::currency::Currency;
use crate::inputs::IntoAmount;
use crate::types::EngineError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cash amount denominated in a currency other than the base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignCashEntry {
    pub id: Uuid,
    pub amount: Decimal,
    pub currency: Currency,
}

impl ForeignCashEntry {
    pub fn new(amount: impl IntoAmount, currency: Currency) -> Result<Self, EngineError> {
        let amount = amount.into_amount()?;
        if amount < Decimal::ZERO {
            return Err(EngineError::invalid_input(
                "foreign_cash.amount",
                "amount must be non-negative",
            ));
        }
        Ok(ForeignCashEntry {
            id: Uuid::new_v4(),
            amount,
            currency,
        })
    }
}

/// Liquid money: domestic balances plus foreign-currency holdings.
/// All of it is zakatable; there is no exempt tier for cash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CashRecord {
    pub on_hand: Decimal,
    pub checking: Decimal,
    pub savings: Decimal,
    pub digital_wallets: Decimal,
    #[serde(default)]
    pub foreign_entries: Vec<ForeignCashEntry>,
}

/// Gold and silver weights in grams, split by wear-state.
///
/// "Regular" (daily-worn jewelry) is exempt; "occasional" and "investment"
/// are zakatable. Weights are physical quantities, not monetary values, so
/// currency conversion never touches them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetalsRecord {
    pub gold_regular_grams: Decimal,
    pub gold_occasional_grams: Decimal,
    pub gold_investment_grams: Decimal,
    pub silver_regular_grams: Decimal,
    pub silver_occasional_grams: Decimal,
    pub silver_investment_grams: Decimal,
}

/// How a passive (non-trading) equity holding is valued for Zakat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum PassiveValuation {
    /// Flat 30% of market value, the common quick approximation of a
    /// company's zakatable current assets.
    QuickRatio,
    /// Zakatable current assets (cash + receivables + inventory) prorated
    /// by ownership share.
    CompanyFinancials {
        cash: Decimal,
        receivables: Decimal,
        inventory: Decimal,
        shares_outstanding: Decimal,
    },
}

/// Whether an equity position is actively traded or held passively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "kebab-case")]
pub enum HoldingStyle {
    /// Bought for resale: trade goods, 100% zakatable at market value.
    ActiveTrading,
    /// Held for dividends/growth; valued per the chosen method.
    Passive(PassiveValuation),
}

/// One equity position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockHolding {
    pub id: Uuid,
    pub symbol: String,
    pub quantity: Decimal,
    /// Last known price per share, in `currency`.
    pub unit_price: Decimal,
    pub currency: Currency,
    pub style: HoldingStyle,
}

impl StockHolding {
    pub fn new(
        symbol: impl Into<String>,
        quantity: impl IntoAmount,
        unit_price: impl IntoAmount,
        currency: Currency,
    ) -> Result<Self, EngineError> {
        let quantity = quantity.into_amount()?;
        let unit_price = unit_price.into_amount()?;
        if quantity < Decimal::ZERO {
            return Err(EngineError::invalid_input(
                "stock.quantity",
                "quantity must be non-negative",
            ));
        }
        if unit_price < Decimal::ZERO {
            return Err(EngineError::invalid_input(
                "stock.unit_price",
                "price must be non-negative",
            ));
        }
        Ok(StockHolding {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            quantity,
            unit_price,
            currency,
            style: HoldingStyle::ActiveTrading,
        })
    }

    pub fn with_style(mut self, style: HoldingStyle) -> Self {
        self.style = style;
        self
    }

    pub fn market_value(&self) -> Result<Decimal, EngineError> {
        self.quantity
            .checked_mul(self.unit_price)
            .ok_or_else(|| EngineError::overflow(format!("market value of {}", self.symbol)))
    }
}

/// Equity positions. Zakatability is decided per holding by its style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StocksRecord {
    #[serde(default)]
    pub holdings: Vec<StockHolding>,
}

/// One cryptocurrency position. 100% zakatable at market value; there is no
/// exemption tier for crypto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoHolding {
    pub id: Uuid,
    pub symbol: String,
    pub quantity: Decimal,
    /// Last known price per coin, in `currency`.
    pub unit_price: Decimal,
    pub currency: Currency,
}

impl CryptoHolding {
    pub fn new(
        symbol: impl Into<String>,
        quantity: impl IntoAmount,
        unit_price: impl IntoAmount,
        currency: Currency,
    ) -> Result<Self, EngineError> {
        let quantity = quantity.into_amount()?;
        let unit_price = unit_price.into_amount()?;
        if quantity < Decimal::ZERO {
            return Err(EngineError::invalid_input(
                "crypto.quantity",
                "quantity must be non-negative",
            ));
        }
        if unit_price < Decimal::ZERO {
            return Err(EngineError::invalid_input(
                "crypto.unit_price",
                "price must be non-negative",
            ));
        }
        Ok(CryptoHolding {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            quantity,
            unit_price,
            currency,
        })
    }

    pub fn market_value(&self) -> Result<Decimal, EngineError> {
        self.quantity
            .checked_mul(self.unit_price)
            .ok_or_else(|| EngineError::overflow(format!("market value of {}", self.symbol)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoRecord {
    #[serde(default)]
    pub holdings: Vec<CryptoHolding>,
}

/// Real property. The primary residence is fully exempt; a rented property
/// is exempt on the asset but its net rental income is zakatable; property
/// listed for sale (or bought for resale) is zakatable at market value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealEstateRecord {
    pub primary_residence_value: Decimal,
    pub rental_property_value: Decimal,
    pub rental_income: Decimal,
    pub rental_expenses: Decimal,
    pub listed_for_sale_value: Decimal,
}

/// Retirement accounts. Only the portion the holder could actually access
/// today counts; an inaccessible balance is reduced by the early-withdrawal
/// penalty and tax, and may be deferred entirely until access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetirementRecord {
    pub balance: Decimal,
    pub withdrawal_penalty: Decimal,
    pub withdrawal_tax: Decimal,
    pub fully_accessible: bool,
    pub defer_inaccessible: bool,
}

impl Default for RetirementRecord {
    fn default() -> Self {
        RetirementRecord {
            balance: Decimal::ZERO,
            withdrawal_penalty: Decimal::ZERO,
            withdrawal_tax: Decimal::ZERO,
            fully_accessible: true,
            defer_inaccessible: false,
        }
    }
}

/// Money owed to and by the user.
///
/// Good debt (expected to be collected) is zakatable as if in hand. Debts
/// the user owes reduce the combined zakatable total: short-term debt in
/// full, long-term debt up to twelve monthly installments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceivablesRecord {
    pub owed_to_user: Decimal,
    pub short_term_debt: Decimal,
    pub long_term_monthly_installment: Decimal,
}

impl ReceivablesRecord {
    /// Total deductible liabilities for the next twelve lunar months.
    pub fn deductible_liabilities(&self) -> Decimal {
        self.short_term_debt + self.long_term_monthly_installment * Decimal::from(12)
    }
}

/// A cloned view of one category's record, for uniform category access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "kebab-case")]
pub enum CategoryRecord {
    Cash(CashRecord),
    PreciousMetals(MetalsRecord),
    Stocks(StocksRecord),
    Crypto(CryptoRecord),
    RealEstate(RealEstateRecord),
    Retirement(RetirementRecord),
    Receivables(ReceivablesRecord),
}
