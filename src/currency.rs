//! Currency codes and point-in-time exchange-rate resolution.
//!
//! The engine stores every monetary field in a single base currency. When the
//! user switches that base, the conversion coordinator resolves one rate per
//! currency pair from a [`RateTable`] built out of the quotes the
//! exchange-rate collaborator returned. Direct, inverse, and one-hop
//! transitive rates are all derivable from the quoted pairs.

use crate::types::EngineError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// An ISO 4217 currency code (three uppercase ASCII letters).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, EngineError> {
        let upper = code.trim().to_ascii_uppercase();
        if upper.len() != 3 || !upper.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(EngineError::invalid_input(
                "currency",
                format!("'{}' is not an ISO 4217 code", code),
            ));
        }
        Ok(Currency(upper))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn usd() -> Self {
        Currency("USD".to_string())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Currency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::new(s)
    }
}

/// A single quoted exchange rate: 1 unit of `from` buys `rate` units of `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateQuote {
    pub from: Currency,
    pub to: Currency,
    pub rate: Decimal,
}

impl RateQuote {
    pub fn new(from: Currency, to: Currency, rate: Decimal) -> Self {
        RateQuote { from, to, rate }
    }
}

/// Point-in-time exchange-rate table.
///
/// Built once per conversion action from the collaborator's quotes, so every
/// field converted in that action uses the same rate. Inverse and one-hop
/// transitive rates are derived at build time; identity rates are implicit.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl RateTable {
    pub fn new(quotes: Vec<RateQuote>) -> Self {
        let mut rates: HashMap<(Currency, Currency), Decimal> = HashMap::new();
        let mut currencies: HashSet<Currency> = HashSet::new();

        for quote in quotes {
            if quote.from == quote.to {
                continue;
            }
            if quote.rate <= Decimal::ZERO {
                tracing::warn!(
                    "discarding non-positive rate {} for {}/{}",
                    quote.rate,
                    quote.from,
                    quote.to
                );
                continue;
            }
            currencies.insert(quote.from.clone());
            currencies.insert(quote.to.clone());
            rates.insert((quote.from.clone(), quote.to.clone()), quote.rate);
            rates
                .entry((quote.to, quote.from))
                .or_insert(Decimal::ONE / quote.rate);
        }

        // Fill missing pairs through a single intermediate currency.
        let all: Vec<Currency> = currencies.into_iter().collect();
        for from in &all {
            for to in &all {
                if from == to || rates.contains_key(&(from.clone(), to.clone())) {
                    continue;
                }
                for via in &all {
                    if via == from || via == to {
                        continue;
                    }
                    if let (Some(leg_a), Some(leg_b)) = (
                        rates.get(&(from.clone(), via.clone())),
                        rates.get(&(via.clone(), to.clone())),
                    ) {
                        let bridged = leg_a * leg_b;
                        rates.insert((from.clone(), to.clone()), bridged);
                        if !bridged.is_zero() {
                            rates
                                .entry((to.clone(), from.clone()))
                                .or_insert(Decimal::ONE / bridged);
                        }
                        break;
                    }
                }
            }
        }

        RateTable { rates }
    }

    /// Resolves the rate for a pair. Identity pairs always resolve to 1.
    pub fn rate(&self, from: &Currency, to: &Currency) -> Result<Decimal, EngineError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        self.rates
            .get(&(from.clone(), to.clone()))
            .copied()
            .ok_or_else(|| EngineError::ConversionRateUnavailable {
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    /// Converts an amount between currencies using the table's single rate
    /// for the pair.
    pub fn convert(
        &self,
        amount: Decimal,
        from: &Currency,
        to: &Currency,
    ) -> Result<Decimal, EngineError> {
        if from == to {
            return Ok(amount);
        }
        let rate = self.rate(from, to)?;
        amount
            .checked_mul(rate)
            .ok_or_else(|| EngineError::overflow(format!("convert {}->{}", from, to)))
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd() -> Currency {
        Currency::usd()
    }

    fn eur() -> Currency {
        Currency::new("EUR").unwrap()
    }

    fn gbp() -> Currency {
        Currency::new("GBP").unwrap()
    }

    #[test]
    fn test_currency_code_validation() {
        assert!(Currency::new("usd").is_ok()); // normalized to uppercase
        assert!(Currency::new("EURO").is_err());
        assert!(Currency::new("E1R").is_err());
        assert_eq!(Currency::new(" eur ").unwrap().as_str(), "EUR");
    }

    #[test]
    fn test_direct_and_inverse_rates() {
        let table = RateTable::new(vec![RateQuote::new(usd(), eur(), dec!(0.85))]);
        assert_eq!(table.rate(&usd(), &eur()).unwrap(), dec!(0.85));
        // Inverse derived from the quoted pair.
        assert_eq!(
            table.convert(dec!(0.85), &eur(), &usd()).unwrap(),
            dec!(1.00)
        );
    }

    #[test]
    fn test_transitive_rate_via_intermediate() {
        let table = RateTable::new(vec![
            RateQuote::new(usd(), eur(), dec!(0.85)),
            RateQuote::new(eur(), gbp(), dec!(0.90)),
        ]);
        // USD -> GBP = 0.85 * 0.90
        assert_eq!(
            table.convert(dec!(100), &usd(), &gbp()).unwrap(),
            dec!(100) * dec!(0.85) * dec!(0.90)
        );
    }

    #[test]
    fn test_identity_rate() {
        let table = RateTable::new(vec![]);
        assert_eq!(table.rate(&usd(), &usd()).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_missing_pair_is_explicit_error() {
        let table = RateTable::new(vec![]);
        let err = table.rate(&usd(), &eur()).unwrap_err();
        assert!(matches!(err, EngineError::ConversionRateUnavailable { .. }));
    }

    #[test]
    fn test_zero_rate_discarded() {
        let table = RateTable::new(vec![RateQuote::new(usd(), eur(), dec!(0))]);
        assert!(table.rate(&usd(), &eur()).is_err());
    }
}
