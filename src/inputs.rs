use crate::types::EngineError;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Conversion trait for monetary and weight inputs.
///
/// Lets callers pass `i32`, `f64`, `&str`, or `Decimal` directly into store
/// setters without wrapping in `dec!()`. Non-finite floats (NaN, infinity)
/// are rejected here, before any value reaches the store.
pub trait IntoAmount {
    fn into_amount(self) -> Result<Decimal, EngineError>;
}

impl IntoAmount for Decimal {
    fn into_amount(self) -> Result<Decimal, EngineError> {
        Ok(self)
    }
}

macro_rules! impl_into_amount_int {
    ($($t:ty),*) => {
        $(
            impl IntoAmount for $t {
                fn into_amount(self) -> Result<Decimal, EngineError> {
                    Ok(Decimal::from(self))
                }
            }
        )*
    };
}

impl_into_amount_int!(i32, u32, i64, u64, isize, usize);

macro_rules! impl_into_amount_float {
    ($($t:ty),*) => {
        $(
            impl IntoAmount for $t {
                fn into_amount(self) -> Result<Decimal, EngineError> {
                    Decimal::from_f64_retain(self as f64).ok_or_else(|| {
                        EngineError::invalid_input("amount", format!("invalid float value: {}", self))
                    })
                }
            }
        )*
    };
}

impl_into_amount_float!(f32, f64);

impl IntoAmount for &str {
    fn into_amount(self) -> Result<Decimal, EngineError> {
        Decimal::from_str(self)
            .map_err(|e| EngineError::invalid_input("amount", format!("invalid number format: {}", e)))
    }
}

impl IntoAmount for String {
    fn into_amount(self) -> Result<Decimal, EngineError> {
        self.as_str().into_amount()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_accepts_common_numeric_types() {
        assert_eq!(600.into_amount().unwrap(), dec!(600));
        assert_eq!(93.98f64.into_amount().unwrap(), dec!(93.98));
        assert_eq!("1.02".into_amount().unwrap(), dec!(1.02));
    }

    #[test]
    fn test_rejects_non_finite_floats() {
        assert!(f64::NAN.into_amount().is_err());
        assert!(f64::INFINITY.into_amount().is_err());
    }

    #[test]
    fn test_rejects_garbage_strings() {
        assert!("12abc".into_amount().is_err());
    }
}
