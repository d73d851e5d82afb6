//! Monetary amounts converted from provider minor units.
//!
//! The payment provider reports totals in minor currency units (cents).
//! Payment records store major units with two decimal places, so a
//! checkout totalling `19900` cents in `"eur"` is persisted as
//! `199.00 EUR`.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing [`Money`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum MoneyError {
    /// The minor-unit amount is negative.
    #[error("monetary amount cannot be negative (got {minor} minor units)")]
    NegativeAmount {
        /// The offending minor-unit value.
        minor: i64,
    },
    /// The currency code is not a three-letter ISO 4217 code.
    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),
}

/// A non-negative monetary amount in major units with its currency code.
///
/// ## Examples
///
/// ```
/// use salonkit_core::Money;
///
/// let money = Money::from_minor_units(19900, "eur").unwrap();
/// assert_eq!(money.amount().to_string(), "199.00");
/// assert_eq!(money.currency(), "EUR");
///
/// assert!(Money::from_minor_units(-1, "eur").is_err());
/// assert!(Money::from_minor_units(500, "euros").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., euros, not cents).
    amount: Decimal,
    /// ISO 4217 currency code, upper-cased.
    currency: String,
}

impl Money {
    /// Convert a provider minor-unit amount (cents) into major units.
    ///
    /// The currency code is upper-cased; providers deliver it lowercase.
    ///
    /// # Errors
    ///
    /// Returns an error if `minor` is negative or `currency` is not a
    /// three-letter alphabetic code.
    pub fn from_minor_units(minor: i64, currency: &str) -> Result<Self, MoneyError> {
        if minor < 0 {
            return Err(MoneyError::NegativeAmount { minor });
        }

        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(MoneyError::InvalidCurrency(currency.to_owned()));
        }

        Ok(Self {
            amount: Decimal::new(minor, 2),
            currency: currency.to_ascii_uppercase(),
        })
    }

    /// The amount in major units, scale 2.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// The upper-cased ISO 4217 currency code.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor_units() {
        let money = Money::from_minor_units(19900, "eur").unwrap();
        assert_eq!(money.amount(), Decimal::new(19900, 2));
        assert_eq!(money.amount().to_string(), "199.00");
        assert_eq!(money.currency(), "EUR");
    }

    #[test]
    fn test_zero_is_allowed() {
        let money = Money::from_minor_units(0, "usd").unwrap();
        assert_eq!(money.amount().to_string(), "0.00");
    }

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            Money::from_minor_units(-500, "eur"),
            Err(MoneyError::NegativeAmount { minor: -500 })
        ));
    }

    #[test]
    fn test_currency_uppercased() {
        let money = Money::from_minor_units(100, "gbp").unwrap();
        assert_eq!(money.currency(), "GBP");
    }

    #[test]
    fn test_invalid_currency_rejected() {
        assert!(matches!(
            Money::from_minor_units(100, "euros"),
            Err(MoneyError::InvalidCurrency(_))
        ));
        assert!(matches!(
            Money::from_minor_units(100, "e1r"),
            Err(MoneyError::InvalidCurrency(_))
        ));
        assert!(matches!(
            Money::from_minor_units(100, ""),
            Err(MoneyError::InvalidCurrency(_))
        ));
    }

    #[test]
    fn test_display() {
        let money = Money::from_minor_units(19900, "eur").unwrap();
        assert_eq!(money.to_string(), "199.00 EUR");
    }

    #[test]
    fn test_serde_amount_as_string() {
        let money = Money::from_minor_units(19900, "eur").unwrap();
        let json = serde_json::to_value(&money).unwrap();
        assert_eq!(json["amount"], "199.00");
        assert_eq!(json["currency"], "EUR");
    }
}
