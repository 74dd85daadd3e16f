//! Type-safe monetary amounts using decimal arithmetic.
//!
//! Amounts are kept in the currency's standard unit (rupees, not paise) as
//! [`Decimal`]s and rounded to the currency's minor-unit precision wherever a
//! value is derived (fees, percentage discounts).

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Largest amount a stored money column holds: `NUMERIC(12, 2)`.
pub const MAX_STORED_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// A monetary amount with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// An amount in Indian rupees.
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// Whether the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Round a derived amount in this currency to minor-unit precision.
    #[must_use]
    pub fn round(&self, value: Decimal) -> Decimal {
        self.currency_code.round(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = usize::try_from(self.currency_code.minor_units()).unwrap_or(2);
        write!(
            f,
            "{}{:.*}",
            self.currency_code.symbol(),
            digits,
            self.amount
        )
    }
}

/// ISO 4217 currency codes accepted by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
}

impl CurrencyCode {
    /// Number of decimal digits in the minor unit (paise, cents).
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::INR | Self::USD => 2,
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
        }
    }

    /// Round half away from zero to the minor unit.
    #[must_use]
    pub fn round(self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.minor_units(), RoundingStrategy::MidpointAwayFromZero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_stored_amount_fills_numeric_12_2() {
        assert_eq!(MAX_STORED_AMOUNT.to_string(), "9999999999.99");
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(
            CurrencyCode::INR.round(Decimal::new(12_345, 3)),
            Decimal::new(1235, 2)
        );
        assert_eq!(
            CurrencyCode::INR.round(Decimal::new(12_344, 3)),
            Decimal::new(1234, 2)
        );
    }

    #[test]
    fn test_display_pads_minor_units() {
        assert_eq!(Price::inr(Decimal::new(1000, 0)).to_string(), "₹1000.00");
        assert_eq!(
            Price::new(Decimal::new(95, 1), CurrencyCode::USD).to_string(),
            "$9.50"
        );
    }

    #[test]
    fn test_is_positive() {
        assert!(Price::inr(Decimal::ONE).is_positive());
        assert!(!Price::inr(Decimal::ZERO).is_positive());
        assert!(!Price::inr(Decimal::NEGATIVE_ONE).is_positive());
    }
}
