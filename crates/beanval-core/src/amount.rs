//! Amount type representing a decimal number with a currency.
//!
//! An [`Amount`] is the fundamental unit of value in a ledger, combining a
//! decimal number with a currency code. This module also carries the
//! directional rounding used when native amounts are re-denominated into a
//! synthetic unit.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};

/// An amount is a quantity paired with a currency.
///
/// # Examples
///
/// ```
/// use beanval_core::Amount;
/// use rust_decimal_macros::dec;
///
/// let amount = Amount::new(dec!(100.00), "USD");
/// let other = Amount::new(dec!(50.00), "USD");
/// let sum = &amount + &other;
/// assert_eq!(sum.number, dec!(150.00));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    /// The decimal quantity
    pub number: Decimal,
    /// The currency code (e.g., "USD", "EUR", "BROKERU")
    pub currency: String,
}

impl Amount {
    /// Create a new amount.
    #[must_use]
    pub fn new(number: Decimal, currency: impl Into<String>) -> Self {
        Self {
            number,
            currency: currency.into(),
        }
    }

    /// Create a zero amount with the given currency.
    #[must_use]
    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Check if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.number.is_zero()
    }

    /// Check if the amount is strictly positive.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.number.is_sign_positive() && !self.number.is_zero()
    }

    /// Check if the amount is negative.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.number.is_sign_negative() && !self.number.is_zero()
    }

    /// Calculate the inferred tolerance for this amount.
    ///
    /// Tolerance is `0.5 * 10^(-scale)`, so `100` gives `0.5` and
    /// `100.00` gives `0.005`.
    #[must_use]
    pub fn inferred_tolerance(&self) -> Decimal {
        Decimal::new(5, self.number.scale() + 1)
    }

    /// Check if this amount is near another amount within tolerance.
    ///
    /// Returns `false` if currencies don't match.
    #[must_use]
    pub fn is_near(&self, other: &Self, tolerance: Decimal) -> bool {
        self.currency == other.currency && (self.number - other.number).abs() <= tolerance
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}

impl Add for &Amount {
    type Output = Amount;

    fn add(self, other: &Amount) -> Amount {
        debug_assert_eq!(
            self.currency, other.currency,
            "Cannot add amounts with different currencies"
        );
        Amount::new(self.number + other.number, self.currency.clone())
    }
}

impl Sub for &Amount {
    type Output = Amount;

    fn sub(self, other: &Amount) -> Amount {
        debug_assert_eq!(
            self.currency, other.currency,
            "Cannot subtract amounts with different currencies"
        );
        Amount::new(self.number - other.number, self.currency.clone())
    }
}

impl Neg for &Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount::new(-self.number, self.currency.clone())
    }
}

impl Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self {
        -&self
    }
}

impl AddAssign<&Self> for Amount {
    fn add_assign(&mut self, other: &Self) {
        debug_assert_eq!(
            self.currency, other.currency,
            "Cannot add amounts with different currencies"
        );
        self.number += other.number;
    }
}

/// An incomplete amount specification used in postings before interpolation.
///
/// - `100.00 USD` - Complete amount
/// - `USD` - Currency only, number to be interpolated
/// - `100.00` - Number only, currency to be inferred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncompleteAmount {
    /// Complete amount with both number and currency
    Complete(Amount),
    /// Only number specified, currency to be inferred from cost or price
    NumberOnly(Decimal),
    /// Only currency specified, number to be interpolated to balance the transaction
    CurrencyOnly(String),
}

impl IncompleteAmount {
    /// Create a complete amount.
    #[must_use]
    pub fn complete(number: Decimal, currency: impl Into<String>) -> Self {
        Self::Complete(Amount::new(number, currency))
    }

    /// Create a currency-only incomplete amount.
    #[must_use]
    pub fn currency_only(currency: impl Into<String>) -> Self {
        Self::CurrencyOnly(currency.into())
    }

    /// Get the currency if present.
    #[must_use]
    pub fn currency(&self) -> Option<&str> {
        match self {
            Self::Complete(a) => Some(&a.currency),
            Self::NumberOnly(_) => None,
            Self::CurrencyOnly(c) => Some(c),
        }
    }

    /// Get as a complete Amount if possible.
    #[must_use]
    pub const fn as_amount(&self) -> Option<&Amount> {
        match self {
            Self::Complete(a) => Some(a),
            _ => None,
        }
    }
}

impl From<Amount> for IncompleteAmount {
    fn from(amount: Amount) -> Self {
        Self::Complete(amount)
    }
}

impl fmt::Display for IncompleteAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(a) => write!(f, "{a}"),
            Self::NumberOnly(n) => write!(f, "{n}"),
            Self::CurrencyOnly(c) => write!(f, "{c}"),
        }
    }
}

/// Direction in which a converted quantity is rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundingDirection {
    /// Away from zero. Used for inflows (buys).
    Up,
    /// Toward zero. Used for outflows (sells).
    Down,
}

impl RoundingDirection {
    /// Pick the rounding direction for a native flow.
    ///
    /// Inflows round up and outflows round down, so the magnitude of units
    /// bought is never understated and the magnitude of units sold is never
    /// overstated.
    #[must_use]
    pub const fn for_flow(number: Decimal) -> Self {
        if number.is_sign_negative() && !number.is_zero() {
            Self::Down
        } else {
            Self::Up
        }
    }

    const fn strategy(self) -> RoundingStrategy {
        match self {
            Self::Up => RoundingStrategy::AwayFromZero,
            Self::Down => RoundingStrategy::ToZero,
        }
    }
}

/// Round `number` to exactly `scale` fractional digits in the given direction.
///
/// The result always carries `scale` digits, so `250` at scale 7 becomes
/// `250.0000000`.
///
/// ```
/// use beanval_core::{round_units, RoundingDirection};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(round_units(dec!(-1.23456789), 7, RoundingDirection::Down), dec!(-1.2345678));
/// assert_eq!(round_units(dec!(250), 7, RoundingDirection::Down).to_string(), "250.0000000");
/// ```
#[must_use]
pub fn round_units(number: Decimal, scale: u32, direction: RoundingDirection) -> Decimal {
    let mut rounded = number.round_dp_with_strategy(scale, direction.strategy());
    rounded.rescale(scale);
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sign_checks() {
        let pos = Amount::new(dec!(100), "USD");
        let neg = Amount::new(dec!(-100), "USD");
        let zero = Amount::zero("USD");

        assert!(pos.is_positive());
        assert!(!pos.is_negative());
        assert!(neg.is_negative());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
    }

    #[test]
    fn test_arithmetic() {
        let a = Amount::new(dec!(100.00), "USD");
        let b = Amount::new(dec!(30.00), "USD");
        assert_eq!((&a - &b).number, dec!(70.00));
        assert_eq!((-&a).number, dec!(-100.00));

        let mut c = a.clone();
        c += &b;
        assert_eq!(c.number, dec!(130.00));
    }

    #[test]
    fn test_inferred_tolerance() {
        assert_eq!(Amount::new(dec!(100), "USD").inferred_tolerance(), dec!(0.5));
        assert_eq!(
            Amount::new(dec!(100.00), "USD").inferred_tolerance(),
            dec!(0.005)
        );
    }

    #[test]
    fn test_is_near() {
        let a = Amount::new(dec!(100.00), "USD");
        let b = Amount::new(dec!(100.004), "USD");
        assert!(a.is_near(&b, dec!(0.005)));
        assert!(!a.is_near(&b, dec!(0.003)));
        assert!(!a.is_near(&Amount::new(dec!(100.00), "EUR"), dec!(1)));
    }

    #[test]
    fn test_display() {
        let a = Amount::new(dec!(1234.56), "USD");
        assert_eq!(format!("{a}"), "1234.56 USD");
        assert_eq!(format!("{}", IncompleteAmount::currency_only("USD")), "USD");
    }

    #[test]
    fn test_rounding_direction_for_flow() {
        assert_eq!(RoundingDirection::for_flow(dec!(10)), RoundingDirection::Up);
        assert_eq!(RoundingDirection::for_flow(dec!(-10)), RoundingDirection::Down);
        assert_eq!(RoundingDirection::for_flow(dec!(0)), RoundingDirection::Up);
    }

    #[test]
    fn test_round_units_up_is_away_from_zero() {
        let exact = dec!(500) / dec!(1.2);
        let rounded = round_units(exact, 7, RoundingDirection::Up);
        assert_eq!(rounded, dec!(416.6666667));
        assert!(rounded >= exact);
    }

    #[test]
    fn test_round_units_down_is_toward_zero() {
        let exact = dec!(-500) / dec!(1.2);
        let rounded = round_units(exact, 7, RoundingDirection::Down);
        assert_eq!(rounded, dec!(-416.6666666));
        assert!(rounded.abs() <= exact.abs());
    }

    #[test]
    fn test_round_units_pads_scale() {
        let rounded = round_units(dec!(500), 7, RoundingDirection::Up);
        assert_eq!(rounded.scale(), 7);
        assert_eq!(rounded.to_string(), "500.0000000");
    }
}
