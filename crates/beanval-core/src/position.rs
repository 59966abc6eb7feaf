//! Position type representing units held at an optional cost.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Amount, Cost, CostSpec};

/// A position is units of a currency held at an optional cost.
///
/// Synthetic-unit purchases are booked at a price, not a cost, so they end
/// up as simple positions; lots with a cost only appear for postings that
/// carried a cost specification of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// The units held
    pub units: Amount,
    /// The cost basis (if tracked)
    pub cost: Option<Cost>,
}

impl Position {
    /// Create a position without cost tracking.
    #[must_use]
    pub const fn simple(units: Amount) -> Self {
        Self { units, cost: None }
    }

    /// Create a position held at a cost.
    #[must_use]
    pub const fn with_cost(units: Amount, cost: Cost) -> Self {
        Self {
            units,
            cost: Some(cost),
        }
    }

    /// Check if this position is empty (zero units).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.units.is_zero()
    }

    /// Calculate the book value (total cost) of this position.
    #[must_use]
    pub fn book_value(&self) -> Option<Amount> {
        self.cost.as_ref().map(|c| c.total_cost(self.units.number))
    }

    /// Check if this position matches a cost specification.
    ///
    /// A position without cost only matches the empty spec.
    #[must_use]
    pub fn matches_cost_spec(&self, spec: &CostSpec) -> bool {
        match &self.cost {
            None => spec.is_empty(),
            Some(cost) => spec.matches(cost),
        }
    }

    /// Check if this position can be reduced by `reduction`: same currency,
    /// opposite sign.
    #[must_use]
    pub fn can_reduce(&self, reduction: &Amount) -> bool {
        self.units.currency == reduction.currency
            && !self.is_empty()
            && self.units.number.is_sign_negative() != reduction.number.is_sign_negative()
    }

    /// Take `take` units (same sign as the position) out of this lot.
    ///
    /// Returns the taken part; `self` keeps the remainder.
    pub fn take(&mut self, take: Decimal) -> Self {
        self.units.number -= take;
        Self {
            units: Amount::new(take, self.units.currency.clone()),
            cost: self.cost.clone(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.units)?;
        if let Some(cost) = &self.cost {
            write!(f, " {cost}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_book_value() {
        let pos = Position::with_cost(
            Amount::new(dec!(10), "BROKERU"),
            Cost::new(dec!(1.2), "USD"),
        );
        assert_eq!(pos.book_value().unwrap().number, dec!(12.0));
        assert!(Position::simple(Amount::new(dec!(1), "USD"))
            .book_value()
            .is_none());
    }

    #[test]
    fn test_can_reduce() {
        let pos = Position::simple(Amount::new(dec!(10), "BROKERU"));
        assert!(pos.can_reduce(&Amount::new(dec!(-3), "BROKERU")));
        assert!(!pos.can_reduce(&Amount::new(dec!(3), "BROKERU")));
        assert!(!pos.can_reduce(&Amount::new(dec!(-3), "USD")));
    }

    #[test]
    fn test_take() {
        let mut pos = Position::with_cost(
            Amount::new(dec!(10), "HOOL"),
            Cost::new(dec!(500), "USD"),
        );
        let taken = pos.take(dec!(4));
        assert_eq!(taken.units.number, dec!(4));
        assert_eq!(pos.units.number, dec!(6));
        assert_eq!(taken.cost, pos.cost);
    }

    #[test]
    fn test_matches_cost_spec() {
        let simple = Position::simple(Amount::new(dec!(1), "USD"));
        assert!(simple.matches_cost_spec(&CostSpec::default()));
        assert!(!simple.matches_cost_spec(&CostSpec::default().with_currency("USD")));
    }
}
