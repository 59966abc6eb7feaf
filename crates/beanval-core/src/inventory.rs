//! Inventory type representing a collection of positions.
//!
//! An [`Inventory`] tracks the holdings of an account as a collection of
//! [`Position`]s and reduces them with one of the host engine's booking
//! methods. The booking collaborator keeps one inventory per account while it
//! resolves the cost of reducing postings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::{Amount, Cost, CostSpec, Position};

/// Booking method determines how lots are matched when reducing positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BookingMethod {
    /// Lots must match unambiguously, unless the reduction takes everything.
    #[default]
    Strict,
    /// Like STRICT, but an exact-size lot is accepted when several match.
    StrictWithSize,
    /// First In, First Out. Oldest lots are reduced first.
    Fifo,
    /// Last In, First Out. Newest lots are reduced first.
    Lifo,
    /// Highest In, First Out. Highest-cost lots are reduced first.
    Hifo,
    /// Average cost booking. Matching lots are merged before reducing.
    Average,
    /// No lot matching. Reductions are recorded as-is.
    None,
}

impl FromStr for BookingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STRICT" => Ok(Self::Strict),
            "STRICT_WITH_SIZE" => Ok(Self::StrictWithSize),
            "FIFO" => Ok(Self::Fifo),
            "LIFO" => Ok(Self::Lifo),
            "HIFO" => Ok(Self::Hifo),
            "AVERAGE" => Ok(Self::Average),
            "NONE" => Ok(Self::None),
            _ => Err(format!("unknown booking method: {s}")),
        }
    }
}

impl fmt::Display for BookingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Strict => "STRICT",
            Self::StrictWithSize => "STRICT_WITH_SIZE",
            Self::Fifo => "FIFO",
            Self::Lifo => "LIFO",
            Self::Hifo => "HIFO",
            Self::Average => "AVERAGE",
            Self::None => "NONE",
        };
        f.write_str(name)
    }
}

/// Result of a reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingResult {
    /// Portions of lots that were taken, with the sign of the lots.
    pub matched: Vec<Position>,
    /// The cost basis of the matched portions.
    pub cost_basis: Option<Amount>,
}

/// Error that can occur while reducing an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Multiple lots match but the booking method requires an unambiguous match.
    #[error("ambiguous match: {num_matches} lots match for {currency}")]
    AmbiguousMatch {
        /// Number of lots that matched.
        num_matches: usize,
        /// The currency being reduced.
        currency: String,
    },
    /// No lots match the cost specification.
    #[error("no matching lot for {currency} with cost {cost_spec}")]
    NoMatchingLot {
        /// The currency being reduced.
        currency: String,
        /// The cost spec that didn't match.
        cost_spec: CostSpec,
    },
    /// Not enough units in matching lots.
    #[error("insufficient units of {currency}: requested {requested}, available {available}")]
    InsufficientUnits {
        /// The currency being reduced.
        currency: String,
        /// Units requested.
        requested: Decimal,
        /// Units available.
        available: Decimal,
    },
}

/// An inventory is a collection of positions.
///
/// ```
/// use beanval_core::{Amount, BookingMethod, Cost, CostSpec, Inventory, Position};
/// use rust_decimal_macros::dec;
///
/// let mut inv = Inventory::new();
/// inv.add(Position::with_cost(Amount::new(dec!(10), "HOOL"), Cost::new(dec!(5), "USD")));
///
/// let result = inv
///     .reduce(&Amount::new(dec!(-4), "HOOL"), &CostSpec::default(), BookingMethod::Fifo)
///     .unwrap();
/// assert_eq!(result.cost_basis.unwrap().number, dec!(20));
/// assert_eq!(inv.units("HOOL"), dec!(6));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    positions: Vec<Position>,
}

impl Inventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all positions.
    #[must_use]
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Check if inventory holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.iter().all(Position::is_empty)
    }

    /// Get total units of a currency across all lots.
    #[must_use]
    pub fn units(&self, currency: &str) -> Decimal {
        self.positions
            .iter()
            .filter(|p| p.units.currency == currency)
            .map(|p| p.units.number)
            .sum()
    }

    /// Add a position.
    ///
    /// Positions without cost merge with an existing cost-less position of
    /// the same currency; positions with cost open a new lot.
    pub fn add(&mut self, position: Position) {
        if position.is_empty() {
            return;
        }

        if position.cost.is_none() {
            if let Some(existing) = self
                .positions
                .iter_mut()
                .find(|p| p.cost.is_none() && p.units.currency == position.units.currency)
            {
                existing.units += &position.units;
                self.positions.retain(|p| !p.is_empty());
                return;
            }
        }

        self.positions.push(position);
    }

    /// Reduce positions by `units` (opposite sign to the lots) using `method`.
    pub fn reduce(
        &mut self,
        units: &Amount,
        spec: &CostSpec,
        method: BookingMethod,
    ) -> Result<BookingResult, InventoryError> {
        if method == BookingMethod::None {
            self.positions.push(Position::simple(units.clone()));
            return Ok(BookingResult {
                matched: Vec::new(),
                cost_basis: None,
            });
        }

        if method == BookingMethod::Average {
            self.merge_average(units, spec);
        }

        let mut candidates: Vec<usize> = self
            .positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.can_reduce(units) && p.matches_cost_spec(spec))
            .map(|(i, _)| i)
            .collect();

        if candidates.is_empty() {
            return Err(InventoryError::NoMatchingLot {
                currency: units.currency.clone(),
                cost_spec: spec.clone(),
            });
        }

        let requested = units.number.abs();
        let available: Decimal = candidates
            .iter()
            .map(|&i| self.positions[i].units.number.abs())
            .sum();
        if requested > available {
            return Err(InventoryError::InsufficientUnits {
                currency: units.currency.clone(),
                requested,
                available,
            });
        }

        let lot_date = |i: &usize| self.positions[*i].cost.as_ref().and_then(|c| c.date);
        match method {
            BookingMethod::Strict | BookingMethod::StrictWithSize if candidates.len() > 1 => {
                let exact = candidates
                    .iter()
                    .copied()
                    .find(|&i| self.positions[i].units.number.abs() == requested);
                if method == BookingMethod::StrictWithSize && exact.is_some() {
                    candidates = exact.into_iter().collect();
                } else if requested == available {
                    candidates.sort_by_key(lot_date);
                } else {
                    return Err(InventoryError::AmbiguousMatch {
                        num_matches: candidates.len(),
                        currency: units.currency.clone(),
                    });
                }
            }
            BookingMethod::Fifo => candidates.sort_by_key(lot_date),
            BookingMethod::Lifo => {
                candidates.sort_by_key(lot_date);
                candidates.reverse();
            }
            BookingMethod::Hifo => candidates.sort_by(|a, b| {
                let cost = |i: &usize| self.positions[*i].cost.as_ref().map(|c| c.number);
                cost(b).cmp(&cost(a))
            }),
            _ => {}
        }

        Ok(self.take_from(&candidates, requested))
    }

    /// Take `requested` units (absolute) from the lots at `indices`, in order.
    fn take_from(&mut self, indices: &[usize], requested: Decimal) -> BookingResult {
        let mut remaining = requested;
        let mut matched = Vec::new();
        let mut basis: Option<Amount> = None;

        for &idx in indices {
            if remaining.is_zero() {
                break;
            }
            let lot = &mut self.positions[idx];
            let take = remaining.min(lot.units.number.abs());
            let signed = if lot.units.number.is_sign_negative() {
                -take
            } else {
                take
            };
            let taken = lot.take(signed);
            if let Some(book) = taken.book_value() {
                match &mut basis {
                    Some(total) if total.currency == book.currency => *total += &book,
                    Some(_) => {}
                    None => basis = Some(book),
                }
            }
            matched.push(taken);
            remaining -= take;
        }

        self.positions.retain(|p| !p.is_empty());

        BookingResult {
            matched,
            cost_basis: basis,
        }
    }

    /// Merge all lots matching a reduction into one lot at their average cost.
    fn merge_average(&mut self, units: &Amount, spec: &CostSpec) {
        let (matching, rest): (Vec<Position>, Vec<Position>) = self
            .positions
            .drain(..)
            .partition(|p| p.can_reduce(units) && p.matches_cost_spec(spec));

        self.positions = rest;

        let Some(first) = matching.first() else {
            return;
        };
        let Some(first_cost) = first.cost.clone() else {
            self.positions.extend(matching);
            return;
        };
        if matching
            .iter()
            .any(|p| p.cost.as_ref().map(|c| &c.currency) != Some(&first_cost.currency))
        {
            self.positions.extend(matching);
            return;
        }

        let total_units: Decimal = matching.iter().map(|p| p.units.number).sum();
        let total_cost: Decimal = matching
            .iter()
            .filter_map(Position::book_value)
            .map(|a| a.number)
            .sum();
        let earliest = matching
            .iter()
            .filter_map(|p| p.cost.as_ref().and_then(|c| c.date))
            .min();

        let Some(average) = total_cost.checked_div(total_units) else {
            self.positions.extend(matching);
            return;
        };
        let mut cost = Cost::new(average, first_cost.currency);
        cost.date = earliest;
        self.positions.push(Position::with_cost(
            Amount::new(total_units, units.currency.clone()),
            cost,
        ));
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .positions
            .iter()
            .filter(|p| !p.is_empty())
            .map(ToString::to_string)
            .collect();
        write!(f, "({})", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn lot(units: Decimal, cost: Decimal, day: u32) -> Position {
        Position::with_cost(
            Amount::new(units, "HOOL"),
            Cost::new(cost, "USD").with_date(date(2024, 1, day)),
        )
    }

    fn two_lots() -> Inventory {
        let mut inv = Inventory::new();
        inv.add(lot(dec!(10), dec!(100), 2));
        inv.add(lot(dec!(10), dec!(120), 1));
        inv
    }

    #[test]
    fn test_add_merges_simple_positions() {
        let mut inv = Inventory::new();
        inv.add(Position::simple(Amount::new(dec!(100), "USD")));
        inv.add(Position::simple(Amount::new(dec!(-40), "USD")));
        assert_eq!(inv.positions().len(), 1);
        assert_eq!(inv.units("USD"), dec!(60));

        inv.add(Position::simple(Amount::new(dec!(-60), "USD")));
        assert!(inv.is_empty());
    }

    #[test]
    fn test_fifo_takes_oldest_lot() {
        let mut inv = two_lots();
        let result = inv
            .reduce(
                &Amount::new(dec!(-5), "HOOL"),
                &CostSpec::default(),
                BookingMethod::Fifo,
            )
            .unwrap();
        assert_eq!(result.cost_basis.unwrap().number, dec!(600));
        assert_eq!(inv.units("HOOL"), dec!(15));
    }

    #[test]
    fn test_lifo_takes_newest_lot() {
        let mut inv = two_lots();
        let result = inv
            .reduce(
                &Amount::new(dec!(-5), "HOOL"),
                &CostSpec::default(),
                BookingMethod::Lifo,
            )
            .unwrap();
        assert_eq!(result.cost_basis.unwrap().number, dec!(500));
    }

    #[test]
    fn test_hifo_takes_highest_cost() {
        let mut inv = two_lots();
        let result = inv
            .reduce(
                &Amount::new(dec!(-12), "HOOL"),
                &CostSpec::default(),
                BookingMethod::Hifo,
            )
            .unwrap();
        assert_eq!(result.matched.len(), 2);
        assert_eq!(result.cost_basis.unwrap().number, dec!(1400));
    }

    #[test]
    fn test_strict_ambiguous() {
        let mut inv = two_lots();
        let err = inv
            .reduce(
                &Amount::new(dec!(-5), "HOOL"),
                &CostSpec::default(),
                BookingMethod::Strict,
            )
            .unwrap_err();
        assert!(matches!(err, InventoryError::AmbiguousMatch { num_matches: 2, .. }));
    }

    #[test]
    fn test_strict_total_match_is_unambiguous() {
        let mut inv = two_lots();
        inv.reduce(
            &Amount::new(dec!(-20), "HOOL"),
            &CostSpec::default(),
            BookingMethod::Strict,
        )
        .unwrap();
        assert!(inv.is_empty());
    }

    #[test]
    fn test_strict_with_size_picks_exact_lot() {
        let mut inv = Inventory::new();
        inv.add(lot(dec!(10), dec!(100), 1));
        inv.add(lot(dec!(4), dec!(120), 2));
        let result = inv
            .reduce(
                &Amount::new(dec!(-4), "HOOL"),
                &CostSpec::default(),
                BookingMethod::StrictWithSize,
            )
            .unwrap();
        assert_eq!(result.cost_basis.unwrap().number, dec!(480));
    }

    #[test]
    fn test_average_merges_lots() {
        let mut inv = two_lots();
        let result = inv
            .reduce(
                &Amount::new(dec!(-10), "HOOL"),
                &CostSpec::default(),
                BookingMethod::Average,
            )
            .unwrap();
        assert_eq!(result.cost_basis.unwrap().number, dec!(1100));
        assert_eq!(inv.positions().len(), 1);
    }

    #[test]
    fn test_insufficient_units() {
        let mut inv = two_lots();
        let err = inv
            .reduce(
                &Amount::new(dec!(-25), "HOOL"),
                &CostSpec::default(),
                BookingMethod::Fifo,
            )
            .unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientUnits { .. }));
    }

    #[test]
    fn test_no_matching_lot() {
        let mut inv = two_lots();
        let spec = CostSpec::default().with_currency("EUR");
        let err = inv
            .reduce(&Amount::new(dec!(-1), "HOOL"), &spec, BookingMethod::Fifo)
            .unwrap_err();
        assert!(matches!(err, InventoryError::NoMatchingLot { .. }));
    }

    #[test]
    fn test_booking_method_parse() {
        assert_eq!("fifo".parse::<BookingMethod>(), Ok(BookingMethod::Fifo));
        assert_eq!(
            "STRICT_WITH_SIZE".parse::<BookingMethod>(),
            Ok(BookingMethod::StrictWithSize)
        );
        assert!("RANDOM".parse::<BookingMethod>().is_err());
        assert_eq!(BookingMethod::Hifo.to_string(), "HIFO");
    }
}
