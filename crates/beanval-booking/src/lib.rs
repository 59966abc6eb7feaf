//! Lot booking for rewritten transactions.
//!
//! The valuation pass emits transactions whose sell legs leave the cost
//! unresolved and whose balancing postings carry no number. This crate is the
//! collaborator that finishes them:
//!
//! - Interpolation (filling in missing amounts)
//! - Lot matching for postings held at cost, per account booking method
//! - Balance verification within inferred tolerances
//!
//! # Interpolation
//!
//! When a transaction has exactly one posting per currency without an amount,
//! that amount can be calculated to make the transaction balance.
//!
//! ```
//! use beanval_booking::interpolate;
//! use beanval_core::{Amount, NaiveDate, Posting, Transaction};
//! use rust_decimal_macros::dec;
//!
//! let txn = Transaction::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), "Groceries")
//!     .with_posting(Posting::new("Expenses:Food", Amount::new(dec!(50.00), "USD")))
//!     .with_posting(Posting::auto("Assets:Cash"));
//!
//! let result = interpolate(&txn).unwrap();
//! assert_eq!(result.transaction.postings[1].amount().unwrap().number, dec!(-50.00));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod book;
mod interpolate;

pub use book::{BookError, BookingFailure, BookingMethods, BookingOutcome, CostResolver, LotBooker};
pub use interpolate::{interpolate, InterpolationError, InterpolationResult};

use beanval_core::{Amount, IncompleteAmount, Posting, PriceAnnotation, Transaction};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Tolerance used for currencies with no inferred tolerance.
const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Compute the balancing weight of a posting with complete units.
///
/// - With a cost (number and currency known), the weight is in the cost currency
/// - With a price annotation, the weight is in the price currency
/// - Otherwise the weight is the units themselves
///
/// Returns `None` when the posting has no complete units.
#[must_use]
pub fn posting_weight(posting: &Posting) -> Option<Amount> {
    let units = posting.amount()?;

    if let Some(spec) = &posting.cost {
        if let Some(currency) = &spec.currency {
            if let Some(per_unit) = spec.number_per {
                return Some(Amount::new(units.number * per_unit, currency.clone()));
            }
            if let Some(total) = spec.number_total {
                return Some(Amount::new(
                    total.abs() * signum(units.number),
                    currency.clone(),
                ));
            }
        }
    }

    match &posting.price {
        Some(PriceAnnotation::Unit(price)) => Some(Amount::new(
            units.number * price.number,
            price.currency.clone(),
        )),
        Some(PriceAnnotation::Total(price)) => Some(Amount::new(
            price.number.abs() * signum(units.number),
            price.currency.clone(),
        )),
        None => Some(units.clone()),
    }
}

fn signum(number: Decimal) -> Decimal {
    if number.is_zero() {
        Decimal::ZERO
    } else if number.is_sign_negative() {
        Decimal::NEGATIVE_ONE
    } else {
        Decimal::ONE
    }
}

/// Calculate the tolerance for a set of amounts.
///
/// Tolerance is the maximum of all individual amount tolerances.
#[must_use]
pub fn calculate_tolerance(amounts: &[&Amount]) -> HashMap<String, Decimal> {
    let mut tolerances: HashMap<String, Decimal> = HashMap::new();

    for amount in amounts {
        let tol = amount.inferred_tolerance();
        tolerances
            .entry(amount.currency.clone())
            .and_modify(|t| *t = (*t).max(tol))
            .or_insert(tol);
    }

    tolerances
}

/// Tolerances inferred from the written amounts of a transaction.
///
/// Only amounts the user wrote contribute: complete posting units and
/// per-unit prices. Interpolated postings would otherwise loosen the check.
#[must_use]
pub fn transaction_tolerances(transaction: &Transaction) -> HashMap<String, Decimal> {
    let amounts: Vec<&Amount> = transaction
        .postings
        .iter()
        .flat_map(|p| {
            let units = match &p.units {
                Some(IncompleteAmount::Complete(a)) => Some(a),
                _ => None,
            };
            let price = p.price.as_ref().map(PriceAnnotation::amount);
            units.into_iter().chain(price)
        })
        .collect();
    calculate_tolerance(&amounts)
}

/// Calculate the residual (imbalance) of a transaction.
///
/// Returns a map of currency -> residual amount.
/// A balanced transaction has all residuals within tolerance.
#[must_use]
pub fn calculate_residual(transaction: &Transaction) -> HashMap<String, Decimal> {
    let mut residuals: HashMap<String, Decimal> = HashMap::new();

    for weight in transaction.postings.iter().filter_map(posting_weight) {
        *residuals.entry(weight.currency).or_default() += weight.number;
    }

    residuals
}

/// Check if a transaction is balanced within tolerance.
#[must_use]
#[allow(clippy::implicit_hasher)]
pub fn is_balanced(transaction: &Transaction, tolerances: &HashMap<String, Decimal>) -> bool {
    first_imbalance(transaction, tolerances).is_none()
}

/// Find the first currency (in name order) whose residual exceeds tolerance.
#[allow(clippy::implicit_hasher)]
pub fn first_imbalance(
    transaction: &Transaction,
    tolerances: &HashMap<String, Decimal>,
) -> Option<(String, Decimal)> {
    let mut residuals: Vec<(String, Decimal)> =
        calculate_residual(transaction).into_iter().collect();
    residuals.sort_by(|a, b| a.0.cmp(&b.0));

    residuals.into_iter().find(|(currency, residual)| {
        let tolerance = tolerances
            .get(currency)
            .copied()
            .unwrap_or(DEFAULT_TOLERANCE);
        residual.abs() > tolerance
    })
}
