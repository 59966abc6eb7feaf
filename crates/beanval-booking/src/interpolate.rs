//! Transaction interpolation.
//!
//! Fills in missing posting amounts to balance transactions.

use beanval_core::{Amount, IncompleteAmount, PriceAnnotation, Transaction};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::posting_weight;

/// Errors that can occur during interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolationError {
    /// Multiple postings are missing amounts for the same currency.
    #[error("multiple postings missing amounts for currency {currency}")]
    MultipleMissing {
        /// The currency with multiple missing amounts.
        currency: String,
        /// Number of postings missing this currency.
        count: usize,
    },

    /// Cannot infer currency for a posting.
    #[error("cannot infer currency for posting to account {account}")]
    CannotInferCurrency {
        /// The account of the posting.
        account: String,
    },

    /// The missing number cannot be derived from the residual.
    #[error("cannot derive units for posting to account {account} from a zero price")]
    ZeroPrice {
        /// The account of the posting.
        account: String,
    },
}

/// Result of interpolation.
#[derive(Debug, Clone)]
pub struct InterpolationResult {
    /// The interpolated transaction.
    pub transaction: Transaction,
    /// Which posting indices were filled in.
    pub filled_indices: Vec<usize>,
    /// Residuals after interpolation (should all be near zero).
    pub residuals: HashMap<String, Decimal>,
}

/// Interpolate missing amounts in a transaction.
///
/// # Rules
///
/// - At most one posting per currency can have a missing amount
/// - A currency-only posting absorbs the residual of its weight currency:
///   the price currency when it carries a per-unit price, its own otherwise
/// - A posting without any amount absorbs one remaining non-zero residual,
///   or becomes a zero amount when everything already balances. It may not
///   share a transaction with a currency-only posting, since either could
///   absorb that currency
/// - A number without a currency is rejected
pub fn interpolate(transaction: &Transaction) -> Result<InterpolationResult, InterpolationError> {
    let mut result = transaction.clone();
    let mut filled_indices = Vec::new();

    // BTreeMap keeps the assignment of auto postings deterministic.
    let mut residuals: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut missing_by_currency: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut unassigned_missing: Vec<usize> = Vec::new();

    for (i, posting) in transaction.postings.iter().enumerate() {
        match &posting.units {
            Some(IncompleteAmount::Complete(_)) => {
                if let Some(weight) = posting_weight(posting) {
                    *residuals.entry(weight.currency).or_default() += weight.number;
                }
            }
            Some(IncompleteAmount::CurrencyOnly(currency)) => {
                let weight_currency = match &posting.price {
                    Some(PriceAnnotation::Unit(price)) => price.currency.clone(),
                    _ => currency.clone(),
                };
                residuals.entry(weight_currency.clone()).or_default();
                missing_by_currency
                    .entry(weight_currency)
                    .or_default()
                    .push(i);
            }
            Some(IncompleteAmount::NumberOnly(_)) => {
                return Err(InterpolationError::CannotInferCurrency {
                    account: posting.account.clone(),
                });
            }
            None => match posting.cost.as_ref().and_then(|c| c.currency.clone()) {
                Some(currency) => missing_by_currency.entry(currency).or_default().push(i),
                None => unassigned_missing.push(i),
            },
        }
    }

    // A posting without any amount competes for every currency.
    for (currency, indices) in &missing_by_currency {
        let count = indices.len() + unassigned_missing.len();
        if count > 1 {
            return Err(InterpolationError::MultipleMissing {
                currency: currency.clone(),
                count,
            });
        }
    }

    for (weight_currency, indices) in missing_by_currency {
        let idx = indices[0];
        let residual = residuals
            .get(&weight_currency)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let posting = &transaction.postings[idx];

        let units = match (&posting.units, &posting.price) {
            (Some(IncompleteAmount::CurrencyOnly(currency)), Some(PriceAnnotation::Unit(price))) => {
                let number = if residual.is_zero() {
                    Decimal::ZERO
                } else {
                    (-residual)
                        .checked_div(price.number)
                        .ok_or_else(|| InterpolationError::ZeroPrice {
                            account: posting.account.clone(),
                        })?
                };
                Amount::new(number, currency.clone())
            }
            _ => Amount::new(negated(residual), weight_currency.clone()),
        };

        result.postings[idx].units = Some(IncompleteAmount::Complete(units));
        filled_indices.push(idx);
        residuals.insert(weight_currency, Decimal::ZERO);
    }

    if !unassigned_missing.is_empty() {
        let non_zero: Vec<(String, Decimal)> = residuals
            .iter()
            .filter(|(_, v)| !v.is_zero())
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        let fallback = residuals.keys().next().cloned();

        for (i, &idx) in unassigned_missing.iter().enumerate() {
            let amount = match (non_zero.get(i), &fallback) {
                (Some((currency, residual)), _) => Amount::new(negated(*residual), currency.clone()),
                (None, Some(currency)) => Amount::zero(currency.clone()),
                (None, None) => {
                    return Err(InterpolationError::CannotInferCurrency {
                        account: transaction.postings[idx].account.clone(),
                    })
                }
            };
            result.postings[idx].units = Some(IncompleteAmount::Complete(amount));
            filled_indices.push(idx);
        }
    }

    filled_indices.sort_unstable();
    let final_residuals = crate::calculate_residual(&result);

    Ok(InterpolationResult {
        transaction: result,
        filled_indices,
        residuals: final_residuals,
    })
}

/// Negate a residual without producing a negative zero.
fn negated(residual: Decimal) -> Decimal {
    if residual.is_zero() {
        Decimal::ZERO
    } else {
        -residual
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanval_core::{NaiveDate, Posting};
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn get_amount(posting: &Posting) -> Option<&Amount> {
        posting.units.as_ref().and_then(IncompleteAmount::as_amount)
    }

    #[test]
    fn test_interpolate_simple() {
        let txn = Transaction::new(date(2024, 1, 15), "Test")
            .with_posting(Posting::new(
                "Expenses:Food",
                Amount::new(dec!(50.00), "USD"),
            ))
            .with_posting(Posting::auto("Assets:Cash"));

        let result = interpolate(&txn).unwrap();

        assert_eq!(result.filled_indices, vec![1]);
        let amount = get_amount(&result.transaction.postings[1]).expect("should have amount");
        assert_eq!(amount.number, dec!(-50.00));
        assert_eq!(amount.currency, "USD");
    }

    #[test]
    fn test_interpolate_no_missing() {
        let txn = Transaction::new(date(2024, 1, 15), "Test")
            .with_posting(Posting::new(
                "Expenses:Food",
                Amount::new(dec!(50.00), "USD"),
            ))
            .with_posting(Posting::new(
                "Assets:Cash",
                Amount::new(dec!(-50.00), "USD"),
            ));

        let result = interpolate(&txn).unwrap();
        assert!(result.filled_indices.is_empty());
    }

    #[test]
    fn test_currency_only_absorbs_rounding_remainder() {
        // A sell of 500 USD at 1.2 rounds toward zero, leaving 0.00000008 USD.
        let txn = Transaction::new(date(2024, 3, 1), "Withdrawal")
            .with_posting(Posting::new("Assets:Bank", Amount::new(dec!(500), "USD")))
            .with_posting(Posting::with_incomplete(
                "Income:Broker:PnL",
                IncompleteAmount::currency_only("USD"),
            ))
            .with_posting(
                Posting::new("Assets:Broker", Amount::new(dec!(-416.6666666), "BROKERU"))
                    .with_price(PriceAnnotation::Unit(Amount::new(dec!(1.2), "USD"))),
            );

        let result = interpolate(&txn).unwrap();
        let pnl = get_amount(&result.transaction.postings[1]).unwrap();
        assert_eq!(pnl.currency, "USD");
        assert_eq!(pnl.number, dec!(-0.00000008));
        assert!(result.residuals.values().all(|r| r.is_zero()));
    }

    #[test]
    fn test_currency_only_with_price_solves_for_units() {
        let txn = Transaction::new(date(2024, 3, 1), "Conversion")
            .with_posting(Posting::new("Assets:Bank", Amount::new(dec!(-11), "USD")))
            .with_posting(
                Posting::with_incomplete("Assets:Euro", IncompleteAmount::currency_only("EUR"))
                    .with_price(PriceAnnotation::Unit(Amount::new(dec!(1.1), "USD"))),
            );

        let result = interpolate(&txn).unwrap();
        let filled = get_amount(&result.transaction.postings[1]).unwrap();
        assert_eq!(filled.currency, "EUR");
        assert_eq!(filled.number, dec!(10));
    }

    #[test]
    fn test_auto_posting_on_balanced_transaction_gets_zero() {
        let txn = Transaction::new(date(2024, 1, 15), "Test")
            .with_posting(Posting::new("Assets:Bank", Amount::new(dec!(-300), "USD")))
            .with_posting(Posting::new("Assets:Other", Amount::new(dec!(300), "USD")))
            .with_posting(Posting::auto("Income:PnL"));

        let result = interpolate(&txn).unwrap();
        let filled = get_amount(&result.transaction.postings[2]).unwrap();
        assert!(filled.is_zero());
        assert_eq!(filled.currency, "USD");
    }

    #[test]
    fn test_multiple_missing_same_currency() {
        let txn = Transaction::new(date(2024, 1, 15), "Test")
            .with_posting(Posting::new("Expenses:Food", Amount::new(dec!(50), "USD")))
            .with_posting(Posting::with_incomplete(
                "Assets:Cash",
                IncompleteAmount::currency_only("USD"),
            ))
            .with_posting(Posting::with_incomplete(
                "Assets:Bank",
                IncompleteAmount::currency_only("USD"),
            ));

        let err = interpolate(&txn).unwrap_err();
        assert_eq!(
            err,
            InterpolationError::MultipleMissing {
                currency: "USD".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn test_auto_posting_competes_with_currency_only() {
        let txn = Transaction::new(date(2024, 2, 10), "Withdrawal")
            .with_posting(Posting::with_incomplete(
                "Equity:PnL",
                IncompleteAmount::currency_only("USD"),
            ))
            .with_posting(
                Posting::new("Assets:Broker", Amount::new(dec!(-250.0000000), "BROKERU"))
                    .with_price(PriceAnnotation::Unit(Amount::new(dec!(1.2), "USD"))),
            )
            .with_posting(Posting::auto("Assets:Bank"));

        let err = interpolate(&txn).unwrap_err();
        assert_eq!(
            err,
            InterpolationError::MultipleMissing {
                currency: "USD".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn test_auto_posting_without_any_amounts() {
        let txn = Transaction::new(date(2024, 1, 15), "Empty").with_posting(Posting::auto("Assets:Cash"));
        assert!(matches!(
            interpolate(&txn),
            Err(InterpolationError::CannotInferCurrency { .. })
        ));
    }
}
