//! Rewriting of postings on mapped accounts.
//!
//! A native posting becomes a buy (inflow) or sell (outflow) of the
//! account's synthetic unit at its last known price:
//!
//! ```text
//! Assets:Broker  -300 USD
//! ```
//!
//! with the unit priced at 1.2 USD becomes
//!
//! ```text
//! Income:Broker:PnL  USD
//! Assets:Broker      -250.0000000 BROKERU @ 1.2 USD
//! ```

use beanval_core::{
    round_units, Amount, IncompleteAmount, Posting, PriceAnnotation, RoundingDirection,
};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::AccountMapping;

/// Why a posting could not be rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// The posting has no complete amount to convert.
    #[error("posting to {account} has no amount to convert into {currency}")]
    MissingUnits {
        /// The mapped account.
        account: String,
        /// The synthetic currency.
        currency: String,
    },

    /// The posting's currency is not the one the synthetic unit is priced in.
    #[error("posting to {account} is in {found} but {currency} is priced in {expected}")]
    CurrencyMismatch {
        /// The mapped account.
        account: String,
        /// The synthetic currency.
        currency: String,
        /// The priced native currency.
        expected: String,
        /// The posting's currency.
        found: String,
    },

    /// The last price cannot be divided by.
    #[error("cannot convert {units} into {currency} at price {price}")]
    Conversion {
        /// The native units.
        units: Amount,
        /// The synthetic currency.
        currency: String,
        /// The last known price.
        price: Amount,
    },
}

/// Replacement postings and the balance delta of one rewritten posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Postings that replace the original, in emission order.
    pub postings: Vec<Posting>,
    /// Unrounded synthetic quantity to add to the account's balance.
    pub converted: Decimal,
}

/// Rewrite one posting on a mapped account.
///
/// `quote` is the synthetic unit's last price in its native currency.
/// Emission order: the outflow balancing posting, then the canceling pair
/// when the original carried a price, then the synthetic leg.
pub fn rewrite_posting(
    posting: &Posting,
    mapping: &AccountMapping,
    quote: &Amount,
    precision: u32,
) -> Result<Rewrite, RewriteError> {
    let units = posting.amount().ok_or_else(|| RewriteError::MissingUnits {
        account: posting.account.clone(),
        currency: mapping.currency.clone(),
    })?;

    if units.currency != quote.currency {
        return Err(RewriteError::CurrencyMismatch {
            account: posting.account.clone(),
            currency: mapping.currency.clone(),
            expected: quote.currency.clone(),
            found: units.currency.clone(),
        });
    }

    let converted = units
        .number
        .checked_div(quote.number)
        .ok_or_else(|| RewriteError::Conversion {
            units: units.clone(),
            currency: mapping.currency.clone(),
            price: quote.clone(),
        })?;
    let direction = RoundingDirection::for_flow(units.number);
    let quantity = round_units(converted, precision, direction);

    let mut postings = Vec::with_capacity(4);

    if direction == RoundingDirection::Down {
        if let Some(offset) = &mapping.offset_account {
            postings.push(Posting {
                price: posting.price.clone(),
                ..derived(
                    posting,
                    offset.clone(),
                    IncompleteAmount::currency_only(units.currency.clone()),
                )
            });
        }
    }

    if let Some(price) = &posting.price {
        postings.push(
            derived(posting, posting.account.clone(), units.clone().into())
                .with_price(price.clone()),
        );
        postings.push(derived(posting, posting.account.clone(), (-units).into()));
    }

    postings.push(
        derived(
            posting,
            posting.account.clone(),
            Amount::new(quantity, mapping.currency.clone()).into(),
        )
        .with_price(PriceAnnotation::Unit(quote.clone())),
    );

    Ok(Rewrite {
        postings,
        converted,
    })
}

/// A posting sharing the original's flag and metadata, with no cost or price.
fn derived(original: &Posting, account: String, units: IncompleteAmount) -> Posting {
    Posting {
        account,
        units: Some(units),
        cost: None,
        price: None,
        flag: original.flag,
        meta: original.meta.clone(),
    }
}
