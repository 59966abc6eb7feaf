//! Synthetic unit price series.
//!
//! A synthetic unit's price is a step function: each seed or valuation sets
//! the rate used by every later conversion until the next one.

use beanval_core::{Amount, Metadata, NaiveDate, Price};
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// A price derivation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// No units are outstanding, so a per-unit price is undefined.
    #[error("cannot price {currency}: balance is zero")]
    ZeroBalance {
        /// The synthetic currency.
        currency: String,
    },

    /// The division overflowed the decimal range.
    #[error("cannot price {currency}: {amount} / {balance} overflows")]
    Overflow {
        /// The synthetic currency.
        currency: String,
        /// The reported worth.
        amount: Amount,
        /// The outstanding units.
        balance: Decimal,
    },
}

/// One point of a synthetic unit's price series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricePoint {
    /// Effective date.
    pub date: NaiveDate,
    /// The synthetic currency.
    pub currency: String,
    /// Price per unit in the native currency.
    pub price: Amount,
    /// Metadata of the directive that produced the point.
    pub meta: Metadata,
}

impl From<PricePoint> for Price {
    fn from(point: PricePoint) -> Self {
        Self::new(point.date, point.currency, point.price).with_meta(point.meta)
    }
}

/// Append-only price series with a last-price lookup per currency.
#[derive(Debug, Clone, Default)]
pub struct PriceSynthesizer {
    last: HashMap<String, Amount>,
    points: Vec<PricePoint>,
}

impl PriceSynthesizer {
    /// Create an empty synthesizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a currency at 1.0 in `native_currency`.
    pub fn seed(
        &mut self,
        currency: &str,
        native_currency: &str,
        date: NaiveDate,
        meta: &Metadata,
    ) -> &PricePoint {
        self.record(currency, Amount::new(Decimal::ONE, native_currency), date, meta)
    }

    /// Derive a new price from a reported total worth.
    ///
    /// `price = worth / balance`. Nothing is recorded on error.
    pub fn revalue(
        &mut self,
        currency: &str,
        worth: &Amount,
        date: NaiveDate,
        balance: Decimal,
        meta: &Metadata,
    ) -> Result<&PricePoint, PriceError> {
        if balance.is_zero() {
            return Err(PriceError::ZeroBalance {
                currency: currency.to_string(),
            });
        }
        let number = worth
            .number
            .checked_div(balance)
            .ok_or_else(|| PriceError::Overflow {
                currency: currency.to_string(),
                amount: worth.clone(),
                balance,
            })?;

        Ok(self.record(
            currency,
            Amount::new(number.normalize(), worth.currency.clone()),
            date,
            meta,
        ))
    }

    fn record(
        &mut self,
        currency: &str,
        price: Amount,
        date: NaiveDate,
        meta: &Metadata,
    ) -> &PricePoint {
        tracing::debug!(%date, currency, price = %price, "price point");
        self.last.insert(currency.to_string(), price.clone());
        self.points.push(PricePoint {
            date,
            currency: currency.to_string(),
            price,
            meta: meta.clone(),
        });
        &self.points[self.points.len() - 1]
    }

    /// Last price and its native currency, if the currency was ever priced.
    #[must_use]
    pub fn quote(&self, currency: &str) -> Option<&Amount> {
        self.last.get(currency)
    }

    /// Last price number, 1.0 if the currency was never priced.
    #[must_use]
    pub fn last_price(&self, currency: &str) -> Decimal {
        self.quote(currency).map_or(Decimal::ONE, |p| p.number)
    }

    /// All points, in the order they were recorded.
    #[must_use]
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Consume the series into price directives.
    #[must_use]
    pub fn into_directives(self) -> Vec<Price> {
        self.points.into_iter().map(Price::from).collect()
    }
}
