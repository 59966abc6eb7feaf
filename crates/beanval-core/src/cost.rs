//! Cost and cost specification types.
//!
//! A [`Cost`] is the acquisition cost of a lot. A [`CostSpec`] is the partial
//! form written on a posting: rewritten sell postings leave it unset and the
//! booking collaborator fills it from the matching lots.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Amount;

/// The acquisition cost of a position (lot).
///
/// ```
/// use beanval_core::Cost;
/// use rust_decimal_macros::dec;
///
/// let cost = Cost::new(dec!(1.25), "USD");
/// assert_eq!(cost.total_cost(dec!(8)).number, dec!(10.00));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cost {
    /// Cost per unit
    pub number: Decimal,
    /// Currency of the cost
    pub currency: String,
    /// Acquisition date
    pub date: Option<NaiveDate>,
    /// Lot label
    pub label: Option<String>,
}

impl Cost {
    /// Create a new cost with the given number and currency.
    #[must_use]
    pub fn new(number: Decimal, currency: impl Into<String>) -> Self {
        Self {
            number,
            currency: currency.into(),
            date: None,
            label: None,
        }
    }

    /// Add a date to this cost.
    #[must_use]
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Add a label to this cost.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Calculate the total cost for a given number of units.
    #[must_use]
    pub fn total_cost(&self, units: Decimal) -> Amount {
        Amount::new(units * self.number, self.currency.clone())
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} {}", self.number, self.currency)?;
        if let Some(date) = self.date {
            write!(f, ", {date}")?;
        }
        if let Some(label) = &self.label {
            write!(f, ", \"{label}\"")?;
        }
        write!(f, "}}")
    }
}

/// A cost specification for matching or creating lots.
///
/// A `CostSpec` matches a `Cost` if every specified field is equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CostSpec {
    /// Cost per unit (if specified)
    #[serde(default)]
    pub number_per: Option<Decimal>,
    /// Total cost (if specified), alternative to `number_per`
    #[serde(default)]
    pub number_total: Option<Decimal>,
    /// Currency of the cost (if specified)
    #[serde(default)]
    pub currency: Option<String>,
    /// Acquisition date (if specified)
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Lot label (if specified)
    #[serde(default)]
    pub label: Option<String>,
}

impl CostSpec {
    /// Set the per-unit cost.
    #[must_use]
    pub const fn with_number_per(mut self, number: Decimal) -> Self {
        self.number_per = Some(number);
        self
    }

    /// Set the currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Set the date.
    #[must_use]
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Check if this is an empty cost spec (`{}`).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.number_per.is_none()
            && self.number_total.is_none()
            && self.currency.is_none()
            && self.date.is_none()
            && self.label.is_none()
    }

    /// Check if this cost spec matches a cost.
    #[must_use]
    pub fn matches(&self, cost: &Cost) -> bool {
        if self.number_per.is_some_and(|n| n != cost.number) {
            return false;
        }
        if self.currency.as_ref().is_some_and(|c| c != &cost.currency) {
            return false;
        }
        if self.date.is_some_and(|d| cost.date != Some(d)) {
            return false;
        }
        if self.label.is_some() && self.label != cost.label {
            return false;
        }
        true
    }

    /// Resolve this spec into a concrete cost for a new lot of `units`.
    ///
    /// The lot date defaults to `date`. Returns `None` without a currency or
    /// a per-unit/total number.
    #[must_use]
    pub fn resolve(&self, units: Decimal, date: NaiveDate) -> Option<Cost> {
        let currency = self.currency.clone()?;
        let number = match (self.number_per, self.number_total) {
            (Some(per), _) => per,
            (None, Some(total)) => total.checked_div(units.abs())?,
            (None, None) => return None,
        };

        Some(Cost {
            number,
            currency,
            date: Some(self.date.unwrap_or(date)),
            label: self.label.clone(),
        })
    }
}

impl From<&Cost> for CostSpec {
    fn from(cost: &Cost) -> Self {
        Self {
            number_per: Some(cost.number),
            number_total: None,
            currency: Some(cost.currency.clone()),
            date: cost.date,
            label: cost.label.clone(),
        }
    }
}

impl fmt::Display for CostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        match (self.number_per, self.number_total) {
            (Some(per), _) => parts.push(match &self.currency {
                Some(c) => format!("{per} {c}"),
                None => per.to_string(),
            }),
            (None, Some(total)) => parts.push(match &self.currency {
                Some(c) => format!("# {total} {c}"),
                None => format!("# {total}"),
            }),
            (None, None) => {
                if let Some(c) = &self.currency {
                    parts.push(c.clone());
                }
            }
        }
        if let Some(date) = self.date {
            parts.push(date.to_string());
        }
        if let Some(label) = &self.label {
            parts.push(format!("\"{label}\""));
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}
