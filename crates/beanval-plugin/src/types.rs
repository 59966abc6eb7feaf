//! Input, output and error types of the valuation pass.

use beanval_booking::{BookError, BookingFailure};
use beanval_core::{BookingMethod, Directive, MetaValue, Metadata, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default rounding scale for synthetic-unit quantities.
pub const DEFAULT_PRECISION: u32 = 7;

/// Input to the valuation pass.
#[derive(Debug, Clone, Default)]
pub struct PluginInput {
    /// All directives, in date order.
    pub directives: Vec<Directive>,
    /// Host options.
    pub options: PluginOptions,
    /// Plugin configuration string (from the plugin directive).
    pub config: Option<String>,
}

/// Which directive anchors an auto-defined commodity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommodityAnchor {
    /// Date and metadata of the last input directive.
    #[default]
    LastDirective,
    /// Date and metadata of the first directive that used the currency.
    FirstUse,
}

/// Options consumed by the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOptions {
    /// Default booking method handed to the booking collaborator.
    pub booking_method: BookingMethod,
    /// Fractional digits of emitted synthetic quantities.
    pub precision: u32,
    /// Anchor for auto-defined commodities.
    pub commodity_anchor: CommodityAnchor,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            booking_method: BookingMethod::Strict,
            precision: DEFAULT_PRECISION,
            commodity_anchor: CommodityAnchor::LastDirective,
        }
    }
}

/// Output of the valuation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PluginOutput {
    /// Passthrough directives, then commodities, prices and booked transactions.
    pub directives: Vec<Directive>,
    /// Non-fatal errors collected along the way.
    pub errors: Vec<ValuationError>,
}

/// Kind of a non-fatal processing error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// A valuation or assertion out of order for its account.
    Sequencing,
    /// A price could not be derived (zero balance or zero price).
    Arithmetic,
    /// Raised by the booking collaborator.
    Booking,
    /// A directive is missing the data the pass needs.
    InvalidDirective,
    /// A posting is in a different currency than its synthetic unit's price.
    CurrencyMismatch,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sequencing => "sequencing",
            Self::Arithmetic => "arithmetic",
            Self::Booking => "booking",
            Self::InvalidDirective => "invalid-directive",
            Self::CurrencyMismatch => "currency-mismatch",
        };
        f.write_str(name)
    }
}

/// Where a directive came from, read from its `filename`/`lineno` metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source file.
    pub filename: String,
    /// 1-based line, when known.
    pub line: Option<u32>,
}

impl SourceLocation {
    /// Extract the location from directive metadata.
    #[must_use]
    pub fn from_meta(meta: &Metadata) -> Option<Self> {
        let filename = match meta.get("filename")? {
            MetaValue::String(s) => s.clone(),
            _ => return None,
        };
        let line = match meta.get("lineno") {
            Some(MetaValue::Number(n)) => n.to_u32(),
            _ => None,
        };
        Some(Self { filename, line })
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}", self.filename),
            None => write!(f, "{}", self.filename),
        }
    }
}

/// A non-fatal error attached to the directive that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationError {
    /// What kind of problem this is.
    pub kind: ErrorKind,
    /// Human readable description.
    pub message: String,
    /// Date of the offending directive.
    pub date: NaiveDate,
    /// Source location of the offending directive.
    pub source: Option<SourceLocation>,
}

impl ValuationError {
    /// Create an error for a directive with the given date and metadata.
    pub fn new(kind: ErrorKind, message: impl Into<String>, date: NaiveDate, meta: &Metadata) -> Self {
        Self {
            kind,
            message: message.into(),
            date,
            source: SourceLocation::from_meta(meta),
        }
    }
}

impl From<BookingFailure> for ValuationError {
    fn from(failure: BookingFailure) -> Self {
        let message = match &failure.error {
            BookError::Interpolation(e) => format!("cannot interpolate: {e}"),
            other => other.to_string(),
        };
        Self::new(ErrorKind::Booking, message, failure.date, &failure.meta)
    }
}

impl fmt::Display for ValuationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.message, self.date)?;
        if let Some(source) = &self.source {
            write!(f, ", {source}")?;
        }
        write!(f, ")")
    }
}

impl std::error::Error for ValuationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_source_location_from_meta() {
        let mut meta = Metadata::new();
        assert!(SourceLocation::from_meta(&meta).is_none());

        meta.insert(
            "filename".to_string(),
            MetaValue::String("ledger.beancount".to_string()),
        );
        meta.insert("lineno".to_string(), MetaValue::Number(dec!(12)));
        let loc = SourceLocation::from_meta(&meta).unwrap();
        assert_eq!(loc.to_string(), "ledger.beancount:12");
    }

    #[test]
    fn test_error_display() {
        let err = ValuationError::new(
            ErrorKind::Arithmetic,
            "balance of Assets:Broker is zero",
            date(2024, 6, 1),
            &Metadata::new(),
        );
        assert_eq!(err.to_string(), "balance of Assets:Broker is zero (2024-06-01)");
        assert_eq!(err.kind.to_string(), "arithmetic");
    }

    #[test]
    fn test_default_options() {
        let options = PluginOptions::default();
        assert_eq!(options.booking_method, BookingMethod::Strict);
        assert_eq!(options.precision, 7);
        assert_eq!(options.commodity_anchor, CommodityAnchor::LastDirective);
    }
}
