//! Valuation pass for beancount-style ledgers.
//!
//! Accounts whose true worth is only known from periodic external reports
//! (brokerage accounts, pensions) are re-denominated into a synthetic unit.
//! The unit's price is derived from `valuation` snapshots, and every native
//! posting on a mapped account becomes a buy or sell of the unit at the last
//! known price.
//!
//! # Directives
//!
//! ```text
//! 2024-01-01 custom "valuation-config" "{\"Assets:Broker\": [\"BROKERU\", \"Income:Broker:PnL\"]}"
//! 2024-01-01 balance Assets:Broker 1000 USD
//! 2024-02-01 custom "valuation" Assets:Broker 1800 USD
//! ```
//!
//! # Components
//!
//! - [`MappingRegistry`] - account to synthetic unit table
//! - [`BalanceTracker`] - running synthetic holdings
//! - [`PriceSynthesizer`] - the price series of each unit
//! - [`rewrite_posting`] - native posting to synthetic buy/sell
//! - [`CommodityDefiner`] - declarations for undeclared units
//! - [`ValuationPass`] - the pass tying them together
//!
//! # Example
//!
//! ```
//! use beanval_core::{Amount, Balance, Directive, NaiveDate};
//! use beanval_plugin::{valuation, PluginInput};
//! use rust_decimal_macros::dec;
//!
//! let input = PluginInput {
//!     directives: vec![Directive::Balance(Balance::new(
//!         NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!         "Assets:Broker",
//!         Amount::new(dec!(1000), "USD"),
//!     ))],
//!     config: Some(r#"{"Assets:Broker": ["BROKERU", "Income:Broker:PnL"]}"#.to_string()),
//!     ..PluginInput::default()
//! };
//!
//! let output = valuation(input).unwrap();
//! assert!(output.errors.is_empty());
//! // The seeding assertion is consumed; a commodity and a 1.0 price remain.
//! assert_eq!(output.directives.len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod commodity;
pub mod config;
pub mod price;
pub mod processor;
pub mod rewrite;
pub mod types;

pub use balance::BalanceTracker;
pub use commodity::CommodityDefiner;
pub use config::{parse_mapping, AccountMapping, ConfigError, MappingRegistry};
pub use price::{PriceError, PricePoint, PriceSynthesizer};
pub use processor::{valuation, ValuationPass, CONFIG_DIRECTIVE, VALUATION_DIRECTIVE};
pub use rewrite::{rewrite_posting, Rewrite, RewriteError};
pub use types::{
    CommodityAnchor, ErrorKind, PluginInput, PluginOptions, PluginOutput, SourceLocation,
    ValuationError, DEFAULT_PRECISION,
};
