//! Core ledger types for beanval.
//!
//! This crate provides the host directive schema that the valuation pass
//! consumes and produces:
//!
//! - [`Amount`] - A decimal number with a currency
//! - [`IncompleteAmount`] - A posting amount still awaiting interpolation
//! - [`Cost`] / [`CostSpec`] - Lot costs and partial lot specifications
//! - [`Position`] / [`Inventory`] - Holdings and lot reduction
//! - [`BookingMethod`] - How to match lots when reducing positions
//! - [`Directive`] - The closed set of ledger directives
//!
//! # Example
//!
//! ```
//! use beanval_core::{round_units, RoundingDirection};
//! use rust_decimal_macros::dec;
//!
//! // Buying 500 USD worth of a unit priced at 1.2 USD
//! let units = round_units(dec!(500) / dec!(1.2), 7, RoundingDirection::Up);
//! assert_eq!(units.to_string(), "416.6666667");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod amount;
pub mod cost;
pub mod directive;
pub mod inventory;
pub mod position;

pub use amount::{round_units, Amount, IncompleteAmount, RoundingDirection};
pub use cost::{Cost, CostSpec};
pub use directive::{
    sort_directives, Balance, Close, Commodity, Custom, Directive, DirectivePriority, MetaValue,
    Metadata, Note, Open, Pad, Posting, Price, PriceAnnotation, Transaction,
};
pub use inventory::{BookingMethod, BookingResult, Inventory, InventoryError};
pub use position::Position;

// Re-export commonly used external types
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;
