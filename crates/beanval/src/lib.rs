//! Command-line front end for the valuation pass.
//!
//! The `beanval` binary reads a JSON array of directives, re-denominates the
//! mapped accounts and prints the resulting ledger:
//!
//! ```bash
//! beanval --config '{"Assets:Broker": ["BROKERU", "Income:Broker:PnL"]}' ledger.json
//! beanval --format json ledger.json
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cmd;
