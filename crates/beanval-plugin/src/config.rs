//! Account mapping configuration.
//!
//! The mapping is a JSON object from account name to either a
//! `[synthetic currency, offset account]` pair or a bare synthetic currency:
//!
//! ```text
//! {"Assets:Broker": ["BROKERU", "Income:Broker:PnL"], "Assets:Pension": "PENSIONU"}
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Fatal configuration error. Aborts the whole pass.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration is not valid JSON.
    #[error("invalid valuation config: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration is valid JSON but not an object.
    #[error("invalid valuation config: expected an object of account mappings")]
    NotAnObject,

    /// A mapping entry has the wrong shape.
    #[error("invalid valuation config for {account}: expected \"CURRENCY\" or [\"CURRENCY\", \"Offset:Account\"]")]
    InvalidEntry {
        /// The account with the malformed entry.
        account: String,
    },

    /// An account, currency or offset account name is empty.
    #[error("invalid valuation config: empty name in mapping for {account:?}")]
    EmptyName {
        /// The account with the empty name (may itself be empty).
        account: String,
    },

    /// A `valuation-config` directive does not carry a string value.
    #[error("valuation-config directive on {date} must carry the mapping as a string")]
    NotAString {
        /// Date of the directive.
        date: beanval_core::NaiveDate,
    },
}

/// Where one mapped account's holdings go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMapping {
    /// Synthetic currency the account is re-denominated into.
    pub currency: String,
    /// Account receiving the balancing leg of outflows.
    pub offset_account: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMapping {
    Pair(String, String),
    Currency(String),
}

/// Parse a mapping string.
pub fn parse_mapping(config: &str) -> Result<HashMap<String, AccountMapping>, ConfigError> {
    let value: Value = serde_json::from_str(config.trim())?;
    let Value::Object(entries) = value else {
        return Err(ConfigError::NotAnObject);
    };

    entries
        .into_iter()
        .map(|(account, raw)| {
            let raw: RawMapping =
                serde_json::from_value(raw).map_err(|_| ConfigError::InvalidEntry {
                    account: account.clone(),
                })?;
            let mapping = match raw {
                RawMapping::Pair(currency, offset) => AccountMapping {
                    currency,
                    offset_account: Some(offset),
                },
                RawMapping::Currency(currency) => AccountMapping {
                    currency,
                    offset_account: None,
                },
            };
            let empty_offset = mapping.offset_account.as_ref().is_some_and(String::is_empty);
            if account.is_empty() || mapping.currency.is_empty() || empty_offset {
                return Err(ConfigError::EmptyName { account });
            }
            Ok((account, mapping))
        })
        .collect()
}

/// Active account mapping table.
///
/// Each `set` replaces the table. Every synthetic currency that was ever
/// configured is remembered for commodity auto-definition.
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    mappings: HashMap<String, AccountMapping>,
    currencies: BTreeSet<String>,
}

impl MappingRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active mapping.
    pub fn set(&mut self, mappings: HashMap<String, AccountMapping>) {
        self.currencies
            .extend(mappings.values().map(|m| m.currency.clone()));
        self.mappings = mappings;
    }

    /// Look up the mapping for an account.
    #[must_use]
    pub fn get(&self, account: &str) -> Option<&AccountMapping> {
        self.mappings.get(account)
    }

    /// Check if no account is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Every synthetic currency configured so far, in name order.
    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.currencies.iter().map(String::as_str)
    }
}
