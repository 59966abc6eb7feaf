//! Running synthetic-unit holdings per mapped account.

use rust_decimal::Decimal;
use std::collections::HashMap;

/// One scalar holding per mapped account.
///
/// Deltas are already converted to synthetic units by the caller.
#[derive(Debug, Clone, Default)]
pub struct BalanceTracker {
    balances: HashMap<String, Decimal>,
}

impl BalanceTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current holding, zero if the account was never touched.
    #[must_use]
    pub fn get(&self, account: &str) -> Decimal {
        self.balances.get(account).copied().unwrap_or(Decimal::ZERO)
    }

    /// Check if the account has a holding (possibly zero).
    #[must_use]
    pub fn contains(&self, account: &str) -> bool {
        self.balances.contains_key(account)
    }

    /// Add a delta to the account's holding.
    pub fn add(&mut self, account: &str, delta: Decimal) {
        *self.balances.entry(account.to_string()).or_default() += delta;
    }

    /// Set the baseline of a fresh account.
    ///
    /// Returns `false`, leaving the holding untouched, if the account already
    /// has one.
    pub fn seed(&mut self, account: &str, baseline: Decimal) -> bool {
        if self.contains(account) {
            return false;
        }
        self.balances.insert(account.to_string(), baseline);
        true
    }
}
