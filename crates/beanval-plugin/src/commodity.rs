//! Auto-definition of undeclared synthetic commodities.

use beanval_core::{Commodity, Metadata, NaiveDate};
use std::collections::{HashMap, HashSet};

use crate::types::CommodityAnchor;

/// Tracks declared commodities and where synthetic units were first used.
#[derive(Debug, Clone, Default)]
pub struct CommodityDefiner {
    declared: HashSet<String>,
    first_use: HashMap<String, (NaiveDate, Metadata)>,
}

impl CommodityDefiner {
    /// Create an empty definer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user-declared commodity.
    pub fn declare(&mut self, currency: &str) {
        self.declared.insert(currency.to_string());
    }

    /// Record a use of a synthetic currency; only the first one is kept.
    pub fn record_use(&mut self, currency: &str, date: NaiveDate, meta: &Metadata) {
        self.first_use
            .entry(currency.to_string())
            .or_insert_with(|| (date, meta.clone()));
    }

    /// Emit one declaration per undeclared currency, in the given order.
    ///
    /// `last` is the date and metadata of the last input directive. Without
    /// it nothing is emitted.
    pub fn finish<'a>(
        &self,
        currencies: impl IntoIterator<Item = &'a str>,
        anchor: CommodityAnchor,
        last: Option<(NaiveDate, &Metadata)>,
    ) -> Vec<Commodity> {
        let Some((last_date, last_meta)) = last else {
            return Vec::new();
        };

        currencies
            .into_iter()
            .filter(|c| !self.declared.contains(*c))
            .map(|currency| {
                let (date, meta) = match (anchor, self.first_use.get(currency)) {
                    (CommodityAnchor::FirstUse, Some((date, meta))) => (*date, meta.clone()),
                    _ => (last_date, last_meta.clone()),
                };
                tracing::debug!(currency, %date, "auto-defining commodity");
                Commodity::new(date, currency).with_meta(meta)
            })
            .collect()
    }
}
