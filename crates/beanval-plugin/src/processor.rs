//! The single left-to-right valuation pass.

use beanval_booking::{BookingMethods, CostResolver, LotBooker};
use beanval_core::{
    Amount, Balance, BookingMethod, Custom, Directive, MetaValue, Metadata, NaiveDate, Open,
    Posting, Transaction,
};
use tracing::{debug, info, warn};

use crate::balance::BalanceTracker;
use crate::commodity::CommodityDefiner;
use crate::config::{parse_mapping, ConfigError, MappingRegistry};
use crate::price::PriceSynthesizer;
use crate::rewrite::{rewrite_posting, RewriteError};
use crate::types::{ErrorKind, PluginInput, PluginOptions, PluginOutput, ValuationError};

/// Custom directive type carrying the account mapping.
pub const CONFIG_DIRECTIVE: &str = "valuation-config";

/// Custom directive type carrying a reported account worth.
pub const VALUATION_DIRECTIVE: &str = "valuation";

/// The valuation pass, parameterized over the booking collaborator.
#[derive(Debug, Clone, Default)]
pub struct ValuationPass<R = LotBooker> {
    options: PluginOptions,
    resolver: R,
}

impl ValuationPass<LotBooker> {
    /// Create a pass booking with [`LotBooker`].
    #[must_use]
    pub const fn new(options: PluginOptions) -> Self {
        Self {
            options,
            resolver: LotBooker::new(),
        }
    }
}

impl<R: CostResolver> ValuationPass<R> {
    /// Create a pass with a custom booking collaborator.
    pub const fn with_resolver(options: PluginOptions, resolver: R) -> Self {
        Self { options, resolver }
    }

    /// Run the pass over `directives`.
    ///
    /// `config` seeds the mapping; `valuation-config` directives replace it.
    /// Only a malformed mapping is fatal.
    pub fn run(
        &self,
        directives: Vec<Directive>,
        config: Option<&str>,
    ) -> Result<PluginOutput, ConfigError> {
        let mut state = PassState::new(&self.options);
        if let Some(config) = config.filter(|c| !c.trim().is_empty()) {
            state.registry.set(parse_mapping(config)?);
        }

        let last = directives
            .last()
            .map(|d| (d.date(), d.meta().clone()));

        for directive in directives {
            state.process(directive)?;
        }

        let PassState {
            registry,
            prices,
            commodities,
            methods,
            passthrough,
            modified,
            mut errors,
            ..
        } = state;

        let rewritten = modified.len();
        let auto_defined = commodities.finish(
            registry.currencies(),
            self.options.commodity_anchor,
            last.as_ref().map(|(date, meta)| (*date, meta)),
        );
        let price_points = prices.into_directives();
        let outcome = self.resolver.book(modified, &methods);

        for failure in outcome.errors {
            let error = ValuationError::from(failure);
            warn!(kind = %error.kind, "{error}");
            errors.push(error);
        }

        info!(
            passthrough = passthrough.len(),
            rewritten,
            prices = price_points.len(),
            commodities = auto_defined.len(),
            errors = errors.len(),
            "valuation pass complete"
        );

        let mut output = passthrough;
        output.extend(auto_defined.into_iter().map(Directive::Commodity));
        output.extend(price_points.into_iter().map(Directive::Price));
        output.extend(outcome.transactions.into_iter().map(Directive::Transaction));

        Ok(PluginOutput {
            directives: output,
            errors,
        })
    }
}

/// Run the valuation pass with the default booking collaborator.
pub fn valuation(input: PluginInput) -> Result<PluginOutput, ConfigError> {
    ValuationPass::new(input.options).run(input.directives, input.config.as_deref())
}

/// Everything the pass mutates, owned for the duration of one run.
struct PassState {
    precision: u32,
    registry: MappingRegistry,
    balances: BalanceTracker,
    prices: PriceSynthesizer,
    commodities: CommodityDefiner,
    methods: BookingMethods,
    passthrough: Vec<Directive>,
    modified: Vec<Transaction>,
    errors: Vec<ValuationError>,
}

impl PassState {
    fn new(options: &PluginOptions) -> Self {
        Self {
            precision: options.precision,
            registry: MappingRegistry::new(),
            balances: BalanceTracker::new(),
            prices: PriceSynthesizer::new(),
            commodities: CommodityDefiner::new(),
            methods: BookingMethods::new(options.booking_method),
            passthrough: Vec::new(),
            modified: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn error(&mut self, kind: ErrorKind, message: impl Into<String>, date: NaiveDate, meta: &Metadata) {
        let error = ValuationError::new(kind, message, date, meta);
        warn!(kind = %error.kind, "{error}");
        self.errors.push(error);
    }

    fn process(&mut self, directive: Directive) -> Result<(), ConfigError> {
        match directive {
            Directive::Custom(custom) if custom.custom_type == CONFIG_DIRECTIVE => {
                self.configure(&custom)?;
            }
            Directive::Custom(custom) if custom.custom_type == VALUATION_DIRECTIVE => {
                self.revalue(&custom);
                self.passthrough.push(Directive::Custom(custom));
            }
            Directive::Transaction(txn) => self.transaction(txn),
            Directive::Balance(balance) => self.balance(balance),
            Directive::Commodity(commodity) => {
                self.commodities.declare(&commodity.currency);
                self.passthrough.push(Directive::Commodity(commodity));
            }
            Directive::Open(open) => {
                self.open(&open);
                self.passthrough.push(Directive::Open(open));
            }
            other => self.passthrough.push(other),
        }
        Ok(())
    }

    fn configure(&mut self, custom: &Custom) -> Result<(), ConfigError> {
        let Some(MetaValue::String(config)) = custom.values.first() else {
            return Err(ConfigError::NotAString { date: custom.date });
        };
        let mapping = parse_mapping(config)?;
        debug!(date = %custom.date, accounts = mapping.len(), "valuation mapping replaced");
        self.registry.set(mapping);
        Ok(())
    }

    fn open(&mut self, open: &Open) {
        let Some(keyword) = &open.booking else {
            return;
        };
        match keyword.parse::<BookingMethod>() {
            Ok(method) => {
                self.methods.per_account.insert(open.account.clone(), method);
            }
            Err(message) => {
                self.error(ErrorKind::InvalidDirective, message, open.date, &open.meta);
            }
        }
    }

    /// A balance assertion on a mapped account seeds its price and baseline.
    fn balance(&mut self, balance: Balance) {
        let Some(mapping) = self.registry.get(&balance.account).cloned() else {
            self.passthrough.push(Directive::Balance(balance));
            return;
        };

        if balance.amount.currency == mapping.currency {
            self.error(
                ErrorKind::CurrencyMismatch,
                format!(
                    "balance assertion on {} is already in {}; cannot seed a price for it",
                    balance.account, mapping.currency
                ),
                balance.date,
                &balance.meta,
            );
            self.passthrough.push(Directive::Balance(balance));
            return;
        }

        if !self.balances.seed(&balance.account, balance.amount.number) {
            self.error(
                ErrorKind::Sequencing,
                format!(
                    "balance assertion on {} after it already holds {} {}",
                    balance.account,
                    self.balances.get(&balance.account),
                    mapping.currency
                ),
                balance.date,
                &balance.meta,
            );
            self.passthrough.push(Directive::Balance(balance));
            return;
        }

        debug!(
            account = %balance.account,
            baseline = %balance.amount.number,
            currency = %mapping.currency,
            "seeded from balance assertion"
        );
        self.prices.seed(
            &mapping.currency,
            &balance.amount.currency,
            balance.date,
            &balance.meta,
        );
        self.commodities
            .record_use(&mapping.currency, balance.date, &balance.meta);
    }

    /// Derive a new price from a `valuation` directive.
    fn revalue(&mut self, custom: &Custom) {
        let (account, worth) = match valuation_args(custom) {
            Some(args) => args,
            None => {
                self.error(
                    ErrorKind::InvalidDirective,
                    "valuation directive must carry an account and an amount",
                    custom.date,
                    &custom.meta,
                );
                return;
            }
        };

        let Some(mapping) = self.registry.get(account).cloned() else {
            self.error(
                ErrorKind::Sequencing,
                format!("valuation of {account}, which is not mapped"),
                custom.date,
                &custom.meta,
            );
            return;
        };
        if !self.balances.contains(account) {
            self.error(
                ErrorKind::Sequencing,
                format!("valuation of {account} before any balance"),
                custom.date,
                &custom.meta,
            );
            return;
        }

        let balance = self.balances.get(account);
        match self
            .prices
            .revalue(&mapping.currency, worth, custom.date, balance, &custom.meta)
        {
            Ok(point) => {
                debug!(account, price = %point.price, balance = %balance, "revalued");
            }
            Err(e) => {
                self.error(
                    ErrorKind::Arithmetic,
                    format!("{account}: {e}"),
                    custom.date,
                    &custom.meta,
                );
            }
        }
    }

    fn transaction(&mut self, txn: Transaction) {
        if self.registry.is_empty()
            || !txn
                .postings
                .iter()
                .any(|p| self.registry.get(&p.account).is_some())
        {
            self.passthrough.push(Directive::Transaction(txn));
            return;
        }

        let mut postings: Vec<Posting> = Vec::with_capacity(txn.postings.len() + 2);
        let mut modified = false;

        for posting in &txn.postings {
            let Some(mapping) = self.registry.get(&posting.account).cloned() else {
                postings.push(posting.clone());
                continue;
            };

            // Already denominated in the synthetic unit.
            if let Some(units) = posting.amount().filter(|u| u.currency == mapping.currency) {
                self.balances.add(&posting.account, units.number);
                postings.push(posting.clone());
                continue;
            }

            let Some(units) = posting.amount() else {
                self.error(
                    ErrorKind::InvalidDirective,
                    format!(
                        "posting to {} has no amount to convert into {}",
                        posting.account, mapping.currency
                    ),
                    txn.date,
                    &txn.meta,
                );
                postings.push(posting.clone());
                continue;
            };

            let quote = match self.prices.quote(&mapping.currency).cloned() {
                Some(quote) => quote,
                None => {
                    debug!(
                        currency = %mapping.currency,
                        native = %units.currency,
                        date = %txn.date,
                        "seeded on first use"
                    );
                    self.prices
                        .seed(&mapping.currency, &units.currency, txn.date, &txn.meta)
                        .price
                        .clone()
                }
            };

            match rewrite_posting(posting, &mapping, &quote, self.precision) {
                Ok(rewrite) => {
                    debug!(
                        account = %posting.account,
                        converted = %rewrite.converted,
                        legs = rewrite.postings.len(),
                        "rewrote posting"
                    );
                    self.balances.add(&posting.account, rewrite.converted);
                    self.commodities
                        .record_use(&mapping.currency, txn.date, &txn.meta);
                    postings.extend(rewrite.postings);
                    modified = true;
                }
                Err(e) => {
                    let kind = match e {
                        RewriteError::MissingUnits { .. } => ErrorKind::InvalidDirective,
                        RewriteError::CurrencyMismatch { .. } => ErrorKind::CurrencyMismatch,
                        RewriteError::Conversion { .. } => ErrorKind::Arithmetic,
                    };
                    self.error(kind, e.to_string(), txn.date, &txn.meta);
                    postings.push(posting.clone());
                }
            }
        }

        if modified {
            self.modified.push(txn.with_postings(postings));
        } else {
            self.passthrough.push(Directive::Transaction(txn));
        }
    }
}

/// Extract `(account, worth)` from a `valuation` directive.
fn valuation_args(custom: &Custom) -> Option<(&str, &Amount)> {
    match custom.values.as_slice() {
        [MetaValue::Account(account) | MetaValue::String(account), MetaValue::Amount(worth), ..] => {
            Some((account.as_str(), worth))
        }
        _ => None,
    }
}
