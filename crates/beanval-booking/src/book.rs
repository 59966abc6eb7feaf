//! Cost resolution for rewritten transactions.
//!
//! [`CostResolver`] is the seam between the valuation pass and lot booking.
//! [`LotBooker`] is the implementation used by default: it matches postings
//! held at cost against per-account inventories, interpolates the remaining
//! missing amounts, and verifies the result balances.

use beanval_core::{
    Amount, BookingMethod, CostSpec, IncompleteAmount, Inventory, InventoryError, Metadata,
    NaiveDate, Position, Posting, Transaction,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

use crate::{first_imbalance, interpolate, transaction_tolerances, InterpolationError};

/// Per-account booking method selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingMethods {
    /// Method for accounts without an explicit one.
    pub default: BookingMethod,
    /// Methods declared on `open` directives.
    pub per_account: HashMap<String, BookingMethod>,
}

impl BookingMethods {
    /// Create a selector with the given default.
    #[must_use]
    pub fn new(default: BookingMethod) -> Self {
        Self {
            default,
            per_account: HashMap::new(),
        }
    }

    /// Set the method for one account.
    #[must_use]
    pub fn with_account(mut self, account: impl Into<String>, method: BookingMethod) -> Self {
        self.per_account.insert(account.into(), method);
        self
    }

    /// Look up the method for an account.
    #[must_use]
    pub fn get(&self, account: &str) -> BookingMethod {
        self.per_account
            .get(account)
            .copied()
            .unwrap_or(self.default)
    }
}

/// Error raised while booking one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookError {
    /// Missing amounts could not be filled in.
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    /// A reduction could not be matched against the account's lots.
    #[error("{account}: {source}")]
    Reduction {
        /// The account being reduced.
        account: String,
        /// Why the inventory refused the reduction.
        #[source]
        source: InventoryError,
    },

    /// An augmentation at cost is missing its per-unit or total number.
    #[error("{account}: cannot resolve cost {spec} for {units}")]
    UnresolvedCost {
        /// The account being augmented.
        account: String,
        /// The units being added.
        units: Amount,
        /// The incomplete cost specification.
        spec: CostSpec,
    },

    /// The booked transaction does not balance.
    #[error("transaction does not balance: residual {residual} {currency}")]
    Unbalanced {
        /// The unbalanced currency.
        currency: String,
        /// The residual amount.
        residual: Decimal,
    },
}

/// A booking error together with the transaction it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingFailure {
    /// Date of the failing transaction.
    pub date: NaiveDate,
    /// Metadata of the failing transaction (carries its source location).
    pub meta: Metadata,
    /// What went wrong.
    pub error: BookError,
}

impl BookingFailure {
    fn new(transaction: &Transaction, error: BookError) -> Self {
        Self {
            date: transaction.date,
            meta: transaction.meta.clone(),
            error,
        }
    }
}

/// Booked transactions plus any failures.
///
/// Every input transaction appears in `transactions`, in input order. A
/// transaction that failed to book is returned as far as it got.
#[derive(Debug, Clone, Default)]
pub struct BookingOutcome {
    /// The resolved transactions.
    pub transactions: Vec<Transaction>,
    /// Errors to merge into the caller's error list.
    pub errors: Vec<BookingFailure>,
}

/// Resolves unfilled amounts and costs on a list of transactions.
pub trait CostResolver {
    /// Book `transactions` in order using `methods` to pick lots.
    fn book(&self, transactions: Vec<Transaction>, methods: &BookingMethods) -> BookingOutcome;
}

/// Inventory-based lot booking.
///
/// Inventories are local to one call: only the transactions handed in are
/// booked against each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct LotBooker;

impl LotBooker {
    /// Create a new booker.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CostResolver for LotBooker {
    fn book(&self, transactions: Vec<Transaction>, methods: &BookingMethods) -> BookingOutcome {
        let mut inventories: HashMap<String, Inventory> = HashMap::new();
        let mut outcome = BookingOutcome::default();

        for txn in transactions {
            let (booked, errors) = book_transaction(txn, methods, &mut inventories);
            outcome.errors.extend(errors);
            outcome.transactions.push(booked);
        }

        outcome
    }
}

fn book_transaction(
    txn: Transaction,
    methods: &BookingMethods,
    inventories: &mut HashMap<String, Inventory>,
) -> (Transaction, Vec<BookingFailure>) {
    let mut errors = Vec::new();
    let mut postings = Vec::with_capacity(txn.postings.len());

    // Lots are matched first so that reductions carry a cost to weigh by.
    for posting in &txn.postings {
        match book_at_cost(posting, txn.date, methods, inventories) {
            Ok(booked) => postings.extend(booked),
            Err(e) => {
                errors.push(BookingFailure::new(&txn, e));
                postings.push(posting.clone());
            }
        }
    }

    let tolerances = transaction_tolerances(&txn);
    let resolved = txn.clone().with_postings(postings);
    let booked = match interpolate(&resolved) {
        Ok(result) => result.transaction,
        Err(e) => {
            errors.push(BookingFailure::new(&txn, e.into()));
            return (txn, errors);
        }
    };

    for posting in booked.postings.iter().filter(|p| p.cost.is_none()) {
        if let Some(units) = posting.amount() {
            inventories
                .entry(posting.account.clone())
                .or_default()
                .add(Position::simple(units.clone()));
        }
    }

    if let Some((currency, residual)) = first_imbalance(&booked, &tolerances) {
        errors.push(BookingFailure::new(
            &booked,
            BookError::Unbalanced { currency, residual },
        ));
    }

    (booked, errors)
}

/// Book a posting held at cost, returning the posting(s) that replace it.
///
/// Postings without a cost or without complete units are returned as is.
fn book_at_cost(
    posting: &Posting,
    date: NaiveDate,
    methods: &BookingMethods,
    inventories: &mut HashMap<String, Inventory>,
) -> Result<Vec<Posting>, BookError> {
    let (Some(units), Some(spec)) = (posting.amount(), &posting.cost) else {
        return Ok(vec![posting.clone()]);
    };
    let inventory = inventories.entry(posting.account.clone()).or_default();

    let is_reduction = inventory
        .positions()
        .iter()
        .any(|p| p.cost.is_some() && p.can_reduce(units));

    if !is_reduction {
        let cost = spec
            .resolve(units.number, date)
            .ok_or_else(|| BookError::UnresolvedCost {
                account: posting.account.clone(),
                units: units.clone(),
                spec: spec.clone(),
            })?;
        let mut booked = posting.clone();
        booked.cost = Some(CostSpec::from(&cost));
        inventory.add(Position::with_cost(units.clone(), cost));
        return Ok(vec![booked]);
    }

    let result = inventory
        .reduce(units, spec, methods.get(&posting.account))
        .map_err(|source| BookError::Reduction {
            account: posting.account.clone(),
            source,
        })?;

    // One posting per matched lot, each with the lot's cost filled in.
    let booked = result
        .matched
        .iter()
        .map(|lot| {
            let mut split = posting.clone();
            split.units = Some(IncompleteAmount::Complete(-&lot.units));
            split.cost = lot.cost.as_ref().map(CostSpec::from);
            split
        })
        .collect();
    Ok(booked)
}
