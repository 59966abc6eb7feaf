//! Directive types of the host ledger schema.
//!
//! The valuation pass reads and writes these directives:
//!
//! - [`Transaction`] - Transfers between accounts, rewritten when they touch
//!   a mapped account
//! - [`Balance`] - Balance assertions, which seed a mapped account
//! - [`Commodity`] - Commodity declarations, synthesized for synthetic units
//! - [`Price`] - Price points emitted for synthetic units
//! - [`Custom`] - Carries the `valuation-config` and `valuation` kinds
//! - [`Open`], [`Close`], [`Pad`], [`Note`] - Passed through untouched
//!   (`Open` also contributes per-account booking methods)

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::{Amount, CostSpec, IncompleteAmount};

/// Metadata value types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaValue {
    /// String value
    String(String),
    /// Account reference
    Account(String),
    /// Currency code
    Currency(String),
    /// Date value
    Date(NaiveDate),
    /// Numeric value
    Number(Decimal),
    /// Boolean value
    Bool(bool),
    /// Amount value
    Amount(Amount),
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Self::Account(a) => write!(f, "{a}"),
            Self::Currency(c) => write!(f, "{c}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Self::Amount(a) => write!(f, "{a}"),
        }
    }
}

/// Metadata is a key-value map attached to directives and postings.
///
/// Loaders record the source location under the `filename` and `lineno` keys.
pub type Metadata = HashMap<String, MetaValue>;

/// A posting within a transaction.
///
/// When `units` is `None` the amount is filled in by interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// The account for this posting
    pub account: String,
    /// The units (may be incomplete or None for auto-calculated postings)
    #[serde(default)]
    pub units: Option<IncompleteAmount>,
    /// Cost specification for the position
    #[serde(default)]
    pub cost: Option<CostSpec>,
    /// Price annotation (@ or @@)
    #[serde(default)]
    pub price: Option<PriceAnnotation>,
    /// Posting flag, if any
    #[serde(default)]
    pub flag: Option<char>,
    /// Posting metadata
    #[serde(default)]
    pub meta: Metadata,
}

impl Posting {
    /// Create a new posting with the given account and complete units.
    #[must_use]
    pub fn new(account: impl Into<String>, units: Amount) -> Self {
        Self::with_incomplete(account, IncompleteAmount::Complete(units))
    }

    /// Create a new posting with an incomplete amount.
    #[must_use]
    pub fn with_incomplete(account: impl Into<String>, units: IncompleteAmount) -> Self {
        Self {
            account: account.into(),
            units: Some(units),
            cost: None,
            price: None,
            flag: None,
            meta: Metadata::new(),
        }
    }

    /// Create a posting without any amount (to be fully interpolated).
    #[must_use]
    pub fn auto(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            units: None,
            cost: None,
            price: None,
            flag: None,
            meta: Metadata::new(),
        }
    }

    /// Get the complete amount if available.
    #[must_use]
    pub fn amount(&self) -> Option<&Amount> {
        self.units.as_ref().and_then(IncompleteAmount::as_amount)
    }

    /// Add a cost specification.
    #[must_use]
    pub fn with_cost(mut self, cost: CostSpec) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Add a price annotation.
    #[must_use]
    pub fn with_price(mut self, price: PriceAnnotation) -> Self {
        self.price = Some(price);
        self
    }

    /// Add a flag.
    #[must_use]
    pub const fn with_flag(mut self, flag: char) -> Self {
        self.flag = Some(flag);
        self
    }
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ")?;
        if let Some(flag) = self.flag {
            write!(f, "{flag} ")?;
        }
        write!(f, "{}", self.account)?;
        if let Some(units) = &self.units {
            write!(f, "  {units}")?;
        }
        if let Some(cost) = &self.cost {
            write!(f, " {cost}")?;
        }
        if let Some(price) = &self.price {
            write!(f, " {price}")?;
        }
        Ok(())
    }
}

/// Price annotation for a posting (@ or @@).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceAnnotation {
    /// Per-unit price (@)
    Unit(Amount),
    /// Total price (@@)
    Total(Amount),
}

impl PriceAnnotation {
    /// Get the annotated amount.
    #[must_use]
    pub const fn amount(&self) -> &Amount {
        match self {
            Self::Unit(a) | Self::Total(a) => a,
        }
    }

    /// Check if this is a per-unit price (@ vs @@).
    #[must_use]
    pub const fn is_unit(&self) -> bool {
        matches!(self, Self::Unit(_))
    }
}

impl fmt::Display for PriceAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit(a) => write!(f, "@ {a}"),
            Self::Total(a) => write!(f, "@@ {a}"),
        }
    }
}

/// Directive ordering priority for sorting.
///
/// When directives have the same date, they are sorted by type priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirectivePriority {
    /// Open accounts first so they exist before use
    Open = 0,
    /// Commodities declared before use
    Commodity = 1,
    /// Padding before balance assertions
    Pad = 2,
    /// Balance assertions checked at start of day
    Balance = 3,
    /// Main entries and custom directives, kept in file order
    Transaction = 4,
    /// Annotations after transactions
    Note = 5,
    /// Prices at end of day
    Price = 6,
    /// Accounts closed after all activity
    Close = 7,
}

/// All directive types in the host schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// Transaction directive
    Transaction(Transaction),
    /// Balance assertion
    Balance(Balance),
    /// Open account
    Open(Open),
    /// Close account
    Close(Close),
    /// Commodity declaration
    Commodity(Commodity),
    /// Pad directive
    Pad(Pad),
    /// Note directive
    Note(Note),
    /// Price directive
    Price(Price),
    /// Custom directive
    Custom(Custom),
}

impl Directive {
    /// Get the date of this directive.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        match self {
            Self::Transaction(t) => t.date,
            Self::Balance(b) => b.date,
            Self::Open(o) => o.date,
            Self::Close(c) => c.date,
            Self::Commodity(c) => c.date,
            Self::Pad(p) => p.date,
            Self::Note(n) => n.date,
            Self::Price(p) => p.date,
            Self::Custom(c) => c.date,
        }
    }

    /// Get the metadata of this directive.
    #[must_use]
    pub const fn meta(&self) -> &Metadata {
        match self {
            Self::Transaction(t) => &t.meta,
            Self::Balance(b) => &b.meta,
            Self::Open(o) => &o.meta,
            Self::Close(c) => &c.meta,
            Self::Commodity(c) => &c.meta,
            Self::Pad(p) => &p.meta,
            Self::Note(n) => &n.meta,
            Self::Price(p) => &p.meta,
            Self::Custom(c) => &c.meta,
        }
    }

    /// Get as a transaction, if this is one.
    #[must_use]
    pub const fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            Self::Transaction(t) => Some(t),
            _ => None,
        }
    }

    /// Get the directive type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Transaction(_) => "transaction",
            Self::Balance(_) => "balance",
            Self::Open(_) => "open",
            Self::Close(_) => "close",
            Self::Commodity(_) => "commodity",
            Self::Pad(_) => "pad",
            Self::Note(_) => "note",
            Self::Price(_) => "price",
            Self::Custom(_) => "custom",
        }
    }

    /// Get the sorting priority for this directive.
    #[must_use]
    pub const fn priority(&self) -> DirectivePriority {
        match self {
            Self::Open(_) => DirectivePriority::Open,
            Self::Commodity(_) => DirectivePriority::Commodity,
            Self::Pad(_) => DirectivePriority::Pad,
            Self::Balance(_) => DirectivePriority::Balance,
            Self::Transaction(_) | Self::Custom(_) => DirectivePriority::Transaction,
            Self::Note(_) => DirectivePriority::Note,
            Self::Price(_) => DirectivePriority::Price,
            Self::Close(_) => DirectivePriority::Close,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transaction(t) => write!(f, "{t}"),
            Self::Balance(b) => write!(f, "{b}"),
            Self::Open(o) => write!(f, "{o}"),
            Self::Close(c) => write!(f, "{c}"),
            Self::Commodity(c) => write!(f, "{c}"),
            Self::Pad(p) => write!(f, "{p}"),
            Self::Note(n) => write!(f, "{n}"),
            Self::Price(p) => write!(f, "{p}"),
            Self::Custom(c) => write!(f, "{c}"),
        }
    }
}

/// Sort directives by date, then by type priority.
///
/// The sort is stable, so file order survives for directives with the same
/// date and type.
pub fn sort_directives(directives: &mut [Directive]) {
    directives.sort_by(|a, b| {
        a.date()
            .cmp(&b.date())
            .then_with(|| a.priority().cmp(&b.priority()))
    });
}

/// A transaction directive.
///
/// Transactions must balance: the weights of all postings sum to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction date
    pub date: NaiveDate,
    /// Transaction flag (* or !)
    pub flag: char,
    /// Payee (optional)
    #[serde(default)]
    pub payee: Option<String>,
    /// Narration (description)
    #[serde(default)]
    pub narration: String,
    /// Tags attached to this transaction
    #[serde(default)]
    pub tags: Vec<String>,
    /// Links attached to this transaction
    #[serde(default)]
    pub links: Vec<String>,
    /// Transaction metadata
    #[serde(default)]
    pub meta: Metadata,
    /// Postings
    #[serde(default)]
    pub postings: Vec<Posting>,
}

impl Transaction {
    /// Create a new transaction.
    #[must_use]
    pub fn new(date: NaiveDate, narration: impl Into<String>) -> Self {
        Self {
            date,
            flag: '*',
            payee: None,
            narration: narration.into(),
            tags: Vec::new(),
            links: Vec::new(),
            meta: Metadata::new(),
            postings: Vec::new(),
        }
    }

    /// Set the flag.
    #[must_use]
    pub const fn with_flag(mut self, flag: char) -> Self {
        self.flag = flag;
        self
    }

    /// Set the payee.
    #[must_use]
    pub fn with_payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = Some(payee.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add a posting.
    #[must_use]
    pub fn with_posting(mut self, posting: Posting) -> Self {
        self.postings.push(posting);
        self
    }

    /// Replace the postings, keeping everything else.
    #[must_use]
    pub fn with_postings(mut self, postings: Vec<Posting>) -> Self {
        self.postings = postings;
        self
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.flag)?;
        if let Some(payee) = &self.payee {
            write!(f, " \"{payee}\"")?;
        }
        write!(f, " \"{}\"", self.narration)?;
        for tag in &self.tags {
            write!(f, " #{tag}")?;
        }
        for link in &self.links {
            write!(f, " ^{link}")?;
        }
        for posting in &self.postings {
            write!(f, "\n{posting}")?;
        }
        Ok(())
    }
}

/// A balance assertion directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Assertion date
    pub date: NaiveDate,
    /// Account to check
    pub account: String,
    /// Expected amount
    pub amount: Amount,
    /// Tolerance (if explicitly specified)
    #[serde(default)]
    pub tolerance: Option<Decimal>,
    /// Metadata
    #[serde(default)]
    pub meta: Metadata,
}

impl Balance {
    /// Create a new balance assertion.
    #[must_use]
    pub fn new(date: NaiveDate, account: impl Into<String>, amount: Amount) -> Self {
        Self {
            date,
            account: account.into(),
            amount,
            tolerance: None,
            meta: Metadata::new(),
        }
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} balance {} {}", self.date, self.account, self.amount)?;
        if let Some(tol) = self.tolerance {
            write!(f, " ~ {tol}")?;
        }
        Ok(())
    }
}

/// An open account directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Open {
    /// Date account was opened
    pub date: NaiveDate,
    /// Account name
    pub account: String,
    /// Allowed currencies (empty = any currency allowed)
    #[serde(default)]
    pub currencies: Vec<String>,
    /// Booking method keyword for this account
    #[serde(default)]
    pub booking: Option<String>,
    /// Metadata
    #[serde(default)]
    pub meta: Metadata,
}

impl Open {
    /// Create a new open directive.
    #[must_use]
    pub fn new(date: NaiveDate, account: impl Into<String>) -> Self {
        Self {
            date,
            account: account.into(),
            currencies: Vec::new(),
            booking: None,
            meta: Metadata::new(),
        }
    }

    /// Set booking method.
    #[must_use]
    pub fn with_booking(mut self, booking: impl Into<String>) -> Self {
        self.booking = Some(booking.into());
        self
    }
}

impl fmt::Display for Open {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} open {}", self.date, self.account)?;
        if !self.currencies.is_empty() {
            write!(f, " {}", self.currencies.join(","))?;
        }
        if let Some(booking) = &self.booking {
            write!(f, " \"{booking}\"")?;
        }
        Ok(())
    }
}

/// A close account directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Close {
    /// Date account was closed
    pub date: NaiveDate,
    /// Account name
    pub account: String,
    /// Metadata
    #[serde(default)]
    pub meta: Metadata,
}

impl fmt::Display for Close {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} close {}", self.date, self.account)
    }
}

/// A commodity declaration directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commodity {
    /// Declaration date
    pub date: NaiveDate,
    /// Currency/commodity code
    pub currency: String,
    /// Metadata
    #[serde(default)]
    pub meta: Metadata,
}

impl Commodity {
    /// Create a new commodity declaration.
    #[must_use]
    pub fn new(date: NaiveDate, currency: impl Into<String>) -> Self {
        Self {
            date,
            currency: currency.into(),
            meta: Metadata::new(),
        }
    }

    /// Set the metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: Metadata) -> Self {
        self.meta = meta;
        self
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} commodity {}", self.date, self.currency)
    }
}

/// A pad directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pad {
    /// Pad date
    pub date: NaiveDate,
    /// Account to pad
    pub account: String,
    /// Source account for padding
    pub source_account: String,
    /// Metadata
    #[serde(default)]
    pub meta: Metadata,
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pad {} {}",
            self.date, self.account, self.source_account
        )
    }
}

/// A note directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Note date
    pub date: NaiveDate,
    /// Account
    pub account: String,
    /// Note text
    pub comment: String,
    /// Metadata
    #[serde(default)]
    pub meta: Metadata,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} note {} \"{}\"",
            self.date, self.account, self.comment
        )
    }
}

/// A price directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Price date
    pub date: NaiveDate,
    /// Currency being priced
    pub currency: String,
    /// Price amount (in another currency)
    pub amount: Amount,
    /// Metadata
    #[serde(default)]
    pub meta: Metadata,
}

impl Price {
    /// Create a new price directive.
    #[must_use]
    pub fn new(date: NaiveDate, currency: impl Into<String>, amount: Amount) -> Self {
        Self {
            date,
            currency: currency.into(),
            amount,
            meta: Metadata::new(),
        }
    }

    /// Set the metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: Metadata) -> Self {
        self.meta = meta;
        self
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} price {} {}", self.date, self.currency, self.amount)
    }
}

/// A custom directive.
///
/// User-defined directive type for extensions, such as
/// `custom "valuation" Assets:Broker 1800 USD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Custom {
    /// Custom directive date
    pub date: NaiveDate,
    /// Custom type name (e.g., "valuation", "budget")
    pub custom_type: String,
    /// Values/arguments for this custom directive
    #[serde(default)]
    pub values: Vec<MetaValue>,
    /// Metadata
    #[serde(default)]
    pub meta: Metadata,
}

impl Custom {
    /// Create a new custom directive.
    #[must_use]
    pub fn new(date: NaiveDate, custom_type: impl Into<String>) -> Self {
        Self {
            date,
            custom_type: custom_type.into(),
            values: Vec::new(),
            meta: Metadata::new(),
        }
    }

    /// Add a value.
    #[must_use]
    pub fn with_value(mut self, value: MetaValue) -> Self {
        self.values.push(value);
        self
    }
}

impl fmt::Display for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} custom \"{}\"", self.date, self.custom_type)?;
        for value in &self.values {
            write!(f, " {value}")?;
        }
        Ok(())
    }
}
