//! Validation Errors
//!
//! Configuration problems caught when a promotion is saved. These are distinct
//! from an order simply not qualifying for a promotion, which is a normal
//! outcome and never an error.

use thiserror::Error;

/// A promotion configuration that cannot be saved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required parameter was not supplied.
    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),

    /// A percentage parameter lies outside 0–100%.
    #[error("`{0}` must be between 0% and 100%")]
    PercentageOutOfRange(&'static str),

    /// A monetary parameter is negative.
    #[error("`{0}` must not be negative")]
    NegativeAmount(&'static str),

    /// A quantity parameter is zero.
    #[error("`{0}` must be at least 1")]
    ZeroQuantity(&'static str),

    /// A monetary parameter uses a different currency to the rest of the promotion.
    #[error("`{field}` uses {found}, but the promotion uses {expected}")]
    CurrencyMismatch {
        /// Offending parameter
        field: &'static str,
        /// Promotion currency
        expected: &'static str,
        /// Parameter currency
        found: &'static str,
    },

    /// A referenced product does not exist in the catalog.
    #[error("unknown product `{0}`")]
    UnknownProduct(String),

    /// A referenced category does not exist in the catalog.
    #[error("unknown category `{0}`")]
    UnknownCategory(String),

    /// A referenced attribute does not exist in the catalog.
    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),

    /// A reference list contained a blank entry.
    #[error("blank reference in `{0}`")]
    BlankReference(&'static str),

    /// A reference contains a comma.
    #[error("reference `{0}` must not contain a comma")]
    InvalidReference(String),

    /// A product appears more than once in a reward product list.
    #[error("product `{0}` is listed more than once")]
    DuplicateProduct(String),

    /// The promotion has neither a code nor automatic application.
    #[error("promotion code is required unless the promotion applies automatically")]
    MissingCode,

    /// The promotion code contains characters other than letters, digits, `-` and `_`.
    #[error("invalid promotion code `{0}`")]
    InvalidCode(String),

    /// The promotion name is blank.
    #[error("promotion name must not be blank")]
    BlankName,

    /// The validity window starts after it ends.
    #[error("validity window starts after it ends")]
    InvalidWindow,

    /// The validity window ended before the promotion could be published.
    #[error("validity window has already ended")]
    WindowElapsed,

    /// The rule set has no inclusion criteria, so it would match nothing.
    #[error("rule set must include at least one product, category or attribute")]
    EmptyRuleSet,

    /// A price string could not be parsed.
    #[error("invalid price `{0}`")]
    InvalidPrice(String),

    /// A currency code is not supported.
    #[error("unknown currency `{0}`")]
    UnknownCurrency(String),

    /// A percentage string could not be parsed.
    #[error("invalid percentage `{0}`")]
    InvalidPercentage(String),
}
