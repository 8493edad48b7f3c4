//! Orders
//!
//! Read-only order snapshots taken at checkout and the eligible portion of an
//! order for a given rule set.

use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{catalog::CatalogItem, rules::RuleSet};

/// Most units a single line may carry.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// Errors related to order snapshot construction or totals.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// A line's currency differs from the order currency (index, line currency, order currency).
    #[error("Line {0} has currency {1}, but order has currency {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),

    /// A line has a zero quantity.
    #[error("Line {0} has zero quantity")]
    ZeroQuantity(usize),

    /// A line has more than [`MAX_LINE_QUANTITY`] units (index, quantity).
    #[error("Line {0} has quantity {1}, more than the limit of {MAX_LINE_QUANTITY}")]
    QuantityTooLarge(usize, u32),

    /// A line has a negative unit price.
    #[error("Line {0} has a negative unit price")]
    NegativePrice(usize),

    /// Line totals overflowed the minor unit range.
    #[error("order total overflowed")]
    Overflow,
}

/// A single order line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem<'a> {
    item: CatalogItem,
    unit_price: Money<'a, Currency>,
    quantity: u32,
}

impl<'a> LineItem<'a> {
    /// Create a new line.
    pub fn new(item: CatalogItem, unit_price: Money<'a, Currency>, quantity: u32) -> Self {
        Self {
            item,
            unit_price,
            quantity,
        }
    }

    /// The catalog item on this line.
    pub fn item(&self) -> &CatalogItem {
        &self.item
    }

    /// Price of one unit.
    pub fn unit_price(&self) -> &Money<'a, Currency> {
        &self.unit_price
    }

    /// Number of units.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    fn total_minor(&self) -> Result<i64, OrderError> {
        self.unit_price
            .to_minor_units()
            .checked_mul(i64::from(self.quantity))
            .ok_or(OrderError::Overflow)
    }
}

/// Snapshot of an order at the moment promotions are evaluated.
#[derive(Debug, Clone)]
pub struct OrderSnapshot<'a> {
    lines: Vec<LineItem<'a>>,
    currency: &'static Currency,
    customer_segments: SmallVec<[String; 2]>,
    entered_codes: SmallVec<[String; 1]>,
    channel: Option<String>,
    store: Option<String>,
}

impl<'a> OrderSnapshot<'a> {
    /// Create an empty order in the given currency.
    pub fn new(currency: &'static Currency) -> Self {
        Self {
            lines: Vec::new(),
            currency,
            customer_segments: SmallVec::new(),
            entered_codes: SmallVec::new(),
            channel: None,
            store: None,
        }
    }

    /// Create an order with the given lines.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` if a line has a different currency, a zero
    /// quantity or a negative price.
    pub fn with_lines(
        lines: impl Into<Vec<LineItem<'a>>>,
        currency: &'static Currency,
    ) -> Result<Self, OrderError> {
        let lines = lines.into();

        lines
            .iter()
            .enumerate()
            .try_for_each(|(i, line)| check_line(i, line, currency))?;

        Ok(Self {
            lines,
            ..Self::new(currency)
        })
    }

    /// Append a line.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` if the line is invalid for this order.
    pub fn push(&mut self, line: LineItem<'a>) -> Result<(), OrderError> {
        check_line(self.lines.len(), &line, self.currency)?;

        self.lines.push(line);

        Ok(())
    }

    /// Attach the customer's audience segments.
    #[must_use]
    pub fn with_segments(mut self, segments: &[&str]) -> Self {
        self.customer_segments
            .extend(segments.iter().map(|segment| (*segment).to_string()));
        self
    }

    /// Record a promotion code the customer entered at checkout.
    #[must_use]
    pub fn with_code(mut self, code: &str) -> Self {
        self.entered_codes.push(code.trim().to_uppercase());
        self
    }

    /// Attach the sales channel the order was placed through.
    #[must_use]
    pub fn with_channel(mut self, channel: &str) -> Self {
        self.channel = Some(channel.to_string());
        self
    }

    /// Attach the store the order was placed at.
    #[must_use]
    pub fn with_store(mut self, store: &str) -> Self {
        self.store = Some(store.to_string());
        self
    }

    /// Iterate over the order lines.
    pub fn iter(&self) -> impl Iterator<Item = &LineItem<'a>> {
        self.lines.iter()
    }

    /// Customer segments.
    pub fn customer_segments(&self) -> &[String] {
        &self.customer_segments
    }

    /// Whether the customer entered the given code. Codes are case-insensitive.
    pub fn has_code(&self, code: &str) -> bool {
        self.entered_codes
            .iter()
            .any(|entered| entered.eq_ignore_ascii_case(code))
    }

    /// Sales channel, if known.
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Store, if known.
    pub fn store(&self) -> Option<&str> {
        self.store.as_deref()
    }

    /// Order currency.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the order has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total of all lines.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Overflow` if the total does not fit in minor units.
    pub fn subtotal(&self) -> Result<Money<'a, Currency>, OrderError> {
        let minor = self
            .lines
            .iter()
            .try_fold(0_i64, |acc, line| {
                acc.checked_add(line.total_minor()?).ok_or(OrderError::Overflow)
            })?;

        Ok(Money::from_minor(minor, self.currency))
    }

    /// Select the units that satisfy the rule set.
    ///
    /// Units are expanded line by line, so a line with quantity three yields
    /// three consecutive units, in input order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Overflow` if the eligible subtotal does not fit in
    /// minor units.
    pub fn eligible_for(&self, rules: &RuleSet) -> Result<EligibleOrder<'a>, OrderError> {
        let mut units = SmallVec::new();

        for (index, line) in self.lines.iter().enumerate() {
            if !rules.matches(line.item()) {
                continue;
            }

            for _ in 0..line.quantity {
                units.push(EligibleUnit {
                    line: index,
                    price: line.unit_price,
                });
            }
        }

        EligibleOrder::from_units(units, self.currency)
    }
}

fn check_line(
    index: usize,
    line: &LineItem<'_>,
    currency: &'static Currency,
) -> Result<(), OrderError> {
    let line_currency = line.unit_price.currency();

    if line_currency != currency {
        return Err(OrderError::CurrencyMismatch(
            index,
            line_currency.iso_alpha_code,
            currency.iso_alpha_code,
        ));
    }

    if line.quantity == 0 {
        return Err(OrderError::ZeroQuantity(index));
    }

    if line.quantity > MAX_LINE_QUANTITY {
        return Err(OrderError::QuantityTooLarge(index, line.quantity));
    }

    if line.unit_price.to_minor_units() < 0 {
        return Err(OrderError::NegativePrice(index));
    }

    Ok(())
}

/// One purchased unit that satisfied a rule set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EligibleUnit<'a> {
    /// Index of the order line the unit came from.
    pub line: usize,

    /// Unit price.
    pub price: Money<'a, Currency>,
}

/// The portion of an order a promotion may act on.
#[derive(Debug, Clone)]
pub struct EligibleOrder<'a> {
    units: SmallVec<[EligibleUnit<'a>; 16]>,
    subtotal: Money<'a, Currency>,
}

impl<'a> EligibleOrder<'a> {
    /// Build from already-selected units.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Overflow` if the subtotal does not fit in minor
    /// units, or `OrderError::CurrencyMismatch` if a unit is priced in another
    /// currency.
    pub fn from_units(
        units: SmallVec<[EligibleUnit<'a>; 16]>,
        currency: &'a Currency,
    ) -> Result<Self, OrderError> {
        let mut minor = 0_i64;

        for (index, unit) in units.iter().enumerate() {
            let unit_currency = unit.price.currency();

            if unit_currency != currency {
                return Err(OrderError::CurrencyMismatch(
                    index,
                    unit_currency.iso_alpha_code,
                    currency.iso_alpha_code,
                ));
            }

            minor = minor
                .checked_add(unit.price.to_minor_units())
                .ok_or(OrderError::Overflow)?;
        }

        Ok(Self {
            units,
            subtotal: Money::from_minor(minor, currency),
        })
    }

    /// Eligible units in input order.
    pub fn units(&self) -> &[EligibleUnit<'a>] {
        &self.units
    }

    /// Sum of eligible unit prices.
    pub fn subtotal(&self) -> Money<'a, Currency> {
        self.subtotal
    }

    /// Currency of the eligible subtotal.
    pub fn currency(&self) -> &'a Currency {
        self.subtotal.currency()
    }

    /// Whether no unit was eligible.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
