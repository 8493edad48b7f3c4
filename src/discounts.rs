//! Discounts
//!
//! Percentage arithmetic shared by the reward mechanics.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::orders::OrderError;

/// Errors specific to discount calculations.
#[derive(Debug, Error)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// Unit or group arithmetic overflowed.
    #[error("discount arithmetic overflowed")]
    Overflow,

    /// Promotion and order are priced in different currencies (promotion, order).
    #[error("promotion uses {0}, but order uses {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Errors bubbled up from order totals.
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// The percentage as a fraction, e.g. `0.25` for 25%.
pub fn fraction(percent: &Percentage) -> Decimal {
    // decimal_percentage doesn't expose the underlying Decimal
    (*percent) * Decimal::ONE
}

/// The percentage in points, e.g. `25` for 25%.
pub fn points(percent: &Percentage) -> Decimal {
    (fraction(percent) * Decimal::ONE_HUNDRED).normalize()
}

/// Build a percentage from points, e.g. `25` for 25%.
pub fn from_points(points: Decimal) -> Percentage {
    Percentage::from(points / Decimal::ONE_HUNDRED)
}

/// Whether the percentage lies within 0–100%.
pub fn is_within_bounds(percent: &Percentage) -> bool {
    let fraction = fraction(percent);

    fraction >= Decimal::ZERO && fraction <= Decimal::ONE
}

/// Calculate the discount amount in minor units based on a percentage and a minor unit amount.
///
/// Rounds half away from zero.
///
/// # Errors
///
/// Returns `DiscountError::PercentConversion` if the calculation overflows or
/// cannot be represented in minor units.
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    fraction(percent)
        .checked_mul(minor)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}

/// Calculate the discount on a price for a percentage.
///
/// # Errors
///
/// Returns `DiscountError::PercentConversion` if the amount cannot be represented.
pub fn discount_on<'a>(
    price: &Money<'a, Currency>,
    percent: &Percentage,
) -> Result<Money<'a, Currency>, DiscountError> {
    let discount_minor = percent_of_minor(percent, price.to_minor_units())?;

    Ok(Money::from_minor(discount_minor, price.currency()))
}
