//! Rewards
//!
//! What a promotion variant gives back for the eligible part of an order.

use decimal_percentage::Percentage;
use rusty_money::{Money, iso::Currency};
use smallvec::{SmallVec, smallvec};

use crate::{
    catalog::ProductRef,
    discounts::{DiscountError, percent_of_minor},
    orders::{EligibleOrder, EligibleUnit},
    variants::{BmgmReward, PromotionVariant},
};

/// Free units of a product added to the order at zero cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftGrant {
    /// Product granted
    pub product: ProductRef,

    /// Units granted
    pub quantity: u32,
}

/// Discount and free goods earned by an order.
#[derive(Debug, Clone, PartialEq)]
pub struct Reward<'a> {
    discount: Money<'a, Currency>,
    gifts: SmallVec<[GiftGrant; 2]>,
}

impl<'a> Reward<'a> {
    /// A reward of nothing.
    pub fn none(currency: &'a Currency) -> Self {
        Self {
            discount: Money::from_minor(0, currency),
            gifts: SmallVec::new(),
        }
    }

    /// Amount taken off existing items.
    pub fn discount(&self) -> Money<'a, Currency> {
        self.discount
    }

    /// Free goods granted.
    pub fn gifts(&self) -> &[GiftGrant] {
        &self.gifts
    }

    /// Whether the reward gives nothing.
    pub fn is_empty(&self) -> bool {
        self.discount.to_minor_units() == 0 && self.gifts.is_empty()
    }

    /// Limit the discount to at most `limit_minor` minor units.
    #[must_use]
    pub fn capped(self, limit_minor: i64) -> Self {
        let capped = self.discount.to_minor_units().min(limit_minor.max(0));

        Self {
            discount: Money::from_minor(capped, self.discount.currency()),
            gifts: self.gifts,
        }
    }
}

/// Compute the discount a variant gives on the eligible part of an order.
///
/// # Errors
///
/// See [`compute_reward`].
pub fn compute_discount<'a>(
    variant: &PromotionVariant<'_>,
    order: &EligibleOrder<'a>,
) -> Result<Money<'a, Currency>, DiscountError> {
    compute_reward(variant, order).map(|reward| reward.discount())
}

/// Compute the full reward (discount and gifts) a variant gives on the
/// eligible part of an order.
///
/// # Errors
///
/// Returns a `DiscountError` if the promotion and order currencies differ or
/// the arithmetic overflows. Configuration problems are not reported here;
/// they are caught when the promotion is saved.
pub fn compute_reward<'a>(
    variant: &PromotionVariant<'_>,
    order: &EligibleOrder<'a>,
) -> Result<Reward<'a>, DiscountError> {
    let currency = order.currency();
    let subtotal = order.subtotal().to_minor_units();
    let mut reward = Reward::none(currency);

    match variant {
        PromotionVariant::Percentage {
            percentage,
            minimum_purchase,
        } => {
            if reached_minimum(minimum_purchase, order)? {
                let minor = percent_of_minor(percentage, subtotal)?.min(subtotal);
                reward.discount = Money::from_minor(minor, currency);
            }
        }
        PromotionVariant::FixedAmount {
            amount,
            minimum_purchase,
        } => {
            ensure_currency(amount, currency)?;

            if reached_minimum(minimum_purchase, order)? {
                let minor = amount.to_minor_units().clamp(0, subtotal.max(0));
                reward.discount = Money::from_minor(minor, currency);
            }
        }
        PromotionVariant::BuyXGetY {
            buy_quantity,
            get_quantity,
            discount,
        } => {
            let minor = grouped_discount(order.units(), *buy_quantity, *get_quantity, discount)?;
            reward.discount = Money::from_minor(minor, currency);
        }
        PromotionVariant::FreeGift {
            gift,
            minimum_purchase,
        } => {
            if reached_minimum(minimum_purchase, order)? {
                reward.gifts = smallvec![GiftGrant {
                    product: gift.clone(),
                    quantity: 1,
                }];
            }
        }
        PromotionVariant::BuyMoreGetMore {
            buy_quantity,
            get_quantity,
            reward: BmgmReward::Discount(percent),
        } => {
            let minor = grouped_discount(order.units(), *buy_quantity, *get_quantity, percent)?;
            reward.discount = Money::from_minor(minor, currency);
        }
        PromotionVariant::BuyMoreGetMore {
            buy_quantity,
            get_quantity,
            reward: BmgmReward::Products(products),
        } => {
            reward.gifts = product_grants(order.units().len(), *buy_quantity, *get_quantity, products)?;
        }
    }

    Ok(reward)
}

pub(crate) fn ensure_currency(amount: &Money<'_, Currency>, currency: &Currency) -> Result<(), DiscountError> {
    let found = amount.currency();

    if found == currency {
        Ok(())
    } else {
        Err(DiscountError::CurrencyMismatch(
            found.iso_alpha_code,
            currency.iso_alpha_code,
        ))
    }
}

fn reached_minimum(
    minimum: &Money<'_, Currency>,
    order: &EligibleOrder<'_>,
) -> Result<bool, DiscountError> {
    ensure_currency(minimum, order.currency())?;

    Ok(order.subtotal().to_minor_units() >= minimum.to_minor_units())
}

/// Discount the `get` cheapest units in every complete group of `buy + get`
/// consecutive units. Equal prices keep their input order.
fn grouped_discount(
    units: &[EligibleUnit<'_>],
    buy: u32,
    get: u32,
    percent: &Percentage,
) -> Result<i64, DiscountError> {
    if buy == 0 || get == 0 {
        return Ok(0);
    }

    let get = usize::try_from(get).map_err(|_err| DiscountError::Overflow)?;
    let group_size = usize::try_from(buy)
        .map_err(|_err| DiscountError::Overflow)?
        .checked_add(get)
        .ok_or(DiscountError::Overflow)?;

    let mut total = 0_i64;

    for group in units.chunks_exact(group_size) {
        let mut by_price: SmallVec<[&EligibleUnit<'_>; 16]> = group.iter().collect();

        // `sort_by_key` is stable, so ties stay in input order.
        by_price.sort_by_key(|unit| unit.price.to_minor_units());

        for unit in by_price.iter().take(get) {
            let minor = unit.price.to_minor_units();
            let off = percent_of_minor(percent, minor)?.min(minor);

            total = total.checked_add(off).ok_or(DiscountError::Overflow)?;
        }
    }

    Ok(total)
}

/// Grant `get` units of each reward product for every complete group of
/// `buy` purchased units.
fn product_grants(
    unit_count: usize,
    buy: u32,
    get: u32,
    products: &[ProductRef],
) -> Result<SmallVec<[GiftGrant; 2]>, DiscountError> {
    if buy == 0 || get == 0 {
        return Ok(SmallVec::new());
    }

    let buy = usize::try_from(buy).map_err(|_err| DiscountError::Overflow)?;
    let groups = u32::try_from(unit_count / buy).map_err(|_err| DiscountError::Overflow)?;

    if groups == 0 {
        return Ok(SmallVec::new());
    }

    let quantity = groups.checked_mul(get).ok_or(DiscountError::Overflow)?;

    Ok(products
        .iter()
        .map(|product| GiftGrant {
            product: product.clone(),
            quantity,
        })
        .collect())
}
