//! Promotion Variants
//!
//! The reward mechanic a promotion offers. Exactly one mechanic is active per
//! promotion, so parameters belonging to other mechanics cannot exist.

use decimal_percentage::Percentage;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;

use crate::{
    catalog::{Catalog, ProductRef},
    discounts::is_within_bounds,
    validation::ValidationError,
};

/// Reward offered by a buy-more-get-more promotion.
#[derive(Debug, Clone)]
pub enum BmgmReward {
    /// Discount the extra units by a percentage.
    Discount(Percentage),

    /// Grant free units of distinct reward products.
    Products(SmallVec<[ProductRef; 2]>),
}

/// Promotion reward mechanic.
#[derive(Debug, Clone)]
pub enum PromotionVariant<'a> {
    /// Percentage off the eligible subtotal.
    Percentage {
        /// Percentage off (0–100%)
        percentage: Percentage,

        /// Eligible subtotal required before the discount applies
        minimum_purchase: Money<'a, Currency>,
    },

    /// Fixed amount off the eligible subtotal.
    FixedAmount {
        /// Amount off, capped at the eligible subtotal
        amount: Money<'a, Currency>,

        /// Eligible subtotal required before the discount applies
        minimum_purchase: Money<'a, Currency>,
    },

    /// Buy X units, get Y units discounted.
    BuyXGetY {
        /// Units bought per group
        buy_quantity: u32,

        /// Discounted units per group
        get_quantity: u32,

        /// Discount on each rewarded unit (100% means free)
        discount: Percentage,
    },

    /// A free gift once the eligible subtotal reaches a minimum.
    FreeGift {
        /// Product granted for free
        gift: ProductRef,

        /// Eligible subtotal required before the gift is granted
        minimum_purchase: Money<'a, Currency>,
    },

    /// Buy more units, get extra units discounted or distinct products free.
    BuyMoreGetMore {
        /// Units bought per group
        buy_quantity: u32,

        /// Rewarded units per group
        get_quantity: u32,

        /// Discount or product reward
        reward: BmgmReward,
    },
}

impl<'a> PromotionVariant<'a> {
    /// Storage name of the variant.
    pub const fn type_as_str(&self) -> &'static str {
        match self {
            Self::Percentage { .. } => "percentage",
            Self::FixedAmount { .. } => "fixed_amount",
            Self::BuyXGetY { .. } => "buy_x_get_y",
            Self::FreeGift { .. } => "free_shipping",
            Self::BuyMoreGetMore { .. } => "buy_more_get_more",
        }
    }

    /// Minimum eligible subtotal, for variants gated on one.
    pub fn minimum_purchase(&self) -> Option<&Money<'a, Currency>> {
        match self {
            Self::Percentage {
                minimum_purchase, ..
            }
            | Self::FixedAmount {
                minimum_purchase, ..
            }
            | Self::FreeGift {
                minimum_purchase, ..
            } => Some(minimum_purchase),
            Self::BuyXGetY { .. } | Self::BuyMoreGetMore { .. } => None,
        }
    }

    /// Currency of the monetary parameters, for variants that have any.
    pub fn currency(&self) -> Option<&'a Currency> {
        self.minimum_purchase().map(|minimum| minimum.currency())
    }

    /// Validate the variant parameters against the catalog.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found: out-of-range percentages,
    /// negative amounts, zero quantities, unknown reward products or
    /// mismatched currencies.
    pub fn validate(&self, catalog: &Catalog) -> Result<(), ValidationError> {
        match self {
            Self::Percentage {
                percentage,
                minimum_purchase,
            } => {
                check_percentage("percentage", percentage)?;
                check_amount("minimum_purchase", minimum_purchase)
            }
            Self::FixedAmount {
                amount,
                minimum_purchase,
            } => {
                check_amount("amount", amount)?;
                check_amount("minimum_purchase", minimum_purchase)?;
                check_currency("amount", amount, minimum_purchase.currency())
            }
            Self::BuyXGetY {
                buy_quantity,
                get_quantity,
                discount,
            } => {
                check_quantity("buy_quantity", *buy_quantity)?;
                check_quantity("get_quantity", *get_quantity)?;
                check_percentage("discount", discount)
            }
            Self::FreeGift {
                gift,
                minimum_purchase,
            } => {
                check_product("gift", gift, catalog)?;
                check_amount("minimum_purchase", minimum_purchase)
            }
            Self::BuyMoreGetMore {
                buy_quantity,
                get_quantity,
                reward,
            } => {
                check_quantity("buy_quantity", *buy_quantity)?;
                check_quantity("get_quantity", *get_quantity)?;

                match reward {
                    BmgmReward::Discount(percent) => check_percentage("discount", percent),
                    BmgmReward::Products(products) if products.is_empty() => {
                        Err(ValidationError::MissingParameter("products"))
                    }
                    BmgmReward::Products(products) => {
                        for (i, product) in products.iter().enumerate() {
                            check_product("products", product, catalog)?;

                            if products.iter().take(i).any(|earlier| earlier == product) {
                                return Err(ValidationError::DuplicateProduct(
                                    product.to_string(),
                                ));
                            }
                        }

                        Ok(())
                    }
                }
            }
        }
    }
}

fn check_percentage(field: &'static str, percent: &Percentage) -> Result<(), ValidationError> {
    if is_within_bounds(percent) {
        Ok(())
    } else {
        Err(ValidationError::PercentageOutOfRange(field))
    }
}

fn check_amount(field: &'static str, amount: &Money<'_, Currency>) -> Result<(), ValidationError> {
    if amount.to_minor_units() < 0 {
        Err(ValidationError::NegativeAmount(field))
    } else {
        Ok(())
    }
}

fn check_quantity(field: &'static str, quantity: u32) -> Result<(), ValidationError> {
    if quantity == 0 {
        Err(ValidationError::ZeroQuantity(field))
    } else {
        Ok(())
    }
}

fn check_product(
    field: &'static str,
    product: &ProductRef,
    catalog: &Catalog,
) -> Result<(), ValidationError> {
    if product.is_blank() {
        return Err(ValidationError::BlankReference(field));
    }

    if product.has_separator() {
        return Err(ValidationError::InvalidReference(product.to_string()));
    }

    if catalog.has_product(product) {
        Ok(())
    } else {
        Err(ValidationError::UnknownProduct(product.to_string()))
    }
}

pub(crate) fn check_currency(
    field: &'static str,
    amount: &Money<'_, Currency>,
    expected: &Currency,
) -> Result<(), ValidationError> {
    let found = amount.currency();

    if found == expected {
        Ok(())
    } else {
        Err(ValidationError::CurrencyMismatch {
            field,
            expected: expected.iso_alpha_code,
            found: found.iso_alpha_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{GBP, USD};
    use smallvec::smallvec;

    use crate::catalog::CatalogItem;

    use super::*;

    fn catalog() -> Catalog {
        [CatalogItem::new("tote"), CatalogItem::new("sticker")]
            .into_iter()
            .collect()
    }

    #[test]
    fn percentage_out_of_range_is_rejected() {
        let variant = PromotionVariant::Percentage {
            percentage: Percentage::from(1.5),
            minimum_purchase: Money::from_minor(0, GBP),
        };

        assert_eq!(
            variant.validate(&catalog()),
            Err(ValidationError::PercentageOutOfRange("percentage"))
        );
    }

    #[test]
    fn negative_fixed_amount_is_rejected() {
        let variant = PromotionVariant::FixedAmount {
            amount: Money::from_minor(-500, GBP),
            minimum_purchase: Money::from_minor(0, GBP),
        };

        assert_eq!(
            variant.validate(&catalog()),
            Err(ValidationError::NegativeAmount("amount"))
        );
    }

    #[test]
    fn fixed_amount_currencies_must_agree() {
        let variant = PromotionVariant::FixedAmount {
            amount: Money::from_minor(500, USD),
            minimum_purchase: Money::from_minor(0, GBP),
        };

        assert_eq!(
            variant.validate(&catalog()),
            Err(ValidationError::CurrencyMismatch {
                field: "amount",
                expected: "GBP",
                found: "USD",
            })
        );
    }

    #[test]
    fn zero_quantities_are_rejected() {
        let variant = PromotionVariant::BuyXGetY {
            buy_quantity: 0,
            get_quantity: 1,
            discount: Percentage::from(1.0),
        };

        assert_eq!(
            variant.validate(&catalog()),
            Err(ValidationError::ZeroQuantity("buy_quantity"))
        );
    }

    #[test]
    fn gift_must_exist_in_catalog() {
        let variant = PromotionVariant::FreeGift {
            gift: ProductRef::new("mystery-box"),
            minimum_purchase: Money::from_minor(5_000, GBP),
        };

        assert_eq!(
            variant.validate(&catalog()),
            Err(ValidationError::UnknownProduct("mystery-box".to_string()))
        );
    }

    #[test]
    fn bmgm_product_reward_requires_products() {
        let variant = PromotionVariant::BuyMoreGetMore {
            buy_quantity: 3,
            get_quantity: 1,
            reward: BmgmReward::Products(SmallVec::new()),
        };

        assert_eq!(
            variant.validate(&catalog()),
            Err(ValidationError::MissingParameter("products"))
        );
    }

    #[test]
    fn valid_variants_pass() {
        let variants = [
            PromotionVariant::FreeGift {
                gift: ProductRef::new("tote"),
                minimum_purchase: Money::from_minor(5_000, GBP),
            },
            PromotionVariant::BuyMoreGetMore {
                buy_quantity: 3,
                get_quantity: 1,
                reward: BmgmReward::Products(smallvec![
                    ProductRef::new("tote"),
                    ProductRef::new("sticker")
                ]),
            },
            PromotionVariant::BuyMoreGetMore {
                buy_quantity: 2,
                get_quantity: 1,
                reward: BmgmReward::Discount(Percentage::from(0.5)),
            },
        ];

        for variant in variants {
            assert_eq!(variant.validate(&catalog()), Ok(()), "{variant:?}");
        }
    }

    #[test]
    fn type_names_and_minimums() {
        let variant = PromotionVariant::BuyXGetY {
            buy_quantity: 1,
            get_quantity: 1,
            discount: Percentage::from(1.0),
        };

        assert_eq!(variant.type_as_str(), "buy_x_get_y");
        assert!(variant.minimum_purchase().is_none());
        assert!(variant.currency().is_none());

        let gift = PromotionVariant::FreeGift {
            gift: ProductRef::new("tote"),
            minimum_purchase: Money::from_minor(100, GBP),
        };

        assert_eq!(gift.type_as_str(), "free_shipping");
        assert_eq!(gift.currency(), Some(GBP));
    }
}
