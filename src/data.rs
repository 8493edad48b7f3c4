//! Promotion Drafts
//!
//! Serialisable form of a promotion, used for storage and YAML fixtures.
//! Money is written as `"AMOUNT CURRENCY"` and percentages as `"25%"`.
//! Drafts may be incomplete; [`PromotionDraft::validate`] turns one into a
//! [`Promotion`] or reports the first problem.

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, USD},
};
use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;

use crate::{
    catalog::{Catalog, ProductRef, parse_tag_list},
    discounts::{from_points, points},
    ids::CatalogRef,
    lifecycle::{PromotionStatus, ValidityWindow},
    promotions::{Associations, Audience, Promotion, PromotionCode, budget::RedemptionBudget},
    rules::{CombinationOp, RuleSet},
    validation::ValidationError,
    variants::{BmgmReward, PromotionVariant},
};

/// Promotion as stored or written in a fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionDraft {
    /// Display name
    pub name: String,

    /// Promotion code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Apply without a code
    #[serde(default)]
    pub auto_apply: bool,

    /// Window start
    pub starts_at: Timestamp,

    /// Window end (inclusive)
    pub ends_at: Timestamp,

    /// Stored lifecycle status
    #[serde(default)]
    pub status: PromotionStatus,

    /// Pause toggle
    #[serde(default = "enabled")]
    pub is_active: bool,

    /// Customer segments; empty means everyone
    #[serde(default, deserialize_with = "tag_list", skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<String>,

    /// Sales channels
    #[serde(default, deserialize_with = "tag_list", skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,

    /// Stores
    #[serde(default, deserialize_with = "tag_list", skip_serializing_if = "Vec::is_empty")]
    pub stores: Vec<String>,

    /// Campaigns
    #[serde(default, deserialize_with = "tag_list", skip_serializing_if = "Vec::is_empty")]
    pub campaigns: Vec<String>,

    /// Maximum number of redemptions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redemption_limit: Option<u64>,

    /// Maximum total discount, e.g. `"500.00 GBP"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monetary_limit: Option<String>,

    /// Eligibility rules
    #[serde(default)]
    pub rules: RuleSetDraft,

    /// Reward mechanic
    pub variant: VariantDraft,
}

/// Rule set as stored. Every list accepts a YAML list or a comma-separated
/// string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetDraft {
    /// How inclusion dimensions combine
    #[serde(default)]
    pub op: CombinationOp,

    /// Included products
    #[serde(default, deserialize_with = "tag_list", skip_serializing_if = "Vec::is_empty")]
    pub included_products: Vec<String>,

    /// Included categories
    #[serde(default, deserialize_with = "tag_list", skip_serializing_if = "Vec::is_empty")]
    pub included_categories: Vec<String>,

    /// Included attributes
    #[serde(default, deserialize_with = "tag_list", skip_serializing_if = "Vec::is_empty")]
    pub included_attributes: Vec<String>,

    /// Excluded products
    #[serde(default, deserialize_with = "tag_list", skip_serializing_if = "Vec::is_empty")]
    pub excluded_products: Vec<String>,

    /// Excluded categories
    #[serde(default, deserialize_with = "tag_list", skip_serializing_if = "Vec::is_empty")]
    pub excluded_categories: Vec<String>,

    /// Excluded attributes
    #[serde(default, deserialize_with = "tag_list", skip_serializing_if = "Vec::is_empty")]
    pub excluded_attributes: Vec<String>,
}

/// Reward mechanic as stored. Missing parameters are reported on validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariantDraft {
    /// Percentage off the eligible subtotal
    Percentage {
        /// e.g. `"25%"`
        percentage: Option<String>,

        /// e.g. `"0.00 GBP"`
        minimum_purchase: Option<String>,
    },

    /// Fixed amount off the eligible subtotal
    FixedAmount {
        /// e.g. `"10.00 GBP"`
        amount: Option<String>,

        /// e.g. `"50.00 GBP"`
        minimum_purchase: Option<String>,
    },

    /// Buy X, get Y discounted
    BuyXGetY {
        /// Units bought per group
        buy_quantity: Option<u32>,

        /// Discounted units per group
        get_quantity: Option<u32>,

        /// e.g. `"100%"`
        discount: Option<String>,
    },

    /// Free gift over a minimum purchase
    #[serde(rename = "free_shipping")]
    FreeGift {
        /// Gift product
        gift: Option<String>,

        /// e.g. `"30.00 GBP"`
        minimum_purchase: Option<String>,
    },

    /// Buy more, get more
    BuyMoreGetMore {
        /// Units bought per group
        buy_quantity: Option<u32>,

        /// Rewarded units per group
        get_quantity: Option<u32>,

        /// Discount or product reward
        reward: Option<BmgmRewardDraft>,
    },
}

/// Buy-more-get-more reward as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BmgmRewardDraft {
    /// Discount on the extra units
    Discount {
        /// e.g. `"50%"`
        discount: String,
    },

    /// Free units of distinct products
    Products {
        /// Reward products
        #[serde(deserialize_with = "tag_list")]
        products: Vec<String>,
    },
}

fn enabled() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagList {
    List(Vec<String>),
    Text(String),
}

/// Lists are kept entry by entry; only the string form is split on commas.
fn tag_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match TagList::deserialize(deserializer)? {
        TagList::List(tags) => tags
            .iter()
            .map(String::as_str)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        TagList::Text(text) => parse_tag_list(&text).into_vec(),
    })
}

impl PromotionDraft {
    /// Serialise the draft for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Read a stored draft.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has an unknown variant
    /// type.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Build and validate the promotion this draft describes.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found, either while parsing money
    /// and percentage strings or while checking the promotion against the
    /// catalog.
    pub fn validate(&self, catalog: &Catalog) -> Result<Promotion<'static>, ValidationError> {
        let promotion = self.to_promotion()?;

        promotion.validate(catalog)?;

        Ok(promotion)
    }

    /// Parse the draft without checking it against a catalog.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for missing or malformed parameters.
    pub fn to_promotion(&self) -> Result<Promotion<'static>, ValidationError> {
        let code = self
            .code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
            .map(PromotionCode::parse)
            .transpose()?;

        let audience = if self.segments.is_empty() {
            Audience::All
        } else {
            Audience::Segments(self.segments.iter().cloned().collect())
        };

        let monetary_limit = self
            .monetary_limit
            .as_deref()
            .map(parse_price)
            .transpose()?;

        Ok(Promotion {
            name: self.name.clone(),
            code,
            auto_apply: self.auto_apply,
            window: ValidityWindow::new(self.starts_at, self.ends_at),
            status: self.status,
            is_active: self.is_active,
            audience,
            associations: Associations {
                channels: self.channels.iter().cloned().collect(),
                stores: self.stores.iter().cloned().collect(),
                campaigns: self.campaigns.iter().cloned().collect(),
            },
            budget: RedemptionBudget {
                redemption_limit: self.redemption_limit,
                monetary_limit,
            },
            rules: self.rules.to_rule_set(),
            variant: self.variant.to_variant()?,
        })
    }
}

impl From<&Promotion<'_>> for PromotionDraft {
    fn from(promotion: &Promotion<'_>) -> Self {
        let segments = match &promotion.audience {
            Audience::All => Vec::new(),
            Audience::Segments(segments) => segments.to_vec(),
        };

        Self {
            name: promotion.name.clone(),
            code: promotion.code.as_ref().map(ToString::to_string),
            auto_apply: promotion.auto_apply,
            starts_at: promotion.window.start,
            ends_at: promotion.window.end,
            status: promotion.status,
            is_active: promotion.is_active,
            segments,
            channels: promotion.associations.channels.to_vec(),
            stores: promotion.associations.stores.to_vec(),
            campaigns: promotion.associations.campaigns.to_vec(),
            redemption_limit: promotion.budget.redemption_limit,
            monetary_limit: promotion.budget.monetary_limit.as_ref().map(format_price),
            rules: RuleSetDraft::from(&promotion.rules),
            variant: VariantDraft::from(&promotion.variant),
        }
    }
}

impl RuleSetDraft {
    /// Build the rule set.
    pub fn to_rule_set(&self) -> RuleSet {
        RuleSet {
            op: self.op,
            included_products: refs(&self.included_products),
            included_categories: refs(&self.included_categories),
            included_attributes: refs(&self.included_attributes),
            excluded_products: refs(&self.excluded_products),
            excluded_categories: refs(&self.excluded_categories),
            excluded_attributes: refs(&self.excluded_attributes),
        }
    }
}

impl From<&RuleSet> for RuleSetDraft {
    fn from(rules: &RuleSet) -> Self {
        Self {
            op: rules.op,
            included_products: sorted(&rules.included_products),
            included_categories: sorted(&rules.included_categories),
            included_attributes: sorted(&rules.included_attributes),
            excluded_products: sorted(&rules.excluded_products),
            excluded_categories: sorted(&rules.excluded_categories),
            excluded_attributes: sorted(&rules.excluded_attributes),
        }
    }
}

fn refs<T, C: FromIterator<CatalogRef<T>>>(names: &[String]) -> C {
    names.iter().map(|name| CatalogRef::new(name)).collect()
}

fn sorted<'r, T: 'r>(refs: impl IntoIterator<Item = &'r CatalogRef<T>>) -> Vec<String> {
    let mut names: Vec<String> = refs.into_iter().map(ToString::to_string).collect();
    names.sort_unstable();
    names
}

impl VariantDraft {
    /// Build the variant.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingParameter` for absent parameters, or
    /// a parse error for malformed money and percentage strings.
    pub fn to_variant(&self) -> Result<PromotionVariant<'static>, ValidationError> {
        let variant = match self {
            Self::Percentage {
                percentage,
                minimum_purchase,
            } => PromotionVariant::Percentage {
                percentage: required_percentage("percentage", percentage.as_deref())?,
                minimum_purchase: required_price("minimum_purchase", minimum_purchase.as_deref())?,
            },
            Self::FixedAmount {
                amount,
                minimum_purchase,
            } => PromotionVariant::FixedAmount {
                amount: required_price("amount", amount.as_deref())?,
                minimum_purchase: required_price("minimum_purchase", minimum_purchase.as_deref())?,
            },
            Self::BuyXGetY {
                buy_quantity,
                get_quantity,
                discount,
            } => PromotionVariant::BuyXGetY {
                buy_quantity: buy_quantity.ok_or(ValidationError::MissingParameter("buy_quantity"))?,
                get_quantity: get_quantity.ok_or(ValidationError::MissingParameter("get_quantity"))?,
                discount: required_percentage("discount", discount.as_deref())?,
            },
            Self::FreeGift {
                gift,
                minimum_purchase,
            } => PromotionVariant::FreeGift {
                gift: gift
                    .as_deref()
                    .map(ProductRef::new)
                    .ok_or(ValidationError::MissingParameter("gift"))?,
                minimum_purchase: required_price("minimum_purchase", minimum_purchase.as_deref())?,
            },
            Self::BuyMoreGetMore {
                buy_quantity,
                get_quantity,
                reward,
            } => {
                let reward = match reward {
                    Some(BmgmRewardDraft::Discount { discount }) => {
                        BmgmReward::Discount(parse_percentage(discount)?)
                    }
                    Some(BmgmRewardDraft::Products { products }) => {
                        BmgmReward::Products(refs::<_, SmallVec<[ProductRef; 2]>>(products))
                    }
                    None => return Err(ValidationError::MissingParameter("reward")),
                };

                PromotionVariant::BuyMoreGetMore {
                    buy_quantity: buy_quantity
                        .ok_or(ValidationError::MissingParameter("buy_quantity"))?,
                    get_quantity: get_quantity
                        .ok_or(ValidationError::MissingParameter("get_quantity"))?,
                    reward,
                }
            }
        };

        Ok(variant)
    }
}

impl From<&PromotionVariant<'_>> for VariantDraft {
    fn from(variant: &PromotionVariant<'_>) -> Self {
        match variant {
            PromotionVariant::Percentage {
                percentage,
                minimum_purchase,
            } => Self::Percentage {
                percentage: Some(format_percentage(percentage)),
                minimum_purchase: Some(format_price(minimum_purchase)),
            },
            PromotionVariant::FixedAmount {
                amount,
                minimum_purchase,
            } => Self::FixedAmount {
                amount: Some(format_price(amount)),
                minimum_purchase: Some(format_price(minimum_purchase)),
            },
            PromotionVariant::BuyXGetY {
                buy_quantity,
                get_quantity,
                discount,
            } => Self::BuyXGetY {
                buy_quantity: Some(*buy_quantity),
                get_quantity: Some(*get_quantity),
                discount: Some(format_percentage(discount)),
            },
            PromotionVariant::FreeGift {
                gift,
                minimum_purchase,
            } => Self::FreeGift {
                gift: Some(gift.to_string()),
                minimum_purchase: Some(format_price(minimum_purchase)),
            },
            PromotionVariant::BuyMoreGetMore {
                buy_quantity,
                get_quantity,
                reward,
            } => Self::BuyMoreGetMore {
                buy_quantity: Some(*buy_quantity),
                get_quantity: Some(*get_quantity),
                reward: Some(match reward {
                    BmgmReward::Discount(discount) => BmgmRewardDraft::Discount {
                        discount: format_percentage(discount),
                    },
                    BmgmReward::Products(products) => BmgmRewardDraft::Products {
                        products: products.iter().map(ToString::to_string).collect(),
                    },
                }),
            },
        }
    }
}

fn required_price(
    field: &'static str,
    value: Option<&str>,
) -> Result<Money<'static, Currency>, ValidationError> {
    value
        .ok_or(ValidationError::MissingParameter(field))
        .and_then(parse_price)
}

fn required_percentage(field: &'static str, value: Option<&str>) -> Result<Percentage, ValidationError> {
    value
        .ok_or(ValidationError::MissingParameter(field))
        .and_then(parse_percentage)
}

/// Parse a price string such as `"2.99 GBP"`.
///
/// # Errors
///
/// Returns `ValidationError::InvalidPrice` if the string is not in the format
/// `AMOUNT CURRENCY` or the amount is not a number, and
/// `ValidationError::UnknownCurrency` for currencies other than GBP, USD and
/// EUR.
pub fn parse_price(s: &str) -> Result<Money<'static, Currency>, ValidationError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(currency_code), None) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(ValidationError::InvalidPrice(s.to_string()));
    };

    let minor_units = amount
        .parse::<Decimal>()
        .ok()
        .and_then(|amount| amount.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|value| {
            value
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
        })
        .ok_or_else(|| ValidationError::InvalidPrice(s.to_string()))?;

    Ok(Money::from_minor(minor_units, parse_currency(currency_code)?))
}

/// Look up a supported ISO currency code.
///
/// # Errors
///
/// Returns `ValidationError::UnknownCurrency` for currencies other than GBP,
/// USD and EUR.
pub fn parse_currency(code: &str) -> Result<&'static Currency, ValidationError> {
    match code.trim() {
        "GBP" => Ok(GBP),
        "USD" => Ok(USD),
        "EUR" => Ok(EUR),
        other => Err(ValidationError::UnknownCurrency(other.to_string())),
    }
}

/// Format money as `"AMOUNT CURRENCY"`.
pub fn format_price(money: &Money<'_, Currency>) -> String {
    format!(
        "{} {}",
        Decimal::new(money.to_minor_units(), 2),
        money.currency().iso_alpha_code
    )
}

/// Parse a percentage string: `"15%"` or the fraction `"0.15"`.
///
/// # Errors
///
/// Returns `ValidationError::InvalidPercentage` if the number cannot be parsed.
pub fn parse_percentage(s: &str) -> Result<Percentage, ValidationError> {
    let trimmed = s.trim();

    if let Some(points) = trimmed.strip_suffix('%') {
        points
            .trim()
            .parse::<Decimal>()
            .map(from_points)
            .map_err(|_err| ValidationError::InvalidPercentage(s.to_string()))
    } else {
        trimmed
            .parse::<Decimal>()
            .map(Percentage::from)
            .map_err(|_err| ValidationError::InvalidPercentage(s.to_string()))
    }
}

/// Format a percentage as points, e.g. `"25%"`.
pub fn format_percentage(percent: &Percentage) -> String {
    format!("{}%", points(percent))
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::catalog::CatalogItem;

    use super::*;

    const DRAFT: &str = r#"
name: Summer apparel
code: summer25
starts_at: "2026-06-01T00:00:00Z"
ends_at: "2026-06-30T23:59:59Z"
status: active
channels: web, app
monetary_limit: "250.00 GBP"
rules:
  op: or
  included_categories: [apparel]
  excluded_attributes: "clearance, , clearance"
variant:
  type: percentage
  percentage: "25%"
  minimum_purchase: "0.00 GBP"
"#;

    fn catalog() -> Catalog {
        [
            CatalogItem::new("tee")
                .with_categories(&["apparel"])
                .with_attributes(&["clearance"]),
            CatalogItem::new("cap").with_categories(&["apparel"]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn yaml_draft_builds_promotion() -> TestResult {
        let draft: PromotionDraft = serde_norway::from_str(DRAFT)?;

        assert_eq!(draft.channels, vec!["web", "app"]);
        assert_eq!(draft.rules.excluded_attributes, vec!["clearance"]);
        assert!(draft.is_active);

        let promotion = draft.validate(&catalog())?;

        assert_eq!(promotion.code.as_ref().map(PromotionCode::as_str), Some("SUMMER25"));
        assert_eq!(promotion.rules.op, CombinationOp::Or);
        assert_eq!(
            promotion.budget.monetary_limit,
            Some(Money::from_minor(25_000, GBP))
        );
        assert!(
            !promotion.rules.matches(
                &CatalogItem::new("tee")
                    .with_categories(&["apparel"])
                    .with_attributes(&["clearance"])
            )
        );
        assert!(
            promotion
                .rules
                .matches(&CatalogItem::new("cap").with_categories(&["apparel"]))
        );

        Ok(())
    }

    #[test]
    fn draft_survives_json_round_trip() -> TestResult {
        let draft: PromotionDraft = serde_norway::from_str(DRAFT)?;
        let promotion = draft.validate(&catalog())?;

        let stored = serde_json::to_string(&PromotionDraft::from(&promotion))?;
        let restored: PromotionDraft = serde_json::from_str(&stored)?;

        assert_eq!(restored, PromotionDraft::from(&promotion));
        assert_eq!(restored.validate(&catalog())?.rules, promotion.rules);

        Ok(())
    }

    #[test]
    fn list_entries_are_not_split_on_commas() -> TestResult {
        let json = r#"{"included_products": [" gift, wrapped ", "", "tee", "tee"]}"#;
        let rules: RuleSetDraft = serde_json::from_str(json)?;

        assert_eq!(rules.included_products, vec!["gift, wrapped", "tee", "tee"]);

        let yaml = "included_products: gift, wrapped\n";
        let rules: RuleSetDraft = serde_norway::from_str(yaml)?;

        assert_eq!(rules.included_products, vec!["gift", "wrapped"]);

        Ok(())
    }

    #[test]
    fn missing_variant_parameters_are_reported() {
        let draft = VariantDraft::FixedAmount {
            amount: None,
            minimum_purchase: Some("10.00 GBP".to_string()),
        };

        assert!(matches!(
            draft.to_variant(),
            Err(ValidationError::MissingParameter("amount"))
        ));

        let draft = VariantDraft::BuyMoreGetMore {
            buy_quantity: Some(3),
            get_quantity: Some(1),
            reward: None,
        };

        assert!(matches!(
            draft.to_variant(),
            Err(ValidationError::MissingParameter("reward"))
        ));
    }

    #[test]
    fn variant_type_tags_follow_storage_names() -> TestResult {
        let yaml = r"
type: free_shipping
gift: tote
minimum_purchase: 30.00 GBP
";
        let draft: VariantDraft = serde_norway::from_str(yaml)?;

        assert!(matches!(draft, VariantDraft::FreeGift { .. }));

        let yaml = r"
type: buy_more_get_more
buy_quantity: 3
get_quantity: 1
reward:
  kind: products
  products: tote, socks
";
        let draft: VariantDraft = serde_norway::from_str(yaml)?;

        let PromotionVariant::BuyMoreGetMore {
            reward: BmgmReward::Products(products),
            ..
        } = draft.to_variant()?
        else {
            return Err("expected a product reward".into());
        };

        assert_eq!(products.len(), 2);

        Ok(())
    }

    #[test]
    fn unknown_variant_type_is_rejected() {
        let yaml = r#"
type: mystery_box
percentage: "10%"
"#;
        let result: Result<VariantDraft, _> = serde_norway::from_str(yaml);

        assert!(result.is_err());
    }

    #[test]
    fn parse_price_handles_formats() -> TestResult {
        assert_eq!(parse_price("2.99 GBP")?, Money::from_minor(299, GBP));
        assert_eq!(parse_price("10 USD")?, Money::from_minor(1_000, USD));
        assert_eq!(parse_price("0.125 EUR")?, Money::from_minor(13, EUR));

        assert!(matches!(
            parse_price("2.99"),
            Err(ValidationError::InvalidPrice(_))
        ));
        assert!(matches!(
            parse_price("abc GBP"),
            Err(ValidationError::InvalidPrice(_))
        ));
        assert!(matches!(
            parse_price("2.99 JPY"),
            Err(ValidationError::UnknownCurrency(code)) if code == "JPY"
        ));

        Ok(())
    }

    #[test]
    fn parse_percentage_accepts_points_and_fractions() -> TestResult {
        let fifteen = Percentage::from(Decimal::new(15, 2));

        assert_eq!(parse_percentage("15%")?, fifteen);
        assert_eq!(parse_percentage("0.15")?, fifteen);
        assert_eq!(parse_percentage(" 100 % ")?, Percentage::from(Decimal::ONE));
        assert!(parse_percentage("lots").is_err());

        Ok(())
    }

    #[test]
    fn formatting_matches_fixture_notation() -> TestResult {
        assert_eq!(format_price(&Money::from_minor(1_250, GBP)), "12.50 GBP");
        assert_eq!(format_percentage(&parse_percentage("25%")?), "25%");
        assert_eq!(format_percentage(&parse_percentage("12.5%")?), "12.5%");

        Ok(())
    }
}
