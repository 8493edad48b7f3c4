//! Promotions
//!
//! A promotion bundles eligibility rules, a reward mechanic, a validity
//! window and the lifecycle status deciding whether it is evaluated at all.

use std::fmt;

use jiff::Timestamp;
use rusty_money::iso::Currency;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::{
    catalog::Catalog,
    discounts::DiscountError,
    ids::CatalogRef,
    lifecycle::{PromotionStatus, ValidityWindow, effective_status},
    orders::{OrderError, OrderSnapshot},
    promotions::budget::{BudgetUsage, RedemptionBudget},
    rewards::{Reward, compute_reward, ensure_currency},
    rules::RuleSet,
    validation::ValidationError,
    variants::{PromotionVariant, check_currency},
};

pub mod budget;

/// Customer-facing promotion code, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PromotionCode(String);

impl PromotionCode {
    /// Parse and normalise a code.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidCode` if the code is blank or contains
    /// characters other than ASCII letters, digits, `-` and `_`.
    pub fn parse(code: &str) -> Result<Self, ValidationError> {
        let code = code.trim();

        let valid = !code.is_empty()
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if valid {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(ValidationError::InvalidCode(code.to_string()))
        }
    }

    /// The normalised code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PromotionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who a promotion is offered to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Audience {
    /// Every customer.
    #[default]
    All,

    /// Customers in at least one of these segments.
    Segments(SmallVec<[String; 2]>),
}

impl Audience {
    /// Whether a customer with the given segments is in the audience.
    pub fn includes(&self, segments: &[String]) -> bool {
        match self {
            Self::All => true,
            Self::Segments(targets) => targets.iter().any(|target| segments.contains(target)),
        }
    }
}

/// Plain-text associations with channels, stores and campaigns.
///
/// Non-empty channel or store lists restrict where the promotion applies.
/// Campaigns are informational.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Associations {
    /// Sales channels
    pub channels: SmallVec<[String; 2]>,

    /// Stores
    pub stores: SmallVec<[String; 2]>,

    /// Marketing campaigns
    pub campaigns: SmallVec<[String; 2]>,
}

/// Why a promotion did not apply to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotApplicableReason {
    /// The promotion is not live.
    NotActive(PromotionStatus),

    /// The promotion has been paused.
    Paused,

    /// The promotion requires a code the customer did not enter.
    CodeNotEntered,

    /// The customer is outside the target audience.
    AudienceMismatch,

    /// The order came through a channel the promotion does not cover.
    ChannelMismatch,

    /// The order came from a store the promotion does not cover.
    StoreMismatch,

    /// No order line satisfies the rule set.
    NoEligibleItems,

    /// The eligible subtotal is below the minimum purchase.
    BelowMinimumPurchase,

    /// The order qualifies but earns nothing, e.g. no complete buy-x-get-y group.
    NoReward,

    /// The redemption or monetary budget is used up.
    BudgetExhausted,
}

impl fmt::Display for NotApplicableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotActive(status) => write!(f, "promotion is {status}"),
            Self::Paused => f.write_str("promotion is paused"),
            Self::CodeNotEntered => f.write_str("code not entered"),
            Self::AudienceMismatch => f.write_str("customer not in audience"),
            Self::ChannelMismatch => f.write_str("channel not covered"),
            Self::StoreMismatch => f.write_str("store not covered"),
            Self::NoEligibleItems => f.write_str("no eligible items"),
            Self::BelowMinimumPurchase => f.write_str("below minimum purchase"),
            Self::NoReward => f.write_str("nothing to reward"),
            Self::BudgetExhausted => f.write_str("budget exhausted"),
        }
    }
}

/// Result of evaluating a promotion against an order.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation<'a> {
    /// The promotion applies.
    Applied(Reward<'a>),

    /// The promotion does not apply. This is a normal outcome, not an error.
    NotApplicable(NotApplicableReason),
}

impl Evaluation<'_> {
    /// Whether the promotion applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Errors that can occur while evaluating a promotion.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// Error reading the order.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Error computing the reward.
    #[error(transparent)]
    Discount(#[from] DiscountError),
}

/// Promotion
#[derive(Debug, Clone)]
pub struct Promotion<'a> {
    /// Display name
    pub name: String,

    /// Code customers enter; required unless `auto_apply` is set
    pub code: Option<PromotionCode>,

    /// Apply without a code
    pub auto_apply: bool,

    /// Validity window
    pub window: ValidityWindow,

    /// Stored lifecycle status
    pub status: PromotionStatus,

    /// Pause toggle; paused promotions are never evaluated
    pub is_active: bool,

    /// Target audience
    pub audience: Audience,

    /// Channel, store and campaign associations
    pub associations: Associations,

    /// Redemption limits
    pub budget: RedemptionBudget<'a>,

    /// Eligibility rules
    pub rules: RuleSet,

    /// Reward mechanic
    pub variant: PromotionVariant<'a>,
}

impl<'a> Promotion<'a> {
    /// Create a draft, automatically applied promotion open to everyone.
    pub fn new(
        name: impl Into<String>,
        window: ValidityWindow,
        rules: RuleSet,
        variant: PromotionVariant<'a>,
    ) -> Self {
        Self {
            name: name.into(),
            code: None,
            auto_apply: true,
            window,
            status: PromotionStatus::Draft,
            is_active: true,
            audience: Audience::All,
            associations: Associations::default(),
            budget: RedemptionBudget::unlimited(),
            rules,
            variant,
        }
    }

    /// Require a code instead of applying automatically.
    #[must_use]
    pub fn with_code(mut self, code: PromotionCode) -> Self {
        self.code = Some(code);
        self.auto_apply = false;
        self
    }

    /// Set the stored status.
    #[must_use]
    pub fn with_status(mut self, status: PromotionStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the audience.
    #[must_use]
    pub fn with_audience(mut self, audience: Audience) -> Self {
        self.audience = audience;
        self
    }

    /// Set the associations.
    #[must_use]
    pub fn with_associations(mut self, associations: Associations) -> Self {
        self.associations = associations;
        self
    }

    /// Set the redemption budget.
    #[must_use]
    pub fn with_budget(mut self, budget: RedemptionBudget<'a>) -> Self {
        self.budget = budget;
        self
    }

    /// Status after applying the passage of time.
    pub fn status_at(&self, now: Timestamp) -> PromotionStatus {
        effective_status(self.status, &self.window, now)
    }

    /// Currency of the promotion's monetary parameters, if it has any.
    pub fn currency(&self) -> Option<&'a Currency> {
        self.variant.currency().or_else(|| {
            self.budget
                .monetary_limit
                .as_ref()
                .map(|limit| limit.currency())
        })
    }

    /// Validate the promotion for saving.
    ///
    /// Drafts may have an empty rule set; anything published may not.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self, catalog: &Catalog) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName);
        }

        if self.code.is_none() && !self.auto_apply {
            return Err(ValidationError::MissingCode);
        }

        if !self.window.is_well_formed() {
            return Err(ValidationError::InvalidWindow);
        }

        self.variant.validate(catalog)?;

        if let Some(limit) = &self.budget.monetary_limit {
            if limit.to_minor_units() < 0 {
                return Err(ValidationError::NegativeAmount("monetary_limit"));
            }

            if let Some(currency) = self.variant.currency() {
                check_currency("monetary_limit", limit, currency)?;
            }
        }

        validate_rules(&self.rules, catalog)?;

        if self.status.is_published() && self.rules.has_no_inclusions() {
            return Err(ValidationError::EmptyRuleSet);
        }

        Ok(())
    }

    /// Extra checks before moving to `scheduled` or `active`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyRuleSet` or `ValidationError::WindowElapsed`.
    pub fn validate_for_publish(&self, now: Timestamp) -> Result<(), ValidationError> {
        if self.rules.has_no_inclusions() {
            return Err(ValidationError::EmptyRuleSet);
        }

        if self.window.has_ended(now) {
            return Err(ValidationError::WindowElapsed);
        }

        Ok(())
    }

    /// Evaluate the promotion against an order, ignoring budget usage.
    ///
    /// # Errors
    ///
    /// See [`Promotion::evaluate_with_usage`].
    pub fn evaluate<'o>(
        &self,
        order: &OrderSnapshot<'o>,
        now: Timestamp,
    ) -> Result<Evaluation<'o>, EvaluationError> {
        self.evaluate_with_usage(order, now, &BudgetUsage::default())
    }

    /// Evaluate the promotion against an order given what it has already used
    /// of its budget. The discount is capped at the remaining monetary budget.
    ///
    /// # Errors
    ///
    /// Returns an `EvaluationError` if the order totals overflow or the
    /// promotion and order currencies differ.
    pub fn evaluate_with_usage<'o>(
        &self,
        order: &OrderSnapshot<'o>,
        now: Timestamp,
        usage: &BudgetUsage,
    ) -> Result<Evaluation<'o>, EvaluationError> {
        if let Some(reason) = self.gate(order, now) {
            debug!(promotion = %self.name, %reason, "promotion not applicable");

            return Ok(Evaluation::NotApplicable(reason));
        }

        let eligible = order.eligible_for(&self.rules)?;

        if eligible.is_empty() {
            return Ok(Evaluation::NotApplicable(
                NotApplicableReason::NoEligibleItems,
            ));
        }

        self.check_currencies(order)?;

        if let Some(minimum) = self.variant.minimum_purchase()
            && eligible.subtotal().to_minor_units() < minimum.to_minor_units()
        {
            return Ok(Evaluation::NotApplicable(
                NotApplicableReason::BelowMinimumPurchase,
            ));
        }

        if !self.budget.allows_redemption(usage) {
            return Ok(Evaluation::NotApplicable(
                NotApplicableReason::BudgetExhausted,
            ));
        }

        let mut reward = compute_reward(&self.variant, &eligible)?;

        if let Some(remaining) = self.budget.remaining_minor(usage) {
            reward = reward.capped(remaining);
        }

        if reward.is_empty() {
            return Ok(Evaluation::NotApplicable(NotApplicableReason::NoReward));
        }

        debug!(
            promotion = %self.name,
            discount = reward.discount().to_minor_units(),
            gifts = reward.gifts().len(),
            "promotion applied"
        );

        Ok(Evaluation::Applied(reward))
    }

    /// Minimum purchase and monetary limit must be in the order's currency.
    fn check_currencies(&self, order: &OrderSnapshot<'_>) -> Result<(), DiscountError> {
        let currency = order.currency();

        if let Some(minimum) = self.variant.minimum_purchase() {
            ensure_currency(minimum, currency)?;
        }

        if let Some(limit) = &self.budget.monetary_limit {
            ensure_currency(limit, currency)?;
        }

        Ok(())
    }

    fn gate(&self, order: &OrderSnapshot<'_>, now: Timestamp) -> Option<NotApplicableReason> {
        let status = self.status_at(now);

        if status != PromotionStatus::Active {
            return Some(NotApplicableReason::NotActive(status));
        }

        if !self.is_active {
            return Some(NotApplicableReason::Paused);
        }

        if let Some(code) = &self.code
            && !self.auto_apply
            && !order.has_code(code.as_str())
        {
            return Some(NotApplicableReason::CodeNotEntered);
        }

        if !self.audience.includes(order.customer_segments()) {
            return Some(NotApplicableReason::AudienceMismatch);
        }

        if !covers(&self.associations.channels, order.channel()) {
            return Some(NotApplicableReason::ChannelMismatch);
        }

        if !covers(&self.associations.stores, order.store()) {
            return Some(NotApplicableReason::StoreMismatch);
        }

        None
    }
}

fn covers(allowed: &[String], actual: Option<&str>) -> bool {
    allowed.is_empty() || actual.is_some_and(|actual| allowed.iter().any(|a| a == actual))
}

fn validate_rules(rules: &RuleSet, catalog: &Catalog) -> Result<(), ValidationError> {
    check_refs(
        "products",
        rules
            .included_products
            .iter()
            .chain(&rules.excluded_products),
        |product| catalog.has_product(product),
        ValidationError::UnknownProduct,
    )?;

    check_refs(
        "categories",
        rules
            .included_categories
            .iter()
            .chain(&rules.excluded_categories),
        |category| catalog.has_category(category),
        ValidationError::UnknownCategory,
    )?;

    check_refs(
        "attributes",
        rules
            .included_attributes
            .iter()
            .chain(&rules.excluded_attributes),
        |attribute| catalog.has_attribute(attribute),
        ValidationError::UnknownAttribute,
    )
}

fn check_refs<'r, T: 'r>(
    field: &'static str,
    refs: impl Iterator<Item = &'r CatalogRef<T>>,
    known: impl Fn(&CatalogRef<T>) -> bool,
    unknown: fn(String) -> ValidationError,
) -> Result<(), ValidationError> {
    for reference in refs {
        if reference.is_blank() {
            return Err(ValidationError::BlankReference(field));
        }

        if reference.has_separator() {
            return Err(ValidationError::InvalidReference(reference.to_string()));
        }

        if !known(reference) {
            return Err(unknown(reference.to_string()));
        }
    }

    Ok(())
}
