//! Promotion Redemption Budgets

use rusty_money::{Money, iso::Currency};

/// Redemption limits for a promotion
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RedemptionBudget<'a> {
    /// Maximum number of redemptions
    pub redemption_limit: Option<u64>,

    /// Maximum total discount given across all redemptions
    pub monetary_limit: Option<Money<'a, Currency>>,
}

/// What a promotion has used of its budget so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BudgetUsage {
    /// Completed redemptions
    pub redemptions: u64,

    /// Total discount given, in minor units
    pub discounted_minor: i64,
}

impl<'a> RedemptionBudget<'a> {
    /// Create a budget with no constraints
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            redemption_limit: None,
            monetary_limit: None,
        }
    }

    /// Create a budget with a redemption limit only
    #[must_use]
    pub const fn with_redemption_limit(limit: u64) -> Self {
        Self {
            redemption_limit: Some(limit),
            monetary_limit: None,
        }
    }

    /// Create a budget with a monetary limit only
    #[must_use]
    pub const fn with_monetary_limit(limit: Money<'a, Currency>) -> Self {
        Self {
            redemption_limit: None,
            monetary_limit: Some(limit),
        }
    }

    /// Create a budget with both limits
    #[must_use]
    pub const fn with_both_limits(redemptions: u64, monetary: Money<'a, Currency>) -> Self {
        Self {
            redemption_limit: Some(redemptions),
            monetary_limit: Some(monetary),
        }
    }

    /// Check if this budget has any constraints
    #[must_use]
    pub const fn has_constraints(&self) -> bool {
        self.redemption_limit.is_some() || self.monetary_limit.is_some()
    }

    /// Discount still available in minor units, or `None` when unlimited.
    #[must_use]
    pub fn remaining_minor(&self, usage: &BudgetUsage) -> Option<i64> {
        self.monetary_limit
            .map(|limit| limit.to_minor_units().saturating_sub(usage.discounted_minor).max(0))
    }

    /// Whether another redemption fits in the budget.
    #[must_use]
    pub fn allows_redemption(&self, usage: &BudgetUsage) -> bool {
        let under_count = self
            .redemption_limit
            .is_none_or(|limit| usage.redemptions < limit);

        under_count && self.remaining_minor(usage).is_none_or(|remaining| remaining > 0)
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso;

    use super::*;

    #[test]
    fn test_unlimited_budget() {
        let budget = RedemptionBudget::unlimited();

        assert!(!budget.has_constraints());
        assert!(budget.allows_redemption(&BudgetUsage {
            redemptions: u64::MAX,
            discounted_minor: i64::MAX,
        }));
        assert_eq!(budget.remaining_minor(&BudgetUsage::default()), None);
    }

    #[test]
    fn test_redemption_limit_only() {
        let budget = RedemptionBudget::with_redemption_limit(2);

        assert!(budget.has_constraints());
        assert!(budget.allows_redemption(&BudgetUsage {
            redemptions: 1,
            discounted_minor: 0,
        }));
        assert!(!budget.allows_redemption(&BudgetUsage {
            redemptions: 2,
            discounted_minor: 0,
        }));
    }

    #[test]
    fn test_monetary_limit_only() {
        let budget = RedemptionBudget::with_monetary_limit(Money::from_minor(1_000, iso::GBP));

        let usage = BudgetUsage {
            redemptions: 40,
            discounted_minor: 750,
        };

        assert_eq!(budget.remaining_minor(&usage), Some(250));
        assert!(budget.allows_redemption(&usage));

        let spent = BudgetUsage {
            redemptions: 41,
            discounted_minor: 1_000,
        };

        assert_eq!(budget.remaining_minor(&spent), Some(0));
        assert!(!budget.allows_redemption(&spent));
    }

    #[test]
    fn test_both_limits() {
        let limit = Money::from_minor(1_000, iso::GBP);
        let budget = RedemptionBudget::with_both_limits(5, limit);

        assert!(budget.has_constraints());
        assert_eq!(budget.redemption_limit, Some(5));
        assert_eq!(budget.monetary_limit, Some(limit));
    }
}
