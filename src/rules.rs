//! Promotion Eligibility Rules
//!
//! Inclusion and exclusion criteria deciding which catalog items a promotion
//! applies to.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::catalog::{AttributeRef, CatalogItem, CategoryRef, ProductRef};

/// Boolean operation used to combine the inclusion dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinationOp {
    /// Every non-empty inclusion dimension must match.
    #[default]
    And,

    /// At least one non-empty inclusion dimension must match.
    Or,
}

impl CombinationOp {
    /// Lowercase name used in drafts and reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Inclusion/exclusion criteria for a promotion.
///
/// Exclusions always win: an item hitting any exclusion dimension is
/// ineligible whatever the inclusions say. A rule set with no inclusions at
/// all matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    /// How inclusion dimensions combine.
    pub op: CombinationOp,

    /// Products explicitly included.
    pub included_products: FxHashSet<ProductRef>,

    /// Categories included.
    pub included_categories: FxHashSet<CategoryRef>,

    /// Attributes included.
    pub included_attributes: FxHashSet<AttributeRef>,

    /// Products excluded.
    pub excluded_products: FxHashSet<ProductRef>,

    /// Categories excluded.
    pub excluded_categories: FxHashSet<CategoryRef>,

    /// Attributes excluded.
    pub excluded_attributes: FxHashSet<AttributeRef>,
}

impl RuleSet {
    /// Create an empty rule set with the given operator.
    pub fn new(op: CombinationOp) -> Self {
        Self {
            op,
            ..Self::default()
        }
    }

    /// Include products.
    #[must_use]
    pub fn include_products(mut self, products: &[&str]) -> Self {
        self.included_products
            .extend(products.iter().map(|id| ProductRef::new(id)));
        self
    }

    /// Include categories.
    #[must_use]
    pub fn include_categories(mut self, categories: &[&str]) -> Self {
        self.included_categories
            .extend(categories.iter().map(|id| CategoryRef::new(id)));
        self
    }

    /// Include attributes.
    #[must_use]
    pub fn include_attributes(mut self, attributes: &[&str]) -> Self {
        self.included_attributes
            .extend(attributes.iter().map(|id| AttributeRef::new(id)));
        self
    }

    /// Exclude products.
    #[must_use]
    pub fn exclude_products(mut self, products: &[&str]) -> Self {
        self.excluded_products
            .extend(products.iter().map(|id| ProductRef::new(id)));
        self
    }

    /// Exclude categories.
    #[must_use]
    pub fn exclude_categories(mut self, categories: &[&str]) -> Self {
        self.excluded_categories
            .extend(categories.iter().map(|id| CategoryRef::new(id)));
        self
    }

    /// Exclude attributes.
    #[must_use]
    pub fn exclude_attributes(mut self, attributes: &[&str]) -> Self {
        self.excluded_attributes
            .extend(attributes.iter().map(|id| AttributeRef::new(id)));
        self
    }

    /// Whether every inclusion dimension is empty.
    pub fn has_no_inclusions(&self) -> bool {
        self.included_products.is_empty()
            && self.included_categories.is_empty()
            && self.included_attributes.is_empty()
    }

    /// Whether the item hits any exclusion dimension.
    pub fn excludes(&self, item: &CatalogItem) -> bool {
        self.excluded_products.contains(&item.product)
            || !self.excluded_categories.is_disjoint(&item.categories)
            || !self.excluded_attributes.is_disjoint(&item.attributes)
    }

    /// Evaluate the rule set against a catalog item.
    pub fn matches(&self, item: &CatalogItem) -> bool {
        if self.excludes(item) || self.has_no_inclusions() {
            return false;
        }

        // `None` marks a dimension with nothing selected.
        let dimensions = [
            (!self.included_products.is_empty())
                .then(|| self.included_products.contains(&item.product)),
            (!self.included_categories.is_empty())
                .then(|| !self.included_categories.is_disjoint(&item.categories)),
            (!self.included_attributes.is_empty())
                .then(|| !self.included_attributes.is_disjoint(&item.attributes)),
        ];

        let mut votes = dimensions.into_iter().flatten();

        match self.op {
            CombinationOp::And => votes.all(|hit| hit),
            CombinationOp::Or => votes.any(|hit| hit),
        }
    }
}
