//! Fixtures
//!
//! YAML fixture sets: `catalog/<set>.yml`, `promotions/<set>.yml` and
//! `orders/<set>.yml` under a base directory.

use std::{fs, path::PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    catalog::Catalog,
    data::PromotionDraft,
    fixtures::{catalog::CatalogFixture, orders::OrdersFixture, promotions::PromotionsFixture},
    orders::{OrderError, OrderSnapshot},
    promotions::Promotion,
    validation::ValidationError,
};

pub mod catalog;
pub mod orders;
pub mod promotions;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("failed to read fixture file `{path}`")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid money, percentage or currency value
    #[error("invalid value in fixture: {0}")]
    Value(#[from] ValidationError),

    /// Promotion that fails validation
    #[error("promotion `{key}` is invalid: {source}")]
    InvalidPromotion {
        /// Promotion key
        key: String,
        /// Validation failure
        #[source]
        source: ValidationError,
    },

    /// Order lines that cannot form an order
    #[error("order `{key}` is invalid: {source}")]
    InvalidOrder {
        /// Order key
        key: String,
        /// Order failure
        #[source]
        source: OrderError,
    },

    /// Order without lines or currency
    #[error("order `{0}` has no lines and no currency")]
    NoCurrency(String),

    /// Product not found
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// Promotion not found
    #[error("promotion not found: {0}")]
    PromotionNotFound(String),

    /// Order not found
    #[error("order not found: {0}")]
    OrderNotFound(String),
}

/// Fixture
#[derive(Debug)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,

    /// Products, categories and attributes
    catalog: Catalog,

    /// Promotion drafts, sorted by key
    promotions: Vec<(String, PromotionDraft)>,

    /// Orders, sorted by key
    orders: Vec<(String, OrderSnapshot<'static>)>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            catalog: Catalog::new(),
            promotions: Vec::new(),
            orders: Vec::new(),
        }
    }

    fn read<T: DeserializeOwned>(&self, kind: &str, name: &str) -> Result<T, FixtureError> {
        let path = self.base_path.join(kind).join(format!("{name}.yml"));

        let contents = fs::read_to_string(&path).map_err(|source| FixtureError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(serde_norway::from_str(&contents)?)
    }

    /// Load the catalog from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_catalog(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: CatalogFixture = self.read("catalog", name)?;

        fixture.register(&mut self.catalog);

        Ok(self)
    }

    /// Load promotion drafts from a YAML fixture file
    ///
    /// Drafts are not validated until they are requested, so a set can
    /// contain deliberately invalid promotions.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_promotions(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: PromotionsFixture = self.read("promotions", name)?;

        self.promotions.extend(fixture.promotions);
        self.promotions.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(self)
    }

    /// Load orders from a YAML fixture file
    ///
    /// Order lines must reference products already in the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, a product is
    /// missing from the catalog, or an order's lines are inconsistent.
    pub fn load_orders(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let fixture: OrdersFixture = self.read("orders", name)?;

        for (key, order) in fixture.orders {
            let snapshot = order.into_snapshot(&key, &self.catalog)?;

            self.orders.push((key, snapshot));
        }

        self.orders.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(self)
    }

    /// Load a complete fixture set (catalog, promotions and orders with the same name)
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        Self::from_set_in("./fixtures", name)
    }

    /// Load a complete fixture set from a custom base path
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set_in(base_path: impl Into<PathBuf>, name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::with_base_path(base_path);

        fixture
            .load_catalog(name)?
            .load_promotions(name)?
            .load_orders(name)?;

        Ok(fixture)
    }

    /// Get the catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Get all promotion drafts, sorted by key
    pub fn drafts(&self) -> &[(String, PromotionDraft)] {
        &self.promotions
    }

    /// Get a validated promotion by its key
    ///
    /// # Errors
    ///
    /// Returns an error if the promotion is not found or fails validation.
    pub fn promotion(&self, key: &str) -> Result<Promotion<'static>, FixtureError> {
        let (_, draft) = self
            .promotions
            .iter()
            .find(|(candidate, _)| candidate == key)
            .ok_or_else(|| FixtureError::PromotionNotFound(key.to_string()))?;

        draft
            .validate(&self.catalog)
            .map_err(|source| FixtureError::InvalidPromotion {
                key: key.to_string(),
                source,
            })
    }

    /// Get an order by its key
    ///
    /// # Errors
    ///
    /// Returns an error if the order is not found.
    pub fn order(&self, key: &str) -> Result<&OrderSnapshot<'static>, FixtureError> {
        self.orders
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, order)| order)
            .ok_or_else(|| FixtureError::OrderNotFound(key.to_string()))
    }

    /// Get all orders, sorted by key
    pub fn orders(&self) -> &[(String, OrderSnapshot<'static>)] {
        &self.orders
    }
}
