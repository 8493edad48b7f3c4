//! Order Fixtures

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::{
    catalog::{Catalog, ProductRef},
    data::{parse_currency, parse_price},
    fixtures::{FixtureError, catalog::TagsFixture},
    orders::{LineItem, OrderSnapshot},
};

/// Wrapper for orders in YAML
#[derive(Debug, Deserialize)]
pub struct OrdersFixture {
    /// Map of order key -> order fixture
    pub orders: FxHashMap<String, OrderFixture>,
}

/// Order Fixture
#[derive(Debug, Deserialize)]
pub struct OrderFixture {
    /// Order currency; defaults to the currency of the first line
    #[serde(default)]
    pub currency: Option<String>,

    /// Customer segments
    #[serde(default)]
    pub segments: TagsFixture,

    /// Promotion codes entered at checkout
    #[serde(default)]
    pub codes: TagsFixture,

    /// Sales channel
    #[serde(default)]
    pub channel: Option<String>,

    /// Store
    #[serde(default)]
    pub store: Option<String>,

    /// Order lines
    #[serde(default)]
    pub lines: Vec<LineFixture>,
}

/// Order line fixture
#[derive(Debug, Deserialize)]
pub struct LineFixture {
    /// Catalog product key
    pub product: String,

    /// Unit price (e.g., "12.50 GBP")
    pub price: String,

    /// Units ordered
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

impl OrderFixture {
    /// Build an order snapshot, resolving products against `catalog`.
    ///
    /// # Errors
    ///
    /// Returns an error if a product is not in the catalog, a price or
    /// currency cannot be parsed, or the lines are inconsistent.
    pub fn into_snapshot(
        self,
        key: &str,
        catalog: &Catalog,
    ) -> Result<OrderSnapshot<'static>, FixtureError> {
        let lines = self
            .lines
            .iter()
            .map(|line| {
                let item = catalog
                    .item(&ProductRef::new(&line.product))
                    .ok_or_else(|| FixtureError::ProductNotFound(line.product.clone()))?;

                Ok(LineItem::new(
                    item.clone(),
                    parse_price(&line.price)?,
                    line.quantity,
                ))
            })
            .collect::<Result<Vec<_>, FixtureError>>()?;

        let currency = match (&self.currency, lines.first()) {
            (Some(code), _) => parse_currency(code)?,
            (None, Some(line)) => line.unit_price().currency(),
            (None, None) => return Err(FixtureError::NoCurrency(key.to_string())),
        };

        let segments = self.segments.tags();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        let mut order = OrderSnapshot::with_lines(lines, currency)
            .map_err(|source| FixtureError::InvalidOrder {
                key: key.to_string(),
                source,
            })?
            .with_segments(&segments);

        for code in self.codes.tags() {
            order = order.with_code(&code);
        }

        if let Some(channel) = &self.channel {
            order = order.with_channel(channel);
        }

        if let Some(store) = &self.store {
            order = order.with_store(store);
        }

        Ok(order)
    }
}
