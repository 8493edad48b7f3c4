//! Catalog Fixtures

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::catalog::{AttributeRef, Catalog, CatalogItem, CategoryRef, ProductRef, parse_tag_list};

/// Wrapper for the catalog in YAML
#[derive(Debug, Deserialize)]
pub struct CatalogFixture {
    /// Map of product key -> product fixture
    pub products: FxHashMap<String, ProductFixture>,

    /// Categories that have no products yet
    #[serde(default)]
    pub categories: TagsFixture,

    /// Attributes that have no products yet
    #[serde(default)]
    pub attributes: TagsFixture,
}

/// Product Fixture
#[derive(Debug, Default, Deserialize)]
pub struct ProductFixture {
    /// Product categories
    #[serde(default)]
    pub categories: TagsFixture,

    /// Product attributes
    #[serde(default)]
    pub attributes: TagsFixture,
}

/// Tag list written either as a YAML list or a comma-separated string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TagsFixture {
    /// `[a, b]`
    List(Vec<String>),

    /// `"a, b"`
    Text(String),
}

impl Default for TagsFixture {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl TagsFixture {
    /// Normalised tags, de-duplicated in first-seen order.
    pub fn tags(&self) -> Vec<String> {
        match self {
            Self::List(tags) => {
                let mut seen = Vec::with_capacity(tags.len());

                for tag in tags.iter().map(String::as_str).map(str::trim) {
                    if !tag.is_empty() && !seen.iter().any(|s: &String| s == tag) {
                        seen.push(tag.to_string());
                    }
                }

                seen
            }
            Self::Text(text) => parse_tag_list(text).into_vec(),
        }
    }
}

impl CatalogFixture {
    /// Add the fixture's products, categories and attributes to `catalog`.
    pub fn register(self, catalog: &mut Catalog) {
        for category in self.categories.tags() {
            catalog.register_category(CategoryRef::new(&category));
        }

        for attribute in self.attributes.tags() {
            catalog.register_attribute(AttributeRef::new(&attribute));
        }

        for (key, product) in self.products {
            let mut item = CatalogItem::new(ProductRef::new(&key));

            item.categories
                .extend(product.categories.tags().iter().map(|c| CategoryRef::new(c)));
            item.attributes
                .extend(product.attributes.tags().iter().map(|a| AttributeRef::new(a)));

            catalog.insert(item);
        }
    }
}
