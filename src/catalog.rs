//! Catalog
//!
//! Catalog items and the registry that promotion references are resolved
//! against when a promotion is saved.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::ids::CatalogRef;

/// Product marker
#[derive(Debug, Clone, Copy)]
pub struct Product;

/// Category marker
#[derive(Debug, Clone, Copy)]
pub struct Category;

/// Attribute marker
#[derive(Debug, Clone, Copy)]
pub struct Attribute;

/// Product reference
pub type ProductRef = CatalogRef<Product>;

/// Category reference
pub type CategoryRef = CatalogRef<Category>;

/// Attribute reference
pub type AttributeRef = CatalogRef<Attribute>;

/// A sellable catalog item and the classifications it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    /// Product identifier
    pub product: ProductRef,

    /// Categories the product belongs to
    pub categories: FxHashSet<CategoryRef>,

    /// Attributes attached to the product
    pub attributes: FxHashSet<AttributeRef>,
}

impl CatalogItem {
    /// Create an item with no categories or attributes.
    pub fn new(product: impl Into<ProductRef>) -> Self {
        Self {
            product: product.into(),
            categories: FxHashSet::default(),
            attributes: FxHashSet::default(),
        }
    }

    /// Add categories to the item.
    #[must_use]
    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories
            .extend(categories.iter().map(|id| CategoryRef::new(id)));
        self
    }

    /// Add attributes to the item.
    #[must_use]
    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes
            .extend(attributes.iter().map(|id| AttributeRef::new(id)));
        self
    }
}

/// Registry of known products, categories and attributes.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: FxHashMap<ProductRef, CatalogItem>,
    categories: FxHashSet<CategoryRef>,
    attributes: FxHashSet<AttributeRef>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item, along with its categories and attributes.
    pub fn insert(&mut self, item: CatalogItem) {
        self.categories.extend(item.categories.iter().cloned());
        self.attributes.extend(item.attributes.iter().cloned());
        self.items.insert(item.product.clone(), item);
    }

    /// Register a category that may have no products yet.
    pub fn register_category(&mut self, category: CategoryRef) {
        self.categories.insert(category);
    }

    /// Register an attribute that may have no products yet.
    pub fn register_attribute(&mut self, attribute: AttributeRef) {
        self.attributes.insert(attribute);
    }

    /// Look up an item by product reference.
    pub fn item(&self, product: &ProductRef) -> Option<&CatalogItem> {
        self.items.get(product)
    }

    /// Whether the product exists.
    pub fn has_product(&self, product: &ProductRef) -> bool {
        self.items.contains_key(product)
    }

    /// Whether the category exists.
    pub fn has_category(&self, category: &CategoryRef) -> bool {
        self.categories.contains(category)
    }

    /// Whether the attribute exists.
    pub fn has_attribute(&self, attribute: &AttributeRef) -> bool {
        self.attributes.contains(attribute)
    }

    /// Number of products in the catalog.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog has no products.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<CatalogItem> for Catalog {
    fn from_iter<I: IntoIterator<Item = CatalogItem>>(iter: I) -> Self {
        let mut catalog = Self::new();

        for item in iter {
            catalog.insert(item);
        }

        catalog
    }
}

/// Split comma-separated editor input into a de-duplicated tag list.
///
/// Blank entries are dropped and first-seen order is preserved.
pub fn parse_tag_list(input: &str) -> SmallVec<[String; 4]> {
    let mut tags: SmallVec<[String; 4]> = SmallVec::new();

    for tag in input.split(',').map(str::trim).filter(|tag| !tag.is_empty()) {
        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_string());
        }
    }

    tags
}
