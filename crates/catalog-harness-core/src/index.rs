//! Category and manufacturer indexes.
//!
//! Derived from the merged catalog in a single pass: each non-blank
//! `kategorie` / `vyrobce` maps to the codes carrying it, in catalog order.
//! The distinct names are persisted sorted.
//!
//! Buckets for names that disappeared since the previous build are
//! overwritten with an empty list, since the store cannot delete keys.
//! Detail records (`products:<kod>`) of codes that left every source are
//! not touched and stay readable through `get_product_detail`.

use std::collections::{BTreeMap, BTreeSet};

use futures::future::join_all;
use tracing::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::models::MergedProduct;
use crate::store::{keys, KvStore};

/// Inverted indexes over the merged catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductIndexes {
    pub categories: BTreeMap<String, Vec<String>>,
    pub manufacturers: BTreeMap<String, Vec<String>>,
}

impl ProductIndexes {
    /// Sorted distinct category names.
    pub fn category_names(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }

    /// Sorted distinct manufacturer names.
    pub fn manufacturer_names(&self) -> Vec<String> {
        self.manufacturers.keys().cloned().collect()
    }
}

/// Index names are trimmed, matching how listing filters are read.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Builds both indexes from the merged products.
pub fn build_indexes(products: &[MergedProduct]) -> ProductIndexes {
    let mut indexes = ProductIndexes::default();
    for product in products {
        if let Some(category) = non_blank(&product.record.kategorie) {
            indexes
                .categories
                .entry(category.to_string())
                .or_default()
                .push(product.kod().to_string());
        }
        if let Some(manufacturer) = non_blank(&product.record.vyrobce) {
            indexes
                .manufacturers
                .entry(manufacturer.to_string())
                .or_default()
                .push(product.kod().to_string());
        }
    }
    indexes
}

/// Rebuilds and persists every index key for `products`.
///
/// All writes are issued together; the call returns once each of them has
/// settled, failing with [`CatalogError::Index`] if any did.
pub async fn update_product_indexes<S: KvStore + ?Sized>(
    store: &S,
    products: &[MergedProduct],
) -> CatalogResult<()> {
    let indexes = build_indexes(products);

    let previous_categories = load_names(store, keys::PRODUCT_CATEGORIES).await?;
    let previous_manufacturers = load_names(store, keys::PRODUCT_MANUFACTURERS).await?;

    let mut writes: Vec<(String, Vec<String>)> = Vec::new();
    writes.push((keys::PRODUCT_CATEGORIES.to_string(), indexes.category_names()));
    writes.push((
        keys::PRODUCT_MANUFACTURERS.to_string(),
        indexes.manufacturer_names(),
    ));
    for (name, codes) in &indexes.categories {
        writes.push((keys::category_index(name), codes.clone()));
    }
    for (name, codes) in &indexes.manufacturers {
        writes.push((keys::manufacturer_index(name), codes.clone()));
    }
    let current_categories: BTreeSet<String> = indexes.categories.keys().cloned().collect();
    for name in previous_categories.difference(&current_categories) {
        writes.push((keys::category_index(name), Vec::new()));
    }
    let current_manufacturers: BTreeSet<String> = indexes.manufacturers.keys().cloned().collect();
    for name in previous_manufacturers.difference(&current_manufacturers) {
        writes.push((keys::manufacturer_index(name), Vec::new()));
    }

    let results = join_all(
        writes
            .iter()
            .map(|(key, codes)| put_index(store, key, codes)),
    )
    .await;
    results.into_iter().collect::<CatalogResult<Vec<()>>>()?;

    debug!(
        categories = indexes.categories.len(),
        manufacturers = indexes.manufacturers.len(),
        keys = writes.len(),
        "updated product indexes"
    );
    Ok(())
}

async fn load_names<S: KvStore + ?Sized>(store: &S, key: &str) -> CatalogResult<BTreeSet<String>> {
    match store.get(key).await.map_err(|e| CatalogError::index(key, e))? {
        Some(text) => serde_json::from_str(&text).map_err(|e| CatalogError::index(key, e)),
        None => Ok(BTreeSet::new()),
    }
}

async fn put_index<S: KvStore + ?Sized>(store: &S, key: &str, codes: &[String]) -> CatalogResult<()> {
    let text = serde_json::to_string(codes).map_err(|e| CatalogError::index(key, e))?;
    store
        .put(key, text)
        .await
        .map_err(|e| CatalogError::index(key, e))
}
