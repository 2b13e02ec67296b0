//! Key-value storage abstraction for Catalog Harness.
//!
//! The [`KvStore`] trait is the only persistence seam of the core: an async
//! map from string keys to JSON-string values. Each `get`/`put` is atomic on
//! its own; there are no cross-key transactions, so every multi-key write in
//! the core is an idempotent overwrite that converges when re-run.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! # Key Space
//!
//! | Key | Value | Owner |
//! |-----|-------|-------|
//! | `product_sources` | [`SourceMetadata`](crate::models::SourceMetadata) | history |
//! | `source_<tag>` | `ProductRecord[]` | sources |
//! | `product_catalog` | [`CatalogProjection`](crate::models::CatalogProjection) | merge |
//! | `products:<kod>` | [`MergedProduct`](crate::models::MergedProduct) | merge |
//! | `product_categories` / `product_manufacturers` | `string[]` | index |
//! | `product_index_kategorie:<name>` / `product_index_vyrobce:<name>` | `string[]` | index |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CatalogError, CatalogResult, StoreOp};
use crate::models::SourceTag;

pub use memory::InMemoryStore;

/// Abstract key-value backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get`](KvStore::get) | Read a value, `None` when the key is absent |
/// | [`put`](KvStore::put) | Overwrite a value |
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: String) -> Result<()>;
}

#[async_trait]
impl<S: KvStore + ?Sized> KvStore for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        (**self).put(key, value).await
    }
}

/// Key naming for the persisted key space.
pub mod keys {
    use super::SourceTag;

    pub const PRODUCT_SOURCES: &str = "product_sources";
    pub const PRODUCT_CATALOG: &str = "product_catalog";
    pub const PRODUCT_CATEGORIES: &str = "product_categories";
    pub const PRODUCT_MANUFACTURERS: &str = "product_manufacturers";

    pub fn source(tag: SourceTag) -> String {
        format!("source_{}", tag)
    }

    pub fn product(kod: &str) -> String {
        format!("products:{}", kod)
    }

    pub fn category_index(name: &str) -> String {
        format!("product_index_kategorie:{}", name)
    }

    pub fn manufacturer_index(name: &str) -> String {
        format!("product_index_vyrobce:{}", name)
    }
}

/// Reads and decodes a JSON value, mapping every failure to [`CatalogError::Storage`].
pub(crate) async fn get_json<S, T>(store: &S, key: &str) -> CatalogResult<Option<T>>
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    let raw = store
        .get(key)
        .await
        .map_err(|e| CatalogError::storage(StoreOp::Get, key, e))?;
    match raw {
        Some(text) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| CatalogError::storage(StoreOp::Decode, key, e)),
        None => Ok(None),
    }
}

/// Encodes and writes a JSON value, mapping every failure to [`CatalogError::Storage`].
pub(crate) async fn put_json<S, T>(store: &S, key: &str, value: &T) -> CatalogResult<()>
where
    S: KvStore + ?Sized,
    T: Serialize + ?Sized,
{
    let text =
        serde_json::to_string(value).map_err(|e| CatalogError::storage(StoreOp::Encode, key, e))?;
    store
        .put(key, text)
        .await
        .map_err(|e| CatalogError::storage(StoreOp::Put, key, e))
}
