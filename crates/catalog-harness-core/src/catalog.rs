//! The catalog service.
//!
//! [`Catalog`] binds a [`KvStore`] to the tuning options and exposes every
//! catalog operation as a method. It holds no state besides the store
//! handle, so clones and concurrent callers share nothing in memory.
//!
//! # Ingest and Recompute
//!
//! Staging an import ([`Catalog::ingest`]) and rebuilding the catalog
//! ([`Catalog::recompute`]) are separate operations.
//! [`Catalog::store_products_from_source`] composes them according to the
//! configured [`RecomputePolicy`].
//!
//! There is no mutual exclusion between concurrent imports. Two imports of
//! different sources racing each other may each merge against a snapshot
//! the other has not finished writing; the stored catalog then reflects
//! whichever merge finished last. Any later recompute restores a catalog
//! consistent with all current snapshots.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::error::CatalogResult;
use crate::history::{self, DEFAULT_HISTORY_LIMIT};
use crate::index;
use crate::merge::{self, DEFAULT_WRITE_BATCH_SIZE};
use crate::models::{ImportHistory, MergedProduct, ProductRecord, SourceTag};
use crate::query::{self, ProductPage, ProductQuery, DEFAULT_PAGE_LIMIT};
use crate::sources::{self, SourceStatus};
use crate::store::KvStore;

/// When an import triggers a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecomputePolicy {
    /// Every import is followed by a full recompute.
    #[default]
    Always,
    /// Imports only stage; the caller runs [`Catalog::recompute`].
    Manual,
}

/// Tuning options for a [`Catalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogOptions {
    pub write_batch_size: usize,
    pub history_limit: usize,
    pub page_limit: usize,
    pub recompute: RecomputePolicy,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            write_batch_size: DEFAULT_WRITE_BATCH_SIZE,
            history_limit: DEFAULT_HISTORY_LIMIT,
            page_limit: DEFAULT_PAGE_LIMIT,
            recompute: RecomputePolicy::Always,
        }
    }
}

/// Product catalog backed by a key-value store.
#[derive(Debug, Clone)]
pub struct Catalog<S> {
    store: S,
    options: CatalogOptions,
}

impl<S: KvStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, CatalogOptions::default())
    }

    pub fn with_options(store: S, options: CatalogOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    /// Stages `records` as the new snapshot of `source` and records the import.
    pub async fn ingest(
        &self,
        source: SourceTag,
        records: &[ProductRecord],
        filename: Option<&str>,
    ) -> CatalogResult<usize> {
        sources::ingest(
            &self.store,
            source,
            records,
            filename,
            self.options.history_limit,
            Utc::now(),
        )
        .await
    }

    /// Rebuilds catalog, product details, and indexes from the current
    /// snapshots. Returns the number of merged products.
    pub async fn recompute(&self) -> CatalogResult<usize> {
        merge::merge_product_data(&self.store, self.options.write_batch_size, Utc::now()).await
    }

    /// Stages an import and, under [`RecomputePolicy::Always`], merges.
    ///
    /// Returns the number of records stored.
    pub async fn store_products_from_source(
        &self,
        records: &[ProductRecord],
        source: SourceTag,
        filename: Option<&str>,
    ) -> CatalogResult<usize> {
        let count = self.ingest(source, records, filename).await?;
        match self.options.recompute {
            RecomputePolicy::Always => {
                self.recompute().await?;
            }
            RecomputePolicy::Manual => {
                info!(source = %source, "staged import; recompute deferred");
            }
        }
        Ok(count)
    }

    /// Rebuilds the category and manufacturer indexes for `products`.
    pub async fn update_product_indexes(&self, products: &[MergedProduct]) -> CatalogResult<()> {
        index::update_product_indexes(&self.store, products).await
    }

    pub async fn get_product_import_history(&self) -> CatalogResult<ImportHistory> {
        history::get_product_import_history(&self.store).await
    }

    pub async fn get_products(&self, query: &ProductQuery) -> CatalogResult<ProductPage> {
        query::get_products(&self.store, query, self.options.page_limit).await
    }

    pub async fn get_product_detail(&self, kod: &str) -> CatalogResult<MergedProduct> {
        query::get_product_detail(&self.store, kod).await
    }

    pub async fn get_product_categories(&self) -> CatalogResult<Vec<String>> {
        query::get_product_categories(&self.store).await
    }

    pub async fn get_product_manufacturers(&self) -> CatalogResult<Vec<String>> {
        query::get_product_manufacturers(&self.store).await
    }

    pub async fn source_status(&self) -> CatalogResult<Vec<SourceStatus>> {
        sources::source_status(&self.store).await
    }
}
