//! # Catalog Harness Core
//!
//! Shared logic for Catalog Harness: product data models, the key-value
//! store abstraction, the three-source merge engine, category and
//! manufacturer indexing, import history, and catalog queries.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! runtime-specific dependencies. All persistence goes through the
//! [`store::KvStore`] trait.
//!
//! ## Pipeline
//!
//! ```text
//! feed parser ──▶ sources::ingest ──▶ merge ──▶ index
//!                      │                │         │
//!                      ▼                ▼         ▼
//!                  history        product_catalog  product_index_*
//!                                 products:<kod>
//! ```

pub mod catalog;
pub mod error;
pub mod feed;
pub mod history;
pub mod index;
pub mod merge;
pub mod models;
pub mod query;
pub mod sources;
pub mod store;

pub use catalog::{Catalog, CatalogOptions, RecomputePolicy};
pub use error::{CatalogError, CatalogResult};
pub use models::{MergedProduct, ProductRecord, SourceTag};
