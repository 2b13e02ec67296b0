//! Source record store.
//!
//! Holds the most recent raw import for each staged source
//! (`xml_cenik`, `xml_popisky`, `excel`). An import fully replaces the
//! previous snapshot of its source and is recorded in the import history.
//! Merging is a separate step; see [`crate::catalog::Catalog`] for the
//! policy that composes the two.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CatalogError, CatalogResult, StoreOp};
use crate::history::{load_metadata, record_import, save_metadata};
use crate::models::{ProductRecord, SourceTag};
use crate::store::{keys, put_json, KvStore};

/// Stored state of one staging slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStatus {
    pub source: SourceTag,
    pub products_count: usize,
    pub last_import: Option<DateTime<Utc>>,
}

/// Replaces the snapshot of `source` with `records` and records the import.
///
/// Returns the number of records stored. An empty list is stored like any
/// other; whether that deserves attention is up to the caller.
pub async fn ingest<S: KvStore + ?Sized>(
    store: &S,
    source: SourceTag,
    records: &[ProductRecord],
    filename: Option<&str>,
    history_limit: usize,
    now: DateTime<Utc>,
) -> CatalogResult<usize> {
    if !source.is_staged() {
        return Err(CatalogError::Validation(format!(
            "'{}' is not a staging source; stage vendor feed records under xml_cenik, xml_popisky, or excel",
            source
        )));
    }

    // Read metadata before the first write so a corrupt history aborts
    // without replacing the snapshot.
    let mut metadata = load_metadata(store).await?;

    put_json(store, &keys::source(source), records).await?;

    record_import(
        &mut metadata,
        source,
        now,
        records.len(),
        filename,
        history_limit,
    );
    save_metadata(store, &metadata).await?;

    if records.is_empty() {
        warn!(source = %source, "stored an empty product list");
    } else {
        info!(source = %source, count = records.len(), filename, "stored source products");
    }
    Ok(records.len())
}

/// Loads the snapshot of one source.
///
/// An absent key is an empty list. A present but unparsable value is a
/// [`CatalogError::Merge`]: corrupt data never degrades to "no data".
pub async fn load_source<S: KvStore + ?Sized>(
    store: &S,
    source: SourceTag,
) -> CatalogResult<Vec<ProductRecord>> {
    let key = keys::source(source);
    let raw = store
        .get(&key)
        .await
        .map_err(|e| CatalogError::storage(StoreOp::Get, &key, e))?;
    match raw {
        Some(text) => serde_json::from_str(&text).map_err(|e| CatalogError::Merge {
            source_tag: source,
            source: e,
        }),
        None => Ok(Vec::new()),
    }
}

/// Reports record counts and last import times for every staging slot.
pub async fn source_status<S: KvStore + ?Sized>(store: &S) -> CatalogResult<Vec<SourceStatus>> {
    let metadata = load_metadata(store).await?;
    let mut statuses = Vec::with_capacity(SourceTag::STAGED.len());
    for source in SourceTag::STAGED {
        let records = load_source(store, source).await?;
        statuses.push(SourceStatus {
            source,
            products_count: records.len(),
            last_import: metadata.last_import(source),
        });
    }
    Ok(statuses)
}
