//! Import history tracking.
//!
//! Every staged import prepends one [`ImportHistoryEntry`] to the history
//! kept in the `product_sources` metadata object and stamps the global and
//! per-source "last updated" times. The history is newest-first and capped;
//! entries beyond the cap are dropped from the tail.

use chrono::{DateTime, Utc};

use crate::error::CatalogResult;
use crate::models::{ImportHistory, ImportHistoryEntry, SourceMetadata, SourceTag};
use crate::store::{get_json, keys, put_json, KvStore};

/// Number of history entries kept unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Loads the metadata object, or an empty one if nothing was imported yet.
pub async fn load_metadata<S: KvStore + ?Sized>(store: &S) -> CatalogResult<SourceMetadata> {
    Ok(get_json(store, keys::PRODUCT_SOURCES)
        .await?
        .unwrap_or_default())
}

pub(crate) async fn save_metadata<S: KvStore + ?Sized>(
    store: &S,
    metadata: &SourceMetadata,
) -> CatalogResult<()> {
    put_json(store, keys::PRODUCT_SOURCES, metadata).await
}

/// Applies one import event to the metadata in place.
pub fn record_import(
    metadata: &mut SourceMetadata,
    source: SourceTag,
    at: DateTime<Utc>,
    products_count: usize,
    filename: Option<&str>,
    limit: usize,
) {
    metadata.last_updated = Some(at);
    metadata.set_last_import(source, at);
    metadata.import_history.insert(
        0,
        ImportHistoryEntry {
            source,
            timestamp: at,
            products_count,
            filename: filename.map(str::to_string),
        },
    );
    metadata.import_history.truncate(limit);
}

/// Returns the import history, newest first.
pub async fn get_product_import_history<S: KvStore + ?Sized>(
    store: &S,
) -> CatalogResult<ImportHistory> {
    let metadata = load_metadata(store).await?;
    Ok(ImportHistory {
        import_history: metadata.import_history,
    })
}
