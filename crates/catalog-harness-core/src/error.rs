//! Error types for the catalog core.

use std::fmt;

use crate::models::SourceTag;

/// Which key-value interaction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Get,
    Put,
    Encode,
    Decode,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreOp::Get => "get",
            StoreOp::Put => "put",
            StoreOp::Encode => "encode",
            StoreOp::Decode => "decode",
        })
    }
}

/// Top-level error enum for catalog operations.
///
/// Every variant aborts the current top-level operation. Nothing in the
/// core retries.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Malformed input at the boundary.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Underlying store read/write or (de)serialization failure.
    #[error("store {op} failed for key '{key}': {source}")]
    Storage {
        op: StoreOp,
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// A source snapshot exists but cannot be parsed; the merge is aborted.
    #[error("stored records for source '{source_tag}' are corrupt: {source}")]
    Merge {
        source_tag: SourceTag,
        #[source]
        source: serde_json::Error,
    },

    /// An index write failed. The catalog projection may already be one
    /// merge ahead of its indexes until the next successful recompute.
    #[error("index write failed for key '{key}': {source}")]
    Index {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("product not found: {0}")]
    NotFound(String),
}

impl CatalogError {
    pub(crate) fn storage(op: StoreOp, key: &str, source: impl Into<anyhow::Error>) -> Self {
        CatalogError::Storage {
            op,
            key: key.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn index(key: &str, source: impl Into<anyhow::Error>) -> Self {
        CatalogError::Index {
            key: key.to_string(),
            source: source.into(),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
