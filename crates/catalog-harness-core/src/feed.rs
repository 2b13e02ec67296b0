//! JSON feed boundary.
//!
//! Feed parsers (XML price lists, description feeds, spreadsheets) live
//! outside the core and hand over their rows as a JSON array of
//! [`ProductRecord`]s. This module turns such a document into typed records.
//! Only the shape is checked here; records without `kod` are kept and later
//! skipped by the merge engine.

use serde_json::Value;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{ProductRecord, SourceTag};

/// Parses a JSON document that must be an array of product records.
pub fn records_from_json(text: &str) -> CatalogResult<Vec<ProductRecord>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| CatalogError::Validation(format!("feed is not valid JSON: {}", e)))?;
    records_from_value(value)
}

/// Converts an already-parsed JSON value into product records.
pub fn records_from_value(value: Value) -> CatalogResult<Vec<ProductRecord>> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(CatalogError::Validation(format!(
                "products must be a JSON array, got {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item).map_err(|e| {
                CatalogError::Validation(format!("product at index {} is malformed: {}", i, e))
            })
        })
        .collect()
}

/// Fills in the provenance tag on records whose producer left it empty.
pub fn tag_untagged(records: &mut [ProductRecord], source: SourceTag) {
    for record in records.iter_mut().filter(|r| r.source.is_none()) {
        record.source = Some(source);
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
