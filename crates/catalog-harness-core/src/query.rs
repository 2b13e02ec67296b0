//! Catalog query façade.
//!
//! Read path over the persisted projection and indexes. Filters are
//! applied in order (category, manufacturer, search) and combine with AND;
//! pagination slices the filtered list.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CatalogError, CatalogResult};
use crate::models::{CatalogEntry, CatalogProjection, MergedProduct};
use crate::store::{get_json, keys, KvStore};

/// Default page size for listings.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Listing options. Blank strings count as "not given".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub kategorie: Option<String>,
    pub vyrobce: Option<String>,
    pub search: Option<String>,
    #[serde(default, deserialize_with = "de_count")]
    pub page: Option<usize>,
    #[serde(default, deserialize_with = "de_count")]
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Count {
    Number(usize),
    Text(String),
}

/// Accepts a number or a numeric string; an empty string is "not given".
fn de_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Number(n)) => Ok(Some(n)),
        Some(Count::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse().map(Some).map_err(|_| {
                serde::de::Error::custom(format!(
                    "expected a non-negative whole number, got '{}'",
                    text
                ))
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total_products: usize,
    pub total_pages: usize,
}

/// One page of catalog entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<CatalogEntry>,
    pub pagination: Pagination,
    pub last_updated: Option<DateTime<Utc>>,
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Lists catalog entries matching `query`.
///
/// A filter naming an unknown category or manufacturer yields an empty
/// page, not an error.
pub async fn get_products<S: KvStore + ?Sized>(
    store: &S,
    query: &ProductQuery,
    default_limit: usize,
) -> CatalogResult<ProductPage> {
    let projection: Option<CatalogProjection> = get_json(store, keys::PRODUCT_CATALOG).await?;
    let (mut products, last_updated) = match projection {
        Some(p) => (p.products, Some(p.last_updated)),
        None => (Vec::new(), None),
    };

    if let Some(category) = given(&query.kategorie) {
        let codes = load_bucket(store, &keys::category_index(category)).await?;
        products.retain(|p| codes.contains(&p.kod));
    }

    if let Some(manufacturer) = given(&query.vyrobce) {
        let codes = load_bucket(store, &keys::manufacturer_index(manufacturer)).await?;
        products.retain(|p| codes.contains(&p.kod));
    }

    if let Some(search) = given(&query.search) {
        let needle = search.to_lowercase();
        products.retain(|p| {
            p.kod.to_lowercase().contains(&needle) || p.nazev.to_lowercase().contains(&needle)
        });
    }

    let (products, pagination) = paginate(
        products,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(default_limit),
    );

    Ok(ProductPage {
        products,
        pagination,
        last_updated,
    })
}

async fn load_bucket<S: KvStore + ?Sized>(store: &S, key: &str) -> CatalogResult<HashSet<String>> {
    let codes: Option<Vec<String>> = get_json(store, key).await?;
    Ok(codes.unwrap_or_default().into_iter().collect())
}

/// Slices `items` to the requested 1-based page.
///
/// `page` and `limit` of zero are treated as 1.
pub fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> (Vec<T>, Pagination) {
    let page = page.max(1);
    let limit = limit.max(1);
    let total = items.len();
    let start = (page - 1).saturating_mul(limit);
    let slice = items.into_iter().skip(start).take(limit).collect();
    (
        slice,
        Pagination {
            page,
            limit,
            total_products: total,
            total_pages: total.div_ceil(limit),
        },
    )
}

/// Reads the full merged record of one product.
pub async fn get_product_detail<S: KvStore + ?Sized>(
    store: &S,
    kod: &str,
) -> CatalogResult<MergedProduct> {
    get_json(store, &keys::product(kod.trim()))
        .await?
        .ok_or_else(|| CatalogError::NotFound(kod.to_string()))
}

/// Distinct category names of the last merge.
pub async fn get_product_categories<S: KvStore + ?Sized>(store: &S) -> CatalogResult<Vec<String>> {
    Ok(get_json(store, keys::PRODUCT_CATEGORIES)
        .await?
        .unwrap_or_default())
}

/// Distinct manufacturer names of the last merge.
pub async fn get_product_manufacturers<S: KvStore + ?Sized>(
    store: &S,
) -> CatalogResult<Vec<String>> {
    Ok(get_json(store, keys::PRODUCT_MANUFACTURERS)
        .await?
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_page_params_are_not_given() {
        let query: ProductQuery =
            serde_json::from_str(r#"{"page": "", "limit": " 20 ", "search": ""}"#).unwrap();
        assert_eq!(query.page, None);
        assert_eq!(query.limit, Some(20));

        let query: ProductQuery = serde_json::from_str(r#"{"page": 3}"#).unwrap();
        assert_eq!(query.page, Some(3));
    }

    #[test]
    fn test_non_numeric_page_is_rejected() {
        let err = serde_json::from_str::<ProductQuery>(r#"{"page": "abc"}"#).unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_second_page_of_120() {
        let items: Vec<usize> = (0..120).collect();
        let (page, info) = paginate(items, 2, 50);
        assert_eq!(page.len(), 50);
        assert_eq!(page[0], 50);
        assert_eq!(info.total_pages, 3);
        assert_eq!(info.total_products, 120);
    }

    #[test]
    fn test_last_partial_page() {
        let (page, info) = paginate((0..120).collect::<Vec<_>>(), 3, 50);
        assert_eq!(page, (100..120).collect::<Vec<_>>());
        assert_eq!(info.page, 3);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let (page, info) = paginate((0..10).collect::<Vec<_>>(), 5, 50);
        assert!(page.is_empty());
        assert_eq!(info.total_pages, 1);
    }

    #[test]
    fn test_zero_page_and_limit_clamp_to_one() {
        let (page, info) = paginate(vec!["a", "b", "c"], 0, 0);
        assert_eq!(page, vec!["a"]);
        assert_eq!(info.page, 1);
        assert_eq!(info.limit, 1);
        assert_eq!(info.total_pages, 3);
    }

    #[test]
    fn test_empty_list_has_zero_pages() {
        let (page, info) = paginate(Vec::<u8>::new(), 1, 50);
        assert!(page.is_empty());
        assert_eq!(info.total_pages, 0);
    }
}
