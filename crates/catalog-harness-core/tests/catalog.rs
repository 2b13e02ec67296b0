//! Integration tests for the catalog pipeline: import → merge → index → query.
//!
//! All tests run against the in-memory store, optionally wrapped in a store
//! that fails writes for selected key prefixes.

use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;
use catalog_harness_core::models::CatalogProjection;
use catalog_harness_core::query::ProductQuery;
use catalog_harness_core::store::{keys, InMemoryStore, KvStore};
use catalog_harness_core::{
    Catalog, CatalogError, CatalogOptions, ProductRecord, RecomputePolicy, SourceTag,
};

// ─── Helpers ────────────────────────────────────────────────────────

/// Store wrapper that rejects writes to keys starting with a prefix.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryStore,
    fail_prefix: Mutex<Option<String>>,
}

impl FlakyStore {
    fn fail_puts(&self, prefix: &str) {
        *self.fail_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    fn heal(&self) {
        *self.fail_prefix.lock().unwrap() = None;
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: String) -> anyhow::Result<()> {
        let failing = self
            .fail_prefix
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|p| key.starts_with(p));
        if failing {
            bail!("simulated write failure");
        }
        self.inner.put(key, value).await
    }
}

fn catalog() -> Catalog<Arc<InMemoryStore>> {
    Catalog::new(Arc::new(InMemoryStore::new()))
}

fn priced(kod: &str, bez: f64, s: f64) -> ProductRecord {
    let mut r = ProductRecord::new(kod);
    r.cena_bez_dph = bez;
    r.cena_s_dph = s;
    r
}

fn categorized(kod: &str, kategorie: &str) -> ProductRecord {
    let mut r = ProductRecord::new(kod);
    r.kategorie = Some(kategorie.to_string());
    r
}

async fn projection<S: KvStore>(catalog: &Catalog<S>) -> Option<CatalogProjection> {
    catalog
        .store()
        .get(keys::PRODUCT_CATALOG)
        .await
        .unwrap()
        .map(|text| serde_json::from_str(&text).unwrap())
}

async fn bucket<S: KvStore>(catalog: &Catalog<S>, key: &str) -> Vec<String> {
    catalog
        .store()
        .get(key)
        .await
        .unwrap()
        .map(|text| serde_json::from_str(&text).unwrap())
        .unwrap_or_default()
}

/// Scenario A then B: price list, descriptions, spreadsheet correction.
async fn import_a1_from_all_sources<S: KvStore>(catalog: &Catalog<S>) {
    catalog
        .store_products_from_source(&[priced("A1", 100.0, 121.0)], SourceTag::XmlCenik, None)
        .await
        .unwrap();
    catalog
        .store_products_from_source(&[categorized("A1", "Kabely")], SourceTag::XmlPopisky, None)
        .await
        .unwrap();
    catalog
        .store_products_from_source(
            &[priced("A1", 90.0, 0.0)],
            SourceTag::Excel,
            Some("opravy.xlsx"),
        )
        .await
        .unwrap();
}

// ─── Scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_descriptions_enrich_price_list() {
    let catalog = catalog();
    catalog
        .store_products_from_source(&[priced("A1", 100.0, 121.0)], SourceTag::XmlCenik, None)
        .await
        .unwrap();
    catalog
        .store_products_from_source(&[categorized("A1", "Kabely")], SourceTag::XmlPopisky, None)
        .await
        .unwrap();

    let a1 = catalog.get_product_detail("A1").await.unwrap();
    assert_eq!(a1.record.cena_bez_dph, 100.0);
    assert_eq!(a1.record.cena_s_dph, 121.0);
    assert_eq!(a1.record.kategorie.as_deref(), Some("Kabely"));
    assert_eq!(
        a1.merged_sources,
        vec![SourceTag::XmlCenik, SourceTag::XmlPopisky]
    );
}

#[tokio::test]
async fn test_spreadsheet_overrides_price_and_keeps_category() {
    let catalog = catalog();
    import_a1_from_all_sources(&catalog).await;

    let a1 = catalog.get_product_detail("A1").await.unwrap();
    assert_eq!(a1.record.cena_bez_dph, 90.0);
    assert_eq!(a1.record.cena_s_dph, 121.0);
    assert_eq!(a1.record.kategorie.as_deref(), Some("Kabely"));
    assert_eq!(
        a1.merged_sources,
        vec![SourceTag::XmlCenik, SourceTag::XmlPopisky, SourceTag::Excel]
    );
}

#[tokio::test]
async fn test_category_listing_after_all_sources() {
    let catalog = catalog();
    import_a1_from_all_sources(&catalog).await;

    let page = catalog
        .get_products(&ProductQuery {
            kategorie: Some("Kabely".into()),
            page: Some(1),
            limit: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].kod, "A1");
    assert_eq!(page.products[0].cena_bez_dph, 90.0);
    assert_eq!(page.pagination.total_products, 1);
    assert!(page.last_updated.is_some());

    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["pagination"]["totalProducts"], 1);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let catalog = catalog();
    import_a1_from_all_sources(&catalog).await;

    let err = catalog.get_product_detail("ZZZ").await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(ref kod) if kod == "ZZZ"));
}

// ─── Properties ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_reimporting_same_snapshot_is_idempotent() {
    let catalog = catalog();
    let records = vec![priced("A1", 10.0, 12.1), priced("B1", 20.0, 24.2)];

    catalog
        .store_products_from_source(&records, SourceTag::XmlCenik, None)
        .await
        .unwrap();
    let first = projection(&catalog).await.unwrap();

    catalog
        .store_products_from_source(&records, SourceTag::XmlCenik, None)
        .await
        .unwrap();
    let second = projection(&catalog).await.unwrap();

    assert_eq!(first.products, second.products);
    assert_eq!(second.total_products, 2);
    assert_eq!(
        second.products[0].merged_sources,
        vec![SourceTag::XmlCenik],
        "merged_sources must not accumulate across runs"
    );
}

#[tokio::test]
async fn test_description_only_product_has_single_source() {
    let catalog = catalog();
    catalog
        .store_products_from_source(&[priced("A1", 1.0, 1.0)], SourceTag::XmlCenik, None)
        .await
        .unwrap();
    catalog
        .store_products_from_source(&[categorized("P9", "Nastroje")], SourceTag::XmlPopisky, None)
        .await
        .unwrap();

    let p9 = catalog.get_product_detail("P9").await.unwrap();
    assert_eq!(p9.merged_sources, vec![SourceTag::XmlPopisky]);
}

#[tokio::test]
async fn test_records_without_code_never_reach_catalog_or_indexes() {
    let catalog = catalog();
    let mut orphan = categorized("", "Sirotci");
    orphan.vyrobce = Some("Nikdo".into());
    catalog
        .store_products_from_source(
            &[orphan.clone(), categorized("A1", "Kabely")],
            SourceTag::XmlCenik,
            None,
        )
        .await
        .unwrap();
    catalog
        .store_products_from_source(&[orphan], SourceTag::Excel, None)
        .await
        .unwrap();

    let proj = projection(&catalog).await.unwrap();
    assert_eq!(proj.total_products, 1);
    assert_eq!(catalog.get_product_categories().await.unwrap(), vec!["Kabely"]);
    assert!(catalog.get_product_manufacturers().await.unwrap().is_empty());
    assert!(bucket(&catalog, &keys::category_index("Sirotci")).await.is_empty());
}

#[tokio::test]
async fn test_padded_names_filter_by_listed_name() {
    let catalog = catalog();
    let mut record = categorized("A1", "Kabely ");
    record.vyrobce = Some(" Solarix".to_string());
    catalog
        .store_products_from_source(&[record], SourceTag::XmlCenik, None)
        .await
        .unwrap();

    let categories = catalog.get_product_categories().await.unwrap();
    let manufacturers = catalog.get_product_manufacturers().await.unwrap();
    assert_eq!(categories, vec!["Kabely"]);
    assert_eq!(manufacturers, vec!["Solarix"]);

    let by_category = catalog
        .get_products(&ProductQuery {
            kategorie: Some(categories[0].clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_category.pagination.total_products, 1);

    let by_manufacturer = catalog
        .get_products(&ProductQuery {
            vyrobce: Some(manufacturers[0].clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_manufacturer.pagination.total_products, 1);
    assert_eq!(by_manufacturer.products[0].kod, "A1");
}

#[tokio::test]
async fn test_dropped_code_keeps_detail_but_leaves_listing() {
    let catalog = catalog();
    catalog
        .store_products_from_source(
            &[priced("A1", 100.0, 121.0), priced("B2", 50.0, 60.5)],
            SourceTag::XmlCenik,
            None,
        )
        .await
        .unwrap();
    catalog
        .store_products_from_source(&[priced("A1", 100.0, 121.0)], SourceTag::XmlCenik, None)
        .await
        .unwrap();

    let page = catalog.get_products(&ProductQuery::default()).await.unwrap();
    assert_eq!(page.pagination.total_products, 1);
    assert_eq!(page.products[0].kod, "A1");

    let stale = catalog.get_product_detail("B2").await.unwrap();
    assert_eq!(stale.record.cena_bez_dph, 50.0);
}

#[tokio::test]
async fn test_every_categorized_product_is_in_its_bucket() {
    let catalog = catalog();
    let records: Vec<ProductRecord> = (0..30)
        .map(|i| {
            let mut r = categorized(&format!("K{:02}", i), ["Kabely", "Konektory", "Switche"][i % 3]);
            if i % 2 == 0 {
                r.vyrobce = Some("Solarix".into());
            }
            r
        })
        .collect();
    catalog
        .store_products_from_source(&records, SourceTag::XmlCenik, None)
        .await
        .unwrap();

    let categories = catalog.get_product_categories().await.unwrap();
    let manufacturers = catalog.get_product_manufacturers().await.unwrap();
    for entry in projection(&catalog).await.unwrap().products {
        let category = entry.kategorie.clone().unwrap();
        let codes = bucket(&catalog, &keys::category_index(&category)).await;
        assert_eq!(codes.iter().filter(|c| **c == entry.kod).count(), 1);
        assert!(categories.contains(&category));
        if let Some(m) = entry.vyrobce {
            assert!(bucket(&catalog, &keys::manufacturer_index(&m))
                .await
                .contains(&entry.kod));
            assert!(manufacturers.contains(&m));
        }
    }
    assert_eq!(bucket(&catalog, &keys::manufacturer_index("Solarix")).await.len(), 15);
}

#[tokio::test]
async fn test_pagination_over_filtered_listing() {
    let catalog = catalog();
    let mut records: Vec<ProductRecord> = (0..120)
        .map(|i| categorized(&format!("P{:03}", i), "Kabely"))
        .collect();
    records.push(categorized("X1", "Jine"));
    catalog
        .store_products_from_source(&records, SourceTag::XmlCenik, None)
        .await
        .unwrap();

    let page = catalog
        .get_products(&ProductQuery {
            kategorie: Some("Kabely".into()),
            page: Some(2),
            limit: Some(50),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.products.len(), 50);
    assert_eq!(page.products[0].kod, "P050");
    assert_eq!(page.pagination.total_products, 120);
    assert_eq!(page.pagination.total_pages, 3);
}

#[tokio::test]
async fn test_history_keeps_twenty_newest_imports() {
    let catalog = catalog();
    for i in 0..25 {
        let records: Vec<ProductRecord> =
            (0..i).map(|n| ProductRecord::new(format!("H{}", n))).collect();
        catalog
            .store_products_from_source(
                &records,
                SourceTag::Excel,
                Some(&format!("import-{}.xlsx", i)),
            )
            .await
            .unwrap();
    }

    let history = catalog.get_product_import_history().await.unwrap();
    assert_eq!(history.import_history.len(), 20);
    assert_eq!(
        history.import_history[0].filename.as_deref(),
        Some("import-24.xlsx")
    );
    assert_eq!(history.import_history[19].products_count, 5);
    assert!(history
        .import_history
        .iter()
        .all(|e| e.source == SourceTag::Excel));
}

// ─── Queries ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_filters_combine_with_search() {
    let catalog = catalog();
    let mut a = categorized("UTP-5E", "Kabely");
    a.nazev = "Kabel UTP Cat5e".into();
    a.vyrobce = Some("Solarix".into());
    let mut b = categorized("FTP-6", "Kabely");
    b.nazev = "Kabel FTP Cat6".into();
    b.vyrobce = Some("Solarix".into());
    let mut c = categorized("RJ45", "Konektory");
    c.nazev = "Konektor utp".into();
    c.vyrobce = Some("Solarix".into());
    catalog
        .store_products_from_source(&[a, b, c], SourceTag::XmlCenik, None)
        .await
        .unwrap();

    let by_name = catalog
        .get_products(&ProductQuery {
            search: Some("  utp ".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    let codes: Vec<&str> = by_name.products.iter().map(|p| p.kod.as_str()).collect();
    assert_eq!(codes, vec!["UTP-5E", "RJ45"]);

    let combined = catalog
        .get_products(&ProductQuery {
            kategorie: Some("Kabely".into()),
            vyrobce: Some("Solarix".into()),
            search: Some("ftp".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(combined.products.len(), 1);
    assert_eq!(combined.products[0].kod, "FTP-6");

    let unknown = catalog
        .get_products(&ProductQuery {
            vyrobce: Some("Neznamy".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(unknown.products.is_empty());
    assert_eq!(unknown.pagination.total_pages, 0);
}

#[tokio::test]
async fn test_empty_store_reads_are_empty() {
    let catalog = catalog();
    let page = catalog.get_products(&ProductQuery::default()).await.unwrap();
    assert!(page.products.is_empty());
    assert!(page.last_updated.is_none());
    assert_eq!(page.pagination.limit, 50);
    assert!(catalog.get_product_categories().await.unwrap().is_empty());
    assert!(catalog
        .get_product_import_history()
        .await
        .unwrap()
        .import_history
        .is_empty());
}

#[tokio::test]
async fn test_recompute_with_no_sources_writes_empty_catalog() {
    let catalog = catalog();
    assert_eq!(catalog.recompute().await.unwrap(), 0);
    let proj = projection(&catalog).await.unwrap();
    assert_eq!(proj.total_products, 0);
}

#[tokio::test]
async fn test_empty_import_is_a_successful_zero() {
    let catalog = catalog();
    let count = catalog
        .store_products_from_source(&[], SourceTag::XmlPopisky, Some("prazdny.xml"))
        .await
        .unwrap();
    assert_eq!(count, 0);
    let history = catalog.get_product_import_history().await.unwrap();
    assert_eq!(history.import_history[0].products_count, 0);
}

#[tokio::test]
async fn test_source_status_reports_counts_and_times() {
    let catalog = catalog();
    catalog
        .store_products_from_source(&[priced("A1", 1.0, 1.0), priced("A2", 2.0, 2.0)], SourceTag::XmlCenik, None)
        .await
        .unwrap();

    let status = catalog.source_status().await.unwrap();
    assert_eq!(status.len(), 3);
    assert_eq!(status[0].source, SourceTag::XmlCenik);
    assert_eq!(status[0].products_count, 2);
    assert!(status[0].last_import.is_some());
    assert_eq!(status[2].source, SourceTag::Excel);
    assert!(status[2].last_import.is_none());
}

// ─── Lifecycle ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_vanished_category_bucket_is_emptied() {
    let catalog = catalog();
    catalog
        .store_products_from_source(
            &[categorized("A1", "Kabely"), categorized("B1", "Stare")],
            SourceTag::XmlCenik,
            None,
        )
        .await
        .unwrap();
    assert_eq!(bucket(&catalog, &keys::category_index("Stare")).await, vec!["B1"]);

    catalog
        .store_products_from_source(&[categorized("A1", "Kabely")], SourceTag::XmlCenik, None)
        .await
        .unwrap();
    assert!(bucket(&catalog, &keys::category_index("Stare")).await.is_empty());
    assert_eq!(catalog.get_product_categories().await.unwrap(), vec!["Kabely"]);
}

#[tokio::test]
async fn test_manual_policy_defers_merge() {
    let catalog = Catalog::with_options(
        Arc::new(InMemoryStore::new()),
        CatalogOptions {
            recompute: RecomputePolicy::Manual,
            ..Default::default()
        },
    );
    catalog
        .store_products_from_source(&[priced("A1", 5.0, 6.0)], SourceTag::XmlCenik, None)
        .await
        .unwrap();
    assert!(projection(&catalog).await.is_none());

    assert_eq!(catalog.recompute().await.unwrap(), 1);
    assert_eq!(catalog.get_product_detail("A1").await.unwrap().record.cena_bez_dph, 5.0);
}

#[tokio::test]
async fn test_small_write_batches_store_every_product() {
    let store = Arc::new(InMemoryStore::new());
    let catalog = Catalog::with_options(
        store.clone(),
        CatalogOptions {
            write_batch_size: 3,
            ..Default::default()
        },
    );
    let records: Vec<ProductRecord> = (0..10).map(|i| ProductRecord::new(format!("B{}", i))).collect();
    catalog
        .store_products_from_source(&records, SourceTag::Excel, None)
        .await
        .unwrap();
    assert_eq!(store.keys_with_prefix("products:").len(), 10);
}

/// Imports racing each other are not serialized. Whatever the interleaving,
/// a later recompute converges to a catalog reflecting every snapshot.
#[tokio::test]
async fn test_concurrent_imports_converge_after_recompute() {
    let catalog = catalog();
    let cenik = [priced("A1", 100.0, 121.0)];
    let popisky = [categorized("A1", "Kabely")];
    let (a, b) = tokio::join!(
        catalog.store_products_from_source(&cenik, SourceTag::XmlCenik, None),
        catalog.store_products_from_source(&popisky, SourceTag::XmlPopisky, None),
    );
    a.unwrap();
    b.unwrap();

    catalog.recompute().await.unwrap();
    let a1 = catalog.get_product_detail("A1").await.unwrap();
    assert_eq!(a1.record.cena_bez_dph, 100.0);
    assert_eq!(a1.record.kategorie.as_deref(), Some("Kabely"));
}

// ─── Failures ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_vendor_tag_cannot_be_staged() {
    let catalog = catalog();
    let err = catalog
        .store_products_from_source(&[ProductRecord::new("V1")], SourceTag::IntelekXml, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));
}

#[tokio::test]
async fn test_corrupt_source_aborts_merge_without_writing() {
    let catalog = catalog();
    catalog
        .store()
        .put(&keys::source(SourceTag::Excel), "[{\"kod\": ".to_string())
        .await
        .unwrap();

    let err = catalog
        .store_products_from_source(&[priced("A1", 1.0, 1.0)], SourceTag::XmlCenik, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Merge {
            source_tag: SourceTag::Excel,
            ..
        }
    ));
    assert!(projection(&catalog).await.is_none());
    assert!(catalog.get_product_detail("A1").await.is_err());
}

#[tokio::test]
async fn test_failed_snapshot_write_is_storage_error() {
    let store = Arc::new(FlakyStore::default());
    let catalog = Catalog::new(store.clone());
    store.fail_puts("source_");

    let err = catalog
        .store_products_from_source(&[priced("A1", 1.0, 1.0)], SourceTag::XmlCenik, None)
        .await
        .unwrap_err();
    match err {
        CatalogError::Storage { key, .. } => assert_eq!(key, "source_xml_cenik"),
        other => panic!("expected storage error, got {other:?}"),
    }
    assert!(catalog
        .get_product_import_history()
        .await
        .unwrap()
        .import_history
        .is_empty());
}

#[tokio::test]
async fn test_index_failure_leaves_catalog_ahead_until_recompute() {
    let store = Arc::new(FlakyStore::default());
    let catalog = Catalog::new(store.clone());
    store.fail_puts("product_index_");

    let err = catalog
        .store_products_from_source(&[categorized("A1", "Kabely")], SourceTag::XmlCenik, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Index { .. }));

    // Catalog and detail are written, the category bucket is not.
    assert_eq!(projection(&catalog).await.unwrap().total_products, 1);
    assert!(catalog.get_product_detail("A1").await.is_ok());
    let filtered = catalog
        .get_products(&ProductQuery {
            kategorie: Some("Kabely".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(filtered.products.is_empty());

    store.heal();
    catalog.recompute().await.unwrap();
    let filtered = catalog
        .get_products(&ProductQuery {
            kategorie: Some("Kabely".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(filtered.products.len(), 1);
}
