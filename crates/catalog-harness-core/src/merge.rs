//! Merge engine.
//!
//! Rebuilds the canonical catalog from the three current source snapshots.
//! The merge is a pure function ([`merge_records`]); [`merge_product_data`]
//! wraps it with loading, persisting, and index maintenance.
//!
//! # Source Priority
//!
//! 1. **`xml_cenik` (base)** seeds the map with full records.
//! 2. **`xml_popisky` (enrich)** fills descriptive fields that are still
//!    blank. Names, prices, and availability are never touched.
//! 3. **`excel` (override)** replaces every shared field for which it
//!    carries a value: non-blank text, a non-zero price, or any numeric
//!    availability (`0` is a real stock level).
//!
//! Codes seen by a later pass only are appended after the existing entries,
//! so the output order is: price-list codes, then description-only codes,
//! then spreadsheet-only codes. Within one source a repeated code keeps its
//! first position and its last record.
//!
//! `merged_sources` is rebuilt on every merge and lists which current
//! snapshots contain the code; it is not a history.
//!
//! # Persistence
//!
//! The projection goes under `product_catalog`, then each product under
//! `products:<kod>` in batches. All writes of one batch are issued together
//! and the batch settles before the next starts. Re-running the whole
//! procedure after a partial failure overwrites every key again, so the
//! stored state converges without locking.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use indexmap::IndexMap;
use tracing::{debug, error, info, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::index::update_product_indexes;
use crate::models::{CatalogEntry, CatalogProjection, MergedProduct, ProductRecord, SourceTag};
use crate::sources::load_source;
use crate::store::{keys, put_json, KvStore};

/// Number of per-product writes issued together unless configured otherwise.
pub const DEFAULT_WRITE_BATCH_SIZE: usize = 50;

/// Merges the three source lists into one entry per distinct code.
pub fn merge_records(
    cenik: &[ProductRecord],
    popisky: &[ProductRecord],
    excel: &[ProductRecord],
) -> Vec<MergedProduct> {
    let mut merged: IndexMap<String, MergedProduct> = IndexMap::new();

    for (kod, record) in latest_by_code(cenik, SourceTag::XmlCenik) {
        merged.insert(kod, seed(record, SourceTag::XmlCenik));
    }

    for (kod, record) in latest_by_code(popisky, SourceTag::XmlPopisky) {
        match merged.get_mut(&kod) {
            Some(existing) => {
                enrich(&mut existing.record, record);
                existing.merged_sources.push(SourceTag::XmlPopisky);
            }
            None => {
                merged.insert(kod, seed(record, SourceTag::XmlPopisky));
            }
        }
    }

    for (kod, record) in latest_by_code(excel, SourceTag::Excel) {
        match merged.get_mut(&kod) {
            Some(existing) => {
                apply_override(&mut existing.record, record);
                existing.merged_sources.push(SourceTag::Excel);
            }
            None => {
                merged.insert(kod, seed(record, SourceTag::Excel));
            }
        }
    }

    merged.into_values().collect()
}

/// Collapses one source list to one record per code, last record winning.
fn latest_by_code(records: &[ProductRecord], source: SourceTag) -> IndexMap<String, &ProductRecord> {
    let mut latest = IndexMap::with_capacity(records.len());
    let mut skipped = 0usize;
    for record in records {
        if record.has_code() {
            latest.insert(record.kod.trim().to_string(), record);
        } else {
            skipped += 1;
        }
    }
    if skipped > 0 {
        warn!(source = %source, skipped, "skipped records without kod");
    }
    latest
}

fn seed(record: &ProductRecord, source: SourceTag) -> MergedProduct {
    let mut record = record.clone();
    record.kod = record.kod.trim().to_string();
    MergedProduct {
        record,
        merged_sources: vec![source],
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

fn is_set(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

fn descriptive(r: &ProductRecord) -> [&Option<String>; 10] {
    [
        &r.kategorie,
        &r.vyrobce,
        &r.dodani,
        &r.minodber,
        &r.jednotka,
        &r.popis,
        &r.kratky_popis,
        &r.obrazek,
        &r.parametry,
        &r.dokumenty,
    ]
}

fn descriptive_mut(r: &mut ProductRecord) -> [&mut Option<String>; 10] {
    [
        &mut r.kategorie,
        &mut r.vyrobce,
        &mut r.dodani,
        &mut r.minodber,
        &mut r.jednotka,
        &mut r.popis,
        &mut r.kratky_popis,
        &mut r.obrazek,
        &mut r.parametry,
        &mut r.dokumenty,
    ]
}

/// Existing value wins unless blank.
fn enrich(existing: &mut ProductRecord, incoming: &ProductRecord) {
    for (current, offered) in descriptive_mut(existing)
        .into_iter()
        .zip(descriptive(incoming))
    {
        if is_blank(current) && !is_blank(offered) {
            *current = offered.clone();
        }
    }
}

/// Incoming value wins when it carries one.
fn apply_override(existing: &mut ProductRecord, incoming: &ProductRecord) {
    if !incoming.nazev.trim().is_empty() {
        existing.nazev = incoming.nazev.clone();
    }
    if !is_blank(&incoming.ean) {
        existing.ean = incoming.ean.clone();
    }
    if is_set(incoming.cena_bez_dph) {
        existing.cena_bez_dph = incoming.cena_bez_dph;
    }
    if is_set(incoming.cena_s_dph) {
        existing.cena_s_dph = incoming.cena_s_dph;
    }
    if incoming.dostupnost.is_some() {
        existing.dostupnost = incoming.dostupnost;
    }
    for (current, offered) in descriptive_mut(existing)
        .into_iter()
        .zip(descriptive(incoming))
    {
        if !is_blank(offered) {
            *current = offered.clone();
        }
    }
}

/// Loads every source snapshot, merges, persists, and rebuilds indexes.
///
/// Returns the number of distinct merged products.
///
/// # Errors
///
/// - [`CatalogError::Merge`] if any snapshot is corrupt; nothing is written.
/// - [`CatalogError::Storage`] if the projection or a product write fails.
/// - [`CatalogError::Index`] if index maintenance fails. The projection is
///   already written at that point; the next successful run repairs it.
pub async fn merge_product_data<S: KvStore + ?Sized>(
    store: &S,
    batch_size: usize,
    now: DateTime<Utc>,
) -> CatalogResult<usize> {
    let cenik = load_source(store, SourceTag::XmlCenik).await?;
    let popisky = load_source(store, SourceTag::XmlPopisky).await?;
    let excel = load_source(store, SourceTag::Excel).await?;

    let merged = merge_records(&cenik, &popisky, &excel);

    let projection = CatalogProjection::new(now, merged.iter().map(CatalogEntry::from).collect());
    put_json(store, keys::PRODUCT_CATALOG, &projection).await?;

    write_products(store, &merged, batch_size).await?;

    if let Err(e) = update_product_indexes(store, &merged).await {
        error!(
            error = %e,
            products = merged.len(),
            "catalog written but index update failed; indexes lag until the next recompute"
        );
        return Err(e);
    }

    info!(
        xml_cenik = cenik.len(),
        xml_popisky = popisky.len(),
        excel = excel.len(),
        merged = merged.len(),
        "merged product catalog"
    );
    Ok(merged.len())
}

async fn write_products<S: KvStore + ?Sized>(
    store: &S,
    products: &[MergedProduct],
    batch_size: usize,
) -> CatalogResult<()> {
    for (n, batch) in products.chunks(batch_size.max(1)).enumerate() {
        let writes = batch.iter().map(|product| async move {
            put_json(store, &keys::product(product.kod()), product).await
        });
        join_all(writes)
            .await
            .into_iter()
            .collect::<CatalogResult<Vec<()>>>()?;
        debug!(batch = n, size = batch.len(), "wrote product batch");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(kod: &str) -> ProductRecord {
        ProductRecord::new(kod)
    }

    #[test]
    fn test_popisky_enriches_without_touching_prices() {
        let mut base = rec("A1");
        base.nazev = "Kabel UTP".into();
        base.cena_bez_dph = 100.0;
        base.cena_s_dph = 121.0;
        base.dostupnost = Some(4.0);
        base.vyrobce = Some("Solarix".into());

        let mut desc = rec("A1");
        desc.nazev = "Jiny nazev".into();
        desc.cena_bez_dph = 1.0;
        desc.kategorie = Some("Kabely".into());
        desc.vyrobce = Some("Jiny".into());

        let merged = merge_records(&[base], &[desc], &[]);
        assert_eq!(merged.len(), 1);
        let p = &merged[0].record;
        assert_eq!(p.nazev, "Kabel UTP");
        assert_eq!(p.cena_bez_dph, 100.0);
        assert_eq!(p.dostupnost, Some(4.0));
        assert_eq!(p.kategorie.as_deref(), Some("Kabely"));
        assert_eq!(p.vyrobce.as_deref(), Some("Solarix"));
        assert_eq!(
            merged[0].merged_sources,
            vec![SourceTag::XmlCenik, SourceTag::XmlPopisky]
        );
    }

    #[test]
    fn test_excel_overrides_only_present_values() {
        let mut base = rec("A1");
        base.nazev = "Kabel".into();
        base.ean = Some("8590000000001".into());
        base.cena_bez_dph = 100.0;
        base.cena_s_dph = 121.0;
        base.dostupnost = Some(10.0);
        base.popis = Some("Puvodni".into());

        let mut sheet = rec("A1");
        sheet.cena_bez_dph = 90.0;
        sheet.dostupnost = Some(0.0);
        sheet.popis = Some("  ".into());

        let merged = merge_records(&[base], &[], &[sheet]);
        let p = &merged[0].record;
        assert_eq!(p.nazev, "Kabel");
        assert_eq!(p.ean.as_deref(), Some("8590000000001"));
        assert_eq!(p.cena_bez_dph, 90.0);
        assert_eq!(p.cena_s_dph, 121.0);
        assert_eq!(p.dostupnost, Some(0.0), "zero stock is a real value");
        assert_eq!(p.popis.as_deref(), Some("Puvodni"));
    }

    #[test]
    fn test_excel_without_availability_keeps_existing() {
        let mut base = rec("A1");
        base.dostupnost = Some(7.0);
        let merged = merge_records(&[base], &[], &[rec("A1")]);
        assert_eq!(merged[0].record.dostupnost, Some(7.0));
    }

    #[test]
    fn test_priority_across_all_three_sources() {
        let mut base = rec("A1");
        base.nazev = "Cenik".into();
        base.kategorie = Some("Z ceniku".into());
        let mut desc = rec("A1");
        desc.kategorie = Some("Z popisku".into());
        desc.popis = Some("Popis z popisku".into());
        let mut sheet = rec("A1");
        sheet.nazev = "Excel".into();
        sheet.kategorie = Some("Z excelu".into());

        let merged = merge_records(&[base], &[desc], &[sheet]);
        let p = &merged[0];
        assert_eq!(p.record.nazev, "Excel");
        assert_eq!(p.record.kategorie.as_deref(), Some("Z excelu"));
        assert_eq!(p.record.popis.as_deref(), Some("Popis z popisku"));
        assert_eq!(
            p.merged_sources,
            vec![SourceTag::XmlCenik, SourceTag::XmlPopisky, SourceTag::Excel]
        );
    }

    #[test]
    fn test_output_order_follows_first_appearance_by_pass() {
        let merged = merge_records(
            &[rec("C1"), rec("C2")],
            &[rec("P1"), rec("C1")],
            &[rec("E1"), rec("P1"), rec("C2")],
        );
        let codes: Vec<&str> = merged.iter().map(|p| p.kod()).collect();
        assert_eq!(codes, vec!["C1", "C2", "P1", "E1"]);
        assert_eq!(merged[2].merged_sources, vec![SourceTag::XmlPopisky, SourceTag::Excel]);
        assert_eq!(merged[3].merged_sources, vec![SourceTag::Excel]);
    }

    #[test]
    fn test_duplicate_codes_within_source_last_wins_once() {
        let mut first = rec("A1");
        first.nazev = "Prvni".into();
        let mut second = rec("A1");
        second.nazev = "Druhy".into();
        let mut other = rec("B1");
        other.nazev = "Jiny".into();

        let mut desc_a = rec("A1");
        desc_a.kategorie = Some("Prvni".into());
        let mut desc_b = rec("A1");
        desc_b.kategorie = Some("Druha".into());

        let merged = merge_records(&[first, other, second], &[desc_a, desc_b], &[]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].kod(), "A1");
        assert_eq!(merged[0].record.nazev, "Druhy");
        assert_eq!(merged[0].record.kategorie.as_deref(), Some("Druha"));
        assert_eq!(
            merged[0].merged_sources,
            vec![SourceTag::XmlCenik, SourceTag::XmlPopisky]
        );
    }

    #[test]
    fn test_records_without_code_are_skipped() {
        let mut blank = rec("   ");
        blank.kategorie = Some("Kabely".into());
        let merged = merge_records(&[rec(""), rec("A1")], &[blank], &[rec("")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].kod(), "A1");
    }

    #[test]
    fn test_empty_sources_merge_to_empty_catalog() {
        assert!(merge_records(&[], &[], &[]).is_empty());
    }
}
