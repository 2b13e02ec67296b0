//! Core data models used throughout Catalog Harness.
//!
//! These types represent the per-source product records produced by feed
//! parsers, the merged catalog entries derived from them, and the import
//! bookkeeping persisted next to the catalog.
//!
//! Field names follow the persisted JSON shape (`kod`, `nazev`, `cena_bez_dph`,
//! ...) so that values written by other tools against the same key space
//! deserialize without a mapping layer.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CatalogError;

/// Identifies which importer produced a record.
///
/// Only the first three tags name a staging slot in the source record store.
/// [`SourceTag::IntelekXml`] is a provenance tag carried by vendor-feed
/// records, which are staged under one of the other three slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// XML price list.
    XmlCenik,
    /// XML product descriptions.
    XmlPopisky,
    /// Spreadsheet upload.
    Excel,
    /// Vendor-specific XML feed.
    IntelekXml,
}

impl SourceTag {
    /// Staging slots, in merge-application order.
    pub const STAGED: [SourceTag; 3] = [SourceTag::XmlCenik, SourceTag::XmlPopisky, SourceTag::Excel];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::XmlCenik => "xml_cenik",
            SourceTag::XmlPopisky => "xml_popisky",
            SourceTag::Excel => "excel",
            SourceTag::IntelekXml => "intelek_xml",
        }
    }

    /// Whether records can be staged under this tag.
    pub fn is_staged(&self) -> bool {
        Self::STAGED.contains(self)
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTag {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "xml_cenik" => Ok(SourceTag::XmlCenik),
            "xml_popisky" => Ok(SourceTag::XmlPopisky),
            "excel" => Ok(SourceTag::Excel),
            "intelek_xml" => Ok(SourceTag::IntelekXml),
            other => Err(CatalogError::Validation(format!(
                "unknown source '{}'. Must be xml_cenik, xml_popisky, excel, or intelek_xml",
                other
            ))),
        }
    }
}

/// One product item from a single source, before merge.
///
/// `kod` is the natural key. Records with an empty `kod` are tolerated on
/// input and skipped by the merge engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default, deserialize_with = "de_code")]
    pub kod: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ean: Option<String>,
    #[serde(default)]
    pub nazev: String,
    /// Price excluding VAT.
    #[serde(default, deserialize_with = "de_price")]
    pub cena_bez_dph: f64,
    /// Price including VAT.
    #[serde(default, deserialize_with = "de_price")]
    pub cena_s_dph: f64,
    /// Stock level. Free-text availability is normalized away at the boundary.
    #[serde(default, deserialize_with = "de_availability")]
    pub dostupnost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kategorie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vyrobce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dodani: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minodber: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jednotka: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kratky_popis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obrazek: Option<String>,
    /// Newline-delimited `Name: Value` lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parametry: Option<String>,
    /// Newline-delimited `Name: Value` lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dokumenty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceTag>,
}

impl ProductRecord {
    /// Creates a record with only the code set.
    pub fn new(kod: impl Into<String>) -> Self {
        Self {
            kod: kod.into(),
            ..Default::default()
        }
    }

    pub fn has_code(&self) -> bool {
        !self.kod.trim().is_empty()
    }
}

/// One entry of the canonical catalog, one per distinct `kod`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedProduct {
    #[serde(flatten)]
    pub record: ProductRecord,
    /// Sources whose current snapshot contains this code, in merge order.
    #[serde(default)]
    pub merged_sources: Vec<SourceTag>,
}

impl MergedProduct {
    pub fn kod(&self) -> &str {
        &self.record.kod
    }
}

/// Compact per-product row of the [`CatalogProjection`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub kod: String,
    #[serde(default)]
    pub nazev: String,
    #[serde(default, deserialize_with = "de_price")]
    pub cena_bez_dph: f64,
    #[serde(default, deserialize_with = "de_price")]
    pub cena_s_dph: f64,
    #[serde(default, deserialize_with = "de_availability")]
    pub dostupnost: Option<f64>,
    #[serde(default)]
    pub kategorie: Option<String>,
    #[serde(default)]
    pub vyrobce: Option<String>,
    #[serde(default)]
    pub merged_sources: Vec<SourceTag>,
}

impl From<&MergedProduct> for CatalogEntry {
    fn from(product: &MergedProduct) -> Self {
        let r = &product.record;
        Self {
            kod: r.kod.clone(),
            nazev: r.nazev.clone(),
            cena_bez_dph: r.cena_bez_dph,
            cena_s_dph: r.cena_s_dph,
            dostupnost: r.dostupnost,
            kategorie: r.kategorie.clone(),
            vyrobce: r.vyrobce.clone(),
            merged_sources: product.merged_sources.clone(),
        }
    }
}

/// Read-optimized catalog view stored under a single key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProjection {
    pub last_updated: DateTime<Utc>,
    pub total_products: usize,
    pub products: Vec<CatalogEntry>,
}

impl CatalogProjection {
    pub fn new(last_updated: DateTime<Utc>, products: Vec<CatalogEntry>) -> Self {
        Self {
            last_updated,
            total_products: products.len(),
            products,
        }
    }
}

/// One row per import call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportHistoryEntry {
    #[serde(rename = "type")]
    pub source: SourceTag,
    pub timestamp: DateTime<Utc>,
    pub products_count: usize,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Import bookkeeping stored under the `product_sources` key.
///
/// Per-source timestamps are persisted as flat `last_import_<tag>` fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub import_history: Vec<ImportHistoryEntry>,
    #[serde(flatten)]
    pub last_imports: BTreeMap<String, DateTime<Utc>>,
}

impl SourceMetadata {
    fn last_import_field(source: SourceTag) -> String {
        format!("last_import_{}", source)
    }

    pub fn last_import(&self, source: SourceTag) -> Option<DateTime<Utc>> {
        self.last_imports
            .get(&Self::last_import_field(source))
            .copied()
    }

    pub fn set_last_import(&mut self, source: SourceTag, at: DateTime<Utc>) {
        self.last_imports.insert(Self::last_import_field(source), at);
    }
}

/// Response shape of the import history read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportHistory {
    pub import_history: Vec<ImportHistoryEntry>,
}

// ============ Lenient field decoding ============

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(f64),
    Text(String),
}

/// Parses `"12"`, `"3,5"` and `"1 234.50"`; anything else is `None`.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn de_code<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Option::<Loose>::deserialize(d)? {
        Some(Loose::Text(s)) => s.trim().to_string(),
        Some(Loose::Number(n)) if n.fract() == 0.0 => format!("{}", n as i64),
        Some(Loose::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

fn de_price<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(match Option::<Loose>::deserialize(d)? {
        Some(Loose::Number(n)) => n,
        Some(Loose::Text(s)) => parse_number(&s).unwrap_or(0.0),
        None => 0.0,
    })
}

fn de_availability<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Loose>::deserialize(d)? {
        Some(Loose::Number(n)) => Some(n),
        Some(Loose::Text(s)) => parse_number(&s),
        None => None,
    })
}
