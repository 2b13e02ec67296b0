//! Import command orchestration.
//!
//! Reads a JSON feed produced by an external parser, stages it under the
//! requested source, and (depending on `[catalog].recompute`) rebuilds the
//! merged catalog. An empty feed is stored and reported as a warning.

use anyhow::{Context, Result};
use std::path::Path;

use catalog_harness_core::feed::{records_from_json, tag_untagged};
use catalog_harness_core::{RecomputePolicy, SourceTag};

use crate::config::Config;
use crate::db;

/// CLI entry point for `catalog import <source> <file>`.
pub async fn run_import(
    config: &Config,
    source: &str,
    path: &Path,
    filename: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let source: SourceTag = source.parse()?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feed file: {}", path.display()))?;
    let mut records = records_from_json(&text)?;
    tag_untagged(&mut records, source);

    let without_code = records.iter().filter(|r| !r.has_code()).count();

    if dry_run {
        println!("import {} (dry-run)", source);
        println!("  records found: {}", records.len());
        println!("  records without kod: {}", without_code);
        return Ok(());
    }

    let filename = filename.or_else(|| {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
    });

    let catalog = db::open_catalog(config).await?;
    let stored = catalog
        .store_products_from_source(&records, source, filename.as_deref())
        .await?;

    println!("import {}", source);
    println!("  stored records: {}", stored);
    if without_code > 0 {
        println!("  skipped at merge (no kod): {}", without_code);
    }
    match config.catalog.recompute {
        RecomputePolicy::Always => {
            let page = catalog.get_products(&Default::default()).await?;
            println!("  catalog products: {}", page.pagination.total_products);
        }
        RecomputePolicy::Manual => {
            println!("  catalog not rebuilt (recompute = \"manual\"); run `catalog recompute`");
        }
    }
    if records.is_empty() {
        println!("warning: feed contained no products");
    }
    println!("ok");

    catalog.store().pool().close().await;
    Ok(())
}

/// CLI entry point for `catalog recompute`.
pub async fn run_recompute(config: &Config) -> Result<()> {
    let catalog = db::open_catalog(config).await?;
    let merged = catalog.recompute().await?;

    println!("recompute");
    println!("  merged products: {}", merged);
    println!(
        "  categories: {}",
        catalog.get_product_categories().await?.len()
    );
    println!(
        "  manufacturers: {}",
        catalog.get_product_manufacturers().await?.len()
    );
    println!("ok");

    catalog.store().pool().close().await;
    Ok(())
}
