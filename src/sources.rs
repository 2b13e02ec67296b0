//! Source status and import history listings.

use anyhow::Result;

use crate::config::Config;
use crate::db;

/// CLI entry point for `catalog sources`.
pub async fn list_sources(config: &Config) -> Result<()> {
    let catalog = db::open_catalog(config).await?;
    let statuses = catalog.source_status().await?;
    catalog.store().pool().close().await;

    println!("{:<14} {:>10}  LAST IMPORT", "SOURCE", "PRODUCTS");
    for status in statuses {
        let last = status
            .last_import
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<14} {:>10}  {}",
            status.source.as_str(),
            status.products_count,
            last
        );
    }

    Ok(())
}

/// CLI entry point for `catalog history`.
pub async fn run_history(config: &Config, json: bool) -> Result<()> {
    let catalog = db::open_catalog(config).await?;
    let history = catalog.get_product_import_history().await?;
    catalog.store().pool().close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.import_history.is_empty() {
        println!("No imports recorded.");
        return Ok(());
    }

    println!(
        "{:<20} {:<12} {:>10}  FILE",
        "TIMESTAMP", "SOURCE", "PRODUCTS"
    );
    for entry in &history.import_history {
        println!(
            "{:<20} {:<12} {:>10}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.source.as_str(),
            entry.products_count,
            entry.filename.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
