//! Catalog listing commands.
//!
//! `catalog products` pages through the merged catalog with optional
//! category, manufacturer and text filters. `catalog categories` and
//! `catalog manufacturers` print the index names.

use anyhow::Result;

use catalog_harness_core::query::ProductQuery;

use crate::config::Config;
use crate::db;

/// CLI entry point for `catalog products`.
pub async fn run_products(config: &Config, query: ProductQuery, json: bool) -> Result<()> {
    let catalog = db::open_catalog(config).await?;
    let page = catalog.get_products(&query).await?;
    catalog.store().pool().close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.products.is_empty() {
        println!("No products.");
        return Ok(());
    }

    println!(
        "{:<16} {:<40} {:>12} {:>8}  KATEGORIE",
        "KOD", "NAZEV", "CENA", "SKLAD"
    );
    for p in &page.products {
        let stock = p
            .dostupnost
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<16} {:<40} {:>12.2} {:>8}  {}",
            p.kod,
            truncate(&p.nazev, 40),
            p.cena_bez_dph,
            stock,
            p.kategorie.as_deref().unwrap_or("")
        );
    }
    println!();
    println!(
        "page {}/{} ({} products)",
        page.pagination.page, page.pagination.total_pages, page.pagination.total_products
    );
    if let Some(at) = page.last_updated {
        println!("catalog updated: {}", at.format("%Y-%m-%d %H:%M:%S"));
    }

    Ok(())
}

/// CLI entry point for `catalog categories`.
pub async fn run_categories(config: &Config) -> Result<()> {
    let catalog = db::open_catalog(config).await?;
    let names = catalog.get_product_categories().await?;
    catalog.store().pool().close().await;
    print_names(&names, "No categories.");
    Ok(())
}

/// CLI entry point for `catalog manufacturers`.
pub async fn run_manufacturers(config: &Config) -> Result<()> {
    let catalog = db::open_catalog(config).await?;
    let names = catalog.get_product_manufacturers().await?;
    catalog.store().pool().close().await;
    print_names(&names, "No manufacturers.");
    Ok(())
}

fn print_names(names: &[String], empty: &str) {
    if names.is_empty() {
        println!("{}", empty);
        return;
    }
    for name in names {
        println!("{}", name);
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", cut)
}
