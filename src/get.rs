//! Product retrieval by code.
//!
//! Used by the `catalog product <kod>` CLI command. The HTTP server serves
//! the same record from `GET /products/{kod}`.

use anyhow::Result;

use catalog_harness_core::{CatalogError, MergedProduct};

use crate::config::Config;
use crate::db;

/// Looks up one merged product. `Ok(None)` means no product has that code.
pub async fn get_product(config: &Config, kod: &str) -> Result<Option<MergedProduct>> {
    let catalog = db::open_catalog(config).await?;
    let result = catalog.get_product_detail(kod).await;
    catalog.store().pool().close().await;

    match result {
        Ok(product) => Ok(Some(product)),
        Err(CatalogError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn show(label: &str, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.trim().is_empty()) {
        println!("{:<14}{}", format!("{}:", label), v);
    }
}

/// CLI entry point for `catalog product <kod>`.
pub async fn run_get(config: &Config, kod: &str, json: bool) -> Result<()> {
    let product = match get_product(config, kod).await? {
        Some(p) => p,
        None => {
            eprintln!("Error: product not found: {}", kod);
            std::process::exit(1);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&product)?);
        return Ok(());
    }

    let r = &product.record;
    let sources: Vec<&str> = product.merged_sources.iter().map(|s| s.as_str()).collect();

    println!("--- Product ---");
    println!("{:<14}{}", "kod:", r.kod);
    println!("{:<14}{}", "nazev:", r.nazev);
    show("ean", &r.ean);
    println!("{:<14}{:.2}", "cena bez DPH:", r.cena_bez_dph);
    println!("{:<14}{:.2}", "cena s DPH:", r.cena_s_dph);
    match r.dostupnost {
        Some(stock) => println!("{:<14}{}", "dostupnost:", stock),
        None => println!("{:<14}-", "dostupnost:"),
    }
    show("kategorie", &r.kategorie);
    show("vyrobce", &r.vyrobce);
    show("dodani", &r.dodani);
    show("minodber", &r.minodber);
    show("jednotka", &r.jednotka);
    show("obrazek", &r.obrazek);
    println!("{:<14}{}", "sources:", sources.join(", "));

    for (title, block) in [
        ("Short description", &r.kratky_popis),
        ("Description", &r.popis),
        ("Parameters", &r.parametry),
        ("Documents", &r.dokumenty),
    ] {
        if let Some(text) = block.as_deref().filter(|t| !t.trim().is_empty()) {
            println!();
            println!("--- {} ---", title);
            println!("{}", text);
        }
    }

    Ok(())
}
