//! Configuration parsing and validation.
//!
//! Catalog Harness is configured via a TOML file (default
//! `./config/catalog.toml`). Only `[db]` is required; every other section
//! falls back to defaults.
//!
//! ```toml
//! [db]
//! path = "./data/catalog.sqlite"
//!
//! [catalog]
//! write_batch_size = 50
//! history_limit = 20
//! page_limit = 50
//! recompute = "always"   # or "manual"
//!
//! [server]
//! bind = "127.0.0.1:7340"
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use catalog_harness_core::history::DEFAULT_HISTORY_LIMIT;
use catalog_harness_core::merge::DEFAULT_WRITE_BATCH_SIZE;
use catalog_harness_core::query::DEFAULT_PAGE_LIMIT;
use catalog_harness_core::{CatalogOptions, RecomputePolicy};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_write_batch_size")]
    pub write_batch_size: usize,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
    #[serde(default)]
    pub recompute: RecomputePolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            write_batch_size: default_write_batch_size(),
            history_limit: default_history_limit(),
            page_limit: default_page_limit(),
            recompute: RecomputePolicy::default(),
        }
    }
}

impl CatalogConfig {
    pub fn options(&self) -> CatalogOptions {
        CatalogOptions {
            write_batch_size: self.write_batch_size,
            history_limit: self.history_limit,
            page_limit: self.page_limit,
            recompute: self.recompute,
        }
    }
}

fn default_write_batch_size() -> usize {
    DEFAULT_WRITE_BATCH_SIZE
}
fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}
fn default_page_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.catalog.write_batch_size == 0 {
        anyhow::bail!("catalog.write_batch_size must be > 0");
    }
    if config.catalog.history_limit == 0 {
        anyhow::bail!("catalog.history_limit must be > 0");
    }
    if config.catalog.page_limit == 0 {
        anyhow::bail!("catalog.page_limit must be > 0");
    }

    match config.logging.level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        other => anyhow::bail!(
            "Unknown logging.level: '{}'. Must be trace, debug, info, warn, or error.",
            other
        ),
    }

    Ok(())
}
