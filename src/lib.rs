//! # Catalog Harness
//!
//! Multi-source product catalog for a reseller shop.
//!
//! Product feeds (a supplier XML price list, an XML description feed, and a
//! spreadsheet of manual corrections) are handed over as JSON arrays,
//! staged per source, merged by product code, and served as a paginated,
//! filterable catalog with category and manufacturer indexes.
//!
//! The merge engine and the read model live in `catalog-harness-core`;
//! this crate adds the SQLite store, configuration, the `catalog` CLI, and
//! the HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │ JSON feeds  │──▶│ Stage+Merge │──▶│  SQLite   │
//! │ cenik/popis │   │   +Index    │   │  kv table │
//! └─────────────┘   └─────────────┘   └────┬─────┘
//!                                          │
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │   CLI    │       │   HTTP   │
//!                 │(catalog) │       │  (axum)  │
//!                 └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! catalog init
//! catalog import xml_cenik ./feeds/cenik.json
//! catalog import xml_popisky ./feeds/popisky.json
//! catalog import excel ./feeds/opravy.json
//! catalog products --category Kabely --search hdmi
//! catalog serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite key-value backend |
//! | [`ingest`] | Import and recompute commands |
//! | [`search`] | Catalog listing commands |
//! | [`get`] | Product detail command |
//! | [`sources`] | Source status and import history |
//! | [`server`] | HTTP API |
//! | [`logging`] | Tracing subscriber setup |

pub mod config;
pub mod db;
pub mod get;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod search;
pub mod server;
pub mod sources;
pub mod sqlite_store;
