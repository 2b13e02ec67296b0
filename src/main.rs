//! # Catalog Harness CLI (`catalog`)
//!
//! ## Usage
//!
//! ```bash
//! catalog --config ./config/catalog.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `catalog init` | Create the SQLite database and run schema migrations |
//! | `catalog import <source> <file>` | Stage a JSON feed under a source |
//! | `catalog recompute` | Rebuild catalog and indexes from staged sources |
//! | `catalog sources` | Record counts and last import per source |
//! | `catalog products` | List catalog products with filters |
//! | `catalog product <kod>` | Show one merged product |
//! | `catalog categories` | List categories |
//! | `catalog manufacturers` | List manufacturers |
//! | `catalog history` | Show recent imports |
//! | `catalog serve` | Start the HTTP API |
//! | `catalog completions <shell>` | Print shell completions |

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use catalog_harness::{config, get, ingest, logging, migrate, search, server, sources};
use catalog_harness_core::query::ProductQuery;

/// Catalog Harness CLI: merges supplier feeds into a product catalog.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/catalog.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "catalog",
    about = "Catalog Harness: multi-source product merge and catalog indexing",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/catalog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Stage a JSON feed under a source.
    ///
    /// The file must hold a JSON array of product records. The import
    /// replaces the previous snapshot of the source and, unless
    /// `[catalog].recompute = "manual"`, rebuilds the catalog.
    Import {
        /// Source tag: `xml_cenik`, `xml_popisky`, or `excel`.
        source: String,

        /// Path to the JSON feed.
        file: PathBuf,

        /// File name recorded in the import history (defaults to the feed's name).
        #[arg(long)]
        filename: Option<String>,

        /// Parse and count records without writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Rebuild the catalog, product details, and indexes.
    Recompute,

    /// Show stored record counts and last import time per source.
    Sources,

    /// List catalog products.
    Products {
        /// Only products in this category.
        #[arg(long)]
        category: Option<String>,

        /// Only products from this manufacturer.
        #[arg(long)]
        manufacturer: Option<String>,

        /// Case-insensitive match on name or code.
        #[arg(long)]
        search: Option<String>,

        /// Page number, starting at 1.
        #[arg(long)]
        page: Option<usize>,

        /// Products per page (defaults to `[catalog].page_limit`).
        #[arg(long)]
        limit: Option<usize>,

        /// Print the page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the full merged record of one product.
    Product {
        /// Product code.
        kod: String,

        /// Print the record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List category names.
    Categories,

    /// List manufacturer names.
    Manufacturers,

    /// Show the most recent imports, newest first.
    History {
        /// Print the history as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Print shell completions to stdout.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(
            *shell,
            &mut Cli::command(),
            "catalog",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;
    logging::init_logging(&cfg.logging.level);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import {
            source,
            file,
            filename,
            dry_run,
        } => {
            ingest::run_import(&cfg, &source, &file, filename, dry_run).await?;
        }
        Commands::Recompute => {
            ingest::run_recompute(&cfg).await?;
        }
        Commands::Sources => {
            sources::list_sources(&cfg).await?;
        }
        Commands::Products {
            category,
            manufacturer,
            search: text,
            page,
            limit,
            json,
        } => {
            let query = ProductQuery {
                kategorie: category,
                vyrobce: manufacturer,
                search: text,
                page,
                limit,
            };
            search::run_products(&cfg, query, json).await?;
        }
        Commands::Product { kod, json } => {
            get::run_get(&cfg, &kod, json).await?;
        }
        Commands::Categories => {
            search::run_categories(&cfg).await?;
        }
        Commands::Manufacturers => {
            search::run_manufacturers(&cfg).await?;
        }
        Commands::History { json } => {
            sources::run_history(&cfg, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
