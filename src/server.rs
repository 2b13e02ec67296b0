//! Catalog HTTP API.
//!
//! Exposes the catalog read model and the import entry points as a JSON
//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/products` | Filtered, paginated catalog listing |
//! | `GET`  | `/products/{kod}` | Full merged record of one product |
//! | `GET`  | `/categories` | Category index names |
//! | `GET`  | `/manufacturers` | Manufacturer index names |
//! | `GET`  | `/import-history` | Most recent imports, newest first |
//! | `POST` | `/import/{source}` | Stage a JSON array of records under a source |
//! | `POST` | `/recompute` | Rebuild catalog and indexes from current snapshots |
//!
//! `/products` accepts `kategorie`, `vyrobce`, `search`, `page` and `limit`
//! query parameters. `/import/{source}` accepts an optional `filename`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "products must be a JSON array, got an object" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use catalog_harness_core::feed::{records_from_json, tag_untagged};
use catalog_harness_core::models::ImportHistory;
use catalog_harness_core::query::{ProductPage, ProductQuery};
use catalog_harness_core::{Catalog, CatalogError, MergedProduct, RecomputePolicy, SourceTag};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    catalog: Arc<Catalog<SqliteStore>>,
}

/// Starts the HTTP server on `[server].bind`.
///
/// Applies migrations first, so serving a fresh database works without a
/// separate `catalog init`. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    migrate::run_migrations(config).await?;
    let catalog = Arc::new(db::open_catalog(config).await?);
    let app = router(catalog);

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, "catalog server listening");
    println!("Catalog server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the route table over an opened catalog.
pub fn router(catalog: Arc<Catalog<SqliteStore>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/products", get(handle_products))
        .route("/products/{kod}", get(handle_product_detail))
        .route("/categories", get(handle_categories))
        .route("/manufacturers", get(handle_manufacturers))
        .route("/import-history", get(handle_import_history))
        .route("/import/{source}", post(handle_import))
        .route("/recompute", post(handle_recompute))
        .layer(cors)
        .with_state(AppState { catalog })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(message) => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "bad_request",
                message,
            },
            CatalogError::NotFound(kod) => AppError {
                status: StatusCode::NOT_FOUND,
                code: "not_found",
                message: format!("product not found: {}", kod),
            },
            other => {
                error!(error = %other, "request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message: other.to_string(),
                }
            }
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: rejection.body_text(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Reads ============

async fn handle_products(
    State(state): State<AppState>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> Result<Json<ProductPage>, AppError> {
    let Query(query) = query?;
    Ok(Json(state.catalog.get_products(&query).await?))
}

async fn handle_product_detail(
    State(state): State<AppState>,
    Path(kod): Path<String>,
) -> Result<Json<MergedProduct>, AppError> {
    Ok(Json(state.catalog.get_product_detail(&kod).await?))
}

async fn handle_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.catalog.get_product_categories().await?))
}

async fn handle_manufacturers(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.catalog.get_product_manufacturers().await?))
}

async fn handle_import_history(
    State(state): State<AppState>,
) -> Result<Json<ImportHistory>, AppError> {
    Ok(Json(state.catalog.get_product_import_history().await?))
}

// ============ POST /import/{source} ============

#[derive(Deserialize)]
struct ImportParams {
    filename: Option<String>,
}

#[derive(Serialize)]
struct ImportResponse {
    source: SourceTag,
    products_count: usize,
    recomputed: bool,
}

async fn handle_import(
    State(state): State<AppState>,
    Path(source): Path<String>,
    params: Result<Query<ImportParams>, QueryRejection>,
    body: String,
) -> Result<Json<ImportResponse>, AppError> {
    let Query(params) = params?;
    let source: SourceTag = source.parse()?;
    let mut records = records_from_json(&body)?;
    tag_untagged(&mut records, source);

    let products_count = state
        .catalog
        .store_products_from_source(&records, source, params.filename.as_deref())
        .await?;

    Ok(Json(ImportResponse {
        source,
        products_count,
        recomputed: state.catalog.options().recompute == RecomputePolicy::Always,
    }))
}

// ============ POST /recompute ============

#[derive(Serialize)]
struct RecomputeResponse {
    products_count: usize,
}

async fn handle_recompute(
    State(state): State<AppState>,
) -> Result<Json<RecomputeResponse>, AppError> {
    let products_count = state.catalog.recompute().await?;
    Ok(Json(RecomputeResponse { products_count }))
}
