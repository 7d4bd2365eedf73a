//! api.rs - HTTP surface of the catalog service
//!
//! `GET /api/products` prices the catalog against the current spot price and
//! applies the optional `minPrice`, `maxPrice`, `minPopularity` and
//! `maxPopularity` bounds.

use chrono::Utc;
use log::{error, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use warp::http::StatusCode;
use warp::Filter;

use crate::catalog::Catalog;
use crate::error::{CatalogError, FilterError, PricingError};
use crate::filter::{self, FilterCriteria};
use crate::models::{CacheState, PricedItem};
use crate::pricing;
use crate::provider::PriceProvider;

/// Shared per-process state injected into handlers
pub struct AppContext {
    pub provider: Arc<PriceProvider>,
    pub catalog: Arc<dyn Catalog>,
}

impl AppContext {
    pub fn new(provider: Arc<PriceProvider>, catalog: Arc<dyn Catalog>) -> Self {
        AppContext { provider, catalog }
    }
}

/// Failures that reach the client
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    InvalidFilter(#[from] FilterError),

    #[error(transparent)]
    PriceUnavailable(#[from] PricingError),

    #[error(transparent)]
    CatalogUnavailable(#[from] CatalogError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
            ApiError::PriceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::CatalogUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidFilter(_) => "INVALID_FILTER",
            ApiError::PriceUnavailable(_) => "PRICE_UNAVAILABLE",
            ApiError::CatalogUnavailable(_) => "CATALOG_UNAVAILABLE",
        }
    }

    /// Message safe to show to clients
    pub fn public_message(&self) -> String {
        match self {
            ApiError::InvalidFilter(e) => e.to_string(),
            ApiError::PriceUnavailable(_) => {
                "Could not fetch real-time gold price and no cached price is available.".to_string()
            }
            ApiError::CatalogUnavailable(_) => "An error occurred while reading the product data.".to_string(),
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    pub timestamp: String,
}

/// Error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub rate_source: String,
    pub cache_state: CacheState,
    pub spot_price: Option<f64>,
    pub fetched_at: Option<String>,
    pub timestamp: String,
}

/// Price, then filter, the whole catalog
pub async fn priced_products(
    params: &HashMap<String, String>,
    ctx: &AppContext,
) -> Result<Vec<PricedItem>, ApiError> {
    let criteria = FilterCriteria::from_query(params)?;
    let price_per_gram = ctx.provider.current_price(Utc::now()).await?;
    let items = ctx.catalog.load().await?;

    let priced = pricing::annotate(items, price_per_gram)?;
    Ok(filter::apply(priced, &criteria))
}

/// GET /api/products
pub async fn list_products(
    params: HashMap<String, String>,
    ctx: Arc<AppContext>,
) -> Result<impl warp::Reply, Infallible> {
    let reply = match priced_products(&params, &ctx).await {
        Ok(items) => warp::reply::with_status(warp::reply::json(&items), StatusCode::OK),
        Err(e) => {
            match &e {
                ApiError::InvalidFilter(_) => warn!("GET /api/products rejected: {}", e),
                _ => error!("GET /api/products failed: {}", e),
            }
            error_reply(&e)
        }
    };
    Ok(reply)
}

/// GET /health
pub async fn health_check(ctx: Arc<AppContext>) -> Result<impl warp::Reply, Infallible> {
    use rust_decimal::prelude::ToPrimitive;

    let now = Utc::now();
    let snapshot = ctx.provider.snapshot().await;

    let response = HealthResponse {
        status: "healthy".to_string(),
        rate_source: ctx.provider.source_name().to_string(),
        cache_state: ctx.provider.state(now).await,
        spot_price: snapshot.and_then(|cached| cached.value.to_f64()),
        fetched_at: snapshot.map(|cached| cached.fetched_at.to_rfc3339()),
        timestamp: now.to_rfc3339(),
    };
    Ok(warp::reply::json(&response))
}

fn error_reply(err: &ApiError) -> warp::reply::WithStatus<warp::reply::Json> {
    let body = ErrorResponse {
        error: ErrorDetail {
            code: err.code().to_string(),
            message: err.public_message(),
        },
        timestamp: Utc::now().to_rfc3339(),
    };
    warp::reply::with_status(warp::reply::json(&body), err.status())
}

fn with_context(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = (Arc<AppContext>,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

/// Build all routes
pub fn create_routes(
    ctx: Arc<AppContext>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let root = warp::path::end().and(warp::get()).map(|| "API is running!");

    let products = warp::path!("api" / "products")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_context(ctx.clone()))
        .and_then(list_products);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(health_check);

    root.or(products)
        .or(health)
        .with(
            warp::cors()
                .allow_any_origin()
                .allow_headers(vec!["content-type"])
                .allow_methods(vec!["GET", "OPTIONS"]),
        )
        .with(warp::log("gold_catalog::api"))
}
