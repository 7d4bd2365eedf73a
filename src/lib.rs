//! Gold Catalog Service
//!
//! Serves a jewelry catalog priced on the fly from the gold spot rate
//!
//! # Pricing
//! - Spot price per gram fetched from a configurable quote provider
//! - Cached in memory for a configurable TTL, stale price served on errors
//! - `price = (popularityScore + 1) * weight * spotPerGram`, 2 decimals
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              GET /api/products (warp)                │
//! │  filters -> current price -> catalog -> price/filter │
//! └────────────────────────┬────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                   PriceProvider                      │
//! │  - current_price(now)   (single-flight refresh)      │
//! │  - PriceCache           (value + fetched_at, TTL)    │
//! └────────────────────────┬────────────────────────────┘
//!                          │
//!          ┌───────────────┼───────────────┐
//!          │               │               │
//!          ▼               ▼               ▼
//! ┌────────────────┐ ┌──────────────┐ ┌──────────────┐
//! │ OunceRateSource│ │GramPriceSrc  │ │MockRateSource│
//! │ (1/rate/31.1..)│ │ (direct)     │ │ (Testing)    │
//! └────────────────┘ └──────────────┘ └──────────────┘
//! ```

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod pricing;
pub mod provider;
pub mod rate_source;

// Re-export commonly used types
pub use models::{CacheState, CachedPrice, Item, PricedItem};

pub use api::{create_routes, AppContext};
pub use catalog::{Catalog, JsonFileCatalog, StaticCatalog};
pub use config::ServiceConfig;
pub use error::{CatalogError, FetchError, FilterError, PricingError};
pub use filter::FilterCriteria;
pub use provider::PriceProvider;
pub use rate_source::{GramPriceSource, MockRateSource, OunceRateSource, RateSource};

/// Version of the service
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the package
pub const NAME: &str = env!("CARGO_PKG_NAME");
