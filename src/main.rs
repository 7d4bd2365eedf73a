//! main.rs - Entry point for the gold catalog service
//!
//! Loads configuration, wires the price provider and catalog into the HTTP
//! routes and serves until Ctrl-C.

use gold_catalog::{create_routes, AppContext, JsonFileCatalog, PriceProvider, ServiceConfig, NAME, VERSION};
use log::{error, info, warn};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    info!("Starting {} v{}", NAME, VERSION);

    let config = ServiceConfig::load()?;
    let addr = config.server_addr()?;

    let source = config.rate_source.build()?;
    info!("✓ Rate source initialized: {} ({})", source.name(), config.rate_source.endpoint());
    if config.rate_source.api_key.is_empty() {
        warn!("GOLD_API_KEY is not set; upstream requests will be unauthenticated");
    }
    info!("  - Price TTL: {}s", config.cache.ttl_secs);
    info!("  - Fetch timeout: {}s", config.rate_source.timeout_secs);

    let provider = Arc::new(PriceProvider::new(
        source,
        config.cache.ttl(),
        config.rate_source.timeout(),
    ));

    // Warm the cache; a failure here is retried on the first request
    match provider.current_price(chrono::Utc::now()).await {
        Ok(price) => info!("✓ Initial spot price: {} per gram", price),
        Err(e) => {
            error!("✗ Initial spot price fetch failed: {}", e);
            warn!("Will retry on the first request...");
        }
    }

    let catalog = Arc::new(JsonFileCatalog::new(&config.catalog.path));
    info!("✓ Catalog: {}", catalog.path().display());

    let ctx = Arc::new(AppContext::new(provider, catalog));
    let routes = create_routes(ctx);

    let (bound, server) = warp::serve(routes).try_bind_with_graceful_shutdown(addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    })?;

    info!("Server listening on {}", bound);
    server.await;
    info!("Shutting down");

    Ok(())
}
