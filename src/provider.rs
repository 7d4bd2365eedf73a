//! provider.rs - Fetch/fallback policy around the price cache
//!
//! `current_price` answers from the cache while it is fresh. On a miss the
//! first caller spawns one upstream fetch and every concurrent caller waits
//! on the same result (single-flight). The fetch runs as its own task and
//! writes the cache itself, so callers that give up never cancel it.
//!
//! When a refresh fails the last known price is served, however old; only a
//! cache that never held a price turns a fetch failure into an error. The
//! fetch task settles that choice once, under the lock, so every waiter on
//! one fetch gets the same answer.

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

use crate::cache::PriceCache;
use crate::error::{FetchError, PricingError};
use crate::models::{CacheState, CachedPrice};
use crate::rate_source::RateSource;

type FetchOutcome = Result<Decimal, PricingError>;

struct ProviderState {
    cache: PriceCache,
    /// Present while a fetch task is running
    in_flight: Option<watch::Receiver<Option<FetchOutcome>>>,
}

/// Owns the price cache and the upstream source
pub struct PriceProvider {
    source: Arc<dyn RateSource>,
    state: Arc<Mutex<ProviderState>>,
    fetch_timeout: Duration,
}

impl PriceProvider {
    /// `ttl` bounds cache freshness; `fetch_timeout` bounds each upstream call
    pub fn new(source: Arc<dyn RateSource>, ttl: Duration, fetch_timeout: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);

        PriceProvider {
            source,
            state: Arc::new(Mutex::new(ProviderState {
                cache: PriceCache::new(ttl),
                in_flight: None,
            })),
            fetch_timeout,
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Current spot price per gram.
    ///
    /// A price fetched on behalf of this call is stamped with `now`.
    pub async fn current_price(&self, now: DateTime<Utc>) -> Result<Decimal, PricingError> {
        let mut rx = {
            let mut state = self.state.lock().await;

            if let Some(cached) = state.cache.read_fresh(now) {
                debug!("Serving spot price from cache ({})", cached.value);
                return Ok(cached.value);
            }

            // A closed channel means the fetch task died without reporting
            let joinable = state
                .in_flight
                .as_ref()
                .filter(|rx| rx.has_changed().is_ok())
                .cloned();

            match joinable {
                Some(rx) => {
                    debug!("Joining in-flight spot price fetch");
                    rx
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    state.in_flight = Some(rx.clone());
                    self.spawn_fetch(tx, now);
                    rx
                }
            }
        };

        let outcome = match rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };

        match outcome {
            Some(outcome) => outcome,
            None => {
                let cause = FetchError::Network("fetch task ended without a result".to_string());
                fallback(&*self.state.lock().await, cause)
            }
        }
    }

    /// Last cached price, fresh or stale
    pub async fn snapshot(&self) -> Option<CachedPrice> {
        self.state.lock().await.cache.read()
    }

    pub async fn state(&self, now: DateTime<Utc>) -> CacheState {
        self.state.lock().await.cache.state(now)
    }

    fn spawn_fetch(&self, tx: watch::Sender<Option<FetchOutcome>>, stamp: DateTime<Utc>) {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let timeout = self.fetch_timeout;

        tokio::spawn(async move {
            info!("Fetching new spot price from {}", source.name());

            let result = match tokio::time::timeout(timeout, source.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(timeout)),
            };

            let outcome = {
                let mut state = state.lock().await;
                state.in_flight = None;

                match result {
                    Ok(value) => {
                        if state.cache.write(value, stamp) {
                            info!("Spot price updated: {} per gram", value);
                        }
                        Ok(value)
                    }
                    Err(e) => {
                        warn!("Spot price fetch from {} failed: {}", source.name(), e);
                        fallback(&state, e)
                    }
                }
            };

            if tx.send(Some(outcome)).is_err() {
                debug!("Spot price fetch finished with no callers waiting");
            }
        });
    }

}

/// Last known price after a failed refresh, or the failure itself
fn fallback(state: &ProviderState, cause: FetchError) -> FetchOutcome {
    match state.cache.read() {
        Some(stale) => {
            warn!(
                "Serving stale spot price {} fetched at {} after refresh failure: {}",
                stale.value, stale.fetched_at, cause
            );
            Ok(stale.value)
        }
        None => {
            error!("No spot price available: {}", cause);
            Err(PricingError::NoPriceAvailable { cause })
        }
    }
}
